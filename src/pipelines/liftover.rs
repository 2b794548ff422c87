use std::path::{Path, PathBuf};

use crate::config::defs::{Pipeline, PipelineError, RunConfig, HG18_TO_HG19_CHAIN};
use crate::pipelines::compute::ComputeRun;
use crate::pipelines::{output_dir, path_string, require_companion, study_dir, study_files};
use crate::utils::chromosome::Chromosome;
use crate::utils::worksheet::{Worksheet, WorksheetRecord};

/// Parameters of one liftover job (one chromosome).
#[derive(Debug, Clone, PartialEq)]
pub struct LiftoverRow {
    pub study: String,
    pub study_input_dir: String,
    pub chain_file: String,
    pub output_folder: String,
    pub chromosome: Chromosome,
}

impl WorksheetRecord for LiftoverRow {
    const FIELDS: &'static [&'static str] = &["study", "studyInputDir", "liftOverChainFile", "outputFolder", "chr"];

    fn values(&self) -> Vec<String> {
        vec![
            self.study.clone(),
            self.study_input_dir.clone(),
            self.chain_file.clone(),
            self.output_folder.clone(),
            self.chromosome.to_string(),
        ]
    }
}

/// Builds the liftover worksheet: one row per chromosome having both ped and map files.
pub fn build_worksheet(run_id: &str, cwd: &Path, study: &Path, output: &Path) -> Result<Worksheet, PipelineError> {
    let peds = study_files(study, "ped")?;
    let maps = study_files(study, "map")?;
    require_companion(&peds, &maps)?;

    let chain_file = path_string(&cwd.join(HG18_TO_HG19_CHAIN));
    let rows: Vec<LiftoverRow> = peds
        .chromosomes
        .iter()
        .map(|chromosome| LiftoverRow {
            study: run_id.to_string(),
            study_input_dir: path_string(study),
            chain_file: chain_file.clone(),
            output_folder: path_string(output),
            chromosome: chromosome.clone(),
        })
        .collect();
    Ok(Worksheet::from_records(&rows))
}

pub async fn run(config: &RunConfig) -> Result<PathBuf, PipelineError> {
    let study = study_dir(config)?;
    let output = output_dir(config)?;
    let worksheet = build_worksheet(&config.run_id, &config.cwd, &study, &output)?;

    ComputeRun::new(config)
        .generate_and_submit(Pipeline::Liftover, &worksheet, config.args.backend, !config.args.no_submit)
        .await
}
