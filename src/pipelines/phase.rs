use std::path::{Path, PathBuf};

use log::debug;

use crate::cli::StudyDataType;
use crate::config::defs::{Pipeline, PipelineError, RunConfig, GENETIC_MAP_TEMPLATE};
use crate::pipelines::compute::ComputeRun;
use crate::pipelines::{output_dir, path_string, require_companion, study_dir, study_files};
use crate::utils::chromosome::{fill_template, Chromosome, ChromosomeFiles};
use crate::utils::worksheet::{Worksheet, WorksheetRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseRow {
    pub project: String,
    pub genetic_map: String,
    pub output_folder: String,
    pub chromosome: Chromosome,
    pub additional_shapeit_parameters: String,
    pub study_data: String,
    pub study_data_type: StudyDataType,
}

impl WorksheetRecord for PhaseRow {
    // "additonal" is how the phasing workflow spells its parameter
    const FIELDS: &'static [&'static str] =
        &["project", "m", "outputFolder", "chr", "additonalShapeitParam", "studyData", "studyDataType"];

    fn values(&self) -> Vec<String> {
        vec![
            self.project.clone(),
            self.genetic_map.clone(),
            self.output_folder.clone(),
            self.chromosome.to_string(),
            self.additional_shapeit_parameters.clone(),
            self.study_data.clone(),
            self.study_data_type.as_str().to_string(),
        ]
    }
}

/// Genetic map of a chromosome, relative to the run root.
pub fn genetic_map_path(root: &Path, chromosome: &Chromosome) -> PathBuf {
    root.join(fill_template(GENETIC_MAP_TEMPLATE, chromosome))
}

/// Builds the phasing worksheet: one row per chromosome of the study.
///
/// The first extension of the data type decides the chromosomes; every other
/// extension must have a file for each of them.
pub fn build_worksheet(config: &RunConfig, study: &Path, output: &Path) -> Result<Worksheet, PipelineError> {
    let data_type = config.args.study_data_type;
    let files: Vec<ChromosomeFiles> = data_type
        .extensions()
        .iter()
        .map(|ext| study_files(study, ext))
        .collect::<Result<_, _>>()?;

    let Some((primary, companions)) = files.split_first() else {
        return Err(PipelineError::InvalidConfig(format!("No file extensions for {}", data_type.as_str())));
    };
    for companion in companions {
        require_companion(primary, companion)?;
    }

    let rows: Vec<PhaseRow> = primary
        .chromosomes
        .iter()
        .map(|chromosome| {
            let study_data: Vec<String> = files.iter().map(|f| path_string(&f.path(chromosome))).collect();
            debug!("Phasing chromosome {} from {}", chromosome, study_data.join(" "));
            PhaseRow {
                project: config.run_id.clone(),
                genetic_map: path_string(&genetic_map_path(&config.cwd, chromosome)),
                output_folder: path_string(output),
                chromosome: chromosome.clone(),
                additional_shapeit_parameters: config.args.additional_shapeit_parameters.clone(),
                study_data: study_data.join(" "),
                study_data_type: data_type,
            }
        })
        .collect();
    Ok(Worksheet::from_records(&rows))
}

pub async fn run(config: &RunConfig) -> Result<PathBuf, PipelineError> {
    let study = study_dir(config)?;
    let output = output_dir(config)?;
    let worksheet = build_worksheet(config, &study, &output)?;

    ComputeRun::new(config)
        .generate_and_submit(Pipeline::Phase, &worksheet, config.args.backend, !config.args.no_submit)
        .await
}
