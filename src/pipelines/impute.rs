use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::defs::{Pipeline, PipelineError, RunConfig, HAPS_LEADING_FIELDS, VCF_GZ_EXT};
use crate::pipelines::compute::ComputeRun;
use crate::pipelines::phase::genetic_map_path;
use crate::pipelines::{output_dir, path_string, study_dir, study_files};
use crate::utils::batch::{imputation_jobs, position_chunks, sample_chunks, ImputationJob};
use crate::utils::chromosome::{Chromosome, ChromosomeFiles};
use crate::utils::file::first_line_fields;
use crate::utils::reference::{ReferencePanel, ReferenceRegistry};
use crate::utils::worksheet::{Worksheet, WorksheetRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct ImputeRow {
    pub project: String,
    pub known_haps: String,
    pub genetic_map: String,
    pub reference_haps: String,
    pub reference_legend: String,
    pub reference_vcf: String,
    pub additional_impute2_parameters: String,
    pub output_folder: String,
    pub job: ImputationJob,
    pub sample_chunks: usize,
}

impl WorksheetRecord for ImputeRow {
    const FIELDS: &'static [&'static str] = &[
        "project",
        "knownHapsG",
        "m",
        "h",
        "l",
        "vcf",
        "additonalImpute2Param",
        "outputFolder",
        "chr",
        "fromChrPos",
        "toChrPos",
        "fromSample",
        "toSample",
        "samplechunksn",
    ];

    fn values(&self) -> Vec<String> {
        vec![
            self.project.clone(),
            self.known_haps.clone(),
            self.genetic_map.clone(),
            self.reference_haps.clone(),
            self.reference_legend.clone(),
            self.reference_vcf.clone(),
            self.additional_impute2_parameters.clone(),
            self.output_folder.clone(),
            self.job.position.chromosome.to_string(),
            self.job.position.from.to_string(),
            self.job.position.to.to_string(),
            self.job.samples.from.to_string(),
            self.job.samples.to.to_string(),
            self.sample_chunks.to_string(),
        ]
    }
}

/// Number of samples in a haps file: five leading columns, then two alleles per sample.
pub fn haps_sample_count(path: &Path) -> Result<usize, PipelineError> {
    let fields = first_line_fields(path)?.len();
    if fields <= HAPS_LEADING_FIELDS {
        return Err(PipelineError::InvalidConfig(format!(
            "{} has {} columns, expected more than {}",
            path.display(),
            fields,
            HAPS_LEADING_FIELDS
        )));
    }
    Ok((fields - HAPS_LEADING_FIELDS) / 2)
}

/// Chromosomes to impute.
///
/// Requested chromosomes must exist both in the study and in the panel. Without a
/// request every study chromosome the panel covers is used.
pub fn select_chromosomes(
    requested: &[String],
    study: &ChromosomeFiles,
    panel: &[Chromosome],
) -> Result<Vec<Chromosome>, PipelineError> {
    if requested.is_empty() {
        let selected: Vec<Chromosome> = study
            .chromosomes
            .iter()
            .filter(|c| {
                let covered = panel.contains(c);
                if !covered {
                    warn!("Skipping chromosome {}: not present in the reference panel", c);
                }
                covered
            })
            .cloned()
            .collect();
        if selected.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "None of the study chromosomes is present in the reference panel".to_string(),
            ));
        }
        return Ok(selected);
    }

    let mut selected = Vec::new();
    for name in requested {
        let chromosome: Chromosome = name
            .trim()
            .parse()
            .map_err(|_| PipelineError::InvalidConfig(format!("Unknown chromosome: {}", name)))?;
        if !study.contains(&chromosome) {
            return Err(PipelineError::InvalidConfig(format!(
                "Cannot locate study haps file for requested chromosome: {}",
                chromosome
            )));
        }
        if !panel.contains(&chromosome) {
            return Err(PipelineError::InvalidConfig(format!(
                "Cannot locate reference panel for requested chromosome: {}",
                chromosome
            )));
        }
        if !selected.contains(&chromosome) {
            selected.push(chromosome);
        }
    }
    Ok(selected)
}

fn strip_vcf_suffix(path: &Path) -> String {
    let path = path_string(path);
    match path.strip_suffix(&format!(".{}", VCF_GZ_EXT)) {
        Some(stripped) => stripped.to_string(),
        None => path,
    }
}

/// Builds the imputation worksheet, one row per position window and sample range.
///
/// # Arguments
///
/// * `config` - Run settings, including batch sizes and extra impute2 arguments.
/// * `panel` - Installed reference panel.
/// * `haps` - Phased study files.
/// * `chromosomes` - Chromosomes to impute, a subset of `haps`.
/// * `output` - Results directory.
pub fn build_worksheet(
    config: &RunConfig,
    panel: &ReferencePanel,
    haps: &ChromosomeFiles,
    chromosomes: &[Chromosome],
    output: &Path,
) -> Result<Worksheet, PipelineError> {
    let Some(first) = chromosomes.first() else {
        return Err(PipelineError::InvalidConfig("No chromosomes to impute".to_string()));
    };
    let n_samples = haps_sample_count(&haps.path(first))?;
    if n_samples == 0 {
        return Err(PipelineError::InvalidConfig(format!("No samples in {}", haps.path(first).display())));
    }

    let batch_size = usize::try_from(config.args.sample_batch_size).unwrap_or(usize::MAX);
    let samples = sample_chunks(n_samples, batch_size);
    let positions = position_chunks(chromosomes, config.args.position_batch_size);
    let jobs = imputation_jobs(&positions, &samples);
    info!(
        "Imputing {} samples in {} sample batches over {} regions: {} jobs",
        n_samples,
        samples.len(),
        positions.len(),
        jobs.len()
    );

    let reference_dir = config.reference_dir.as_path();
    let rows: Vec<ImputeRow> = jobs
        .into_iter()
        .map(|job| {
            let chromosome = &job.position.chromosome;
            ImputeRow {
                project: config.run_id.clone(),
                known_haps: path_string(&haps.path(chromosome)),
                genetic_map: path_string(&genetic_map_path(&config.cwd, chromosome)),
                reference_haps: path_string(&panel.haps_path(reference_dir, chromosome)),
                reference_legend: path_string(&panel.legend_path(reference_dir, chromosome)),
                reference_vcf: strip_vcf_suffix(&panel.vcf_path(reference_dir, chromosome)),
                additional_impute2_parameters: config.args.additional_impute2_parameters.clone(),
                output_folder: path_string(output),
                sample_chunks: samples.len(),
                job,
            }
        })
        .collect();
    Ok(Worksheet::from_records(&rows))
}

pub async fn run(config: &RunConfig, registry: &mut ReferenceRegistry) -> Result<PathBuf, PipelineError> {
    let reference = config
        .args
        .reference
        .as_deref()
        .ok_or_else(|| PipelineError::InvalidConfig("Parameter --reference is required for impute".to_string()))?;
    // fail on an unknown panel before touching the study
    registry.get(reference)?;

    let study = study_dir(config)?;
    let haps = study_files(&study, "haps")?;
    let panel_chromosomes = registry.check_installation(reference, &config.tools_dir).await?;
    let chromosomes = select_chromosomes(&config.args.chromosomes, &haps, &panel_chromosomes)?;

    let output = output_dir(config)?;
    let panel = registry.get(reference)?;
    let worksheet = build_worksheet(config, panel, &haps, &chromosomes, &output)?;

    ComputeRun::new(config)
        .generate_and_submit(Pipeline::Impute, &worksheet, config.args.backend, !config.args.no_submit)
        .await
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Arguments;
    use crate::utils::file::gzip_file;
    use std::fs;
    use tempfile::tempdir;

    fn chromosomes(names: &[&str]) -> Vec<Chromosome> {
        names.iter().map(|n| n.parse().unwrap()).collect()
    }

    fn haps_line(samples: usize) -> String {
        let alleles = vec!["0"; samples * 2].join(" ");
        format!("1 rs1 10583 G A {}\n", alleles)
    }

    fn study_with_haps(dir: &Path, names: &[&str], samples: usize) -> anyhow::Result<ChromosomeFiles> {
        for name in names {
            fs::write(dir.join(format!("chr{}.haps", name)), haps_line(samples))?;
        }
        Ok(study_files(dir, "haps")?)
    }

    #[test]
    fn test_haps_sample_count() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let plain = dir.path().join("chr1.haps");
        fs::write(&plain, haps_line(7))?;
        assert_eq!(haps_sample_count(&plain)?, 7);

        let raw = dir.path().join("raw.haps");
        fs::write(&raw, haps_line(3))?;
        let gz = dir.path().join("chr2.haps.gz");
        gzip_file(&raw, &gz)?;
        assert_eq!(haps_sample_count(&gz)?, 3);

        let short = dir.path().join("short.haps");
        fs::write(&short, "1 rs1 10583 G\n")?;
        assert!(haps_sample_count(&short).is_err());
        Ok(())
    }

    #[test]
    fn test_select_chromosomes() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let study = study_with_haps(dir.path(), &["1", "2", "X"], 1)?;
        let panel = chromosomes(&["1", "2", "3"]);

        assert_eq!(select_chromosomes(&[], &study, &panel)?, chromosomes(&["1", "2"]));
        assert_eq!(
            select_chromosomes(&["2".to_string(), " 1".to_string()], &study, &panel)?,
            chromosomes(&["2", "1"])
        );
        assert!(select_chromosomes(&["X".to_string()], &study, &panel).is_err());
        assert!(select_chromosomes(&["3".to_string()], &study, &panel).is_err());
        assert!(select_chromosomes(&["23".to_string()], &study, &panel).is_err());
        assert!(select_chromosomes(&[], &study, &chromosomes(&["Y"])).is_err());
        Ok(())
    }

    #[test]
    fn test_impute_worksheet() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let study = study_with_haps(dir.path(), &["21"], 1200)?;
        let config = RunConfig {
            cwd: PathBuf::from("/work"),
            tools_dir: PathBuf::from("/work/tools"),
            reference_dir: PathBuf::from("/ref"),
            run_id: "beadfeed".to_string(),
            args: Arguments {
                additional_impute2_parameters: " ".to_string(),
                sample_batch_size: 500,
                position_batch_size: 20_000_000,
                ..Default::default()
            },
        };
        let panel = ReferencePanel::custom("hrc", Path::new("/ref"), "chr%(chromosome)s.hrc.vcf.gz");

        let sheet = build_worksheet(&config, &panel, &study, &chromosomes(&["21"]), Path::new("/out"))?;
        // chr21 is 48,129,895 bp: 3 windows, 2 sample ranges each
        assert_eq!(sheet.len(), 6);
        assert_eq!(sheet.header(), ImputeRow::FIELDS);

        let last = &sheet.rows()[5];
        assert_eq!(last[1], study.path(&chromosomes(&["21"])[0]).display().to_string());
        assert_eq!(last[2], "/work/resources/genetic_map/genetic_map_chr21_combined_b37.txt");
        assert_eq!(last[3], "/ref/hrc/chr21.hrc.haps.gz");
        assert_eq!(last[4], "/ref/hrc/chr21.hrc.legend.gz");
        assert_eq!(last[5], "/ref/hrc/chr21.hrc");
        assert_eq!(last[8], "21");
        assert_eq!(last[9], "40000001");
        assert_eq!(last[10], "60000000");
        assert_eq!(last[11], "601");
        assert_eq!(last[12], "1200");
        assert_eq!(last[13], "2");
        Ok(())
    }

    #[test]
    fn test_strip_vcf_suffix() {
        assert_eq!(strip_vcf_suffix(Path::new("/ref/p/chr1.vcf.gz")), "/ref/p/chr1");
        assert_eq!(strip_vcf_suffix(Path::new("/ref/p/chr1.bcf")), "/ref/p/chr1.bcf");
    }
}
