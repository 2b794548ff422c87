pub mod compute;
pub mod impute;
pub mod liftover;
pub mod phase;

use std::path::{Path, PathBuf};

use log::{error, info};

use crate::config::defs::{Pipeline, PipelineError, RunConfig, DEFAULT_CHROMOSOME_TEMPLATE};
use crate::utils::chromosome::{get_chromosome_files, ChromosomeFiles};
use crate::utils::file::mkdir;
use crate::utils::reference::ReferenceRegistry;

/// Runs one pipeline stage.
///
/// # Returns
/// Path of the worksheet written for the stage.
pub async fn run_action(
    config: &RunConfig,
    registry: &mut ReferenceRegistry,
    pipeline: Pipeline,
) -> Result<PathBuf, PipelineError> {
    info!("Running {} with run id {}", pipeline, config.run_id);
    match pipeline {
        Pipeline::Liftover => liftover::run(config).await,
        Pipeline::Phase => phase::run(config).await,
        Pipeline::Impute => impute::run(config, registry).await,
    }
}

/// Resolves a directory argument against the working directory.
pub(crate) fn resolve_dir(cwd: &Path, value: Option<&str>, flag: &str) -> Result<PathBuf, PipelineError> {
    let value = value.ok_or_else(|| {
        PipelineError::InvalidConfig(format!("Parameter --{} is required for this action", flag))
    })?;
    let path = PathBuf::from(value);
    Ok(if path.is_absolute() { path } else { cwd.join(path) })
}

/// Study directory, which must exist.
pub(crate) fn study_dir(config: &RunConfig) -> Result<PathBuf, PipelineError> {
    let study = resolve_dir(&config.cwd, config.args.study.as_deref(), "study")?;
    if !study.is_dir() {
        return Err(PipelineError::FileNotFound(study));
    }
    Ok(study)
}

/// Results directory, created if needed.
pub(crate) fn output_dir(config: &RunConfig) -> Result<PathBuf, PipelineError> {
    let output = resolve_dir(&config.cwd, config.args.output.as_deref(), "output")?;
    mkdir(&output, true)?;
    Ok(output)
}

/// Per-chromosome study files with the given extension, e.g. `chr1.ped`.
pub(crate) fn study_files(study: &Path, ext: &str) -> Result<ChromosomeFiles, PipelineError> {
    get_chromosome_files(&study.join(format!("*.{}", ext)), DEFAULT_CHROMOSOME_TEMPLATE).map_err(|e| {
        error!("Could not find any files named chr<CHROMOSOME>.{} in study dir {}", ext, study.display());
        PipelineError::ChromosomeFiles(e)
    })
}

/// Fails when a chromosome of `primary` has no companion file.
pub(crate) fn require_companion(
    primary: &ChromosomeFiles,
    companion: &ChromosomeFiles,
) -> Result<(), PipelineError> {
    for chromosome in &primary.chromosomes {
        if !companion.contains(chromosome) {
            return Err(PipelineError::InvalidConfig(format!(
                "{} has no matching {}",
                primary.path(chromosome).display(),
                companion.file_name(chromosome)
            )));
        }
    }
    Ok(())
}

pub(crate) fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
