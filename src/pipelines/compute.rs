use std::path::{Path, PathBuf};

use log::info;

use crate::cli::Backend;
use crate::config::defs::{Pipeline, PipelineError, RunConfig, MOLGENIS_COMPUTE_SH, SH_TAG, SUBMIT_SCRIPT};
use crate::utils::command::{execute, ShellCommand};
use crate::utils::worksheet::{generated_dir_name, worksheet_path, write_root_worksheet, Worksheet};

/// Drives the molgenis-compute script generator for one run.
#[derive(Debug, Clone)]
pub struct ComputeRun {
    pub tools_dir: PathBuf,
    pub root_dir: PathBuf,
    pub run_id: String,
}

impl ComputeRun {
    pub fn new(config: &RunConfig) -> Self {
        ComputeRun {
            tools_dir: config.tools_dir.clone(),
            root_dir: config.cwd.clone(),
            run_id: config.run_id.clone(),
        }
    }

    /// Directory the generated scripts are written to.
    pub fn generated_dir(&self, pipeline: Pipeline) -> PathBuf {
        self.root_dir.join(generated_dir_name(pipeline, &self.run_id))
    }

    /// The generator script ships with the prerequisites archive unpacked in the root
    /// directory; workflow definitions live under the tools directory.
    pub fn generator_script(&self) -> PathBuf {
        self.root_dir.join(MOLGENIS_COMPUTE_SH)
    }

    pub fn generator_command(
        &self,
        pipeline: Pipeline,
        worksheet: &Path,
        root_worksheet: &Path,
        backend: Backend,
    ) -> ShellCommand {
        fn display(p: &Path) -> String {
            p.to_string_lossy().into_owned()
        }
        ShellCommand::new(SH_TAG)
            .arg(display(&self.generator_script()))
            .arg("--generate")
            .arg("--path")
            .arg(display(&self.tools_dir.join(pipeline.workflow_dir())))
            .args(["--workflow", "workflow.csv", "--parameters", "parameters.csv"])
            .arg(display(worksheet))
            .arg(display(root_worksheet))
            .arg("--rundir")
            .arg(display(&self.generated_dir(pipeline)))
            .arg("--backend")
            .arg(backend.as_str())
            .args(["--database", "none"])
            .current_dir(&self.root_dir)
    }

    /// Launches `submit.sh` from the generated directory.
    pub async fn submit(&self, pipeline: Pipeline, backend: Backend) -> Result<(), PipelineError> {
        let generated_dir = self.generated_dir(pipeline);
        info!("Generated {} scripts in: {}", backend.as_str(), generated_dir.display());
        info!("Submitting..");
        execute(&ShellCommand::new(SH_TAG).arg(SUBMIT_SCRIPT).current_dir(&generated_dir)).await?;
        info!("Finished {}", pipeline);
        Ok(())
    }

    /// Writes the worksheets, generates the scripts and optionally submits them.
    ///
    /// # Arguments
    ///
    /// * `pipeline` - Stage whose workflow definition is used.
    /// * `worksheet` - One row per job instance.
    /// * `backend` - Execution environment passed to the generator.
    /// * `submit` - Whether to run `submit.sh` after generation.
    ///
    /// # Returns
    /// Path of the saved worksheet.
    pub async fn generate_and_submit(
        &self,
        pipeline: Pipeline,
        worksheet: &Worksheet,
        backend: Backend,
        submit: bool,
    ) -> Result<PathBuf, PipelineError> {
        let worksheet_file = worksheet_path(&self.root_dir, pipeline, &self.run_id)?;
        worksheet.save(&worksheet_file)?;
        let root_worksheet = write_root_worksheet(&self.root_dir, pipeline, &self.run_id)?;

        let command = self.generator_command(pipeline, &worksheet_file, &root_worksheet, backend);
        execute(&command).await?;

        if submit {
            self.submit(pipeline, backend).await?;
        }
        Ok(worksheet_file)
    }
}
