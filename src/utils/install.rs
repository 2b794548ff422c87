// src/utils/install.rs: turning declarative install steps into filesystem operations and commands

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::defs::{
    InstallStep, PipelineError, ToolSpec, CHMOD_TAG, IMPUTATION_TOOLS, INSTALL_PREREQUISITES, MAKE_TAG, TAR_TAG,
    UNZIP_TAG,
};
use crate::utils::command::{check_prerequisites, execute, Downloader, ShellCommand};
use crate::utils::file::mkdir;

/// Everything an install step may refer to.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallParams {
    /// Directory the installation happens in. Expected to exist.
    pub target_dir: PathBuf,
    /// Directory of the tool, created under `target_dir`.
    pub tool_dir: Option<String>,
    /// Downloaded file, usually an archive.
    pub filename: String,
    pub link: String,
    /// Directory to return to once done.
    pub working_dir: PathBuf,
}

impl InstallParams {
    pub fn for_tool(tool: &ToolSpec, target_dir: &Path, working_dir: &Path) -> Self {
        InstallParams {
            target_dir: target_dir.to_path_buf(),
            tool_dir: tool.dir.map(str::to_string),
            filename: tool.file.to_string(),
            link: tool.link.to_string(),
            working_dir: working_dir.to_path_buf(),
        }
    }

    fn tool_dir(&self, step: InstallStep) -> Result<&str, PipelineError> {
        self.tool_dir.as_deref().ok_or_else(|| {
            PipelineError::InvalidConfig(format!(
                "Install step {} needs a tool directory for {}",
                step, self.filename
            ))
        })
    }
}

/// A concrete installation operation. Relative paths resolve against the tracked directory.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    ChangeDir(PathBuf),
    CreateDir(PathBuf),
    Rename { from: PathBuf, to: PathBuf },
    AssertFile(PathBuf),
    Run(ShellCommand),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::ChangeDir(p) => write!(f, "cd {}", p.display()),
            Operation::CreateDir(p) => write!(f, "mkdir {}", p.display()),
            Operation::Rename { from, to } => write!(f, "mv {} {}", from.display(), to.display()),
            Operation::AssertFile(p) => write!(f, "check {}", p.display()),
            Operation::Run(cmd) => write!(f, "{}", cmd),
        }
    }
}

fn path_string(path: PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

/// Translates install steps into operations.
///
/// # Arguments
///
/// * `steps` - Install steps, in order.
/// * `params` - Directories, file and link the steps refer to.
/// * `downloader` - Required only when a step downloads.
///
/// # Returns
/// Operations in execution order.
pub fn plan(
    steps: &[InstallStep],
    params: &InstallParams,
    downloader: Option<Downloader>,
) -> Result<Vec<Operation>, PipelineError> {
    let download = |output: PathBuf| -> Result<Operation, PipelineError> {
        let downloader = downloader.ok_or_else(|| {
            PipelineError::InvalidConfig(format!("No download tool selected for {}", params.link))
        })?;
        Ok(Operation::Run(downloader.command(&params.link, &output)))
    };

    let mut ops = Vec::new();
    for &step in steps {
        match step {
            InstallStep::CdTargetDirectory => ops.push(Operation::ChangeDir(params.target_dir.clone())),
            InstallStep::CdToolDirectory => ops.push(Operation::ChangeDir(PathBuf::from(params.tool_dir(step)?))),
            InstallStep::CdWorkingDirectory => ops.push(Operation::ChangeDir(params.working_dir.clone())),
            InstallStep::Mkdir => ops.push(Operation::CreateDir(PathBuf::from(params.tool_dir(step)?))),
            InstallStep::Download => ops.push(download(PathBuf::from(&params.filename))?),
            InstallStep::DownloadInDirectory => {
                ops.push(download(Path::new(params.tool_dir(step)?).join(&params.filename))?)
            }
            InstallStep::Untar => ops.push(Operation::Run(
                ShellCommand::new(TAR_TAG).args(["zxvf", params.filename.as_str()]).must_succeed(),
            )),
            InstallStep::UntarInDirectory => {
                let tool_dir = params.tool_dir(step)?;
                let archive = path_string(Path::new(tool_dir).join(&params.filename));
                ops.push(Operation::Run(
                    ShellCommand::new(TAR_TAG).args(["zxvf", archive.as_str(), "-C", tool_dir]).must_succeed(),
                ));
            }
            InstallStep::Unzip => ops.push(Operation::Run(
                ShellCommand::new(UNZIP_TAG).arg(params.filename.as_str()).must_succeed(),
            )),
            InstallStep::Move => ops.push(Operation::Rename {
                from: PathBuf::from(&params.filename),
                to: Path::new(params.tool_dir(step)?).join(&params.filename),
            }),
            InstallStep::MakeExecutableInDirectory => {
                let executable = path_string(Path::new(params.tool_dir(step)?).join(&params.filename));
                ops.push(Operation::Run(
                    ShellCommand::new(CHMOD_TAG).args(["a+x", executable.as_str()]).must_succeed(),
                ));
            }
            InstallStep::Make => {
                ops.push(Operation::ChangeDir(PathBuf::from(params.tool_dir(step)?)));
                ops.push(Operation::Run(ShellCommand::new(MAKE_TAG).must_succeed()));
                ops.push(Operation::ChangeDir(PathBuf::from("..")));
            }
            InstallStep::CheckFileExists => ops.push(Operation::AssertFile(PathBuf::from(&params.filename))),
        }
    }
    Ok(ops)
}

/// Runs operations in order, stopping at the first failure.
/// The tracked directory starts at `start_dir`; the process working directory is left alone.
pub async fn run_operations(ops: &[Operation], start_dir: &Path) -> Result<(), PipelineError> {
    let mut current = start_dir.to_path_buf();
    for op in ops {
        debug!("[{}] {}", current.display(), op);
        match op {
            Operation::ChangeDir(dir) => {
                let next = current.join(dir);
                if !next.is_dir() {
                    return Err(PipelineError::FileNotFound(next));
                }
                current = next;
            }
            Operation::CreateDir(dir) => mkdir(&current.join(dir), true)?,
            Operation::Rename { from, to } => fs::rename(current.join(from), current.join(to))?,
            Operation::AssertFile(file) => {
                let path = current.join(file);
                if !path.is_file() {
                    return Err(PipelineError::FileNotFound(path));
                }
            }
            Operation::Run(cmd) => {
                execute(&cmd.clone().current_dir(&current)).await?;
            }
        }
    }
    Ok(())
}

/// Installs a tool or dataset following its install steps.
pub async fn install(steps: &[InstallStep], params: &InstallParams) -> Result<(), PipelineError> {
    let needs_download = steps
        .iter()
        .any(|s| matches!(s, InstallStep::Download | InstallStep::DownloadInDirectory));
    let downloader = if needs_download { Some(Downloader::detect()?) } else { None };

    let ops = plan(steps, params, downloader)?;
    run_operations(&ops, &params.working_dir).await
}

/// Downloads and installs every tool the pipelines need into `tools_dir`.
pub async fn install_imputation_tools(tools_dir: &Path, working_dir: &Path) -> Result<(), PipelineError> {
    mkdir(tools_dir, true)?;
    check_prerequisites(INSTALL_PREREQUISITES)?;
    Downloader::detect()?;

    for tool in IMPUTATION_TOOLS {
        info!("Installing {}", tool.name);
        install(tool.install_steps, &InstallParams::for_tool(tool, tools_dir, working_dir)).await?;
    }
    Ok(())
}
