//! Functions and structs for locating and running external tools

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use log::{info, warn};
use tokio::process::Command;

use crate::config::defs::{PipelineError, CURL_TAG, WGET_TAG};

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

/// Locates an executable like the unix `which` command.
/// A program containing a path separator is checked as given.
pub fn which(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|path| is_executable(path))
}

/// Fails on the first tool missing from PATH.
pub fn check_prerequisites(tools: &[&str]) -> Result<(), PipelineError> {
    for tool in tools {
        if which(tool).is_none() {
            return Err(PipelineError::MissingTool(tool.to_string()));
        }
    }
    Ok(())
}

/// A program invocation with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
    /// A non-zero exit aborts instead of logging a warning.
    pub must_succeed: bool,
}

impl ShellCommand {
    pub fn new<S: Into<String>>(program: S) -> Self {
        ShellCommand {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            must_succeed: false,
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn must_succeed(mut self) -> Self {
        self.must_succeed = true;
        self
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Runs a command to completion.
///
/// # Arguments
///
/// * `cmd` - Command to run; `must_succeed` decides whether a non-zero exit is fatal.
///
/// # Returns
/// The exit code (`-1` when terminated by a signal). Failing to start the program is always an error.
pub async fn execute(cmd: &ShellCommand) -> Result<i32, PipelineError> {
    info!("Running: {}", cmd);
    let mut command = Command::new(&cmd.program);
    command
        .args(&cmd.args)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    if let Some(dir) = &cmd.current_dir {
        command.current_dir(dir);
    }

    let status = command
        .status()
        .await
        .map_err(|e| PipelineError::ToolExecution {
            tool: cmd.program.clone(),
            error: format!("Failed to spawn: {}. Is {} installed?", e, cmd.program),
        })?;

    let code = status.code().unwrap_or(-1);
    if !status.success() {
        if cmd.must_succeed {
            return Err(PipelineError::ToolExecution {
                tool: cmd.program.clone(),
                error: format!("{} exited with {}", cmd, code),
            });
        }
        warn!("Non zero code returned when running: {}", cmd);
    }
    Ok(code)
}

/// Download utility found on the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Downloader {
    Wget,
    Curl,
}

impl Downloader {
    /// Prefers wget, then curl.
    pub fn detect() -> Result<Self, PipelineError> {
        if which(WGET_TAG).is_some() {
            Ok(Downloader::Wget)
        } else if which(CURL_TAG).is_some() {
            Ok(Downloader::Curl)
        } else {
            Err(PipelineError::NoDownloader(vec![WGET_TAG.to_string(), CURL_TAG.to_string()]))
        }
    }

    pub fn command(&self, link: &str, output: &Path) -> ShellCommand {
        let output = output.to_string_lossy().into_owned();
        let cmd = match self {
            Downloader::Wget => ShellCommand::new(WGET_TAG).args(["-O".to_string(), output, link.to_string()]),
            Downloader::Curl => {
                ShellCommand::new(CURL_TAG).args(["-L".to_string(), "-o".to_string(), output, link.to_string()])
            }
        };
        cmd.must_succeed()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_which_finds_shell() {
        assert!(which("sh").is_some());
        assert!(which("definitely-not-a-real-tool-1f2e").is_none());
    }

    #[test]
    fn test_missing_prerequisite() {
        let err = check_prerequisites(&["sh", "definitely-not-a-real-tool-1f2e"]).unwrap_err();
        assert!(matches!(err, PipelineError::MissingTool(ref t) if t == "definitely-not-a-real-tool-1f2e"));
    }

    #[test]
    fn test_download_commands() {
        let wget = Downloader::Wget.command("http://host/a.tgz", Path::new("tools/a.tgz"));
        assert_eq!(wget.to_string(), "wget -O tools/a.tgz http://host/a.tgz");
        assert!(wget.must_succeed);

        let curl = Downloader::Curl.command("http://host/a.tgz", Path::new("a.tgz"));
        assert_eq!(curl.to_string(), "curl -L -o a.tgz http://host/a.tgz");
    }

    #[tokio::test]
    async fn test_execute_exit_codes() -> anyhow::Result<()> {
        let ok = ShellCommand::new("sh").args(["-c", "exit 0"]);
        assert_eq!(execute(&ok).await?, 0);

        let soft_fail = ShellCommand::new("sh").args(["-c", "exit 3"]);
        assert_eq!(execute(&soft_fail).await?, 3);

        let hard_fail = soft_fail.clone().must_succeed();
        assert!(execute(&hard_fail).await.is_err());

        let missing = ShellCommand::new("definitely-not-a-real-tool-1f2e");
        assert!(execute(&missing).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_execute_in_directory() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let cmd = ShellCommand::new("sh")
            .args(["-c", "touch created.txt"])
            .current_dir(dir.path())
            .must_succeed();
        execute(&cmd).await?;
        assert!(dir.path().join("created.txt").exists());
        Ok(())
    }
}
