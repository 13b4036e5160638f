//! Where the raw summary text comes from
//!
//! The coverage tool that renders the summary is an external collaborator. A
//! [`SummarySource`] hands its text to the controller, which then writes it to
//! the fixed summary location before parsing.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::SourceError;

/// Path value meaning "read from stdin"
pub const STDIN_PATH: &str = "-";

/// Produces the text of the current run's coverage summary
pub trait SummarySource {
    fn produce(&mut self) -> Result<String, SourceError>;
}

/// Summary text already in hand
#[derive(Debug, Clone)]
pub struct InlineSummary(pub String);

impl SummarySource for InlineSummary {
    fn produce(&mut self) -> Result<String, SourceError> {
        Ok(self.0.clone())
    }
}

/// Summary read from a file, or from stdin when the path is `-`
#[derive(Debug, Clone)]
pub struct FileSummary {
    path: PathBuf,
}

impl FileSummary {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SummarySource for FileSummary {
    fn produce(&mut self) -> Result<String, SourceError> {
        let label = self.path.display().to_string();
        let text = if self.path.as_os_str() == STDIN_PATH {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|source| SourceError::Read { path: label, source })?;
            buf
        } else {
            std::fs::read_to_string(&self.path).map_err(|source| SourceError::Read { path: label, source })?
        };
        Ok(text)
    }
}

/// Summary printed on stdout by an external report command, e.g. `coverage report`
#[derive(Debug, Clone)]
pub struct CommandSummary {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl CommandSummary {
    /// Build from a full command line split into words; `None` if `argv` is empty
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            current_dir: None,
        })
    }

    /// Run the command in `dir` instead of the process working directory
    pub fn in_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl SummarySource for CommandSummary {
    fn produce(&mut self) -> Result<String, SourceError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }

        debug!(command = %self.display(), "Running summary command");
        let output = cmd.output().map_err(|source| SourceError::Spawn {
            command: self.display(),
            source,
        })?;

        if !output.status.success() {
            return Err(SourceError::CommandFailed {
                command: self.display(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| SourceError::NotUtf8)
    }
}
