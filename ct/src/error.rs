//! Error types for covtrack

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while parsing a coverage summary
#[derive(Debug, Error)]
pub enum ParseError {
    /// The header has no `BrPart` column, so the coverage tool does not report branch coverage
    #[error("Summary header has no BrPart column (columns: {columns:?})")]
    UnsupportedToolVersion { columns: Vec<String> },

    #[error("Malformed summary ({reason}); full summary text was {text:?}")]
    MalformedSummary { reason: String, text: String },
}

impl ParseError {
    pub(crate) fn malformed(reason: impl Into<String>, text: &str) -> Self {
        ParseError::MalformedSummary {
            reason: reason.into(),
            text: text.to_string(),
        }
    }

    /// The single-line diagnostic written to stderr for this failure
    pub fn diagnostic(&self) -> String {
        match self {
            ParseError::UnsupportedToolVersion { .. } => "ERROR, this tool requires a coverage report with branch \
                 coverage (a BrPart column); upgrade the coverage tool or enable branch measurement."
                .to_string(),
            ParseError::MalformedSummary { .. } => format!("ERROR, {}", self),
        }
    }
}

/// Errors raised by the best-record store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Best-ever summary {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised while obtaining the raw summary text
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read summary from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to run summary command `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Summary command `{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Summary command produced non-UTF-8 output")]
    NotUtf8,
}

/// Fatal errors that abort a progression cycle
#[derive(Debug, Error)]
pub enum ProgressionError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl ProgressionError {
    /// Check if this failure means the coverage tool cannot report branch coverage
    pub fn is_unsupported_tool(&self) -> bool {
        matches!(self, ProgressionError::Parse(ParseError::UnsupportedToolVersion { .. }))
    }
}
