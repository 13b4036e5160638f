//! Best-ever record persistence
//!
//! Owns the on-disk results directory. Every artifact written into `best/` goes
//! through a temporary file in the same directory followed by a rename, so a
//! reader never sees a half-written file.
//!
//! The store is not safe for concurrent writers: one invocation per results
//! directory at a time.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::summary::SummaryReport;

/// Default name of the results directory, relative to the invocation root
pub const DEFAULT_RESULTS_DIR: &str = ".coverage-results";

/// Default name of the raw instrumentation data file, relative to the invocation root
pub const DEFAULT_DATA_FILE: &str = ".coverage";

const BEST_DIR: &str = "best";
const SUMMARY_FILE: &str = "summary.txt";
const VERSION_STAMP_FILE: &str = "version-stamp.txt";

/// Resolved paths of every artifact the store touches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsLayout {
    pub results_dir: PathBuf,
    pub summary: PathBuf,
    pub version_stamp: PathBuf,
    pub data_file: PathBuf,
    pub best_dir: PathBuf,
    pub best_summary: PathBuf,
    pub best_version_stamp: PathBuf,
    pub best_data_file: PathBuf,
}

impl ResultsLayout {
    /// Resolve the layout under `root`
    pub fn new(root: &Path, results_dir: &Path, data_file: &Path) -> Self {
        let results = root.join(results_dir);
        let best = results.join(BEST_DIR);
        let data = root.join(data_file);
        let data_name = data
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE));

        Self {
            summary: results.join(SUMMARY_FILE),
            version_stamp: results.join(VERSION_STAMP_FILE),
            best_summary: best.join(SUMMARY_FILE),
            best_version_stamp: best.join(VERSION_STAMP_FILE),
            best_data_file: best.join(data_name),
            data_file: data,
            results_dir: results,
            best_dir: best,
        }
    }
}

/// The persisted best-ever summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestRecord {
    pub text: String,
    pub report: SummaryReport,
    pub version_stamp: Option<String>,
}

/// What happened to one companion artifact during a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactOutcome {
    Copied,
    /// The source did not exist; any stale best copy was removed
    Skipped,
    /// The copy failed; the message is reported as a warning
    Failed(String),
}

/// Per-artifact result of [`BestRecordStore::commit_best`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    pub data_file: ArtifactOutcome,
    pub version_stamp: ArtifactOutcome,
}

impl CommitReport {
    /// Warning lines for companion artifacts that failed to copy
    pub fn warnings(&self) -> Vec<String> {
        [("instrumentation data", &self.data_file), ("version stamp", &self.version_stamp)]
            .into_iter()
            .filter_map(|(what, outcome)| match outcome {
                ArtifactOutcome::Failed(msg) => Some(format!("WARNING, failed to copy {} into best record: {}", what, msg)),
                _ => None,
            })
            .collect()
    }
}

/// Reads and replaces the best-ever record
pub struct BestRecordStore {
    layout: ResultsLayout,
}

impl BestRecordStore {
    /// Open the store, creating the results and best directories if absent
    pub fn open(layout: ResultsLayout) -> Result<Self, StoreError> {
        fs::create_dir_all(&layout.best_dir).map_err(|e| StoreError::io(&layout.best_dir, e))?;
        debug!(results_dir = %layout.results_dir.display(), "Opened best-record store");
        Ok(Self { layout })
    }

    /// Wrap an existing layout for reading without creating any directories
    pub fn inspect(layout: ResultsLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ResultsLayout {
        &self.layout
    }

    /// Load the best-ever record; `Ok(None)` if none has been committed yet
    pub fn load_best(&self) -> Result<Option<BestRecord>, StoreError> {
        let path = &self.layout.best_summary;
        if !path.try_exists().map_err(|e| StoreError::io(path, e))? {
            debug!(path = %path.display(), "No best-ever summary");
            return Ok(None);
        }

        let text = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        let report = SummaryReport::parse(&text).map_err(|source| StoreError::Corrupt {
            path: path.clone(),
            source,
        })?;
        let version_stamp = read_stamp(&self.layout.best_version_stamp);

        Ok(Some(BestRecord {
            text,
            report,
            version_stamp,
        }))
    }

    /// Replace the best-ever record with the current run's artifacts
    ///
    /// Companion artifacts are copied first and the summary is written last, so
    /// the summary only ever names a run whose artifacts are already in place.
    /// Only a failure to write the summary itself is returned as an error.
    pub fn commit_best(&self, summary_text: &str) -> Result<CommitReport, StoreError> {
        let data_file = replace_companion(&self.layout.data_file, &self.layout.best_data_file);
        let version_stamp = replace_companion(&self.layout.version_stamp, &self.layout.best_version_stamp);

        atomic_write(&self.layout.best_summary, summary_text.as_bytes())
            .map_err(|e| StoreError::io(&self.layout.best_summary, e))?;

        info!(path = %self.layout.best_summary.display(), "Committed new best-ever summary");
        Ok(CommitReport {
            data_file,
            version_stamp,
        })
    }

    /// Write the current run's summary to its fixed location
    pub fn write_current_summary(&self, text: &str) -> Result<(), StoreError> {
        atomic_write(&self.layout.summary, text.as_bytes()).map_err(|e| StoreError::io(&self.layout.summary, e))
    }

    /// Write the current run's version stamp
    pub fn write_version_stamp(&self, stamp: &str) -> Result<(), StoreError> {
        atomic_write(&self.layout.version_stamp, stamp.as_bytes())
            .map_err(|e| StoreError::io(&self.layout.version_stamp, e))
    }

    /// Delete the best-ever record; returns whether anything was removed
    pub fn reset(&self) -> Result<bool, StoreError> {
        let mut removed = false;
        for path in [
            &self.layout.best_summary,
            &self.layout.best_data_file,
            &self.layout.best_version_stamp,
        ] {
            removed |= remove_if_present(path).map_err(|e| StoreError::io(path, e))?;
        }
        if removed {
            info!(best_dir = %self.layout.best_dir.display(), "Reset best-ever record");
        }
        Ok(removed)
    }
}

/// Copy `src` over `dst` atomically, or drop `dst` if `src` is absent
fn replace_companion(src: &Path, dst: &Path) -> ArtifactOutcome {
    let result = match src.try_exists() {
        Ok(true) => atomic_copy(src, dst).map(|_| ArtifactOutcome::Copied),
        Ok(false) => remove_if_present(dst).map(|_| ArtifactOutcome::Skipped),
        Err(e) => Err(e),
    };

    match result {
        Ok(outcome) => {
            debug!(src = %src.display(), ?outcome, "Replaced companion artifact");
            outcome
        }
        Err(e) => ArtifactOutcome::Failed(format!("{} -> {}: {}", src.display(), dst.display(), e)),
    }
}

/// Read a free-form version stamp; it never invalidates the record it belongs to
fn read_stamp(path: &Path) -> Option<String> {
    match fs::read(path) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable version stamp");
            None
        }
    }
}

fn remove_if_present(path: &Path) -> std::io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Temp file next to `path`; the pid keeps concurrent processes from sharing one
fn temp_path(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!(".{}.tmp.{}", name, std::process::id()))
}

fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    replace_via_temp(path, |tmp| fs::write(tmp, content))
}

fn atomic_copy(src: &Path, dst: &Path) -> std::io::Result<()> {
    replace_via_temp(dst, |tmp| fs::copy(src, tmp).map(|_| ()))
}

/// Fill a temp file next to `dst` with `fill`, then rename it over `dst`; the temp file never outlives a failure
fn replace_via_temp<F>(dst: &Path, fill: F) -> std::io::Result<()>
where
    F: FnOnce(&Path) -> std::io::Result<()>,
{
    let tmp = temp_path(dst);
    let result = fill(&tmp).and_then(|_| fs::rename(&tmp, dst));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}
