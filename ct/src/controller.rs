//! ProgressionController - drives one coverage-progression cycle
//!
//! A host test runner calls the three phases from its own lifecycle hooks:
//!
//! 1. [`ProgressionController::begin_run`] before any test runs
//! 2. [`ProgressionController::record_test_boundary`] around each test
//! 3. [`ProgressionController::finalize_run`] once the run is over
//!
//! Everything a run needs lives in a [`RunContext`] created once per
//! invocation, so independent controllers never share state.

use std::path::{Path, PathBuf};

use tracing::{debug, info, trace, warn};

use crate::error::{ProgressionError, StoreError};
use crate::evaluator::{self, Evaluation, Progression};
use crate::report;
use crate::source::SummarySource;
use crate::store::{BestRecordStore, CommitReport, DEFAULT_DATA_FILE, DEFAULT_RESULTS_DIR, ResultsLayout};
use crate::summary::SummaryReport;

/// Per-invocation settings
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Directory the results layout is resolved against
    pub root: PathBuf,
    /// Results directory, relative to `root`
    pub results_dir: PathBuf,
    /// Raw instrumentation data file, relative to `root`
    pub data_file: PathBuf,
    /// Version stamp to record for this run, if the caller has one
    pub version_stamp: Option<String>,
}

impl RunContext {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            version_stamp: None,
        }
    }

    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    pub fn with_data_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.data_file = file.into();
        self
    }

    pub fn with_version_stamp(mut self, stamp: impl Into<String>) -> Self {
        self.version_stamp = Some(stamp.into());
        self
    }

    pub fn layout(&self) -> ResultsLayout {
        ResultsLayout::new(&self.root, &self.results_dir, &self.data_file)
    }
}

/// A test starting or stopping, as reported by the host runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestBoundary<'a> {
    Start(&'a str),
    Stop(&'a str),
}

/// Everything one finished cycle produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub evaluation: Evaluation,
    /// Verdict text for stdout
    pub message: String,
    /// `WARNING,` lines for stderr
    pub warnings: Vec<String>,
    /// Set when the best-ever record was replaced
    pub committed: Option<CommitReport>,
}

impl RunReport {
    pub fn progression(&self) -> Progression {
        self.evaluation.progression
    }

    /// Whether the run passes; regressions fail unless `fail_on_regression` is off
    pub fn passed(&self, fail_on_regression: bool) -> bool {
        !fail_on_regression || self.progression().is_success()
    }
}

/// Orchestrates parse, evaluate, and commit for one run
pub struct ProgressionController<S: SummarySource> {
    ctx: RunContext,
    store: BestRecordStore,
    source: S,
    tests_seen: usize,
}

impl<S: SummarySource> ProgressionController<S> {
    /// Create a controller, opening (and creating) the results layout
    pub fn new(ctx: RunContext, source: S) -> Result<Self, ProgressionError> {
        debug!(root = %ctx.root.display(), "ProgressionController::new: called");
        let store = BestRecordStore::open(ctx.layout())?;
        Ok(Self {
            ctx,
            store,
            source,
            tests_seen: 0,
        })
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn store(&self) -> &BestRecordStore {
        &self.store
    }

    /// Prepare for a run; records the version stamp if the context carries one
    pub fn begin_run(&mut self) -> Result<(), ProgressionError> {
        self.tests_seen = 0;
        if let Some(stamp) = &self.ctx.version_stamp {
            self.store.write_version_stamp(stamp)?;
            debug!(%stamp, "Recorded version stamp");
        }
        info!(results_dir = %self.store.layout().results_dir.display(), "Coverage run started");
        Ok(())
    }

    /// Observe a test boundary; progression tracking only looks at the end of the run
    pub fn record_test_boundary(&mut self, boundary: TestBoundary<'_>) {
        if let TestBoundary::Stop(_) = boundary {
            self.tests_seen += 1;
        }
        trace!(?boundary, "Test boundary");
    }

    /// Produce, parse, evaluate, and (on improvement) commit the run's summary
    pub fn finalize_run(&mut self) -> Result<RunReport, ProgressionError> {
        debug!(tests = self.tests_seen, "ProgressionController::finalize_run: called");
        let text = self.source.produce()?;
        self.store.write_current_summary(&text)?;

        let current = SummaryReport::parse(&text)?;
        let (best, mut warnings) = self.load_best_tolerant();
        let evaluation = evaluator::evaluate(&current, best.as_ref());

        let committed = if evaluation.progression.should_commit() {
            let commit = self.store.commit_best(&text)?;
            warnings.extend(commit.warnings());
            Some(commit)
        } else {
            None
        };

        for line in &warnings {
            warn!("{}", line);
        }
        info!(
            progression = %evaluation.progression,
            missed = evaluation.current.missed,
            partial = evaluation.current.partial,
            committed = committed.is_some(),
            "Coverage run finished"
        );

        Ok(RunReport {
            message: report::render(&evaluation),
            evaluation,
            warnings,
            committed,
        })
    }

    /// Evaluate the source's summary against the best record without writing anything
    pub fn compare(&mut self) -> Result<RunReport, ProgressionError> {
        let text = self.source.produce()?;
        let current = SummaryReport::parse(&text)?;
        let (best, warnings) = self.load_best_tolerant();
        let evaluation = evaluator::evaluate(&current, best.as_ref());

        Ok(RunReport {
            message: report::render(&evaluation),
            evaluation,
            warnings,
            committed: None,
        })
    }

    /// Load the best record; any failure becomes a warning and reads as "no previous best"
    fn load_best_tolerant(&self) -> (Option<SummaryReport>, Vec<String>) {
        match self.store.load_best() {
            Ok(best) => (best.map(|b| b.report), Vec::new()),
            Err(e @ StoreError::Corrupt { .. }) => (
                None,
                vec![format!(
                    "WARNING, could not parse best-ever summary file, ignoring it for this run: {}",
                    e
                )],
            ),
            Err(e @ StoreError::Io { .. }) => (
                None,
                vec![format!(
                    "WARNING, could not read best-ever summary file, ignoring it for this run: {}",
                    e
                )],
            ),
        }
    }
}
