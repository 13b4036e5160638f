//! covtrack - coverage progression tracking
//!
//! Parses the text summary printed by a coverage tool, compares its totals
//! with the best-ever run, and records the run as the new best when coverage
//! did not get worse.
//!
//! # Layout
//!
//! ```text
//! .coverage-results/
//! ├── summary.txt          # current run, overwritten every run
//! ├── version-stamp.txt    # current run (optional)
//! └── best/
//!     ├── .coverage        # best run's raw instrumentation data (optional)
//!     ├── summary.txt      # best run, replaced only on improvement
//!     └── version-stamp.txt
//! .coverage                # current run's raw instrumentation data
//! ```
//!
//! Only one invocation may use a results directory at a time.
//!
//! # Example
//!
//! ```ignore
//! use covtrack::{InlineSummary, ProgressionController, RunContext};
//!
//! let mut controller = ProgressionController::new(RunContext::new("."), InlineSummary(text))?;
//! controller.begin_run()?;
//! // ... tests run ...
//! let report = controller.finalize_run()?;
//! print!("{}", report.message);
//! ```

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod evaluator;
pub mod preload;
pub mod report;
pub mod source;
pub mod store;
pub mod summary;

pub use controller::{ProgressionController, RunContext, RunReport, TestBoundary};
pub use error::{ParseError, ProgressionError, SourceError, StoreError};
pub use evaluator::{Evaluation, Progression, Totals, evaluate};
pub use preload::{LoadFailure, ModuleLoader, PreloadReport, discover_modules, preload_modules};
pub use source::{CommandSummary, FileSummary, InlineSummary, SummarySource};
pub use store::{ArtifactOutcome, BestRecord, BestRecordStore, CommitReport, ResultsLayout};
pub use summary::{Counts, SummaryReport};
