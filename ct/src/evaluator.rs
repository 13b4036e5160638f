//! Progression evaluation
//!
//! Compares a fresh summary against the best-ever summary. The comparison is a
//! two-dimensional dominance check over (uncovered total, missed statements),
//! not a single scalar: trading missed statements for partial branches without
//! growing the total still counts as an improvement.

use std::fmt;

use crate::summary::SummaryReport;

/// Outcome of comparing a run against the best-ever record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Progression {
    /// No best-ever record exists yet
    NoPrevious,
    /// More lines left untested than the best record
    Regressed,
    /// Exactly the same totals as the best record
    Unchanged,
    /// No worse on both dimensions and not identical
    Improved,
}

impl Progression {
    /// Whether the run should count as passing; only a regression fails
    pub fn is_success(&self) -> bool {
        !matches!(self, Progression::Regressed)
    }

    /// Whether this outcome replaces the best-ever record
    pub fn should_commit(&self) -> bool {
        matches!(self, Progression::NoPrevious | Progression::Improved)
    }
}

impl fmt::Display for Progression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Progression::NoPrevious => "no-previous",
            Progression::Regressed => "regressed",
            Progression::Unchanged => "unchanged",
            Progression::Improved => "improved",
        };
        write!(f, "{}", s)
    }
}

/// The two aggregate numbers the comparison looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub missed: u64,
    pub partial: u64,
}

impl Totals {
    pub fn uncovered(&self) -> u64 {
        self.missed.saturating_add(self.partial)
    }
}

impl From<&SummaryReport> for Totals {
    fn from(report: &SummaryReport) -> Self {
        Self {
            missed: report.missed(),
            partial: report.partial(),
        }
    }
}

/// Result of one evaluation, with the raw numbers kept for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub progression: Progression,
    pub current: Totals,
    pub best: Option<Totals>,
}

/// Classify `current` against the best-ever report, if any
pub fn evaluate(current: &SummaryReport, best: Option<&SummaryReport>) -> Evaluation {
    compare(Totals::from(current), best.map(Totals::from))
}

/// Classify raw totals
pub fn compare(current: Totals, best: Option<Totals>) -> Evaluation {
    let progression = match best {
        None => Progression::NoPrevious,
        Some(best) => {
            let cur_total = current.uncovered();
            let best_total = best.uncovered();
            if cur_total == best_total && current.missed == best.missed {
                Progression::Unchanged
            } else if cur_total <= best_total && current.missed <= best.missed {
                Progression::Improved
            } else {
                Progression::Regressed
            }
        }
    };

    Evaluation {
        progression,
        current,
        best,
    }
}
