//! Human-readable verdict text

use std::fmt::Write;

use crate::evaluator::{Evaluation, Progression, Totals};

/// Width of the dashed banner above the verdict
pub const BANNER_WIDTH: usize = 79;

/// Title line printed under the banner
pub const TITLE: &str = "code coverage summary";

/// Render the verdict for one evaluation, ending in a newline
pub fn render(eval: &Evaluation) -> String {
    let mut out = String::new();
    out.push('\n');
    out.push_str(&"-".repeat(BANNER_WIDTH));
    out.push('\n');
    out.push_str(TITLE);
    out.push('\n');

    let headline = match eval.progression {
        Progression::NoPrevious => "There was no previous best code-coverage summary found.",
        Progression::Regressed => "WARNING code coverage regression",
        Progression::Unchanged => "code coverage totals unchanged",
        Progression::Improved => "code coverage improvement!",
    };
    out.push_str(headline);
    out.push('\n');

    if let Some(best) = eval.best {
        push_totals(&mut out, "Previous best coverage", &best);
    }
    push_totals(&mut out, "Current coverage", &eval.current);
    out
}

fn push_totals(out: &mut String, label: &str, totals: &Totals) {
    // writing into a String cannot fail
    let _ = writeln!(
        out,
        "{} left {} total lines untested ({} lines uncovered and {} lines partially covered).",
        label,
        totals.uncovered(),
        totals.missed,
        totals.partial
    );
}
