//! Integration tests for the progression cycle
//!
//! These drive the public API end to end against a temporary results directory.

use std::fs;

use covtrack::{
    InlineSummary, ParseError, Progression, ProgressionController, ProgressionError, RunContext, SummaryReport,
};
use proptest::prelude::*;
use tempfile::TempDir;

const HEADER: &str = "Name Stmts Miss Branch BrPart Cover";

fn summary(missed: u64, partial: u64) -> String {
    format!(
        "{}\n------------------------------------\npkg/core.py 100 {} 20 {} 80%\n------------------------------------\nTOTAL 100 {} 20 {} 80%\n",
        HEADER, missed, partial, missed, partial
    )
}

fn finalize(temp: &TempDir, text: &str) -> Result<covtrack::RunReport, ProgressionError> {
    let mut controller = ProgressionController::new(RunContext::new(temp.path()), InlineSummary(text.to_string()))?;
    controller.begin_run()?;
    controller.finalize_run()
}

fn best_text(temp: &TempDir) -> Option<String> {
    fs::read_to_string(temp.path().join(".coverage-results/best/summary.txt")).ok()
}

// =============================================================================
// Parsing
// =============================================================================

#[test]
fn test_scenario_a_parse_totals() {
    let text = format!("{}\nTOTAL 100 10 20 5 88%\n", HEADER);
    let report = SummaryReport::parse(&text).expect("scenario A parses");
    assert_eq!(report.missed(), 10);
    assert_eq!(report.partial(), 5);
    assert_eq!(report.uncovered(), 15);
}

#[test]
fn test_scenario_e_missing_brpart() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let text = "Name Stmts Miss Branch Cover\nTOTAL 100 10 20 88%\n";

    let err = finalize(&temp, text).unwrap_err();
    assert!(matches!(
        err,
        ProgressionError::Parse(ParseError::UnsupportedToolVersion { .. })
    ));
    assert!(best_text(&temp).is_none(), "no evaluation or commit should happen");
}

// =============================================================================
// Progression
// =============================================================================

#[test]
fn test_scenario_b_first_run_becomes_best() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let text = summary(10, 5);

    let report = finalize(&temp, &text).unwrap();
    assert_eq!(report.progression(), Progression::NoPrevious);
    assert_eq!(best_text(&temp).as_deref(), Some(text.as_str()));
}

#[test]
fn test_scenario_c_improvement_replaces_best() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    finalize(&temp, &summary(10, 5)).unwrap();

    let better = summary(8, 5);
    let report = finalize(&temp, &better).unwrap();
    assert_eq!(report.progression(), Progression::Improved);
    assert_eq!(report.evaluation.current.uncovered(), 13);
    assert_eq!(best_text(&temp).as_deref(), Some(better.as_str()));
    assert!(report.message.contains("code coverage improvement!"));
}

#[test]
fn test_scenario_d_regression_keeps_best_bytes() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    finalize(&temp, &summary(10, 5)).unwrap();
    let before = fs::read(temp.path().join(".coverage-results/best/summary.txt")).unwrap();

    let report = finalize(&temp, &summary(12, 5)).unwrap();
    assert_eq!(report.progression(), Progression::Regressed);
    assert!(!report.passed(true));
    assert!(report.message.contains("WARNING code coverage regression"));
    assert!(report.message.contains("Current coverage left 17 total lines untested"));

    let after = fs::read(temp.path().join(".coverage-results/best/summary.txt")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_unchanged_does_not_commit() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let first = summary(10, 5);
    finalize(&temp, &first).unwrap();

    // same totals, different per-file text
    let same_totals = format!("{}\nother.py 1 10 1 5 0%\nTOTAL 100 10 20 5 88%\n", HEADER);
    let report = finalize(&temp, &same_totals).unwrap();
    assert_eq!(report.progression(), Progression::Unchanged);
    assert!(report.committed.is_none());
    assert_eq!(best_text(&temp).as_deref(), Some(first.as_str()));
}

#[test]
fn test_instrumentation_data_follows_best() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    fs::write(temp.path().join(".coverage"), b"run-1").unwrap();
    finalize(&temp, &summary(10, 5)).unwrap();

    fs::write(temp.path().join(".coverage"), b"run-2").unwrap();
    finalize(&temp, &summary(11, 5)).unwrap();
    assert_eq!(fs::read(temp.path().join(".coverage-results/best/.coverage")).unwrap(), b"run-1");

    fs::write(temp.path().join(".coverage"), b"run-3").unwrap();
    finalize(&temp, &summary(9, 5)).unwrap();
    assert_eq!(fs::read(temp.path().join(".coverage-results/best/.coverage")).unwrap(), b"run-3");
}

#[test]
fn test_non_utf8_best_stamp_does_not_drop_best() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let best = summary(10, 5);
    finalize(&temp, &best).unwrap();
    fs::write(temp.path().join(".coverage-results/best/version-stamp.txt"), b"rev-\xff\xfe").unwrap();

    let report = finalize(&temp, &summary(12, 5)).unwrap();
    assert_eq!(report.progression(), Progression::Regressed);
    assert!(report.warnings.is_empty());
    assert_eq!(best_text(&temp).as_deref(), Some(best.as_str()));
}

#[test]
fn test_overflowing_totals_are_malformed_not_a_panic() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let text = format!("{}\nTOTAL 100 18446744073709551615 20 1 0%\n", HEADER);

    let err = finalize(&temp, &text).unwrap_err();
    assert!(matches!(
        err,
        ProgressionError::Parse(ParseError::MalformedSummary { .. })
    ));
    assert!(best_text(&temp).is_none());
}

#[test]
fn test_independent_contexts_do_not_share_history() {
    let a = TempDir::new().expect("Failed to create temp dir");
    let b = TempDir::new().expect("Failed to create temp dir");

    finalize(&a, &summary(10, 5)).unwrap();
    let report = finalize(&b, &summary(50, 5)).unwrap();
    assert_eq!(report.progression(), Progression::NoPrevious);
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_parse_is_deterministic(missed in 0u64..100_000, partial in 0u64..100_000) {
        let text = summary(missed, partial);
        let first = SummaryReport::parse(&text).unwrap();
        let second = SummaryReport::parse(&text).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.uncovered(), missed + partial);
    }

    #[test]
    fn prop_missing_brpart_always_unsupported(rows in proptest::collection::vec("[a-z]{1,8}\\.py [0-9]{1,3} [0-9]{1,3}", 0..5)) {
        let mut text = String::from("Name Stmts Miss Cover\n");
        for row in &rows {
            text.push_str(row);
            text.push('\n');
        }
        text.push_str("TOTAL 10 1 90%\n");
        let is_unsupported = matches!(
            SummaryReport::parse(&text),
            Err(ParseError::UnsupportedToolVersion { .. })
        );
        prop_assert!(is_unsupported);
    }

    #[test]
    fn prop_dominance_rule(cm in 0u64..50, cp in 0u64..50, bm in 0u64..50, bp in 0u64..50) {
        let current = SummaryReport::parse(&summary(cm, cp)).unwrap();
        let best = SummaryReport::parse(&summary(bm, bp)).unwrap();
        let progression = covtrack::evaluate(&current, Some(&best)).progression;

        let expected = if cm + cp == bm + bp && cm == bm {
            Progression::Unchanged
        } else if cm + cp <= bm + bp && cm <= bm {
            Progression::Improved
        } else {
            Progression::Regressed
        };
        prop_assert_eq!(progression, expected);
    }
}
