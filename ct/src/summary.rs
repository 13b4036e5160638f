//! Coverage summary parsing
//!
//! Reads the tabular text report printed by the coverage tool:
//!
//! ```text
//! Name            Stmts   Miss Branch BrPart  Cover
//! -------------------------------------------------
//! pkg/__init__.py     4      0      0      0   100%
//! pkg/core.py        96     10     20      5    88%
//! -------------------------------------------------
//! TOTAL             100     10     20      5    88%
//! ```
//!
//! Columns are located by name from the header row, so reports with extra or
//! reordered columns parse the same way.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::ParseError;

/// Leading label of the header row
pub const HEADER_LABEL: &str = "Name";

/// Leading label of the aggregate row
pub const TOTAL_LABEL: &str = "TOTAL";

const MISS_COLUMN: &str = "Miss";
const BRPART_COLUMN: &str = "BrPart";
const STMTS_COLUMN: &str = "Stmts";
const BRANCH_COLUMN: &str = "Branch";

/// Coverage counts for one row of the summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    /// Statements executed at least once (0 when the report has no `Stmts` column)
    pub covered: u64,
    /// Statements never executed
    pub missed: u64,
    /// Branches where only one outcome was exercised
    pub partial: u64,
    /// Total statements, if reported
    pub statements: Option<u64>,
    /// Total branches, if reported
    pub branches: Option<u64>,
}

impl Counts {
    /// Lines left untested: missed statements plus partially covered branches
    pub fn uncovered(&self) -> u64 {
        self.missed.saturating_add(self.partial)
    }
}

/// A parsed coverage summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryReport {
    files: BTreeMap<String, Counts>,
    total: Counts,
}

impl SummaryReport {
    /// Parse the full text of a coverage summary
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut columns: Option<Columns> = None;
        let mut files = BTreeMap::new();

        for line in text.lines() {
            if line.split_whitespace().next() == Some(HEADER_LABEL) {
                columns = Some(Columns::from_header(line, text)?);
                continue;
            }

            if line.starts_with(TOTAL_LABEL) {
                let Some(cols) = columns.as_ref() else {
                    return Err(ParseError::malformed("TOTAL row appears before the header row", text));
                };
                let total = cols
                    .counts(line)
                    .ok_or_else(|| ParseError::malformed(format!("unparsable TOTAL row {:?}", line), text))?;
                debug!(files = files.len(), missed = total.missed, partial = total.partial, "Parsed summary");
                return Ok(Self { files, total });
            }

            if let Some(cols) = columns.as_ref()
                && let Some(name) = line.split_whitespace().next()
                && let Some(counts) = cols.counts(line)
            {
                files.insert(name.to_string(), counts);
            }
        }

        Err(ParseError::malformed(
            format!("no line starts with {:?}", TOTAL_LABEL),
            text,
        ))
    }

    /// Counts from the aggregate row
    pub fn total(&self) -> &Counts {
        &self.total
    }

    /// Per-file counts, keyed by the file name as printed in the report
    pub fn files(&self) -> &BTreeMap<String, Counts> {
        &self.files
    }

    pub fn missed(&self) -> u64 {
        self.total.missed
    }

    pub fn partial(&self) -> u64 {
        self.total.partial
    }

    pub fn uncovered(&self) -> u64 {
        self.total.uncovered()
    }
}

/// Column indices discovered from the header row
#[derive(Debug, Clone)]
struct Columns {
    miss: usize,
    brpart: usize,
    stmts: Option<usize>,
    branch: Option<usize>,
}

impl Columns {
    fn from_header(line: &str, text: &str) -> Result<Self, ParseError> {
        let names: Vec<&str> = line.split_whitespace().collect();
        let find = |label: &str| names.iter().position(|n| *n == label);

        let miss = find(MISS_COLUMN)
            .ok_or_else(|| ParseError::malformed(format!("header has no {:?} column", MISS_COLUMN), text))?;
        let brpart = find(BRPART_COLUMN).ok_or_else(|| ParseError::UnsupportedToolVersion {
            columns: names.iter().map(|n| n.to_string()).collect(),
        })?;

        Ok(Self {
            miss,
            brpart,
            stmts: find(STMTS_COLUMN),
            branch: find(BRANCH_COLUMN),
        })
    }

    /// Read the counts out of a data or aggregate row; `None` if a required cell is missing or not an integer,
    /// or if missed plus partial does not fit in a `u64`
    fn counts(&self, line: &str) -> Option<Counts> {
        let cells: Vec<&str> = line.split_whitespace().collect();
        let cell = |ix: usize| cells.get(ix).and_then(|c| c.parse::<u64>().ok());

        let missed = cell(self.miss)?;
        let partial = cell(self.brpart)?;
        missed.checked_add(partial)?;
        let statements = self.stmts.and_then(cell);
        let branches = self.branch.and_then(cell);

        Some(Counts {
            covered: statements.map(|s| s.saturating_sub(missed)).unwrap_or(0),
            missed,
            partial,
            statements,
            branches,
        })
    }
}
