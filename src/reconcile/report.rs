use std::fmt;

use serde::Serialize;

use crate::aggregate::Tally;
use crate::model::{Occurrence, PayoutRecord, ReviewerId};

/// Which persisted table a finding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Detail,
    Summary,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Detail => write!(f, "detail"),
            View::Summary => write!(f, "summary"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Correct,
    Incorrect,
    Total,
    CorrectCount,
    IncorrectCount,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Correct => write!(f, "correct amount"),
            Field::Incorrect => write!(f, "incorrect amount"),
            Field::Total => write!(f, "total"),
            Field::CorrectCount => write!(f, "correct count"),
            Field::IncorrectCount => write!(f, "incorrect count"),
        }
    }
}

/// One field whose persisted value disagrees with the source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDelta {
    pub field: Field,
    pub expected: f64,
    pub persisted: f64,
}

/// A discrepancy between persisted output and the source workbook.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// Key present on both sides with differing fields.
    Mismatch {
        view: View,
        key: String,
        line: u64,
        deltas: Vec<FieldDelta>,
        occurrences: Vec<Occurrence>,
    },
    /// Key derived from the source but absent from the persisted table.
    Missing {
        view: View,
        key: String,
        expected: Tally,
        occurrences: Vec<Occurrence>,
    },
    /// Key in the persisted table that the source never produces.
    Extra { view: View, record: PayoutRecord },
    /// Key written more than once in the same table.
    Duplicate {
        view: View,
        key: String,
        lines: Vec<u64>,
    },
    /// Detail and summary tables disagree on the grand total.
    CrossTotal { detail_total: f64, summary_total: f64 },
    /// Summary counts do not add up to the number of list-cell evaluations.
    CountTotal { counted: u64, evaluated: u64 },
}

/// An identifier that shows up in more than one list cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReusedIdentifier {
    pub id: ReviewerId,
    pub occurrences: Vec<Occurrence>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconStats {
    pub rows_read: usize,
    pub skipped_rows: Vec<u32>,
    pub source_identifiers: usize,
    pub detail_records: Option<usize>,
    pub summary_records: Option<usize>,
    /// Totals re-derived from the source.
    pub totals: Tally,
}

/// Outcome of a reconciliation pass. Findings are exhaustive; an empty list
/// means the persisted output is consistent with the source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconReport {
    pub findings: Vec<Finding>,
    pub reused: Vec<ReusedIdentifier>,
    pub notes: Vec<String>,
    pub stats: ReconStats,
}

impl ReconReport {
    pub fn passed(&self) -> bool {
        self.findings.is_empty()
    }
}

const RULE: &str =
    "================================================================================";

impl fmt::Display for ReconReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.stats;
        writeln!(f, "{RULE}")?;
        writeln!(f, "Reconciliation report")?;
        writeln!(f, "{RULE}")?;
        writeln!(
            f,
            "rows read: {}, skipped for non-numeric rates: {}",
            stats.rows_read,
            stats.skipped_rows.len()
        )?;
        if !stats.skipped_rows.is_empty() {
            let rows: Vec<String> = stats.skipped_rows.iter().map(u32::to_string).collect();
            writeln!(f, "  skipped rows: {}", rows.join(", "))?;
        }
        writeln!(f, "identifiers in source: {}", stats.source_identifiers)?;
        if let Some(count) = stats.detail_records {
            writeln!(f, "detail records checked: {count}")?;
        }
        if let Some(count) = stats.summary_records {
            writeln!(f, "summary records checked: {count}")?;
        }
        for note in &self.notes {
            writeln!(f, "note: {note}")?;
        }
        writeln!(f)?;

        if self.passed() {
            writeln!(f, "[OK] all records match the source")?;
            let totals = &stats.totals;
            writeln!(f, "  total correct amount:   {:.2}", totals.correct)?;
            writeln!(f, "  total incorrect amount: {:.2}", totals.incorrect)?;
            writeln!(f, "  total amount:           {:.2}", totals.total())?;
            writeln!(f, "  correct evaluations:    {}", totals.counts.correct)?;
            writeln!(f, "  incorrect evaluations:  {}", totals.counts.incorrect)?;
            writeln!(f, "  all evaluations:        {}", totals.counts.total())?;
        } else {
            writeln!(f, "[ERROR] {} finding(s)", self.findings.len())?;
            for (index, finding) in self.findings.iter().enumerate() {
                writeln!(f)?;
                writeln!(f, "--- finding {} ---", index + 1)?;
                write!(f, "{finding}")?;
            }
        }

        if !self.reused.is_empty() {
            writeln!(f)?;
            writeln!(f, "{RULE}")?;
            writeln!(
                f,
                "{} identifier(s) used in more than one list cell",
                self.reused.len()
            )?;
            writeln!(f, "{RULE}")?;
            let mut repeats = 0;
            for reused in &self.reused {
                writeln!(f, "{} ({} uses)", reused.id, reused.occurrences.len())?;
                for occurrence in &reused.occurrences {
                    writeln!(f, "  - {occurrence}")?;
                }
                repeats += reused.occurrences.len() - 1;
            }
            writeln!(f, "repeat uses: {repeats}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::Mismatch {
                view,
                key,
                line,
                deltas,
                occurrences,
            } => {
                writeln!(f, "{view} {key} (line {line}): values differ from source")?;
                for delta in deltas {
                    writeln!(
                        f,
                        "  {}: source {:.2}, persisted {:.2} (diff {:+.2})",
                        delta.field,
                        delta.expected,
                        delta.persisted,
                        delta.persisted - delta.expected
                    )?;
                }
                write_trail(f, occurrences)
            }
            Finding::Missing {
                view,
                key,
                expected,
                occurrences,
            } => {
                writeln!(f, "{view} {key}: in source but missing from output")?;
                writeln!(
                    f,
                    "  expected: correct {:.2} ({}), incorrect {:.2} ({}), total {:.2}",
                    expected.correct,
                    expected.counts.correct,
                    expected.incorrect,
                    expected.counts.incorrect,
                    expected.total()
                )?;
                write_trail(f, occurrences)
            }
            Finding::Extra { view, record } => {
                writeln!(
                    f,
                    "{view} {} (line {}): in output but not in source",
                    record.key, record.line
                )?;
                write!(
                    f,
                    "  persisted: correct {:.2}, incorrect {:.2}, total {:.2}",
                    record.correct, record.incorrect, record.total
                )?;
                if let Some(counts) = record.counts {
                    write!(f, ", counts {}/{}", counts.correct, counts.incorrect)?;
                }
                writeln!(f)
            }
            Finding::Duplicate { view, key, lines } => {
                let lines: Vec<String> = lines.iter().map(u64::to_string).collect();
                writeln!(f, "{view} {key}: written more than once (lines {})", lines.join(", "))
            }
            Finding::CrossTotal {
                detail_total,
                summary_total,
            } => writeln!(
                f,
                "grand totals differ: detail {detail_total:.2}, summary {summary_total:.2} (diff {:+.2})",
                summary_total - detail_total
            ),
            Finding::CountTotal { counted, evaluated } => writeln!(
                f,
                "summary counts add up to {counted}, but the source has {evaluated} list-cell evaluations"
            ),
        }
    }
}

fn write_trail(f: &mut fmt::Formatter<'_>, occurrences: &[Occurrence]) -> fmt::Result {
    if occurrences.is_empty() {
        return Ok(());
    }
    writeln!(f, "  source trail ({} occurrence(s)):", occurrences.len())?;
    for occurrence in occurrences {
        writeln!(f, "    - {occurrence}")?;
    }
    Ok(())
}
