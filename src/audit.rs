//! Per-problem reviewer-count check.

use std::fmt;

use serde::Serialize;

use crate::identity::IdentityParser;
use crate::model::{ReviewerId, SourceRow};

/// A problem whose list cells hold a different number of reviewers than
/// expected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotAnomaly {
    pub row: u32,
    pub problem_id: String,
    pub count: usize,
    pub passed: Vec<ReviewerId>,
    pub failed: Vec<ReviewerId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotAudit {
    pub expected: usize,
    pub problems: usize,
    pub anomalies: Vec<SlotAnomaly>,
}

impl SlotAudit {
    /// Number of payout records the sheet would hold if every problem had
    /// exactly the expected reviewers.
    pub fn expected_records(&self) -> usize {
        self.problems * self.expected
    }
}

/// Counts reviewers on every row, rate cells notwithstanding.
pub fn audit_slots(rows: &[SourceRow], parser: &IdentityParser, expected: usize) -> SlotAudit {
    let anomalies = rows
        .iter()
        .filter_map(|row| {
            let passed = parser.parse_list(row.passed.text.as_deref());
            let failed = parser.parse_list(row.failed.text.as_deref());
            let count = passed.len() + failed.len();
            (count != expected).then(|| SlotAnomaly {
                row: row.row,
                problem_id: row.problem_id.clone(),
                count,
                passed,
                failed,
            })
        })
        .collect();

    SlotAudit {
        expected,
        problems: rows.len(),
        anomalies,
    }
}

impl fmt::Display for SlotAudit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "problems checked: {}", self.problems)?;
        writeln!(
            f,
            "problems without exactly {} reviewers: {}",
            self.expected,
            self.anomalies.len()
        )?;
        for anomaly in &self.anomalies {
            writeln!(f)?;
            writeln!(f, "problem {} (row {})", anomaly.problem_id, anomaly.row)?;
            writeln!(f, "  reviewers: {}", anomaly.count)?;
            writeln!(f, "  passed ({}): {}", anomaly.passed.len(), join_or_none(&anomaly.passed))?;
            writeln!(f, "  failed ({}): {}", anomaly.failed.len(), join_or_none(&anomaly.failed))?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "expected records: {} problems x {} reviewers = {}",
            self.problems,
            self.expected,
            self.expected_records()
        )
    }
}

fn join_or_none(ids: &[ReviewerId]) -> String {
    if ids.is_empty() {
        "none".to_string()
    } else {
        ids.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellFill, ListCell, RateCell};

    fn row(row: u32, passed: &str, failed: &str, rate: RateCell) -> SourceRow {
        SourceRow {
            row,
            problem_id: format!("P{row}"),
            passed: ListCell::new(passed, CellFill::Unset),
            failed: ListCell::new(failed, CellFill::Unset),
            correct_rate: rate,
            incorrect_rate: RateCell::Number(1.0),
        }
    }

    #[test]
    fn rows_off_the_expected_count_are_flagged() {
        let rows = [
            row(2, "A-1 B-2 C-3", "D-4 E-5", RateCell::Number(1.0)),
            row(3, "A-1 B-2", "", RateCell::Number(1.0)),
            row(4, "A-1 B-2 C-3 D-4", "E-5 F-6", RateCell::Text("N/A".into())),
        ];
        let audit = audit_slots(&rows, &IdentityParser::default(), 5);

        assert_eq!(audit.problems, 3);
        assert_eq!(audit.expected_records(), 15);
        let flagged: Vec<_> = audit.anomalies.iter().map(|a| (a.row, a.count)).collect();
        assert_eq!(flagged, vec![(3, 2), (4, 6)]);

        let text = audit.to_string();
        assert!(text.contains("problem P3 (row 3)"));
        assert!(text.contains("failed (0): none"));
    }
}
