//! Independent re-derivation of payout totals and field-by-field comparison
//! against previously written output.

mod report;

use std::collections::BTreeMap;

use crate::aggregate::{Aggregates, Tally};
use crate::config::ReconcileConfig;
use crate::evaluate::SheetEvaluation;
use crate::identity::IdentityParser;
use crate::model::{Occurrence, PayoutRecord};

pub use report::{Field, FieldDelta, Finding, ReconReport, ReconStats, ReusedIdentifier, View};

/// Payout tables read back from disk. A table that was not produced is
/// `None` and its checks are skipped.
#[derive(Debug, Clone, Default)]
pub struct PersistedOutput {
    pub detail: Option<Vec<PayoutRecord>>,
    pub summary: Option<Vec<PayoutRecord>>,
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    tolerance: f64,
    parser: IdentityParser,
}

impl Reconciler {
    pub fn new(tolerance: f64, parser: IdentityParser) -> Self {
        Self { tolerance, parser }
    }

    pub fn from_config(config: &ReconcileConfig, parser: IdentityParser) -> Self {
        Self::new(config.tolerance, parser)
    }

    /// Re-derives both views from `sheet` and diffs them against `persisted`.
    /// Every discrepancy is collected; nothing short-circuits.
    pub fn reconcile(&self, sheet: &SheetEvaluation, persisted: &PersistedOutput) -> ReconReport {
        let derived = Aggregates::from_contributions(sheet.contributions(), &self.parser);
        let trail = ProvenanceIndex::build(sheet, &self.parser);

        let mut report = ReconReport {
            stats: ReconStats {
                rows_read: sheet.rows.len() + sheet.skipped_rows.len(),
                skipped_rows: sheet.skipped_rows.clone(),
                source_identifiers: derived.detail().len(),
                detail_records: persisted.detail.as_ref().map(Vec::len),
                summary_records: persisted.summary.as_ref().map(Vec::len),
                totals: derived.grand_total(),
            },
            ..ReconReport::default()
        };

        match &persisted.detail {
            Some(records) => self.diff_view(
                View::Detail,
                derived.detail(),
                records,
                |key| trail.by_id(key),
                &mut report,
            ),
            None => report
                .notes
                .push("no detail table supplied; detail checks skipped".into()),
        }

        match &persisted.summary {
            Some(records) => {
                if records.iter().any(|record| record.counts.is_none()) {
                    report.notes.push(
                        "summary table has no count columns; count checks skipped".into(),
                    );
                }
                self.diff_view(
                    View::Summary,
                    derived.summary(),
                    records,
                    |key| trail.by_name(key),
                    &mut report,
                );
            }
            None => report
                .notes
                .push("no summary table supplied; summary checks skipped".into()),
        }

        self.cross_check(sheet, persisted, &mut report);
        report.reused = trail.reused();
        report
    }

    fn diff_view<F>(
        &self,
        view: View,
        derived: &BTreeMap<String, Tally>,
        records: &[PayoutRecord],
        occurrences_of: F,
        report: &mut ReconReport,
    ) where
        F: Fn(&str) -> Vec<Occurrence>,
    {
        let mut persisted: BTreeMap<&str, Vec<&PayoutRecord>> = BTreeMap::new();
        for record in records {
            persisted.entry(record.key.as_str()).or_default().push(record);
        }

        for (key, copies) in &persisted {
            if copies.len() > 1 {
                report.findings.push(Finding::Duplicate {
                    view,
                    key: key.to_string(),
                    lines: copies.iter().map(|record| record.line).collect(),
                });
            }
            let record = copies[0];
            match derived.get(*key) {
                Some(expected) => {
                    let deltas = self.field_deltas(expected, record);
                    if !deltas.is_empty() {
                        report.findings.push(Finding::Mismatch {
                            view,
                            key: key.to_string(),
                            line: record.line,
                            deltas,
                            occurrences: occurrences_of(*key),
                        });
                    }
                }
                None => report.findings.push(Finding::Extra {
                    view,
                    record: record.clone(),
                }),
            }
        }

        for (key, expected) in derived {
            if !persisted.contains_key(key.as_str()) {
                report.findings.push(Finding::Missing {
                    view,
                    key: key.clone(),
                    expected: *expected,
                    occurrences: occurrences_of(key.as_str()),
                });
            }
        }
    }

    fn field_deltas(&self, expected: &Tally, record: &PayoutRecord) -> Vec<FieldDelta> {
        let mut deltas = Vec::new();
        let amounts = [
            (Field::Correct, expected.correct, record.correct),
            (Field::Incorrect, expected.incorrect, record.incorrect),
            (Field::Total, expected.total(), record.total),
        ];
        for (field, expected, persisted) in amounts {
            if (expected - persisted).abs() > self.tolerance {
                deltas.push(FieldDelta {
                    field,
                    expected,
                    persisted,
                });
            }
        }
        if let Some(counts) = record.counts {
            let pairs = [
                (Field::CorrectCount, expected.counts.correct, counts.correct),
                (Field::IncorrectCount, expected.counts.incorrect, counts.incorrect),
            ];
            for (field, expected, persisted) in pairs {
                if expected != persisted {
                    deltas.push(FieldDelta {
                        field,
                        expected: expected as f64,
                        persisted: persisted as f64,
                    });
                }
            }
        }
        deltas
    }

    fn cross_check(
        &self,
        sheet: &SheetEvaluation,
        persisted: &PersistedOutput,
        report: &mut ReconReport,
    ) {
        if let (Some(detail), Some(summary)) = (&persisted.detail, &persisted.summary) {
            let detail_total: f64 = detail.iter().map(|r| r.correct + r.incorrect).sum();
            let summary_total: f64 = summary.iter().map(|r| r.correct + r.incorrect).sum();
            // Every persisted line is rounded on its own, so the allowed
            // drift grows with the number of lines summed.
            let lines = (detail.len() + summary.len()).max(1);
            let allowance = self.tolerance * lines as f64;
            if (detail_total - summary_total).abs() > allowance {
                report.findings.push(Finding::CrossTotal {
                    detail_total,
                    summary_total,
                });
            }
        }

        let counted: Option<u64> = persisted.summary.as_ref().and_then(|summary| {
            summary
                .iter()
                .map(|record| record.counts.map(|counts| counts.total()))
                .sum()
        });
        if let Some(counted) = counted {
            let evaluated = sheet.evaluation_count() as u64;
            if counted != evaluated {
                report
                    .findings
                    .push(Finding::CountTotal { counted, evaluated });
            }
        }
    }
}

/// Every occurrence of every identifier in the kept rows, in sheet order.
struct ProvenanceIndex<'p> {
    parser: &'p IdentityParser,
    by_id: BTreeMap<String, Vec<Occurrence>>,
}

impl<'p> ProvenanceIndex<'p> {
    fn build(sheet: &SheetEvaluation, parser: &'p IdentityParser) -> Self {
        let mut by_id: BTreeMap<String, Vec<Occurrence>> = BTreeMap::new();
        for occurrence in sheet.rows.iter().flat_map(|row| row.occurrences()) {
            by_id
                .entry(occurrence.id.clone())
                .or_default()
                .push(occurrence);
        }
        Self { parser, by_id }
    }

    fn by_id(&self, id: &str) -> Vec<Occurrence> {
        self.by_id.get(id).cloned().unwrap_or_default()
    }

    fn by_name(&self, name: &str) -> Vec<Occurrence> {
        let mut occurrences: Vec<Occurrence> = self
            .by_id
            .iter()
            .filter(|(id, _)| self.parser.display_name(id) == name)
            .flat_map(|(_, occurrences)| occurrences.iter().cloned())
            .collect();
        occurrences.sort_by_key(|occurrence| (occurrence.row, occurrence.side));
        occurrences
    }

    fn reused(&self) -> Vec<ReusedIdentifier> {
        self.by_id
            .iter()
            .filter(|(_, occurrences)| occurrences.len() > 1)
            .map(|(id, occurrences)| ReusedIdentifier {
                id: id.clone(),
                occurrences: occurrences.clone(),
            })
            .collect()
    }
}
