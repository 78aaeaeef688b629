//! End-to-end runs: load the judge sheet, evaluate it, then write payouts,
//! reconcile persisted payouts, or audit reviewer slots.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::aggregate::{Aggregates, Tally};
use crate::audit::{SlotAudit, audit_slots};
use crate::classify::Classifier;
use crate::config::PayoutConfig;
use crate::error::{Result, ToolError};
use crate::evaluate::RowEvaluator;
use crate::identity::IdentityParser;
use crate::io::workbook::{SourceSheet, read_source};
use crate::io::{excel_write, payout_csv};
use crate::reconcile::{PersistedOutput, ReconReport, Reconciler};

pub const DETAIL_FILE: &str = "salary_detail.csv";
pub const SUMMARY_FILE: &str = "salary_summary.csv";

/// Locations of the persisted payout tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutPaths {
    pub detail: PathBuf,
    pub summary: PathBuf,
    /// Optional payout workbook written next to the CSV tables.
    pub workbook: Option<PathBuf>,
}

impl PayoutPaths {
    /// Default table names in the directory of `input`.
    pub fn beside(input: &Path) -> Self {
        let dir = input.parent().unwrap_or_else(|| Path::new(""));
        Self {
            detail: dir.join(DETAIL_FILE),
            summary: dir.join(SUMMARY_FILE),
            workbook: None,
        }
    }
}

/// What a compute run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputeOutcome {
    pub sheet: String,
    pub rows_read: usize,
    pub skipped_rows: Vec<u32>,
    pub detail_count: usize,
    pub summary_count: usize,
    pub totals: Tally,
}

/// Computes payouts from `input` and writes the tables enabled in
/// `config.output`.
#[instrument(level = "info", skip_all, fields(input = %input.display()))]
pub fn compute(input: &Path, paths: &PayoutPaths, config: &PayoutConfig) -> Result<ComputeOutcome> {
    let sheet = load_sheet(input, config)?;
    let evaluator = evaluator(config);
    let evaluation = evaluator.evaluate_all(&sheet.rows);
    info!(
        row_count = sheet.rows.len(),
        skipped_rows = evaluation.skipped_rows.len(),
        "evaluated judge sheet"
    );

    let aggregates = Aggregates::from_contributions(evaluation.contributions(), evaluator.parser());
    let options = &config.output;
    if options.detail {
        payout_csv::write_detail(&paths.detail, aggregates.detail())?;
        debug!(path = %paths.detail.display(), "detail table written");
    }
    if options.summary {
        payout_csv::write_summary(&paths.summary, aggregates.summary(), options.counts)?;
        debug!(path = %paths.summary.display(), "summary table written");
    }
    if let Some(workbook) = &paths.workbook {
        excel_write::write_payout_workbook(workbook, &aggregates, options)?;
        debug!(path = %workbook.display(), "payout workbook written");
    }
    info!(
        detail_count = aggregates.detail().len(),
        summary_count = aggregates.summary().len(),
        "payouts computed"
    );

    Ok(ComputeOutcome {
        sheet: sheet.name,
        rows_read: sheet.rows.len(),
        skipped_rows: evaluation.skipped_rows,
        detail_count: aggregates.detail().len(),
        summary_count: aggregates.summary().len(),
        totals: aggregates.grand_total(),
    })
}

/// Re-derives payouts from `input` and compares them with the tables at
/// `paths`. Tables disabled in `config.output` are not read.
#[instrument(level = "info", skip_all, fields(input = %input.display()))]
pub fn verify(input: &Path, paths: &PayoutPaths, config: &PayoutConfig) -> Result<ReconReport> {
    let sheet = load_sheet(input, config)?;
    let evaluator = evaluator(config);
    let evaluation = evaluator.evaluate_all(&sheet.rows);

    let persisted = PersistedOutput {
        detail: config
            .output
            .detail
            .then(|| payout_csv::read_records(&paths.detail))
            .transpose()?,
        summary: config
            .output
            .summary
            .then(|| payout_csv::read_records(&paths.summary))
            .transpose()?,
    };

    let reconciler = Reconciler::from_config(&config.reconcile, *evaluator.parser());
    let report = reconciler.reconcile(&evaluation, &persisted);
    if report.passed() {
        info!(
            row_count = sheet.rows.len(),
            reused = report.reused.len(),
            "persisted payouts match the source"
        );
    } else {
        warn!(
            finding_count = report.findings.len(),
            "persisted payouts disagree with the source"
        );
    }
    Ok(report)
}

/// Counts reviewers per problem against `expected`.
#[instrument(level = "info", skip_all, fields(input = %input.display()))]
pub fn audit(input: &Path, expected: usize, config: &PayoutConfig) -> Result<SlotAudit> {
    let sheet = load_sheet(input, config)?;
    let parser = IdentityParser::from_config(&config.identity);
    let audit = audit_slots(&sheet.rows, &parser, expected);
    info!(
        row_count = sheet.rows.len(),
        anomaly_count = audit.anomalies.len(),
        "reviewer slots audited"
    );
    Ok(audit)
}

fn load_sheet(input: &Path, config: &PayoutConfig) -> Result<SourceSheet> {
    if !input.exists() {
        return Err(ToolError::MissingInput(input.to_path_buf()));
    }
    read_source(input, config.source.sheet.as_deref())
}

fn evaluator(config: &PayoutConfig) -> RowEvaluator {
    RowEvaluator::new(
        Classifier::from_config(&config.classifier),
        IdentityParser::from_config(&config.identity),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables_sit_next_to_the_input() {
        let paths = PayoutPaths::beside(Path::new("data/judge.xlsx"));
        assert_eq!(paths.detail, Path::new("data").join(DETAIL_FILE));
        assert_eq!(paths.summary, Path::new("data").join(SUMMARY_FILE));
        assert_eq!(paths.workbook, None);

        let bare = PayoutPaths::beside(Path::new("judge.xlsx"));
        assert_eq!(bare.detail, PathBuf::from(DETAIL_FILE));
    }

    #[test]
    fn missing_input_is_reported() {
        let err = verify(
            Path::new("does/not/exist.xlsx"),
            &PayoutPaths::beside(Path::new("does/not/exist.xlsx")),
            &PayoutConfig::default(),
        )
        .expect_err("missing workbook");
        assert!(matches!(err, ToolError::MissingInput(_)));
    }
}
