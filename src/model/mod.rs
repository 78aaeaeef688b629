use std::fmt;

use serde::Serialize;

/// Identifier of one reviewer-assignment slot, e.g. `孙林-251`. Kept as the
/// plain string found in the sheet so it round-trips through CSV unchanged.
pub type ReviewerId = String;

/// Foreground color of a cell fill as written in the workbook styles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillColor {
    /// Theme palette slot (`<fgColor theme="8"/>`).
    Theme(u32),
    /// Legacy indexed palette entry.
    Indexed(u32),
    /// Explicit ARGB hex string.
    Rgb(String),
    /// System automatic color.
    Auto,
    /// No color attribute we understand.
    Unreadable,
}

/// Fill of a single cell, resolved from the workbook styles by the loader.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CellFill {
    /// No style, no fill, or `patternType="none"`.
    #[default]
    Unset,
    /// Solid pattern fill with its foreground color.
    Solid(FillColor),
    /// Any other pattern, or a gradient fill.
    Other,
}

/// Classifier output for one identifier-list cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Marked,
    Unmarked,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Marked => write!(f, "marked"),
            Verdict::Unmarked => write!(f, "unmarked"),
        }
    }
}

/// Which payout bucket a contribution lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Correct,
    Incorrect,
}

impl From<Verdict> for Classification {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Marked => Classification::Correct,
            Verdict::Unmarked => Classification::Incorrect,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Correct => write!(f, "correct"),
            Classification::Incorrect => write!(f, "incorrect"),
        }
    }
}

/// The two identifier-list cells of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListSide {
    /// Column C, `passed_users`.
    Passed,
    /// Column D, `failed_users`.
    Failed,
}

impl ListSide {
    pub const ALL: [ListSide; 2] = [ListSide::Passed, ListSide::Failed];

    /// 1-based worksheet column holding this list.
    pub fn column(self) -> u32 {
        match self {
            ListSide::Passed => layout::PASSED_COLUMN,
            ListSide::Failed => layout::FAILED_COLUMN,
        }
    }
}

impl fmt::Display for ListSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListSide::Passed => write!(f, "C(passed)"),
            ListSide::Failed => write!(f, "D(failed)"),
        }
    }
}

/// Fixed worksheet layout, 1-based columns and rows.
pub mod layout {
    pub const PROBLEM_COLUMN: u32 = 1;
    pub const PASSED_COLUMN: u32 = 3;
    pub const FAILED_COLUMN: u32 = 4;
    pub const CORRECT_RATE_COLUMN: u32 = 11;
    pub const INCORRECT_RATE_COLUMN: u32 = 14;
    /// First data row; row 1 is the header.
    pub const FIRST_DATA_ROW: u32 = 2;
}

/// Raw content of a rate cell before numeric parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum RateCell {
    Empty,
    Number(f64),
    Bool(bool),
    Text(String),
    /// Error values (`#DIV/0!`), dates and anything else that is not a
    /// plain number.
    Unreadable(String),
}

/// One identifier-list cell: its text and its fill.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListCell {
    pub text: Option<String>,
    pub fill: CellFill,
}

impl ListCell {
    pub fn new(text: impl Into<String>, fill: CellFill) -> Self {
        Self {
            text: Some(text.into()),
            fill,
        }
    }
}

/// A data row as handed over by the workbook loader.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    /// 1-based worksheet row number.
    pub row: u32,
    /// Opaque problem identifier, only printed for diagnostics.
    pub problem_id: String,
    pub passed: ListCell,
    pub failed: ListCell,
    pub correct_rate: RateCell,
    pub incorrect_rate: RateCell,
}

impl SourceRow {
    pub fn list(&self, side: ListSide) -> &ListCell {
        match side {
            ListSide::Passed => &self.passed,
            ListSide::Failed => &self.failed,
        }
    }
}

/// One unit of payout evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub id: ReviewerId,
    pub classification: Classification,
    pub amount: f64,
}

/// Where a contribution came from, enough to audit it by hand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Occurrence {
    pub id: ReviewerId,
    pub row: u32,
    pub problem_id: String,
    pub side: ListSide,
    pub verdict: Verdict,
    pub classification: Classification,
    pub rate: f64,
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: problem {} row {} {} {} +{:.2} ({})",
            self.id,
            self.problem_id,
            self.row,
            self.side,
            self.verdict,
            self.rate,
            self.classification
        )
    }
}

/// A payout line read back from a persisted detail or summary CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayoutRecord {
    /// 1-based line in the CSV file.
    pub line: u64,
    pub key: String,
    pub correct: f64,
    pub incorrect: f64,
    pub total: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<Counts>,
}

/// Number of correct and incorrect classifications behind a summary line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Counts {
    pub correct: u64,
    pub incorrect: u64,
}

impl Counts {
    pub fn total(&self) -> u64 {
        self.correct + self.incorrect
    }
}
