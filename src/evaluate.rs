//! Turns source rows into payout contributions.

use crate::classify::Classifier;
use crate::identity::IdentityParser;
use crate::model::{
    Classification, Contribution, ListSide, Occurrence, RateCell, ReviewerId, SourceRow, Verdict,
};

/// Judgement of one identifier-list cell within a kept row.
#[derive(Debug, Clone, PartialEq)]
pub struct CellEvaluation {
    pub side: ListSide,
    pub verdict: Verdict,
    /// Rate paid to every identifier in the cell.
    pub rate: f64,
    pub ids: Vec<ReviewerId>,
}

impl CellEvaluation {
    pub fn classification(&self) -> Classification {
        self.verdict.into()
    }
}

/// A row whose rates parsed, with both list cells judged.
#[derive(Debug, Clone, PartialEq)]
pub struct RowEvaluation {
    pub row: u32,
    pub problem_id: String,
    pub correct_rate: f64,
    pub incorrect_rate: f64,
    pub cells: [CellEvaluation; 2],
}

impl RowEvaluation {
    /// Contributions in cell order, then identifier order.
    pub fn contributions(&self) -> impl Iterator<Item = Contribution> + '_ {
        self.cells.iter().flat_map(|cell| {
            cell.ids.iter().map(move |id| Contribution {
                id: id.clone(),
                classification: cell.classification(),
                amount: cell.rate,
            })
        })
    }

    /// Every identifier of the row with the provenance of its contribution.
    pub fn occurrences(&self) -> impl Iterator<Item = Occurrence> + '_ {
        self.cells.iter().flat_map(move |cell| {
            cell.ids.iter().map(move |id| Occurrence {
                id: id.clone(),
                row: self.row,
                problem_id: self.problem_id.clone(),
                side: cell.side,
                verdict: cell.verdict,
                classification: cell.classification(),
                rate: cell.rate,
            })
        })
    }

    /// Number of identifier evaluations in this row.
    pub fn evaluation_count(&self) -> usize {
        self.cells.iter().map(|cell| cell.ids.len()).sum()
    }
}

/// Result of evaluating a whole sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetEvaluation {
    pub rows: Vec<RowEvaluation>,
    /// Row numbers dropped because a rate cell was not numeric.
    pub skipped_rows: Vec<u32>,
}

impl SheetEvaluation {
    pub fn contributions(&self) -> impl Iterator<Item = Contribution> + '_ {
        self.rows.iter().flat_map(RowEvaluation::contributions)
    }

    pub fn evaluation_count(&self) -> usize {
        self.rows.iter().map(RowEvaluation::evaluation_count).sum()
    }
}

/// Combines the classifier and identity parser to judge rows.
#[derive(Debug, Clone, Default)]
pub struct RowEvaluator {
    classifier: Classifier,
    parser: IdentityParser,
}

impl RowEvaluator {
    pub fn new(classifier: Classifier, parser: IdentityParser) -> Self {
        Self { classifier, parser }
    }

    pub fn parser(&self) -> &IdentityParser {
        &self.parser
    }

    /// Judges one row. Returns `None` when either rate cell is not numeric;
    /// such rows contribute nothing and are not an error.
    pub fn evaluate(&self, row: &SourceRow) -> Option<RowEvaluation> {
        let correct_rate = parse_rate(&row.correct_rate)?;
        let incorrect_rate = parse_rate(&row.incorrect_rate)?;

        let cells = ListSide::ALL.map(|side| {
            let cell = row.list(side);
            let verdict = self.classifier.classify(&cell.fill);
            let rate = match verdict {
                Verdict::Marked => correct_rate,
                Verdict::Unmarked => incorrect_rate,
            };
            CellEvaluation {
                side,
                verdict,
                rate,
                ids: self.parser.parse_list(cell.text.as_deref()),
            }
        });

        Some(RowEvaluation {
            row: row.row,
            problem_id: row.problem_id.clone(),
            correct_rate,
            incorrect_rate,
            cells,
        })
    }

    pub fn evaluate_all<'a>(&self, rows: impl IntoIterator<Item = &'a SourceRow>) -> SheetEvaluation {
        let mut evaluation = SheetEvaluation::default();
        for row in rows {
            match self.evaluate(row) {
                Some(evaluated) => evaluation.rows.push(evaluated),
                None => evaluation.skipped_rows.push(row.row),
            }
        }
        evaluation
    }
}

/// Numeric value of a rate cell. Blank cells count as zero; text must parse
/// as a finite float once trimmed.
pub fn parse_rate(cell: &RateCell) -> Option<f64> {
    let value = match cell {
        RateCell::Empty => 0.0,
        RateCell::Number(value) => *value,
        RateCell::Bool(value) => f64::from(u8::from(*value)),
        RateCell::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                0.0
            } else {
                text.parse::<f64>().ok()?
            }
        }
        RateCell::Unreadable(_) => return None,
    };
    value.is_finite().then_some(value)
}
