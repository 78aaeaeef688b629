use std::collections::BTreeMap;

use serde::Serialize;

use crate::identity::IdentityParser;
use crate::model::{Classification, Contribution, Counts, ReviewerId};

/// Running totals for one reviewer slot or one display name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Tally {
    pub correct: f64,
    pub incorrect: f64,
    pub counts: Counts,
}

impl Tally {
    pub fn total(&self) -> f64 {
        self.correct + self.incorrect
    }

    fn add(&mut self, contribution: &Contribution) {
        match contribution.classification {
            Classification::Correct => {
                self.correct += contribution.amount;
                self.counts.correct += 1;
            }
            Classification::Incorrect => {
                self.incorrect += contribution.amount;
                self.counts.incorrect += 1;
            }
        }
    }
}

/// Detail (per identifier) and summary (per display name) views of a
/// contribution stream. Keys iterate in lexicographic order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregates {
    detail: BTreeMap<ReviewerId, Tally>,
    summary: BTreeMap<String, Tally>,
}

impl Aggregates {
    /// Folds `contributions` into both views.
    pub fn from_contributions<I>(contributions: I, parser: &IdentityParser) -> Self
    where
        I: IntoIterator<Item = Contribution>,
    {
        contributions
            .into_iter()
            .fold(Self::default(), |mut aggregates, contribution| {
                aggregates
                    .summary
                    .entry(parser.display_name(&contribution.id).to_owned())
                    .or_default()
                    .add(&contribution);
                aggregates
                    .detail
                    .entry(contribution.id.clone())
                    .or_default()
                    .add(&contribution);
                aggregates
            })
    }

    pub fn detail(&self) -> &BTreeMap<ReviewerId, Tally> {
        &self.detail
    }

    pub fn summary(&self) -> &BTreeMap<String, Tally> {
        &self.summary
    }

    /// Sum of all correct and incorrect amounts in the detail view.
    pub fn grand_total(&self) -> Tally {
        self.detail.values().fold(Tally::default(), |mut acc, tally| {
            acc.correct += tally.correct;
            acc.incorrect += tally.incorrect;
            acc.counts.correct += tally.counts.correct;
            acc.counts.incorrect += tally.counts.incorrect;
            acc
        })
    }
}
