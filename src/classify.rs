//! Fill-color classification of identifier-list cells.

use std::collections::BTreeSet;

use crate::config::ClassifierConfig;
use crate::model::{CellFill, FillColor, Verdict};

/// Decides whether a cell fill marks its reviewer list as judged correctly.
///
/// Only a solid fill whose foreground is one of the configured theme slots
/// counts. Every other shape of fill metadata falls back to
/// [`Verdict::Unmarked`].
#[derive(Debug, Clone)]
pub struct Classifier {
    marked_themes: BTreeSet<u32>,
}

impl Classifier {
    pub fn new(marked_themes: impl IntoIterator<Item = u32>) -> Self {
        Self {
            marked_themes: marked_themes.into_iter().collect(),
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(config.marked_themes.iter().copied())
    }

    pub fn classify(&self, fill: &CellFill) -> Verdict {
        match fill {
            CellFill::Solid(FillColor::Theme(theme)) if self.marked_themes.contains(theme) => {
                Verdict::Marked
            }
            _ => Verdict::Unmarked,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_accent_themes_are_marked() {
        let classifier = Classifier::default();
        for theme in [8, 9] {
            let fill = CellFill::Solid(FillColor::Theme(theme));
            assert_eq!(classifier.classify(&fill), Verdict::Marked, "theme {theme}");
        }
    }

    #[test]
    fn every_other_fill_state_is_unmarked() {
        let classifier = Classifier::default();
        let fills = [
            CellFill::Unset,
            CellFill::Other,
            CellFill::Solid(FillColor::Theme(4)),
            CellFill::Solid(FillColor::Theme(0)),
            CellFill::Solid(FillColor::Rgb("FFDDEBF7".into())),
            CellFill::Solid(FillColor::Indexed(9)),
            CellFill::Solid(FillColor::Auto),
            CellFill::Solid(FillColor::Unreadable),
        ];
        for fill in fills {
            assert_eq!(classifier.classify(&fill), Verdict::Unmarked, "{fill:?}");
        }
    }

    #[test]
    fn accent_set_comes_from_config() {
        let classifier = Classifier::from_config(&ClassifierConfig {
            marked_themes: vec![5],
        });
        assert_eq!(
            classifier.classify(&CellFill::Solid(FillColor::Theme(5))),
            Verdict::Marked
        );
        assert_eq!(
            classifier.classify(&CellFill::Solid(FillColor::Theme(8))),
            Verdict::Unmarked
        );
    }
}
