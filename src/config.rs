use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, ToolError};

/// Run configuration, loaded from an optional TOML file. Every field has a
/// default matching the judge sheet convention, so an empty file is valid.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PayoutConfig {
    pub source: SourceConfig,
    pub classifier: ClassifierConfig,
    pub identity: IdentityConfig,
    pub output: OutputOptions,
    pub reconcile: ReconcileConfig,
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Worksheet to read. The first worksheet is used when unset.
    pub sheet: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Theme color slots that mark a reviewer list as judged correctly.
    pub marked_themes: Vec<u32>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            marked_themes: vec![8, 9],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    /// Separator between display name and slot number.
    pub separator: char,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self { separator: '-' }
    }
}

/// Which payout tables a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputOptions {
    pub detail: bool,
    pub summary: bool,
    /// Append correct/incorrect counts to the summary table.
    pub counts: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            detail: true,
            summary: true,
            counts: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileConfig {
    /// Absolute tolerance applied to monetary comparisons.
    pub tolerance: f64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self { tolerance: 0.01 }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// Reviewers expected on every problem.
    pub expected_reviewers: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            expected_reviewers: 5,
        }
    }
}

impl PayoutConfig {
    /// Loads the configuration from `path`, or the defaults when no path is
    /// given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ToolError::MissingInput(path.to_path_buf()));
                }
                Self::from_toml(&fs::read_to_string(path)?)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.classifier.marked_themes.is_empty() {
            return Err(ToolError::InvalidConfig(
                "classifier.marked_themes must name at least one theme color".into(),
            ));
        }
        if self.identity.separator.is_whitespace() {
            return Err(ToolError::InvalidConfig(
                "identity.separator cannot be whitespace".into(),
            ));
        }
        let tolerance = self.reconcile.tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ToolError::InvalidConfig(format!(
                "reconcile.tolerance must be a non-negative number, got {tolerance}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_sheet_defaults() {
        let config = PayoutConfig::from_toml("").unwrap();
        assert_eq!(config.classifier.marked_themes, vec![8, 9]);
        assert_eq!(config.identity.separator, '-');
        assert_eq!(config.output, OutputOptions::default());
        assert_eq!(config.reconcile.tolerance, 0.01);
        assert_eq!(config.audit.expected_reviewers, 5);
        assert!(config.source.sheet.is_none());
    }

    #[test]
    fn sections_override_defaults() {
        let config = PayoutConfig::from_toml(
            r#"
            [source]
            sheet = "judge"

            [classifier]
            marked_themes = [4, 5]

            [identity]
            separator = "_"

            [output]
            counts = false

            [reconcile]
            tolerance = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.source.sheet.as_deref(), Some("judge"));
        assert_eq!(config.classifier.marked_themes, vec![4, 5]);
        assert_eq!(config.identity.separator, '_');
        assert!(config.output.detail);
        assert!(!config.output.counts);
        assert_eq!(config.reconcile.tolerance, 0.5);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = PayoutConfig::from_toml("[classifier]\nthemes = [8]\n").unwrap_err();
        assert!(matches!(err, ToolError::ConfigParse(_)));
    }

    #[test]
    fn validation_catches_unusable_values() {
        let err = PayoutConfig::from_toml("[classifier]\nmarked_themes = []\n").unwrap_err();
        assert!(matches!(err, ToolError::InvalidConfig(_)));

        let err = PayoutConfig::from_toml("[identity]\nseparator = \" \"\n").unwrap_err();
        assert!(matches!(err, ToolError::InvalidConfig(_)));

        let err = PayoutConfig::from_toml("[reconcile]\ntolerance = -1.0\n").unwrap_err();
        assert!(matches!(err, ToolError::InvalidConfig(_)));
    }
}
