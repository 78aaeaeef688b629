use crate::config::IdentityConfig;
use crate::model::ReviewerId;

/// Splits reviewer lists and derives display names from slot identifiers.
#[derive(Debug, Clone, Copy)]
pub struct IdentityParser {
    separator: char,
}

impl IdentityParser {
    pub fn new(separator: char) -> Self {
        Self { separator }
    }

    pub fn from_config(config: &IdentityConfig) -> Self {
        Self::new(config.separator)
    }

    /// Splits a cell value such as `彭海航-1 李长葳-51` into identifiers, in
    /// order and without deduplication. Blank or absent text yields nothing.
    pub fn parse_list(&self, text: Option<&str>) -> Vec<ReviewerId> {
        text.map(|text| text.split_whitespace().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    /// `孙林-251` becomes `孙林`. An identifier without the separator is
    /// already a display name.
    pub fn display_name<'a>(&self, id: &'a str) -> &'a str {
        id.rsplit_once(self.separator)
            .map(|(name, _)| name)
            .unwrap_or(id)
    }
}

impl Default for IdentityParser {
    fn default() -> Self {
        Self::from_config(&IdentityConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_input_yields_no_identifiers() {
        let parser = IdentityParser::default();
        assert!(parser.parse_list(None).is_empty());
        assert!(parser.parse_list(Some("")).is_empty());
        assert!(parser.parse_list(Some("   ")).is_empty());
        assert!(parser.parse_list(Some("\t\n\u{3000}")).is_empty());
    }

    #[test]
    fn tokens_keep_order_and_duplicates() {
        let parser = IdentityParser::default();
        assert_eq!(
            parser.parse_list(Some("A-1 B-2  C-3")),
            vec!["A-1", "B-2", "C-3"]
        );
        assert_eq!(
            parser.parse_list(Some(" A-1\nA-1 ")),
            vec!["A-1", "A-1"]
        );
    }

    #[test]
    fn display_name_strips_last_suffix_only() {
        let parser = IdentityParser::default();
        assert_eq!(parser.display_name("孙林-251"), "孙林");
        assert_eq!(parser.display_name("NoSuffix"), "NoSuffix");
        assert_eq!(parser.display_name("Anne-Marie-7"), "Anne-Marie");
        assert_eq!(parser.display_name("Trailing-"), "Trailing");
    }

    #[test]
    fn separator_is_configurable() {
        let parser = IdentityParser::new('#');
        assert_eq!(parser.display_name("Lee#3"), "Lee");
        assert_eq!(parser.display_name("Lee-3"), "Lee-3");
    }
}
