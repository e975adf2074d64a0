//! Whitespace normalization for completed text blocks.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Collapses every run of whitespace to a single space and trims both ends.
///
/// Applied once to a whole accumulated block, never to individual fragments:
/// fragment boundaries come from transport chunking and can fall inside words.
pub fn normalize(raw: &str) -> String {
    WHITESPACE_RUN.replace_all(raw, " ").trim().to_string()
}

/// Whether `raw` still has content once normalized.
pub fn has_content(raw: &str) -> bool {
    !raw.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_newlines_and_tabs() {
        assert_eq!(normalize("Spicy  Noodle\nSoup"), "Spicy Noodle Soup");
        assert_eq!(normalize("\t1 cup\r\n\r\n flour \t"), "1 cup flour");
    }

    #[test]
    fn test_whitespace_only_is_empty() {
        assert_eq!(normalize(" \n\t "), "");
        assert!(!has_content(" \n\t "));
        assert!(has_content(" x "));
    }

    #[test]
    fn test_unicode_whitespace() {
        assert_eq!(normalize("2\u{a0}\u{a0}tbsp\u{2003}butter"), "2 tbsp butter");
    }

    #[test]
    fn test_idempotent() {
        let once = normalize("  a \n b\t\tc  ");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_single_spaces_untouched() {
        assert_eq!(normalize("Foo Bar"), "Foo Bar");
    }
}
