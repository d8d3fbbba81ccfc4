//! Text sanitization for extracted article content
//!
//! Strategies join paragraph text with single spaces, so the normal form
//! here is flat: entities decoded, invisible characters removed, all
//! whitespace runs collapsed to one space.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE_REGEX: Regex = Regex::new(r"\s+").expect("whitespace regex");
}

/// Sanitize extracted text into the pipeline's flat normal form
///
/// Steps:
/// 1. Decode HTML entities
/// 2. Remove zero-width characters
/// 3. Remove control characters
/// 4. Collapse whitespace runs to single spaces and trim
pub fn sanitize_text(text: &str) -> String {
    let decoded = html_escape::decode_html_entities(text);
    let cleaned = remove_zero_width(&decoded);
    let cleaned = remove_control_chars(&cleaned);
    WHITESPACE_REGEX
        .replace_all(cleaned.trim(), " ")
        .to_string()
}

/// Remove zero-width spaces and similar invisible characters
pub fn remove_zero_width(text: &str) -> String {
    text.chars()
        .filter(|c| {
            !matches!(*c,
                '\u{200B}'..='\u{200F}' |
                '\u{2028}'..='\u{202F}' |
                '\u{FEFF}'
            )
        })
        .collect()
}

/// Remove control characters except newline and tab
pub fn remove_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_decodes_entities() {
        assert_eq!(sanitize_text("Ben &amp; Jerry&#39;s"), "Ben & Jerry's");
        assert_eq!(sanitize_text("a&nbsp;b"), "a b");
    }

    #[test]
    fn test_sanitize_removes_zero_width() {
        let dirty = "Hello\u{200B}World\u{FEFF}!";
        assert_eq!(sanitize_text(dirty), "HelloWorld!");
    }

    #[test]
    fn test_sanitize_collapses_whitespace() {
        assert_eq!(sanitize_text("  one \n\n two\t\tthree  "), "one two three");
    }

    #[test]
    fn test_control_chars_stripped() {
        let dirty = "a\u{0000}b\u{0007}c";
        assert_eq!(remove_control_chars(dirty), "abc");
    }

    proptest::proptest! {
        #[test]
        fn prop_sanitized_text_is_flat(input in r"[a-zA-Z0-9&#; \t\n.,]*") {
            let clean = sanitize_text(&input);
            proptest::prop_assert!(!clean.contains("  "));
            proptest::prop_assert!(!clean.contains('\n'));
            proptest::prop_assert!(!clean.contains('\t'));
            proptest::prop_assert_eq!(clean.trim(), clean.as_str());
        }

        // Entity-free input, so a second pass has nothing left to change
        #[test]
        fn prop_sanitize_is_idempotent(input in r"[a-zA-Z0-9 \t\n.,!?]*") {
            let once = sanitize_text(&input);
            proptest::prop_assert_eq!(sanitize_text(&once), once.clone());
        }
    }
}
