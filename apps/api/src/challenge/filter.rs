//! Forbidden-word filter.
//!
//! Matching is case-insensitive substring containment with no word
//! boundaries: forbidden "rain" also rejects "raincoat".

/// Returns the first forbidden word occurring in `text`, if any.
/// Blank forbidden words are skipped.
pub fn find_forbidden<'a, S: AsRef<str>>(text: &str, forbidden_words: &'a [S]) -> Option<&'a str> {
    let text_lower = text.to_lowercase();
    forbidden_words
        .iter()
        .map(|w| w.as_ref())
        .filter(|w| !w.trim().is_empty())
        .find(|w| text_lower.contains(&w.to_lowercase()))
}

/// True iff any forbidden word occurs in `text`.
pub fn contains_forbidden<S: AsRef<str>>(text: &str, forbidden_words: &[S]) -> bool {
    find_forbidden(text, forbidden_words).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_exact_word() {
        assert!(contains_forbidden(
            "Describe the role of sunlight in chlorophyll",
            &["sunlight"]
        ));
    }

    #[test]
    fn test_match_is_case_insensitive_both_ways() {
        let words = ["CPU"];
        assert!(contains_forbidden("the cpu runs code", &words));
        assert!(contains_forbidden("THE CPU RUNS CODE", &["cpu"]));
        assert_eq!(
            contains_forbidden("Mixed Case cPu", &words),
            contains_forbidden(&"Mixed Case cPu".to_uppercase(), &["cpu".to_uppercase()])
        );
    }

    #[test]
    fn test_substring_match_rejects_compound_words() {
        assert!(contains_forbidden("I wore my raincoat", &["rain"]));
    }

    #[test]
    fn test_multi_word_forbidden_phrase() {
        assert!(contains_forbidden("visit the eiffel tower at dusk", &["Eiffel Tower"]));
        assert!(!contains_forbidden("visit the eiffel at dusk", &["Eiffel Tower"]));
    }

    #[test]
    fn test_clean_text_passes() {
        assert!(!contains_forbidden(
            "How do green leaves make food?",
            &["photosynthesis", "sunlight"]
        ));
    }

    #[test]
    fn test_blank_forbidden_words_are_ignored() {
        assert!(!contains_forbidden("anything at all", &["", "  "]));
    }

    #[test]
    fn test_empty_word_list_never_matches() {
        let none: [&str; 0] = [];
        assert!(!contains_forbidden("text", &none));
    }

    #[test]
    fn test_find_forbidden_reports_first_hit() {
        let words = vec!["brew".to_string(), "beans".to_string()];
        assert_eq!(find_forbidden("grind the beans, then brew", &words), Some("brew"));
    }
}
