//! Syntactic text heuristics shared by the analysis services.
//!
//! None of this is language understanding: fragments are split on terminal
//! punctuation, claims are compared by a case-folded, punctuation-free key,
//! and marker terms are matched as whole words.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("number pattern is valid"));

static TEMPORAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:as of (?:19|20)\d{2}|historically|used to be|in the past|previously|formerly|was once|until recently)\b",
    )
    .expect("temporal pattern is valid")
});

/// Marker whose asymmetric presence makes two responses contradict.
pub const NEGATION_MARKERS: &[&str] = &["not"];

/// Phrases that make an answer context-dependent.
pub const CONDITIONAL_MARKERS: &[&str] = &[
    "depends on",
    "it depends",
    "varies",
    "typically",
    "if",
    "in some cases",
    "generally",
    "usually",
];

/// Words that signal a committed answer.
pub const CERTAINTY_MARKERS: &[&str] = &[
    "definitely",
    "certainly",
    "absolutely",
    "without a doubt",
    "guaranteed",
    "undoubtedly",
    "always",
];

/// Words that signal a hedged answer.
pub const HEDGING_MARKERS: &[&str] = &[
    "might",
    "may",
    "possibly",
    "perhaps",
    "could",
    "likely",
    "suggests",
    "uncertain",
];

/// Split text into sentence-like fragments.
///
/// A fragment ends at `.`, `!` or `?` followed by whitespace or end of text,
/// or at a line break. Fragments are trimmed; empty ones are dropped.
pub fn fragments(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        let boundary = match c {
            '\n' | '\r' => true,
            '.' | '!' | '?' => chars.peek().map_or(true, |(_, next)| next.is_whitespace()),
            _ => false,
        };
        if boundary {
            let end = idx + c.len_utf8();
            push_trimmed(&mut out, &text[start..end]);
            start = end;
        }
    }
    push_trimmed(&mut out, &text[start..]);
    out
}

fn push_trimmed<'a>(out: &mut Vec<&'a str>, fragment: &'a str) {
    let fragment = fragment.trim();
    if !fragment.is_empty() {
        out.push(fragment);
    }
}

/// Equivalence key for a fragment: lowercase, punctuation stripped,
/// whitespace collapsed.
pub fn claim_key(fragment: &str) -> String {
    let folded: String = fragment
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Every unsigned numeric token in the text.
pub fn numbers(text: &str) -> Vec<f64> {
    NUMBER_PATTERN
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .collect()
}

/// Lowercased alphanumeric tokens.
pub fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Distinct words strictly longer than `min_len` characters.
pub fn word_set(text: &str, min_len: usize) -> BTreeSet<String> {
    words(text)
        .into_iter()
        .filter(|word| word.chars().count() > min_len)
        .collect()
}

/// Jaccard similarity of two word sets; 0 when both are empty.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Whether any term occurs in the text as a whole word or word sequence,
/// ignoring case.
pub fn mentions_any(text: &str, terms: &[&str]) -> bool {
    let tokens = words(text);
    terms.iter().any(|term| {
        let needle = words(term);
        !needle.is_empty() && tokens.windows(needle.len()).any(|window| window == needle.as_slice())
    })
}

/// Whether the text leans on historical or dated framing.
pub fn is_temporal(text: &str) -> bool {
    TEMPORAL_PATTERN.is_match(text)
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Population standard deviation around a known mean.
pub fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// First `max_chars` characters, with an ellipsis when cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head.trim_end())
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragments_split_on_terminal_punctuation_and_newlines() {
        let text = "Rates rose 3.5% in 2023. Did they fall?\nPrices vary by region!Unsplit";
        assert_eq!(
            fragments(text),
            vec!["Rates rose 3.5% in 2023.", "Did they fall?", "Prices vary by region!Unsplit"]
        );
    }

    #[test]
    fn test_fragments_ignore_blank_lines() {
        assert_eq!(fragments("\n\n  One.  \n\nTwo"), vec!["One.", "Two"]);
        assert!(fragments("   ").is_empty());
    }

    #[test]
    fn test_claim_key_folds_case_and_punctuation() {
        assert_eq!(
            claim_key("The  Earth orbits the Sun!"),
            claim_key("the earth, orbits the sun")
        );
        assert_eq!(claim_key("  Hello,   World.  "), "hello world");
    }

    #[test]
    fn test_numbers_extracts_integers_and_decimals() {
        assert_eq!(numbers("about 15% in 2023, maybe 17.5"), vec![15.0, 2023.0, 17.5]);
        assert!(numbers("no digits here").is_empty());
    }

    #[test]
    fn test_word_set_filters_short_words() {
        let set = word_set("The cat sat upon the Mat, quietly", 3);
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec!["quietly", "upon"]);
    }

    #[test]
    fn test_jaccard_bounds() {
        let a = word_set("alpha bravo charlie", 3);
        let b = word_set("alpha bravo delta", 3);
        let c = word_set("zulu yankee xray", 3);
        assert!((jaccard(&a, &b) - 0.5).abs() < 1e-9);
        assert!(jaccard(&a, &c).abs() < f64::EPSILON);
        assert!(jaccard(&BTreeSet::new(), &BTreeSet::new()).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mentions_any_matches_whole_words_only() {
        assert!(mentions_any("It is NOT true", NEGATION_MARKERS));
        assert!(!mentions_any("Nothing is certain", NEGATION_MARKERS));
        assert!(mentions_any("The answer depends on the region", CONDITIONAL_MARKERS));
        assert!(!mentions_any("The answer depends heavily", &["depends on"]));
        assert!(mentions_any("This is, without a doubt, correct", CERTAINTY_MARKERS));
    }

    #[test]
    fn test_temporal_pattern() {
        assert!(is_temporal("As of 2019 the figure was 12%"));
        assert!(is_temporal("Historically, rates were higher"));
        assert!(!is_temporal("Rates are 4% today"));
    }

    #[test]
    fn test_mean_and_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let m = mean(&values).unwrap();
        assert!((m - 5.0).abs() < 1e-9);
        assert!((std_dev(&values, m) - 2.0).abs() < 1e-9);
        assert!(mean(&[]).is_none());
    }

    #[test]
    fn test_excerpt_truncates() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("a longer sentence", 8), "a longer...");
    }
}
