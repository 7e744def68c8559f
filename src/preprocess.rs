//! Text normalization — prepares raw input for the codepoint indexer.
//!
//! The indexer maps Unicode scalar values straight to token IDs, so every
//! character that reaches it must come from the set the model was trained
//! on.  This module folds arbitrary input into that set: NFKC composition,
//! emoji and decorative-symbol removal, typographic dash/quote folding,
//! punctuation-spacing fixes, and a final sentence terminator.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// ─────────────────────────────────────────────────────────────────────────────
// Character folding tables
// ─────────────────────────────────────────────────────────────────────────────

/// Typographic characters folded to their ASCII equivalents, and layout
/// characters folded to spaces.
const REPLACEMENTS: &[(&str, &str)] = &[
    ("–", "-"),         // en dash
    ("‑", "-"),         // non-breaking hyphen
    ("—", "-"),         // em dash
    ("_", " "),
    ("\u{201C}", "\""), // left double quote
    ("\u{201D}", "\""), // right double quote
    ("\u{2018}", "'"),  // left single quote
    ("\u{2019}", "'"),  // right single quote
    ("´", "'"),
    ("`", "'"),
    ("[", " "),
    ("]", " "),
    ("|", " "),
    ("/", " "),
    ("#", " "),
    ("→", " "),
    ("←", " "),
];

/// Symbols removed outright.
const REMOVED: &[&str] = &["♥", "☆", "♡", "©", "\\"];

/// Spoken-form expansions for characters the model has no voicing for.
const EXPANSIONS: &[(&str, &str)] = &[
    ("@", " at "),
    ("e.g.,", "for example, "),
    ("i.e.,", "that is, "),
];

/// Punctuation that may legitimately end an utterance; anything else gets a
/// trailing period appended.
const TERMINATORS: &str = ".!?;:,'\"\u{201C}\u{201D}\u{2018}\u{2019})]}…。」』】〉》›»";

static RE_EMOJI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        "[\u{1F600}-\u{1F64F}\u{1F300}-\u{1F5FF}\u{1F680}-\u{1F6FF}\
         \u{1F700}-\u{1F77F}\u{1F780}-\u{1F7FF}\u{1F800}-\u{1F8FF}\
         \u{1F900}-\u{1F9FF}\u{1FA00}-\u{1FA6F}\u{1FA70}-\u{1FAFF}\
         \u{2600}-\u{26FF}\u{2700}-\u{27BF}\u{1F1E6}-\u{1F1FF}]+",
    )
    .unwrap()
});

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline
// ─────────────────────────────────────────────────────────────────────────────

/// Normalize `text` into the model's input character set.
///
/// Applies, in order: NFKC composition, emoji removal, character folding,
/// spoken-form expansions, punctuation-spacing fixes, whitespace collapse,
/// and a trailing `.` when the result does not already end a sentence.
pub fn normalize_text(text: &str) -> String {
    let mut text: String = text.nfkc().collect();

    text = RE_EMOJI.replace_all(&text, "").into_owned();

    for (from, to) in REPLACEMENTS {
        text = text.replace(from, to);
    }
    for symbol in REMOVED {
        text = text.replace(symbol, "");
    }
    for (from, to) in EXPANSIONS {
        text = text.replace(from, to);
    }

    // Re-attach punctuation that drifted away from its word.
    for p in [",", ".", "!", "?", ";", ":", "'"] {
        let spaced = format!(" {}", p);
        while text.contains(&spaced) {
            text = text.replace(&spaced, p);
        }
    }

    // Collapse duplicate quote runs left over from the folding above.
    for q in ["\"\"", "''"] {
        while text.contains(q) {
            text = text.replace(q, &q[..1]);
        }
    }

    text = RE_SPACES.replace_all(text.trim(), " ").into_owned();

    if !text.is_empty() && !text.ends_with(|c: char| TERMINATORS.contains(c)) {
        text.push('.');
    }

    text
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nfkc_composition() {
        // U+FB01 LATIN SMALL LIGATURE FI decomposes to two codepoints
        assert_eq!(normalize_text("ﬁle"), "file.");
    }

    #[test]
    fn test_curly_quotes_folded() {
        assert_eq!(normalize_text("\u{201C}hi\u{201D}"), "\"hi\"");
        assert_eq!(normalize_text("it\u{2019}s fine"), "it's fine.");
    }

    #[test]
    fn test_dashes_folded() {
        assert_eq!(normalize_text("a—b"), "a-b.");
        assert_eq!(normalize_text("a–b"), "a-b.");
    }

    #[test]
    fn test_emoji_removed() {
        assert_eq!(normalize_text("hello 😀 world"), "hello world.");
    }

    #[test]
    fn test_at_sign_expanded() {
        assert_eq!(normalize_text("me@example"), "me at example.");
    }

    #[test]
    fn test_spacing_before_punctuation_fixed() {
        assert_eq!(normalize_text("Hello , world ."), "Hello, world.");
    }

    #[test]
    fn test_trailing_period_appended() {
        assert_eq!(normalize_text("no terminator"), "no terminator.");
        assert_eq!(normalize_text("already done!"), "already done!");
        assert_eq!(normalize_text("quoted\""), "quoted\"");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(normalize_text("  a \t b\n c  "), "a b c.");
    }

    #[test]
    fn test_empty_stays_empty() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("   "), "");
    }
}
