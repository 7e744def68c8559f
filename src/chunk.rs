//! Sentence-group chunker — bounds how much text one inference pass sees.
//!
//! Long inputs are split on paragraph breaks, then into sentences, then
//! greedy-packed into chunks of at most [`MAX_CHUNK_LEN`] bytes.  Sentence
//! detection is deliberately conservative: common abbreviations and single
//! initials ("Dr. Jones", "J. Smith") never end a sentence.

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum chunk size in bytes for a single inference pass.
pub const MAX_CHUNK_LEN: usize = 300;

/// Abbreviations whose trailing period never ends a sentence.
const ABBREVIATIONS: &[&str] = &[
    "Mr.", "Mrs.", "Ms.", "Dr.", "Prof.", "Sr.", "Jr.", "Ph.D.", "etc.",
    "e.g.", "i.e.", "vs.", "Inc.", "Ltd.", "Co.", "Corp.", "St.", "Ave.",
    "Blvd.",
];

/// Blank-line paragraph separator: one or more newlines with optional
/// surrounding whitespace.
static RE_PARAGRAPH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Candidate sentence boundary: terminal punctuation followed by whitespace.
static RE_SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").unwrap());

// ─────────────────────────────────────────────────────────────────────────────
// Sentence splitting
// ─────────────────────────────────────────────────────────────────────────────

/// True when the text ending at a `.` boundary is an abbreviation or a
/// single uppercase initial, i.e. the period does not end a sentence.
fn is_protected_period(before_punct: &str, punct: char) -> bool {
    if punct != '.' {
        return false;
    }
    let last_word = match before_punct.split_whitespace().last() {
        Some(w) => w,
        None => return false,
    };
    let candidate = format!("{}.", last_word);
    if ABBREVIATIONS.contains(&candidate.as_str()) {
        return true;
    }
    // Single uppercase letter followed by '.' — an initial ("J. Smith").
    let mut chars = last_word.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_uppercase())
}

/// Split `text` into sentences on whitespace after `.`, `!` or `?`,
/// keeping abbreviations and initials attached to their sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut last_end = 0;

    for m in RE_SENTENCE_END.find_iter(text) {
        let punct = text[m.start()..].chars().next().unwrap();
        if is_protected_period(&text[last_end..m.start()], punct) {
            continue;
        }
        let sentence = text[last_end..m.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        last_end = m.end();
    }

    let tail = text[last_end..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

// ─────────────────────────────────────────────────────────────────────────────
// Chunking
// ─────────────────────────────────────────────────────────────────────────────

/// Split a sentence longer than `max_len` on commas, falling back to plain
/// word boundaries for fragments that still do not fit.
fn split_oversized(sentence: &str, max_len: usize, chunks: &mut Vec<String>) {
    let mut current = String::new();
    for part in sentence.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if part.len() > max_len {
            flush(&mut current, chunks);
            let mut words = String::new();
            for word in part.split_whitespace() {
                if !words.is_empty() && words.len() + 1 + word.len() > max_len {
                    flush(&mut words, chunks);
                }
                if !words.is_empty() {
                    words.push(' ');
                }
                words.push_str(word);
            }
            flush(&mut words, chunks);
        } else {
            if !current.is_empty() && current.len() + 2 + part.len() > max_len {
                flush(&mut current, chunks);
            }
            if !current.is_empty() {
                current.push_str(", ");
            }
            current.push_str(part);
        }
    }
    flush(&mut current, chunks);
}

fn flush(current: &mut String, chunks: &mut Vec<String>) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
    current.clear();
}

/// Split `text` into chunks of at most `max_len` bytes.
///
/// Paragraphs (blank-line separated) never share a chunk.  Within a
/// paragraph, whole sentences are greedy-packed; a single sentence longer
/// than `max_len` is split on commas, then on words.
pub fn chunk_text(text: &str, max_len: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    for para in RE_PARAGRAPH.split(text) {
        let para = para.trim();
        if para.is_empty() {
            continue;
        }
        if para.len() <= max_len {
            chunks.push(para.to_string());
            continue;
        }

        let mut current = String::new();
        for sentence in split_sentences(para) {
            if sentence.len() > max_len {
                flush(&mut current, &mut chunks);
                split_oversized(&sentence, max_len, &mut chunks);
                continue;
            }
            if !current.is_empty() && current.len() + 1 + sentence.len() > max_len {
                flush(&mut current, &mut chunks);
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&sentence);
        }
        flush(&mut current, &mut chunks);
    }
    chunks
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_input_is_single_chunk() {
        assert_eq!(chunk_text("Hi there.", MAX_CHUNK_LEN), vec!["Hi there."]);
        assert_eq!(chunk_text("  padded  ", MAX_CHUNK_LEN), vec!["padded"]);
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(chunk_text("", MAX_CHUNK_LEN).is_empty());
        assert!(chunk_text("  \n\n  ", MAX_CHUNK_LEN).is_empty());
    }

    #[test]
    fn test_paragraphs_never_share_a_chunk() {
        assert_eq!(chunk_text("A.\n\nB.", MAX_CHUNK_LEN), vec!["A.", "B."]);
        assert_eq!(chunk_text("A.\n  \nB.", MAX_CHUNK_LEN), vec!["A.", "B."]);
    }

    #[test]
    fn test_abbreviations_do_not_split() {
        let s = split_sentences("Mr. Smith went to Dr. Jones. He was late.");
        assert_eq!(
            s,
            vec!["Mr. Smith went to Dr. Jones.", "He was late."]
        );
    }

    #[test]
    fn test_every_listed_abbreviation_is_protected() {
        for abbrev in ABBREVIATIONS {
            let text = format!("We met {} Smith today. Next.", abbrev);
            let s = split_sentences(&text);
            assert_eq!(s.len(), 2, "abbreviation {:?} caused a split: {:?}", abbrev, s);
        }
    }

    #[test]
    fn test_initials_do_not_split() {
        let s = split_sentences("J. Smith arrived. K. Jones left.");
        assert_eq!(s, vec!["J. Smith arrived.", "K. Jones left."]);
    }

    #[test]
    fn test_exclamation_and_question_split() {
        let s = split_sentences("Really! Are you sure? Yes.");
        assert_eq!(s, vec!["Really!", "Are you sure?", "Yes."]);
    }

    #[test]
    fn test_greedy_packing_respects_max_len() {
        let text = "One two three. Four five six. Seven eight nine. Ten.".repeat(10);
        let chunks = chunk_text(&text, 40);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 40, "oversized chunk: {:?}", chunk);
        }
    }

    #[test]
    fn test_oversized_sentence_splits_on_commas() {
        let sentence = format!("{}, {}, {}", "a".repeat(30), "b".repeat(30), "c".repeat(30));
        let chunks = chunk_text(&sentence, 40);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 40, "oversized chunk: {:?}", chunk);
        }
    }

    #[test]
    fn test_oversized_fragment_splits_on_words() {
        let sentence = "word ".repeat(40);
        let chunks = chunk_text(sentence.trim(), 30);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 30, "oversized chunk: {:?}", chunk);
        }
    }
}
