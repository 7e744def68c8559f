//! Codepoint indexer — maps normalized text to integer token IDs.
//!
//! The vocabulary is a flat lookup table (`unicode_indexer.json`) indexed by
//! Unicode scalar value: `table[cp]` is the token ID for codepoint `cp`.
//! Codepoints beyond the table map to `-1`, a sentinel the model was trained
//! to treat as unknown.  Batches are right-padded with `0` to the longest
//! row, with a float validity mask marking the real positions.

use std::{fs, path::Path};

use anyhow::{Context, Result};

use crate::preprocess::normalize_text;

/// Token ID emitted for codepoints outside the indexer table.
pub const UNKNOWN_TOKEN: i64 = -1;

// ─────────────────────────────────────────────────────────────────────────────
// Mask builder
// ─────────────────────────────────────────────────────────────────────────────

/// Build a flat row-major `[B, 1, max_len]` validity mask: row `i` has
/// `min(lengths[i], max_len)` leading ones, zeros elsewhere.
pub fn length_to_mask(lengths: &[usize], max_len: usize) -> Vec<f32> {
    let mut mask = vec![0.0f32; lengths.len() * max_len];
    for (i, &len) in lengths.iter().enumerate() {
        for j in 0..len.min(max_len) {
            mask[i * max_len + j] = 1.0;
        }
    }
    mask
}

// ─────────────────────────────────────────────────────────────────────────────
// UnicodeIndexer
// ─────────────────────────────────────────────────────────────────────────────

/// Codepoint → token ID lookup table.
pub struct UnicodeIndexer {
    table: Vec<i64>,
}

impl UnicodeIndexer {
    pub fn new(table: Vec<i64>) -> Self {
        Self { table }
    }

    /// Load the table from a `unicode_indexer.json` flat i64 array.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("Cannot read indexer table: {}", path.display()))?;
        let table: Vec<i64> =
            serde_json::from_slice(&bytes).context("Failed to parse indexer table JSON")?;
        Ok(Self::new(table))
    }

    /// Number of entries in the lookup table.
    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    /// Normalize and index a batch of texts.
    ///
    /// Returns the right-padded token ID rows (padding value `0`) and the
    /// per-row codepoint lengths before padding.  An empty batch yields
    /// empty vectors.
    pub fn index(&self, texts: &[&str]) -> (Vec<Vec<i64>>, Vec<usize>) {
        let normalized: Vec<String> = texts.iter().map(|t| normalize_text(t)).collect();
        let lengths: Vec<usize> = normalized.iter().map(|t| t.chars().count()).collect();
        let max_len = lengths.iter().copied().max().unwrap_or(0);

        let mut rows = Vec::with_capacity(normalized.len());
        for text in &normalized {
            let mut row = vec![0i64; max_len];
            for (j, cp) in text.chars().enumerate() {
                let cp = cp as usize;
                row[j] = if cp < self.table.len() {
                    self.table[cp]
                } else {
                    UNKNOWN_TOKEN
                };
            }
            rows.push(row);
        }
        (rows, lengths)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Identity table over the first 128 codepoints.
    fn ascii_indexer() -> UnicodeIndexer {
        UnicodeIndexer::new((0..128).collect())
    }

    #[test]
    fn test_known_codepoints_map_through_table() {
        let idx = ascii_indexer();
        let (rows, lengths) = idx.index(&["ab."]);
        assert_eq!(lengths, vec![3]);
        assert_eq!(rows[0], vec!['a' as i64, 'b' as i64, '.' as i64]);
    }

    #[test]
    fn test_unknown_codepoint_is_sentinel() {
        let idx = ascii_indexer();
        let (rows, _) = idx.index(&["a中."]);
        assert_eq!(rows[0][1], UNKNOWN_TOKEN);
    }

    #[test]
    fn test_rows_padded_to_longest() {
        let idx = ascii_indexer();
        let (rows, lengths) = idx.index(&["abcd.", "a."]);
        assert_eq!(lengths, vec![5, 2]);
        assert_eq!(rows[0].len(), 5);
        assert_eq!(rows[1].len(), 5);
        assert_eq!(&rows[1][2..], &[0, 0, 0]);
    }

    #[test]
    fn test_lengths_count_normalized_codepoints() {
        let idx = ascii_indexer();
        // The ligature expands to two codepoints; a period is appended.
        let (_, lengths) = idx.index(&["ﬁ"]);
        assert_eq!(lengths, vec![3]);
    }

    #[test]
    fn test_empty_batch() {
        let idx = ascii_indexer();
        let (rows, lengths) = idx.index(&[]);
        assert!(rows.is_empty());
        assert!(lengths.is_empty());
    }

    #[test]
    fn test_length_to_mask_ones_count() {
        let mask = length_to_mask(&[3, 5], 5);
        assert_eq!(mask.len(), 10);
        assert_eq!(mask[..5], [1.0, 1.0, 1.0, 0.0, 0.0]);
        assert_eq!(mask[5..], [1.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_length_to_mask_clamps_to_max_len() {
        let mask = length_to_mask(&[7], 4);
        assert_eq!(mask, vec![1.0; 4]);
    }

    #[test]
    fn test_length_to_mask_empty() {
        assert!(length_to_mask(&[], 4).is_empty());
    }
}
