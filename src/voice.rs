//! Voice style store — per-voice conditioning tensors.
//!
//! Each voice ships as a JSON asset holding two 3-D float tensors:
//! `style_ttl` conditions the text encoder and vector estimator,
//! `style_dp` conditions the duration predictor.  Styles are flattened to
//! contiguous row-major buffers on first load and cached for the process
//! lifetime; the cache is append-only and never invalidates.

use std::{
    collections::HashMap,
    fmt, fs,
    path::Path,
    sync::{Arc, Mutex},
};

use anyhow::{bail, ensure, Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;

// ─────────────────────────────────────────────────────────────────────────────
// Voice identifiers
// ─────────────────────────────────────────────────────────────────────────────

/// The closed set of shipped voices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceId {
    F1,
    F2,
    M1,
    M2,
}

impl VoiceId {
    pub const ALL: [VoiceId; 4] = [VoiceId::F1, VoiceId::F2, VoiceId::M1, VoiceId::M2];

    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceId::F1 => "F1",
            VoiceId::F2 => "F2",
            VoiceId::M1 => "M1",
            VoiceId::M2 => "M2",
        }
    }

    /// Parse a voice identifier, case-insensitively.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "F1" => Ok(VoiceId::F1),
            "F2" => Ok(VoiceId::F2),
            "M1" => Ok(VoiceId::M1),
            "M2" => Ok(VoiceId::M2),
            _ => bail!(
                "Unknown voice '{}'. Available: {:?}",
                s,
                VoiceId::ALL.map(|v| v.as_str())
            ),
        }
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Style asset schema
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct StyleTensorData {
    dims: Vec<usize>,
    data: Vec<Vec<Vec<f32>>>,
}

#[derive(Debug, Deserialize)]
struct VoiceStyleData {
    style_ttl: StyleTensorData,
    style_dp: StyleTensorData,
}

/// A voice's conditioning tensors, flattened to contiguous row-major f32.
pub struct VoiceStyle {
    pub ttl_dims: [usize; 3],
    pub ttl: Vec<f32>,
    pub dp_dims: [usize; 3],
    pub dp: Vec<f32>,
}

fn flatten(tensor: StyleTensorData, name: &str) -> Result<([usize; 3], Vec<f32>)> {
    ensure!(
        tensor.dims.len() == 3,
        "{} has {} dims, expected 3",
        name,
        tensor.dims.len()
    );
    let dims = [tensor.dims[0], tensor.dims[1], tensor.dims[2]];

    let mut flat = Vec::with_capacity(dims[0] * dims[1] * dims[2]);
    for batch in &tensor.data {
        for row in batch {
            flat.extend_from_slice(row);
        }
    }
    ensure!(
        flat.len() == dims[0] * dims[1] * dims[2],
        "{} data has {} elements but dims {:?} require {}",
        name,
        flat.len(),
        dims,
        dims[0] * dims[1] * dims[2]
    );
    Ok((dims, flat))
}

impl VoiceStyle {
    /// Parse a voice style from its JSON asset bytes.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        let data: VoiceStyleData =
            serde_json::from_slice(bytes).context("Failed to parse voice style JSON")?;
        let (ttl_dims, ttl) = flatten(data.style_ttl, "style_ttl")?;
        let (dp_dims, dp) = flatten(data.style_dp, "style_dp")?;
        Ok(Self { ttl_dims, ttl, dp_dims, dp })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Process-wide cache
// ─────────────────────────────────────────────────────────────────────────────

static STYLE_CACHE: Lazy<Mutex<HashMap<VoiceId, Arc<VoiceStyle>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Load the style for `id` from `<asset_dir>/voice_styles/<ID>.json`,
/// returning the cached copy after the first call.
///
/// Concurrent first loads of the same voice are idempotent: whichever
/// finishes first wins and later loaders get its copy.
pub fn load_style(asset_dir: &Path, id: VoiceId) -> Result<Arc<VoiceStyle>> {
    if let Some(style) = STYLE_CACHE.lock().expect("style cache poisoned").get(&id) {
        return Ok(style.clone());
    }

    let path = asset_dir.join("voice_styles").join(format!("{}.json", id.as_str()));
    let bytes = fs::read(&path)
        .with_context(|| format!("Cannot read voice style: {}", path.display()))?;
    let style = Arc::new(
        VoiceStyle::from_json_bytes(&bytes)
            .with_context(|| format!("Invalid voice style asset for {}", id))?,
    );

    let mut cache = STYLE_CACHE.lock().expect("style cache poisoned");
    Ok(cache.entry(id).or_insert(style).clone())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const STYLE_JSON: &str = r#"{
        "style_ttl": {"dims": [1, 2, 3],
                      "data": [[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]],
                      "type": "float32"},
        "style_dp":  {"dims": [1, 1, 2],
                      "data": [[[7.0, 8.0]]],
                      "type": "float32"}
    }"#;

    #[test]
    fn test_parse_and_flatten_row_major() {
        let style = VoiceStyle::from_json_bytes(STYLE_JSON.as_bytes()).unwrap();
        assert_eq!(style.ttl_dims, [1, 2, 3]);
        assert_eq!(style.ttl, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(style.dp_dims, [1, 1, 2]);
        assert_eq!(style.dp, vec![7.0, 8.0]);
    }

    #[test]
    fn test_ragged_data_rejected() {
        let bad = r#"{
            "style_ttl": {"dims": [1, 2, 3], "data": [[[1.0, 2.0, 3.0]]]},
            "style_dp":  {"dims": [1, 1, 1], "data": [[[1.0]]]}
        }"#;
        assert!(VoiceStyle::from_json_bytes(bad.as_bytes()).is_err());
    }

    #[test]
    fn test_non_3d_dims_rejected() {
        let bad = r#"{
            "style_ttl": {"dims": [2, 3], "data": [[[1.0]]]},
            "style_dp":  {"dims": [1, 1, 1], "data": [[[1.0]]]}
        }"#;
        assert!(VoiceStyle::from_json_bytes(bad.as_bytes()).is_err());
    }

    #[test]
    fn test_voice_id_parse() {
        assert_eq!(VoiceId::parse("F1").unwrap(), VoiceId::F1);
        assert_eq!(VoiceId::parse("m2").unwrap(), VoiceId::M2);
        assert!(VoiceId::parse("X1").is_err());
    }

    #[test]
    fn test_cache_returns_same_style() {
        let dir = std::env::temp_dir().join("supertonic-voice-cache-test");
        fs::create_dir_all(dir.join("voice_styles")).unwrap();
        fs::write(dir.join("voice_styles/F2.json"), STYLE_JSON).unwrap();

        let a = load_style(&dir, VoiceId::F2).unwrap();
        let b = load_style(&dir, VoiceId::F2).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
