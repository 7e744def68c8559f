//! HuggingFace Hub asset downloader.
//!
//! Fetches the complete asset bundle (config, indexer table, four ONNX
//! modules, voice styles) from a HuggingFace repository, then constructs a
//! [`Supertonic`] from the cached snapshot.

use std::path::PathBuf;

use anyhow::{Context, Result};
use hf_hub::api::sync::Api;

use crate::model::Supertonic;

/// Every file the engine needs, relative to the repository root.
const ASSET_FILES: &[&str] = &[
    "tts.json",
    "unicode_indexer.json",
    "duration_predictor_quant.onnx",
    "text_encoder_quant.onnx",
    "vector_estimator_quant.onnx",
    "vocoder_quant.onnx",
    "voice_styles/F1.json",
    "voice_styles/F2.json",
    "voice_styles/M1.json",
    "voice_styles/M2.json",
];

/// Download and initialise a [`Supertonic`] engine from HuggingFace.
///
/// Files are cached in the HuggingFace Hub cache directory
/// (`~/.cache/huggingface/hub` by default), so only the first run hits the
/// network.
pub fn load_from_hub(repo_id: &str) -> Result<Supertonic> {
    let api = Api::new().context("Failed to initialise HuggingFace Hub client")?;
    let repo = api.model(repo_id.to_string());

    let mut asset_root: Option<PathBuf> = None;
    for filename in ASSET_FILES {
        println!("Fetching {}…", filename);
        let path = repo
            .get(filename)
            .with_context(|| format!("Failed to download '{}' from '{}'", filename, repo_id))?;
        // Every file lands in the same snapshot directory; remember it once.
        if asset_root.is_none() {
            asset_root = path.parent().map(PathBuf::from);
        }
    }

    let asset_root =
        asset_root.with_context(|| format!("Repository '{}' resolved to no files", repo_id))?;

    println!("Loading engine from {}…", asset_root.display());
    Supertonic::load(&asset_root)
}
