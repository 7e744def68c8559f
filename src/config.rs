//! Engine configuration — deserialised `tts.json`.
//!
//! The `ae` section describes the autoencoder (sample rate, waveform chunk
//! size); the `ttl` section describes the text-to-latent stack (compression
//! factor, latent channel count).  Loaded once per engine, immutable after.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AeConfig {
    pub sample_rate: u32,
    pub base_chunk_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TtlConfig {
    pub chunk_compress_factor: u32,
    pub latent_dim: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ae: AeConfig,
    pub ttl: TtlConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("Cannot read config: {}", path.display()))?;
        serde_json::from_slice(&bytes).context("Failed to parse tts.json")
    }

    /// Waveform samples covered by one latent frame.
    pub fn chunk_size(&self) -> usize {
        (self.ae.base_chunk_size * self.ttl.chunk_compress_factor) as usize
    }

    /// Channel count of the compressed latent.
    pub fn latent_channels(&self) -> usize {
        (self.ttl.latent_dim * self.ttl.chunk_compress_factor) as usize
    }
}
