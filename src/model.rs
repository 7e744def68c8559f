//! Flow-matching TTS engine — four ONNX modules orchestrated per text chunk.
//!
//! Uses [`ort`] (ONNX Runtime Rust bindings) for inference.  Each text chunk
//! flows through four modules:
//!
//! | Module             | Inputs (positional, matching graph order)        | Output            |
//! |--------------------|--------------------------------------------------|-------------------|
//! | duration predictor | `text_ids`, `style_dp`, `text_mask`              | `duration`        |
//! | text encoder       | `text_ids`, `style_ttl`, `text_mask`             | `text_emb`        |
//! | vector estimator   | `noisy_latent`, `text_emb`, `style_ttl`, `latent_mask`, `text_mask`, `current_step`, `total_step` | `denoised_latent` |
//! | vocoder            | `latent`                                         | `wav_tts`         |
//!
//! The vector estimator runs `total_step` times over the same latent,
//! refining Gaussian noise into the voiced latent; the loop is strictly
//! sequential.  `current_step` and `total_step` are float32 `[B]` tensors,
//! mirroring the ONNX graph schema.

use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{ensure, Context, Result};
use once_cell::sync::OnceCell;
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use rand::Rng;

use crate::{
    chunk::{chunk_text, MAX_CHUNK_LEN},
    config::Config,
    latent::sample_noisy_latent,
    tokenize::{length_to_mask, UnicodeIndexer},
    voice::{self, VoiceId, VoiceStyle},
    wav,
};

// ─────────────────────────────────────────────────────────────────────────────
// Request options and output
// ─────────────────────────────────────────────────────────────────────────────

/// Per-request synthesis knobs.
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    /// Denoising iterations; more steps trade latency for quality.
    pub total_step: usize,
    /// Speaking-rate multiplier; predicted durations are divided by this.
    pub speed: f32,
    /// Silence inserted between chunks, in seconds.
    pub silence_duration: f32,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            total_step: 5,
            speed: 1.0,
            silence_duration: 0.3,
        }
    }
}

/// A finished synthesis: encoded WAV bytes plus the audio's vital stats.
pub struct SynthesisOutput {
    /// Complete RIFF/WAVE byte stream (16-bit mono PCM).
    pub wav: Vec<u8>,
    pub sample_rate: u32,
    pub duration_seconds: f32,
}

fn validate(text: &str, opts: &SynthesisOptions) -> Result<()> {
    ensure!(!text.trim().is_empty(), "Text must not be empty");
    ensure!(
        opts.total_step >= 1,
        "total_step must be at least 1, got {}",
        opts.total_step
    );
    ensure!(
        opts.speed.is_finite() && opts.speed > 0.0,
        "speed must be a positive finite number, got {}",
        opts.speed
    );
    ensure!(
        opts.silence_duration.is_finite() && opts.silence_duration >= 0.0,
        "silence_duration must be non-negative, got {}",
        opts.silence_duration
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Supertonic
// ─────────────────────────────────────────────────────────────────────────────

/// The TTS engine: configuration, codepoint indexer, and the four inference
/// sessions.  Immutable after [`load`](Supertonic::load); safe to share
/// across threads (each session is behind its own lock).
pub struct Supertonic {
    cfg: Config,
    indexer: UnicodeIndexer,
    asset_dir: PathBuf,
    duration_predictor: Mutex<Session>,
    text_encoder: Mutex<Session>,
    vector_estimator: Mutex<Session>,
    vocoder: Mutex<Session>,
}

fn load_session(path: &Path) -> Result<Mutex<Session>> {
    let session = Session::builder()
        .context("Failed to create ORT session builder")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set graph optimization level")?
        .commit_from_file(path)
        .with_context(|| format!("Cannot load ONNX model: {}", path.display()))?;
    Ok(Mutex::new(session))
}

impl Supertonic {
    /// Load the engine from an asset directory containing `tts.json`,
    /// `unicode_indexer.json`, the four `*_quant.onnx` modules and
    /// `voice_styles/`.
    pub fn load(asset_dir: &Path) -> Result<Self> {
        let cfg = Config::from_file(&asset_dir.join("tts.json"))?;
        let indexer = UnicodeIndexer::from_file(&asset_dir.join("unicode_indexer.json"))?;

        println!("Loading duration predictor…");
        let duration_predictor = load_session(&asset_dir.join("duration_predictor_quant.onnx"))?;
        println!("Loading text encoder…");
        let text_encoder = load_session(&asset_dir.join("text_encoder_quant.onnx"))?;
        println!("Loading vector estimator…");
        let vector_estimator = load_session(&asset_dir.join("vector_estimator_quant.onnx"))?;
        println!("Loading vocoder…");
        let vocoder = load_session(&asset_dir.join("vocoder_quant.onnx"))?;

        Ok(Self {
            cfg,
            indexer,
            asset_dir: asset_dir.to_path_buf(),
            duration_predictor,
            text_encoder,
            vector_estimator,
            vocoder,
        })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Sample rate of every waveform this engine produces.
    pub fn sample_rate(&self) -> u32 {
        self.cfg.ae.sample_rate
    }

    // ── Per-chunk pipeline ────────────────────────────────────────────────────

    /// Run the four-module pipeline on one chunk.
    ///
    /// Returns the raw vocoder waveform and the speed-scaled duration in
    /// seconds.  The waveform may be longer than the duration warrants; the
    /// caller slices it.
    fn infer_chunk(
        &self,
        text: &str,
        style: &VoiceStyle,
        total_step: usize,
        speed: f32,
        rng: &mut impl Rng,
    ) -> Result<(Vec<f32>, f32)> {
        // ── Tokenize and mask ────────────────────────────────────────────────
        let (rows, lengths) = self.indexer.index(&[text]);
        let ids = rows.into_iter().next().unwrap_or_default();
        let seq_len = ids.len();
        ensure!(seq_len > 0, "Chunk {:?} contains no indexable characters", text);
        let text_mask = length_to_mask(&lengths, seq_len);

        // ── Duration prediction ──────────────────────────────────────────────
        // Input order: text_ids, style_dp, text_mask
        let mut duration = {
            let t_ids = Tensor::<i64>::from_array(([1usize, seq_len], ids.clone()))
                .context("Failed to build text_ids tensor")?;
            let t_style = Tensor::<f32>::from_array((style.dp_dims, style.dp.clone()))
                .context("Failed to build style_dp tensor")?;
            let t_mask = Tensor::<f32>::from_array(([1usize, 1, seq_len], text_mask.clone()))
                .context("Failed to build text_mask tensor")?;

            let mut session = self
                .duration_predictor
                .lock()
                .expect("duration predictor mutex poisoned");
            let outputs = session
                .run(ort::inputs![t_ids, t_style, t_mask])
                .context("Duration predictor inference failed")?;
            let (_shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .context("Failed to extract duration tensor")?;
            data.to_vec()
        };
        ensure!(
            duration.len() == 1,
            "Duration predictor returned {} values for a single-item batch",
            duration.len()
        );
        for d in duration.iter_mut() {
            *d /= speed;
        }

        // ── Text encoding ────────────────────────────────────────────────────
        // Input order: text_ids, style_ttl, text_mask.  The embedding is
        // opaque; its shape and data are forwarded to the estimator verbatim.
        let (emb_dims, emb) = {
            let t_ids = Tensor::<i64>::from_array(([1usize, seq_len], ids))
                .context("Failed to build text_ids tensor")?;
            let t_style = Tensor::<f32>::from_array((style.ttl_dims, style.ttl.clone()))
                .context("Failed to build style_ttl tensor")?;
            let t_mask = Tensor::<f32>::from_array(([1usize, 1, seq_len], text_mask.clone()))
                .context("Failed to build text_mask tensor")?;

            let mut session = self.text_encoder.lock().expect("text encoder mutex poisoned");
            let outputs = session
                .run(ort::inputs![t_ids, t_style, t_mask])
                .context("Text encoder inference failed")?;
            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .context("Failed to extract text embedding tensor")?;
            (shape.to_vec(), data.to_vec())
        };

        // ── Initial latent ───────────────────────────────────────────────────
        let (mut latent, latent_mask) = sample_noisy_latent(&duration, &self.cfg, rng);
        let latent_len = latent.dims[2];

        // ── Denoising loop ───────────────────────────────────────────────────
        // Input order: noisy_latent, text_emb, style_ttl, latent_mask,
        // text_mask, current_step, total_step
        for step in 0..total_step {
            let t_latent = Tensor::<f32>::from_array((latent.dims, latent.data.clone()))
                .context("Failed to build noisy_latent tensor")?;
            let t_emb = Tensor::<f32>::from_array((emb_dims.clone(), emb.clone()))
                .context("Failed to build text_emb tensor")?;
            let t_style = Tensor::<f32>::from_array((style.ttl_dims, style.ttl.clone()))
                .context("Failed to build style_ttl tensor")?;
            let t_latent_mask =
                Tensor::<f32>::from_array(([1usize, 1, latent_len], latent_mask.clone()))
                    .context("Failed to build latent_mask tensor")?;
            let t_text_mask = Tensor::<f32>::from_array(([1usize, 1, seq_len], text_mask.clone()))
                .context("Failed to build text_mask tensor")?;
            let t_current = Tensor::<f32>::from_array(([1usize], vec![step as f32]))
                .context("Failed to build current_step tensor")?;
            let t_total = Tensor::<f32>::from_array(([1usize], vec![total_step as f32]))
                .context("Failed to build total_step tensor")?;

            let mut session = self
                .vector_estimator
                .lock()
                .expect("vector estimator mutex poisoned");
            let outputs = session
                .run(ort::inputs![
                    t_latent,
                    t_emb,
                    t_style,
                    t_latent_mask,
                    t_text_mask,
                    t_current,
                    t_total
                ])
                .context("Vector estimator inference failed")?;
            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .context("Failed to extract denoised latent tensor")?;
            let got: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
            ensure!(
                got == latent.dims,
                "Vector estimator changed latent shape {:?} to {:?}",
                latent.dims,
                got
            );
            latent.data = data.to_vec();
        }

        // ── Vocoder ──────────────────────────────────────────────────────────
        let wav = {
            let t_latent = Tensor::<f32>::from_array((latent.dims, latent.data))
                .context("Failed to build latent tensor")?;
            let mut session = self.vocoder.lock().expect("vocoder mutex poisoned");
            let outputs = session
                .run(ort::inputs![t_latent])
                .context("Vocoder inference failed")?;
            let (_shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .context("Failed to extract waveform tensor")?;
            data.to_vec()
        };

        Ok((wav, duration[0]))
    }

    // ── Synthesis façade ──────────────────────────────────────────────────────

    /// Synthesize `text` with `voice` into an encoded WAV.
    ///
    /// Long text is chunked; chunk waveforms are joined with
    /// `opts.silence_duration` seconds of silence and the result is truncated
    /// to the accumulated duration before encoding.
    pub fn synthesize(
        &self,
        text: &str,
        voice: VoiceId,
        opts: &SynthesisOptions,
    ) -> Result<SynthesisOutput> {
        validate(text, opts)?;

        let style = voice::load_style(&self.asset_dir, voice)?;
        ensure!(
            style.ttl_dims[0] == 1,
            "Voice style '{}' carries {} speakers; single-speaker synthesis only",
            voice,
            style.ttl_dims[0]
        );

        let chunks = chunk_text(text, MAX_CHUNK_LEN);
        ensure!(!chunks.is_empty(), "Text contains nothing to synthesize");

        let sample_rate = self.cfg.ae.sample_rate;
        let sr = sample_rate as f32;
        let mut rng = rand::thread_rng();

        let mut wav_cat: Vec<f32> = Vec::new();
        let mut total_duration = 0.0f32;

        for (i, chunk) in chunks.iter().enumerate() {
            let (wav, dur) =
                self.infer_chunk(chunk, &style, opts.total_step, opts.speed, &mut rng)?;

            if i > 0 {
                let gap = (opts.silence_duration * sr) as usize;
                wav_cat.extend(std::iter::repeat(0.0f32).take(gap));
                total_duration += opts.silence_duration;
            }

            // The vocoder may produce more samples than the predicted
            // duration warrants; keep only the predicted span.
            let take = ((dur * sr) as usize).min(wav.len());
            wav_cat.extend_from_slice(&wav[..take]);
            total_duration += dur;
        }

        wav_cat.truncate((total_duration * sr) as usize);

        let wav_bytes = wav::encode_wav(&wav_cat, sample_rate)?;
        Ok(SynthesisOutput {
            wav: wav_bytes,
            sample_rate,
            duration_seconds: total_duration,
        })
    }

    /// Synthesize `text` and write the WAV to `path`.  Returns the audio
    /// duration in seconds.
    pub fn synthesize_to_file(
        &self,
        text: &str,
        voice: VoiceId,
        opts: &SynthesisOptions,
        path: &Path,
    ) -> Result<f32> {
        let out = self.synthesize(text, voice, opts)?;
        std::fs::write(path, &out.wav)
            .with_context(|| format!("Cannot write WAV: {}", path.display()))?;
        Ok(out.duration_seconds)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Process-wide engine
// ─────────────────────────────────────────────────────────────────────────────

static ENGINE: OnceCell<Supertonic> = OnceCell::new();

/// The process-wide engine handle, loaded on first call.
///
/// Concurrent first calls converge on a single load; the asset directory of
/// the winning call sticks for the process lifetime.
pub fn global(asset_dir: &Path) -> Result<&'static Supertonic> {
    ENGINE.get_or_try_init(|| Supertonic::load(asset_dir))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
