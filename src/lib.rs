//! # supertonic
//!
//! On-device flow-matching text-to-speech over ONNX Runtime — no network
//! inference calls, one synchronous synthesis operation.
//!
//! ## Quick start
//!
//! ```no_run
//! use supertonic::{Supertonic, SynthesisOptions, VoiceId};
//!
//! let tts = Supertonic::load(std::path::Path::new("assets"))?;
//! let out = tts.synthesize(
//!     "Hello from Rust!",
//!     VoiceId::F1,
//!     &SynthesisOptions::default(),
//! )?;
//! std::fs::write("output.wav", &out.wav)?;
//! println!("{:.3} s at {} Hz", out.duration_seconds, out.sample_rate);
//! # anyhow::Ok(())
//! ```
//!
//! Or download the asset bundle from HuggingFace first (cached after the
//! first run):
//!
//! ```no_run
//! let tts = supertonic::download::load_from_hub("Supertone/supertonic").unwrap();
//! ```
//!
//! ## Pipeline
//! 1. **Normalization** — NFKC plus symbol folding into the model's
//!    character set.
//! 2. **Chunking** — long text split into ≤ 300-char sentence groups.
//! 3. **Indexing** — codepoints mapped to token IDs through a lookup table.
//! 4. **Duration prediction** — seconds of audio per chunk, scaled by speed.
//! 5. **Text encoding** — style-conditioned text embedding.
//! 6. **Denoising loop** — Gaussian latent refined over `total_step`
//!    estimator calls.
//! 7. **Vocoder** — final latent to waveform; chunks joined with silence,
//!    truncated to the predicted duration and encoded as 16-bit PCM WAV.
//!
//! ## Asset layout
//! | File                             | Contents                            |
//! |----------------------------------|-------------------------------------|
//! | `tts.json`                       | sample rate, chunk and latent sizes |
//! | `unicode_indexer.json`           | flat codepoint → token ID table     |
//! | `duration_predictor_quant.onnx`  | duration predictor                  |
//! | `text_encoder_quant.onnx`        | text encoder                        |
//! | `vector_estimator_quant.onnx`    | vector estimator                    |
//! | `vocoder_quant.onnx`             | vocoder                             |
//! | `voice_styles/{F1,F2,M1,M2}.json`| per-voice conditioning tensors      |

// Hub downloads are desktop-only: hf-hub pulls in native-tls, and OpenSSL
// does not cross-compile for iOS/Android without a full SDK.  Mobile
// deployments bundle the asset directory and call Supertonic::load directly.
#[cfg(not(any(target_os = "ios", target_os = "android")))]
pub mod download;

pub mod chunk;
pub mod config;
pub mod latent;
pub mod model;
pub mod preprocess;
pub mod tokenize;
pub mod voice;
pub mod wav;

// ─── Re-exports for convenience ─────────────────────────────────────────────

pub use config::Config;
pub use model::{global, Supertonic, SynthesisOptions, SynthesisOutput};
pub use voice::VoiceId;
