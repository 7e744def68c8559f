//! Command-line synthesis demo.
//!
//! Usage:
//!   cargo run --bin say -- --assets ./assets --text "Hello from Rust!"
//!   cargo run --bin say -- --hub Supertone/supertonic --voice M1
//!
//! Either `--assets DIR` (a local asset directory) or `--hub REPO_ID`
//! (downloaded and cached on first run) selects where the models come from.

use std::path::Path;

use supertonic::{Supertonic, SynthesisOptions, VoiceId};

fn main() -> anyhow::Result<()> {
    // ── Parse simple CLI arguments ───────────────────────────────────────────
    let mut args = std::env::args().skip(1);

    let mut assets: Option<String> = None;
    let mut hub: Option<String> = None;
    let mut voice = "F1".to_string();
    let mut text = "On-device speech synthesis, no GPU required.".to_string();
    let mut output = "output.wav".to_string();
    let mut opts = SynthesisOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--assets" => assets = args.next(),
            "--hub" => hub = args.next(),
            "--voice" => {
                if let Some(v) = args.next() {
                    voice = v;
                }
            }
            "--text" => {
                if let Some(v) = args.next() {
                    text = v;
                }
            }
            "--output" => {
                if let Some(v) = args.next() {
                    output = v;
                }
            }
            "--steps" => {
                if let Some(v) = args.next() {
                    opts.total_step = v.parse().unwrap_or(opts.total_step);
                }
            }
            "--speed" => {
                if let Some(v) = args.next() {
                    opts.speed = v.parse().unwrap_or(opts.speed);
                }
            }
            "--help" => {
                println!(
                    "Usage: say [--assets DIR | --hub REPO_ID] [--voice F1|F2|M1|M2] \
                     [--text TEXT] [--output FILE] [--steps N] [--speed FLOAT]"
                );
                return Ok(());
            }
            _ => {}
        }
    }

    let voice = VoiceId::parse(&voice)?;

    println!("Voice  : {}", voice);
    println!("Text   : {:?}", text);
    println!("Steps  : {}", opts.total_step);
    println!("Speed  : {}", opts.speed);
    println!("Output : {}", output);
    println!();

    // ── Load engine ──────────────────────────────────────────────────────────
    let tts = match (&assets, &hub) {
        (Some(dir), _) => Supertonic::load(Path::new(dir))?,
        (None, Some(repo)) => supertonic::download::load_from_hub(repo)?,
        (None, None) => Supertonic::load(Path::new("assets"))?,
    };

    // ── Generate audio ───────────────────────────────────────────────────────
    println!("\nSynthesising speech…");
    let duration = tts.synthesize_to_file(&text, voice, &opts, Path::new(&output))?;
    println!(
        "Saved {:.3} s at {} Hz to {}",
        duration,
        tts.sample_rate(),
        output
    );

    Ok(())
}
