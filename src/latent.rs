//! Latent sampler — the Gaussian starting point of the denoising loop.
//!
//! Predicted durations fix how many latent frames each batch item needs;
//! the sampler draws unit-Gaussian noise for the full `[B, Dv, L]` block
//! and zeroes everything past each item's frame count.

use rand::Rng;

use crate::{config::Config, tokenize::length_to_mask};

/// A `[B, Dv, L]` float tensor as contiguous row-major data.
pub struct Latent {
    pub dims: [usize; 3],
    pub data: Vec<f32>,
}

/// One standard-normal draw via the Box–Muller transform.
///
/// `u1` is floored at 1e-4 so the log never sees zero.
fn standard_normal(rng: &mut impl Rng) -> f32 {
    let u1 = rng.gen::<f32>().max(1e-4);
    let u2 = rng.gen::<f32>();
    (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos()
}

/// Sample the initial noisy latent and its validity mask for `duration`
/// seconds of audio per batch item.
///
/// Returns the masked latent and the flat `[B, 1, L]` latent mask.  Noise
/// comes from `rng`, so tests can pass a seeded generator.
pub fn sample_noisy_latent(
    duration: &[f32],
    cfg: &Config,
    rng: &mut impl Rng,
) -> (Latent, Vec<f32>) {
    let bsz = duration.len();
    let sample_rate = cfg.ae.sample_rate as f32;

    let wav_lengths: Vec<usize> = duration.iter().map(|&d| (d * sample_rate) as usize).collect();
    let wav_len_max = wav_lengths.iter().copied().max().unwrap_or(0);

    let chunk_size = cfg.chunk_size();
    let latent_len = (wav_len_max + chunk_size - 1) / chunk_size;
    let latent_channels = cfg.latent_channels();

    let dims = [bsz, latent_channels, latent_len];
    let total = bsz * latent_channels * latent_len;
    let mut data = Vec::with_capacity(total);
    for _ in 0..total {
        data.push(standard_normal(rng));
    }

    let latent_lengths: Vec<usize> = wav_lengths
        .iter()
        .map(|&len| (len + chunk_size - 1) / chunk_size)
        .collect();
    let mask = length_to_mask(&latent_lengths, latent_len);

    // Zero the noise past each item's valid frames.
    for b in 0..bsz {
        for d in 0..latent_channels {
            for t in 0..latent_len {
                data[(b * latent_channels + d) * latent_len + t] *= mask[b * latent_len + t];
            }
        }
    }

    (Latent { dims, data }, mask)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn test_config() -> Config {
        serde_json::from_str(
            r#"{
                "ae":  {"sample_rate": 44100, "base_chunk_size": 512},
                "ttl": {"chunk_compress_factor": 6, "latent_dim": 24}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_latent_dims() {
        let cfg = test_config();
        let mut rng = StdRng::seed_from_u64(7);
        let (latent, mask) = sample_noisy_latent(&[1.0], &cfg, &mut rng);

        let chunk_size = cfg.chunk_size();
        let expected_len = (44100 + chunk_size - 1) / chunk_size;
        assert_eq!(latent.dims, [1, cfg.latent_channels(), expected_len]);
        assert_eq!(latent.data.len(), cfg.latent_channels() * expected_len);
        assert_eq!(mask.len(), expected_len);
    }

    #[test]
    fn test_mask_ones_match_latent_lengths() {
        let cfg = test_config();
        let mut rng = StdRng::seed_from_u64(7);
        let (latent, mask) = sample_noisy_latent(&[1.0, 0.25], &cfg, &mut rng);

        let chunk_size = cfg.chunk_size();
        let latent_len = latent.dims[2];
        for (i, &dur) in [1.0f32, 0.25].iter().enumerate() {
            let wav_len = (dur * 44100.0) as usize;
            let expected_ones = (wav_len + chunk_size - 1) / chunk_size;
            let ones = mask[i * latent_len..(i + 1) * latent_len]
                .iter()
                .filter(|&&v| v == 1.0)
                .count();
            assert_eq!(ones, expected_ones, "row {}", i);
        }
    }

    #[test]
    fn test_noise_zeroed_past_mask() {
        let cfg = test_config();
        let mut rng = StdRng::seed_from_u64(7);
        let (latent, mask) = sample_noisy_latent(&[1.0, 0.25], &cfg, &mut rng);

        let [_, channels, latent_len] = latent.dims;
        for b in 0..2 {
            for d in 0..channels {
                for t in 0..latent_len {
                    if mask[b * latent_len + t] == 0.0 {
                        assert_eq!(latent.data[(b * channels + d) * latent_len + t], 0.0);
                    }
                }
            }
        }
    }

    #[test]
    fn test_deterministic_under_seed() {
        let cfg = test_config();
        let (a, _) = sample_noisy_latent(&[0.5], &cfg, &mut StdRng::seed_from_u64(42));
        let (b, _) = sample_noisy_latent(&[0.5], &cfg, &mut StdRng::seed_from_u64(42));
        assert_eq!(a.data, b.data);
    }

    #[test]
    fn test_samples_always_finite() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100_000 {
            let v = standard_normal(&mut rng);
            assert!(v.is_finite());
        }
    }
}
