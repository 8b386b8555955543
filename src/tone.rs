//! Tone value type (spec §3): an immutable description of one time-domain
//! segment that the generator renders into PCM samples.

/// How a tone's amplitude ramps at its edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlopeMode {
    NoSlopes,
    RisingOnly,
    FallingOnly,
    StandardBoth,
}

/// One queued segment: a sine tone of `frequency_hz` for `duration_us`, or
/// silence when `frequency_hz == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tone {
    pub frequency_hz: u32,
    pub duration_us: u64,
    pub slope_mode: SlopeMode,
    /// When true, the generator re-issues this tone on every dequeue until
    /// a subsequent enqueue displaces it (straight-key hold, silent tail).
    pub forever: bool,
}

impl Tone {
    pub fn new(frequency_hz: u32, duration_us: u64, slope_mode: SlopeMode) -> Self {
        Tone {
            frequency_hz,
            duration_us,
            slope_mode,
            forever: false,
        }
    }

    pub fn forever(frequency_hz: u32, duration_us: u64, slope_mode: SlopeMode) -> Self {
        Tone {
            frequency_hz,
            duration_us,
            slope_mode,
            forever: true,
        }
    }

    pub fn silence(duration_us: u64) -> Self {
        Tone::new(0, duration_us, SlopeMode::NoSlopes)
    }

    /// `n_samples = sample_rate * duration_us / 1_000_000`, computed as
    /// `(sample_rate / 100) * duration_us / 10_000` to avoid overflow for
    /// long tones at 48 kHz (spec §6).
    pub fn n_samples(&self, sample_rate: u32) -> u64 {
        (sample_rate as u64 / 100) * self.duration_us / 10_000
    }

    pub fn is_malformed(&self) -> bool {
        // duration_us and frequency_hz are unsigned so "negative" durations
        // cannot occur in this representation; the remaining malformed case
        // from spec §4.2 is a rectangular slope with nonzero slope length,
        // which is validated by the generator's slope-table setter instead
        // of here since it is a generator-wide parameter, not a per-tone one.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn n_samples_matches_spec_formula() {
        let t = Tone::new(600, 60_000, SlopeMode::StandardBoth);
        assert_eq!(t.n_samples(48_000), 2880);
    }

    #[test]
    fn silence_is_zero_frequency() {
        let t = Tone::silence(1_000);
        assert_eq!(t.frequency_hz, 0);
        assert!(!t.forever);
    }
}
