use std::thread;
use std::time::Duration;

use super::{AudioSink, SAMPLE_RATE_PROBE_ORDER};
use crate::error::CwResult;
use crate::tone::Tone;

/// Reference backend used by tests and headless runs. Never touches real
/// audio hardware; `render_tone_directly` just sleeps out the duration
/// (spec §4.3 step 4).
#[derive(Debug, Default)]
pub struct NullSink {
    sample_rate: u32,
}

impl AudioSink for NullSink {
    fn open(&mut self, probe_rates: &[u32]) -> CwResult<u32> {
        self.sample_rate = probe_rates
            .first()
            .copied()
            .unwrap_or(SAMPLE_RATE_PROBE_ORDER[0]);
        Ok(self.sample_rate)
    }

    fn write(&mut self, _samples: &[i16]) -> CwResult<()> {
        Ok(())
    }

    fn renders_directly(&self) -> bool {
        true
    }

    fn render_tone_directly(&mut self, tone: Tone) -> CwResult<()> {
        thread::sleep(Duration::from_micros(tone.duration_us));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tone::SlopeMode;

    #[test]
    fn opens_at_first_probe_rate() {
        let mut sink = NullSink::default();
        let rate = sink.open(SAMPLE_RATE_PROBE_ORDER).unwrap();
        assert_eq!(rate, 44100);
    }

    #[test]
    fn renders_directly_and_returns_quickly_for_short_tones() {
        let mut sink = NullSink::default();
        sink.open(SAMPLE_RATE_PROBE_ORDER).unwrap();
        let start = std::time::Instant::now();
        sink.render_tone_directly(Tone::new(600, 500, SlopeMode::NoSlopes))
            .unwrap();
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
