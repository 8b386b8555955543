use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;

use super::{AudioSink, SAMPLE_RATE_PROBE_ORDER};
use crate::error::{CwError, CwResult};

/// Writes the sample stream to a 16-bit mono WAV file, grounded on the
/// teacher's `audio::save_audio_to_wav`.
pub struct WavSink {
    path: String,
    sample_rate: u32,
    writer: Option<WavWriter<BufWriter<File>>>,
}

impl WavSink {
    pub fn new(path: impl Into<String>) -> Self {
        WavSink {
            path: path.into(),
            sample_rate: 0,
            writer: None,
        }
    }
}

impl AudioSink for WavSink {
    fn open(&mut self, probe_rates: &[u32]) -> CwResult<u32> {
        let rate = probe_rates
            .first()
            .copied()
            .unwrap_or(SAMPLE_RATE_PROBE_ORDER.last().copied().unwrap());
        let spec = WavSpec {
            channels: 1,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(&self.path, spec)
            .map_err(|e| CwError::Unavailable(format!("cannot create wav file: {e}")))?;
        self.sample_rate = rate;
        self.writer = Some(writer);
        Ok(rate)
    }

    fn write(&mut self, samples: &[i16]) -> CwResult<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| CwError::Internal("wav sink written before open".into()))?;
        for &s in samples {
            writer
                .write_sample(s)
                .map_err(|e| CwError::Internal(format!("wav write failed: {e}")))?;
        }
        Ok(())
    }

    fn close(&mut self) -> CwResult<()> {
        if let Some(writer) = self.writer.take() {
            writer
                .finalize()
                .map_err(|e| CwError::Internal(format!("wav finalize failed: {e}")))?;
        }
        Ok(())
    }
}
