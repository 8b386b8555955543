use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};

use super::{AudioSink, SAMPLE_RATE_PROBE_ORDER};
use crate::error::{CwError, CwResult};

/// Real-time playback backend, grounded on the teacher's `audio::play_audio`.
/// Each `write` call appends a fresh `SamplesBuffer` to rodio's internal
/// queue; rodio plays queued sources back-to-back, which is exactly the
/// "write exactly one full buffer, continuously" contract the generator
/// relies on.
pub struct RodioSink {
    // Held for its lifetime; dropping it tears down the output device.
    _stream: Option<OutputStream>,
    handle: Option<OutputStreamHandle>,
    sink: Option<Sink>,
    sample_rate: u32,
}

impl Default for RodioSink {
    fn default() -> Self {
        RodioSink {
            _stream: None,
            handle: None,
            sink: None,
            sample_rate: 0,
        }
    }
}

impl RodioSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioSink for RodioSink {
    fn open(&mut self, probe_rates: &[u32]) -> CwResult<u32> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| CwError::Unavailable(format!("no audio output device: {e}")))?;
        let sink = Sink::try_new(&handle)
            .map_err(|e| CwError::Unavailable(format!("cannot create rodio sink: {e}")))?;

        let rate = probe_rates
            .first()
            .copied()
            .unwrap_or(SAMPLE_RATE_PROBE_ORDER[0]);

        self._stream = Some(stream);
        self.handle = Some(handle);
        self.sink = Some(sink);
        self.sample_rate = rate;
        Ok(rate)
    }

    fn write(&mut self, samples: &[i16]) -> CwResult<()> {
        let sink = self
            .sink
            .as_ref()
            .ok_or_else(|| CwError::Internal("rodio sink written before open".into()))?;
        sink.append(SamplesBuffer::new(1, self.sample_rate, samples.to_vec()));
        Ok(())
    }

    fn silence(&mut self) -> CwResult<()> {
        if let Some(sink) = &self.sink {
            sink.stop();
        }
        Ok(())
    }

    fn close(&mut self) -> CwResult<()> {
        if let Some(sink) = self.sink.take() {
            sink.sleep_until_end();
        }
        self.handle = None;
        self._stream = None;
        Ok(())
    }
}
