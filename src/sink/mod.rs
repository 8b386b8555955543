//! Audio-sink contract (spec §6): `configure`, `open`, `write`, `silence`,
//! `close`. Any backend implementing this trait plugs into the generator.
//! The generator owns exactly one sink and is the only thread that touches
//! it, so no internal locking is required here.

mod console;
mod null;
mod rodio_sink;
mod wav;

pub use console::ConsoleSink;
pub use null::NullSink;
pub use rodio_sink::RodioSink;
pub use wav::WavSink;

use crate::error::CwResult;
use crate::tone::Tone;

/// Sample rates tried in order when a sink opens (spec §6).
pub const SAMPLE_RATE_PROBE_ORDER: &[u32] = &[44100, 48000, 32000, 22050, 16000, 11025, 8000];

pub trait AudioSink: Send {
    /// Select a device by name; backends that have no notion of multiple
    /// devices (null, console, WAV file) can accept and ignore this.
    fn configure(&mut self, _device_name: &str) -> CwResult<()> {
        Ok(())
    }

    /// Open the backend, choosing the first rate from `probe_rates` it
    /// supports, and return that rate.
    fn open(&mut self, probe_rates: &[u32]) -> CwResult<u32>;

    /// Write exactly `buffer_n_samples` signed 16-bit mono samples.
    fn write(&mut self, samples: &[i16]) -> CwResult<()>;

    /// Drop the sink to zero amplitude immediately. Optional; the console
    /// sink uses this to stop its square-wave oscillator.
    fn silence(&mut self) -> CwResult<()> {
        Ok(())
    }

    fn close(&mut self) -> CwResult<()> {
        Ok(())
    }

    /// True for sinks that render a whole tone directly (null, console)
    /// rather than through the generator's sample-buffer pipeline (spec
    /// §4.3 steps 4-5 vs step 6).
    fn renders_directly(&self) -> bool {
        false
    }

    /// Called instead of the sample pipeline when `renders_directly` is
    /// true. Must block for approximately `tone.duration_us`.
    fn render_tone_directly(&mut self, _tone: Tone) -> CwResult<()> {
        Ok(())
    }
}
