//! PCM generator (spec §3, §4.3, §4.4): owns the tone queue and the sink,
//! runs a single producer thread that dequeues tones, renders sine samples
//! with shaped attack/release slopes, and writes fixed-size buffers to the
//! sink.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{CwError, CwResult};
use crate::queue::{Dequeued, ToneQueue};
use crate::sink::{AudioSink, SAMPLE_RATE_PROBE_ORDER};
use crate::timing::{self, Timing};
use crate::tone::{SlopeMode, Tone};

pub const DEFAULT_BUFFER_N_SAMPLES: usize = 256;
pub const DEFAULT_QUANTUM_LEN_US: u64 = 100;
pub const DEFAULT_SPEED_WPM: u32 = 20;
pub const DEFAULT_FREQUENCY_HZ: u32 = 600;
pub const DEFAULT_VOLUME_PERCENT: u32 = 70;
pub const DEFAULT_GAP: u32 = 0;
pub const DEFAULT_WEIGHTING: u32 = 50;
pub const DEFAULT_SLOPE_LEN_US: u32 = 5_000;

/// Attack/release envelope shapes for the amplitudes table (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneShape {
    Linear,
    RaisedCosine,
    Sine,
    Rectangular,
}

/// A hook the generator calls on every dequeued tone, letting an attached
/// key drive its own timing and state machine (spec §4.3 steps 3 and 8).
pub trait KeyerHook: Send + Sync {
    /// Advance an external timer by the duration of the tone just dequeued.
    fn add_timer_us(&self, duration_us: u64);
    /// Invoked after a tone finishes. Returns `Busy` on lock contention; the
    /// generator retries once after 1ms.
    fn advance_state(&self) -> CwResult<()>;
}

pub type KeyingCallback = Box<dyn FnMut(bool) + Send>;

#[derive(Debug, Clone, Copy)]
struct Params {
    send_speed: u32,
    frequency_hz: u32,
    volume_percent: u32,
    volume_abs: i16,
    gap: u32,
    weighting: u32,
    timing: Timing,
    in_sync: bool,
}

impl Default for Params {
    fn default() -> Self {
        let mut p = Params {
            send_speed: DEFAULT_SPEED_WPM,
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            volume_percent: DEFAULT_VOLUME_PERCENT,
            volume_abs: 0,
            gap: DEFAULT_GAP,
            weighting: DEFAULT_WEIGHTING,
            timing: Timing::default(),
            in_sync: false,
        };
        p.volume_abs = volume_abs_of(p.volume_percent);
        p.sync();
        p
    }
}

impl Params {
    fn sync(&mut self) {
        if self.in_sync {
            return;
        }
        self.timing = Timing::compute(self.send_speed, self.weighting, self.gap);
        self.in_sync = true;
    }
}

fn volume_abs_of(percent: u32) -> i16 {
    // Scale against i16::MAX rather than 32768 so 100% cannot overflow.
    ((percent as i32 * i16::MAX as i32) / 100) as i16
}

/// Precomputed envelope table (spec §4.4). Recomputed whenever shape,
/// length, sample rate or volume changes.
#[derive(Debug, Clone)]
struct SlopeTable {
    shape: ToneShape,
    len_us: u32,
    amplitudes: Vec<i16>,
}

impl Default for SlopeTable {
    fn default() -> Self {
        let mut t = SlopeTable {
            shape: ToneShape::RaisedCosine,
            len_us: DEFAULT_SLOPE_LEN_US,
            amplitudes: Vec::new(),
        };
        t.recompute(48_000, volume_abs_of(DEFAULT_VOLUME_PERCENT));
        t
    }
}

impl SlopeTable {
    fn recompute(&mut self, sample_rate: u32, volume_abs: i16) {
        if matches!(self.shape, ToneShape::Rectangular) {
            self.amplitudes.clear();
            return;
        }
        let n = ((sample_rate as u64 / 100) * self.len_us as u64 / 10_000) as usize;
        self.amplitudes = (0..n)
            .map(|i| shape_amplitude(self.shape, i, n, volume_abs))
            .collect();
    }
}

fn shape_amplitude(shape: ToneShape, i: usize, n: usize, volume_abs: i16) -> i16 {
    if n == 0 {
        return 0;
    }
    let v = volume_abs as f64;
    let frac = match shape {
        ToneShape::Linear => i as f64 / n as f64,
        ToneShape::RaisedCosine => 1.0 - (1.0 + (PI * i as f64 / n as f64).cos()) / 2.0,
        ToneShape::Sine => (PI * i as f64 / (2.0 * n as f64)).sin(),
        ToneShape::Rectangular => return 0,
    };
    (v * frac).round() as i16
}

/// One per process (spec §3). Owns the tone queue and the audio sink.
pub struct Generator {
    queue: Arc<ToneQueue>,
    params: Arc<Mutex<Params>>,
    slope: Arc<Mutex<SlopeTable>>,
    sample_rate: Arc<Mutex<u32>>,
    buffer_n_samples: usize,
    quantum_len_us: u64,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    keyer_hook: Arc<Mutex<Option<Arc<dyn KeyerHook>>>>,
    keying_callback: Arc<Mutex<Option<KeyingCallback>>>,
    sink: Option<Box<dyn AudioSink>>,
    sink_unavailable: Arc<AtomicBool>,
    renders_directly: Arc<AtomicBool>,
}

impl Generator {
    /// Open the sink at the first supported probe rate (spec §6) and
    /// prepare control-plane state. Does not start the producer thread.
    pub fn new(mut sink: Box<dyn AudioSink>) -> CwResult<Self> {
        let rate = sink.open(SAMPLE_RATE_PROBE_ORDER)?;
        let params = Params::default();
        let mut slope = SlopeTable::default();
        slope.recompute(rate, params.volume_abs);
        let renders_directly = sink.renders_directly();

        Ok(Generator {
            queue: Arc::new(ToneQueue::new(crate::queue::DEFAULT_CAPACITY)),
            params: Arc::new(Mutex::new(params)),
            slope: Arc::new(Mutex::new(slope)),
            sample_rate: Arc::new(Mutex::new(rate)),
            buffer_n_samples: DEFAULT_BUFFER_N_SAMPLES,
            quantum_len_us: DEFAULT_QUANTUM_LEN_US,
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
            keyer_hook: Arc::new(Mutex::new(None)),
            keying_callback: Arc::new(Mutex::new(None)),
            sink: Some(sink),
            sink_unavailable: Arc::new(AtomicBool::new(false)),
            renders_directly: Arc::new(AtomicBool::new(renders_directly)),
        })
    }

    pub fn queue(&self) -> &Arc<ToneQueue> {
        &self.queue
    }

    pub fn sample_rate(&self) -> u32 {
        *self.sample_rate.lock().unwrap()
    }

    pub fn quantum_len_us(&self) -> u64 {
        self.quantum_len_us
    }

    /// True for sinks that render a tone directly rather than through the
    /// sample-buffer pipeline (null, console); used by key input subsystems
    /// to pick the console-sink tone shortcut (spec §4.6).
    pub fn renders_directly(&self) -> bool {
        self.renders_directly.load(Ordering::Acquire)
    }

    pub fn attach_keyer_hook(&self, hook: Arc<dyn KeyerHook>) {
        *self.keyer_hook.lock().unwrap() = Some(hook);
    }

    pub fn set_keying_callback(&self, cb: KeyingCallback) {
        *self.keying_callback.lock().unwrap() = Some(cb);
    }

    // ---- control-plane setters/getters (spec §6) ----

    pub fn set_speed(&self, wpm: u32) -> CwResult<()> {
        timing::validate_speed(wpm)?;
        let mut p = self.params.lock().unwrap();
        p.send_speed = wpm;
        p.in_sync = false;
        Ok(())
    }

    pub fn speed(&self) -> u32 {
        self.params.lock().unwrap().send_speed
    }

    pub fn set_frequency(&self, hz: u32) -> CwResult<()> {
        timing::validate_frequency(hz)?;
        self.params.lock().unwrap().frequency_hz = hz;
        Ok(())
    }

    pub fn frequency(&self) -> u32 {
        self.params.lock().unwrap().frequency_hz
    }

    pub fn set_volume(&self, percent: u32) -> CwResult<()> {
        timing::validate_volume(percent)?;
        let mut p = self.params.lock().unwrap();
        p.volume_percent = percent;
        p.volume_abs = volume_abs_of(percent);
        let rate = *self.sample_rate.lock().unwrap();
        self.slope.lock().unwrap().recompute(rate, p.volume_abs);
        Ok(())
    }

    pub fn volume(&self) -> u32 {
        self.params.lock().unwrap().volume_percent
    }

    pub fn set_gap(&self, gap: u32) -> CwResult<()> {
        timing::validate_gap(gap)?;
        let mut p = self.params.lock().unwrap();
        p.gap = gap;
        p.in_sync = false;
        Ok(())
    }

    pub fn gap(&self) -> u32 {
        self.params.lock().unwrap().gap
    }

    pub fn set_weighting(&self, weighting: u32) -> CwResult<()> {
        timing::validate_weighting(weighting)?;
        let mut p = self.params.lock().unwrap();
        p.weighting = weighting;
        p.in_sync = false;
        Ok(())
    }

    pub fn weighting(&self) -> u32 {
        self.params.lock().unwrap().weighting
    }

    /// `-1` (represented here as `None`) for either argument means "leave
    /// unchanged". Rectangular + nonzero length is rejected; rectangular
    /// with no explicit length forces length to 0 (spec §4.4).
    pub fn set_tone_slope(&self, shape: Option<ToneShape>, len_us: Option<u32>) -> CwResult<()> {
        let mut slope = self.slope.lock().unwrap();
        let new_shape = shape.unwrap_or(slope.shape);
        let mut new_len = len_us.unwrap_or(slope.len_us);

        if matches!(new_shape, ToneShape::Rectangular) {
            if len_us.is_some() && new_len > 0 {
                return Err(CwError::Invalid(
                    "rectangular slope cannot have nonzero length".into(),
                ));
            }
            new_len = 0;
        }

        slope.shape = new_shape;
        slope.len_us = new_len;
        let rate = *self.sample_rate.lock().unwrap();
        let volume_abs = self.params.lock().unwrap().volume_abs;
        slope.recompute(rate, volume_abs);
        Ok(())
    }

    pub fn slope_n_samples(&self) -> usize {
        self.slope.lock().unwrap().amplitudes.len()
    }

    fn synced_timing(&self) -> Timing {
        let mut p = self.params.lock().unwrap();
        p.sync();
        p.timing
    }

    /// Pre-flight check from spec §4.5: reject before enqueueing any tone
    /// of a representation if the queue is already at/above high water.
    pub fn check_headroom(&self) -> CwResult<()> {
        if self.queue.length() >= self.queue.high_water_mark() {
            return Err(CwError::Again);
        }
        Ok(())
    }

    pub fn enqueue(&self, tone: Tone) -> CwResult<()> {
        self.queue.enqueue(tone)
    }

    pub fn timing(&self) -> Timing {
        self.synced_timing()
    }

    pub fn flush_tone_queue(&self) {
        self.queue.flush();
    }

    pub fn wait_for_tone(&self) {
        self.queue.wait_for_next_dequeue();
    }

    pub fn wait_for_tone_queue(&self) {
        self.queue.wait_for_drain();
    }

    pub fn wait_for_tone_queue_critical(&self, level: usize) {
        self.queue.wait_for_level_below(level);
    }

    pub fn is_sink_available(&self) -> bool {
        !self.sink_unavailable.load(Ordering::Acquire)
    }

    /// Enqueue a single `(0, quantum_len, NO_SLOPES)` tone to drop the sink
    /// to zero amplitude cleanly, without stopping the producer thread.
    pub fn silence(&self) -> CwResult<()> {
        self.queue
            .enqueue(Tone::silence(self.quantum_len_us))
    }

    /// Start the producer thread (spec §4.3).
    pub fn start(&mut self) -> CwResult<()> {
        if self.running.load(Ordering::Acquire) {
            return Ok(());
        }
        let sink = self
            .sink
            .take()
            .ok_or_else(|| CwError::Internal("generator already started".into()))?;

        self.running.store(true, Ordering::Release);
        let running = Arc::clone(&self.running);
        let queue = Arc::clone(&self.queue);
        let params = Arc::clone(&self.params);
        let slope = Arc::clone(&self.slope);
        let sample_rate = Arc::clone(&self.sample_rate);
        let buffer_n_samples = self.buffer_n_samples;
        let keyer_hook = Arc::clone(&self.keyer_hook);
        let keying_callback = Arc::clone(&self.keying_callback);
        let sink_unavailable = Arc::clone(&self.sink_unavailable);

        let handle = thread::Builder::new()
            .name("cwgen-producer".into())
            .spawn(move || {
                producer_loop(
                    sink,
                    running,
                    queue,
                    params,
                    slope,
                    sample_rate,
                    buffer_n_samples,
                    keyer_hook,
                    keying_callback,
                    sink_unavailable,
                )
            })
            .map_err(|e| CwError::Internal(format!("failed to spawn producer thread: {e}")))?;

        self.thread = Some(handle);
        Ok(())
    }

    /// Stop the producer thread: flush the queue, enqueue a zero-volume
    /// quantum tone to wake it, and join (spec §5).
    pub fn stop(&mut self) -> CwResult<()> {
        if !self.running.load(Ordering::Acquire) {
            return Ok(());
        }
        self.queue.flush();
        let _ = self.queue.enqueue(Tone::silence(self.quantum_len_us));
        self.running.store(false, Ordering::Release);

        if let Some(handle) = self.thread.take() {
            handle
                .join()
                .map_err(|_| CwError::Internal("producer thread panicked".into()))?;
        }
        Ok(())
    }
}

impl Drop for Generator {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Cheap, cloneable handle onto the bits of a `Generator` a keyer needs:
/// the tone queue and the current control parameters. Keyers hold this
/// instead of a `&Generator` so they don't fight the generator's `&mut
/// self` start/stop lifecycle.
#[derive(Clone)]
pub struct GeneratorHandle {
    queue: Arc<ToneQueue>,
    params: Arc<Mutex<Params>>,
    slope: Arc<Mutex<SlopeTable>>,
    quantum_len_us: u64,
    renders_directly: Arc<AtomicBool>,
}

impl GeneratorHandle {
    pub fn frequency(&self) -> u32 {
        self.params.lock().unwrap().frequency_hz
    }

    pub fn timing(&self) -> Timing {
        let mut p = self.params.lock().unwrap();
        p.sync();
        p.timing
    }

    pub fn enqueue(&self, tone: Tone) -> CwResult<()> {
        self.queue.enqueue(tone)
    }

    pub fn check_headroom(&self) -> CwResult<()> {
        if self.queue.length() >= self.queue.high_water_mark() {
            return Err(CwError::Again);
        }
        Ok(())
    }

    pub fn queue(&self) -> &Arc<ToneQueue> {
        &self.queue
    }

    /// Re-issue quantum for `forever` hold tones (spec §4.6).
    pub fn quantum_len_us(&self) -> u64 {
        self.quantum_len_us
    }

    /// Length in microseconds of the configured tone-slope (spec §4.4/§4.6).
    pub fn slope_len_us(&self) -> u32 {
        self.slope.lock().unwrap().len_us
    }

    pub fn renders_directly(&self) -> bool {
        self.renders_directly.load(Ordering::Acquire)
    }
}

impl Generator {
    pub fn handle(&self) -> GeneratorHandle {
        GeneratorHandle {
            queue: Arc::clone(&self.queue),
            params: Arc::clone(&self.params),
            slope: Arc::clone(&self.slope),
            quantum_len_us: self.quantum_len_us,
            renders_directly: Arc::clone(&self.renders_directly),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn producer_loop(
    mut sink: Box<dyn AudioSink>,
    running: Arc<AtomicBool>,
    queue: Arc<ToneQueue>,
    params: Arc<Mutex<Params>>,
    slope: Arc<Mutex<SlopeTable>>,
    sample_rate: Arc<Mutex<u32>>,
    buffer_n_samples: usize,
    keyer_hook: Arc<Mutex<Option<Arc<dyn KeyerHook>>>>,
    keying_callback: Arc<Mutex<Option<KeyingCallback>>>,
    sink_unavailable: Arc<AtomicBool>,
) {
    let mut buffer = vec![0i16; buffer_n_samples];
    let mut sub_start = 0usize;
    let mut phase_offset = 0f64;
    let mut last_key_closed: Option<bool> = None;

    while running.load(Ordering::Acquire) {
        let tone = match queue.dequeue() {
            Dequeued::Tone(t) => t,
            Dequeued::IdleEmpty => {
                if sub_start > 0 {
                    let rate = *sample_rate.lock().unwrap();
                    let pad_samples = buffer_n_samples - sub_start;
                    let pad = Tone::silence(
                        (pad_samples as u64 * 1_000_000) / rate.max(1) as u64,
                    );
                    render_tone(
                        &mut sink,
                        &mut buffer,
                        &mut sub_start,
                        &mut phase_offset,
                        pad,
                        rate,
                        &slope,
                        0,
                        &sink_unavailable,
                    );
                }
                queue.wait_while_empty(Duration::from_millis(20));
                continue;
            }
        };

        if let Some(hook) = keyer_hook.lock().unwrap().clone() {
            hook.add_timer_us(tone.duration_us);
        }

        if sink.renders_directly() {
            if sink.render_tone_directly(tone).is_err() {
                sink_unavailable.store(true, Ordering::Release);
            }
        } else {
            let rate = *sample_rate.lock().unwrap();
            let volume_abs = params.lock().unwrap().volume_abs;
            render_tone(
                &mut sink,
                &mut buffer,
                &mut sub_start,
                &mut phase_offset,
                tone,
                rate,
                &slope,
                volume_abs,
                &sink_unavailable,
            );
        }

        let closed = tone.frequency_hz > 0;
        if last_key_closed != Some(closed) {
            last_key_closed = Some(closed);
            if let Some(cb) = keying_callback.lock().unwrap().as_mut() {
                cb(closed);
            }
        }

        if let Some(hook) = keyer_hook.lock().unwrap().clone() {
            if hook.advance_state().is_err() {
                thread::sleep(Duration::from_millis(1));
                let _ = hook.advance_state();
            }
        }
    }

    let _ = sink.close();
}

/// Render one tone's samples into `buffer`, writing full buffers to `sink`
/// as they fill (spec §4.4).
#[allow(clippy::too_many_arguments)]
fn render_tone(
    sink: &mut Box<dyn AudioSink>,
    buffer: &mut [i16],
    sub_start: &mut usize,
    phase_offset: &mut f64,
    tone: Tone,
    sample_rate: u32,
    slope: &Arc<Mutex<SlopeTable>>,
    volume_abs: i16,
    sink_unavailable: &Arc<AtomicBool>,
) {
    let buffer_n_samples = buffer.len();
    let n_samples = tone.n_samples(sample_rate) as usize;
    if n_samples == 0 {
        return;
    }

    let slope_n = slope.lock().unwrap().amplitudes.len();
    let max_each = n_samples / 2;
    let (rising_n, falling_n) = match tone.slope_mode {
        SlopeMode::NoSlopes => (0, 0),
        SlopeMode::RisingOnly => (slope_n.min(max_each), 0),
        SlopeMode::FallingOnly => (0, slope_n.min(max_each)),
        SlopeMode::StandardBoth => (slope_n.min(max_each), slope_n.min(max_each)),
    };

    let mut sample_iterator = 0usize;
    let mut remaining = n_samples;

    while remaining > 0 {
        let free = buffer_n_samples - *sub_start;
        let take = remaining.min(free);
        let sub_stop = *sub_start + take; // exclusive

        {
            let slope_guard = slope.lock().unwrap();
            for (j, idx) in (*sub_start..sub_stop).enumerate() {
                let amp = amplitude_at(
                    &tone,
                    sample_iterator,
                    n_samples,
                    rising_n,
                    falling_n,
                    &slope_guard.amplitudes,
                    volume_abs,
                );
                let phase = 2.0 * PI * tone.frequency_hz as f64 * j as f64 / sample_rate as f64
                    + *phase_offset;
                buffer[idx] = (amp as f64 * phase.sin()).round() as i16;
                sample_iterator += 1;
            }
            if take > 0 {
                // Phase one sample past the last one written, so the next
                // segment's j=0 continues the waveform without a click.
                let last_phase = 2.0 * PI * tone.frequency_hz as f64 * take as f64
                    / sample_rate as f64
                    + *phase_offset;
                *phase_offset = last_phase % (2.0 * PI);
            }
        }

        if sub_stop == buffer_n_samples {
            if sink.write(buffer).is_err() {
                sink_unavailable.store(true, Ordering::Release);
            }
            *sub_start = 0;
        } else {
            *sub_start = sub_stop;
        }
        remaining -= take;
    }
}

fn amplitude_at(
    tone: &Tone,
    i: usize,
    n_samples: usize,
    rising_n: usize,
    falling_n: usize,
    slope_amplitudes: &[i16],
    volume_abs: i16,
) -> i16 {
    if tone.frequency_hz == 0 {
        return 0;
    }
    if i < rising_n {
        slope_amplitudes.get(i).copied().unwrap_or(volume_abs)
    } else if n_samples > 0 && i >= n_samples - falling_n {
        let from_end = n_samples - i - 1;
        slope_amplitudes.get(from_end).copied().unwrap_or(volume_abs)
    } else {
        volume_abs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;

    #[test]
    fn volume_abs_matches_spec_formula() {
        assert_eq!(volume_abs_of(70), ((70 * i16::MAX as i32) / 100) as i16);
        assert_eq!(volume_abs_of(0), 0);
        assert_eq!(volume_abs_of(100), i16::MAX);
    }

    #[test]
    fn default_params_start_out_of_sync_then_sync_once() {
        let mut p = Params::default();
        assert!(p.in_sync);
        p.send_speed = 25;
        p.in_sync = false;
        p.sync();
        assert!(p.in_sync);
    }

    #[test]
    fn rectangular_slope_forces_zero_length() {
        let gen = Generator::new(Box::new(NullSink::default())).unwrap();
        assert!(gen
            .set_tone_slope(Some(ToneShape::Rectangular), Some(5000))
            .is_err());
        gen.set_tone_slope(Some(ToneShape::Rectangular), None).unwrap();
        assert_eq!(gen.slope_n_samples(), 0);
    }

    #[test]
    fn slope_table_has_n_entries() {
        let gen = Generator::new(Box::new(NullSink::default())).unwrap();
        gen.set_tone_slope(Some(ToneShape::RaisedCosine), Some(5_000))
            .unwrap();
        let rate = gen.sample_rate();
        let expected = ((rate as u64 / 100) * 5_000 / 10_000) as usize;
        assert_eq!(gen.slope_n_samples(), expected);
    }

    #[test]
    fn scenario_1_dot_rendering_shape() {
        // 20 wpm, 600Hz, 70% volume, 48kHz, raised-cosine 5ms slope.
        let gen = Generator::new(Box::new(NullSink::default())).unwrap();
        gen.set_speed(20).unwrap();
        gen.set_frequency(600).unwrap();
        gen.set_volume(70).unwrap();
        gen.set_tone_slope(Some(ToneShape::RaisedCosine), Some(5_000))
            .unwrap();
        let timing = gen.timing();
        assert_eq!(timing.dot_len_us, 60_000);
        assert_eq!(gen.slope_n_samples(), 240);
    }
}
