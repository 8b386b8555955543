//! Control plane (spec §4.5, §6): the public API tying the generator, the
//! Morse alphabet and the two key input subsystems together. One process
//! owns one `ControlPlane`.

use std::sync::Arc;

use crate::alphabet;
use crate::error::{CwError, CwResult};
use crate::generator::{Generator, KeyingCallback, ToneShape};
use crate::keyer::{IambicKeyer, StraightKey};
use crate::sink::AudioSink;
use crate::timing::Timing;
use crate::tone::{SlopeMode, Tone};

enum KeyInput {
    None,
    Straight(StraightKey),
    Iambic(Arc<IambicKeyer>),
}

/// Top-level handle a CLI or application holds. Wraps one `Generator` and
/// at most one active key input subsystem.
pub struct ControlPlane {
    generator: Generator,
    key_input: KeyInput,
}

impl ControlPlane {
    pub fn new(sink: Box<dyn AudioSink>) -> CwResult<Self> {
        Ok(ControlPlane {
            generator: Generator::new(sink)?,
            key_input: KeyInput::None,
        })
    }

    pub fn start(&mut self) -> CwResult<()> {
        self.generator.start()
    }

    pub fn stop(&mut self) -> CwResult<()> {
        self.generator.stop()
    }

    // ---- parameter setters/getters, delegated to the generator ----

    pub fn set_speed(&self, wpm: u32) -> CwResult<()> {
        self.generator.set_speed(wpm)
    }
    pub fn speed(&self) -> u32 {
        self.generator.speed()
    }

    pub fn set_frequency(&self, hz: u32) -> CwResult<()> {
        self.generator.set_frequency(hz)
    }
    pub fn frequency(&self) -> u32 {
        self.generator.frequency()
    }

    pub fn set_volume(&self, percent: u32) -> CwResult<()> {
        self.generator.set_volume(percent)
    }
    pub fn volume(&self) -> u32 {
        self.generator.volume()
    }

    pub fn set_gap(&self, gap: u32) -> CwResult<()> {
        self.generator.set_gap(gap)
    }
    pub fn gap(&self) -> u32 {
        self.generator.gap()
    }

    pub fn set_weighting(&self, weighting: u32) -> CwResult<()> {
        self.generator.set_weighting(weighting)
    }
    pub fn weighting(&self) -> u32 {
        self.generator.weighting()
    }

    pub fn set_tone_slope(&self, shape: Option<ToneShape>, len_us: Option<u32>) -> CwResult<()> {
        self.generator.set_tone_slope(shape, len_us)
    }

    pub fn timing(&self) -> Timing {
        self.generator.timing()
    }

    pub fn set_keying_callback(&self, cb: KeyingCallback) {
        self.generator.set_keying_callback(cb);
    }

    // ---- key input subsystem selection ----

    pub fn enable_straight_key(&mut self) {
        self.key_input = KeyInput::Straight(StraightKey::new());
    }

    pub fn enable_iambic_keyer(&mut self) {
        let keyer = Arc::new(IambicKeyer::new(self.generator.handle()));
        self.generator.attach_keyer_hook(keyer.clone());
        self.key_input = KeyInput::Iambic(keyer);
    }

    pub fn disable_key_input(&mut self) {
        self.key_input = KeyInput::None;
    }

    pub fn notify_straight_key(&self, closed: bool) -> CwResult<()> {
        match &self.key_input {
            KeyInput::Straight(key) => key.notify_event(&self.generator.handle(), closed),
            _ => Err(CwError::Invalid("straight key is not enabled".into())),
        }
    }

    pub fn notify_paddle(&self, dot: Option<bool>, dash: Option<bool>) -> CwResult<()> {
        match &self.key_input {
            KeyInput::Iambic(keyer) => keyer.notify_paddle(dot, dash),
            _ => Err(CwError::Invalid("iambic keyer is not enabled".into())),
        }
    }

    pub fn notify_dot(&self, closed: bool) -> CwResult<()> {
        self.notify_paddle(Some(closed), None)
    }

    pub fn notify_dash(&self, closed: bool) -> CwResult<()> {
        self.notify_paddle(None, Some(closed))
    }

    pub fn set_curtis_mode_b(&self, enabled: bool) -> CwResult<()> {
        match &self.key_input {
            KeyInput::Iambic(keyer) => {
                keyer.set_curtis_mode_b(enabled);
                Ok(())
            }
            _ => Err(CwError::Invalid("iambic keyer is not enabled".into())),
        }
    }

    // ---- tone queue control ----

    pub fn flush_tone_queue(&self) {
        self.generator.flush_tone_queue();
    }

    pub fn wait_for_tone(&self) {
        self.generator.wait_for_tone();
    }

    pub fn wait_for_tone_queue(&self) {
        self.generator.wait_for_tone_queue();
    }

    pub fn wait_for_tone_queue_critical(&self, level: usize) {
        self.generator.wait_for_tone_queue_critical(level);
    }

    // ---- text -> tone translation (spec §4.5) ----

    /// Enqueue the dots/dashes of `representation` (e.g. `".-"`), separated
    /// by inter-element spaces, with no leading or trailing space.
    pub fn send_representation(&self, representation: &str) -> CwResult<()> {
        if representation.is_empty() {
            return Err(CwError::Invalid("empty representation".into()));
        }
        self.generator.check_headroom()?;
        let timing = self.generator.timing();
        let freq = self.generator.frequency();

        for symbol in representation.chars() {
            let duration = match symbol {
                '.' => timing.dot_len_us,
                '-' => timing.dash_len_us,
                other => {
                    return Err(CwError::Invalid(format!(
                        "'{other}' is not a dot or dash"
                    )))
                }
            };
            self.generator
                .enqueue(Tone::new(freq, duration as u64, SlopeMode::StandardBoth))?;
            self.generator
                .enqueue(Tone::silence(timing.eom_space_len_us as u64))?;
        }
        Ok(())
    }

    /// Enqueue one character: its representation followed by an
    /// end-of-character space, or a plain end-of-word space for `' '`.
    pub fn send_character(&self, c: char) -> CwResult<()> {
        if c == ' ' {
            let timing = self.generator.timing();
            // Two queued tones, not one: the low-water notification must be
            // able to fire between them for a single-character word.
            self.generator
                .enqueue(Tone::silence(timing.eow_space_len_us as u64))?;
            return self
                .generator
                .enqueue(Tone::silence(timing.adjustment_space_len_us as u64));
        }
        let representation = alphabet::representation(c).ok_or(CwError::NotFound(c))?;
        self.send_representation(representation)?;
        let timing = self.generator.timing();
        self.generator.enqueue(Tone::silence(
            (timing.eoc_space_len_us + timing.additional_space_len_us) as u64,
        ))
    }

    /// Same as `send_character` but only enqueues the representation, no
    /// trailing end-of-character space; useful for interactive echoing.
    pub fn send_character_partial(&self, c: char) -> CwResult<()> {
        if c == ' ' {
            return Ok(());
        }
        let representation = alphabet::representation(c).ok_or(CwError::NotFound(c))?;
        self.send_representation(representation)
    }

    pub fn send_string(&self, text: &str) -> CwResult<()> {
        for c in text.chars() {
            self.send_character(c)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;

    fn plane() -> ControlPlane {
        ControlPlane::new(Box::new(NullSink::default())).unwrap()
    }

    #[test]
    fn send_character_enqueues_two_n_plus_one_tones() {
        let cp = plane();
        // 'E' -> "." : one symbol, so 2*1 + 1 = 3 tones (mark, inter-element
        // space, combined end-of-character space).
        cp.send_character('E').unwrap();
        assert_eq!(cp.generator.queue().length(), 3);

        let cp = plane();
        // 'A' -> ".-": two symbols, so 2*2 + 1 = 5 tones.
        cp.send_character('A').unwrap();
        assert_eq!(cp.generator.queue().length(), 5);
    }

    #[test]
    fn send_character_whitespace_enqueues_exactly_two_tones() {
        let cp = plane();
        cp.send_character(' ').unwrap();
        assert_eq!(cp.generator.queue().length(), 2);
    }

    #[test]
    fn gap_parameter_affects_the_trailing_character_space() {
        let cp = plane();
        cp.set_gap(10).unwrap();
        let timing = cp.timing();
        assert!(timing.additional_space_len_us > 0);

        cp.send_character('E').unwrap();
        // Drain the mark and its inter-element space, leaving the trailing
        // end-of-character tone at the head.
        cp.generator.queue().dequeue();
        cp.generator.queue().dequeue();
        match cp.generator.queue().dequeue() {
            crate::queue::Dequeued::Tone(t) => assert_eq!(
                t.duration_us,
                (timing.eoc_space_len_us + timing.additional_space_len_us) as u64
            ),
            crate::queue::Dequeued::IdleEmpty => panic!("expected a tone"),
        }
    }

    #[test]
    fn send_representation_enqueues_a_space_after_every_symbol() {
        let cp = plane();
        cp.send_representation(".-.").unwrap();
        assert_eq!(cp.generator.queue().length(), 6);
    }
}
