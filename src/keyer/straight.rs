//! Straight key (spec §4.6): translates raw key-down/key-up notifications
//! into tones, deduplicating repeated notifications of the same state.

use std::sync::Mutex;

use crate::error::CwResult;
use crate::generator::GeneratorHandle;
use crate::tone::{SlopeMode, Tone};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyState {
    Open,
    Closed,
}

/// Keys the generator directly off external key-down/key-up events, as
/// opposed to `IambicKeyer`'s paddle-driven automaton.
pub struct StraightKey {
    last: Mutex<Option<KeyState>>,
}

impl Default for StraightKey {
    fn default() -> Self {
        StraightKey {
            last: Mutex::new(None),
        }
    }
}

impl StraightKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notify the key transitioned to `closed` (true) or open (false).
    /// Repeated notifications of the same state are dropped before they
    /// ever reach the tone queue (spec §4.6).
    pub fn notify_event(&self, gen: &GeneratorHandle, closed: bool) -> CwResult<()> {
        let new_state = if closed { KeyState::Closed } else { KeyState::Open };
        let mut last = self.last.lock().unwrap();
        if *last == Some(new_state) {
            return Ok(());
        }
        *last = Some(new_state);
        drop(last);

        let freq = gen.frequency();
        let quantum = gen.quantum_len_us();

        if closed {
            // Ramp up once, then hold the plateau with no slope re-applied
            // on every quantum re-dequeue.
            gen.enqueue(Tone::new(freq, gen.slope_len_us() as u64, SlopeMode::RisingOnly))?;
            gen.enqueue(Tone::forever(freq, quantum, SlopeMode::NoSlopes))
        } else if gen.renders_directly() {
            // Console sink: no ramp to render, a single silent hold suffices.
            gen.enqueue(Tone::new(0, quantum, SlopeMode::NoSlopes))
        } else {
            gen.enqueue(Tone::new(freq, gen.slope_len_us() as u64, SlopeMode::FallingOnly))?;
            gen.enqueue(Tone::forever(0, quantum, SlopeMode::NoSlopes))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Generator;
    use crate::sink::NullSink;

    #[test]
    fn dedups_repeated_notifications() {
        let gen = Generator::new(Box::new(NullSink::default())).unwrap();
        let handle = gen.handle();
        let key = StraightKey::new();
        key.notify_event(&handle, true).unwrap();
        let len_after_first = handle.queue().length();
        key.notify_event(&handle, true).unwrap();
        assert_eq!(handle.queue().length(), len_after_first);
    }

    #[test]
    fn closing_enqueues_a_ramp_then_a_steady_plateau() {
        let gen = Generator::new(Box::new(NullSink::default())).unwrap();
        let handle = gen.handle();
        let key = StraightKey::new();
        key.notify_event(&handle, true).unwrap();
        assert_eq!(handle.queue().length(), 2);
        match handle.queue().dequeue() {
            crate::queue::Dequeued::Tone(t) => {
                assert_eq!(t.slope_mode, SlopeMode::RisingOnly);
                assert!(!t.forever);
            }
            crate::queue::Dequeued::IdleEmpty => panic!("expected a tone"),
        }
        match handle.queue().dequeue() {
            crate::queue::Dequeued::Tone(t) => {
                assert_eq!(t.slope_mode, SlopeMode::NoSlopes);
                assert!(t.forever);
                assert_eq!(t.frequency_hz, handle.frequency());
            }
            crate::queue::Dequeued::IdleEmpty => panic!("expected a tone"),
        }
    }

    #[test]
    fn open_after_closed_enqueues_zero_frequency_tone() {
        let gen = Generator::new(Box::new(NullSink::default())).unwrap();
        let handle = gen.handle();
        let key = StraightKey::new();
        key.notify_event(&handle, true).unwrap();
        handle.queue().dequeue();
        handle.queue().dequeue();
        key.notify_event(&handle, false).unwrap();
        // NullSink renders directly, so open enqueues a single silent tone.
        match handle.queue().dequeue() {
            crate::queue::Dequeued::Tone(t) => assert_eq!(t.frequency_hz, 0),
            crate::queue::Dequeued::IdleEmpty => panic!("expected a tone"),
        }
    }
}
