//! Iambic paddle keyer (spec §4.7): a nine-state automaton driving dot and
//! dash elements off two paddle contacts, with Curtis mode A/B squeeze
//! semantics. State-machine shape grounded on the `Keyer`/`KeyerState`
//! design in the software-defined-radio keyer reference, adapted from its
//! per-sample polling loop to the tone-duration-driven `advance_state`
//! callback the generator invokes after every dequeued tone.

use std::sync::Mutex;

use crate::error::{CwError, CwResult};
use crate::generator::{GeneratorHandle, KeyerHook};
use crate::tone::{SlopeMode, Tone};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    InDotA,
    InDotB,
    InDashA,
    InDashB,
    AfterDotA,
    AfterDotB,
    AfterDashA,
    AfterDashB,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Dot,
    Dash,
}

struct Inner {
    state: State,
    /// Raw, instantaneous paddle contact state.
    dot_paddle: bool,
    dash_paddle: bool,
    /// Sticky memory of a paddle closure: set the instant the paddle closes,
    /// cleared only once observed open while deciding the next element from
    /// an AFTER_*_A state (spec §4.7's paddle-memory model).
    dot_latch: bool,
    dash_latch: bool,
    /// Curtis mode B: set while an element is playing (`InDot*`/`InDash*`)
    /// if the opposite paddle closes before it ends. Read and cleared at
    /// the gap transition to route into the `_B` after-state, which forces
    /// the trailing opposite element even if both paddles have since been
    /// released; mirrored (mostly moot, since already consumed) when the
    /// forced element itself starts, so a fresh squeeze racing in at that
    /// instant is still honored.
    curtis_b_latch: bool,
    mode_b: bool,
}

/// Drives a generator from two paddle contacts. `notify_dot`/`notify_dash`
/// report raw paddle open/closed state; `advance_state` is invoked by the
/// generator's producer thread after every dequeued tone to step the
/// automaton forward.
pub struct IambicKeyer {
    inner: Mutex<Inner>,
    handle: GeneratorHandle,
}

impl IambicKeyer {
    pub fn new(handle: GeneratorHandle) -> Self {
        IambicKeyer {
            inner: Mutex::new(Inner {
                state: State::Idle,
                dot_paddle: false,
                dash_paddle: false,
                dot_latch: false,
                dash_latch: false,
                curtis_b_latch: false,
                mode_b: true,
            }),
            handle,
        }
    }

    pub fn set_curtis_mode_b(&self, enabled: bool) {
        self.inner.lock().unwrap().mode_b = enabled;
    }

    pub fn curtis_mode_b(&self) -> bool {
        self.inner.lock().unwrap().mode_b
    }

    pub fn notify_dot(&self, closed: bool) -> CwResult<()> {
        self.notify_paddle(Some(closed), None)
    }

    pub fn notify_dash(&self, closed: bool) -> CwResult<()> {
        self.notify_paddle(None, Some(closed))
    }

    pub fn notify_paddle(&self, dot: Option<bool>, dash: Option<bool>) -> CwResult<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| CwError::Internal("iambic keyer lock poisoned".into()))?;
        if let Some(d) = dot {
            inner.dot_paddle = d;
            if d {
                inner.dot_latch = true;
            }
        }
        if let Some(d) = dash {
            inner.dash_paddle = d;
            if d {
                inner.dash_latch = true;
            }
        }

        match inner.state {
            State::InDotA | State::InDotB if inner.mode_b && inner.dash_paddle => {
                inner.curtis_b_latch = true;
            }
            State::InDashA | State::InDashB if inner.mode_b && inner.dot_paddle => {
                inner.curtis_b_latch = true;
            }
            State::Idle => {
                start_element(&mut inner, &self.handle)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Called after every tone the generator dequeues while this keyer is
    /// attached. Returns `Busy` on lock contention so the generator can
    /// retry once.
    fn step(&self) -> CwResult<()> {
        let mut inner = self
            .inner
            .try_lock()
            .map_err(|_| CwError::Busy("iambic keyer state locked".into()))?;

        match inner.state {
            State::Idle => start_element(&mut inner, &self.handle),
            State::InDotA | State::InDotB => enter_gap(&mut inner, &self.handle, Mark::Dot),
            State::InDashA | State::InDashB => enter_gap(&mut inner, &self.handle, Mark::Dash),
            // Mode A: decide purely from live/latched paddle state, may idle.
            State::AfterDotA => decide_live(&mut inner, &self.handle, Mark::Dot),
            State::AfterDashA => decide_live(&mut inner, &self.handle, Mark::Dash),
            // Mode B: a squeeze was detected during the element that just
            // finished, so the opposite element fires unconditionally, even
            // if both paddles have since been released.
            State::AfterDotB => force_opposite(&mut inner, &self.handle, Mark::Dot),
            State::AfterDashB => force_opposite(&mut inner, &self.handle, Mark::Dash),
        }
    }
}

impl KeyerHook for IambicKeyer {
    fn add_timer_us(&self, _duration_us: u64) {
        // The automaton only needs per-tone transitions, not an
        // accumulated timer; nothing to do here.
    }

    fn advance_state(&self) -> CwResult<()> {
        self.step()
    }
}

fn start_element(inner: &mut Inner, handle: &GeneratorHandle) -> CwResult<()> {
    if inner.dot_latch {
        send_dot(inner, handle)
    } else if inner.dash_latch {
        send_dash(inner, handle)
    } else {
        inner.state = State::Idle;
        Ok(())
    }
}

/// IN_DOT*/IN_DASH* -> AFTER_*: routes to the `_B` after-state (and clears
/// `curtis_b_latch`) iff the opposite paddle closed while this element was
/// playing; otherwise the ordinary `_A` after-state, regardless of which
/// in-state variant this element itself entered as.
fn enter_gap(inner: &mut Inner, handle: &GeneratorHandle, just_sent: Mark) -> CwResult<()> {
    let forced = inner.curtis_b_latch;
    inner.curtis_b_latch = false;
    let timing = handle.timing();
    handle.enqueue(Tone::silence(timing.eom_space_len_us as u64))?;
    inner.state = match (just_sent, forced) {
        (Mark::Dot, false) => State::AfterDotA,
        (Mark::Dot, true) => State::AfterDotB,
        (Mark::Dash, false) => State::AfterDashA,
        (Mark::Dash, true) => State::AfterDashB,
    };
    Ok(())
}

/// AFTER_DOT_A / AFTER_DASH_A: consult live paddle state, clearing each
/// latch only once observed open, and may return to Idle.
fn decide_live(inner: &mut Inner, handle: &GeneratorHandle, just_sent: Mark) -> CwResult<()> {
    if !inner.dot_paddle {
        inner.dot_latch = false;
    }
    if !inner.dash_paddle {
        inner.dash_latch = false;
    }

    if inner.dot_latch && inner.dash_latch {
        return if just_sent == Mark::Dot {
            send_dash(inner, handle)
        } else {
            send_dot(inner, handle)
        };
    }
    if inner.dot_latch {
        return send_dot(inner, handle);
    }
    if inner.dash_latch {
        return send_dash(inner, handle);
    }

    inner.state = State::Idle;
    Ok(())
}

/// AFTER_DOT_B / AFTER_DASH_B: the element just sent was squeezed, so mode B
/// sends exactly one trailing opposite element unconditionally, regardless
/// of current paddle state.
fn force_opposite(inner: &mut Inner, handle: &GeneratorHandle, just_sent: Mark) -> CwResult<()> {
    if just_sent == Mark::Dot {
        send_dash(inner, handle)
    } else {
        send_dot(inner, handle)
    }
}

fn send_dot(inner: &mut Inner, handle: &GeneratorHandle) -> CwResult<()> {
    let forced = inner.curtis_b_latch;
    inner.curtis_b_latch = false;
    let timing = handle.timing();
    let tone = Tone::new(handle.frequency(), timing.dot_len_us as u64, SlopeMode::StandardBoth);
    handle.enqueue(tone)?;
    inner.state = if forced { State::InDotB } else { State::InDotA };
    Ok(())
}

fn send_dash(inner: &mut Inner, handle: &GeneratorHandle) -> CwResult<()> {
    let forced = inner.curtis_b_latch;
    inner.curtis_b_latch = false;
    let timing = handle.timing();
    let tone = Tone::new(handle.frequency(), timing.dash_len_us as u64, SlopeMode::StandardBoth);
    handle.enqueue(tone)?;
    inner.state = if forced { State::InDashB } else { State::InDashA };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Generator;
    use crate::sink::NullSink;

    fn keyer() -> (Generator, IambicKeyer) {
        let gen = Generator::new(Box::new(NullSink::default())).unwrap();
        let keyer = IambicKeyer::new(gen.handle());
        (gen, keyer)
    }

    #[test]
    fn idle_with_no_paddles_stays_idle() {
        let (_gen, keyer) = keyer();
        keyer.step().unwrap();
        assert_eq!(keyer.inner.lock().unwrap().state, State::Idle);
    }

    #[test]
    fn closing_dot_paddle_starts_sending_a_dot() {
        let (gen, keyer) = keyer();
        keyer.notify_dot(true).unwrap();
        assert_eq!(gen.queue().length(), 1);
        assert_eq!(keyer.inner.lock().unwrap().state, State::InDotA);
    }

    #[test]
    fn squeeze_alternates_between_dot_and_dash() {
        let (gen, keyer) = keyer();
        keyer.notify_paddle(Some(true), Some(true)).unwrap();
        // First element queued is the dot (tie-break convention).
        keyer.step().unwrap(); // InDotA -> AfterDotA
        keyer.step().unwrap(); // AfterDotA: both paddles held -> alternate to dash
        assert!(matches!(
            keyer.inner.lock().unwrap().state,
            State::InDashA | State::InDashB
        ));
        assert!(gen.queue().length() >= 2);
    }

    #[test]
    fn curtis_b_forces_opposite_element_even_after_both_paddles_release() {
        let (_gen, keyer) = keyer();
        keyer.notify_dot(true).unwrap(); // -> InDotA
        keyer.notify_dash(true).unwrap(); // squeeze while dot plays: curtis_b_latch set
        keyer.notify_dash(false).unwrap();
        keyer.notify_dot(false).unwrap(); // both paddles released before dot ends
        keyer.step().unwrap(); // InDotA -> AfterDotB (forced by the squeeze)
        assert_eq!(keyer.inner.lock().unwrap().state, State::AfterDotB);
        keyer.step().unwrap(); // AfterDotB forces the dash regardless of paddles
        assert!(matches!(
            keyer.inner.lock().unwrap().state,
            State::InDashA | State::InDashB
        ));
    }

    #[test]
    fn mode_a_returns_to_idle_without_a_trailing_element() {
        let (gen, keyer) = keyer();
        keyer.set_curtis_mode_b(false);
        keyer.notify_dot(true).unwrap(); // -> InDotA
        keyer.notify_dash(true).unwrap(); // mode A: squeeze never latches
        keyer.notify_dash(false).unwrap();
        keyer.notify_dot(false).unwrap(); // both paddles released before dot ends
        keyer.step().unwrap(); // InDotA -> AfterDotA (not forced, mode A)
        assert_eq!(keyer.inner.lock().unwrap().state, State::AfterDotA);
        keyer.step().unwrap(); // AfterDotA: live check sees no paddles held
        assert_eq!(keyer.inner.lock().unwrap().state, State::Idle);
        let _ = gen.queue().length();
    }
}
