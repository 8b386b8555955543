//! Tone queue (spec §3, §4.2): a bounded FIFO ring shared between client
//! threads (enqueue, setters) and the generator's single producer thread
//! (dequeue). One mutex protects head/tail/length/state; enqueue and
//! dequeue are O(1) under that lock.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::error::CwError;
use crate::tone::Tone;

pub const DEFAULT_CAPACITY: usize = 1024;
pub const DEFAULT_LOW_WATER_MARK: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Idle,
    Busy,
}

/// Result of a `dequeue` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dequeued {
    Tone(Tone),
    IdleEmpty,
}

struct Inner {
    ring: VecDeque<Tone>,
    capacity: usize,
    state: QueueState,
    high_water_mark: usize,
    low_water_mark: usize,
    /// Incremented on every real (non-forever) dequeue; lets client threads
    /// detect "at least one more tone has finished" without missing wakeups.
    dequeue_count: u64,
    /// Set when a dequeue makes length cross down onto the low-water mark.
    low_water_hit: bool,
}

/// Bounded producer/consumer ring of tones (spec §3's "Tone Queue").
pub struct ToneQueue {
    inner: Mutex<Inner>,
    /// Signalled when the queue becomes non-empty; the producer waits here.
    not_empty: Condvar,
    /// Signalled on every real dequeue and on flush; client waits here.
    progress: Condvar,
}

impl ToneQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        ToneQueue {
            inner: Mutex::new(Inner {
                ring: VecDeque::with_capacity(capacity),
                capacity,
                state: QueueState::Idle,
                high_water_mark: capacity.saturating_sub(1),
                low_water_mark: DEFAULT_LOW_WATER_MARK,
                dequeue_count: 0,
                low_water_hit: false,
            }),
            not_empty: Condvar::new(),
            progress: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap().capacity
    }

    pub fn length(&self) -> usize {
        self.inner.lock().unwrap().ring.len()
    }

    pub fn is_full(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.ring.len() >= inner.high_water_mark
    }

    pub fn high_water_mark(&self) -> usize {
        self.inner.lock().unwrap().high_water_mark
    }

    pub fn state(&self) -> QueueState {
        self.inner.lock().unwrap().state
    }

    pub fn set_high_water_mark(&self, n: usize) {
        self.inner.lock().unwrap().high_water_mark = n;
    }

    pub fn set_low_water_mark(&self, n: usize) {
        self.inner.lock().unwrap().low_water_mark = n;
    }

    /// Enqueue one tone. Rejects with `Again` under back-pressure without
    /// any side effects. If the head entry is a `forever` tone and the new
    /// tone is not, the head is overwritten in place rather than appended.
    pub fn enqueue(&self, tone: Tone) -> Result<(), CwError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.ring.len() >= inner.high_water_mark {
            return Err(CwError::Again);
        }

        let was_idle = inner.state == QueueState::Idle;
        let replace_head = matches!(inner.ring.front(), Some(h) if h.forever) && !tone.forever;
        if replace_head {
            *inner.ring.front_mut().unwrap() = tone;
        } else {
            inner.ring.push_back(tone);
        }
        if was_idle {
            inner.state = QueueState::Busy;
        }
        drop(inner);
        self.not_empty.notify_all();
        Ok(())
    }

    /// Dequeue the head tone. `forever` tones are copied out but left in
    /// place (no progress notification in that case, since nothing changed).
    pub fn dequeue(&self) -> Dequeued {
        let mut inner = self.inner.lock().unwrap();
        let Some(&head) = inner.ring.front() else {
            inner.state = QueueState::Idle;
            return Dequeued::IdleEmpty;
        };

        if head.forever {
            return Dequeued::Tone(head);
        }

        inner.ring.pop_front();
        inner.dequeue_count += 1;
        if inner.ring.len() == inner.low_water_mark {
            inner.low_water_hit = true;
        }
        drop(inner);
        self.progress.notify_all();
        Dequeued::Tone(head)
    }

    /// Drop all queued tones without touching the sink.
    pub fn flush(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.ring.clear();
        inner.state = QueueState::Idle;
        drop(inner);
        self.progress.notify_all();
    }

    /// Block the producer thread until the queue has at least one tone, or
    /// `timeout` elapses (used for the idle wait in spec §4.3 step 2).
    pub fn wait_while_empty(&self, timeout: Duration) {
        let inner = self.inner.lock().unwrap();
        if inner.ring.is_empty() {
            let _ = self.not_empty.wait_timeout(inner, timeout).unwrap();
        }
    }

    /// Block the calling (client) thread until the queue has fully drained.
    pub fn wait_for_drain(&self) {
        let mut inner = self.inner.lock().unwrap();
        while !inner.ring.is_empty() {
            inner = self.progress.wait(inner).unwrap();
        }
    }

    /// Block the calling thread until queue length drops below `n`.
    pub fn wait_for_level_below(&self, n: usize) {
        let mut inner = self.inner.lock().unwrap();
        while inner.ring.len() >= n {
            inner = self.progress.wait(inner).unwrap();
        }
    }

    /// Block until at least one more tone has been dequeued since this
    /// call started. Used by the control plane's `wait_for_tone`.
    pub fn wait_for_next_dequeue(&self) {
        let mut inner = self.inner.lock().unwrap();
        let start = inner.dequeue_count;
        while inner.dequeue_count == start {
            inner = self.progress.wait(inner).unwrap();
        }
    }

    /// Block until the low-water mark has been crossed at least once since
    /// the last call, then clear the flag.
    pub fn wait_for_low_water(&self) {
        let mut inner = self.inner.lock().unwrap();
        while !inner.low_water_hit {
            inner = self.progress.wait(inner).unwrap();
        }
        inner.low_water_hit = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tone::SlopeMode;

    fn tone(us: u64) -> Tone {
        Tone::new(600, us, SlopeMode::NoSlopes)
    }

    #[test]
    fn fifo_order() {
        let q = ToneQueue::new(8);
        for i in 0..5u64 {
            q.enqueue(tone(i)).unwrap();
        }
        for i in 0..5u64 {
            match q.dequeue() {
                Dequeued::Tone(t) => assert_eq!(t.duration_us, i),
                Dequeued::IdleEmpty => panic!("unexpected empty"),
            }
        }
        assert_eq!(q.dequeue(), Dequeued::IdleEmpty);
    }

    #[test]
    fn idle_busy_transitions() {
        let q = ToneQueue::new(8);
        assert_eq!(q.state(), QueueState::Idle);
        q.enqueue(tone(1)).unwrap();
        assert_eq!(q.state(), QueueState::Busy);
        q.dequeue();
        assert_eq!(q.state(), QueueState::Idle);
    }

    #[test]
    fn back_pressure_at_high_water_mark() {
        let q = ToneQueue::new(4);
        q.set_high_water_mark(2);
        q.enqueue(tone(1)).unwrap();
        q.enqueue(tone(2)).unwrap();
        assert_eq!(q.enqueue(tone(3)), Err(CwError::Again));
        q.dequeue();
        assert!(q.enqueue(tone(4)).is_ok());
    }

    #[test]
    fn capacity_1024_scenario() {
        let q = ToneQueue::new(1024);
        q.set_high_water_mark(1023);
        for _ in 0..1023 {
            q.enqueue(tone(1)).unwrap();
        }
        assert_eq!(q.enqueue(tone(1)), Err(CwError::Again));
        q.dequeue();
        assert!(q.enqueue(tone(1)).is_ok());
    }

    #[test]
    fn forever_tone_not_advanced_by_dequeue() {
        let q = ToneQueue::new(8);
        q.enqueue(Tone::forever(600, 100, SlopeMode::NoSlopes)).unwrap();
        match q.dequeue() {
            Dequeued::Tone(t) => assert!(t.forever),
            _ => panic!(),
        }
        match q.dequeue() {
            Dequeued::Tone(t) => assert!(t.forever),
            _ => panic!(),
        }
        assert_eq!(q.length(), 1);
    }

    #[test]
    fn non_forever_enqueue_replaces_forever_head() {
        let q = ToneQueue::new(8);
        q.enqueue(Tone::forever(600, 100, SlopeMode::NoSlopes)).unwrap();
        q.enqueue(tone(42)).unwrap();
        assert_eq!(q.length(), 1);
        match q.dequeue() {
            Dequeued::Tone(t) => {
                assert!(!t.forever);
                assert_eq!(t.duration_us, 42);
            }
            _ => panic!(),
        }
    }

    #[test]
    fn flush_empties_without_touching_sink() {
        let q = ToneQueue::new(8);
        q.enqueue(tone(1)).unwrap();
        q.enqueue(tone(2)).unwrap();
        q.flush();
        assert_eq!(q.length(), 0);
        assert_eq!(q.state(), QueueState::Idle);
    }

    #[test]
    fn low_water_notification_on_exact_crossing() {
        let q = ToneQueue::new(8);
        q.set_low_water_mark(1);
        q.enqueue(tone(1)).unwrap();
        q.enqueue(tone(2)).unwrap();
        // length goes 2 -> 1 on this dequeue, crossing the low-water mark.
        q.dequeue();
        q.wait_for_low_water();
    }
}
