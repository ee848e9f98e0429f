#![forbid(unsafe_code)]

//! Deadline queue for host-driven timers.
//!
//! Controllers never sleep. They arm named timers with an absolute deadline
//! and a generation, and the host pushes time forward; every timer whose
//! deadline has passed is popped in deadline order.
//!
//! # Invariants
//!
//! 1. At most one timer per kind is armed; re-arming replaces the old one.
//! 2. Timers pop in `(deadline, arm order)` order.
//! 3. A cancelled timer never pops.

use std::fmt::Debug;
use std::time::Duration;

/// A timer that reached its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired<K> {
    /// Which timer fired.
    pub kind: K,
    /// Generation recorded when the timer was armed.
    pub generation: u64,
    /// The deadline that passed.
    pub at: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Entry<K> {
    kind: K,
    at: Duration,
    generation: u64,
    seq: u64,
}

/// Armed timers keyed by kind.
#[derive(Debug, Clone)]
pub struct TimerQueue<K> {
    entries: Vec<Entry<K>>,
    seq: u64,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            seq: 0,
        }
    }
}

impl<K: Copy + Eq + Debug> TimerQueue<K> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `kind` to fire at `at`, replacing any armed timer of that kind.
    pub fn schedule(&mut self, kind: K, at: Duration, generation: u64) {
        self.cancel(kind);
        self.seq += 1;
        self.entries.push(Entry {
            kind,
            at,
            generation,
            seq: self.seq,
        });
    }

    /// Disarm `kind`. Returns whether it was armed.
    pub fn cancel(&mut self, kind: K) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.kind != kind);
        self.entries.len() != before
    }

    /// Pop the earliest timer whose deadline is `<= now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<Fired<K>> {
        let (idx, _) = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.at <= now)
            .min_by_key(|(_, e)| (e.at, e.seq))?;
        let e = self.entries.swap_remove(idx);
        Some(Fired {
            kind: e.kind,
            generation: e.generation,
            at: e.at,
        })
    }

    /// Earliest armed deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.iter().map(|e| e.at).min()
    }

    /// Whether `kind` is armed.
    #[must_use]
    pub fn is_armed(&self, kind: K) -> bool {
        self.entries.iter().any(|e| e.kind == kind)
    }

    /// Number of armed timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is armed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Disarm everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum T {
        A,
        B,
    }

    const fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn pops_in_deadline_order() {
        let mut q = TimerQueue::new();
        q.schedule(T::A, ms(200), 1);
        q.schedule(T::B, ms(100), 2);
        assert!(q.pop_due(ms(50)).is_none());
        assert_eq!(q.pop_due(ms(250)).map(|f| f.kind), Some(T::B));
        assert_eq!(q.pop_due(ms(250)).map(|f| f.kind), Some(T::A));
        assert!(q.is_empty());
    }

    #[test]
    fn rearm_replaces() {
        let mut q = TimerQueue::new();
        q.schedule(T::A, ms(100), 1);
        q.schedule(T::A, ms(300), 2);
        assert_eq!(q.len(), 1);
        assert!(q.pop_due(ms(200)).is_none());
        let fired = q.pop_due(ms(300)).unwrap();
        assert_eq!(fired.generation, 2);
    }

    #[test]
    fn cancel_prevents_fire() {
        let mut q = TimerQueue::new();
        q.schedule(T::A, ms(100), 1);
        assert!(q.cancel(T::A));
        assert!(!q.cancel(T::A));
        assert!(q.pop_due(ms(1000)).is_none());
    }

    #[test]
    fn equal_deadlines_keep_arm_order() {
        let mut q = TimerQueue::new();
        q.schedule(T::B, ms(100), 0);
        q.schedule(T::A, ms(100), 0);
        assert_eq!(q.pop_due(ms(100)).map(|f| f.kind), Some(T::B));
        assert_eq!(q.next_deadline(), Some(ms(100)));
        assert!(q.is_armed(T::A));
    }
}
