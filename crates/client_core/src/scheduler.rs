//! Clock abstraction and the fire-and-forget timers used for cosmetic delays.
//!
//! Time is measured as elapsed duration since the clock's origin so the
//! session can run against a virtual clock in tests.

use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Virtual clock that only moves when told to.
#[derive(Default)]
pub struct ManualClock {
    elapsed_nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Deadline-ordered queue of pending tasks. Tasks sharing a deadline fire in
/// the order they were scheduled.
#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    entries: BTreeMap<(Duration, TimerId), T>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: BTreeMap::new(),
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, now: Duration, delay: Duration, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.insert((now.saturating_add(delay), id), task);
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let key = self.entries.keys().find(|(_, entry_id)| *entry_id == id).copied();
        match key {
            Some(key) => self.entries.remove(&key).is_some(),
            None => false,
        }
    }

    pub fn cancel_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|_, task| !predicate(task));
        before - self.entries.len()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.keys().next().map(|(due, _)| *due)
    }

    pub fn drain_due(&mut self, now: Duration) -> Vec<T> {
        let mut due = Vec::new();
        while let Some(entry) = self.entries.first_entry() {
            if entry.key().0 > now {
                break;
            }
            due.push(entry.remove());
        }
        due
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }
}

#[cfg(test)]
#[path = "tests/scheduler_tests.rs"]
mod tests;
