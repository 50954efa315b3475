// Timer - One-shot tick scheduling for the sequencer clock
// The engine asks for ticks; the host fires them back through on_timer()

use std::time::{Duration, Instant};

/// Identifies one scheduled tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickHandle(u64);

impl TickHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Monotonic clock plus one-shot scheduling
///
/// Times are durations since an arbitrary origin fixed when the timer was
/// created. A cancelled handle must never be returned by `take_due`.
pub trait Timer {
    /// Current monotonic time
    fn now(&self) -> Duration;

    /// Schedule a tick `delay` from now
    fn schedule(&mut self, delay: Duration) -> TickHandle;

    /// Cancel a pending tick, no-op if it already fired or was cancelled
    fn cancel(&mut self, handle: TickHandle);

    /// Remove and return every handle whose deadline has passed, earliest first
    fn take_due(&mut self) -> Vec<TickHandle>;

    /// Earliest pending deadline
    fn next_deadline(&self) -> Option<Duration>;

    /// Number of ticks still pending
    fn pending_count(&self) -> usize;
}

/// Deadline list shared by both timer implementations
#[derive(Debug, Default)]
struct Deadlines {
    next_id: u64,
    pending: Vec<(TickHandle, Duration)>,
}

impl Deadlines {
    fn insert(&mut self, at: Duration) -> TickHandle {
        self.next_id += 1;
        let handle = TickHandle(self.next_id);
        self.pending.push((handle, at));
        handle
    }

    fn remove(&mut self, handle: TickHandle) {
        self.pending.retain(|(h, _)| *h != handle);
    }

    fn take_due(&mut self, now: Duration) -> Vec<TickHandle> {
        let mut due: Vec<(TickHandle, Duration)> = Vec::new();
        self.pending.retain(|&(h, at)| {
            if at <= now {
                due.push((h, at));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|&(h, at)| (at, h));
        due.into_iter().map(|(h, _)| h).collect()
    }

    fn earliest(&self) -> Option<(TickHandle, Duration)> {
        self.pending.iter().copied().min_by_key(|&(h, at)| (at, h))
    }
}

/// Wall-clock timer backed by `Instant`
#[derive(Debug)]
pub struct SystemTimer {
    origin: Instant,
    deadlines: Deadlines,
}

impl SystemTimer {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            deadlines: Deadlines::default(),
        }
    }
}

impl Default for SystemTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for SystemTimer {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn schedule(&mut self, delay: Duration) -> TickHandle {
        let at = self.now() + delay;
        self.deadlines.insert(at)
    }

    fn cancel(&mut self, handle: TickHandle) {
        self.deadlines.remove(handle);
    }

    fn take_due(&mut self) -> Vec<TickHandle> {
        let now = self.now();
        self.deadlines.take_due(now)
    }

    fn next_deadline(&self) -> Option<Duration> {
        self.deadlines.earliest().map(|(_, at)| at)
    }

    fn pending_count(&self) -> usize {
        self.deadlines.pending.len()
    }
}

/// Virtual-time timer advanced explicitly by the caller
///
/// Deterministic hosts and tests drive the engine with this: move time
/// forward, collect the due handles, feed them back to the engine.
#[derive(Debug, Default)]
pub struct ManualTimer {
    now: Duration,
    deadlines: Deadlines,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move virtual time forward
    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }

    /// Jump to the earliest pending deadline and remove it
    ///
    /// Time never moves backwards: a deadline already in the past fires at
    /// the current time.
    pub fn advance_to_next(&mut self) -> Option<TickHandle> {
        let (handle, at) = self.deadlines.earliest()?;
        self.now = self.now.max(at);
        self.deadlines.remove(handle);
        Some(handle)
    }

    /// Handles currently pending, earliest first
    pub fn pending(&self) -> Vec<TickHandle> {
        let mut pending = self.deadlines.pending.clone();
        pending.sort_by_key(|&(h, at)| (at, h));
        pending.into_iter().map(|(h, _)| h).collect()
    }
}

impl Timer for ManualTimer {
    fn now(&self) -> Duration {
        self.now
    }

    fn schedule(&mut self, delay: Duration) -> TickHandle {
        let at = self.now + delay;
        self.deadlines.insert(at)
    }

    fn cancel(&mut self, handle: TickHandle) {
        self.deadlines.remove(handle);
    }

    fn take_due(&mut self) -> Vec<TickHandle> {
        self.deadlines.take_due(self.now)
    }

    fn next_deadline(&self) -> Option<Duration> {
        self.deadlines.earliest().map(|(_, at)| at)
    }

    fn pending_count(&self) -> usize {
        self.deadlines.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_timer_schedule_and_fire() {
        let mut timer = ManualTimer::new();
        let a = timer.schedule(Duration::from_millis(20));
        let b = timer.schedule(Duration::from_millis(10));

        assert_eq!(timer.pending_count(), 2);
        assert_eq!(timer.next_deadline(), Some(Duration::from_millis(10)));

        timer.advance(Duration::from_millis(15));
        assert_eq!(timer.take_due(), vec![b]);

        timer.advance(Duration::from_millis(15));
        assert_eq!(timer.take_due(), vec![a]);
        assert_eq!(timer.pending_count(), 0);
    }

    #[test]
    fn test_cancelled_handle_never_fires() {
        let mut timer = ManualTimer::new();
        let handle = timer.schedule(Duration::ZERO);
        timer.cancel(handle);

        timer.advance(Duration::from_secs(1));
        assert!(timer.take_due().is_empty());
        assert_eq!(timer.advance_to_next(), None);
    }

    #[test]
    fn test_advance_to_next_keeps_time_monotonic() {
        let mut timer = ManualTimer::new();
        let handle = timer.schedule(Duration::from_millis(5));
        timer.advance(Duration::from_millis(50));

        assert_eq!(timer.advance_to_next(), Some(handle));
        assert_eq!(timer.now(), Duration::from_millis(50));
    }

    #[test]
    fn test_handles_are_unique() {
        let mut timer = ManualTimer::new();
        let a = timer.schedule(Duration::ZERO);
        timer.cancel(a);
        let b = timer.schedule(Duration::ZERO);
        assert_ne!(a, b);
        assert!(b.id() > a.id());
    }

    #[test]
    fn test_system_timer_take_due() {
        let mut timer = SystemTimer::new();
        let now_handle = timer.schedule(Duration::ZERO);
        let later = timer.schedule(Duration::from_secs(3600));

        assert_eq!(timer.take_due(), vec![now_handle]);
        assert_eq!(timer.pending_count(), 1);

        timer.cancel(later);
        assert_eq!(timer.next_deadline(), None);
    }
}
