//! Leading-edge throttle with a trailing guarantee.
//!
//! A call is dispatched immediately when at least `interval` has passed since
//! the previous dispatch. Otherwise exactly one trailing call is kept for
//! `interval - elapsed` from now, replaced by every newer call, so the latest
//! value is always dispatched eventually.
//!
//! The throttle never reads the wall clock itself. Callers pass `now` from a
//! [`Clock`], which makes the timing testable with [`ManualClock`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

#[derive(Debug, Clone)]
struct Trailing<T> {
    value: T,
    due: Instant,
}

/// Throttle state for values of type `T`.
#[derive(Debug, Clone)]
pub struct Throttle<T> {
    interval: Duration,
    last_dispatch: Option<Instant>,
    trailing: Option<Trailing<T>>,
}

impl<T> Throttle<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_dispatch: None,
            trailing: None,
        }
    }

    /// Offer a value. Returns it back when it should be dispatched right now;
    /// otherwise it becomes the pending trailing call.
    pub fn call(&mut self, now: Instant, value: T) -> Option<T> {
        let elapsed = self
            .last_dispatch
            .map(|last| now.saturating_duration_since(last));

        match elapsed {
            Some(elapsed) if elapsed < self.interval => {
                let due = self
                    .trailing
                    .as_ref()
                    .map(|t| t.due)
                    .unwrap_or(now + (self.interval - elapsed));
                self.trailing = Some(Trailing { value, due });
                None
            }
            _ => {
                self.trailing = None;
                self.last_dispatch = Some(now);
                Some(value)
            }
        }
    }

    /// Take the trailing value if its time has come.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.trailing.as_ref() {
            Some(t) if t.due <= now => {
                self.last_dispatch = Some(now);
                self.trailing.take().map(|t| t.value)
            }
            _ => None,
        }
    }

    /// When the pending trailing call is due, if there is one
    pub fn deadline(&self) -> Option<Instant> {
        self.trailing.as_ref().map(|t| t.due)
    }

    pub fn has_pending(&self) -> bool {
        self.trailing.is_some()
    }

    /// Drop any pending trailing call.
    pub fn cancel(&mut self) {
        self.trailing = None;
    }
}

/// A callback wrapped in a [`Throttle`]: `throttle(interval, f) -> callable`.
pub struct Throttled<T, F, C = SystemClock>
where
    F: FnMut(T),
    C: Clock,
{
    throttle: Throttle<T>,
    callback: F,
    clock: C,
}

impl<T, F, C> Throttled<T, F, C>
where
    F: FnMut(T),
    C: Clock,
{
    pub fn with_clock(interval: Duration, clock: C, callback: F) -> Self {
        Self {
            throttle: Throttle::new(interval),
            callback,
            clock,
        }
    }

    /// Invoke through the throttle.
    pub fn call(&mut self, value: T) {
        if let Some(value) = self.throttle.call(self.clock.now(), value) {
            (self.callback)(value);
        }
    }

    /// Fire the trailing call if due. Returns true when the callback ran.
    pub fn flush_due(&mut self) -> bool {
        match self.throttle.poll(self.clock.now()) {
            Some(value) => {
                (self.callback)(value);
                true
            }
            None => false,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.throttle.deadline()
    }

    pub fn cancel(&mut self) {
        self.throttle.cancel();
    }
}

/// Wrap `callback` so it runs at most once per `interval`, with a trailing call.
pub fn throttle<T, F: FnMut(T)>(interval: Duration, callback: F) -> Throttled<T, F> {
    Throttled::with_clock(interval, SystemClock, callback)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(100);

    #[test]
    fn test_first_call_dispatches_immediately() {
        let clock = ManualClock::new();
        let mut t = Throttle::new(INTERVAL);
        assert_eq!(t.call(clock.now(), 1), Some(1));
        assert!(!t.has_pending());
    }

    #[test]
    fn test_trailing_call_keeps_latest_value() {
        let clock = ManualClock::new();
        let mut t = Throttle::new(INTERVAL);
        assert_eq!(t.call(clock.now(), 1), Some(1));

        clock.advance(Duration::from_millis(30));
        assert_eq!(t.call(clock.now(), 2), None);
        clock.advance(Duration::from_millis(30));
        assert_eq!(t.call(clock.now(), 3), None);

        // Due 100ms after the leading dispatch, not pushed back by newer calls
        assert_eq!(t.deadline(), Some(clock.now() + Duration::from_millis(40)));

        clock.advance(Duration::from_millis(39));
        assert_eq!(t.poll(clock.now()), None);
        clock.advance(Duration::from_millis(1));
        assert_eq!(t.poll(clock.now()), Some(3));
        assert!(!t.has_pending());
    }

    #[test]
    fn test_call_after_interval_dispatches_and_drops_trailing() {
        let clock = ManualClock::new();
        let mut t = Throttle::new(INTERVAL);
        t.call(clock.now(), 1);
        clock.advance(Duration::from_millis(50));
        t.call(clock.now(), 2);
        clock.advance(Duration::from_millis(60));
        assert_eq!(t.call(clock.now(), 3), Some(3));
        assert!(!t.has_pending());
    }

    #[test]
    fn test_cancel_drops_trailing() {
        let clock = ManualClock::new();
        let mut t = Throttle::new(INTERVAL);
        t.call(clock.now(), 1);
        t.call(clock.now(), 2);
        t.cancel();
        clock.advance(INTERVAL);
        assert_eq!(t.poll(clock.now()), None);
    }

    #[test]
    fn test_continuous_movement_is_bounded() {
        // A move every 5ms for 1s
        let clock = ManualClock::new();
        let mut t = Throttle::new(INTERVAL);
        let mut dispatched = Vec::new();
        let total_ms = 1000u64;
        let moves = total_ms / 5;

        for i in 0..moves {
            if let Some(v) = t.poll(clock.now()) {
                dispatched.push(v);
            }
            if let Some(v) = t.call(clock.now(), i) {
                dispatched.push(v);
            }
            clock.advance(Duration::from_millis(5));
        }
        // Drain the trailing call after movement stops
        clock.advance(INTERVAL);
        if let Some(v) = t.poll(clock.now()) {
            dispatched.push(v);
        }

        let bound = total_ms.div_ceil(100) as usize + 1;
        assert!(dispatched.len() <= bound, "{} > {}", dispatched.len(), bound);
        assert_eq!(*dispatched.last().unwrap(), moves - 1);
    }

    #[test]
    fn test_throttled_callback() {
        let clock = ManualClock::new();
        let mut seen = Vec::new();
        {
            let mut f = Throttled::with_clock(INTERVAL, clock.clone(), |v: i32| seen.push(v));
            f.call(1);
            f.call(2);
            f.call(3);
            assert!(!f.flush_due());
            clock.advance(INTERVAL);
            assert!(f.flush_due());
        }
        assert_eq!(seen, vec![1, 3]);
    }
}
