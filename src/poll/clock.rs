//! Clocks for the wait loops.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Source of monotonic time and of sleeping
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's origin
    fn now(&self) -> Duration;

    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `Instant` and `thread::sleep`
#[derive(Debug)]
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

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

type SleepHook = Box<dyn FnMut(u64) + Send>;

/// Virtual clock: sleeping advances time instantly
///
/// An optional hook runs after every sleep with the running sleep count,
/// which lets tests inject an interrupt at a chosen point of a wait loop.
#[derive(Default)]
pub struct ManualClock {
    elapsed_nanos: AtomicU64,
    sleeps: AtomicU64,
    hook: Mutex<Option<SleepHook>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Number of sleeps performed so far
    pub fn sleep_count(&self) -> u64 {
        self.sleeps.load(Ordering::SeqCst)
    }

    pub fn set_sleep_hook(&self, hook: impl FnMut(u64) + Send + 'static) {
        if let Ok(mut slot) = self.hook.lock() {
            *slot = Some(Box::new(hook));
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::SeqCst))
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
        let count = self.sleeps.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut slot) = self.hook.lock() {
            if let Some(hook) = slot.as_mut() {
                hook(count);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_manual_clock_advances_on_sleep() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);

        clock.sleep(Duration::from_millis(100));
        clock.sleep(Duration::from_millis(100));

        assert_eq!(clock.now(), Duration::from_millis(200));
        assert_eq!(clock.sleep_count(), 2);
    }

    #[test]
    fn test_sleep_hook_sees_count() {
        let clock = ManualClock::new();
        let seen = Arc::new(AtomicU64::new(0));
        let observer = Arc::clone(&seen);
        clock.set_sleep_hook(move |count| observer.store(count, Ordering::SeqCst));

        clock.sleep(Duration::from_millis(1));
        clock.sleep(Duration::from_millis(1));
        clock.sleep(Duration::from_millis(1));

        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
