use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Source of monotonic time, measured from an arbitrary fixed origin.
///
/// Only differences between two readings are meaningful. Implementations must
/// never go backwards and must not follow wall-clock adjustments.
pub trait MonotonicClock: Send + Sync + 'static {
    fn now(&self) -> Duration;
}

/// Boot-relative clock.
///
/// On Linux and Android this reads `CLOCK_BOOTTIME`, which keeps counting
/// while the machine is suspended. Other platforms fall back to
/// `std::time::Instant`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BootClock;

#[cfg(any(target_os = "linux", target_os = "android"))]
impl MonotonicClock for BootClock {
    fn now(&self) -> Duration {
        use nix::time::{clock_gettime, ClockId};

        match clock_gettime(ClockId::CLOCK_BOOTTIME) {
            Ok(ts) => Duration::new(ts.tv_sec() as u64, ts.tv_nsec() as u32),
            // CLOCK_BOOTTIME exists on every kernel since 2.6.39
            Err(_) => fallback::now(),
        }
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
impl MonotonicClock for BootClock {
    fn now(&self) -> Duration {
        fallback::now()
    }
}

mod fallback {
    use std::sync::OnceLock;
    use std::time::{Duration, Instant};

    static ORIGIN: OnceLock<Instant> = OnceLock::new();

    pub fn now() -> Duration {
        ORIGIN.get_or_init(Instant::now).elapsed()
    }
}

/// Clock that only moves when told to. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new(start: Duration) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    /// Moves the clock to `to`. Readings never go backwards, so an earlier
    /// value is ignored.
    pub fn set(&self, to: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        if to > *now {
            *now = to;
        }
    }
}

impl MonotonicClock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
