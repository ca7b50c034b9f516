use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::clock::{BootClock, MonotonicClock};
use crate::dispatcher::MainHandle;
use crate::error::{Error, Result};
use crate::live_value::{LiveValue, MutableLiveValue};

pub const ONE_SECOND: Duration = Duration::from_millis(1000);

/// Whole seconds between `start` and `now`, truncated. Zero if `now` is
/// somehow earlier than `start`.
pub fn elapsed_seconds(start: Duration, now: Duration) -> u64 {
    (now.saturating_sub(start).as_millis() / 1000) as u64
}

/// Fixed-rate tick deadlines: `start + period`, `start + 2 * period`, ...
#[derive(Debug, Clone)]
pub struct TickSchedule {
    start: Duration,
    period: Duration,
    next: Duration,
}

impl TickSchedule {
    pub fn new(start: Duration, period: Duration) -> Self {
        Self {
            start,
            period,
            next: start + period,
        }
    }

    #[cfg(test)]
    fn next_deadline(&self) -> Duration {
        self.next
    }

    /// How long to wait from `now` until the next tick is due.
    pub fn wait_from(&self, now: Duration) -> Duration {
        self.next.saturating_sub(now)
    }

    /// If a tick is due at `now`, returns the value to publish and moves to the
    /// next deadline after `now`. Missed deadlines collapse into this one tick.
    pub fn poll(&mut self, now: Duration) -> Option<u64> {
        if now < self.next {
            return None;
        }
        let period = self.period.as_nanos();
        let missed = (now - self.next).as_nanos() / period;
        if missed > 0 {
            log::debug!("timer woke late, skipping {missed} tick(s)");
        }
        // index of the first deadline strictly after `now`, counted from start
        let index = (now - self.start).as_nanos() / period + 1;
        self.next = index
            .checked_mul(period)
            .and_then(|nanos| u64::try_from(nanos).ok())
            .and_then(|nanos| self.start.checked_add(Duration::from_nanos(nanos)))
            .unwrap_or_else(|| now.saturating_add(self.period));
        Some(elapsed_seconds(self.start, now))
    }
}

/// Elapsed-time state for one session.
///
/// Owns the reference instant and a background timer that publishes the
/// whole seconds elapsed since then, once per period, starting one period
/// after creation. The timer stops when this value is dropped.
pub struct TimerState {
    start: Duration,
    period: Duration,
    elapsed: MutableLiveValue<u64>,
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl TimerState {
    pub fn create(main: MainHandle) -> Result<Self> {
        Self::with_clock(main, BootClock, ONE_SECOND)
    }

    pub fn with_clock<C: MonotonicClock>(
        main: MainHandle,
        clock: C,
        period: Duration,
    ) -> Result<Self> {
        if period.is_zero() {
            return Err(Error::InvalidPeriod);
        }

        let start = clock.now();
        let elapsed = MutableLiveValue::new(main);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let worker = {
            let elapsed = elapsed.clone();
            let mut schedule = TickSchedule::new(start, period);
            thread::Builder::new()
                .name("livetick-timer".into())
                .spawn(move || loop {
                    let now = clock.now();
                    if let Some(secs) = schedule.poll(now) {
                        log::trace!("tick: {secs}s");
                        elapsed.post_value(secs);
                        continue;
                    }
                    match stop_rx.recv_timeout(schedule.wait_from(now)) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                })
                .map_err(Error::TimerSpawn)?
        };

        log::debug!("timer started, period {}ms", period.as_millis());

        Ok(Self {
            start,
            period,
            elapsed,
            stop: Some(stop_tx),
            worker: Some(worker),
        })
    }

    /// Read-only view of the elapsed seconds. Empty until the first tick.
    pub fn elapsed_time(&self) -> LiveValue<u64> {
        self.elapsed.reader()
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Drop for TimerState {
    fn drop(&mut self) {
        // Closing the channel wakes the timer thread immediately.
        self.stop.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("timer thread panicked");
            }
        }
        log::debug!("timer stopped");
    }
}

impl std::fmt::Debug for TimerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerState")
            .field("start", &self.start)
            .field("period", &self.period)
            .field("elapsed", &self.elapsed.value())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::dispatcher::MainThread;
    use std::sync::{Arc, Mutex};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn elapsed_seconds_truncates() {
        assert_eq!(elapsed_seconds(ms(0), ms(0)), 0);
        assert_eq!(elapsed_seconds(ms(0), ms(999)), 0);
        assert_eq!(elapsed_seconds(ms(0), ms(1000)), 1);
        assert_eq!(elapsed_seconds(ms(500), ms(3499)), 2);
        assert_eq!(elapsed_seconds(ms(5000), ms(4000)), 0);
    }

    #[test]
    fn first_tick_is_one_period_after_start() {
        let mut schedule = TickSchedule::new(ms(10_000), ONE_SECOND);
        assert_eq!(schedule.poll(ms(10_000)), None);
        assert_eq!(schedule.poll(ms(10_999)), None);
        assert_eq!(schedule.wait_from(ms(10_400)), ms(600));
        assert_eq!(schedule.poll(ms(11_000)), Some(1));
        assert_eq!(schedule.next_deadline(), ms(12_000));
    }

    #[test]
    fn two_and_a_half_seconds_publish_one_then_two() {
        let start = ms(0);
        let mut schedule = TickSchedule::new(start, ONE_SECOND);
        let mut published = Vec::new();
        for t in (0..=2500).step_by(50) {
            if let Some(v) = schedule.poll(ms(t)) {
                published.push(v);
            }
        }
        assert_eq!(published, vec![1, 2]);
    }

    #[test]
    fn late_wake_publishes_once_and_resyncs() {
        let mut schedule = TickSchedule::new(ms(0), ONE_SECOND);
        assert_eq!(schedule.poll(ms(3_700)), Some(3));
        assert_eq!(schedule.next_deadline(), ms(4_000));
        assert_eq!(schedule.poll(ms(3_900)), None);
        assert_eq!(schedule.poll(ms(4_010)), Some(4));
    }

    #[test]
    fn very_long_gap_resyncs_without_overflow() {
        let period = ms(1);
        let mut schedule = TickSchedule::new(ms(0), period);
        let now = schedule.next_deadline() + period * u32::MAX;

        assert_eq!(schedule.poll(now), Some(now.as_millis() as u64 / 1000));
        assert!(schedule.next_deadline() > now);
        assert!(schedule.next_deadline() - now <= period);
        assert_eq!(schedule.poll(now), None);
    }

    #[test]
    fn gap_beyond_u32_periods_keeps_deadline_ahead() {
        let mut schedule = TickSchedule::new(ms(0), ms(1));
        let now = ms(u64::from(u32::MAX) + 5) + Duration::from_micros(300);

        assert!(schedule.poll(now).is_some());
        assert_eq!(schedule.next_deadline(), ms(u64::from(u32::MAX) + 6));
        assert_eq!(schedule.wait_from(now), Duration::from_micros(700));
    }

    #[test]
    fn zero_period_is_rejected() {
        let (_main, handle) = MainThread::new();
        let err = TimerState::with_clock(handle, ManualClock::default(), Duration::ZERO);
        assert!(matches!(err, Err(Error::InvalidPeriod)));
    }

    #[test]
    fn nothing_is_published_before_first_period() {
        let (main, handle) = MainThread::new();
        let state = TimerState::with_clock(handle, BootClock, ms(200)).unwrap();
        assert_eq!(main.run_until_idle(ms(50)), 0);
        assert_eq!(state.elapsed_time().value(), None);
    }

    #[test]
    fn timer_publishes_from_clock_reading() {
        let (main, handle) = MainThread::new();
        let clock = ManualClock::new(ms(1_000));
        let state = TimerState::with_clock(handle, clock.clone(), ms(20)).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let _sub = {
            let seen = seen.clone();
            state
                .elapsed_time()
                .observe(move |v: &u64| seen.lock().unwrap().push(*v))
        };

        clock.advance(ms(2_500));
        main.run_one(Duration::from_secs(2)).unwrap();
        assert_eq!(seen.lock().unwrap().last(), Some(&2));
        assert_eq!(state.elapsed_time().value(), Some(2));
    }

    #[test]
    fn drop_stops_the_thread() {
        let (main, handle) = MainThread::new();
        let state = TimerState::with_clock(handle, BootClock, ms(5)).unwrap();
        std::thread::sleep(ms(20));
        drop(state);
        main.run_pending();
        assert_eq!(main.run_until_idle(ms(30)), 0);
    }
}
