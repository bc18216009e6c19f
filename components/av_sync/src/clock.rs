//! A monotonic stream clock with drift smoothing

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// One stream clock: `{last_pts_ms, last_system_time, drift_ms}`
///
/// The current value is extrapolated from the last reported PTS:
/// `last_pts_ms + (now − last_system_time) + drift_ms`. The PTS and drift
/// fields are atomics (bit-cast `f64`) so hot-path reads of a clock that is
/// not being updated concurrently need no lock; the anchor instant is
/// mutex-guarded and only touched by updates, seeks, and pause accounting.
///
/// # Examples
///
/// ```
/// use lumenplay_av_sync::Clock;
/// use std::time::{Duration, Instant};
///
/// let clock = Clock::new();
/// let t0 = Instant::now();
/// clock.update(1_000.0, t0, 0.1);
/// let value = clock.value_at(t0 + Duration::from_millis(250));
/// assert!((value - 1_250.0).abs() < 1.0);
/// ```
#[derive(Debug)]
pub struct Clock {
    pts_ms: AtomicU64,
    drift_ms: AtomicU64,
    anchor: Mutex<Option<Instant>>,
}

impl Clock {
    /// Creates an unstarted clock reading zero
    pub fn new() -> Self {
        Self {
            pts_ms: AtomicU64::new(0f64.to_bits()),
            drift_ms: AtomicU64::new(0f64.to_bits()),
            anchor: Mutex::new(None),
        }
    }

    /// Returns the last reported PTS in milliseconds
    pub fn pts_ms(&self) -> f64 {
        f64::from_bits(self.pts_ms.load(Ordering::Acquire))
    }

    /// Returns the smoothed drift in milliseconds
    pub fn drift_ms(&self) -> f64 {
        f64::from_bits(self.drift_ms.load(Ordering::Acquire))
    }

    /// Returns whether the clock has received any update
    pub fn is_started(&self) -> bool {
        self.anchor.lock().is_some()
    }

    /// Reports a freshly presented PTS at wall time `now`
    ///
    /// The first update establishes the anchor with zero drift. Subsequent
    /// updates compare the expected extrapolated value against the reported
    /// PTS and low-pass the difference into `drift_ms`, which corrects
    /// device-clock skew without visible jumps.
    pub fn update(&self, pts_ms: f64, now: Instant, smoothing: f64) {
        let mut anchor = self.anchor.lock();
        match *anchor {
            None => {
                self.store_drift(0.0);
            }
            Some(_) => {
                let expected = self.value_locked(&anchor, now);
                self.store_drift(smoothing * (pts_ms - expected));
            }
        }
        self.store_pts(pts_ms);
        *anchor = Some(now);
    }

    /// Returns the extrapolated clock value at `now` in milliseconds
    pub fn value_at(&self, now: Instant) -> f64 {
        let anchor = self.anchor.lock();
        self.value_locked(&anchor, now)
    }

    /// Forces the clock to `pts_ms` at `now`, clearing drift
    pub fn set(&self, pts_ms: f64, now: Instant) {
        let mut anchor = self.anchor.lock();
        self.store_pts(pts_ms);
        self.store_drift(0.0);
        *anchor = Some(now);
    }

    /// Moves the anchor forward by `delta`
    ///
    /// Called on resume with the paused interval, so extrapolation excludes
    /// paused wall time without conditional logic at query sites.
    pub fn shift_anchor(&self, delta: Duration) {
        let mut anchor = self.anchor.lock();
        if let Some(instant) = *anchor {
            *anchor = Some(instant + delta);
        }
    }

    /// Returns the clock to its unstarted zero state
    pub fn reset(&self) {
        let mut anchor = self.anchor.lock();
        self.store_pts(0.0);
        self.store_drift(0.0);
        *anchor = None;
    }

    fn value_locked(&self, anchor: &Option<Instant>, now: Instant) -> f64 {
        match anchor {
            None => 0.0,
            Some(instant) => {
                // Saturates to zero when the anchor sits ahead of `now`
                // (right after a resume shift)
                let elapsed = now.saturating_duration_since(*instant);
                self.pts_ms() + elapsed.as_secs_f64() * 1_000.0 + self.drift_ms()
            }
        }
    }

    fn store_pts(&self, value: f64) {
        self.pts_ms.store(value.to_bits(), Ordering::Release);
    }

    fn store_drift(&self, value: f64) {
        self.drift_ms.store(value.to_bits(), Ordering::Release);
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unstarted_clock_reads_zero() {
        let clock = Clock::new();
        assert_eq!(clock.value_at(Instant::now()), 0.0);
        assert!(!clock.is_started());
    }

    #[test]
    fn test_extrapolation() {
        let clock = Clock::new();
        let t0 = Instant::now();
        clock.update(500.0, t0, 0.1);
        let value = clock.value_at(t0 + Duration::from_millis(300));
        assert!((value - 800.0).abs() < 0.001);
    }

    #[test]
    fn test_first_update_has_no_drift() {
        let clock = Clock::new();
        clock.update(5_000.0, Instant::now(), 0.1);
        assert_eq!(clock.drift_ms(), 0.0);
    }

    #[test]
    fn test_drift_is_low_passed() {
        let clock = Clock::new();
        let t0 = Instant::now();
        clock.update(0.0, t0, 0.1);

        // 1000 ms later the stream reports 1020 ms: expected 1000, error +20
        let t1 = t0 + Duration::from_millis(1_000);
        clock.update(1_020.0, t1, 0.1);
        assert!((clock.drift_ms() - 2.0).abs() < 0.001);

        // The drift feeds into extrapolation
        let value = clock.value_at(t1 + Duration::from_millis(100));
        assert!((value - 1_122.0).abs() < 0.001);
    }

    #[test]
    fn test_set_clears_drift() {
        let clock = Clock::new();
        let t0 = Instant::now();
        clock.update(0.0, t0, 0.1);
        clock.update(900.0, t0 + Duration::from_millis(1_000), 0.1);
        assert!(clock.drift_ms() != 0.0);

        let t2 = t0 + Duration::from_millis(2_000);
        clock.set(7_000.0, t2);
        assert_eq!(clock.drift_ms(), 0.0);
        assert!((clock.value_at(t2) - 7_000.0).abs() < 0.001);
    }

    #[test]
    fn test_shift_anchor_excludes_interval() {
        let clock = Clock::new();
        let t0 = Instant::now();
        clock.update(1_000.0, t0, 0.1);

        // One second passes, half of it "paused"
        clock.shift_anchor(Duration::from_millis(500));
        let value = clock.value_at(t0 + Duration::from_millis(1_000));
        assert!((value - 1_500.0).abs() < 0.001);
    }

    #[test]
    fn test_anchor_ahead_of_now_saturates() {
        let clock = Clock::new();
        let t0 = Instant::now();
        clock.set(2_000.0, t0 + Duration::from_secs(5));
        assert!((clock.value_at(t0) - 2_000.0).abs() < 0.001);
    }

    #[test]
    fn test_reset() {
        let clock = Clock::new();
        clock.update(3_000.0, Instant::now(), 0.1);
        clock.reset();
        assert!(!clock.is_started());
        assert_eq!(clock.pts_ms(), 0.0);
    }
}
