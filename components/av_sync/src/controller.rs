//! The synchronization controller

use crate::{Clock, SyncConfig, SyncMode};
use parking_lot::Mutex;
use std::time::Instant;
use tracing::debug;

/// Clock owner and frame-scheduling oracle
///
/// The controller holds the audio, video, and external clocks, the
/// per-stream PTS baselines, and the pause accounting shared by all three.
/// The audio and video stages report presented PTS values through
/// `update_*_clock`; the render loop asks `delay_ms` / `should_drop` /
/// `should_repeat` against the master clock selected by the sync mode.
///
/// PTS values handed to this type are **normalized** stream-local
/// milliseconds; callers obtain them from `normalize_audio_pts` /
/// `normalize_video_pts`, which subtract the first PTS each stream ever
/// reported. The baselines survive seeks so clocks and frame PTS stay in
/// one coordinate system for the life of the source.
#[derive(Debug)]
pub struct SyncController {
    audio: Clock,
    video: Clock,
    external: Clock,
    mode: Mutex<SyncMode>,
    config: SyncConfig,
    audio_first_pts: Mutex<Option<i64>>,
    video_first_pts: Mutex<Option<i64>>,
    paused_at: Mutex<Option<Instant>>,
}

impl SyncController {
    /// Creates a controller with default configuration
    pub fn new(mode: SyncMode) -> Self {
        Self::with_config(mode, SyncConfig::default())
    }

    /// Creates a controller with explicit configuration
    pub fn with_config(mode: SyncMode, config: SyncConfig) -> Self {
        Self {
            audio: Clock::new(),
            video: Clock::new(),
            external: Clock::new(),
            mode: Mutex::new(mode),
            config,
            audio_first_pts: Mutex::new(None),
            video_first_pts: Mutex::new(None),
            paused_at: Mutex::new(None),
        }
    }

    /// Returns the active sync mode
    pub fn mode(&self) -> SyncMode {
        *self.mode.lock()
    }

    /// Switches the sync mode
    pub fn set_mode(&self, mode: SyncMode) {
        *self.mode.lock() = mode;
    }

    /// Returns the configuration in force
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Anchors the external clock at zero; called when playback starts
    pub fn start_playback(&self, now: Instant) {
        self.external.set(0.0, now);
    }

    /// Normalizes a raw audio PTS, establishing the baseline on first use
    pub fn normalize_audio_pts(&self, raw_ms: i64) -> i64 {
        Self::normalize(&self.audio_first_pts, raw_ms)
    }

    /// Normalizes a raw video PTS, establishing the baseline on first use
    pub fn normalize_video_pts(&self, raw_ms: i64) -> i64 {
        Self::normalize(&self.video_first_pts, raw_ms)
    }

    fn normalize(slot: &Mutex<Option<i64>>, raw_ms: i64) -> i64 {
        let mut first = slot.lock();
        match *first {
            Some(base) => raw_ms - base,
            None => {
                *first = Some(raw_ms);
                0
            }
        }
    }

    /// Reports audio actually delivered to the device at `now`
    ///
    /// `pts_ms` is the normalized PTS of the last sample played.
    pub fn update_audio_clock(&self, pts_ms: i64, now: Instant) {
        self.audio
            .update(pts_ms as f64, now, self.config.drift_smoothing);
    }

    /// Reports a video frame committed to the renderer at `now`
    pub fn update_video_clock(&self, pts_ms: i64, now: Instant) {
        self.video
            .update(pts_ms as f64, now, self.config.drift_smoothing);
    }

    /// Returns the master clock value at `now` in milliseconds
    ///
    /// While paused the value is frozen at the pause instant, so position
    /// queries do not creep forward.
    pub fn master_clock_ms(&self, now: Instant) -> i64 {
        let effective = (*self.paused_at.lock()).unwrap_or(now);
        let value = match self.mode() {
            SyncMode::AudioMaster => self.audio.value_at(effective),
            SyncMode::VideoMaster => self.video.value_at(effective),
            SyncMode::ExternalMaster => self.external.value_at(effective),
        };
        value.round() as i64
    }

    /// Returns the clamped scheduling delay for a frame with normalized PTS
    /// `pts_ms` evaluated at `now`
    ///
    /// Positive means the frame is early and should wait; negative means it
    /// is late. The result is clamped to
    /// `[-max_speedup_ms, +max_delay_ms]`.
    pub fn delay_ms(&self, pts_ms: i64, now: Instant) -> i64 {
        let raw = pts_ms - self.master_clock_ms(now);
        raw.clamp(-self.config.max_speedup_ms, self.config.max_delay_ms)
    }

    /// Returns whether the frame is late enough to drop
    pub fn should_drop(&self, pts_ms: i64, now: Instant) -> bool {
        if !self.config.frame_drop_enabled {
            return false;
        }
        self.delay_ms(pts_ms, now) < -self.config.drop_threshold_ms
    }

    /// Returns whether the frame is early enough to repeat the previous one
    pub fn should_repeat(&self, pts_ms: i64, now: Instant) -> bool {
        if !self.config.frame_repeat_enabled {
            return false;
        }
        self.delay_ms(pts_ms, now) > self.config.repeat_threshold_ms
    }

    /// Records the pause boundary; idempotent
    pub fn pause(&self, now: Instant) {
        let mut paused_at = self.paused_at.lock();
        if paused_at.is_none() {
            *paused_at = Some(now);
            debug!("sync controller paused");
        }
    }

    /// Ends the pause, shifting every clock anchor by the paused interval
    pub fn resume(&self, now: Instant) {
        let mut paused_at = self.paused_at.lock();
        if let Some(started) = paused_at.take() {
            let delta = now.saturating_duration_since(started);
            self.audio.shift_anchor(delta);
            self.video.shift_anchor(delta);
            self.external.shift_anchor(delta);
            debug!(paused_ms = delta.as_millis() as u64, "sync controller resumed");
        }
    }

    /// Returns whether the controller is inside a pause interval
    pub fn is_paused(&self) -> bool {
        self.paused_at.lock().is_some()
    }

    /// Full reset on stop: zero clocks, clear baselines and pause state
    pub fn reset(&self) {
        self.audio.reset();
        self.video.reset();
        self.external.reset();
        *self.audio_first_pts.lock() = None;
        *self.video_first_pts.lock() = None;
        *self.paused_at.lock() = None;
    }

    /// Seek reset: every clock jumps to `target_ms` at `now`
    ///
    /// PTS baselines are preserved so post-seek normalization stays in the
    /// same coordinate system. An in-force pause is re-anchored at `now` so
    /// the eventual resume shifts by the right interval.
    pub fn reset_for_seek(&self, target_ms: i64, now: Instant) {
        let target = target_ms as f64;
        self.audio.set(target, now);
        self.video.set(target, now);
        self.external.set(target, now);

        let mut paused_at = self.paused_at.lock();
        if paused_at.is_some() {
            *paused_at = Some(now);
        }
        debug!(target_ms, "clocks reset for seek");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_normalization_baseline() {
        let sync = SyncController::new(SyncMode::AudioMaster);
        assert_eq!(sync.normalize_audio_pts(2_500), 0);
        assert_eq!(sync.normalize_audio_pts(2_540), 40);
        // Video has its own baseline
        assert_eq!(sync.normalize_video_pts(2_600), 0);
        assert_eq!(sync.normalize_video_pts(2_633), 33);
    }

    #[test]
    fn test_audio_master_clock_extrapolates() {
        let sync = SyncController::new(SyncMode::AudioMaster);
        let t0 = Instant::now();
        sync.update_audio_clock(1_000, t0);
        assert_eq!(sync.master_clock_ms(t0 + ms(500)), 1_500);
    }

    #[test]
    fn test_external_master_follows_wall_clock() {
        let sync = SyncController::new(SyncMode::ExternalMaster);
        let t0 = Instant::now();
        sync.start_playback(t0);
        assert_eq!(sync.master_clock_ms(t0 + ms(750)), 750);
    }

    #[test]
    fn test_delay_clamping() {
        let sync = SyncController::new(SyncMode::AudioMaster);
        let t0 = Instant::now();
        sync.update_audio_clock(1_000, t0);

        // 400 ms early clamps to +100, 400 ms late clamps to -100
        assert_eq!(sync.delay_ms(1_400, t0), 100);
        assert_eq!(sync.delay_ms(600, t0), -100);
        assert_eq!(sync.delay_ms(1_030, t0), 30);
    }

    #[test]
    fn test_drop_and_repeat_thresholds() {
        let sync = SyncController::new(SyncMode::AudioMaster);
        let t0 = Instant::now();
        sync.update_audio_clock(1_000, t0);

        // 90 ms late: beyond the 80 ms drop threshold
        assert!(sync.should_drop(910, t0));
        // 50 ms late: within tolerance
        assert!(!sync.should_drop(950, t0));
        // 30 ms early: beyond the 20 ms repeat threshold
        assert!(sync.should_repeat(1_030, t0));
        // 10 ms early: no repeat
        assert!(!sync.should_repeat(1_010, t0));
    }

    #[test]
    fn test_disabled_predicates() {
        let config = SyncConfig {
            frame_drop_enabled: false,
            frame_repeat_enabled: false,
            ..SyncConfig::default()
        };
        let sync = SyncController::with_config(SyncMode::AudioMaster, config);
        let t0 = Instant::now();
        sync.update_audio_clock(1_000, t0);
        assert!(!sync.should_drop(0, t0));
        assert!(!sync.should_repeat(10_000, t0));
    }

    #[test]
    fn test_pause_freezes_master_clock() {
        let sync = SyncController::new(SyncMode::AudioMaster);
        let t0 = Instant::now();
        sync.update_audio_clock(1_000, t0);
        sync.pause(t0 + ms(200));

        // Queries during the pause stay at the pause instant's value
        assert_eq!(sync.master_clock_ms(t0 + ms(200)), 1_200);
        assert_eq!(sync.master_clock_ms(t0 + ms(900)), 1_200);
    }

    #[test]
    fn test_pause_resume_is_noop_plus_shift() {
        let sync = SyncController::new(SyncMode::AudioMaster);
        let t0 = Instant::now();
        sync.update_audio_clock(1_000, t0);

        sync.pause(t0 + ms(200));
        sync.resume(t0 + ms(700)); // paused 500 ms

        // At t0+900 the clock has run 400 ms of unpaused time
        assert_eq!(sync.master_clock_ms(t0 + ms(900)), 1_400);
    }

    #[test]
    fn test_double_pause_is_idempotent() {
        let sync = SyncController::new(SyncMode::ExternalMaster);
        let t0 = Instant::now();
        sync.start_playback(t0);
        sync.pause(t0 + ms(100));
        sync.pause(t0 + ms(300));
        sync.resume(t0 + ms(600)); // single pause interval of 500 ms
        assert_eq!(sync.master_clock_ms(t0 + ms(600)), 100);
    }

    #[test]
    fn test_reset_clears_baselines() {
        let sync = SyncController::new(SyncMode::AudioMaster);
        sync.normalize_audio_pts(5_000);
        sync.reset();
        // A new baseline is established after reset
        assert_eq!(sync.normalize_audio_pts(9_000), 0);
    }

    #[test]
    fn test_reset_for_seek_preserves_baselines() {
        let sync = SyncController::new(SyncMode::AudioMaster);
        let t0 = Instant::now();
        assert_eq!(sync.normalize_audio_pts(1_000), 0);

        sync.reset_for_seek(7_000, t0);
        assert_eq!(sync.master_clock_ms(t0), 7_000);
        // Baseline survives: raw 8_000 still normalizes against 1_000
        assert_eq!(sync.normalize_audio_pts(8_000), 7_000);
    }

    #[test]
    fn test_seek_while_paused_stays_frozen_at_target() {
        let sync = SyncController::new(SyncMode::AudioMaster);
        let t0 = Instant::now();
        sync.update_audio_clock(1_000, t0);
        sync.pause(t0 + ms(100));

        sync.reset_for_seek(5_000, t0 + ms(400));
        assert_eq!(sync.master_clock_ms(t0 + ms(900)), 5_000);

        sync.resume(t0 + ms(1_000));
        assert_eq!(sync.master_clock_ms(t0 + ms(1_250)), 5_250);
    }

    #[test]
    fn test_drift_bound_over_update_history() {
        let sync = SyncController::new(SyncMode::AudioMaster);
        let t0 = Instant::now();
        sync.update_audio_clock(0, t0);

        // Stream runs 1% fast against the wall clock; drift stays within
        // 10% of the largest observed error
        let mut max_error: f64 = 0.0;
        for i in 1..=20 {
            let wall = t0 + ms(i * 100);
            let reported = (i as i64) * 101;
            let expected = sync.master_clock_ms(wall);
            max_error = max_error.max((reported - expected).abs() as f64);
            sync.update_audio_clock(reported, wall);
        }
        let drift = sync.master_clock_ms(t0 + ms(2_000)) - 2_020;
        assert!((drift as f64).abs() <= max_error * 0.1 + 1.0);
    }
}
