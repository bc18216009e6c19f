//! Synchronization configuration types

use serde::{Deserialize, Serialize};

/// Which clock frame scheduling is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// Audio device drives the clock; the default whenever audio is present
    AudioMaster,
    /// Video presentation drives the clock; audio is not adapted
    VideoMaster,
    /// Wall clock drives; used for video-only sources and debugging
    ExternalMaster,
}

/// Tunable parameters of the synchronization policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Upper clamp on how long a frame may be delayed, in milliseconds
    pub max_delay_ms: i64,
    /// Lower clamp on how much a frame may be rushed, in milliseconds
    pub max_speedup_ms: i64,
    /// Tolerance inside which a frame counts as on time, in milliseconds
    pub sync_threshold_ms: i64,
    /// A frame later than this is dropped, in milliseconds
    pub drop_threshold_ms: i64,
    /// A frame earlier than this is repeated, in milliseconds
    pub repeat_threshold_ms: i64,
    /// Whether late frames may be dropped
    pub frame_drop_enabled: bool,
    /// Whether early frames may be repeated
    pub frame_repeat_enabled: bool,
    /// Low-pass factor applied to clock drift corrections
    pub drift_smoothing: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_delay_ms: 100,
            max_speedup_ms: 100,
            sync_threshold_ms: 40,
            drop_threshold_ms: 80,
            repeat_threshold_ms: 20,
            frame_drop_enabled: true,
            frame_repeat_enabled: true,
            drift_smoothing: 0.1,
        }
    }
}
