//! Controller configuration and the seek request

use lumenplay_shared_types::PlayerState;
use std::time::Duration;

/// Tunable capacities and delays of the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackConfig {
    /// Capacity of each per-stream packet queue
    pub packet_queue_capacity: usize,
    /// Capacity of the pending-seek queue
    pub seek_queue_capacity: usize,
    /// Bounded wait the video decode thread uses when pushing frames, so it
    /// can observe pause and stop while the frame queue sits full
    pub video_push_timeout: Duration,
    /// Settle time after pausing the players inside a seek, letting the
    /// decode threads reach their pause gates
    pub seek_settle_delay: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            packet_queue_capacity: 80,
            seek_queue_capacity: 8,
            video_push_timeout: Duration::from_millis(500),
            seek_settle_delay: Duration::from_millis(100),
        }
    }
}

/// One pending seek; latest-wins in its queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekRequest {
    /// Seek target in milliseconds
    pub target_ms: i64,
    /// Land on or before the nearest key frame
    pub prefer_backward: bool,
    /// State to restore once the seek completes
    pub restore_state: PlayerState,
}
