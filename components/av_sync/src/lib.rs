//! # av_sync Component
//!
//! Clocks and the audio/video synchronization controller.
//!
//! The [`SyncController`] owns three monotonic clocks (audio, video,
//! external), normalizes stream PTS values against per-stream baselines,
//! smooths device-clock skew with a low-pass drift filter, accounts for
//! paused wall time by shifting clock anchors, and answers the scheduling
//! questions the video render loop asks: how long to delay a frame, whether
//! to drop it, whether to repeat it.
//!
//! # Examples
//!
//! ```
//! use lumenplay_av_sync::{SyncController, SyncMode};
//! use std::time::{Duration, Instant};
//!
//! let sync = SyncController::new(SyncMode::AudioMaster);
//! let t0 = Instant::now();
//! sync.start_playback(t0);
//!
//! let pts = sync.normalize_audio_pts(3_000); // first PTS becomes 0
//! assert_eq!(pts, 0);
//! sync.update_audio_clock(pts, t0);
//!
//! let later = t0 + Duration::from_millis(500);
//! assert!((sync.master_clock_ms(later) - 500).abs() <= 1);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod clock;
mod controller;
mod types;

pub use clock::Clock;
pub use controller::SyncController;
pub use types::{SyncConfig, SyncMode};
