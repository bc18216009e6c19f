//! # playback_control Component
//!
//! The playback controller: owner of every pipeline worker thread and of the
//! asynchronous seek protocol.
//!
//! On `start` the controller spawns the demux, video-decode, audio-decode,
//! sync-monitor, and seek threads, wired together through bounded packet
//! queues and the players' frame queues. Producers block under backpressure;
//! `stop` stops every queue first (waking all blocked workers) and then
//! joins the threads, so shutdown cannot deadlock.
//!
//! Seeks are serialized on their own worker with latest-wins coalescing; see
//! [`PlaybackController::seek_async`].

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod controller;
mod seek;
mod tasks;
mod types;

pub use controller::{AudioPipeline, PlaybackController, VideoPipeline};
pub use types::{PlaybackConfig, SeekRequest};
