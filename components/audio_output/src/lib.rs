//! # audio_output Component
//!
//! Audio format adaptation and device playback.
//!
//! [`AudioResampler`] converts decoded audio frames into the packed PCM the
//! device accepts, with a zero-copy fast path when the source already
//! matches. [`AudioPlayer`] queues resampled frames and feeds the device
//! callback, zero-filling on underrun and updating the audio master clock at
//! a bounded cadence.
//!
//! Real audio hardware sits behind the [`AudioDriver`] trait. The
//! [`NullAudioDriver`] paces a consumer thread against wall time and is
//! always available; a `cpal`-backed driver is compiled in with the
//! `driver-cpal` feature.

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod driver;
mod player;
mod resampler;

#[cfg(feature = "driver-cpal")]
mod cpal_driver;

pub use driver::{AudioDriver, DeviceCallback, NullAudioDriver};
pub use player::AudioPlayer;
pub use resampler::{AudioResampler, AudioSpec};

#[cfg(feature = "driver-cpal")]
pub use cpal_driver::CpalAudioDriver;
