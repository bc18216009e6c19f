//! # shared_types Component
//!
//! Common types, enums, and traits used across all playback components.
//!
//! This crate provides the foundational type definitions for the LumenPlay
//! playback core, including codec identifiers, sample and pixel formats,
//! packets and frames, hardware surface handles, error types, and the traits
//! through which the core consumes its codec service and renderers.
//!
//! # Overview
//!
//! The shared_types component defines:
//!
//! - **Codecs**: [`CodecId`], [`MediaType`]
//! - **Formats**: [`PixelFormat`], [`SampleFormat`], [`ChannelLayout`]
//! - **Media Data**: [`Packet`], [`VideoFrame`], [`AudioFrame`],
//!   [`ResampledAudioFrame`], [`StreamInfo`], [`TimeBase`]
//! - **Hardware**: [`SharedHwDevice`], [`HwSurface`], [`HwFramePool`]
//! - **Errors**: [`PlayerError`], [`PlayerState`]
//! - **Traits**: [`CodecService`], [`MediaInput`], [`CodecContext`],
//!   [`Renderer`]
//!
//! # Examples
//!
//! Converting stream ticks to milliseconds:
//!
//! ```
//! use lumenplay_shared_types::TimeBase;
//!
//! let tb = TimeBase::new(1, 90_000); // 90 kHz, typical for MPEG video
//! assert_eq!(tb.ticks_to_ms(90_000), 1_000);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod codecs;
mod errors;
mod formats;
mod hw;
mod media;
mod traits;

pub use codecs::*;
pub use errors::*;
pub use formats::*;
pub use hw::*;
pub use media::*;
pub use traits::*;
