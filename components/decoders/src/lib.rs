//! # decoders Component
//!
//! Packet-to-frame translation over the codec service's send/receive model.
//!
//! [`DecoderCore`] implements the shared decode loop: submit a packet,
//! tolerate the statuses that are not errors (`BufferFull`, `InvalidData`,
//! the end-of-stream echo), then drain every frame the codec has ready.
//! Frames move out of the codec working buffer — a hardware frame's surface
//! claim travels with the frame and is never duplicated, which keeps the
//! decoder's small surface pool from exhausting.
//!
//! [`VideoDecoder`] adds the hardware-acceleration hook with graceful
//! software fallback and the one-shot zero-copy validation;
//! [`AudioDecoder`] validates its stream type and defers to the core.

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod audio;
mod base;
mod video;

pub use audio::AudioDecoder;
pub use base::DecoderCore;
pub use video::VideoDecoder;
