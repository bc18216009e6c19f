//! # hw_accel Component
//!
//! The hardware decode context: bridges the decoder to GPU resources the
//! renderer consumes zero-copy.
//!
//! [`HwContext`] owns (or adopts from a renderer) the shared platform device,
//! installs the format-selection callback the codec framework calls back
//! through, patches the derived frame pool with the pipeline's extra
//! headroom, and validates the zero-copy conditions after the first decoded
//! frame.
//!
//! Platform device kinds follow the operating system: Direct3D 11 on
//! Windows, VA-API on Linux, VideoToolbox on macOS.

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod capabilities;
mod context;

pub use capabilities::HardwareCapabilities;
pub use context::{HwContext, POOL_PIPELINE_HEADROOM, POOL_QUEUE_HEADROOM};
