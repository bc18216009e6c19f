//! # video_output Component
//!
//! Video frame pacing and presentation.
//!
//! [`VideoPlayer`] owns the decoded-frame queue and the render thread: it
//! pops frames in order, asks the sync controller whether to drop, delay, or
//! repeat, and hands due frames to the installed renderer. Frames are never
//! reordered; late ones are skipped, early ones wait on a cancellable sleep
//! so pause and stop stay responsive.
//!
//! Two renderers ship with the core: [`NullRenderer`] presents to nowhere
//! (headless embeds, tests), and [`SoftwareRenderer`] converts decoded
//! planes into a packed RGBA buffer the embedder blits itself. GPU
//! renderers live outside the core and plug in through the same trait.

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod convert;
mod null_renderer;
mod player;
mod software_renderer;

pub use convert::{nv12_to_rgba, yuv420p_to_rgba};
pub use null_renderer::NullRenderer;
pub use player::VideoPlayer;
pub use software_renderer::SoftwareRenderer;
