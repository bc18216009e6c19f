//! # player Component
//!
//! The embedding facade of the LumenPlay playback core.
//!
//! [`Player`] turns a media URL into synchronized audio output and rendered
//! video: `open` probes the source, picks the render path, and wires the
//! decoders; `play`/`pause`/`stop` drive the pipeline; `seek_async` queues
//! a non-blocking seek whose outcome arrives as state transitions.
//!
//! The codec framework and the renderer are injected through the traits in
//! `lumenplay-shared_types`; [`PlayerBuilder`] assembles a player around
//! them.
//!
//! # Examples
//!
//! ```no_run
//! use lumenplay_player::PlayerBuilder;
//! use lumenplay_shared_types::{CodecService, WindowHandle};
//! use std::sync::Arc;
//!
//! fn run(service: Arc<dyn CodecService>) -> lumenplay_shared_types::PlayerResult<()> {
//!     let player = PlayerBuilder::new(service).build();
//!     player.open("file:///media/clip.mp4")?;
//!     player.set_render_window(WindowHandle(0), 1280, 720)?;
//!     player.play()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod builder;
mod player;
mod types;

pub use builder::PlayerBuilder;
pub use player::Player;
pub use types::PlayerConfig;
