//! A renderer that presents to nowhere

use lumenplay_shared_types::{PlayerResult, Renderer, VideoFrame, WindowHandle};
use tracing::debug;

/// Headless renderer: accepts every frame and counts presentations
///
/// Installed when no window is attached (tests, probe runs, audio-only
/// embeds with a video track). Keeps the pipeline semantics identical to a
/// real renderer, including the cache-clear hook the seek protocol calls.
#[derive(Debug, Default)]
pub struct NullRenderer {
    initialized: bool,
    frames_rendered: u64,
    cache_clears: u64,
    last_pts_ms: Option<i64>,
    size: (u32, u32),
}

impl NullRenderer {
    /// Creates a renderer with zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many frames were presented
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Returns how many times the seek protocol cleared caches
    pub fn cache_clears(&self) -> u64 {
        self.cache_clears
    }

    /// Returns the PTS of the last presented frame
    pub fn last_pts_ms(&self) -> Option<i64> {
        self.last_pts_ms
    }
}

impl Renderer for NullRenderer {
    fn init(&mut self, _window: WindowHandle, width: u32, height: u32) -> PlayerResult<()> {
        self.initialized = true;
        self.size = (width, height);
        Ok(())
    }

    fn render_frame(&mut self, frame: &VideoFrame) -> PlayerResult<()> {
        self.frames_rendered += 1;
        self.last_pts_ms = frame.pts_ms();
        Ok(())
    }

    fn clear_caches(&mut self) {
        self.cache_clears += 1;
        debug!("null renderer caches cleared");
    }

    fn on_resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn cleanup(&mut self) {
        self.initialized = false;
    }

    fn name(&self) -> &str {
        "null"
    }
}
