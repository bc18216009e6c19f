//! Core trait definitions for the playback pipeline
//!
//! The codec framework backing the player is an external collaborator; the
//! core consumes it exclusively through the traits in this module. Renderers
//! plug in through [`Renderer`] and must honor the seek protocol's cache
//! invalidation.

use crate::{
    AudioFrame, HwFramePool, MediaMetadata, Packet, PixelFormat, PlayerResult, SharedHwDevice,
    StreamInfo, VideoFrame,
};
use std::sync::Arc;

/// Outcome of submitting a packet to a decoder
///
/// Only `Failed` is treated as a decode-loop warning; every other variant
/// proceeds to the receive loop. `InvalidData` in particular is a legitimate
/// consequence of B-frame reordering and must not abort playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendStatus {
    /// Packet accepted
    Accepted,
    /// Decoder input buffer full; draining receives will make room
    BufferFull,
    /// The sentinel echo after flush began
    EndOfStream,
    /// Packet rejected as invalid; decoder state is intact
    InvalidData,
    /// Codec-level failure with diagnostic text
    Failed(String),
}

/// Outcome of requesting a frame from a decoder
#[derive(Debug)]
pub enum ReceiveStatus {
    /// A decoded frame; ownership of any hardware surface moves with it
    Frame(DecodedFrame),
    /// Nothing buffered; send more packets
    BufferEmpty,
    /// The decoder is fully drained after a flush
    EndOfStream,
    /// Codec-level failure with diagnostic text
    Failed(String),
}

/// A decoded unit of either stream kind
#[derive(Debug)]
pub enum DecodedFrame {
    /// Decoded video picture
    Video(VideoFrame),
    /// Decoded audio samples
    Audio(AudioFrame),
}

impl DecodedFrame {
    /// Returns the presentation timestamp in milliseconds
    pub fn pts_ms(&self) -> Option<i64> {
        match self {
            DecodedFrame::Video(f) => f.pts_ms(),
            DecodedFrame::Audio(f) => f.pts_ms(),
        }
    }
}

/// An opened, probed media source
///
/// Implemented by the codec service. `read_packet` returning `Ok(None)`
/// means end of stream; transient read failures are errors.
pub trait MediaInput: Send {
    /// Returns the probed stream descriptors
    fn streams(&self) -> &[StreamInfo];

    /// Reads the next packet from the container
    fn read_packet(&mut self) -> PlayerResult<Option<Packet>>;

    /// Seeks to the target in microseconds
    ///
    /// With `backward` set the framework lands on or before the nearest key
    /// frame. Implementations flush their internal buffers before returning.
    fn seek(&mut self, target_us: i64, backward: bool) -> PlayerResult<()>;

    /// Returns the container duration in milliseconds, 0 when unknown
    fn duration_ms(&self) -> i64;

    /// Returns container-level metadata
    fn metadata(&self) -> MediaMetadata;
}

/// The `get_format` callback object installed by the hardware context
///
/// The codec framework calls this when it needs a pixel format chosen from
/// its offered list, and again on format changes with a replacement pool.
/// Implementations patch the pool (size, bind flags) in place.
pub trait HwFormatSelector: Send + Sync {
    /// Picks the output format and adjusts the frame pool
    fn select_format(
        &self,
        offered: &[PixelFormat],
        pool: &mut HwFramePool,
    ) -> PlayerResult<PixelFormat>;
}

/// One open decoder instance of the codec service
pub trait CodecContext: Send {
    /// Submits a packet; `None` is the flush sentinel
    fn send_packet(&mut self, packet: Option<&Packet>) -> SendStatus;

    /// Requests the next decoded frame
    fn receive_frame(&mut self) -> ReceiveStatus;

    /// Discards buffered decoder state without producing frames
    fn flush_buffers(&mut self);

    /// Wires hardware decoding before the first packet
    ///
    /// Attaches the device reference and installs the format selector the
    /// framework will call back through. Fails when the codec/profile has no
    /// hardware support, in which case the caller downgrades to software.
    fn attach_hw_device(
        &mut self,
        device: &SharedHwDevice,
        selector: Arc<dyn HwFormatSelector>,
    ) -> PlayerResult<()>;

    /// Returns the effective frame pool once hardware decoding produced a
    /// frame; `None` in software mode
    fn frame_pool(&self) -> Option<HwFramePool>;
}

/// Factory surface of the codec service
pub trait CodecService: Send + Sync {
    /// One-time process-wide network subsystem initialization
    ///
    /// The facade guards this behind a `Once`; implementations may no-op.
    fn init_network(&self) {}

    /// Opens and probes a source with protocol options as string pairs
    fn open_input(
        &self,
        url: &str,
        options: &[(String, String)],
    ) -> PlayerResult<Box<dyn MediaInput>>;

    /// Creates a decoder for the given stream
    fn create_decoder(&self, stream: &StreamInfo) -> PlayerResult<Box<dyn CodecContext>>;
}

/// Opaque native window handle handed to renderer init
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHandle(pub u64);

/// Contract every video renderer must honor
///
/// Renderers may create a GPU device of their own; the facade then shares it
/// with the hardware decode path via [`Renderer::shared_device`]. Renderers
/// that cache views of hardware surfaces must drop them in `clear_caches`,
/// which the seek protocol invokes before decoder flush — caching across
/// frame-pool generations is not allowed.
pub trait Renderer: Send {
    /// Binds the renderer to a window at the given size
    fn init(&mut self, window: WindowHandle, width: u32, height: u32) -> PlayerResult<()>;

    /// Presents one frame; software planes or a hardware surface
    fn render_frame(&mut self, frame: &VideoFrame) -> PlayerResult<()>;

    /// Drops cached surface views; called during seek
    fn clear_caches(&mut self);

    /// Adjusts to a new window size
    fn on_resize(&mut self, width: u32, height: u32);

    /// Releases renderer resources
    fn cleanup(&mut self);

    /// Returns the renderer's name for logs
    fn name(&self) -> &str;

    /// Returns the GPU device the renderer created, when it created one
    fn shared_device(&self) -> Option<SharedHwDevice> {
        None
    }
}
