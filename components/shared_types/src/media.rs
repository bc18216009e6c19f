//! Media data structures
//!
//! This module provides the data carried through the pipeline: compressed
//! packets, decoded frames, resampled PCM, stream descriptors, and the
//! rational time base used to place them all on a common timeline.

use crate::{ChannelLayout, CodecId, HwSurface, MediaType, PixelFormat, SampleFormat};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Rational unit of one stream tick, `num / den` seconds
///
/// # Examples
///
/// ```
/// use lumenplay_shared_types::TimeBase;
///
/// let tb = TimeBase::new(1, 48_000);
/// assert_eq!(tb.ticks_to_ms(48_000), 1_000);
/// assert_eq!(tb.ms_to_ticks(250), 12_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeBase {
    /// Numerator
    pub num: i32,
    /// Denominator
    pub den: i32,
}

impl TimeBase {
    /// One tick per millisecond
    pub const MILLISECONDS: TimeBase = TimeBase { num: 1, den: 1_000 };
    /// One tick per microsecond
    pub const MICROSECONDS: TimeBase = TimeBase {
        num: 1,
        den: 1_000_000,
    };

    /// Creates a time base; a zero denominator is normalized to milliseconds
    pub fn new(num: i32, den: i32) -> Self {
        if den == 0 {
            return TimeBase::MILLISECONDS;
        }
        Self { num, den }
    }

    /// Converts a tick count to milliseconds, rounding toward zero
    pub fn ticks_to_ms(&self, ticks: i64) -> i64 {
        (ticks as i128 * self.num as i128 * 1_000 / self.den as i128) as i64
    }

    /// Converts milliseconds to ticks, rounding toward zero
    pub fn ms_to_ticks(&self, ms: i64) -> i64 {
        (ms as i128 * self.den as i128 / (self.num as i128 * 1_000)) as i64
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        TimeBase::MILLISECONDS
    }
}

/// A stream timestamp: raw ticks plus the time base that interprets them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    /// Raw tick count
    pub raw: i64,
    /// Time base of the owning stream
    pub time_base: TimeBase,
    /// Precomputed millisecond value
    pub ms: i64,
}

impl Timestamp {
    /// Creates a timestamp, computing the millisecond projection
    pub fn new(raw: i64, time_base: TimeBase) -> Self {
        Self {
            raw,
            time_base,
            ms: time_base.ticks_to_ms(raw),
        }
    }
}

/// A compressed data unit read from the demuxer
///
/// The payload is reference-counted, so handing a packet across a queue
/// boundary never copies compressed bytes. Ownership still transfers on pop:
/// the decoder releases the packet after submission regardless of outcome.
#[derive(Debug, Clone)]
pub struct Packet {
    /// Index of the stream this packet belongs to
    pub stream_index: usize,
    /// Presentation timestamp in stream ticks
    pub pts: Option<i64>,
    /// Decode timestamp in stream ticks
    pub dts: Option<i64>,
    /// Time base of the owning stream
    pub time_base: TimeBase,
    /// Whether this packet starts a key frame
    pub key_frame: bool,
    /// Compressed payload
    pub data: Bytes,
}

impl Packet {
    /// Returns the payload size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns the presentation timestamp in milliseconds
    pub fn pts_ms(&self) -> Option<i64> {
        self.pts.map(|p| self.time_base.ticks_to_ms(p))
    }

    /// Returns the decode timestamp in milliseconds
    pub fn dts_ms(&self) -> Option<i64> {
        self.dts.map(|d| self.time_base.ticks_to_ms(d))
    }
}

/// One plane of a software video frame
#[derive(Debug, Clone)]
pub struct Plane {
    /// Pixel bytes, `stride * rows` long
    pub data: Bytes,
    /// Bytes per row including padding
    pub stride: usize,
}

/// Pixel storage of a decoded video frame
#[derive(Debug)]
pub enum FrameContent {
    /// CPU-resident planar pixel data
    Software {
        /// Pixel layout of the planes
        format: PixelFormat,
        /// The planes, outermost first (Y, then chroma)
        planes: Vec<Plane>,
    },
    /// GPU-resident surface produced by a hardware decoder
    Hardware {
        /// Hardware pixel format discriminant
        format: PixelFormat,
        /// The claimed pool surface; moves with the frame
        surface: HwSurface,
    },
}

/// A decoded video frame
///
/// Video frames are move-only. A hardware frame owns a claim on a pool
/// surface; duplicating that claim would exhaust the pool, so the pipeline
/// moves frames and components that must look twice (repeat display) borrow.
#[derive(Debug)]
pub struct VideoFrame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Presentation timestamp in stream ticks
    pub pts: Option<i64>,
    /// Time base of the owning stream
    pub time_base: TimeBase,
    /// Pixel storage
    pub content: FrameContent,
}

impl VideoFrame {
    /// Returns the pixel format of the frame
    pub fn format(&self) -> PixelFormat {
        match &self.content {
            FrameContent::Software { format, .. } => *format,
            FrameContent::Hardware { format, .. } => *format,
        }
    }

    /// Returns whether the frame carries a hardware surface
    pub fn is_hardware(&self) -> bool {
        matches!(self.content, FrameContent::Hardware { .. })
    }

    /// Returns the presentation timestamp in milliseconds
    pub fn pts_ms(&self) -> Option<i64> {
        self.pts.map(|p| self.time_base.ticks_to_ms(p))
    }
}

/// A decoded audio frame, planar or packed per its sample format
#[derive(Debug)]
pub struct AudioFrame {
    /// Samples per channel
    pub nb_samples: usize,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Speaker layout
    pub channel_layout: ChannelLayout,
    /// Sample format of the planes
    pub format: SampleFormat,
    /// Presentation timestamp in stream ticks
    pub pts: Option<i64>,
    /// Time base of the owning stream
    pub time_base: TimeBase,
    /// One plane for packed formats, one per channel for planar
    pub planes: Vec<Bytes>,
}

impl AudioFrame {
    /// Returns the presentation timestamp in milliseconds
    pub fn pts_ms(&self) -> Option<i64> {
        self.pts.map(|p| self.time_base.ticks_to_ms(p))
    }

    /// Returns the duration this frame covers in milliseconds
    pub fn duration_ms(&self) -> i64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.nb_samples as i64 * 1_000 / self.sample_rate as i64
    }
}

/// Packed PCM produced by the resampler and consumed by the audio device
#[derive(Debug, Clone)]
pub struct ResampledAudioFrame {
    /// Interleaved PCM bytes
    pub data: Vec<u8>,
    /// Samples per channel
    pub nb_samples: usize,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u16,
    /// Bytes per single sample
    pub bytes_per_sample: usize,
    /// Presentation timestamp in milliseconds
    pub pts_ms: i64,
}

impl ResampledAudioFrame {
    /// Returns the payload length in bytes
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Returns the playback duration of this frame in milliseconds
    pub fn duration_ms(&self) -> i64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.nb_samples as i64 * 1_000 / self.sample_rate as i64
    }
}

/// Codec parameters captured at probe time, immutable afterwards
#[derive(Debug, Clone)]
pub enum CodecParameters {
    /// Parameters of a video stream
    Video {
        /// Coded width in pixels
        width: u32,
        /// Coded height in pixels
        height: u32,
        /// Pixel format the decoder outputs in software mode
        pixel_format: PixelFormat,
        /// Declared frame rate, when the container knows it
        frame_rate: Option<f64>,
        /// Codec-private initialization data
        extra_data: Bytes,
    },
    /// Parameters of an audio stream
    Audio {
        /// Sample rate in Hz
        sample_rate: u32,
        /// Speaker layout
        channel_layout: ChannelLayout,
        /// Sample format the decoder outputs
        sample_format: SampleFormat,
        /// Codec-private initialization data
        extra_data: Bytes,
    },
    /// Parameters the core does not interpret
    Other,
}

/// Descriptor of one stream inside an opened source
#[derive(Debug, Clone)]
pub struct StreamInfo {
    /// Stream index inside the container
    pub index: usize,
    /// Media type of the stream
    pub media_type: MediaType,
    /// Codec identifier
    pub codec: CodecId,
    /// Time base interpreting the stream's timestamps
    pub time_base: TimeBase,
    /// Probe-time codec parameters
    pub params: CodecParameters,
}

/// Container-level metadata of an opened source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Media title
    pub title: Option<String>,
    /// Media artist
    pub artist: Option<String>,
    /// Media album
    pub album: Option<String>,
    /// Remaining container tags as key/value pairs
    pub tags: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_base_conversions() {
        let tb = TimeBase::new(1, 90_000);
        assert_eq!(tb.ticks_to_ms(90_000), 1_000);
        assert_eq!(tb.ticks_to_ms(45_000), 500);
        assert_eq!(tb.ms_to_ticks(1_000), 90_000);

        // Zero denominator is normalized instead of dividing by zero
        let tb = TimeBase::new(1, 0);
        assert_eq!(tb.ticks_to_ms(250), 250);
    }

    #[test]
    fn test_time_base_no_overflow_on_large_ticks() {
        let tb = TimeBase::new(1, 90_000);
        // Several hours of 90 kHz ticks
        let ticks = 90_000i64 * 3_600 * 6;
        assert_eq!(tb.ticks_to_ms(ticks), 6 * 3_600 * 1_000);
    }

    #[test]
    fn test_timestamp_projection() {
        let ts = Timestamp::new(48_000, TimeBase::new(1, 48_000));
        assert_eq!(ts.ms, 1_000);
    }

    #[test]
    fn test_packet_pts_ms() {
        let packet = Packet {
            stream_index: 0,
            pts: Some(180_000),
            dts: Some(90_000),
            time_base: TimeBase::new(1, 90_000),
            key_frame: true,
            data: Bytes::from_static(&[0u8; 16]),
        };
        assert_eq!(packet.pts_ms(), Some(2_000));
        assert_eq!(packet.dts_ms(), Some(1_000));
        assert_eq!(packet.size(), 16);
    }

    #[test]
    fn test_resampled_frame_duration() {
        let frame = ResampledAudioFrame {
            data: vec![0u8; 4800 * 2 * 2],
            nb_samples: 4800,
            sample_rate: 48_000,
            channels: 2,
            bytes_per_sample: 2,
            pts_ms: 0,
        };
        assert_eq!(frame.duration_ms(), 100);
    }
}
