//! Codec and media-type identifiers
//!
//! This module provides the codec vocabulary the playback core needs to pick
//! a render path and open decoders. Codec capabilities beyond identity live
//! in the codec service; the core only matches on the identifier.

use serde::{Deserialize, Serialize};

/// The kind of data a stream carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    /// Compressed video pictures
    Video,
    /// Compressed audio samples
    Audio,
    /// Subtitles, data tracks, attachments
    Other,
}

/// Codec identifier as reported by the stream probe
///
/// # Examples
///
/// ```
/// use lumenplay_shared_types::CodecId;
///
/// assert!(CodecId::H264.hardware_decodable());
/// assert!(!CodecId::Mp3.hardware_decodable());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodecId {
    /// H.264/AVC video
    H264,
    /// H.265/HEVC video
    Hevc,
    /// VP8 video (WebM)
    Vp8,
    /// VP9 video (WebM)
    Vp9,
    /// AV1 video
    Av1,
    /// MPEG-4 part 2 video
    Mpeg4,
    /// AAC audio
    Aac,
    /// MP3 audio
    Mp3,
    /// Opus audio
    Opus,
    /// Vorbis audio
    Vorbis,
    /// FLAC audio
    Flac,
    /// Uncompressed PCM audio
    Pcm,
    /// Any codec the core has no special handling for
    Unknown,
}

impl CodecId {
    /// Returns the media type this codec belongs to
    ///
    /// [`CodecId::Unknown`] maps to [`MediaType::Other`]; the stream probe
    /// carries the authoritative media type alongside the codec id.
    pub fn media_type(&self) -> MediaType {
        match self {
            CodecId::H264
            | CodecId::Hevc
            | CodecId::Vp8
            | CodecId::Vp9
            | CodecId::Av1
            | CodecId::Mpeg4 => MediaType::Video,
            CodecId::Aac
            | CodecId::Mp3
            | CodecId::Opus
            | CodecId::Vorbis
            | CodecId::Flac
            | CodecId::Pcm => MediaType::Audio,
            CodecId::Unknown => MediaType::Other,
        }
    }

    /// Returns whether platform hardware decoders commonly accept this codec
    ///
    /// Used by the facade when choosing between the hardware and software
    /// render paths.
    pub fn hardware_decodable(&self) -> bool {
        matches!(
            self,
            CodecId::H264 | CodecId::Hevc | CodecId::Vp9 | CodecId::Av1
        )
    }

    /// Returns the codec name as a string
    pub fn name(&self) -> &'static str {
        match self {
            CodecId::H264 => "h264",
            CodecId::Hevc => "hevc",
            CodecId::Vp8 => "vp8",
            CodecId::Vp9 => "vp9",
            CodecId::Av1 => "av1",
            CodecId::Mpeg4 => "mpeg4",
            CodecId::Aac => "aac",
            CodecId::Mp3 => "mp3",
            CodecId::Opus => "opus",
            CodecId::Vorbis => "vorbis",
            CodecId::Flac => "flac",
            CodecId::Pcm => "pcm",
            CodecId::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_classification() {
        assert_eq!(CodecId::H264.media_type(), MediaType::Video);
        assert_eq!(CodecId::Aac.media_type(), MediaType::Audio);
        assert_eq!(CodecId::Unknown.media_type(), MediaType::Other);
    }

    #[test]
    fn test_hardware_decodable_set() {
        for codec in [CodecId::H264, CodecId::Hevc, CodecId::Vp9, CodecId::Av1] {
            assert!(codec.hardware_decodable(), "{} should be hw", codec.name());
        }
        for codec in [CodecId::Vp8, CodecId::Mpeg4, CodecId::Aac, CodecId::Mp3] {
            assert!(!codec.hardware_decodable());
        }
    }
}
