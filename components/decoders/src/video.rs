//! Video decoder specialization with the hardware-acceleration hook

use crate::DecoderCore;
use lumenplay_hw_accel::HwContext;
use lumenplay_shared_types::{
    CodecParameters, CodecService, DecodedFrame, MediaType, Packet, PixelFormat, PlayerError,
    PlayerResult, StreamInfo, TimeBase,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Decoder for the active video stream
///
/// When a hardware context is supplied to [`VideoDecoder::open`], the
/// context configures the codec before the first packet (device reference
/// plus format-selection callback). A configuration failure downgrades to
/// software decoding with a warning instead of failing the open.
///
/// Zero-copy conditions are validated once, on the first decoded hardware
/// frame, against the codec's effective frame pool; the verdict never
/// changes afterwards.
pub struct VideoDecoder {
    core: DecoderCore,
    hw: Option<Arc<HwContext>>,
    zero_copy: Option<bool>,
}

impl VideoDecoder {
    /// Creates a closed video decoder
    pub fn new() -> Self {
        Self {
            core: DecoderCore::new(),
            hw: None,
            zero_copy: None,
        }
    }

    /// Opens the decoder, optionally wired for hardware decoding
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::InvalidParameter`] for a non-video stream;
    /// otherwise propagates the core open failure. Hardware wiring failures
    /// do not propagate — the decoder falls back to software.
    pub fn open(
        &mut self,
        service: &dyn CodecService,
        stream: &StreamInfo,
        hw_context: Option<Arc<HwContext>>,
    ) -> PlayerResult<()> {
        if stream.media_type != MediaType::Video {
            return Err(PlayerError::InvalidParameter(format!(
                "stream {} is not a video stream",
                stream.index
            )));
        }

        self.hw = hw_context;
        self.zero_copy = None;

        let hw_slot = &mut self.hw;
        self.core.open_with(service, stream, |ctx| {
            if let Some(hw) = hw_slot.as_ref() {
                match hw.configure_decoder(ctx) {
                    Ok(()) => {
                        info!(kind = ?hw.kind(), "hardware decoding configured");
                    }
                    Err(err) => {
                        warn!(error = %err, "hardware decode setup failed; using software decoding");
                        *hw_slot = None;
                    }
                }
            }
            Ok(())
        })
    }

    /// Decodes one packet; `None` flushes
    ///
    /// See [`DecoderCore::decode`] for the loop contract. The first
    /// hardware frame triggers the zero-copy validation.
    pub fn decode(
        &mut self,
        packet: Option<&Packet>,
        out_frames: &mut Vec<DecodedFrame>,
    ) -> PlayerResult<()> {
        let before = out_frames.len();
        self.core.decode(packet, out_frames)?;

        if self.zero_copy.is_none() {
            let saw_hw_frame = out_frames[before..]
                .iter()
                .any(|frame| matches!(frame, DecodedFrame::Video(v) if v.is_hardware()));
            if saw_hw_frame {
                let verdict = match (self.hw.as_ref(), self.core.frame_pool()) {
                    (Some(hw), Some(pool)) => hw.validate_zero_copy(&pool),
                    _ => false,
                };
                self.zero_copy = Some(verdict);
            }
        }
        Ok(())
    }

    /// Drains the decoder via the flush sentinel
    pub fn flush(&mut self, out_frames: &mut Vec<DecodedFrame>) -> PlayerResult<()> {
        self.decode(None, out_frames)
    }

    /// Discards buffered decoder state; used by the seek protocol
    pub fn flush_buffers(&mut self) {
        self.core.flush_buffers();
    }

    /// Drops the codec context and the hardware wiring
    pub fn close(&mut self) {
        self.core.close();
        self.hw = None;
        self.zero_copy = None;
    }

    /// Returns whether the decoder is open
    pub fn is_open(&self) -> bool {
        self.core.is_open()
    }

    /// Returns whether hardware decoding is in effect
    pub fn is_hardware(&self) -> bool {
        self.hw.is_some()
    }

    /// Returns the zero-copy verdict; `None` until the first hardware frame
    pub fn zero_copy_enabled(&self) -> Option<bool> {
        self.zero_copy
    }

    /// Returns whether the codec ever reported `InvalidData`
    pub fn had_invalid_data(&self) -> bool {
        self.core.had_invalid_data()
    }

    /// Returns the coded width in pixels
    pub fn width(&self) -> Option<u32> {
        match self.core.stream().map(|s| &s.params) {
            Some(CodecParameters::Video { width, .. }) => Some(*width),
            _ => None,
        }
    }

    /// Returns the coded height in pixels
    pub fn height(&self) -> Option<u32> {
        match self.core.stream().map(|s| &s.params) {
            Some(CodecParameters::Video { height, .. }) => Some(*height),
            _ => None,
        }
    }

    /// Returns the output pixel format
    ///
    /// The hardware surface format when hardware decoding is active, the
    /// probed software format otherwise.
    pub fn pixel_format(&self) -> Option<PixelFormat> {
        if let Some(hw) = self.hw.as_ref() {
            return Some(hw.pixel_format());
        }
        match self.core.stream().map(|s| &s.params) {
            Some(CodecParameters::Video { pixel_format, .. }) => Some(*pixel_format),
            _ => None,
        }
    }

    /// Returns the stream time base
    pub fn time_base(&self) -> Option<TimeBase> {
        self.core.stream().map(|s| s.time_base)
    }
}

impl Default for VideoDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::testsupport::*;
    use lumenplay_shared_types::{
        FrameContent, HwDeviceKind, HwFramePool, ReceiveStatus, VideoFrame,
    };

    fn hw_frame(pool: &HwFramePool, pts: i64) -> DecodedFrame {
        DecodedFrame::Video(VideoFrame {
            width: 1280,
            height: 720,
            pts: Some(pts),
            time_base: TimeBase::MILLISECONDS,
            content: FrameContent::Hardware {
                format: PixelFormat::D3d11,
                surface: pool.acquire(0).unwrap(),
            },
        })
    }

    #[test]
    fn test_rejects_audio_stream() {
        let service = OneShotService::with(ScriptedContext::new());
        let mut decoder = VideoDecoder::new();
        let err = decoder.open(&service, &audio_stream(), None).unwrap_err();
        assert!(matches!(err, PlayerError::InvalidParameter(_)));
    }

    #[test]
    fn test_software_open_reports_probe_parameters() {
        let service = OneShotService::with(ScriptedContext::new());
        let mut decoder = VideoDecoder::new();
        decoder.open(&service, &video_stream(), None).unwrap();

        assert!(!decoder.is_hardware());
        assert_eq!(decoder.width(), Some(1280));
        assert_eq!(decoder.height(), Some(720));
        assert_eq!(decoder.pixel_format(), Some(PixelFormat::Yuv420p));
        assert_eq!(decoder.time_base(), Some(TimeBase::new(1, 90_000)));
    }

    #[test]
    fn test_hardware_wiring_reaches_context() {
        let service = OneShotService::with(ScriptedContext::new());
        let hw = Arc::new(HwContext::with_kind(HwDeviceKind::D3d11).unwrap());
        let mut decoder = VideoDecoder::new();
        decoder
            .open(&service, &video_stream(), Some(Arc::clone(&hw)))
            .unwrap();

        assert!(decoder.is_hardware());
        assert_eq!(decoder.pixel_format(), Some(PixelFormat::D3d11));
    }

    #[test]
    fn test_hardware_failure_downgrades_to_software() {
        let mut context = ScriptedContext::new();
        context.hw_attach_fails = true;
        let service = OneShotService::with(context);
        let hw = Arc::new(HwContext::with_kind(HwDeviceKind::D3d11).unwrap());

        let mut decoder = VideoDecoder::new();
        // Open succeeds despite the failed hardware wiring
        decoder
            .open(&service, &video_stream(), Some(hw))
            .unwrap();
        assert!(!decoder.is_hardware());
        assert_eq!(decoder.pixel_format(), Some(PixelFormat::Yuv420p));
    }

    #[test]
    fn test_zero_copy_validated_once_on_first_hw_frame() {
        let pool = {
            let mut pool =
                HwFramePool::new(PixelFormat::D3d11, PixelFormat::Nv12, 1280, 720, 8);
            pool.bind_flags
                .insert(lumenplay_shared_types::BindFlags::SHADER_RESOURCE);
            pool
        };

        let mut context = ScriptedContext::new();
        context.pool = Some(pool.clone());
        context.receives.push_back(ReceiveStatus::Frame(hw_frame(&pool, 0)));
        context.receives.push_back(ReceiveStatus::BufferEmpty);
        let service = OneShotService::with(context);
        let hw = Arc::new(HwContext::with_kind(HwDeviceKind::D3d11).unwrap());

        let mut decoder = VideoDecoder::new();
        decoder.open(&service, &video_stream(), Some(hw)).unwrap();
        assert_eq!(decoder.zero_copy_enabled(), None);

        let mut frames = Vec::new();
        decoder.decode(Some(&packet(0)), &mut frames).unwrap();
        assert_eq!(decoder.zero_copy_enabled(), Some(true));
    }

    #[test]
    fn test_zero_copy_negative_verdict_without_shader_binding() {
        let pool = HwFramePool::new(PixelFormat::D3d11, PixelFormat::Nv12, 1280, 720, 8);

        let mut context = ScriptedContext::new();
        context.pool = Some(pool.clone());
        context.receives.push_back(ReceiveStatus::Frame(hw_frame(&pool, 0)));
        let service = OneShotService::with(context);
        let hw = Arc::new(HwContext::with_kind(HwDeviceKind::D3d11).unwrap());

        let mut decoder = VideoDecoder::new();
        decoder.open(&service, &video_stream(), Some(hw)).unwrap();

        let mut frames = Vec::new();
        decoder.decode(Some(&packet(0)), &mut frames).unwrap();
        assert_eq!(decoder.zero_copy_enabled(), Some(false));
    }

    #[test]
    fn test_software_frames_do_not_trigger_validation() {
        let mut context = ScriptedContext::new();
        context.receives.push_back(ReceiveStatus::Frame(software_frame(0)));
        let service = OneShotService::with(context);

        let mut decoder = VideoDecoder::new();
        decoder.open(&service, &video_stream(), None).unwrap();

        let mut frames = Vec::new();
        decoder.decode(Some(&packet(0)), &mut frames).unwrap();
        assert_eq!(decoder.zero_copy_enabled(), None);
    }

    #[test]
    fn test_close_clears_hardware_state() {
        let service = OneShotService::with(ScriptedContext::new());
        let hw = Arc::new(HwContext::with_kind(HwDeviceKind::D3d11).unwrap());
        let mut decoder = VideoDecoder::new();
        decoder.open(&service, &video_stream(), Some(hw)).unwrap();

        decoder.close();
        assert!(!decoder.is_open());
        assert!(!decoder.is_hardware());
        assert_eq!(decoder.width(), None);
    }
}
