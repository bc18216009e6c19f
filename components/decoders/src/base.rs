//! The shared send/receive decode loop

use lumenplay_shared_types::{
    CodecContext, CodecService, DecodedFrame, HwFramePool, Packet, PlayerError, PlayerResult,
    ReceiveStatus, SendStatus, StreamInfo,
};
use tracing::{debug, warn};

/// Owns one codec context and runs the decode loop against it
///
/// The specializations wrap this type; the hook passed to
/// [`DecoderCore::open_with`] runs between context creation and first use,
/// which is where hardware acceleration gets wired.
pub struct DecoderCore {
    ctx: Option<Box<dyn CodecContext>>,
    stream: Option<StreamInfo>,
    had_invalid_data: bool,
}

impl DecoderCore {
    /// Creates a closed decoder
    pub fn new() -> Self {
        Self {
            ctx: None,
            stream: None,
            had_invalid_data: false,
        }
    }

    /// Opens a decoder for `stream` with a pre-open hook
    ///
    /// The hook receives the fresh codec context before any packet is
    /// submitted; failures from the hook abort the open.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::AlreadyRunning`] when already open, otherwise
    /// propagates the codec service's create failure or the hook's error.
    pub fn open_with<F>(
        &mut self,
        service: &dyn CodecService,
        stream: &StreamInfo,
        before_open: F,
    ) -> PlayerResult<()>
    where
        F: FnOnce(&mut dyn CodecContext) -> PlayerResult<()>,
    {
        if self.ctx.is_some() {
            return Err(PlayerError::AlreadyRunning(format!(
                "decoder for stream {} already open",
                stream.index
            )));
        }
        let mut ctx = service.create_decoder(stream)?;
        before_open(ctx.as_mut())?;
        self.ctx = Some(ctx);
        self.stream = Some(stream.clone());
        self.had_invalid_data = false;
        debug!(
            stream = stream.index,
            codec = stream.codec.name(),
            "decoder opened"
        );
        Ok(())
    }

    /// Opens a decoder for `stream` with no hook
    pub fn open(&mut self, service: &dyn CodecService, stream: &StreamInfo) -> PlayerResult<()> {
        self.open_with(service, stream, |_| Ok(()))
    }

    /// Returns whether a codec context is open
    pub fn is_open(&self) -> bool {
        self.ctx.is_some()
    }

    /// Returns the stream this decoder was opened for
    pub fn stream(&self) -> Option<&StreamInfo> {
        self.stream.as_ref()
    }

    /// Returns whether the codec ever reported `InvalidData`
    ///
    /// Diagnostic only; invalid data is expected under B-frame reordering
    /// and never fails a decode call.
    pub fn had_invalid_data(&self) -> bool {
        self.had_invalid_data
    }

    /// Returns the effective hardware frame pool, when one exists
    pub fn frame_pool(&self) -> Option<HwFramePool> {
        self.ctx.as_ref().and_then(|ctx| ctx.frame_pool())
    }

    /// Translates one packet into zero or more frames
    ///
    /// `None` is the flush sentinel and drains the codec completely. Decoded
    /// frames are appended to `out_frames`; their ownership (including any
    /// hardware surface claim) moves to the caller.
    ///
    /// The packet is considered released after this call whatever the
    /// outcome; callers must not re-submit it.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::NotInitialized`] when closed and
    /// [`PlayerError::DecoderReceiveFrameFailed`] on a fatal receive
    /// failure. Send-side conditions never fail the call.
    pub fn decode(
        &mut self,
        packet: Option<&Packet>,
        out_frames: &mut Vec<DecodedFrame>,
    ) -> PlayerResult<()> {
        let ctx = self
            .ctx
            .as_mut()
            .ok_or_else(|| PlayerError::NotInitialized("decoder is closed".to_string()))?;

        match ctx.send_packet(packet) {
            SendStatus::Accepted | SendStatus::BufferFull | SendStatus::EndOfStream => {}
            SendStatus::InvalidData => {
                // Legitimate under B-frame reordering: the codec buffers
                // packets whose reference frames have not arrived yet
                self.had_invalid_data = true;
                debug!("codec reported invalid data; continuing");
            }
            SendStatus::Failed(message) => {
                // Earlier submissions may still have frames buffered
                warn!(%message, "packet submission failed; draining receives");
            }
        }

        loop {
            match ctx.receive_frame() {
                ReceiveStatus::Frame(frame) => out_frames.push(frame),
                ReceiveStatus::BufferEmpty | ReceiveStatus::EndOfStream => return Ok(()),
                ReceiveStatus::Failed(message) => {
                    return Err(PlayerError::DecoderReceiveFrameFailed(message));
                }
            }
        }
    }

    /// Drains the codec by submitting the flush sentinel
    pub fn flush(&mut self, out_frames: &mut Vec<DecodedFrame>) -> PlayerResult<()> {
        self.decode(None, out_frames)
    }

    /// Discards buffered codec state without producing frames
    ///
    /// Used by the seek protocol; a closed decoder is a no-op.
    pub fn flush_buffers(&mut self) {
        if let Some(ctx) = self.ctx.as_mut() {
            ctx.flush_buffers();
        }
    }

    /// Drops the codec context and working state
    pub fn close(&mut self) {
        if self.ctx.take().is_some() {
            debug!("decoder closed");
        }
        self.stream = None;
        self.had_invalid_data = false;
    }
}

impl Default for DecoderCore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod testsupport {
    //! Scripted codec-service doubles shared by the decoder tests

    use super::*;
    use bytes::Bytes;
    use lumenplay_shared_types::{
        AudioFrame, ChannelLayout, CodecId, CodecParameters, FrameContent, HwFormatSelector,
        MediaInput, MediaType, PixelFormat, SampleFormat, SharedHwDevice, TimeBase, VideoFrame,
    };
    use std::collections::VecDeque;
    use std::sync::Arc;

    pub fn video_stream() -> StreamInfo {
        StreamInfo {
            index: 0,
            media_type: MediaType::Video,
            codec: CodecId::H264,
            time_base: TimeBase::new(1, 90_000),
            params: CodecParameters::Video {
                width: 1280,
                height: 720,
                pixel_format: PixelFormat::Yuv420p,
                frame_rate: Some(30.0),
                extra_data: Bytes::new(),
            },
        }
    }

    pub fn audio_stream() -> StreamInfo {
        StreamInfo {
            index: 1,
            media_type: MediaType::Audio,
            codec: CodecId::Aac,
            time_base: TimeBase::new(1, 48_000),
            params: CodecParameters::Audio {
                sample_rate: 48_000,
                channel_layout: ChannelLayout::Stereo,
                sample_format: SampleFormat::F32Planar,
                extra_data: Bytes::new(),
            },
        }
    }

    pub fn software_frame(pts: i64) -> DecodedFrame {
        DecodedFrame::Video(VideoFrame {
            width: 1280,
            height: 720,
            pts: Some(pts),
            time_base: TimeBase::MILLISECONDS,
            content: FrameContent::Software {
                format: PixelFormat::Yuv420p,
                planes: Vec::new(),
            },
        })
    }

    pub fn audio_frame(pts: i64) -> DecodedFrame {
        DecodedFrame::Audio(AudioFrame {
            nb_samples: 1024,
            sample_rate: 48_000,
            channel_layout: ChannelLayout::Stereo,
            format: SampleFormat::F32Planar,
            pts: Some(pts),
            time_base: TimeBase::MILLISECONDS,
            planes: Vec::new(),
        })
    }

    /// A codec context driven by pre-scripted send/receive outcomes
    pub struct ScriptedContext {
        pub sends: VecDeque<SendStatus>,
        pub receives: VecDeque<ReceiveStatus>,
        pub flush_calls: usize,
        pub hw_attach: Option<(SharedHwDevice, Arc<dyn HwFormatSelector>)>,
        pub hw_attach_fails: bool,
        pub pool: Option<HwFramePool>,
    }

    impl ScriptedContext {
        pub fn new() -> Self {
            Self {
                sends: VecDeque::new(),
                receives: VecDeque::new(),
                flush_calls: 0,
                hw_attach: None,
                hw_attach_fails: false,
                pool: None,
            }
        }
    }

    impl CodecContext for ScriptedContext {
        fn send_packet(&mut self, _packet: Option<&Packet>) -> SendStatus {
            self.sends.pop_front().unwrap_or(SendStatus::Accepted)
        }

        fn receive_frame(&mut self) -> ReceiveStatus {
            self.receives.pop_front().unwrap_or(ReceiveStatus::BufferEmpty)
        }

        fn flush_buffers(&mut self) {
            self.flush_calls += 1;
        }

        fn attach_hw_device(
            &mut self,
            device: &SharedHwDevice,
            selector: Arc<dyn HwFormatSelector>,
        ) -> PlayerResult<()> {
            if self.hw_attach_fails {
                return Err(PlayerError::NotSupported(
                    "no hardware profile for codec".to_string(),
                ));
            }
            self.hw_attach = Some((device.clone(), selector));
            Ok(())
        }

        fn frame_pool(&self) -> Option<HwFramePool> {
            self.pool.clone()
        }
    }

    /// A codec service returning one prepared context
    pub struct OneShotService {
        pub context: std::sync::Mutex<Option<ScriptedContext>>,
    }

    impl OneShotService {
        pub fn with(context: ScriptedContext) -> Self {
            Self {
                context: std::sync::Mutex::new(Some(context)),
            }
        }
    }

    impl CodecService for OneShotService {
        fn open_input(
            &self,
            url: &str,
            _options: &[(String, String)],
        ) -> PlayerResult<Box<dyn MediaInput>> {
            Err(PlayerError::FileNotFound(url.to_string()))
        }

        fn create_decoder(&self, _stream: &StreamInfo) -> PlayerResult<Box<dyn CodecContext>> {
            let context = self
                .context
                .lock()
                .expect("poisoned")
                .take()
                .ok_or_else(|| PlayerError::DecoderInitFailed("context exhausted".to_string()))?;
            Ok(Box::new(context))
        }
    }

    pub fn packet(pts: i64) -> Packet {
        Packet {
            stream_index: 0,
            pts: Some(pts),
            dts: Some(pts),
            time_base: TimeBase::MILLISECONDS,
            key_frame: false,
            data: Bytes::from_static(&[0u8; 4]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testsupport::*;
    use super::*;

    #[test]
    fn test_decode_appends_frames_in_order() {
        let mut context = ScriptedContext::new();
        context.receives.push_back(ReceiveStatus::Frame(software_frame(0)));
        context.receives.push_back(ReceiveStatus::Frame(software_frame(33)));
        let service = OneShotService::with(context);

        let mut decoder = DecoderCore::new();
        decoder.open(&service, &video_stream()).unwrap();

        let mut frames = Vec::new();
        decoder.decode(Some(&packet(0)), &mut frames).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].pts_ms(), Some(0));
        assert_eq!(frames[1].pts_ms(), Some(33));
    }

    #[test]
    fn test_invalid_data_is_tolerated() {
        let mut context = ScriptedContext::new();
        context.sends.push_back(SendStatus::InvalidData);
        let service = OneShotService::with(context);

        let mut decoder = DecoderCore::new();
        decoder.open(&service, &video_stream()).unwrap();

        let mut frames = Vec::new();
        decoder.decode(Some(&packet(0)), &mut frames).unwrap();
        assert!(decoder.had_invalid_data());
        assert!(frames.is_empty());
    }

    #[test]
    fn test_buffer_full_still_drains_receives() {
        let mut context = ScriptedContext::new();
        context.sends.push_back(SendStatus::BufferFull);
        context.receives.push_back(ReceiveStatus::Frame(software_frame(0)));
        let service = OneShotService::with(context);

        let mut decoder = DecoderCore::new();
        decoder.open(&service, &video_stream()).unwrap();

        let mut frames = Vec::new();
        decoder.decode(Some(&packet(0)), &mut frames).unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_send_failure_is_a_warning_not_an_error() {
        let mut context = ScriptedContext::new();
        context.sends.push_back(SendStatus::Failed("bitstream".to_string()));
        context.receives.push_back(ReceiveStatus::Frame(software_frame(66)));
        let service = OneShotService::with(context);

        let mut decoder = DecoderCore::new();
        decoder.open(&service, &video_stream()).unwrap();

        let mut frames = Vec::new();
        decoder.decode(Some(&packet(0)), &mut frames).unwrap();
        assert_eq!(frames.len(), 1);
        assert!(!decoder.had_invalid_data());
    }

    #[test]
    fn test_receive_failure_aborts() {
        let mut context = ScriptedContext::new();
        context.receives.push_back(ReceiveStatus::Failed("corrupt".to_string()));
        let service = OneShotService::with(context);

        let mut decoder = DecoderCore::new();
        decoder.open(&service, &video_stream()).unwrap();

        let mut frames = Vec::new();
        let err = decoder.decode(Some(&packet(0)), &mut frames).unwrap_err();
        assert!(matches!(err, PlayerError::DecoderReceiveFrameFailed(_)));
    }

    #[test]
    fn test_flush_drains_until_end_of_stream() {
        let mut context = ScriptedContext::new();
        context.sends.push_back(SendStatus::EndOfStream);
        context.receives.push_back(ReceiveStatus::Frame(software_frame(100)));
        context.receives.push_back(ReceiveStatus::EndOfStream);
        let service = OneShotService::with(context);

        let mut decoder = DecoderCore::new();
        decoder.open(&service, &video_stream()).unwrap();

        let mut frames = Vec::new();
        decoder.flush(&mut frames).unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_decode_when_closed_fails() {
        let mut decoder = DecoderCore::new();
        let mut frames = Vec::new();
        let err = decoder.decode(Some(&packet(0)), &mut frames).unwrap_err();
        assert!(matches!(err, PlayerError::NotInitialized(_)));
    }

    #[test]
    fn test_double_open_rejected() {
        let service = OneShotService::with(ScriptedContext::new());
        let mut decoder = DecoderCore::new();
        decoder.open(&service, &video_stream()).unwrap();
        let err = decoder.open(&service, &video_stream()).unwrap_err();
        assert!(matches!(err, PlayerError::AlreadyRunning(_)));
    }

    #[test]
    fn test_close_then_reopen() {
        let service = OneShotService::with(ScriptedContext::new());
        let mut decoder = DecoderCore::new();
        decoder.open(&service, &video_stream()).unwrap();
        decoder.close();
        assert!(!decoder.is_open());
        assert!(decoder.stream().is_none());

        let service = OneShotService::with(ScriptedContext::new());
        decoder.open(&service, &video_stream()).unwrap();
        assert!(decoder.is_open());
    }
}
