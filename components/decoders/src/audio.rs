//! Audio decoder specialization

use crate::DecoderCore;
use lumenplay_shared_types::{
    ChannelLayout, CodecParameters, CodecService, DecodedFrame, MediaType, Packet, PlayerError,
    PlayerResult, SampleFormat, StreamInfo, TimeBase,
};

/// Decoder for the active audio stream
///
/// Validates that the stream really is audio and otherwise defers entirely
/// to [`DecoderCore`]; audio has no hardware hook.
pub struct AudioDecoder {
    core: DecoderCore,
}

impl AudioDecoder {
    /// Creates a closed audio decoder
    pub fn new() -> Self {
        Self {
            core: DecoderCore::new(),
        }
    }

    /// Opens the decoder for an audio stream
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::InvalidParameter`] for a non-audio stream;
    /// otherwise propagates the core open failure.
    pub fn open(&mut self, service: &dyn CodecService, stream: &StreamInfo) -> PlayerResult<()> {
        if stream.media_type != MediaType::Audio {
            return Err(PlayerError::InvalidParameter(format!(
                "stream {} is not an audio stream",
                stream.index
            )));
        }
        self.core.open(service, stream)
    }

    /// Decodes one packet; `None` flushes
    pub fn decode(
        &mut self,
        packet: Option<&Packet>,
        out_frames: &mut Vec<DecodedFrame>,
    ) -> PlayerResult<()> {
        self.core.decode(packet, out_frames)
    }

    /// Drains the decoder via the flush sentinel
    pub fn flush(&mut self, out_frames: &mut Vec<DecodedFrame>) -> PlayerResult<()> {
        self.core.flush(out_frames)
    }

    /// Discards buffered decoder state; used by the seek protocol
    pub fn flush_buffers(&mut self) {
        self.core.flush_buffers();
    }

    /// Drops the codec context
    pub fn close(&mut self) {
        self.core.close();
    }

    /// Returns whether the decoder is open
    pub fn is_open(&self) -> bool {
        self.core.is_open()
    }

    /// Returns whether the codec ever reported `InvalidData`
    pub fn had_invalid_data(&self) -> bool {
        self.core.had_invalid_data()
    }

    /// Returns the probed sample rate in Hz
    pub fn sample_rate(&self) -> Option<u32> {
        match self.core.stream().map(|s| &s.params) {
            Some(CodecParameters::Audio { sample_rate, .. }) => Some(*sample_rate),
            _ => None,
        }
    }

    /// Returns the probed channel layout
    pub fn channel_layout(&self) -> Option<ChannelLayout> {
        match self.core.stream().map(|s| &s.params) {
            Some(CodecParameters::Audio { channel_layout, .. }) => Some(*channel_layout),
            _ => None,
        }
    }

    /// Returns the probed sample format
    pub fn sample_format(&self) -> Option<SampleFormat> {
        match self.core.stream().map(|s| &s.params) {
            Some(CodecParameters::Audio { sample_format, .. }) => Some(*sample_format),
            _ => None,
        }
    }

    /// Returns the stream time base
    pub fn time_base(&self) -> Option<TimeBase> {
        self.core.stream().map(|s| s.time_base)
    }
}

impl Default for AudioDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::testsupport::*;
    use lumenplay_shared_types::{CodecContext, HwFramePool, ReceiveStatus, SendStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Records codec calls so the tests can assert the loop's traffic
    struct RecordingCtx {
        flushes: Arc<AtomicUsize>,
        sentinel_sends: Arc<AtomicUsize>,
    }

    impl CodecContext for RecordingCtx {
        fn send_packet(&mut self, packet: Option<&Packet>) -> SendStatus {
            if packet.is_none() {
                self.sentinel_sends.fetch_add(1, Ordering::SeqCst);
                return SendStatus::EndOfStream;
            }
            SendStatus::Accepted
        }

        fn receive_frame(&mut self) -> ReceiveStatus {
            ReceiveStatus::EndOfStream
        }

        fn flush_buffers(&mut self) {
            self.flushes.fetch_add(1, Ordering::SeqCst);
        }

        fn attach_hw_device(
            &mut self,
            _device: &lumenplay_shared_types::SharedHwDevice,
            _selector: Arc<dyn lumenplay_shared_types::HwFormatSelector>,
        ) -> PlayerResult<()> {
            Err(PlayerError::NotSupported("audio".to_string()))
        }

        fn frame_pool(&self) -> Option<HwFramePool> {
            None
        }
    }

    struct RecordingService {
        flushes: Arc<AtomicUsize>,
        sentinel_sends: Arc<AtomicUsize>,
    }

    impl CodecService for RecordingService {
        fn open_input(
            &self,
            url: &str,
            _options: &[(String, String)],
        ) -> PlayerResult<Box<dyn lumenplay_shared_types::MediaInput>> {
            Err(PlayerError::FileNotFound(url.to_string()))
        }

        fn create_decoder(
            &self,
            _stream: &StreamInfo,
        ) -> PlayerResult<Box<dyn CodecContext>> {
            Ok(Box::new(RecordingCtx {
                flushes: Arc::clone(&self.flushes),
                sentinel_sends: Arc::clone(&self.sentinel_sends),
            }))
        }
    }

    #[test]
    fn test_rejects_video_stream() {
        let service = OneShotService::with(ScriptedContext::new());
        let mut decoder = AudioDecoder::new();
        let err = decoder.open(&service, &video_stream()).unwrap_err();
        assert!(matches!(err, PlayerError::InvalidParameter(_)));
    }

    #[test]
    fn test_accessors_after_open() {
        let service = OneShotService::with(ScriptedContext::new());
        let mut decoder = AudioDecoder::new();
        decoder.open(&service, &audio_stream()).unwrap();

        assert_eq!(decoder.sample_rate(), Some(48_000));
        assert_eq!(decoder.channel_layout(), Some(ChannelLayout::Stereo));
        assert_eq!(decoder.sample_format(), Some(SampleFormat::F32Planar));
        assert_eq!(decoder.time_base(), Some(TimeBase::new(1, 48_000)));
    }

    #[test]
    fn test_decode_delivers_audio_frames() {
        let mut context = ScriptedContext::new();
        context.receives.push_back(ReceiveStatus::Frame(audio_frame(0)));
        context.receives.push_back(ReceiveStatus::Frame(audio_frame(21)));
        let service = OneShotService::with(context);

        let mut decoder = AudioDecoder::new();
        decoder.open(&service, &audio_stream()).unwrap();

        let mut frames = Vec::new();
        decoder.decode(Some(&packet(0)), &mut frames).unwrap();
        assert_eq!(frames.len(), 2);
        assert!(matches!(frames[0], DecodedFrame::Audio(_)));
    }

    #[test]
    fn test_flush_buffers_reaches_codec() {
        let flushes = Arc::new(AtomicUsize::new(0));
        let service = RecordingService {
            flushes: Arc::clone(&flushes),
            sentinel_sends: Arc::new(AtomicUsize::new(0)),
        };

        let mut decoder = AudioDecoder::new();
        decoder.open(&service, &audio_stream()).unwrap();
        decoder.flush_buffers();
        assert_eq!(flushes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sentinel_reaches_codec_on_flush() {
        let sentinel_sends = Arc::new(AtomicUsize::new(0));
        let service = RecordingService {
            flushes: Arc::new(AtomicUsize::new(0)),
            sentinel_sends: Arc::clone(&sentinel_sends),
        };

        let mut decoder = AudioDecoder::new();
        decoder.open(&service, &audio_stream()).unwrap();

        let mut frames = Vec::new();
        decoder.flush(&mut frames).unwrap();
        assert!(frames.is_empty());
        assert_eq!(sentinel_sends.load(Ordering::SeqCst), 1);
    }
}
