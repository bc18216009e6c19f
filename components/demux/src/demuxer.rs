//! Demuxer adapter over the codec service

use crate::InputOptions;
use lumenplay_shared_types::{
    CodecService, MediaInput, MediaMetadata, MediaType, Packet, PlayerError, PlayerResult,
    StreamInfo,
};
use tracing::{debug, info};

/// Opens a source and yields packets for the active video/audio streams
///
/// Stream descriptors are immutable after the probe. Index 0 of each list is
/// active by default; `select_video_stream` / `select_audio_stream` switch
/// tracks, after which packets of the previous track are dropped internally.
pub struct Demuxer {
    input: Box<dyn MediaInput>,
    url: String,
    video_streams: Vec<StreamInfo>,
    audio_streams: Vec<StreamInfo>,
    active_video: Option<usize>,
    active_audio: Option<usize>,
}

impl Demuxer {
    /// Opens `url` through the codec service with transport-derived tuning
    ///
    /// # Errors
    ///
    /// Propagates the service's open failure (`FileNotFound`,
    /// `AccessDenied`, `NetworkTimeout`, `Io`) with its message.
    pub fn open(service: &dyn CodecService, url: &str) -> PlayerResult<Self> {
        let options = InputOptions::for_url(url);
        debug!(url, transport = ?options.transport, "opening source");
        let input = service.open_input(url, &options.to_pairs())?;

        let mut video_streams = Vec::new();
        let mut audio_streams = Vec::new();
        for stream in input.streams() {
            match stream.media_type {
                MediaType::Video => video_streams.push(stream.clone()),
                MediaType::Audio => audio_streams.push(stream.clone()),
                MediaType::Other => {}
            }
        }

        let active_video = video_streams.first().map(|s| s.index);
        let active_audio = audio_streams.first().map(|s| s.index);
        info!(
            url,
            video_streams = video_streams.len(),
            audio_streams = audio_streams.len(),
            duration_ms = input.duration_ms(),
            "source opened"
        );

        Ok(Self {
            input,
            url: url.to_string(),
            video_streams,
            audio_streams,
            active_video,
            active_audio,
        })
    }

    /// Reads the next packet of an active stream
    ///
    /// Packets belonging to inactive streams are dropped internally.
    /// `Ok(None)` signals end of stream.
    pub fn read_packet(&mut self) -> PlayerResult<Option<Packet>> {
        loop {
            match self.input.read_packet()? {
                None => return Ok(None),
                Some(packet) => {
                    let index = packet.stream_index;
                    if Some(index) == self.active_video || Some(index) == self.active_audio {
                        return Ok(Some(packet));
                    }
                    // Inactive stream; release and keep reading
                }
            }
        }
    }

    /// Seeks to `timestamp_us`
    ///
    /// With `backward` set the codec framework lands on or before the
    /// nearest key frame; framework buffers are flushed before returning.
    pub fn seek(&mut self, timestamp_us: i64, backward: bool) -> PlayerResult<()> {
        debug!(timestamp_us, backward, "demuxer seek");
        self.input.seek(timestamp_us, backward)
    }

    /// Returns the container duration in milliseconds, 0 when unknown
    pub fn duration_ms(&self) -> i64 {
        self.input.duration_ms()
    }

    /// Returns container-level metadata
    pub fn metadata(&self) -> MediaMetadata {
        self.input.metadata()
    }

    /// Returns the source URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Looks up a stream descriptor by container index
    pub fn find_stream_by_index(&self, index: usize) -> Option<&StreamInfo> {
        self.video_streams
            .iter()
            .chain(self.audio_streams.iter())
            .find(|s| s.index == index)
    }

    /// Returns the probed video streams
    pub fn video_streams(&self) -> &[StreamInfo] {
        &self.video_streams
    }

    /// Returns the probed audio streams
    pub fn audio_streams(&self) -> &[StreamInfo] {
        &self.audio_streams
    }

    /// Returns the active video stream descriptor
    pub fn video_stream(&self) -> Option<&StreamInfo> {
        self.active_video.and_then(|i| self.find_stream_by_index(i))
    }

    /// Returns the active audio stream descriptor
    pub fn audio_stream(&self) -> Option<&StreamInfo> {
        self.active_audio.and_then(|i| self.find_stream_by_index(i))
    }

    /// Returns whether an active video stream exists
    pub fn has_video(&self) -> bool {
        self.active_video.is_some()
    }

    /// Returns whether an active audio stream exists
    pub fn has_audio(&self) -> bool {
        self.active_audio.is_some()
    }

    /// Switches the active video track to the stream at `index`
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::InvalidParameter`] when `index` is not a
    /// probed video stream.
    pub fn select_video_stream(&mut self, index: usize) -> PlayerResult<()> {
        if !self.video_streams.iter().any(|s| s.index == index) {
            return Err(PlayerError::InvalidParameter(format!(
                "no video stream with index {}",
                index
            )));
        }
        self.active_video = Some(index);
        Ok(())
    }

    /// Switches the active audio track to the stream at `index`
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::InvalidParameter`] when `index` is not a
    /// probed audio stream.
    pub fn select_audio_stream(&mut self, index: usize) -> PlayerResult<()> {
        if !self.audio_streams.iter().any(|s| s.index == index) {
            return Err(PlayerError::InvalidParameter(format!(
                "no audio stream with index {}",
                index
            )));
        }
        self.active_audio = Some(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use lumenplay_shared_types::{
        ChannelLayout, CodecContext, CodecId, CodecParameters, SampleFormat, TimeBase,
    };
    use std::sync::Mutex;

    fn video_stream(index: usize) -> StreamInfo {
        StreamInfo {
            index,
            media_type: MediaType::Video,
            codec: CodecId::H264,
            time_base: TimeBase::new(1, 90_000),
            params: CodecParameters::Video {
                width: 1920,
                height: 1080,
                pixel_format: lumenplay_shared_types::PixelFormat::Yuv420p,
                frame_rate: Some(30.0),
                extra_data: Bytes::new(),
            },
        }
    }

    fn audio_stream(index: usize) -> StreamInfo {
        StreamInfo {
            index,
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

    fn packet(stream_index: usize, pts: i64) -> Packet {
        Packet {
            stream_index,
            pts: Some(pts),
            dts: Some(pts),
            time_base: TimeBase::MILLISECONDS,
            key_frame: false,
            data: Bytes::from_static(&[0u8; 8]),
        }
    }

    struct ScriptedInput {
        streams: Vec<StreamInfo>,
        packets: Vec<Packet>,
        cursor: usize,
    }

    impl MediaInput for ScriptedInput {
        fn streams(&self) -> &[StreamInfo] {
            &self.streams
        }

        fn read_packet(&mut self) -> PlayerResult<Option<Packet>> {
            let packet = self.packets.get(self.cursor).cloned();
            if packet.is_some() {
                self.cursor += 1;
            }
            Ok(packet)
        }

        fn seek(&mut self, _target_us: i64, _backward: bool) -> PlayerResult<()> {
            self.cursor = 0;
            Ok(())
        }

        fn duration_ms(&self) -> i64 {
            10_000
        }

        fn metadata(&self) -> MediaMetadata {
            MediaMetadata {
                title: Some("test".to_string()),
                ..MediaMetadata::default()
            }
        }
    }

    struct ScriptedService {
        streams: Vec<StreamInfo>,
        packets: Vec<Packet>,
        pub seen_options: Mutex<Vec<(String, String)>>,
    }

    impl CodecService for ScriptedService {
        fn open_input(
            &self,
            _url: &str,
            options: &[(String, String)],
        ) -> PlayerResult<Box<dyn MediaInput>> {
            *self.seen_options.lock().unwrap() = options.to_vec();
            Ok(Box::new(ScriptedInput {
                streams: self.streams.clone(),
                packets: self.packets.clone(),
                cursor: 0,
            }))
        }

        fn create_decoder(&self, _stream: &StreamInfo) -> PlayerResult<Box<dyn CodecContext>> {
            Err(PlayerError::DecoderNotFound("not in this test".to_string()))
        }
    }

    fn service_with(streams: Vec<StreamInfo>, packets: Vec<Packet>) -> ScriptedService {
        ScriptedService {
            streams,
            packets,
            seen_options: Mutex::new(Vec::new()),
        }
    }

    #[test]
    fn test_probe_selects_first_streams() {
        let service = service_with(
            vec![video_stream(0), audio_stream(1), audio_stream(2)],
            vec![],
        );
        let demuxer = Demuxer::open(&service, "clip.mp4").unwrap();
        assert_eq!(demuxer.video_stream().unwrap().index, 0);
        assert_eq!(demuxer.audio_stream().unwrap().index, 1);
        assert_eq!(demuxer.audio_streams().len(), 2);
        assert!(demuxer.has_video());
        assert!(demuxer.has_audio());
    }

    #[test]
    fn test_read_packet_filters_inactive_streams() {
        let service = service_with(
            vec![video_stream(0), audio_stream(1), audio_stream(2)],
            vec![packet(0, 0), packet(2, 0), packet(1, 0), packet(2, 10)],
        );
        let mut demuxer = Demuxer::open(&service, "clip.mp4").unwrap();

        assert_eq!(demuxer.read_packet().unwrap().unwrap().stream_index, 0);
        // Stream 2 is inactive: skipped, stream 1 delivered
        assert_eq!(demuxer.read_packet().unwrap().unwrap().stream_index, 1);
        // Trailing inactive packet, then EOS
        assert!(demuxer.read_packet().unwrap().is_none());
    }

    #[test]
    fn test_eos_is_a_value() {
        let service = service_with(vec![video_stream(0)], vec![]);
        let mut demuxer = Demuxer::open(&service, "clip.mp4").unwrap();
        assert!(demuxer.read_packet().unwrap().is_none());
        // EOS is repeatable, not sticky failure
        assert!(demuxer.read_packet().unwrap().is_none());
    }

    #[test]
    fn test_network_tuning_reaches_service() {
        let service = service_with(vec![video_stream(0)], vec![]);
        Demuxer::open(&service, "rtsp://cam/live").unwrap();
        let seen = service.seen_options.lock().unwrap();
        assert!(seen.contains(&("rtsp_transport".to_string(), "tcp".to_string())));
        assert!(seen.contains(&("buffer_size".to_string(), (5 * 1024 * 1024).to_string())));
    }

    #[test]
    fn test_select_stream_validation() {
        let service = service_with(vec![video_stream(0), audio_stream(1), audio_stream(2)], vec![]);
        let mut demuxer = Demuxer::open(&service, "clip.mp4").unwrap();

        demuxer.select_audio_stream(2).unwrap();
        assert_eq!(demuxer.audio_stream().unwrap().index, 2);

        assert!(demuxer.select_audio_stream(0).is_err());
        assert!(demuxer.select_video_stream(9).is_err());
    }

    #[test]
    fn test_getters() {
        let service = service_with(vec![video_stream(0), audio_stream(1)], vec![]);
        let demuxer = Demuxer::open(&service, "clip.mp4").unwrap();
        assert_eq!(demuxer.duration_ms(), 10_000);
        assert_eq!(demuxer.metadata().title.as_deref(), Some("test"));
        assert_eq!(demuxer.url(), "clip.mp4");
        assert!(demuxer.find_stream_by_index(1).is_some());
        assert!(demuxer.find_stream_by_index(7).is_none());
    }
}
