//! The player facade

use crate::builder::{AudioDriverFactory, RendererFactory};
use crate::PlayerConfig;
use lumenplay_audio_output::{AudioPlayer, AudioResampler};
use lumenplay_av_sync::{SyncController, SyncMode};
use lumenplay_decoders::{AudioDecoder, VideoDecoder};
use lumenplay_demux::Demuxer;
use lumenplay_hw_accel::HwContext;
use lumenplay_playback_control::{AudioPipeline, PlaybackController, VideoPipeline};
use lumenplay_shared_types::{
    CodecParameters, CodecService, HwDeviceKind, MediaMetadata, PlayerError, PlayerResult,
    PlayerState, StreamInfo, WindowHandle,
};
use lumenplay_state_manager::{StateManager, SubscriptionId};
use lumenplay_video_output::VideoPlayer;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::{Arc, Once};
use std::thread;
use std::time::Instant;
use tracing::{error, info, warn};

/// One-time network-subsystem initialization
static NETWORK_INIT: Once = Once::new();

/// Everything owned for one opened source
///
/// Field order is the cleanup order: pipeline threads, players, decoders,
/// the hardware context (after the decoders that use its device), and the
/// demuxer last.
struct Session {
    controller: PlaybackController,
    video_player: Option<Arc<VideoPlayer>>,
    audio_player: Option<Arc<AudioPlayer>>,
    video_decoder: Option<Arc<Mutex<VideoDecoder>>>,
    audio_decoder: Option<Arc<Mutex<AudioDecoder>>>,
    resampler: Option<Arc<Mutex<AudioResampler>>>,
    hw: Option<Arc<HwContext>>,
    demuxer: Arc<Mutex<Demuxer>>,
    duration_ms: i64,
}

/// The embedded-application API of the playback core
///
/// All control operations are non-reentrant from state-change callbacks.
/// `seek_async` never blocks; its outcome is observable through the state
/// subscription (`Seeking → Playing|Paused` on success, `Seeking → Error`
/// on failure).
pub struct Player {
    service: Arc<dyn CodecService>,
    config: PlayerConfig,
    state: Arc<StateManager>,
    sync: Arc<SyncController>,
    renderer_factory: RendererFactory,
    audio_driver_factory: AudioDriverFactory,
    render_window: Mutex<Option<(WindowHandle, u32, u32)>>,
    session: Mutex<Option<Session>>,
    // Cached so position queries from state-change callbacks never touch
    // the session lock
    duration_ms: AtomicI64,
    // Desired output gain (f32 bits) and mute flag; survive across opens
    volume: AtomicU32,
    muted: AtomicBool,
}

impl Player {
    pub(crate) fn assemble(
        service: Arc<dyn CodecService>,
        config: PlayerConfig,
        renderer_factory: RendererFactory,
        audio_driver_factory: AudioDriverFactory,
    ) -> Self {
        let sync = Arc::new(SyncController::with_config(
            SyncMode::AudioMaster,
            config.sync.clone(),
        ));
        Self {
            service,
            config,
            state: Arc::new(StateManager::new()),
            sync,
            renderer_factory,
            audio_driver_factory,
            render_window: Mutex::new(None),
            session: Mutex::new(None),
            duration_ms: AtomicI64::new(0),
            volume: AtomicU32::new(1.0f32.to_bits()),
            muted: AtomicBool::new(false),
        }
    }

    /// Opens and probes a source, wiring the full pipeline
    ///
    /// On success the state runs `Idle → Opening → Stopped`. Any failure
    /// tears down the partially built components in reverse dependency
    /// order and transitions to `Error`.
    ///
    /// # Errors
    ///
    /// Propagates demuxer open failures (`FileNotFound`, `AccessDenied`,
    /// `NetworkTimeout`, `Io`) and decoder open failures.
    pub fn open(&self, url: &str) -> PlayerResult<()> {
        if self.session.lock().is_some() {
            self.close();
        }
        if self.state.state() == PlayerState::Error {
            // A failed open leaves Error behind; recover to Idle first
            let _ = self.state.transition_to(PlayerState::Idle);
        }
        NETWORK_INIT.call_once(|| self.service.init_network());

        self.state.transition_to(PlayerState::Opening)?;
        match self.open_session(url) {
            Ok(session) => {
                self.duration_ms.store(session.duration_ms, Ordering::Release);
                *self.session.lock() = Some(session);
                self.state.transition_to(PlayerState::Stopped)?;
                info!(url, "source ready");
                Ok(())
            }
            Err(err) => {
                error!(url, error = %err, "open failed");
                // Partial components were dropped in reverse order already
                let _ = self.state.transition_to(PlayerState::Error);
                Err(err)
            }
        }
    }

    fn open_session(&self, url: &str) -> PlayerResult<Session> {
        let demuxer = Demuxer::open(self.service.as_ref(), url)?;
        let duration_ms = demuxer.duration_ms();
        let video_stream = demuxer.video_stream().cloned();
        let audio_stream = demuxer.audio_stream().cloned();
        let demuxer = Arc::new(Mutex::new(demuxer));

        let mut video_pipeline = None;
        let mut video_player_slot = None;
        let mut video_decoder_slot = None;
        let mut hw_slot = None;
        if let Some(stream) = video_stream {
            let video_player = Arc::new(VideoPlayer::new(
                Arc::clone(&self.sync),
                Arc::clone(&self.state),
            ));
            video_player.set_renderer((self.renderer_factory)());
            if let Some((window, width, height)) = *self.render_window.lock() {
                video_player.init_renderer(window, width, height)?;
            }

            let hw = self.maybe_hardware_context(&stream, &video_player);
            let mut decoder = VideoDecoder::new();
            decoder.open(self.service.as_ref(), &stream, hw.clone())?;
            let decoder = Arc::new(Mutex::new(decoder));

            video_pipeline = Some(VideoPipeline {
                decoder: Arc::clone(&decoder),
                player: Arc::clone(&video_player),
            });
            video_player_slot = Some(video_player);
            video_decoder_slot = Some(decoder);
            hw_slot = hw;
        }

        let mut audio_pipeline = None;
        let mut audio_player_slot = None;
        let mut audio_decoder_slot = None;
        let mut resampler_slot = None;
        if let Some(stream) = audio_stream {
            let audio_player = Arc::new(AudioPlayer::new(
                (self.audio_driver_factory)(),
                Arc::clone(&self.sync),
            ));
            audio_player.set_volume(f32::from_bits(self.volume.load(Ordering::Acquire)));
            audio_player.set_muted(self.muted.load(Ordering::Acquire));
            // The device may adjust the format; the resampler follows it
            let actual = audio_player.init(self.config.audio_spec)?;
            let resampler = Arc::new(Mutex::new(AudioResampler::new(actual)));

            let mut decoder = AudioDecoder::new();
            decoder.open(self.service.as_ref(), &stream)?;
            let decoder = Arc::new(Mutex::new(decoder));

            audio_pipeline = Some(AudioPipeline {
                decoder: Arc::clone(&decoder),
                resampler: Arc::clone(&resampler),
                player: Arc::clone(&audio_player),
            });
            audio_player_slot = Some(audio_player);
            audio_decoder_slot = Some(decoder);
            resampler_slot = Some(resampler);
        }

        let controller = PlaybackController::new(
            Arc::clone(&self.state),
            Arc::clone(&self.sync),
            Arc::clone(&demuxer),
            video_pipeline,
            audio_pipeline,
            self.config.playback.clone(),
        );

        Ok(Session {
            controller,
            video_player: video_player_slot,
            audio_player: audio_player_slot,
            video_decoder: video_decoder_slot,
            audio_decoder: audio_decoder_slot,
            resampler: resampler_slot,
            hw: hw_slot,
            demuxer,
            duration_ms,
        })
    }

    /// Decides the render path and builds the hardware context for it
    ///
    /// Hardware init failure is a downgrade, not an error: the warning is
    /// logged and the software path is used.
    fn maybe_hardware_context(
        &self,
        stream: &StreamInfo,
        video_player: &VideoPlayer,
    ) -> Option<Arc<HwContext>> {
        if !self.config.hardware_decoding || !stream.codec.hardware_decodable() {
            return None;
        }
        let (width, height) = match &stream.params {
            CodecParameters::Video { width, height, .. } => (*width, *height),
            _ => return None,
        };
        if width < self.config.hw_min_width || height < self.config.hw_min_height {
            info!(width, height, "below hardware threshold; software path");
            return None;
        }

        let context = match video_player.renderer_device() {
            Some(device) => Ok(HwContext::from_renderer_device(device)),
            None => HwContext::new(),
        };
        match context {
            Ok(context) => {
                if !context.capabilities().supports(stream.codec, width, height) {
                    warn!(
                        codec = stream.codec.name(),
                        width, height, "hardware device rejects this stream; software path"
                    );
                    return None;
                }
                Some(Arc::new(context))
            }
            Err(err) => {
                warn!(error = %err, "hardware context unavailable; software path");
                None
            }
        }
    }

    /// Stops playback and releases everything owned for the source
    ///
    /// Cleanup order: pipeline threads, renderer, decoders, hardware
    /// context, demuxer. The player returns to `Idle`.
    pub fn close(&self) {
        let Some(session) = self.session.lock().take() else {
            return;
        };

        if matches!(
            self.state.state(),
            PlayerState::Playing | PlayerState::Paused | PlayerState::Seeking
        ) {
            let _ = self.state.transition_to(PlayerState::Stopped);
        }
        session.controller.stop();

        if let Some(video_player) = session.video_player.as_ref() {
            video_player.release_renderer();
        }
        if let Some(decoder) = session.video_decoder.as_ref() {
            decoder.lock().close();
        }
        if let Some(decoder) = session.audio_decoder.as_ref() {
            decoder.lock().close();
        }
        if let Some(audio_player) = session.audio_player.as_ref() {
            audio_player.clear_frames();
        }
        // The hardware context and demuxer fall out of scope last, per the
        // Session field order
        drop(session);

        self.duration_ms.store(0, Ordering::Release);
        let _ = self.state.transition_to(PlayerState::Idle);
        info!("player closed");
    }

    /// Starts or resumes playback
    ///
    /// From `Stopped` the pipeline restarts deterministically from the
    /// source start (the demuxer is rewound, not re-opened). From `Paused`
    /// it resumes in place.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::NotInitialized`] with nothing open; rewind
    /// failures transition to `Error` and propagate.
    pub fn play(&self) -> PlayerResult<()> {
        let session_guard = self.session.lock();
        let session = session_guard
            .as_ref()
            .ok_or_else(|| PlayerError::NotInitialized("no media open".to_string()))?;

        match self.state.state() {
            PlayerState::Playing | PlayerState::Seeking => Ok(()),
            PlayerState::Paused => {
                // Clock anchors shift before the players produce updates
                session.controller.resume();
                self.state.transition_to(PlayerState::Playing)
            }
            PlayerState::Stopped => {
                if let Err(err) = self.rewind(session) {
                    error!(error = %err, "rewind on play failed");
                    let _ = self.state.transition_to(PlayerState::Error);
                    return Err(err);
                }
                self.state.transition_to(PlayerState::Playing)?;
                session.controller.start().map_err(|err| {
                    let _ = self.state.transition_to(PlayerState::Stopped);
                    err
                })
            }
            other => Err(PlayerError::NotInitialized(format!(
                "cannot play from {}",
                other.name()
            ))),
        }
    }

    fn rewind(&self, session: &Session) -> PlayerResult<()> {
        session.demuxer.lock().seek(0, true)?;
        if let Some(decoder) = session.video_decoder.as_ref() {
            decoder.lock().flush_buffers();
        }
        if let Some(decoder) = session.audio_decoder.as_ref() {
            decoder.lock().flush_buffers();
        }
        if let Some(resampler) = session.resampler.as_ref() {
            resampler.lock().reset();
        }
        self.sync.reset();
        Ok(())
    }

    /// Pauses playback; the position freezes until `play`
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::NotInitialized`] with nothing open. Pausing
    /// while not playing is a no-op.
    pub fn pause(&self) -> PlayerResult<()> {
        let session_guard = self.session.lock();
        let session = session_guard
            .as_ref()
            .ok_or_else(|| PlayerError::NotInitialized("no media open".to_string()))?;

        if self.state.state() != PlayerState::Playing {
            return Ok(());
        }
        self.state.transition_to(PlayerState::Paused)?;
        // Players first (no more clock updates), then the pause boundary
        session.controller.pause();
        Ok(())
    }

    /// Stops playback, joining every pipeline thread
    ///
    /// The media stays open; `play` restarts from the source start.
    pub fn stop(&self) -> PlayerResult<()> {
        let session_guard = self.session.lock();
        let session = session_guard
            .as_ref()
            .ok_or_else(|| PlayerError::NotInitialized("no media open".to_string()))?;

        match self.state.state() {
            PlayerState::Playing | PlayerState::Paused | PlayerState::Seeking => {
                self.state.transition_to(PlayerState::Stopped)?;
                session.controller.stop();
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Queues a non-blocking seek to `target_ms`
    ///
    /// With `backward` set the seek lands on or before the nearest key
    /// frame. Rapid calls coalesce to the newest target. The outcome is
    /// signaled through state transitions.
    pub fn seek_async(&self, target_ms: i64, backward: bool) {
        let session_guard = self.session.lock();
        if let Some(session) = session_guard.as_ref() {
            session.controller.seek_async(target_ms, backward);
        }
    }

    /// Attaches the render window; renderer init may run on a background
    /// thread
    ///
    /// Called before `open`, the window is remembered and applied during
    /// `open`. Init failure transitions to `Error`.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::Io`] when the init thread cannot spawn.
    pub fn set_render_window(
        &self,
        window: WindowHandle,
        width: u32,
        height: u32,
    ) -> PlayerResult<()> {
        *self.render_window.lock() = Some((window, width, height));

        let session_guard = self.session.lock();
        let Some(video_player) = session_guard
            .as_ref()
            .and_then(|s| s.video_player.as_ref())
            .map(Arc::clone)
        else {
            return Ok(());
        };
        drop(session_guard);

        let state = Arc::clone(&self.state);
        thread::Builder::new()
            .name("renderer-init".to_string())
            .spawn(move || {
                if let Err(err) = video_player.init_renderer(window, width, height) {
                    error!(error = %err, "renderer init failed");
                    let _ = state.transition_to(PlayerState::Error);
                }
            })
            .map_err(|e| PlayerError::Io(e.to_string()))?;
        Ok(())
    }

    /// Forwards a window resize to the renderer
    pub fn on_window_resize(&self, width: u32, height: u32) {
        {
            let mut window_guard = self.render_window.lock();
            if let Some((window, _, _)) = *window_guard {
                *window_guard = Some((window, width, height));
            }
        }
        let session_guard = self.session.lock();
        if let Some(video_player) = session_guard.as_ref().and_then(|s| s.video_player.as_ref()) {
            video_player.on_resize(width, height);
        }
    }

    /// Returns the source duration in milliseconds, 0 when nothing is open
    pub fn duration_ms(&self) -> i64 {
        self.duration_ms.load(Ordering::Acquire)
    }

    /// Returns the current playback position in milliseconds
    ///
    /// The master clock clamped into `[0, duration]`.
    pub fn current_play_time_ms(&self) -> i64 {
        let position = self.sync.master_clock_ms(Instant::now()).max(0);
        let duration = self.duration_ms();
        if duration > 0 {
            position.min(duration)
        } else {
            position
        }
    }

    /// Returns the current player state
    pub fn state(&self) -> PlayerState {
        self.state.state()
    }

    /// Returns container metadata, empty when nothing is open
    pub fn metadata(&self) -> MediaMetadata {
        self.session
            .lock()
            .as_ref()
            .map(|s| s.demuxer.lock().metadata())
            .unwrap_or_default()
    }

    /// Returns the zero-copy verdict of the video path
    ///
    /// `None` until hardware decoding produced its first frame (or forever
    /// on the software path).
    pub fn video_zero_copy(&self) -> Option<bool> {
        self.session
            .lock()
            .as_ref()
            .and_then(|s| s.video_decoder.as_ref())
            .and_then(|d| d.lock().zero_copy_enabled())
    }

    /// Returns whether hardware decoding is in effect
    ///
    /// `false` after a graceful downgrade to software, even when the
    /// hardware path was initially chosen.
    pub fn is_hardware_path(&self) -> bool {
        self.session
            .lock()
            .as_ref()
            .and_then(|s| s.video_decoder.as_ref())
            .map(|d| d.lock().is_hardware())
            .unwrap_or(false)
    }

    /// Returns the sync mode in force
    pub fn sync_mode(&self) -> SyncMode {
        self.sync.mode()
    }

    /// Returns the hardware device API chosen for this source, when the
    /// hardware path was selected at open
    pub fn hw_device_kind(&self) -> Option<HwDeviceKind> {
        self.session
            .lock()
            .as_ref()
            .and_then(|s| s.hw.as_ref())
            .map(|hw| hw.kind())
    }

    /// Sets the audio output gain, clamped into `[0.0, 1.0]`
    ///
    /// Persists across `open`; applied immediately when audio is playing.
    pub fn set_volume(&self, volume: f32) {
        let clamped = volume.clamp(0.0, 1.0);
        self.volume.store(clamped.to_bits(), Ordering::Release);
        if let Some(audio_player) = self.session.lock().as_ref().and_then(|s| s.audio_player.as_ref()) {
            audio_player.set_volume(clamped);
        }
    }

    /// Returns the audio output gain
    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Acquire))
    }

    /// Mutes or unmutes audio without touching the gain
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Release);
        if let Some(audio_player) = self.session.lock().as_ref().and_then(|s| s.audio_player.as_ref()) {
            audio_player.set_muted(muted);
        }
    }

    /// Returns whether audio is muted
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }

    /// Registers a state-change callback; fires on every transition
    pub fn register_state_change_callback<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(PlayerState, PlayerState) + Send + Sync + 'static,
    {
        self.state.register(callback)
    }

    /// Removes a state-change callback
    pub fn unregister_state_change_callback(&self, id: SubscriptionId) -> bool {
        self.state.unregister(id)
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.close();
    }
}
