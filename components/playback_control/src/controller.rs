//! The playback controller

use crate::{PlaybackConfig, SeekRequest};
use crossbeam_channel::Sender;
use lumenplay_audio_output::{AudioPlayer, AudioResampler};
use lumenplay_av_sync::{SyncController, SyncMode};
use lumenplay_bounded_queue::BoundedQueue;
use lumenplay_decoders::{AudioDecoder, VideoDecoder};
use lumenplay_demux::Demuxer;
use lumenplay_shared_types::{Packet, PlayerError, PlayerResult, PlayerState};
use lumenplay_state_manager::StateManager;
use lumenplay_video_output::VideoPlayer;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// A packet queue slot: `None` is the end-of-stream sentinel
pub(crate) type PacketItem = Option<Packet>;

/// The video half of the pipeline
pub struct VideoPipeline {
    /// Decoder for the active video stream
    pub decoder: Arc<Mutex<VideoDecoder>>,
    /// The frame-pacing player
    pub player: Arc<VideoPlayer>,
}

/// The audio half of the pipeline
pub struct AudioPipeline {
    /// Decoder for the active audio stream
    pub decoder: Arc<Mutex<AudioDecoder>>,
    /// Format adapter between decoder and device
    pub resampler: Arc<Mutex<AudioResampler>>,
    /// The device-facing player
    pub player: Arc<AudioPlayer>,
}

pub(crate) struct Inner {
    pub(crate) state: Arc<StateManager>,
    pub(crate) sync: Arc<SyncController>,
    pub(crate) demuxer: Arc<Mutex<Demuxer>>,
    pub(crate) video: Option<VideoPipeline>,
    pub(crate) audio: Option<AudioPipeline>,
    pub(crate) video_packets: Arc<BoundedQueue<PacketItem>>,
    pub(crate) audio_packets: Arc<BoundedQueue<PacketItem>>,
    pub(crate) seek_queue: Arc<BoundedQueue<SeekRequest>>,
    pub(crate) seeking: AtomicBool,
    pub(crate) running: AtomicBool,
    pub(crate) last_restore: Mutex<PlayerState>,
    pub(crate) config: PlaybackConfig,
}

/// Owns the worker threads and the seek queue; implements
/// play/pause/stop/seek orchestration
///
/// The sync mode is chosen at construction from stream availability: any
/// audio stream makes the audio clock master, a video-only source runs
/// against the external clock.
pub struct PlaybackController {
    inner: Arc<Inner>,
    threads: Mutex<Vec<thread::JoinHandle<()>>>,
    monitor_shutdown: Mutex<Option<Sender<()>>>,
}

impl PlaybackController {
    /// Builds a controller over already-opened components
    pub fn new(
        state: Arc<StateManager>,
        sync: Arc<SyncController>,
        demuxer: Arc<Mutex<Demuxer>>,
        video: Option<VideoPipeline>,
        audio: Option<AudioPipeline>,
        config: PlaybackConfig,
    ) -> Self {
        let mode = if audio.is_some() {
            SyncMode::AudioMaster
        } else if video.is_some() {
            SyncMode::ExternalMaster
        } else {
            error!("source has neither audio nor video; playback will fail");
            SyncMode::ExternalMaster
        };
        sync.set_mode(mode);
        info!(mode = ?mode, "sync mode selected");

        let inner = Inner {
            state,
            sync,
            demuxer,
            video,
            audio,
            video_packets: Arc::new(BoundedQueue::new(config.packet_queue_capacity)),
            audio_packets: Arc::new(BoundedQueue::new(config.packet_queue_capacity)),
            seek_queue: Arc::new(BoundedQueue::new(config.seek_queue_capacity)),
            seeking: AtomicBool::new(false),
            running: AtomicBool::new(false),
            last_restore: Mutex::new(PlayerState::Playing),
            config,
        };
        Self {
            inner: Arc::new(inner),
            threads: Mutex::new(Vec::new()),
            monitor_shutdown: Mutex::new(None),
        }
    }

    /// Returns whether the worker threads are live
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Starts the pipeline: queues re-armed, players started, five worker
    /// threads spawned
    ///
    /// The caller transitions the state to `Playing` first so the workers
    /// run instead of exiting at their stop predicates.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::AlreadyRunning`] when already started, or the
    /// first player/thread start failure.
    pub fn start(&self) -> PlayerResult<()> {
        if self.inner.running.swap(true, Ordering::AcqRel) {
            return Err(PlayerError::AlreadyRunning(
                "playback controller already started".to_string(),
            ));
        }

        let inner = &self.inner;
        inner.video_packets.reset();
        inner.audio_packets.reset();
        inner.seek_queue.reset();
        inner.sync.start_playback(Instant::now());

        if let Some(audio) = inner.audio.as_ref() {
            audio.player.prepare();
            audio.player.start()?;
        }
        if let Some(video) = inner.video.as_ref() {
            video.player.start()?;
        }

        let mut threads = self.threads.lock();
        threads.push(self.spawn("demux", |inner| inner.demux_loop())?);
        if inner.video.is_some() {
            threads.push(self.spawn("video-decode", |inner| inner.video_decode_loop())?);
        }
        if inner.audio.is_some() {
            threads.push(self.spawn("audio-decode", |inner| inner.audio_decode_loop())?);
        }
        threads.push(self.spawn("seek", |inner| inner.seek_loop())?);

        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        *self.monitor_shutdown.lock() = Some(shutdown_tx);
        let monitor_inner = Arc::clone(&self.inner);
        threads.push(
            thread::Builder::new()
                .name("sync-monitor".to_string())
                .spawn(move || monitor_inner.monitor_loop(shutdown_rx))
                .map_err(|e| PlayerError::Io(e.to_string()))?,
        );

        info!("playback pipeline started");
        Ok(())
    }

    fn spawn<F>(&self, name: &str, body: F) -> PlayerResult<thread::JoinHandle<()>>
    where
        F: FnOnce(Arc<Inner>) + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(inner))
            .map_err(|e| PlayerError::Io(e.to_string()))
    }

    /// Pauses playback: players first, then the clock boundary
    pub fn pause(&self) {
        if let Some(audio) = self.inner.audio.as_ref() {
            audio.player.pause();
        }
        if let Some(video) = self.inner.video.as_ref() {
            video.player.pause();
        }
        self.inner.sync.pause(Instant::now());
        debug!("playback paused");
    }

    /// Resumes playback: clock anchors first, then the players
    pub fn resume(&self) {
        self.inner.sync.resume(Instant::now());
        if let Some(audio) = self.inner.audio.as_ref() {
            audio.player.resume();
        }
        if let Some(video) = self.inner.video.as_ref() {
            video.player.resume();
        }
        debug!("playback resumed");
    }

    /// Stops the pipeline: every queue stopped, every thread joined,
    /// residual packets released
    ///
    /// Safe to call repeatedly; the caller transitions the state to
    /// `Stopped` first so worker loops exit their gates.
    pub fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::AcqRel) {
            return;
        }

        // 1. Wake every blocked producer and consumer
        self.inner.video_packets.stop();
        self.inner.audio_packets.stop();
        self.inner.seek_queue.stop();
        if let Some(audio) = self.inner.audio.as_ref() {
            audio.player.stop();
        }
        if let Some(video) = self.inner.video.as_ref() {
            video.player.stop();
        }
        if let Some(shutdown) = self.monitor_shutdown.lock().take() {
            let _ = shutdown.send(());
        }

        // 2. Join the workers
        for handle in self.threads.lock().drain(..) {
            let _ = handle.join();
        }

        // 3. Release whatever packets the queues still hold
        let mut released = 0usize;
        self.inner.video_packets.clear(|_| released += 1);
        self.inner.audio_packets.clear(|_| released += 1);
        if released > 0 {
            debug!(released, "residual packets released");
        }
        self.inner.sync.reset();
        info!("playback pipeline stopped");
    }

    /// Queues an asynchronous seek; never blocks
    ///
    /// The request records the state to restore (`Playing` or `Paused`).
    /// Rapid seeks coalesce: the queue keeps only the newest target. Seeks
    /// are ignored unless playback is running.
    pub fn seek_async(&self, target_ms: i64, prefer_backward: bool) {
        let restore = match self.inner.state.state() {
            PlayerState::Playing => PlayerState::Playing,
            PlayerState::Paused => PlayerState::Paused,
            PlayerState::Seeking => *self.inner.last_restore.lock(),
            other => {
                warn!(state = other.name(), "seek ignored in this state");
                return;
            }
        };
        *self.inner.last_restore.lock() = restore;

        let request = SeekRequest {
            target_ms,
            prefer_backward,
            restore_state: restore,
        };
        self.inner.push_seek(request);
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Inner {
    /// Latest-wins enqueue: a full queue drops its oldest entries
    pub(crate) fn push_seek(&self, request: SeekRequest) {
        loop {
            match self.seek_queue.try_push(request) {
                Ok(()) => return,
                Err(err) if err.is_stopped() => return,
                Err(_) => {
                    // Full: discard the stalest pending request and retry
                    let _ = self.seek_queue.try_pop();
                }
            }
        }
    }
}
