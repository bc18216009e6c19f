//! The paced video render loop

use lumenplay_av_sync::SyncController;
use lumenplay_bounded_queue::{BoundedQueue, PushError};
use lumenplay_shared_types::{
    PlayerError, PlayerResult, Renderer, SharedHwDevice, VideoFrame, WindowHandle,
};
use lumenplay_state_manager::StateManager;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default capacity of the decoded-frame queue
pub(crate) const DEFAULT_FRAME_QUEUE_CAPACITY: usize = 30;

struct Shared {
    queue: Arc<BoundedQueue<VideoFrame>>,
    renderer: Mutex<Option<Box<dyn Renderer>>>,
    sync: Arc<SyncController>,
    state: Arc<StateManager>,
    stop_flag: AtomicBool,
    paused: AtomicBool,
    // Bumped by reset_timestamps; the loop discards a held repeat frame
    // whose generation is stale
    generation: AtomicU64,
    frames_dropped: AtomicU64,
    frames_repeated: AtomicU64,
}

/// Receives decoded video frames and presents them against the master clock
///
/// The render loop runs on its own thread: pop, normalize PTS, consult the
/// sync predicates, drop or sleep, present, update the video clock. An early
/// frame scheduled for repeat stays owned by the loop; the renderer only
/// ever borrows frames, so hardware surface claims are never duplicated.
pub struct VideoPlayer {
    shared: Arc<Shared>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl VideoPlayer {
    /// Creates a player with the default queue capacity
    pub fn new(sync: Arc<SyncController>, state: Arc<StateManager>) -> Self {
        Self::with_capacity(sync, state, DEFAULT_FRAME_QUEUE_CAPACITY)
    }

    /// Creates a player with an explicit frame-queue capacity
    pub fn with_capacity(
        sync: Arc<SyncController>,
        state: Arc<StateManager>,
        capacity: usize,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Arc::new(BoundedQueue::new(capacity)),
                renderer: Mutex::new(None),
                sync,
                state,
                stop_flag: AtomicBool::new(false),
                paused: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                frames_dropped: AtomicU64::new(0),
                frames_repeated: AtomicU64::new(0),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Installs the renderer frames will be presented through
    pub fn set_renderer(&self, renderer: Box<dyn Renderer>) {
        info!(name = renderer.name(), "renderer installed");
        *self.shared.renderer.lock() = Some(renderer);
    }

    /// Initializes the installed renderer against a window
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::NotInitialized`] when no renderer is
    /// installed, otherwise the renderer's own failure.
    pub fn init_renderer(
        &self,
        window: WindowHandle,
        width: u32,
        height: u32,
    ) -> PlayerResult<()> {
        match self.shared.renderer.lock().as_mut() {
            Some(renderer) => renderer.init(window, width, height),
            None => Err(PlayerError::NotInitialized(
                "no renderer installed".to_string(),
            )),
        }
    }

    /// Forwards a window resize to the renderer
    pub fn on_resize(&self, width: u32, height: u32) {
        if let Some(renderer) = self.shared.renderer.lock().as_mut() {
            renderer.on_resize(width, height);
        }
    }

    /// Returns the GPU device the renderer created, when it created one
    pub fn renderer_device(&self) -> Option<SharedHwDevice> {
        self.shared
            .renderer
            .lock()
            .as_ref()
            .and_then(|r| r.shared_device())
    }

    /// Starts the render thread
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::AlreadyRunning`] when the thread is live.
    pub fn start(&self) -> PlayerResult<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Err(PlayerError::AlreadyRunning(
                "video render thread already running".to_string(),
            ));
        }
        self.shared.stop_flag.store(false, Ordering::Release);
        self.shared.queue.reset();

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("video-render".to_string())
            .spawn(move || render_loop(shared))
            .map_err(|e| PlayerError::Io(e.to_string()))?;
        *worker = Some(handle);
        Ok(())
    }

    /// Stops the render thread, the queue, and joins
    pub fn stop(&self) {
        self.shared.stop_flag.store(true, Ordering::Release);
        self.shared.queue.stop();
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
    }

    /// Holds frame presentation; the loop stops producing clock updates
    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::Release);
    }

    /// Releases a pause
    pub fn resume(&self) {
        self.shared.paused.store(false, Ordering::Release);
    }

    /// Enqueues a frame with a bounded wait
    ///
    /// Fails on timeout or once the queue is stopped, handing the frame
    /// back so the decode thread can re-check pause/stop and retry. The
    /// timeout is what keeps that thread responsive while the queue sits
    /// full.
    pub fn push_frame_blocking(
        &self,
        frame: VideoFrame,
        timeout: Duration,
    ) -> Result<(), PushError<VideoFrame>> {
        self.shared.queue.push_with_timeout(frame, timeout)
    }

    /// Drains every queued frame
    pub fn clear_frames(&self) {
        self.shared.queue.clear(drop);
    }

    /// Invalidates cached renderer surface views; seek protocol hook
    pub fn clear_renderer_caches(&self) {
        if let Some(renderer) = self.shared.renderer.lock().as_mut() {
            renderer.clear_caches();
        }
    }

    /// Discards repeat state from before a seek
    pub fn reset_timestamps(&self) {
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Returns how many frames the loop dropped as late
    pub fn frames_dropped(&self) -> u64 {
        self.shared.frames_dropped.load(Ordering::Acquire)
    }

    /// Returns how many repeat presentations occurred
    pub fn frames_repeated(&self) -> u64 {
        self.shared.frames_repeated.load(Ordering::Acquire)
    }

    /// Returns the number of frames waiting in the queue
    pub fn queued_frames(&self) -> usize {
        self.shared.queue.len()
    }

    /// Releases the renderer, running its cleanup
    pub fn release_renderer(&self) {
        if let Some(mut renderer) = self.shared.renderer.lock().take() {
            renderer.cleanup();
        }
    }
}

fn render_loop(shared: Arc<Shared>) {
    debug!("video render loop started");
    // A frame kept alive for repeat display, with its normalized PTS and
    // the generation it belongs to
    let mut held: Option<(VideoFrame, Option<i64>, u64)> = None;

    loop {
        if shared.stop_flag.load(Ordering::Acquire) || shared.state.should_stop() {
            break;
        }
        if shared.state.should_pause() {
            shared.state.wait_for_resume();
            continue;
        }
        if shared.paused.load(Ordering::Acquire) {
            // Player-level pause outside a state transition window
            thread::sleep(Duration::from_millis(2));
            continue;
        }

        let generation = shared.generation.load(Ordering::Acquire);
        let (frame, pts) = match held.take() {
            Some((frame, pts, held_generation)) if held_generation == generation => (frame, pts),
            Some(_) => continue, // stale repeat frame from before a seek
            None => match shared.queue.pop() {
                Some(frame) => {
                    let pts = frame
                        .pts_ms()
                        .map(|raw| shared.sync.normalize_video_pts(raw));
                    (frame, pts)
                }
                None => {
                    // Queue stopped; yield and let the loop re-check the
                    // stop predicates
                    thread::sleep(Duration::from_millis(1));
                    continue;
                }
            },
        };

        // Frames without a usable PTS are presented immediately and never
        // touch the clocks
        if let Some(pts) = pts {
            let now = Instant::now();
            if shared.sync.should_drop(pts, now) {
                shared.frames_dropped.fetch_add(1, Ordering::AcqRel);
                debug!(pts_ms = pts, "dropping late frame");
                continue;
            }

            let delay = shared.sync.delay_ms(pts, now);
            if delay > 0 {
                shared
                    .state
                    .interruptible_sleep(Duration::from_millis(delay as u64));
                if shared.stop_flag.load(Ordering::Acquire) || shared.state.should_stop() {
                    break;
                }
                if shared.state.should_pause() || shared.paused.load(Ordering::Acquire) {
                    held = Some((frame, Some(pts), generation));
                    continue;
                }
            }
        }

        let rendered = match shared.renderer.lock().as_mut() {
            Some(renderer) => renderer.render_frame(&frame),
            // Headless: treat the frame as presented
            None => Ok(()),
        };

        match rendered {
            Ok(()) => {
                if let Some(pts) = pts {
                    shared.sync.update_video_clock(pts, Instant::now());
                    if shared.sync.should_repeat(pts, Instant::now()) {
                        shared.frames_repeated.fetch_add(1, Ordering::AcqRel);
                        held = Some((frame, Some(pts), generation));
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "render failed; frame skipped");
            }
        }
    }
    debug!("video render loop exited");
}
