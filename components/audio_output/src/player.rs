//! Audio playback over the frame queue and device callback

use crate::{AudioDriver, AudioSpec, DeviceCallback};
use lumenplay_av_sync::SyncController;
use lumenplay_bounded_queue::BoundedQueue;
use lumenplay_shared_types::{PlayerResult, ResampledAudioFrame};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Minimum audio delivered between two audio-clock updates
const CLOCK_UPDATE_INTERVAL_MS: i64 = 500;

/// Default capacity of the resampled-frame queue
pub(crate) const DEFAULT_FRAME_QUEUE_CAPACITY: usize = 64;

struct FillState {
    // The frame currently being consumed and the byte offset into it
    pending: Option<(ResampledAudioFrame, usize)>,
    // Milliseconds delivered since the last clock update
    delivered_ms: i64,
    // Normalized PTS of the last byte handed to the device
    last_pts_ms: Option<i64>,
}

/// Enqueues packed PCM and feeds the device callback
///
/// The device callback contract: pop frames, copy the requested bytes, emit
/// silence for whatever is missing, and update the audio master clock once
/// per [`CLOCK_UPDATE_INTERVAL_MS`] of delivered audio. The callback never
/// allocates in the steady state and never blocks beyond the queue's lock.
///
/// Frame PTS values entering [`AudioPlayer::push_frame`] are already
/// normalized by the decode stage, so the callback feeds them to the clock
/// as-is.
pub struct AudioPlayer {
    queue: Arc<BoundedQueue<ResampledAudioFrame>>,
    driver: Mutex<Box<dyn AudioDriver>>,
    sync: Arc<SyncController>,
    fill: Arc<Mutex<FillState>>,
    spec: Mutex<Option<AudioSpec>>,
    // Gain applied inside the device callback; f32 bits
    volume: Arc<AtomicU32>,
    muted: Arc<AtomicBool>,
}

impl AudioPlayer {
    /// Creates a player over `driver` with the default queue capacity
    pub fn new(driver: Box<dyn AudioDriver>, sync: Arc<SyncController>) -> Self {
        Self::with_capacity(driver, sync, DEFAULT_FRAME_QUEUE_CAPACITY)
    }

    /// Creates a player with an explicit frame-queue capacity
    pub fn with_capacity(
        driver: Box<dyn AudioDriver>,
        sync: Arc<SyncController>,
        capacity: usize,
    ) -> Self {
        Self {
            queue: Arc::new(BoundedQueue::new(capacity)),
            driver: Mutex::new(driver),
            sync,
            fill: Arc::new(Mutex::new(FillState {
                pending: None,
                delivered_ms: 0,
                last_pts_ms: None,
            })),
            spec: Mutex::new(None),
            volume: Arc::new(AtomicU32::new(1.0f32.to_bits())),
            muted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Opens the device and registers the fill callback
    ///
    /// Returns the format the device actually negotiated; the caller feeds
    /// it back into the resampler.
    pub fn init(&self, requested: AudioSpec) -> PlayerResult<AudioSpec> {
        let queue = Arc::clone(&self.queue);
        let sync = Arc::clone(&self.sync);
        let fill = Arc::clone(&self.fill);
        let volume = Arc::clone(&self.volume);
        let muted = Arc::clone(&self.muted);
        let spec_slot = Arc::new(Mutex::new(requested));
        let spec_for_callback = Arc::clone(&spec_slot);

        let callback: DeviceCallback = Arc::new(move |buffer: &mut [u8]| {
            let spec = *spec_for_callback.lock();
            fill_buffer(&queue, &sync, &fill, &spec, buffer);
            let gain = if muted.load(Ordering::Acquire) {
                0.0
            } else {
                f32::from_bits(volume.load(Ordering::Acquire))
            };
            if gain != 1.0 {
                apply_gain(buffer, spec.format, gain);
            }
        });

        let actual = self.driver.lock().init(&requested, callback)?;
        *spec_slot.lock() = actual;
        *self.spec.lock() = Some(actual);
        info!(
            rate = actual.sample_rate,
            channels = actual.channels,
            driver = self.driver.lock().name(),
            "audio device initialized"
        );
        Ok(actual)
    }

    /// Returns the negotiated device format, once initialized
    pub fn spec(&self) -> Option<AudioSpec> {
        *self.spec.lock()
    }

    /// Starts the device stream
    pub fn start(&self) -> PlayerResult<()> {
        self.driver.lock().start()
    }

    /// Pauses the device stream; no clock updates are produced while paused
    pub fn pause(&self) {
        self.driver.lock().pause();
    }

    /// Resumes a paused device stream
    pub fn resume(&self) {
        self.driver.lock().resume();
    }

    /// Stops the device and the frame queue, waking blocked producers
    pub fn stop(&self) {
        self.queue.stop();
        self.driver.lock().stop();
    }

    /// Re-arms the frame queue for a fresh start
    pub fn prepare(&self) {
        self.queue.reset();
    }

    /// Empties the hardware buffer so new audio plays immediately
    pub fn flush(&self) {
        self.driver.lock().flush();
        let mut fill = self.fill.lock();
        fill.pending = None;
    }

    /// Drains every queued frame
    pub fn clear_frames(&self) {
        self.queue.clear(drop);
        let mut fill = self.fill.lock();
        fill.pending = None;
    }

    /// Forgets delivery bookkeeping; used by the seek protocol
    pub fn reset_timestamps(&self) {
        let mut fill = self.fill.lock();
        fill.pending = None;
        fill.delivered_ms = 0;
        fill.last_pts_ms = None;
    }

    /// Enqueues a resampled frame, blocking under backpressure
    ///
    /// Returns `false` once the queue is stopped; the frame is dropped.
    pub fn push_frame(&self, frame: ResampledAudioFrame) -> bool {
        self.queue.push(frame).is_ok()
    }

    /// Returns the number of queued frames
    pub fn queued_frames(&self) -> usize {
        self.queue.len()
    }

    /// Sets the output gain, clamped into `[0.0, 1.0]`
    pub fn set_volume(&self, volume: f32) {
        let clamped = volume.clamp(0.0, 1.0);
        self.volume.store(clamped.to_bits(), Ordering::Release);
    }

    /// Returns the output gain
    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Acquire))
    }

    /// Mutes or unmutes the output without touching the gain
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Release);
    }

    /// Returns whether the output is muted
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }
}

/// Scales packed PCM in place according to its sample format
fn apply_gain(buffer: &mut [u8], format: lumenplay_shared_types::SampleFormat, gain: f32) {
    use lumenplay_shared_types::SampleFormat;
    match format.packed() {
        SampleFormat::S16 => {
            for chunk in buffer.chunks_exact_mut(2) {
                let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
                let scaled = (sample as f32 * gain) as i16;
                chunk.copy_from_slice(&scaled.to_le_bytes());
            }
        }
        SampleFormat::S32 => {
            for chunk in buffer.chunks_exact_mut(4) {
                let sample = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                let scaled = (sample as f64 * gain as f64) as i32;
                chunk.copy_from_slice(&scaled.to_le_bytes());
            }
        }
        SampleFormat::F32 => {
            for chunk in buffer.chunks_exact_mut(4) {
                let sample = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                chunk.copy_from_slice(&(sample * gain).to_le_bytes());
            }
        }
        SampleFormat::F64 => {
            for chunk in buffer.chunks_exact_mut(8) {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(chunk);
                let sample = f64::from_le_bytes(bytes);
                chunk.copy_from_slice(&(sample * gain as f64).to_le_bytes());
            }
        }
        _ => {}
    }
}

/// The device callback body
fn fill_buffer(
    queue: &BoundedQueue<ResampledAudioFrame>,
    sync: &SyncController,
    fill: &Mutex<FillState>,
    spec: &AudioSpec,
    buffer: &mut [u8],
) {
    let mut state = fill.lock();
    let mut written = 0usize;

    while written < buffer.len() {
        let (frame, offset) = match state.pending.take() {
            Some(pending) => pending,
            None => match queue.try_pop() {
                // Never block the device thread on an empty queue
                Some(frame) => (frame, 0),
                None => break,
            },
        };

        let available = frame.data.len() - offset;
        let wanted = buffer.len() - written;
        let take = available.min(wanted);
        buffer[written..written + take].copy_from_slice(&frame.data[offset..offset + take]);
        written += take;

        let consumed = offset + take;
        let bytes_per_frame = frame.bytes_per_sample * frame.channels as usize;
        if bytes_per_frame > 0 && frame.sample_rate > 0 {
            let consumed_samples = (consumed / bytes_per_frame) as i64;
            state.last_pts_ms =
                Some(frame.pts_ms + consumed_samples * 1_000 / frame.sample_rate as i64);
        }

        if consumed < frame.data.len() {
            state.pending = Some((frame, consumed));
        }
    }

    // Partial availability: the remainder is silence
    let underrun = written < buffer.len();
    if underrun {
        for byte in &mut buffer[written..] {
            *byte = 0;
        }
    }

    if spec.bytes_per_frame() > 0 && spec.sample_rate > 0 {
        state.delivered_ms +=
            (written / spec.bytes_per_frame()) as i64 * 1_000 / spec.sample_rate as i64;
    }
    // An underrun flushes the cadence: the stream tail may be shorter than
    // the update interval and the clock must still reach it
    if state.delivered_ms >= CLOCK_UPDATE_INTERVAL_MS
        || (underrun && state.delivered_ms > 0)
    {
        if let Some(pts) = state.last_pts_ms {
            sync.update_audio_clock(pts, Instant::now());
            debug!(pts_ms = pts, "audio clock updated");
        }
        state.delivered_ms = 0;
    }
}
