//! Audio device driver abstraction

use crate::AudioSpec;
use lumenplay_shared_types::PlayerResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// The pull callback a driver invokes from its device thread
///
/// The player fills the provided buffer with packed PCM, zero-filling
/// whatever it cannot cover.
pub type DeviceCallback = Arc<dyn Fn(&mut [u8]) + Send + Sync>;

/// Contract of an audio output backend
///
/// `init` may adjust the requested format; the caller feeds the returned
/// spec back into the resampler so the device always receives bytes it
/// understands.
pub trait AudioDriver: Send {
    /// Opens the device and registers the pull callback
    fn init(&mut self, requested: &AudioSpec, callback: DeviceCallback) -> PlayerResult<AudioSpec>;

    /// Starts the device callback
    fn start(&mut self) -> PlayerResult<()>;

    /// Suspends the device callback without dropping buffered audio
    fn pause(&mut self);

    /// Resumes a paused device
    fn resume(&mut self);

    /// Stops the device and joins its thread
    fn stop(&mut self);

    /// Discards whatever sits in the hardware buffer
    fn flush(&mut self);

    /// Returns the driver name for logs
    fn name(&self) -> &str;
}

/// Period between simulated device callbacks
const NULL_DRIVER_PERIOD: Duration = Duration::from_millis(20);

/// A headless driver pacing the callback against wall time
///
/// Used when no audio hardware is wanted (tests, CI, video-only embeds).
/// Consumes audio at the negotiated rate so the pipeline drains exactly as
/// it would against a real device.
pub struct NullAudioDriver {
    spec: Option<AudioSpec>,
    callback: Option<DeviceCallback>,
    worker: Option<thread::JoinHandle<()>>,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl NullAudioDriver {
    /// Creates an uninitialized driver
    pub fn new() -> Self {
        Self {
            spec: None,
            callback: None,
            worker: None,
            running: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for NullAudioDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioDriver for NullAudioDriver {
    fn init(&mut self, requested: &AudioSpec, callback: DeviceCallback) -> PlayerResult<AudioSpec> {
        self.spec = Some(*requested);
        self.callback = Some(callback);
        debug!(rate = requested.sample_rate, channels = requested.channels, "null audio driver ready");
        Ok(*requested)
    }

    fn start(&mut self) -> PlayerResult<()> {
        if self.worker.is_some() {
            return Ok(());
        }
        let (Some(spec), Some(callback)) = (self.spec, self.callback.clone()) else {
            return Err(lumenplay_shared_types::PlayerError::NotInitialized(
                "audio driver not initialized".to_string(),
            ));
        };

        self.running.store(true, Ordering::Release);
        self.paused.store(false, Ordering::Release);
        let running = Arc::clone(&self.running);
        let paused = Arc::clone(&self.paused);
        let bytes_per_period = (spec.sample_rate as usize * NULL_DRIVER_PERIOD.as_millis() as usize
            / 1_000)
            * spec.bytes_per_frame();

        let worker = thread::Builder::new()
            .name("audio-device".to_string())
            .spawn(move || {
                let mut buffer = vec![0u8; bytes_per_period];
                while running.load(Ordering::Acquire) {
                    if !paused.load(Ordering::Acquire) {
                        callback(&mut buffer);
                    }
                    thread::sleep(NULL_DRIVER_PERIOD);
                }
            })
            .map_err(|e| lumenplay_shared_types::PlayerError::Io(e.to_string()))?;
        self.worker = Some(worker);
        Ok(())
    }

    fn pause(&mut self) {
        self.paused.store(true, Ordering::Release);
    }

    fn resume(&mut self) {
        self.paused.store(false, Ordering::Release);
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    fn flush(&mut self) {
        // No hardware buffer to discard
    }

    fn name(&self) -> &str {
        "null"
    }
}

impl Drop for NullAudioDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
