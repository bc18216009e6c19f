//! The serialized seek worker

use crate::controller::Inner;
use crate::SeekRequest;
use lumenplay_shared_types::PlayerState;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info};

impl Inner {
    /// Pops seek requests one at a time, coalescing bursts to the newest
    pub(crate) fn seek_loop(&self) {
        debug!("seek task started");
        while let Some(request) = self.seek_queue.pop() {
            let mut latest = request;
            // Latest-wins: rapid seeks collapse into the newest target
            while let Some(newer) = self.seek_queue.try_pop() {
                latest = newer;
            }

            // Only one seek may execute at any instant
            if self.seeking.swap(true, Ordering::AcqRel) {
                continue;
            }
            self.execute_seek(latest);
            self.seeking.store(false, Ordering::Release);
        }
        debug!("seek task exited");
    }

    /// One full seek: flush the pipeline, reposition, restore state
    fn execute_seek(&self, request: SeekRequest) {
        info!(
            target_ms = request.target_ms,
            backward = request.prefer_backward,
            restore = request.restore_state.name(),
            "seek started"
        );

        // The Seeking transient is never skipped; subscribers observe it
        if self.state.transition_to(PlayerState::Seeking).is_err() {
            return;
        }

        // Pause both players so no clock updates race the reset below
        if let Some(audio) = self.audio.as_ref() {
            audio.player.pause();
        }
        if let Some(video) = self.video.as_ref() {
            video.player.pause();
        }

        // Let the decode threads observe the pause before queues drain
        thread::sleep(self.config.seek_settle_delay);

        // Drop every queued packet and frame; invalidate cached surface
        // views before the framework reallocates surfaces
        let mut released = 0usize;
        self.video_packets.clear(|_| released += 1);
        self.audio_packets.clear(|_| released += 1);
        debug!(released, "packet queues cleared");
        if let Some(video) = self.video.as_ref() {
            video.player.clear_frames();
            video.player.clear_renderer_caches();
        }
        if let Some(audio) = self.audio.as_ref() {
            audio.player.clear_frames();
        }

        // Reposition the source
        let seek_result = self
            .demuxer
            .lock()
            .seek(request.target_ms * 1_000, request.prefer_backward);
        if let Err(err) = seek_result {
            error!(error = %err, "demuxer seek failed");
            let _ = self.state.transition_to(PlayerState::Error);
            return;
        }

        // Discard buffered decoder state
        if let Some(video) = self.video.as_ref() {
            video.decoder.lock().flush_buffers();
        }
        if let Some(audio) = self.audio.as_ref() {
            audio.decoder.lock().flush_buffers();
            audio.resampler.lock().reset();
        }

        // Clocks jump to the target; players forget stale bookkeeping
        self.sync.reset_for_seek(request.target_ms, Instant::now());
        if let Some(video) = self.video.as_ref() {
            video.player.reset_timestamps();
        }
        if let Some(audio) = self.audio.as_ref() {
            audio.player.reset_timestamps();
            // Empty the hardware buffer so post-seek audio plays at once
            audio.player.flush();
        }

        // Restore the pre-seek state
        let restored = match request.restore_state {
            PlayerState::Playing => {
                // Transition first so blocked producers wake, then resume
                let result = self.state.transition_to(PlayerState::Playing);
                if result.is_ok() {
                    if let Some(audio) = self.audio.as_ref() {
                        audio.player.resume();
                    }
                    if let Some(video) = self.video.as_ref() {
                        video.player.resume();
                    }
                }
                result
            }
            PlayerState::Paused => self.state.transition_to(PlayerState::Paused),
            _ => self.state.transition_to(PlayerState::Stopped),
        };
        if let Err(err) = restored {
            if self.state.should_stop() {
                // A stop raced the seek; the stop wins
                debug!("seek restore superseded by stop");
                return;
            }
            error!(error = %err, "state restore after seek failed");
            let _ = self.state.transition_to(PlayerState::Error);
            return;
        }

        info!(target_ms = request.target_ms, "seek completed");
    }
}
