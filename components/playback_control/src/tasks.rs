//! Worker thread bodies: demux, decode, and the sync monitor

use crate::controller::Inner;
use crossbeam_channel::{select, tick, Receiver};
use lumenplay_shared_types::{DecodedFrame, PlayerState};
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, trace, warn};

/// How long the demux loop idles once the source is exhausted
const EOS_IDLE: Duration = Duration::from_millis(50);

impl Inner {
    fn workers_should_exit(&self) -> bool {
        !self.running.load(Ordering::Acquire) || self.state.should_stop()
    }

    /// Drains the demuxer into the per-stream packet queues
    ///
    /// Blocks on queue `push` under backpressure, parks at the pause gate
    /// during pause and seek, and pushes one EOS sentinel per active
    /// consumer when the source ends. The loop stays alive after EOS so a
    /// backward seek can resume reading.
    pub(crate) fn demux_loop(&self) {
        debug!("demux task started");
        let (video_index, audio_index) = {
            let demuxer = self.demuxer.lock();
            (
                demuxer.video_stream().map(|s| s.index),
                demuxer.audio_stream().map(|s| s.index),
            )
        };
        let mut eos_sent = false;

        loop {
            if self.workers_should_exit() {
                break;
            }
            self.state.wait_for_resume();
            if self.workers_should_exit() {
                break;
            }

            let next = self.demuxer.lock().read_packet();
            match next {
                Ok(Some(packet)) => {
                    eos_sent = false;
                    let index = packet.stream_index;
                    let result = if Some(index) == video_index {
                        self.video_packets.push(Some(packet))
                    } else if Some(index) == audio_index {
                        self.audio_packets.push(Some(packet))
                    } else {
                        // The demuxer filters inactive streams already
                        Ok(())
                    };
                    if result.is_err() {
                        // Queue stopped mid-push; the packet is dropped here
                        break;
                    }
                }
                Ok(None) => {
                    if !eos_sent {
                        debug!("source exhausted; sending end-of-stream sentinels");
                        if video_index.is_some() {
                            let _ = self.video_packets.push(None);
                        }
                        if audio_index.is_some() {
                            let _ = self.audio_packets.push(None);
                        }
                        eos_sent = true;
                    }
                    // Stay alive: a seek may rewind the source
                    thread::sleep(EOS_IDLE);
                }
                Err(err) => {
                    error!(error = %err, "demuxer read failed");
                    let _ = self.state.transition_to(PlayerState::Error);
                    break;
                }
            }
        }
        debug!("demux task exited");
    }

    /// Pops video packets, decodes, and pushes frames with a bounded wait
    pub(crate) fn video_decode_loop(&self) {
        debug!("video decode task started");
        let Some(video) = self.video.as_ref() else {
            return;
        };
        let mut frames: Vec<DecodedFrame> = Vec::new();

        'outer: loop {
            if self.workers_should_exit() {
                break;
            }
            self.state.wait_for_resume();
            if self.workers_should_exit() {
                break;
            }

            let item = match self.video_packets.pop() {
                Some(item) => item,
                None => break, // queue stopped
            };

            let decoded = match item {
                Some(packet) => video.decoder.lock().decode(Some(&packet), &mut frames),
                // EOS sentinel: drain the codec's tail
                None => video.decoder.lock().flush(&mut frames),
            };
            if let Err(err) = decoded {
                warn!(error = %err, "video decode failed; packet skipped");
                frames.clear();
                continue;
            }

            for frame in frames.drain(..) {
                let DecodedFrame::Video(frame) = frame else {
                    warn!("audio frame on the video stream; dropped");
                    continue;
                };
                let mut pending = frame;
                // Bounded pushes keep this thread responsive to pause/stop
                // while the frame queue is full
                loop {
                    if self.workers_should_exit() {
                        break 'outer;
                    }
                    if self.state.should_pause() {
                        self.state.wait_for_resume();
                        continue;
                    }
                    match video
                        .player
                        .push_frame_blocking(pending, self.config.video_push_timeout)
                    {
                        Ok(()) => break,
                        Err(err) => {
                            if err.is_stopped() {
                                break 'outer;
                            }
                            // Timeout: re-check the gates and retry with
                            // the same frame
                            pending = err.into_inner();
                        }
                    }
                }
            }
        }
        debug!("video decode task exited");
    }

    /// Pops audio packets, decodes, resamples, and feeds the audio player
    pub(crate) fn audio_decode_loop(&self) {
        debug!("audio decode task started");
        let Some(audio) = self.audio.as_ref() else {
            return;
        };
        let mut frames: Vec<DecodedFrame> = Vec::new();
        // PTS estimate for frames that carry no timestamp; never feeds the
        // normalization baselines
        let mut next_pts_estimate: i64 = 0;

        loop {
            if self.workers_should_exit() {
                break;
            }
            self.state.wait_for_resume();
            if self.workers_should_exit() {
                break;
            }

            let item = match self.audio_packets.pop() {
                Some(item) => item,
                None => break,
            };

            let decoded = match item {
                Some(packet) => audio.decoder.lock().decode(Some(&packet), &mut frames),
                None => audio.decoder.lock().flush(&mut frames),
            };
            if let Err(err) = decoded {
                warn!(error = %err, "audio decode failed; packet skipped");
                frames.clear();
                continue;
            }

            for frame in frames.drain(..) {
                let DecodedFrame::Audio(frame) = frame else {
                    warn!("video frame on the audio stream; dropped");
                    continue;
                };

                let pts_ms = match frame.pts_ms() {
                    Some(raw) => self.sync.normalize_audio_pts(raw),
                    None => next_pts_estimate,
                };
                next_pts_estimate = pts_ms + frame.duration_ms();

                let resampled = audio.resampler.lock().resample(&frame, pts_ms);
                match resampled {
                    Ok(resampled) => {
                        if !audio.player.push_frame(resampled) {
                            debug!("audio frame queue stopped");
                            return;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "resample failed; frame dropped");
                    }
                }
            }
        }
        debug!("audio decode task exited");
    }

    /// Low-frequency observer of the clock set; reserved for drift alerts
    pub(crate) fn monitor_loop(&self, shutdown: Receiver<()>) {
        let ticker = tick(Duration::from_secs(1));
        loop {
            select! {
                recv(ticker) -> _ => {
                    if self.workers_should_exit() {
                        break;
                    }
                    let now = Instant::now();
                    trace!(
                        master_ms = self.sync.master_clock_ms(now),
                        mode = ?self.sync.mode(),
                        video_queue = self.video_packets.len(),
                        audio_queue = self.audio_packets.len(),
                        "sync monitor tick"
                    );
                }
                recv(shutdown) -> _ => break,
            }
        }
    }
}
