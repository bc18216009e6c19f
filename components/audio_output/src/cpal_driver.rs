//! `cpal`-backed audio driver
//!
//! The cpal stream object is not `Send` on every platform, so the stream
//! lives on a dedicated thread and the driver talks to it over a command
//! channel.

use crate::{AudioDriver, AudioSpec, DeviceCallback};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use lumenplay_shared_types::{PlayerError, PlayerResult, SampleFormat};
use std::sync::mpsc;
use std::thread;
use tracing::{info, warn};

enum Command {
    Play,
    Pause,
    Shutdown,
}

/// Audio output through the default cpal host device
pub struct CpalAudioDriver {
    commands: Option<mpsc::Sender<Command>>,
    worker: Option<thread::JoinHandle<()>>,
    spec: Option<AudioSpec>,
}

impl CpalAudioDriver {
    /// Creates an uninitialized driver
    pub fn new() -> Self {
        Self {
            commands: None,
            worker: None,
            spec: None,
        }
    }

    fn send(&self, command: Command) {
        if let Some(commands) = self.commands.as_ref() {
            let _ = commands.send(command);
        }
    }
}

impl Default for CpalAudioDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioDriver for CpalAudioDriver {
    fn init(&mut self, requested: &AudioSpec, callback: DeviceCallback) -> PlayerResult<AudioSpec> {
        // The device consumes f32 regardless of the request; report the
        // adjusted format back so the resampler produces matching bytes
        let actual = AudioSpec {
            sample_rate: requested.sample_rate,
            channels: requested.channels,
            format: SampleFormat::F32,
        };

        let (command_tx, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let stream_spec = actual;

        let worker = thread::Builder::new()
            .name("cpal-audio".to_string())
            .spawn(move || {
                run_stream(stream_spec, callback, command_rx, ready_tx);
            })
            .map_err(|e| PlayerError::Io(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let _ = worker.join();
                return Err(err);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(PlayerError::NotSupported(
                    "cpal stream thread exited before ready".to_string(),
                ));
            }
        }

        self.commands = Some(command_tx);
        self.worker = Some(worker);
        self.spec = Some(actual);
        info!(rate = actual.sample_rate, channels = actual.channels, "cpal stream ready");
        Ok(actual)
    }

    fn start(&mut self) -> PlayerResult<()> {
        if self.commands.is_none() {
            return Err(PlayerError::NotInitialized(
                "cpal driver not initialized".to_string(),
            ));
        }
        self.send(Command::Play);
        Ok(())
    }

    fn pause(&mut self) {
        self.send(Command::Pause);
    }

    fn resume(&mut self) {
        self.send(Command::Play);
    }

    fn stop(&mut self) {
        self.send(Command::Shutdown);
        self.commands = None;
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    fn flush(&mut self) {
        // cpal exposes no buffer drain; the short device buffer empties on
        // its own within one period
    }

    fn name(&self) -> &str {
        "cpal"
    }
}

impl Drop for CpalAudioDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_stream(
    spec: AudioSpec,
    callback: DeviceCallback,
    commands: mpsc::Receiver<Command>,
    ready: mpsc::Sender<PlayerResult<()>>,
) {
    let host = cpal::default_host();
    let device = match host.default_output_device() {
        Some(device) => device,
        None => {
            let _ = ready.send(Err(PlayerError::NotSupported(
                "no default audio output device".to_string(),
            )));
            return;
        }
    };

    let config = cpal::StreamConfig {
        channels: spec.channels,
        sample_rate: cpal::SampleRate(spec.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    // Scratch byte buffer re-encoded into the device's f32 slice
    let mut scratch: Vec<u8> = Vec::new();
    let stream = device.build_output_stream(
        &config,
        move |out: &mut [f32], _| {
            let needed = out.len() * 4;
            if scratch.len() < needed {
                scratch.resize(needed, 0);
            }
            callback(&mut scratch[..needed]);
            for (sample, bytes) in out.iter_mut().zip(scratch.chunks_exact(4)) {
                *sample = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            }
        },
        |err| warn!(error = %err, "cpal stream error"),
        None,
    );

    let stream = match stream {
        Ok(stream) => stream,
        Err(err) => {
            let _ = ready.send(Err(PlayerError::NotSupported(err.to_string())));
            return;
        }
    };
    let _ = stream.pause();
    let _ = ready.send(Ok(()));

    while let Ok(command) = commands.recv() {
        match command {
            Command::Play => {
                if let Err(err) = stream.play() {
                    warn!(error = %err, "cpal play failed");
                }
            }
            Command::Pause => {
                if let Err(err) = stream.pause() {
                    warn!(error = %err, "cpal pause failed");
                }
            }
            Command::Shutdown => break,
        }
    }
}
