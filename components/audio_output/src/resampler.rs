//! Lazy audio format adaptation

use lumenplay_shared_types::{
    AudioFrame, PlayerError, PlayerResult, ResampledAudioFrame, SampleFormat,
};
use tracing::{debug, warn};

/// The packed PCM format the audio device consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSpec {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u16,
    /// Packed sample format
    pub format: SampleFormat,
}

impl AudioSpec {
    /// Returns the bytes one sample occupies
    pub fn bytes_per_sample(&self) -> usize {
        self.format.bytes_per_sample()
    }

    /// Returns the bytes one interleaved frame (all channels) occupies
    pub fn bytes_per_frame(&self) -> usize {
        self.bytes_per_sample() * self.channels as usize
    }
}

impl Default for AudioSpec {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
            format: SampleFormat::F32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SourceSpec {
    sample_rate: u32,
    channels: u16,
    format: SampleFormat,
}

/// Streaming converter state; created lazily on the first mismatched frame
struct Converter {
    // Interleaved f32 staging, grown on demand and never shrunk
    staging: Vec<f32>,
    resampled: Vec<f32>,
    // Fractional read position carried across frames
    phase: f64,
}

/// Converts decoded audio frames to the device's packed PCM
///
/// The target is fixed at construction. The source layout is captured from
/// the first frame; when it matches the target exactly the packed bytes are
/// copied straight through with no converter state at all.
///
/// # Examples
///
/// ```
/// use lumenplay_audio_output::{AudioResampler, AudioSpec};
/// use lumenplay_shared_types::SampleFormat;
///
/// let spec = AudioSpec {
///     sample_rate: 48_000,
///     channels: 2,
///     format: SampleFormat::S16,
/// };
/// let resampler = AudioResampler::new(spec);
/// assert_eq!(resampler.target().bytes_per_frame(), 4);
/// ```
pub struct AudioResampler {
    target: AudioSpec,
    source: Option<SourceSpec>,
    converter: Option<Converter>,
}

impl AudioResampler {
    /// Creates a resampler for the given device format
    pub fn new(target: AudioSpec) -> Self {
        Self {
            target,
            source: None,
            converter: None,
        }
    }

    /// Returns the target format
    pub fn target(&self) -> AudioSpec {
        self.target
    }

    /// Converts one decoded frame into packed PCM
    ///
    /// `pts_ms` is the caller-derived presentation timestamp carried through
    /// to the emitted frame.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::InvalidParameter`] for frames with missing
    /// planes or impossible layouts; the caller discards the frame and
    /// logs.
    pub fn resample(
        &mut self,
        frame: &AudioFrame,
        pts_ms: i64,
    ) -> PlayerResult<ResampledAudioFrame> {
        let channels = frame.channel_layout.channels();
        if frame.sample_rate == 0 || channels == 0 {
            return Err(PlayerError::InvalidParameter(
                "audio frame without rate or channels".to_string(),
            ));
        }
        let expected_planes = if frame.format.is_planar() {
            channels as usize
        } else {
            1
        };
        if frame.planes.len() < expected_planes {
            return Err(PlayerError::InvalidParameter(format!(
                "audio frame carries {} planes, expected {}",
                frame.planes.len(),
                expected_planes
            )));
        }

        let source = SourceSpec {
            sample_rate: frame.sample_rate,
            channels,
            format: frame.format,
        };
        match self.source {
            None => {
                debug!(
                    rate = source.sample_rate,
                    channels = source.channels,
                    format = ?source.format,
                    "audio source format captured"
                );
                self.source = Some(source);
            }
            Some(captured) if captured != source => {
                // Mid-stream format change: recapture and rebuild lazily
                warn!("audio source format changed mid-stream");
                self.source = Some(source);
                self.converter = None;
            }
            Some(_) => {}
        }

        if self.matches_target(&source) {
            return Ok(self.passthrough(frame, pts_ms));
        }
        self.convert(frame, source, pts_ms)
    }

    /// Clears captured source state and converter phase
    pub fn reset(&mut self) {
        if let Some(converter) = self.converter.as_mut() {
            converter.phase = 0.0;
        }
    }

    fn matches_target(&self, source: &SourceSpec) -> bool {
        source.sample_rate == self.target.sample_rate
            && source.channels == self.target.channels
            && source.format == self.target.format
    }

    /// Zero-copy path: the packed bytes go straight through
    fn passthrough(&self, frame: &AudioFrame, pts_ms: i64) -> ResampledAudioFrame {
        ResampledAudioFrame {
            data: frame.planes[0].to_vec(),
            nb_samples: frame.nb_samples,
            sample_rate: self.target.sample_rate,
            channels: self.target.channels,
            bytes_per_sample: self.target.bytes_per_sample(),
            pts_ms,
        }
    }

    fn convert(
        &mut self,
        frame: &AudioFrame,
        source: SourceSpec,
        pts_ms: i64,
    ) -> PlayerResult<ResampledAudioFrame> {
        let converter = self.converter.get_or_insert_with(|| {
            debug!(
                from_rate = source.sample_rate,
                to_rate = self.target.sample_rate,
                "initializing resampler context"
            );
            Converter {
                staging: Vec::new(),
                resampled: Vec::new(),
                phase: 0.0,
            }
        });

        // 1. Decode to interleaved f32 at the target channel count
        let in_samples = frame.nb_samples;
        let target_channels = self.target.channels as usize;
        let needed = in_samples * target_channels;
        if converter.staging.len() < needed {
            converter.staging.resize(needed, 0.0);
        }
        decode_interleaved(
            frame,
            source,
            target_channels,
            &mut converter.staging[..needed],
        )?;

        // 2. Rate-convert with linear interpolation
        let samples: &[f32];
        let out_samples;
        if source.sample_rate == self.target.sample_rate {
            samples = &converter.staging[..needed];
            out_samples = in_samples;
        } else {
            let ratio = source.sample_rate as f64 / self.target.sample_rate as f64;
            let mut produced = 0usize;
            let capacity_hint =
                (in_samples as f64 / ratio).ceil() as usize * target_channels + target_channels;
            if converter.resampled.len() < capacity_hint {
                converter.resampled.resize(capacity_hint, 0.0);
            }
            let mut pos = converter.phase;
            while (pos as usize) < in_samples {
                let base = pos as usize;
                let frac = (pos - base as f64) as f32;
                let next = (base + 1).min(in_samples - 1);
                for ch in 0..target_channels {
                    let a = converter.staging[base * target_channels + ch];
                    let b = converter.staging[next * target_channels + ch];
                    converter.resampled[produced * target_channels + ch] = a + (b - a) * frac;
                }
                produced += 1;
                pos += ratio;
            }
            converter.phase = pos - in_samples as f64;
            samples = &converter.resampled[..produced * target_channels];
            out_samples = produced;
        }

        // 3. Encode to the target packed format
        let data = encode_packed(samples, self.target.format);

        Ok(ResampledAudioFrame {
            data,
            nb_samples: out_samples,
            sample_rate: self.target.sample_rate,
            channels: self.target.channels,
            bytes_per_sample: self.target.bytes_per_sample(),
            pts_ms,
        })
    }
}

/// Reads one source sample as f32 from a plane at a byte offset
fn sample_at(plane: &[u8], index: usize, format: SampleFormat) -> f32 {
    let size = format.bytes_per_sample();
    let offset = index * size;
    if offset + size > plane.len() {
        return 0.0;
    }
    match format.packed() {
        SampleFormat::S16 => {
            let v = i16::from_le_bytes([plane[offset], plane[offset + 1]]);
            v as f32 / 32_768.0
        }
        SampleFormat::S32 => {
            let v = i32::from_le_bytes([
                plane[offset],
                plane[offset + 1],
                plane[offset + 2],
                plane[offset + 3],
            ]);
            v as f32 / 2_147_483_648.0
        }
        SampleFormat::F32 => f32::from_le_bytes([
            plane[offset],
            plane[offset + 1],
            plane[offset + 2],
            plane[offset + 3],
        ]),
        SampleFormat::F64 => {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&plane[offset..offset + 8]);
            f64::from_le_bytes(bytes) as f32
        }
        _ => 0.0,
    }
}

/// Fills `out` with interleaved f32 samples remixed to `target_channels`
fn decode_interleaved(
    frame: &AudioFrame,
    source: SourceSpec,
    target_channels: usize,
    out: &mut [f32],
) -> PlayerResult<()> {
    let src_channels = source.channels as usize;

    let read = |sample: usize, channel: usize| -> f32 {
        if source.format.is_planar() {
            sample_at(&frame.planes[channel], sample, source.format)
        } else {
            sample_at(&frame.planes[0], sample * src_channels + channel, source.format)
        }
    };

    for sample in 0..frame.nb_samples {
        for target_ch in 0..target_channels {
            let value = if src_channels == target_channels {
                read(sample, target_ch)
            } else if src_channels == 1 {
                // Mono upmix: duplicate
                read(sample, 0)
            } else if target_channels == 1 {
                // Downmix: average all source channels
                let sum: f32 = (0..src_channels).map(|ch| read(sample, ch)).sum();
                sum / src_channels as f32
            } else if target_ch < src_channels {
                read(sample, target_ch)
            } else {
                // More target channels than source: repeat the last
                read(sample, src_channels - 1)
            };
            out[sample * target_channels + target_ch] = value;
        }
    }
    Ok(())
}

/// Encodes interleaved f32 samples into packed bytes of `format`
fn encode_packed(samples: &[f32], format: SampleFormat) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * format.bytes_per_sample());
    match format.packed() {
        SampleFormat::S16 => {
            for &sample in samples {
                let v = (sample.clamp(-1.0, 1.0) * 32_767.0) as i16;
                data.extend_from_slice(&v.to_le_bytes());
            }
        }
        SampleFormat::S32 => {
            for &sample in samples {
                let v = (sample.clamp(-1.0, 1.0) as f64 * 2_147_483_647.0) as i32;
                data.extend_from_slice(&v.to_le_bytes());
            }
        }
        SampleFormat::F32 => {
            for &sample in samples {
                data.extend_from_slice(&sample.to_le_bytes());
            }
        }
        SampleFormat::F64 => {
            for &sample in samples {
                data.extend_from_slice(&(sample as f64).to_le_bytes());
            }
        }
        _ => {}
    }
    data
}
