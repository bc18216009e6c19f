//! Facade configuration

use lumenplay_audio_output::AudioSpec;
use lumenplay_av_sync::SyncConfig;
use lumenplay_playback_control::PlaybackConfig;

/// Player-level configuration
///
/// The defaults match the shipped player: hardware decoding for the common
/// GPU-friendly codecs at 720p and above, 40 ms sync tolerance, bounded
/// queues sized for smooth streaming.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    /// Whether the hardware render path may be chosen at all
    pub hardware_decoding: bool,
    /// Minimum coded width for the hardware path
    pub hw_min_width: u32,
    /// Minimum coded height for the hardware path
    pub hw_min_height: u32,
    /// Format requested from the audio device
    pub audio_spec: AudioSpec,
    /// Synchronization policy parameters
    pub sync: SyncConfig,
    /// Pipeline capacities and delays
    pub playback: PlaybackConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            hardware_decoding: true,
            hw_min_width: 1280,
            hw_min_height: 720,
            audio_spec: AudioSpec::default(),
            sync: SyncConfig::default(),
            playback: PlaybackConfig::default(),
        }
    }
}
