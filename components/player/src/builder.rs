//! Builder assembling a [`Player`] around its injected collaborators

use crate::{Player, PlayerConfig};
use lumenplay_audio_output::{AudioDriver, NullAudioDriver};
use lumenplay_shared_types::{CodecService, Renderer};
use lumenplay_video_output::NullRenderer;
use std::sync::Arc;

pub(crate) type RendererFactory = Box<dyn Fn() -> Box<dyn Renderer> + Send + Sync>;
pub(crate) type AudioDriverFactory = Box<dyn Fn() -> Box<dyn AudioDriver> + Send + Sync>;

/// Builds a [`Player`] with safe defaults for every optional collaborator
///
/// The codec service is the only required input. Renderers and audio
/// drivers are supplied as factories because each opened source gets fresh
/// instances; without them the player presents headlessly and consumes
/// audio against wall time.
pub struct PlayerBuilder {
    service: Arc<dyn CodecService>,
    config: PlayerConfig,
    renderer_factory: RendererFactory,
    audio_driver_factory: AudioDriverFactory,
}

impl PlayerBuilder {
    /// Starts a builder over the given codec service
    pub fn new(service: Arc<dyn CodecService>) -> Self {
        Self {
            service,
            config: PlayerConfig::default(),
            renderer_factory: Box::new(|| Box::new(NullRenderer::new())),
            audio_driver_factory: Box::new(|| Box::new(NullAudioDriver::new())),
        }
    }

    /// Overrides the player configuration
    pub fn with_config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    /// Installs the factory producing the renderer for each opened source
    ///
    /// A renderer that creates its own GPU device shares it with the
    /// hardware decode path automatically.
    pub fn with_renderer<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Renderer> + Send + Sync + 'static,
    {
        self.renderer_factory = Box::new(factory);
        self
    }

    /// Installs the factory producing the audio driver for each opened source
    pub fn with_audio_driver<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn AudioDriver> + Send + Sync + 'static,
    {
        self.audio_driver_factory = Box::new(factory);
        self
    }

    /// Builds the player
    pub fn build(self) -> Player {
        Player::assemble(
            self.service,
            self.config,
            self.renderer_factory,
            self.audio_driver_factory,
        )
    }
}
