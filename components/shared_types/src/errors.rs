//! Error types and the player state vocabulary
//!
//! This module defines all error kinds that playback operations can report,
//! plus the [`PlayerState`] enum used both by the state machine and by
//! state-transition errors.

use thiserror::Error;

/// Player state as observed through the facade and subscriptions
///
/// The transition rules between states live in the state manager; this enum
/// is only the shared vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerState {
    /// Nothing opened
    Idle,
    /// `open()` is running
    Opening,
    /// Media opened, pipeline not running
    Stopped,
    /// Pipeline running, clocks advancing
    Playing,
    /// Pipeline running, clocks frozen
    Paused,
    /// A seek is executing
    Seeking,
    /// A fatal error occurred; media may still be open
    Error,
}

impl PlayerState {
    /// Returns the state name as a string
    pub fn name(&self) -> &'static str {
        match self {
            PlayerState::Idle => "Idle",
            PlayerState::Opening => "Opening",
            PlayerState::Stopped => "Stopped",
            PlayerState::Playing => "Playing",
            PlayerState::Paused => "Paused",
            PlayerState::Seeking => "Seeking",
            PlayerState::Error => "Error",
        }
    }
}

/// Playback error kinds
///
/// Every fallible operation in the core reports one of these. Recoverable
/// per-frame conditions (decoder `InvalidData`, codec `BufferFull`) are not
/// errors; they are statuses handled inside the decode loop.
///
/// # Examples
///
/// ```
/// use lumenplay_shared_types::PlayerError;
///
/// let err = PlayerError::FileNotFound("missing.mp4".to_string());
/// assert!(err.to_string().contains("missing.mp4"));
/// ```
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlayerError {
    /// A caller-supplied argument was invalid
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Operation requires a component that has not been initialized
    #[error("Not initialized: {0}")]
    NotInitialized(String),

    /// Operation attempted while already running
    #[error("Already running: {0}")]
    AlreadyRunning(String),

    /// An allocation failed
    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    /// The source does not exist
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// The source exists but cannot be read
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// A network operation timed out
    #[error("Network timeout: {0}")]
    NetworkTimeout(String),

    /// A read or write failed
    #[error("I/O error: {0}")]
    Io(String),

    /// The operation is not supported on this platform or configuration
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// No decoder exists for the stream's codec
    #[error("Decoder not found: {0}")]
    DecoderNotFound(String),

    /// The codec is known but cannot be decoded here
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// The decoder failed to open
    #[error("Decoder init failed: {0}")]
    DecoderInitFailed(String),

    /// Submitting a packet to the decoder failed fatally
    #[error("Decoder send failed: {0}")]
    DecoderSendFrameFailed(String),

    /// Receiving a frame from the decoder failed fatally
    #[error("Decoder receive failed: {0}")]
    DecoderReceiveFrameFailed(String),

    /// The renderer failed to initialize or present
    #[error("Render error: {0}")]
    RenderError(String),

    /// End of stream reached
    #[error("End of file")]
    EndOfFile,

    /// A state transition outside the allowed table was requested
    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidStateTransition {
        /// The current state
        from: PlayerState,
        /// The requested target state
        to: PlayerState,
    },
}

/// Result type for playback operations
pub type PlayerResult<T> = Result<T, PlayerError>;
