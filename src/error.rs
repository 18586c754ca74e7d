//! Error types for the interview engine

use thiserror::Error;

/// Result type alias for interview operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running an interview
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A collaborator (capture, presentation, classification) could not be reached
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    /// Question or follow-up generation failed
    #[error("generation failed: {0}")]
    Generation(String),

    /// A generated candidate did not meet the quality contract
    #[error("validation failed: {0}")]
    Validation(String),

    /// The speaker asked to end the interview, or the process was interrupted
    #[error("interview terminated by user")]
    Terminated,

    /// Recorded data could not be trusted (e.g. unreadable audio duration)
    #[error("data integrity warning: {0}")]
    DataIntegrity(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Language model error
    #[error("LLM error: {0}")]
    Llm(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSV read/write error
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Whether this error must end the session instead of skipping a slot
    ///
    /// User termination always ends the session. A missing audio device
    /// cannot recover mid-interview either.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated | Self::Audio(_))
    }
}
