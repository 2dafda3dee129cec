//! Error types for the numguess library.

use thiserror::Error;

/// Errors that can occur during game or offline-cache operations.
#[derive(Error, Debug)]
pub enum Error {
    /// User text could not be parsed as an integer.
    #[error("Not a number: {raw:?}")]
    InvalidInput {
        /// The rejected input, as typed.
        raw: String,
    },

    /// A guess fell outside the playable range.
    #[error("The number must be between {min} and {max} (got {value})")]
    OutOfRange {
        /// The parsed guess.
        value: i64,
        /// Lowest accepted guess.
        min: u32,
        /// Highest accepted guess.
        max: u32,
    },

    /// The answer to the equation challenge was wrong.
    #[error("Incorrect, the answer was {expected}")]
    ChallengeIncorrect {
        /// The value of `x` that solves the challenge.
        expected: u32,
    },

    /// An answer was submitted with no equation challenge open.
    #[error("No equation challenge is pending")]
    NoPendingChallenge,

    /// The final round has already been scored.
    #[error("The game is over, start a new one to keep playing")]
    GameOver,

    /// Configuration could not be parsed, serialized or validated.
    #[error("Config error: {0}")]
    Config(String),

    /// A manifest entry could not be fetched during install.
    #[error("Install failed for {url}: {reason}")]
    Install {
        /// Manifest entry that failed.
        url: String,
        /// Why it failed.
        reason: String,
    },

    /// A worker operation was attempted in the wrong lifecycle state.
    #[error("Worker is {actual}, expected {expected}")]
    WorkerState {
        /// State the operation requires.
        expected: &'static str,
        /// State the worker is in.
        actual: &'static str,
    },

    /// A request or manifest URL could not be parsed.
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl {
        /// The rejected URL text.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// The cache storage substrate rejected an operation.
    #[error("Cache error: {0}")]
    Cache(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl Error {
    /// Returns true for rejections of user input that leave the game untouched.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. }
                | Self::OutOfRange { .. }
                | Self::ChallengeIncorrect { .. }
                | Self::NoPendingChallenge
                | Self::GameOver
        )
    }
}

/// A specialized `Result` type for numguess operations.
pub type Result<T> = std::result::Result<T, Error>;
