//! numguess - A five-round number guessing game with an offline asset cache.
//!
//! The library holds the game rules and the offline worker, free of any
//! terminal or display concerns. The `numguess` binary drives both.
//!
//! # Example
//!
//! ```no_run
//! use numguess::{GameConfig, GameSession, HintResponse, MemoryStore};
//!
//! # fn example() -> numguess::Result<()> {
//! let mut session = GameSession::new(GameConfig::default(), MemoryStore::new())?;
//!
//! // The hint starts locked behind an equation.
//! if let Some(HintResponse::Challenge(challenge)) = session.request_hint() {
//!     println!("Solve {challenge}");
//!     session.answer_equation(&challenge.answer().to_string())?;
//! }
//!
//! let outcome = session.submit_guess("42")?;
//! println!("{} points, {:?}", outcome.points, outcome.feedback());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod game;
pub mod stats;
pub mod store;
pub mod worker;

// Re-export main types for convenience
pub use config::{AppConfig, CacheConfig, GameConfig, PathConfig};
pub use error::{Error, Result};
pub use format::{format_average, format_bytes, format_duration, format_progress, format_round};
pub use game::{
    BEST_SCORE_KEY, EquationChallenge, Feedback, GameEnd, GameSession, GuessOutcome, Hint,
    HintResponse,
};
pub use stats::{CacheStats, GameSummary, RoundRecord};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use worker::{
    CacheStore, DiskCache, FetchOutcome, FetchSource, Fetcher, HttpFetcher, InstallProgress,
    MemoryCache, NoProgress, OfflineWorker, Request, Response, WorkerState,
};
