//! Per-round records, end-of-game statistics and worker cache counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// What happened in one scored round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundRecord {
    /// Round number, starting at 1.
    pub round: u32,
    /// The accepted guess.
    pub guess: u32,
    /// The secret it was compared against.
    pub secret: u32,
    /// Distance between guess and secret.
    pub diff: u32,
    /// Points awarded.
    pub points: u32,
}

/// Statistics for a finished game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSummary {
    /// Every scored round, in order.
    pub rounds: Vec<RoundRecord>,
    /// Sum of all round points.
    pub total_score: u32,
    /// Rounds guessed exactly.
    pub perfect_rounds: usize,
    /// Smallest distance over the game.
    pub closest_diff: Option<u32>,
}

impl Default for GameSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl GameSummary {
    /// Creates an empty summary.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rounds: Vec::new(),
            total_score: 0,
            perfect_rounds: 0,
            closest_diff: None,
        }
    }

    /// Average points per round.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_points(&self) -> f64 {
        if self.rounds.is_empty() {
            0.0
        } else {
            f64::from(self.total_score) / self.rounds.len() as f64
        }
    }
}

/// Accumulates round records during a game.
#[derive(Debug, Clone, Default)]
pub struct GameSummaryBuilder {
    rounds: Vec<RoundRecord>,
}

impl GameSummaryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub const fn new() -> Self {
        Self { rounds: Vec::new() }
    }

    /// Records a scored round.
    pub fn add_round(&mut self, record: RoundRecord) {
        self.rounds.push(record);
    }

    /// Rounds recorded so far.
    #[must_use]
    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    /// Builds the final summary.
    #[must_use]
    pub fn build(&self) -> GameSummary {
        GameSummary {
            total_score: self.rounds.iter().map(|r| r.points).sum(),
            perfect_rounds: self.rounds.iter().filter(|r| r.diff == 0).count(),
            closest_diff: self.rounds.iter().map(|r| r.diff).min(),
            rounds: self.rounds.clone(),
        }
    }
}

/// Point-in-time copy of the worker's cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests answered from the cache.
    pub hits: u64,
    /// Requests that went to the network.
    pub misses: u64,
    /// Network responses copied into the cache.
    pub stored: u64,
    /// Network responses returned without being cached.
    pub passthrough: u64,
}

impl CacheStats {
    /// Fraction of requests answered from the cache, or `None` before any request.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_ratio(&self) -> Option<f64> {
        let total = self.hits + self.misses;
        (total > 0).then(|| self.hits as f64 / total as f64)
    }
}

/// Thread-safe cache counters, updated from concurrent fetch handlers.
#[derive(Debug, Default)]
pub struct CacheStatsTracker {
    hits: AtomicU64,
    misses: AtomicU64,
    stored: AtomicU64,
    passthrough: AtomicU64,
}

impl CacheStatsTracker {
    /// Creates a tracker with all counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stored: AtomicU64::new(0),
            passthrough: AtomicU64::new(0),
        }
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stored(&self) {
        self.stored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_passthrough(&self) {
        self.passthrough.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counter values.
    #[must_use]
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            passthrough: self.passthrough.load(Ordering::Relaxed),
        }
    }
}
