//! Scoring and input parsing.

use crate::error::{Error, Result};

/// Points awarded for an exact guess.
pub const MAX_POINTS: u32 = 100;

/// Absolute distance between a guess and the secret.
#[must_use]
pub const fn distance(guess: u32, secret: u32) -> u32 {
    guess.abs_diff(secret)
}

/// Linear falloff: 100 for an exact guess, one point less per unit of distance, never negative.
#[must_use]
pub const fn points(guess: u32, secret: u32) -> u32 {
    MAX_POINTS.saturating_sub(distance(guess, secret))
}

/// How a round went, for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    /// Exact guess.
    Perfect,
    /// Within 5.
    Close,
    /// Neither close nor far.
    Neutral,
    /// 20 or more away.
    Far,
}

impl Feedback {
    /// Classifies a distance.
    #[must_use]
    pub const fn from_distance(diff: u32) -> Self {
        match diff {
            0 => Self::Perfect,
            1..=5 => Self::Close,
            20.. => Self::Far,
            _ => Self::Neutral,
        }
    }
}

/// Parses user text as an integer, ignoring surrounding whitespace.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the text is empty or not an integer.
pub fn parse_number(text: &str) -> Result<i64> {
    text.trim().parse().map_err(|_| Error::InvalidInput {
        raw: text.trim().to_string(),
    })
}

/// Parses a guess and checks it against the inclusive range.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for non-numeric text and
/// [`Error::OutOfRange`] for numbers outside `min..=max`.
pub fn parse_guess(text: &str, min: u32, max: u32) -> Result<u32> {
    let value = parse_number(text)?;
    if value < i64::from(min) || value > i64::from(max) {
        return Err(Error::OutOfRange { value, min, max });
    }
    u32::try_from(value).map_err(|_| Error::OutOfRange { value, min, max })
}
