//! The linear-equation challenge that unlocks the hint before any round scores high enough.

use std::fmt;
use std::ops::RangeInclusive;

use rand::Rng;

use crate::error::{Error, Result};
use crate::game::scoring::parse_number;

const COEFFICIENTS: RangeInclusive<u32> = 2..=10;
const UNKNOWNS: RangeInclusive<u32> = 1..=20;
const CONSTANTS: RangeInclusive<u32> = 1..=20;

/// `a·x + b = c`, with `x` hidden from the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EquationChallenge {
    coefficient: u32,
    constant: u32,
    target: u32,
    answer: u32,
}

impl EquationChallenge {
    /// Draws a fresh challenge.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let coefficient = rng.random_range(COEFFICIENTS);
        let answer = rng.random_range(UNKNOWNS);
        let constant = rng.random_range(CONSTANTS);
        Self::new(coefficient, answer, constant)
    }

    /// Builds the challenge whose solution is `answer`.
    #[must_use]
    pub const fn new(coefficient: u32, answer: u32, constant: u32) -> Self {
        Self {
            coefficient,
            constant,
            target: coefficient * answer + constant,
            answer,
        }
    }

    /// The `a` in `a·x + b = c`.
    #[must_use]
    pub const fn coefficient(&self) -> u32 {
        self.coefficient
    }

    /// The `b` in `a·x + b = c`.
    #[must_use]
    pub const fn constant(&self) -> u32 {
        self.constant
    }

    /// The `c` in `a·x + b = c`.
    #[must_use]
    pub const fn target(&self) -> u32 {
        self.target
    }

    /// The solution `x`.
    #[must_use]
    pub const fn answer(&self) -> u32 {
        self.answer
    }

    /// Checks a typed answer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the text is not an integer and
    /// [`Error::ChallengeIncorrect`] if it is the wrong one.
    pub fn check(&self, text: &str) -> Result<()> {
        let value = parse_number(text)?;
        if value == i64::from(self.answer) {
            Ok(())
        } else {
            Err(Error::ChallengeIncorrect {
                expected: self.answer,
            })
        }
    }
}

impl fmt::Display for EquationChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x + {} = {}",
            self.coefficient, self.constant, self.target
        )
    }
}
