//! Hint generation: a random set of decoys the secret is not, rendered as compact runs.

use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;

/// Prefix of every rendered hint.
pub const HINT_PREFIX: &str = "The number is NOT: ";

/// A maximal run of consecutive excluded numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    /// First number of the run.
    pub start: u32,
    /// Last number of the run (equal to `start` for a single number).
    pub end: u32,
}

impl fmt::Display for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// A hint: numbers in range that are known not to be the secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    excluded: Vec<u32>,
    runs: Vec<Run>,
}

impl Hint {
    /// Draws `count` distinct numbers from `min..=max` other than `secret`.
    ///
    /// The candidates are Fisher–Yates shuffled and the first `count` kept, so
    /// every subset of that size is equally likely. `count` is clamped to the
    /// number of available candidates.
    pub fn generate<R: Rng + ?Sized>(
        rng: &mut R,
        secret: u32,
        min: u32,
        max: u32,
        count: usize,
    ) -> Self {
        let mut candidates: Vec<u32> = (min..=max).filter(|&n| n != secret).collect();
        candidates.shuffle(rng);
        candidates.truncate(count);
        Self::from_excluded(candidates)
    }

    /// Builds a hint from an arbitrary set of excluded numbers.
    #[must_use]
    pub fn from_excluded(mut excluded: Vec<u32>) -> Self {
        excluded.sort_unstable();
        excluded.dedup();
        let runs = compress_runs(&excluded);
        Self { excluded, runs }
    }

    /// Excluded numbers in ascending order.
    #[must_use]
    pub fn excluded(&self) -> &[u32] {
        &self.excluded
    }

    /// Excluded numbers grouped into maximal consecutive runs.
    #[must_use]
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }
}

impl fmt::Display for Hint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(HINT_PREFIX)?;
        for (i, run) in self.runs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{run}")?;
        }
        Ok(())
    }
}

/// Groups a sorted slice into maximal runs of consecutive numbers.
///
/// `[3, 4, 5, 9]` becomes `3-5` and `9`.
#[must_use]
pub fn compress_runs(sorted: &[u32]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for &n in sorted {
        match runs.last_mut() {
            Some(run) if run.end.checked_add(1) == Some(n) => run.end = n,
            _ => runs.push(Run { start: n, end: n }),
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Reverses the rendering: "3-5, 9" back into [3, 4, 5, 9].
    fn expand(rendered: &str) -> Vec<u32> {
        let body = rendered.strip_prefix(HINT_PREFIX).unwrap();
        body.split(", ")
            .flat_map(|part| match part.split_once('-') {
                Some((a, b)) => (a.parse::<u32>().unwrap()..=b.parse().unwrap()).collect(),
                None => vec![part.parse().unwrap()],
            })
            .collect()
    }

    #[test]
    fn compress_runs_example() {
        let runs = compress_runs(&[3, 4, 5, 9]);
        assert_eq!(
            runs,
            vec![Run { start: 3, end: 5 }, Run { start: 9, end: 9 }]
        );
        let rendered: Vec<String> = runs.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["3-5", "9"]);
    }

    #[test]
    fn compress_runs_empty() {
        assert!(compress_runs(&[]).is_empty());
    }

    #[test]
    fn hint_renders_with_prefix() {
        let hint = Hint::from_excluded(vec![9, 4, 3, 5, 12]);
        assert_eq!(hint.to_string(), "The number is NOT: 3-5, 9, 12");
    }

    #[test]
    fn single_run_renders_as_range() {
        let hint = Hint::from_excluded((10..=34).collect());
        assert_eq!(hint.to_string(), "The number is NOT: 10-34");
    }

    #[test]
    fn generate_excludes_25_decoys() {
        let mut rng = StdRng::seed_from_u64(7);
        let hint = Hint::generate(&mut rng, 50, 1, 100, 25);
        assert_eq!(hint.excluded().len(), 25);
        assert!(!hint.excluded().contains(&50));
        assert!(hint.excluded().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn generate_clamps_to_available_candidates() {
        let mut rng = StdRng::seed_from_u64(1);
        let hint = Hint::generate(&mut rng, 3, 1, 5, 25);
        assert_eq!(hint.excluded(), &[1, 2, 4, 5]);
        assert_eq!(hint.to_string(), "The number is NOT: 1-2, 4-5");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn exclusion_set_is_25_distinct_non_secrets(secret in 1u32..=100, seed in any::<u64>()) {
                let mut rng = StdRng::seed_from_u64(seed);
                let hint = Hint::generate(&mut rng, secret, 1, 100, 25);
                prop_assert_eq!(hint.excluded().len(), 25);
                prop_assert!(!hint.excluded().contains(&secret));
                prop_assert!(hint.excluded().iter().all(|n| (1..=100).contains(n)));
            }

            #[test]
            fn rendered_runs_expand_to_exclusion_set(secret in 1u32..=100, seed in any::<u64>()) {
                let mut rng = StdRng::seed_from_u64(seed);
                let hint = Hint::generate(&mut rng, secret, 1, 100, 25);
                prop_assert_eq!(expand(&hint.to_string()), hint.excluded().to_vec());
            }

            #[test]
            fn runs_are_maximal(seed in any::<u64>()) {
                let mut rng = StdRng::seed_from_u64(seed);
                let hint = Hint::generate(&mut rng, 50, 1, 100, 25);
                for pair in hint.runs().windows(2) {
                    prop_assert!(pair[1].start > pair[0].end + 1);
                }
            }
        }
    }
}
