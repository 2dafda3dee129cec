//! The game session: rounds, scoring, hint unlocking and the persisted best score.
//!
//! A [`GameSession`] is an ordinary value owned by whatever front end drives
//! it. Every operation is a synchronous state transition; randomness and
//! best-score persistence are injected so tests can pin both down.

pub mod challenge;
pub mod hint;
pub mod scoring;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::GameConfig;
use crate::error::{Error, Result};
use crate::stats::{GameSummary, GameSummaryBuilder, RoundRecord};
use crate::store::{FileStore, KeyValueStore};

pub use challenge::EquationChallenge;
pub use hint::{Hint, Run};
pub use scoring::Feedback;

/// Key the best score is persisted under.
pub const BEST_SCORE_KEY: &str = "best score";

/// Result of a scored guess.
#[derive(Debug, Clone, PartialEq)]
pub struct GuessOutcome {
    /// The round this guess was scored in.
    pub round: u32,
    /// The accepted guess.
    pub guess: u32,
    /// The secret of that round, revealed.
    pub secret: u32,
    /// Distance between guess and secret.
    pub diff: u32,
    /// Points awarded for the round.
    pub points: u32,
    /// Cumulative score after this round.
    pub total_score: u32,
    /// True if this round's score unlocked the hint.
    pub hint_auto_unlocked: bool,
    /// Set when this was the final round.
    pub game_end: Option<GameEnd>,
}

impl GuessOutcome {
    /// Presentation band for this round.
    #[must_use]
    pub const fn feedback(&self) -> Feedback {
        Feedback::from_distance(self.diff)
    }
}

/// How a finished game compares to the persisted best.
#[derive(Debug, Clone, PartialEq)]
pub struct GameEnd {
    /// Final total.
    pub total_score: u32,
    /// Best score before this game, if any.
    pub previous_best: Option<u32>,
    /// True if the total strictly beat the previous best (or there was none).
    pub new_best: bool,
    /// Round-by-round statistics.
    pub summary: GameSummary,
}

/// Answer to a hint request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HintResponse {
    /// The hint was unlocked and is now spent.
    Hint(Hint),
    /// The hint is locked; solve this to unlock it.
    Challenge(EquationChallenge),
}

/// One player's game.
pub struct GameSession<S: KeyValueStore = FileStore, R: Rng = StdRng> {
    config: GameConfig,
    store: S,
    rng: R,
    round: u32,
    total_score: u32,
    secret: u32,
    active: bool,
    hint_used: bool,
    hint_unlocked: bool,
    pending: Option<EquationChallenge>,
    best_score: Option<u32>,
    history: GameSummaryBuilder,
}

impl<S: KeyValueStore> GameSession<S, StdRng> {
    /// Starts a session seeded from the operating system.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the rules do not validate.
    pub fn new(config: GameConfig, store: S) -> Result<Self> {
        Self::with_rng(config, store, StdRng::from_os_rng())
    }
}

impl<S: KeyValueStore, R: Rng> GameSession<S, R> {
    /// Starts a session with a caller-provided random source.
    ///
    /// The best score is read from `store` once, here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the rules do not validate.
    pub fn with_rng(config: GameConfig, store: S, rng: R) -> Result<Self> {
        config.validate()?;
        let best_score = load_best_score(&store);
        let mut session = Self {
            config,
            store,
            rng,
            round: 1,
            total_score: 0,
            secret: 0,
            active: true,
            hint_used: false,
            hint_unlocked: false,
            pending: None,
            best_score,
            history: GameSummaryBuilder::new(),
        };
        session.new_game();
        Ok(session)
    }

    /// Resets every per-game field and draws a fresh secret. The best score is kept.
    pub fn new_game(&mut self) {
        self.round = 1;
        self.total_score = 0;
        self.secret = self.draw_secret();
        self.active = true;
        self.hint_used = false;
        self.hint_unlocked = false;
        self.pending = None;
        self.history = GameSummaryBuilder::new();
        log::debug!("New game of {} rounds", self.config.rounds_total);
    }

    /// Scores a guess typed by the player.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GameOver`] once the final round is scored,
    /// [`Error::InvalidInput`] for non-numeric text and [`Error::OutOfRange`]
    /// for numbers outside the configured range. None of these change state.
    pub fn submit_guess(&mut self, text: &str) -> Result<GuessOutcome> {
        if !self.active {
            return Err(Error::GameOver);
        }
        let guess = scoring::parse_guess(text, self.config.min_number, self.config.max_number)?;

        let secret = self.secret;
        let diff = scoring::distance(guess, secret);
        let points = scoring::points(guess, secret);
        self.total_score += points;

        let hint_auto_unlocked =
            !self.hint_unlocked && points > self.config.auto_unlock_threshold;
        if hint_auto_unlocked {
            self.hint_unlocked = true;
            log::debug!("Hint unlocked by a {points}-point round");
        }

        let round = self.round;
        self.history.add_round(RoundRecord {
            round,
            guess,
            secret,
            diff,
            points,
        });

        let game_end = if round >= self.config.rounds_total {
            self.active = false;
            Some(self.finish())
        } else {
            self.round += 1;
            self.secret = self.draw_secret();
            None
        };

        Ok(GuessOutcome {
            round,
            guess,
            secret,
            diff,
            points,
            total_score: self.total_score,
            hint_auto_unlocked,
            game_end,
        })
    }

    /// Asks for the hint.
    ///
    /// Returns `None` without touching state when the game is over or the
    /// hint was already used. While the hint is locked this opens a new
    /// equation challenge, replacing any pending one.
    pub fn request_hint(&mut self) -> Option<HintResponse> {
        if !self.active || self.hint_used {
            return None;
        }

        if !self.hint_unlocked {
            let challenge = EquationChallenge::generate(&mut self.rng);
            self.pending = Some(challenge);
            return Some(HintResponse::Challenge(challenge));
        }

        let hint = Hint::generate(
            &mut self.rng,
            self.secret,
            self.config.min_number,
            self.config.max_number,
            self.config.hint_exclusions,
        );
        self.hint_used = true;
        Some(HintResponse::Hint(hint))
    }

    /// Answers the pending equation challenge.
    ///
    /// A correct answer unlocks the hint. Either way the challenge is closed;
    /// the next [`request_hint`](Self::request_hint) opens a new one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoPendingChallenge`] with no challenge open,
    /// [`Error::InvalidInput`] for non-numeric text (the challenge stays open),
    /// and [`Error::ChallengeIncorrect`] carrying the right answer.
    pub fn answer_equation(&mut self, text: &str) -> Result<()> {
        let challenge = self.pending.ok_or(Error::NoPendingChallenge)?;
        match challenge.check(text) {
            Err(e @ Error::InvalidInput { .. }) => Err(e),
            result => {
                self.pending = None;
                if result.is_ok() {
                    self.hint_unlocked = true;
                    log::debug!("Hint unlocked by equation challenge");
                }
                result
            }
        }
    }

    /// Current round, starting at 1.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// Rounds per game.
    #[must_use]
    pub const fn rounds_total(&self) -> u32 {
        self.config.rounds_total
    }

    /// Cumulative score of this game.
    #[must_use]
    pub const fn total_score(&self) -> u32 {
        self.total_score
    }

    /// The secret of the current round.
    #[must_use]
    pub const fn secret(&self) -> u32 {
        self.secret
    }

    /// False once the final round is scored.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the hint has been spent this game.
    #[must_use]
    pub const fn hint_used(&self) -> bool {
        self.hint_used
    }

    /// Whether the hint is available (or was, if used).
    #[must_use]
    pub const fn hint_unlocked(&self) -> bool {
        self.hint_unlocked
    }

    /// The open equation challenge, if any.
    #[must_use]
    pub const fn pending_equation(&self) -> Option<&EquationChallenge> {
        self.pending.as_ref()
    }

    /// Best finished-game total seen so far.
    #[must_use]
    pub const fn best_score(&self) -> Option<u32> {
        self.best_score
    }

    /// The game rules.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Rounds scored so far this game.
    #[must_use]
    pub fn history(&self) -> &[RoundRecord] {
        self.history.rounds()
    }

    fn draw_secret(&mut self) -> u32 {
        self.rng
            .random_range(self.config.min_number..=self.config.max_number)
    }

    /// Compares the final total with the best score and persists an improvement.
    fn finish(&mut self) -> GameEnd {
        let previous_best = self.best_score;
        let new_best = previous_best.is_none_or(|best| self.total_score > best);
        if new_best {
            self.best_score = Some(self.total_score);
            log::info!("New best score: {}", self.total_score);
            if let Err(e) = self
                .store
                .set(BEST_SCORE_KEY, &self.total_score.to_string())
            {
                log::warn!("Failed to save best score: {e}");
            }
        }
        GameEnd {
            total_score: self.total_score,
            previous_best,
            new_best,
            summary: self.history.build(),
        }
    }
}

fn load_best_score<S: KeyValueStore>(store: &S) -> Option<u32> {
    let raw = store.get(BEST_SCORE_KEY)?;
    match raw.trim().parse() {
        Ok(score) => Some(score),
        Err(_) => {
            log::warn!("Ignoring unreadable best score {raw:?}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn session(seed: u64) -> GameSession<MemoryStore> {
        session_with_store(seed, MemoryStore::new())
    }

    fn session_with_store(seed: u64, store: MemoryStore) -> GameSession<MemoryStore> {
        GameSession::with_rng(GameConfig::default(), store, StdRng::seed_from_u64(seed)).unwrap()
    }

    /// A guess exactly `offset` away from the current secret. Offsets up to 50
    /// always have an in-range side.
    fn guess_at_distance(session: &GameSession<MemoryStore>, offset: u32) -> String {
        let secret = session.secret();
        if secret + offset <= 100 {
            (secret + offset).to_string()
        } else {
            (secret - offset).to_string()
        }
    }

    /// Plays every remaining round scoring exactly `points` (at least 50).
    fn play_out(session: &mut GameSession<MemoryStore>, points: u32) -> GuessOutcome {
        assert!(points >= 50);
        loop {
            let guess = guess_at_distance(session, 100 - points);
            let outcome = session.submit_guess(&guess).unwrap();
            if outcome.game_end.is_some() {
                return outcome;
            }
        }
    }

    #[test]
    fn fresh_session_state() {
        let s = session(1);
        assert_eq!(s.round(), 1);
        assert_eq!(s.total_score(), 0);
        assert!(s.is_active());
        assert!(!s.hint_used());
        assert!(!s.hint_unlocked());
        assert!(s.pending_equation().is_none());
        assert_eq!(s.best_score(), None);
        assert!((1..=100).contains(&s.secret()));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = GameConfig::new().with_range(10, 10);
        let result = GameSession::with_rng(config, MemoryStore::new(), StdRng::seed_from_u64(1));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn guess_scores_and_advances_round() {
        let mut s = session(2);
        let secret = s.secret();
        let guess = guess_at_distance(&s, 5);

        let outcome = s.submit_guess(&guess).unwrap();
        assert_eq!(outcome.round, 1);
        assert_eq!(outcome.secret, secret);
        assert_eq!(outcome.diff, 5);
        assert_eq!(outcome.points, 95);
        assert_eq!(outcome.total_score, 95);
        assert_eq!(outcome.feedback(), Feedback::Close);
        assert!(outcome.game_end.is_none());
        assert_eq!(s.round(), 2);
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn high_score_auto_unlocks_hint() {
        let mut s = session(3);
        let guess = guess_at_distance(&s, 5);
        let outcome = s.submit_guess(&guess).unwrap();
        assert!(outcome.hint_auto_unlocked);
        assert!(s.hint_unlocked());

        // Already unlocked: later high rounds don't report it again.
        let guess = guess_at_distance(&s, 0);
        let outcome = s.submit_guess(&guess).unwrap();
        assert!(!outcome.hint_auto_unlocked);
        assert!(s.hint_unlocked());

        // Low rounds never relock it.
        let guess = guess_at_distance(&s, 40);
        s.submit_guess(&guess).unwrap();
        assert!(s.hint_unlocked());
    }

    #[test]
    fn exactly_threshold_does_not_unlock() {
        let mut s = session(4);
        let guess = guess_at_distance(&s, 10);
        let outcome = s.submit_guess(&guess).unwrap();
        assert_eq!(outcome.points, 90);
        assert!(!outcome.hint_auto_unlocked);
        assert!(!s.hint_unlocked());
    }

    #[test]
    fn rejected_guesses_change_nothing() {
        let mut s = session(5);
        let secret = s.secret();

        assert!(matches!(s.submit_guess("abc"), Err(Error::InvalidInput { .. })));
        assert!(matches!(s.submit_guess("0"), Err(Error::OutOfRange { .. })));
        assert!(matches!(s.submit_guess("101"), Err(Error::OutOfRange { .. })));

        assert_eq!(s.round(), 1);
        assert_eq!(s.total_score(), 0);
        assert_eq!(s.secret(), secret);
        assert!(s.history().is_empty());
    }

    #[test]
    fn five_rounds_end_the_game() {
        let mut s = session(6);
        let outcome = play_out(&mut s, 80);

        assert_eq!(outcome.round, 5);
        assert!(!s.is_active());
        assert_eq!(s.round(), 5);
        assert_eq!(s.total_score(), 400);

        let end = outcome.game_end.unwrap();
        assert_eq!(end.total_score, 400);
        assert_eq!(end.previous_best, None);
        assert!(end.new_best);
        assert_eq!(end.summary.rounds.len(), 5);
        assert_eq!(s.best_score(), Some(400));
    }

    #[test]
    fn finished_game_rejects_further_guesses() {
        let mut s = session(7);
        play_out(&mut s, 50);
        let score = s.total_score();

        assert!(matches!(s.submit_guess("50"), Err(Error::GameOver)));
        assert_eq!(s.total_score(), score);
        assert_eq!(s.round(), 5);
    }

    #[test]
    fn best_score_is_persisted() {
        let store = MemoryStore::new();
        let mut s = session_with_store(8, store.clone());
        play_out(&mut s, 80);
        assert_eq!(store.get(BEST_SCORE_KEY).as_deref(), Some("400"));

        let reopened = session_with_store(9, store);
        assert_eq!(reopened.best_score(), Some(400));
    }

    #[test]
    fn tie_does_not_update_best_score() {
        let store = MemoryStore::new();
        store.set(BEST_SCORE_KEY, " 400").unwrap();
        let mut s = session_with_store(10, store.clone());

        let end = play_out(&mut s, 80).game_end.unwrap();
        assert_eq!(end.previous_best, Some(400));
        assert!(!end.new_best);
        assert_eq!(s.best_score(), Some(400));
        // Untouched: a rewrite would have normalised the padding away.
        assert_eq!(store.get(BEST_SCORE_KEY).as_deref(), Some(" 400"));
    }

    #[test]
    fn lower_score_keeps_best() {
        let store = MemoryStore::new();
        store.set(BEST_SCORE_KEY, "450").unwrap();
        let mut s = session_with_store(11, store.clone());

        let end = play_out(&mut s, 60).game_end.unwrap();
        assert!(!end.new_best);
        assert_eq!(s.best_score(), Some(450));
        assert_eq!(store.get(BEST_SCORE_KEY).as_deref(), Some("450"));
    }

    #[test]
    fn higher_score_replaces_best() {
        let store = MemoryStore::new();
        store.set(BEST_SCORE_KEY, "399").unwrap();
        let mut s = session_with_store(12, store.clone());

        let end = play_out(&mut s, 80).game_end.unwrap();
        assert!(end.new_best);
        assert_eq!(store.get(BEST_SCORE_KEY).as_deref(), Some("400"));
    }

    #[test]
    fn unreadable_best_score_counts_as_none() {
        let store = MemoryStore::new();
        store.set(BEST_SCORE_KEY, "lots").unwrap();
        let s = session_with_store(13, store);
        assert_eq!(s.best_score(), None);
    }

    #[test]
    fn locked_hint_opens_challenge() {
        let mut s = session(14);
        let Some(HintResponse::Challenge(challenge)) = s.request_hint() else {
            panic!("expected a challenge");
        };
        assert_eq!(s.pending_equation(), Some(&challenge));
        assert!(!s.hint_used());
        assert!(!s.hint_unlocked());
    }

    #[test]
    fn correct_equation_unlocks_hint() {
        let mut s = session(15);
        let Some(HintResponse::Challenge(challenge)) = s.request_hint() else {
            panic!("expected a challenge");
        };
        s.answer_equation(&challenge.answer().to_string()).unwrap();
        assert!(s.hint_unlocked());
        assert!(s.pending_equation().is_none());

        let Some(HintResponse::Hint(hint)) = s.request_hint() else {
            panic!("expected a hint");
        };
        assert_eq!(hint.excluded().len(), 25);
        assert!(!hint.excluded().contains(&s.secret()));
        assert!(s.hint_used());
    }

    #[test]
    fn wrong_equation_reveals_answer_and_closes_challenge() {
        let mut s = session(16);
        let Some(HintResponse::Challenge(challenge)) = s.request_hint() else {
            panic!("expected a challenge");
        };
        let wrong = (challenge.answer() + 1).to_string();

        match s.answer_equation(&wrong) {
            Err(Error::ChallengeIncorrect { expected }) => assert_eq!(expected, challenge.answer()),
            other => panic!("unexpected {other:?}"),
        }
        assert!(s.pending_equation().is_none());
        assert!(!s.hint_unlocked());

        // No retry limit: a new challenge is available straight away.
        assert!(matches!(s.request_hint(), Some(HintResponse::Challenge(_))));
    }

    #[test]
    fn unparseable_equation_answer_keeps_challenge_open() {
        let mut s = session(17);
        s.request_hint();
        assert!(matches!(s.answer_equation("seven"), Err(Error::InvalidInput { .. })));
        assert!(s.pending_equation().is_some());
    }

    #[test]
    fn answer_without_challenge_is_rejected() {
        let mut s = session(18);
        assert!(matches!(s.answer_equation("3"), Err(Error::NoPendingChallenge)));
    }

    #[test]
    fn hint_is_single_use() {
        let mut s = session(19);
        let guess = guess_at_distance(&s, 0);
        s.submit_guess(&guess).unwrap();
        assert!(matches!(s.request_hint(), Some(HintResponse::Hint(_))));

        assert!(s.request_hint().is_none());
        assert!(s.hint_used());
        assert!(s.pending_equation().is_none());
    }

    #[test]
    fn hint_request_after_game_over_is_noop() {
        let mut s = session(20);
        play_out(&mut s, 50);
        assert!(s.request_hint().is_none());
        assert!(s.pending_equation().is_none());
        assert!(!s.hint_used());
    }

    #[test]
    fn new_game_resets_but_keeps_best() {
        let mut s = session(21);
        let guess = guess_at_distance(&s, 0);
        s.submit_guess(&guess).unwrap();
        s.request_hint();
        play_out(&mut s, 70);
        let best = s.best_score();

        s.new_game();
        assert_eq!(s.round(), 1);
        assert_eq!(s.total_score(), 0);
        assert!(s.is_active());
        assert!(!s.hint_used());
        assert!(!s.hint_unlocked());
        assert!(s.history().is_empty());
        assert_eq!(s.best_score(), best);
    }

    #[test]
    fn hint_used_implies_unlocked() {
        for seed in 0..20 {
            let mut s = session(seed);
            s.request_hint();
            if s.hint_used() {
                assert!(s.hint_unlocked());
            }
            let guess = guess_at_distance(&s, 3);
            s.submit_guess(&guess).unwrap();
            s.request_hint();
            assert!(!s.hint_used() || s.hint_unlocked());
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn secrets_stay_in_range(seed in any::<u64>(), guesses in prop::collection::vec(1u32..=100, 0..5)) {
                let mut s = session(seed);
                prop_assert!((1..=100).contains(&s.secret()));
                for guess in guesses {
                    s.submit_guess(&guess.to_string()).unwrap();
                    prop_assert!((1..=100).contains(&s.secret()));
                }
            }

            #[test]
            fn unlock_is_sticky(seed in any::<u64>(), offsets in prop::collection::vec(0u32..=50, 5)) {
                let mut s = session(seed);
                let mut unlocked = false;
                for offset in offsets {
                    let guess = guess_at_distance(&s, offset);
                    let outcome = s.submit_guess(&guess).unwrap();
                    unlocked |= outcome.points > 90;
                    prop_assert_eq!(s.hint_unlocked(), unlocked);
                }
                prop_assert!(!s.is_active());
            }
        }
    }
}
