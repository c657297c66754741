use crate::dedup::DedupCache;
use crate::error::{ConfigError, MutationError};
use crate::mutator::Mutator;
use rand::Rng;
use serde::Deserialize;
use std::fmt;

/// Iterative mode restarts from the original seed every this many attempts.
pub const ITERATIVE_RESET_PERIOD: u64 = 25;
/// Complex mode restarts from the original seed every this many attempts.
pub const COMPLEX_RESET_PERIOD: u64 = 10;
/// Number of chained mutations per Complex round.
pub const COMPLEX_CHAIN_LEN: usize = 2;

/// Which [`MutationStrategy`] a run uses. Fixed for the duration of a run.
///
/// In configuration files this is written either as the numeric fuzz type
/// (`0`, `1`, `2`) or by name (`"simple"`, `"iterative"`, `"complex"`).
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(try_from = "StrategyRepr")]
pub enum StrategyKind {
    #[default]
    Simple,
    Iterative,
    Complex,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StrategyRepr {
    Code(u8),
    Name(String),
}

impl TryFrom<StrategyRepr> for StrategyKind {
    type Error = ConfigError;

    fn try_from(repr: StrategyRepr) -> Result<Self, Self::Error> {
        match repr {
            StrategyRepr::Code(code) => StrategyKind::try_from(code),
            StrategyRepr::Name(name) => match name.to_ascii_lowercase().as_str() {
                "simple" => Ok(StrategyKind::Simple),
                "iterative" => Ok(StrategyKind::Iterative),
                "complex" => Ok(StrategyKind::Complex),
                _ => Err(ConfigError::OutOfRange {
                    field: "fuzz-type",
                    reason: format!("unknown strategy '{name}'"),
                }),
            },
        }
    }
}

impl TryFrom<u8> for StrategyKind {
    type Error = ConfigError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(StrategyKind::Simple),
            1 => Ok(StrategyKind::Iterative),
            2 => Ok(StrategyKind::Complex),
            other => Err(ConfigError::InvalidFuzzType(other)),
        }
    }
}

impl StrategyKind {
    /// The numeric fuzz type used on the command line.
    pub fn code(self) -> u8 {
        match self {
            StrategyKind::Simple => 0,
            StrategyKind::Iterative => 1,
            StrategyKind::Complex => 2,
        }
    }

    pub fn build<R: Rng + ?Sized>(self) -> Box<dyn MutationStrategy<R>> {
        match self {
            StrategyKind::Simple => Box::new(SimpleStrategy),
            StrategyKind::Iterative => Box::new(IterativeStrategy::default()),
            StrategyKind::Complex => Box::new(ComplexStrategy::default()),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::Simple => "Simple",
            StrategyKind::Iterative => "Iterative",
            StrategyKind::Complex => "Complex",
        };
        write!(f, "{} ({name})", self.code())
    }
}

/// Decides which string to feed the [`Mutator`] each round and how many edits
/// to chain.
///
/// Strategies hold no per-run state of their own; the rolling seed lives in the
/// controller's run state and is passed in on every call.
pub trait MutationStrategy<R: Rng + ?Sized> {
    fn kind(&self) -> StrategyKind;

    /// Whether the rolling seed is reset to the original seed before the round
    /// that follows `attempt` completed attempts.
    fn resets_at(&self, attempt: u64) -> bool;

    /// Produces the candidate for the round following `attempt` completed
    /// attempts, updating `rolling` as the strategy requires.
    ///
    /// # Arguments
    /// * `seed`: The original seed password.
    /// * `rolling`: The strategy-maintained base for the next mutation.
    /// * `attempt`: Number of attempts completed before this round.
    /// * `mutator`: The mutation engine.
    /// * `rng`: Source of randomness.
    /// * `seen`: Previously rejected candidates; strategies that filter
    ///   duplicates pass it on to the mutator.
    fn next_candidate(
        &self,
        seed: &str,
        rolling: &mut String,
        attempt: u64,
        mutator: &mut dyn Mutator<R>,
        rng: &mut R,
        seen: &DedupCache,
    ) -> Result<String, MutationError>;
}

/// Mutates the original seed once per round, ignoring history.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleStrategy;

impl<R: Rng + ?Sized> MutationStrategy<R> for SimpleStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Simple
    }

    fn resets_at(&self, _attempt: u64) -> bool {
        false
    }

    fn next_candidate(
        &self,
        seed: &str,
        _rolling: &mut String,
        _attempt: u64,
        mutator: &mut dyn Mutator<R>,
        rng: &mut R,
        seen: &DedupCache,
    ) -> Result<String, MutationError> {
        mutator.mutate(seed, rng, Some(seen))
    }
}

/// Mutates the previous round's output once per round, restarting from the
/// original seed every `reset_period` attempts.
#[derive(Debug, Clone, Copy)]
pub struct IterativeStrategy {
    pub reset_period: u64,
}

impl Default for IterativeStrategy {
    fn default() -> Self {
        Self {
            reset_period: ITERATIVE_RESET_PERIOD,
        }
    }
}

impl<R: Rng + ?Sized> MutationStrategy<R> for IterativeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Iterative
    }

    fn resets_at(&self, attempt: u64) -> bool {
        attempt.is_multiple_of(self.reset_period.max(1))
    }

    fn next_candidate(
        &self,
        seed: &str,
        rolling: &mut String,
        attempt: u64,
        mutator: &mut dyn Mutator<R>,
        rng: &mut R,
        seen: &DedupCache,
    ) -> Result<String, MutationError> {
        if MutationStrategy::<R>::resets_at(self, attempt) {
            seed.clone_into(rolling);
        }
        let candidate = mutator.mutate(rolling, rng, Some(seen))?;
        candidate.clone_into(rolling);
        Ok(candidate)
    }
}

/// Chains `chain_len` mutations per round on the rolling seed without
/// duplicate filtering, restarting every `reset_period` attempts.
#[derive(Debug, Clone, Copy)]
pub struct ComplexStrategy {
    pub reset_period: u64,
    pub chain_len: usize,
}

impl Default for ComplexStrategy {
    fn default() -> Self {
        Self {
            reset_period: COMPLEX_RESET_PERIOD,
            chain_len: COMPLEX_CHAIN_LEN,
        }
    }
}

impl<R: Rng + ?Sized> MutationStrategy<R> for ComplexStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Complex
    }

    fn resets_at(&self, attempt: u64) -> bool {
        attempt.is_multiple_of(self.reset_period.max(1))
    }

    fn next_candidate(
        &self,
        seed: &str,
        rolling: &mut String,
        attempt: u64,
        mutator: &mut dyn Mutator<R>,
        rng: &mut R,
        _seen: &DedupCache,
    ) -> Result<String, MutationError> {
        if MutationStrategy::<R>::resets_at(self, attempt) {
            seed.clone_into(rolling);
        }
        let mut candidate = rolling.clone();
        for _ in 0..self.chain_len.max(1) {
            candidate = mutator.mutate(&candidate, rng, None)?;
        }
        candidate.clone_into(rolling);
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::RegexConstraint;
    use crate::mutator::RegexMutator;
    use rand_chacha::ChaCha8Rng;
    use rand_core::SeedableRng;

    /// Appends a marker and records every call it receives.
    #[derive(Default)]
    struct RecordingMutator {
        calls: Vec<(String, bool)>,
    }

    impl<R: Rng + ?Sized> Mutator<R> for RecordingMutator {
        fn mutate(
            &mut self,
            input: &str,
            _rng: &mut R,
            seen: Option<&DedupCache>,
        ) -> Result<String, MutationError> {
            self.calls.push((input.to_string(), seen.is_some()));
            Ok(format!("{input}+"))
        }
    }

    fn run_rounds(
        strategy: &dyn MutationStrategy<ChaCha8Rng>,
        rounds: u64,
    ) -> (RecordingMutator, Vec<String>) {
        let mut recorder = RecordingMutator::default();
        let mut rng = ChaCha8Rng::from_seed([0u8; 32]);
        let cache = DedupCache::default();
        let mut base = "seed".to_string();
        let mut outputs = Vec::new();
        for attempt in 0..rounds {
            let candidate = strategy
                .next_candidate("seed", &mut base, attempt, &mut recorder, &mut rng, &cache)
                .unwrap();
            outputs.push(candidate);
        }
        (recorder, outputs)
    }

    #[test]
    fn simple_strategy_always_mutates_the_seed_with_dedup() {
        let (recorder, outputs) = run_rounds(&SimpleStrategy, 30);
        assert_eq!(recorder.calls.len(), 30);
        for (input, dedup) in &recorder.calls {
            assert_eq!(input, "seed");
            assert!(*dedup);
        }
        assert!(outputs.iter().all(|o| o == "seed+"));
    }

    #[test]
    fn iterative_strategy_rolls_and_resets_every_25_attempts() {
        let strategy = IterativeStrategy::default();
        let (recorder, outputs) = run_rounds(&strategy, 60);
        assert_eq!(recorder.calls.len(), 60);

        for (attempt, (input, dedup)) in recorder.calls.iter().enumerate() {
            assert!(*dedup, "Iterative mode filters duplicates");
            if attempt.is_multiple_of(25) {
                assert_eq!(input, "seed", "Attempt {attempt} was not reset");
            } else {
                assert_ne!(input, "seed", "Attempt {attempt} should not be reset");
                assert_eq!(input, &outputs[attempt - 1]);
            }
        }
        assert_eq!(outputs[24], format!("seed{}", "+".repeat(25)));
        assert_eq!(outputs[25], "seed+");
    }

    #[test]
    fn complex_strategy_chains_two_mutations_without_dedup() {
        let strategy = ComplexStrategy::default();
        let (recorder, outputs) = run_rounds(&strategy, 25);
        assert_eq!(recorder.calls.len(), 50);

        for (attempt, output) in outputs.iter().enumerate() {
            let (first_input, first_dedup) = &recorder.calls[attempt * 2];
            let (second_input, second_dedup) = &recorder.calls[attempt * 2 + 1];
            assert!(!first_dedup && !second_dedup, "Complex mode skips dedup");
            assert_eq!(second_input, &format!("{first_input}+"));
            assert_eq!(output, &format!("{first_input}++"));

            if attempt.is_multiple_of(10) {
                assert_eq!(first_input, "seed");
            } else {
                assert_eq!(first_input, &outputs[attempt - 1]);
            }
        }
    }

    fn resets(strategy: &dyn MutationStrategy<ChaCha8Rng>, attempt: u64) -> bool {
        strategy.resets_at(attempt)
    }

    #[test]
    fn resets_at_matches_the_reset_periods() {
        let iterative = IterativeStrategy::default();
        let complex = ComplexStrategy::default();
        for attempt in 0..100u64 {
            assert_eq!(resets(&iterative, attempt), attempt.is_multiple_of(25));
            assert_eq!(resets(&complex, attempt), attempt.is_multiple_of(10));
            assert!(!resets(&SimpleStrategy, attempt));
        }
    }

    #[test]
    fn complex_round_with_regex_mutator_stays_within_constraint() {
        let constraint = RegexConstraint::compile("^[A-Za-z0-9!?]{6,11}$").unwrap();
        let mut mutator = RegexMutator::new(constraint.clone());
        let mut rng = ChaCha8Rng::from_seed([5u8; 32]);
        let cache = DedupCache::default();
        let strategy = ComplexStrategy::default();
        let mut rolling = String::new();

        for attempt in 0..40 {
            let candidate = MutationStrategy::<ChaCha8Rng>::next_candidate(
                &strategy,
                "Password12!",
                &mut rolling,
                attempt,
                &mut mutator,
                &mut rng,
                &cache,
            )
            .unwrap();
            assert!(constraint.full_match(&candidate));
            assert_eq!(rolling, candidate);
        }
    }

    #[test]
    fn strategy_kind_parses_codes_and_names() {
        assert_eq!(StrategyKind::try_from(0u8).unwrap(), StrategyKind::Simple);
        assert_eq!(
            StrategyKind::try_from(1u8).unwrap(),
            StrategyKind::Iterative
        );
        assert_eq!(StrategyKind::try_from(2u8).unwrap(), StrategyKind::Complex);
        assert!(matches!(
            StrategyKind::try_from(3u8),
            Err(ConfigError::InvalidFuzzType(3))
        ));

        #[derive(Deserialize)]
        struct Holder {
            kind: StrategyKind,
        }
        let by_code: Holder = toml::from_str("kind = 2").unwrap();
        assert_eq!(by_code.kind, StrategyKind::Complex);
        let by_name: Holder = toml::from_str("kind = \"iterative\"").unwrap();
        assert_eq!(by_name.kind, StrategyKind::Iterative);
        assert!(toml::from_str::<Holder>("kind = \"random\"").is_err());
        assert!(toml::from_str::<Holder>("kind = 9").is_err());
    }

    #[test]
    fn build_returns_the_matching_strategy() {
        for kind in [
            StrategyKind::Simple,
            StrategyKind::Iterative,
            StrategyKind::Complex,
        ] {
            assert_eq!(kind.build::<ChaCha8Rng>().kind(), kind);
        }
        assert_eq!(StrategyKind::Complex.to_string(), "2 (Complex)");
    }
}
