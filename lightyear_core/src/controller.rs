use crate::dedup::DedupCache;
use crate::endpoint::{AttemptOutcome, Endpoint};
use crate::error::{FuzzError, MutationError};
use crate::mutator::{Mutator, RegexMutator};
use crate::observer::Observer;
use crate::strategy::{MutationStrategy, StrategyKind};
use rand::Rng;
use std::fmt;
use std::time::{Duration, Instant};

/// Per-run inputs of the controller. Budgets of zero mean unbounded.
#[derive(Debug, Clone)]
pub struct FuzzSettings {
    pub username: String,
    pub seed: String,
    pub max_attempts: u64,
    pub max_time: Duration,
}

/// Why a fuzz run stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalReason {
    Success,
    Timeout,
    AttemptsExhausted,
    NotFound,
    TransportError(String),
    InfeasibleMutation(MutationError),
}

impl TerminalReason {
    /// Reasons that should stop any further runs against the same target.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TerminalReason::NotFound
                | TerminalReason::TransportError(_)
                | TerminalReason::InfeasibleMutation(_)
        )
    }
}

impl fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalReason::Success => write!(f, "success"),
            TerminalReason::Timeout => write!(f, "timeout"),
            TerminalReason::AttemptsExhausted => write!(f, "attempts-exhausted"),
            TerminalReason::NotFound => write!(f, "not-found"),
            TerminalReason::TransportError(_) => write!(f, "transport-error"),
            TerminalReason::InfeasibleMutation(_) => write!(f, "infeasible-mutation"),
        }
    }
}

/// Result of one fuzz run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzReport {
    /// The accepted password, if the run succeeded.
    pub password: Option<String>,
    pub attempts: u64,
    pub elapsed: Duration,
    pub reason: TerminalReason,
}

impl FuzzReport {
    pub fn is_success(&self) -> bool {
        self.reason == TerminalReason::Success
    }

    /// Converts fatal reasons into a [`FuzzError`]; other reports pass through.
    pub fn into_result(self) -> Result<FuzzReport, FuzzError> {
        let attempts = self.attempts;
        match self.reason {
            TerminalReason::NotFound => Err(FuzzError::TargetNotFound { attempts }),
            TerminalReason::TransportError(message) => {
                Err(FuzzError::Transport { attempts, message })
            }
            TerminalReason::InfeasibleMutation(e) => Err(FuzzError::Mutation(e)),
            _ => Ok(self),
        }
    }
}

/// Mutable state of a single run; created at the start of
/// [`FuzzController::run`] and dropped when it returns.
#[derive(Debug)]
pub struct FuzzState {
    pub current_attempt_count: u64,
    pub start_time: Instant,
    pub past_mutation: String,
}

impl FuzzState {
    fn new(seed: &str) -> Self {
        Self {
            current_attempt_count: 0,
            start_time: Instant::now(),
            past_mutation: seed.to_string(),
        }
    }

    fn finish(self, password: Option<String>, reason: TerminalReason) -> FuzzReport {
        FuzzReport {
            password,
            attempts: self.current_attempt_count,
            elapsed: self.start_time.elapsed(),
            reason,
        }
    }
}

/// The budgeted search loop: draw a candidate, submit it, interpret the
/// outcome, repeat.
pub struct FuzzController<R: Rng + ?Sized> {
    settings: FuzzSettings,
    strategy: Box<dyn MutationStrategy<R>>,
    mutator: Box<dyn Mutator<R>>,
}

impl<R: Rng + ?Sized> FuzzController<R> {
    pub fn new(settings: FuzzSettings, kind: StrategyKind, mutator: RegexMutator) -> Self {
        Self::with_parts(settings, kind.build(), Box::new(mutator))
    }

    pub fn with_parts(
        settings: FuzzSettings,
        strategy: Box<dyn MutationStrategy<R>>,
        mutator: Box<dyn Mutator<R>>,
    ) -> Self {
        Self {
            settings,
            strategy,
            mutator,
        }
    }

    pub fn settings(&self) -> &FuzzSettings {
        &self.settings
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    /// Runs until success, a budget is exhausted, or the endpoint reports a
    /// fatal condition.
    ///
    /// Budgets are checked after each round completes, so an in-flight
    /// submission is never interrupted. The attempt budget stops the run once
    /// `max_attempts` candidates have been submitted.
    ///
    /// # Arguments
    /// * `endpoint`: Where candidates are submitted.
    /// * `cache`: Rejected candidates; may be shared across runs by the caller.
    /// * `rng`: Source of randomness for the mutator.
    /// * `observers`: Notified of every attempt and of the final report.
    pub fn run(
        &mut self,
        endpoint: &mut dyn Endpoint,
        cache: &mut DedupCache,
        rng: &mut R,
        observers: &mut [&mut dyn Observer],
    ) -> FuzzReport {
        let report = self.run_inner(endpoint, cache, rng, observers);
        for obs in observers.iter_mut() {
            obs.on_finish(&report);
        }
        report
    }

    fn run_inner(
        &mut self,
        endpoint: &mut dyn Endpoint,
        cache: &mut DedupCache,
        rng: &mut R,
        observers: &mut [&mut dyn Observer],
    ) -> FuzzReport {
        let settings = &self.settings;
        let mut state = FuzzState::new(&settings.seed);
        log::debug!(
            "Starting {:?} run from seed '{}' (max attempts: {}, max time: {:?})",
            self.strategy.kind(),
            settings.seed,
            settings.max_attempts,
            settings.max_time
        );

        loop {
            let candidate = match self.strategy.next_candidate(
                &settings.seed,
                &mut state.past_mutation,
                state.current_attempt_count,
                &mut *self.mutator,
                rng,
                cache,
            ) {
                Ok(candidate) => candidate,
                Err(e) => {
                    log::error!(
                        "Aborting after {} attempts: {e}",
                        state.current_attempt_count
                    );
                    return state.finish(None, TerminalReason::InfeasibleMutation(e));
                }
            };
            state.current_attempt_count += 1;
            let attempt = state.current_attempt_count;

            let outcome = endpoint.submit(&settings.username, &candidate);
            for obs in observers.iter_mut() {
                obs.on_attempt(attempt, &candidate, &outcome);
            }

            match outcome {
                AttemptOutcome::NotFound => {
                    return state.finish(None, TerminalReason::NotFound);
                }
                AttemptOutcome::Success => {
                    return state.finish(Some(candidate), TerminalReason::Success);
                }
                AttemptOutcome::TransportError(message) => {
                    return state.finish(None, TerminalReason::TransportError(message));
                }
                AttemptOutcome::Rejected(_) => {
                    cache.insert(&candidate);
                    cache.after_attempt(attempt);
                }
            }

            if !settings.max_time.is_zero() && state.start_time.elapsed() > settings.max_time {
                return state.finish(None, TerminalReason::Timeout);
            }
            if settings.max_attempts != 0 && attempt >= settings.max_attempts {
                return state.finish(None, TerminalReason::AttemptsExhausted);
            }
        }
    }
}
