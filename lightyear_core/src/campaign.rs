use crate::controller::{FuzzController, FuzzReport, FuzzSettings, TerminalReason};
use crate::dedup::{ClearPolicy, DedupCache};
use crate::endpoint::Endpoint;
use crate::error::FuzzError;
use crate::mutator::RegexMutator;
use crate::observer::Observer;
use crate::strategy::StrategyKind;
use rand::Rng;
use serde::Serialize;

/// Everything needed to repeat the same fuzz run several times.
#[derive(Debug, Clone)]
pub struct CampaignSettings {
    pub fuzz: FuzzSettings,
    pub strategy: StrategyKind,
    pub iterations: u32,
    /// Reuse one dedup cache for every iteration instead of starting fresh.
    pub share_cache: bool,
    pub clear_policy: ClearPolicy,
    pub clear_threshold: u64,
}

impl CampaignSettings {
    fn new_cache(&self) -> DedupCache {
        DedupCache::new(self.clear_policy, self.clear_threshold)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationRecord {
    /// 1-based.
    pub iteration: u32,
    pub password: Option<String>,
    pub attempts: u64,
    pub elapsed_secs: f64,
    pub reason: String,
}

/// Aggregate figures over the iterations of a campaign.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignStats {
    pub runs: usize,
    pub average_time_secs: f64,
    pub average_attempts: f64,
    pub average_success_time_secs: f64,
    pub average_success_attempts: f64,
    pub successes: u32,
    pub failures: u32,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct CampaignSummary {
    pub iterations: Vec<IterationRecord>,
    total_attempts: u64,
    total_time_secs: f64,
    success_attempts: u64,
    success_time_secs: f64,
    successes: u32,
    failures: u32,
    #[serde(skip)]
    fatal: Option<FuzzError>,
}

impl CampaignSummary {
    pub fn record(&mut self, iteration: u32, report: &FuzzReport) {
        let elapsed_secs = report.elapsed.as_secs_f64();
        self.total_attempts += report.attempts;
        self.total_time_secs += elapsed_secs;
        if report.is_success() {
            self.successes += 1;
            self.success_attempts += report.attempts;
            self.success_time_secs += elapsed_secs;
        } else {
            self.failures += 1;
        }
        if let Err(e) = report.clone().into_result() {
            self.fatal = Some(e);
        }
        self.iterations.push(IterationRecord {
            iteration,
            password: report.password.clone(),
            attempts: report.attempts,
            elapsed_secs,
            reason: report.reason.to_string(),
        });
    }

    /// The error that stopped the campaign early, if any.
    pub fn fatal(&self) -> Option<&FuzzError> {
        self.fatal.as_ref()
    }

    pub fn stats(&self) -> CampaignStats {
        let runs = self.iterations.len();
        let mean = |total: f64, count: f64| if count > 0.0 { total / count } else { 0.0 };
        CampaignStats {
            runs,
            average_time_secs: mean(self.total_time_secs, runs as f64),
            average_attempts: mean(self.total_attempts as f64, runs as f64),
            average_success_time_secs: mean(self.success_time_secs, self.successes as f64),
            average_success_attempts: mean(self.success_attempts as f64, self.successes as f64),
            successes: self.successes,
            failures: self.failures,
        }
    }
}

/// Runs `settings.iterations` independent fuzz runs against one endpoint.
///
/// Stops early when a run ends for a fatal reason; the summary then carries
/// the corresponding [`FuzzError`].
pub fn run_campaign<R: Rng + ?Sized>(
    settings: &CampaignSettings,
    mutator: &RegexMutator,
    endpoint: &mut dyn Endpoint,
    rng: &mut R,
    observers: &mut [&mut dyn Observer],
) -> CampaignSummary {
    let mut summary = CampaignSummary::default();
    let mut shared_cache = settings.new_cache();

    for iteration in 1..=settings.iterations.max(1) {
        if settings.iterations > 1 {
            log::info!("--- Fuzzing Iteration {iteration} ---");
        }

        let mut controller: FuzzController<R> =
            FuzzController::new(settings.fuzz.clone(), settings.strategy, mutator.clone());
        let report = if settings.share_cache {
            controller.run(endpoint, &mut shared_cache, rng, observers)
        } else {
            let mut cache = settings.new_cache();
            controller.run(endpoint, &mut cache, rng, observers)
        };

        if settings.iterations > 1 {
            match report.reason {
                TerminalReason::Success => log::info!(
                    "Iteration {iteration} succeeded in {:.2} seconds after {} attempts with password: {}",
                    report.elapsed.as_secs_f64(),
                    report.attempts,
                    report.password.as_deref().unwrap_or_default()
                ),
                _ => log::info!(
                    "Iteration {iteration} failed after {:.2} seconds with {} attempts",
                    report.elapsed.as_secs_f64(),
                    report.attempts
                ),
            }
        }

        summary.record(iteration, &report);
        if report.reason.is_fatal() {
            log::warn!(
                "Stopping after iteration {iteration} of {}: {}",
                settings.iterations,
                report.reason
            );
            break;
        }
    }
    summary
}
