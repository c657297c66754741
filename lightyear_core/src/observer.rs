use crate::controller::{FuzzReport, TerminalReason};
use crate::endpoint::AttemptOutcome;

/// An `Observer` is notified by the controller as a fuzz run progresses.
///
/// Observers see every submitted candidate and its outcome, and the final
/// report once the run stops. They cannot influence the run.
pub trait Observer {
    /// Returns a static string name identifying the observer.
    fn name(&self) -> &'static str;

    /// Called after each submission, with the 1-based attempt number.
    fn on_attempt(&mut self, attempt: u64, candidate: &str, outcome: &AttemptOutcome);

    /// Called once when the run terminates, for whatever reason.
    fn on_finish(&mut self, report: &FuzzReport);
}

#[derive(Debug, Default)]
pub struct NoOpObserver;

impl Observer for NoOpObserver {
    fn name(&self) -> &'static str {
        "NoOpObserver"
    }

    fn on_attempt(&mut self, _attempt: u64, _candidate: &str, _outcome: &AttemptOutcome) {}

    fn on_finish(&mut self, _report: &FuzzReport) {}
}

/// Reports progress through the `log` facade.
///
/// Per-attempt lines go out at `info` when `verbose` is set and at `trace`
/// otherwise.
#[derive(Debug, Default)]
pub struct LogObserver {
    verbose: bool,
}

impl LogObserver {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// The headline for a finished run.
    pub fn finish_message(report: &FuzzReport) -> String {
        match (&report.reason, &report.password) {
            (TerminalReason::Success, Some(password)) => {
                format!("Success! Password is: {password}")
            }
            (TerminalReason::Success, None) => "Success!".to_string(),
            (TerminalReason::Timeout, _) => "Max Time Reached. Aborting Process".to_string(),
            (TerminalReason::AttemptsExhausted, _) => {
                "Max Attempts Reached. Aborting Process".to_string()
            }
            (TerminalReason::NotFound, _) => "Error 404: URL not found".to_string(),
            (TerminalReason::TransportError(msg), _) => format!("Transport error: {msg}"),
            (TerminalReason::InfeasibleMutation(e), _) => e.to_string(),
        }
    }

    /// Execution time and attempt count of a finished run.
    pub fn totals_message(report: &FuzzReport) -> String {
        format!(
            "Total Execution Time: {:.2} seconds, Total Attempts: {}",
            report.elapsed.as_secs_f64(),
            report.attempts
        )
    }

    /// Level for the end-of-run lines: successes, fatal stops and verbose
    /// runs are always shown at the default filter.
    fn finish_level(&self, report: &FuzzReport) -> log::Level {
        if report.is_success() || report.reason.is_fatal() || self.verbose {
            log::Level::Info
        } else {
            log::Level::Debug
        }
    }
}

impl Observer for LogObserver {
    fn name(&self) -> &'static str {
        "LogObserver"
    }

    fn on_attempt(&mut self, attempt: u64, candidate: &str, outcome: &AttemptOutcome) {
        if self.verbose {
            log::info!("Attempt: {attempt}, produced: {candidate}");
        } else {
            log::trace!("Attempt: {attempt}, produced: {candidate} ({outcome})");
        }
    }

    fn on_finish(&mut self, report: &FuzzReport) {
        let headline = Self::finish_message(report);
        let level = self.finish_level(report);
        if report.reason.is_fatal() {
            log::error!("{headline}");
        } else {
            log::log!(level, "{headline}");
        }
        log::log!(level, "{}", Self::totals_message(report));
    }
}
