use crate::endpoint::AttemptOutcome;

/// Status codes treated as a successful login by default.
pub const DEFAULT_SUCCESS_CODES: &[u16] = &[200];
/// Status codes treated as a fatal "target not found" by default.
pub const DEFAULT_NOT_FOUND_CODES: &[u16] = &[404];

/// An `Oracle` decides what a response status means for a login attempt.
pub trait Oracle: Send + Sync {
    /// Maps an HTTP status code to the outcome of the attempt.
    fn classify(&self, status: u16) -> AttemptOutcome;
}

/// Classifies by membership in fixed sets of status codes. Anything that is
/// neither a success nor a not-found code is a rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCodeOracle {
    success_codes: Vec<u16>,
    not_found_codes: Vec<u16>,
}

impl StatusCodeOracle {
    pub fn new(success_codes: Vec<u16>, not_found_codes: Vec<u16>) -> Self {
        Self {
            success_codes,
            not_found_codes,
        }
    }
}

impl Default for StatusCodeOracle {
    /// `200` is success, `404` is not-found.
    fn default() -> Self {
        Self::new(
            DEFAULT_SUCCESS_CODES.to_vec(),
            DEFAULT_NOT_FOUND_CODES.to_vec(),
        )
    }
}

impl Oracle for StatusCodeOracle {
    fn classify(&self, status: u16) -> AttemptOutcome {
        if self.success_codes.contains(&status) {
            AttemptOutcome::Success
        } else if self.not_found_codes.contains(&status) {
            AttemptOutcome::NotFound
        } else {
            AttemptOutcome::Rejected(status)
        }
    }
}
