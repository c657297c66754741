//! Error types for the fuzzer.
//!
//! Configuration problems are reported before any request is sent. Failures
//! that end a fuzz run early are carried by [`FuzzError`].

use std::path::PathBuf;
use thiserror::Error;

/// Errors detected while loading or validating a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The password format is not a valid regular expression.
    #[error("Invalid regex pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The seed password does not fully match the format pattern.
    #[error("Seed '{seed}' must fully match regex: {pattern}")]
    SeedMismatch { seed: String, pattern: String },

    #[error("URL must start with http:// or https://, got '{0}'")]
    InvalidUrl(String),

    #[error("Fuzz type must be 0, 1, or 2, got {0}")]
    InvalidFuzzType(u8),

    /// A numeric or textual setting is outside of its accepted range.
    #[error("Invalid value for {field}: {reason}")]
    OutOfRange {
        /// The offending key, as written in the config file.
        field: &'static str,
        reason: String,
    },

    #[error("Failed to read config file at {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML from config file {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Errors raised by a [`Mutator`](crate::mutator::Mutator).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    /// Rejection sampling gave up: no single edit of `input` produced a
    /// candidate accepted by the constraint (and the dedup cache) within
    /// `retries` draws.
    #[error("No feasible mutation of '{input}' found after {retries} retries")]
    Infeasible { input: String, retries: u64 },
}

/// Fatal outcomes of a fuzz run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FuzzError {
    #[error("Error 404: URL not found (after {attempts} attempts)")]
    TargetNotFound { attempts: u64 },

    #[error("Transport error after {attempts} attempts: {message}")]
    Transport { attempts: u64, message: String },

    #[error(transparent)]
    Mutation(#[from] MutationError),
}
