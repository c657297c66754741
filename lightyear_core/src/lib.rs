pub mod campaign;
pub mod config;
pub mod constraint;
pub mod controller;
pub mod dedup;
pub mod endpoint;
pub mod error;
pub mod mutator;
pub mod observer;
pub mod oracle;
pub mod strategy;

pub use campaign::{
    CampaignSettings, CampaignStats, CampaignSummary, IterationRecord, run_campaign,
};
pub use config::{LightyearConfig, ValidatedConfig};
pub use constraint::RegexConstraint;
pub use controller::{FuzzController, FuzzReport, FuzzSettings, TerminalReason};
pub use dedup::{ClearPolicy, DedupCache};
pub use endpoint::{
    AttemptOutcome, Endpoint, HttpEndpoint, HttpEndpointConfig, InProcessEndpoint,
};
pub use error::{ConfigError, FuzzError, MutationError};
pub use mutator::{EditKind, Mutator, RegexMutator};
pub use observer::{LogObserver, NoOpObserver, Observer};
pub use oracle::{Oracle, StatusCodeOracle};
pub use strategy::{
    ComplexStrategy, IterativeStrategy, MutationStrategy, SimpleStrategy, StrategyKind,
};
