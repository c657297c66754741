use crate::campaign::CampaignSettings;
use crate::constraint::RegexConstraint;
use crate::controller::FuzzSettings;
use crate::dedup::{ClearPolicy, DEFAULT_CLEAR_THRESHOLD};
use crate::endpoint::HttpEndpointConfig;
use crate::error::ConfigError;
use crate::mutator::{DEFAULT_INSERT_SYMBOLS, DEFAULT_MAX_RETRIES, RegexMutator};
use crate::oracle::{DEFAULT_NOT_FOUND_CODES, DEFAULT_SUCCESS_CODES, StatusCodeOracle};
use crate::strategy::StrategyKind;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_REGEX: &str = "^[A-Za-z0-9!?]{6,11}$";

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct TargetSettings {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    concat!("lightyear/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            request_timeout_ms: default_request_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct FuzzerSettings {
    #[serde(default)]
    pub seed: Option<String>,
    #[serde(default = "default_regex")]
    pub regex: String,
    #[serde(default = "default_max_time_secs")]
    pub max_time_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u64,
    #[serde(default)]
    pub fuzz_type: StrategyKind,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default)]
    pub rng_seed: Option<u64>,
    #[serde(default = "default_max_mutation_retries")]
    pub max_mutation_retries: u64,
    #[serde(default = "default_insert_symbols")]
    pub insert_symbols: String,
    #[serde(default = "default_cache_clear_threshold")]
    pub cache_clear_threshold: u64,
    #[serde(default)]
    pub cache_clear_policy: ClearPolicy,
    #[serde(default)]
    pub share_cache: bool,
}

fn default_regex() -> String {
    DEFAULT_REGEX.to_string()
}
pub fn default_max_time_secs() -> u64 {
    60
}
pub fn default_max_attempts() -> u64 {
    500
}
pub fn default_iterations() -> u32 {
    1
}
fn default_max_mutation_retries() -> u64 {
    DEFAULT_MAX_RETRIES
}
fn default_insert_symbols() -> String {
    DEFAULT_INSERT_SYMBOLS.to_string()
}
fn default_cache_clear_threshold() -> u64 {
    DEFAULT_CLEAR_THRESHOLD
}

impl Default for FuzzerSettings {
    fn default() -> Self {
        Self {
            seed: None,
            regex: default_regex(),
            max_time_secs: default_max_time_secs(),
            max_attempts: default_max_attempts(),
            fuzz_type: StrategyKind::default(),
            iterations: default_iterations(),
            rng_seed: None,
            max_mutation_retries: default_max_mutation_retries(),
            insert_symbols: default_insert_symbols(),
            cache_clear_threshold: default_cache_clear_threshold(),
            cache_clear_policy: ClearPolicy::default(),
            share_cache: false,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct OracleSettings {
    #[serde(default = "default_success_codes")]
    pub success_codes: Vec<u16>,
    #[serde(default = "default_not_found_codes")]
    pub not_found_codes: Vec<u16>,
}

fn default_success_codes() -> Vec<u16> {
    DEFAULT_SUCCESS_CODES.to_vec()
}
fn default_not_found_codes() -> Vec<u16> {
    DEFAULT_NOT_FOUND_CODES.to_vec()
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            success_codes: default_success_codes(),
            not_found_codes: default_not_found_codes(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct LightyearConfig {
    #[serde(default)]
    pub target: TargetSettings,
    #[serde(default)]
    pub fuzzer: FuzzerSettings,
    #[serde(default)]
    pub oracle: OracleSettings,
}

/// A configuration that passed [`LightyearConfig::validate`], with its parts
/// ready to hand to the controller and the HTTP endpoint.
#[derive(Debug)]
pub struct ValidatedConfig {
    pub campaign: CampaignSettings,
    pub mutator: RegexMutator,
    pub endpoint: HttpEndpointConfig,
    pub oracle: StatusCodeOracle,
    pub rng_seed: Option<u64>,
}

fn out_of_range(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        reason: reason.into(),
    }
}

impl LightyearConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: Default::default(),
            message: e.to_string(),
        })
    }

    /// Checks every setting before any request is sent.
    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        let url = self
            .target
            .url
            .clone()
            .ok_or_else(|| out_of_range("url", "a target URL is required"))?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(url));
        }
        let username = self
            .target
            .username
            .clone()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| out_of_range("username", "a target username is required"))?;
        if self.target.request_timeout_ms == 0 {
            return Err(out_of_range("request-timeout-ms", "must be at least 1"));
        }

        let fuzzer = &self.fuzzer;
        let seed = fuzzer
            .seed
            .clone()
            .ok_or_else(|| out_of_range("seed", "a seed password is required"))?;
        let constraint = RegexConstraint::compile(&fuzzer.regex)?;
        constraint.validate_seed(&seed)?;
        if fuzzer.iterations == 0 {
            return Err(out_of_range("iterations", "must be at least 1"));
        }
        if fuzzer.max_mutation_retries == 0 {
            return Err(out_of_range("max-mutation-retries", "must be at least 1"));
        }
        if fuzzer.cache_clear_threshold == 0 {
            return Err(out_of_range("cache-clear-threshold", "must be at least 1"));
        }

        let oracle = &self.oracle;
        if oracle.success_codes.is_empty() {
            return Err(out_of_range(
                "success-codes",
                "at least one code is required",
            ));
        }
        for code in oracle.success_codes.iter().chain(&oracle.not_found_codes) {
            if !(100..=599).contains(code) {
                return Err(out_of_range(
                    "oracle",
                    format!("{code} is not an HTTP status code"),
                ));
            }
        }
        if let Some(code) = oracle
            .success_codes
            .iter()
            .find(|code| oracle.not_found_codes.contains(*code))
        {
            return Err(out_of_range(
                "oracle",
                format!("{code} cannot be both a success and a not-found code"),
            ));
        }

        let campaign = CampaignSettings {
            fuzz: FuzzSettings {
                username,
                seed,
                max_attempts: fuzzer.max_attempts,
                max_time: Duration::from_secs(fuzzer.max_time_secs),
            },
            strategy: fuzzer.fuzz_type,
            iterations: fuzzer.iterations,
            share_cache: fuzzer.share_cache,
            clear_policy: fuzzer.cache_clear_policy,
            clear_threshold: fuzzer.cache_clear_threshold,
        };
        let mutator = RegexMutator::new(constraint)
            .with_insert_symbols(&fuzzer.insert_symbols)
            .with_max_retries(fuzzer.max_mutation_retries);
        let endpoint = HttpEndpointConfig {
            url,
            timeout: Duration::from_millis(self.target.request_timeout_ms),
            user_agent: self.target.user_agent.clone(),
        };

        Ok(ValidatedConfig {
            campaign,
            mutator,
            endpoint,
            oracle: StatusCodeOracle::new(
                oracle.success_codes.clone(),
                oracle.not_found_codes.clone(),
            ),
            rng_seed: fuzzer.rng_seed,
        })
    }
}
