use lightyear_core::campaign::{CampaignSummary, run_campaign};
use lightyear_core::config::{LightyearConfig, ValidatedConfig};
use lightyear_core::endpoint::HttpEndpoint;
use lightyear_core::error::FuzzError;
use lightyear_core::observer::{LogObserver, Observer};
use lightyear_core::strategy::StrategyKind;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use std::io::Write;
use std::path::PathBuf;

const BANNER: &str = r"
    Welcome to...
  _ _       _     _
 | (_) __ _| |__ | |_ _   _  ___  __ _ _ __
 | | |/ _` | '_ \| __| | | |/ _ \/ _` | '__|
 | | | (_| | | | | |_| |_| |  __/ (_| | |
 |_|_|\__, |_| |_|\__|\__, |\___|\__,_|_|
      |___/           |___/
";

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(short, long, value_parser)]
    config_file: Option<PathBuf>,
    /// Login endpoint, e.g. http://localhost:3000/login
    #[clap(long)]
    url: Option<String>,
    #[clap(long)]
    username: Option<String>,
    /// Known password the mutations start from
    #[clap(long)]
    seed: Option<String>,
    /// Format every candidate must fully match
    #[clap(long)]
    regex: Option<String>,
    /// Seconds before a run gives up (0 = unbounded)
    #[clap(long)]
    max_time: Option<u64>,
    /// Submissions before a run gives up (0 = unbounded)
    #[clap(long)]
    max_attempts: Option<u64>,
    /// 0 = Simple, 1 = Iterative, 2 = Complex
    #[clap(long)]
    fuzz_type: Option<u8>,
    #[clap(short, long)]
    iterations: Option<u32>,
    #[clap(long)]
    rng_seed: Option<u64>,
    #[clap(short, long)]
    verbose: bool,
    /// Start without waiting for confirmation
    #[clap(short, long)]
    yes: bool,
    /// Print the campaign summary as JSON
    #[clap(long)]
    json: bool,
}

fn load_config(cli: &Cli) -> anyhow::Result<LightyearConfig> {
    let config = match &cli.config_file {
        Some(config_path) => {
            log::info!("Loading configuration from specified path: {config_path:?}");
            LightyearConfig::load_from_file(config_path)?
        }
        None => {
            let default_config_path = PathBuf::from("lightyear.toml");
            if default_config_path.exists() {
                log::info!("Loading default configuration: {default_config_path:?}");
                LightyearConfig::load_from_file(&default_config_path)?
            } else {
                log::debug!("No config file found, using built-in defaults");
                LightyearConfig::default()
            }
        }
    };
    Ok(config)
}

fn apply_overrides(cli: &Cli, config: &mut LightyearConfig) -> anyhow::Result<()> {
    if let Some(url) = &cli.url {
        config.target.url = Some(url.clone());
    }
    if let Some(username) = &cli.username {
        config.target.username = Some(username.clone());
    }
    let fuzzer = &mut config.fuzzer;
    if let Some(seed) = &cli.seed {
        fuzzer.seed = Some(seed.clone());
    }
    if let Some(regex) = &cli.regex {
        fuzzer.regex = regex.clone();
    }
    if let Some(max_time) = cli.max_time {
        fuzzer.max_time_secs = max_time;
    }
    if let Some(max_attempts) = cli.max_attempts {
        fuzzer.max_attempts = max_attempts;
    }
    if let Some(code) = cli.fuzz_type {
        fuzzer.fuzz_type = StrategyKind::try_from(code)?;
    }
    if let Some(iterations) = cli.iterations {
        fuzzer.iterations = iterations;
    }
    if cli.rng_seed.is_some() {
        fuzzer.rng_seed = cli.rng_seed;
    }
    Ok(())
}

fn print_settings(validated: &ValidatedConfig, regex: &str, verbose: bool) {
    let campaign = &validated.campaign;
    println!("{BANNER}");
    println!("    Current Settings:\n");
    println!("URL: {}", validated.endpoint.url);
    println!("Username: {}", campaign.fuzz.username);
    println!("Seed Password: {}", campaign.fuzz.seed);
    println!("Regex Pattern: {regex}");
    println!("Max Time: {} seconds", campaign.fuzz.max_time.as_secs());
    println!("Max Attempts: {}", campaign.fuzz.max_attempts);
    println!("Fuzz Type: {}", campaign.strategy);
    println!("Iterations: {}", campaign.iterations);
    println!("Verbose: {verbose}");
    println!("\n\nLightyear is ready to launch!\n");
}

fn wait_for_confirmation() -> anyhow::Result<()> {
    print!("\nPress enter when you are ready to begin fuzzing!");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read confirmation from stdin")?;
    Ok(())
}

fn print_summary(summary: &CampaignSummary) {
    let stats = summary.stats();
    println!("\n=== Summary ===");
    println!("Total Average Time: {:.2} seconds", stats.average_time_secs);
    println!("Total Average Attempts: {:.2}", stats.average_attempts);
    println!(
        "Average Time for Successful Iterations: {:.2} seconds",
        stats.average_success_time_secs
    );
    println!(
        "Average Attempts for Successful Iterations: {:.2}",
        stats.average_success_attempts
    );
    println!("Successes: {}", stats.successes);
    println!("Failures: {}", stats.failures);
}

fn exit_code(fatal: Option<&FuzzError>) -> i32 {
    match fatal {
        None => 0,
        Some(FuzzError::TargetNotFound { .. }) => 1,
        Some(FuzzError::Transport { .. } | FuzzError::Mutation(_)) => 2,
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let env = Env::default().default_filter_or(default_filter);
    env_logger::Builder::from_env(env).init();

    let mut config = load_config(&cli)?;
    apply_overrides(&cli, &mut config)?;
    let validated = config.validate().context("Invalid configuration")?;

    print_settings(&validated, &config.fuzzer.regex, cli.verbose);
    if !cli.yes {
        wait_for_confirmation()?;
    }

    let rng_seed = validated.rng_seed.unwrap_or_else(rand::random);
    log::info!("Using RNG seed {rng_seed}");
    let mut rng = ChaCha8Rng::seed_from_u64(rng_seed);

    let ValidatedConfig {
        campaign,
        mutator,
        endpoint,
        oracle,
        ..
    } = validated;
    let url = endpoint.url.clone();
    let mut endpoint = HttpEndpoint::with_oracle(endpoint, Box::new(oracle))
        .with_context(|| format!("Failed to build HTTP client for {url}"))?;

    let mut log_observer = LogObserver::new(cli.verbose);
    let mut sinks: Vec<&mut dyn Observer> = vec![&mut log_observer];

    let summary = run_campaign(&campaign, &mutator, &mut endpoint, &mut rng, &mut sinks);

    if cli.json {
        let report = serde_json::json!({
            "rng_seed": rng_seed,
            "summary": &summary,
            "stats": summary.stats(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if campaign.iterations > 1 {
        print_summary(&summary);
    }

    let code = exit_code(summary.fatal());
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightyear_core::error::MutationError;

    #[test]
    fn cli_flags_override_file_settings() {
        let cli = Cli::parse_from([
            "lightyear",
            "--url",
            "http://localhost:3000/login",
            "--username",
            "al",
            "--seed",
            "Toy2Barn!",
            "--fuzz-type",
            "1",
            "--max-attempts",
            "25",
            "--yes",
        ]);
        let mut config = LightyearConfig::default();
        config.fuzzer.max_time_secs = 5;
        apply_overrides(&cli, &mut config).unwrap();

        let validated = config.validate().unwrap();
        assert_eq!(validated.campaign.strategy, StrategyKind::Iterative);
        assert_eq!(validated.campaign.fuzz.max_attempts, 25);
        assert_eq!(validated.campaign.fuzz.max_time.as_secs(), 5);
        assert_eq!(validated.campaign.fuzz.seed, "Toy2Barn!");
    }

    #[test]
    fn out_of_range_fuzz_type_is_rejected() {
        let cli = Cli::parse_from(["lightyear", "--fuzz-type", "3"]);
        let mut config = LightyearConfig::default();
        assert!(apply_overrides(&cli, &mut config).is_err());
    }

    #[test]
    fn fatal_errors_map_to_exit_codes() {
        assert_eq!(exit_code(None), 0);
        let not_found = FuzzError::TargetNotFound { attempts: 1 };
        assert_eq!(exit_code(Some(&not_found)), 1);
        let transport = FuzzError::Transport {
            attempts: 2,
            message: "refused".to_string(),
        };
        assert_eq!(exit_code(Some(&transport)), 2);
        let infeasible = FuzzError::Mutation(MutationError::Infeasible {
            input: "ab".to_string(),
            retries: 10,
        });
        assert_eq!(exit_code(Some(&infeasible)), 2);
    }
}
