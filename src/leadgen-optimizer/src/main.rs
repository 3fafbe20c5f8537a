//! Leadgen Optimizer: command-line front end for the Thompson sampling engine
//! behind automatic A/B-test traffic optimization.
//!
//! Reads variant snapshots as JSON, runs one engine operation and prints the
//! result as JSON on stdout. Logs go to stderr.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use leadgen_core::config::AppConfig;
use leadgen_core::{VariantRecord, VariantState};
use leadgen_rl_engine::{engine_rng, variant_statistics, BanditEngine};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "leadgen-optimizer")]
#[command(about = "Bayesian traffic optimizer for lead-generation A/B tests")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "LEADGEN_CONFIG")]
    config: Option<PathBuf>,

    /// RNG seed for reproducible results (OS entropy when absent)
    #[arg(long, env = "LEADGEN_SEED")]
    seed: Option<u64>,

    /// Monte Carlo trials for allocation and expected loss (overrides config)
    #[arg(long)]
    simulations: Option<usize>,

    /// Minimum impressions per variant before optimizing (overrides config)
    #[arg(long)]
    min_sample_size: Option<u64>,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pick the variant to serve for the next impression
    Select {
        #[command(flatten)]
        input: VariantsInput,
        /// Exploration bonus added to both Beta parameters (overrides config)
        #[arg(long)]
        exploration_rate: Option<f64>,
    },
    /// Compute traffic allocation ratios
    Allocate {
        #[command(flatten)]
        input: VariantsInput,
    },
    /// Decide whether a variant can be declared the winner
    Winner {
        #[command(flatten)]
        input: VariantsInput,
        /// Required probability of being best (overrides config)
        #[arg(long)]
        confidence_threshold: Option<f64>,
    },
    /// Expected loss of committing to each variant
    Loss {
        #[command(flatten)]
        input: VariantsInput,
    },
    /// Statistics bundle for a single variant
    Stats {
        #[arg(long)]
        alpha: f64,
        #[arg(long)]
        beta: f64,
        #[arg(long, default_value_t = 0)]
        impressions: u64,
        #[arg(long, default_value_t = 0)]
        conversions: u64,
        /// Credible interval level (defaults to config)
        #[arg(long)]
        confidence: Option<f64>,
    },
    /// Full experiment report
    Report {
        #[command(flatten)]
        input: VariantsInput,
    },
}

#[derive(Args, Debug)]
struct VariantsInput {
    /// JSON file holding an array of variant records
    #[arg(long)]
    variants: PathBuf,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "leadgen_optimizer=info,leadgen_rl_engine=info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_variants(engine: &BanditEngine, path: &Path) -> anyhow::Result<Vec<VariantState>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading variants from {}", path.display()))?;
    let records: Vec<VariantRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing variants in {}", path.display()))?;
    let variants = engine.states_from_records(records)?;
    for variant in &variants {
        variant.check_consistency()?;
    }
    info!(count = variants.len(), path = %path.display(), "Variants loaded");
    Ok(variants)
}

/// Loads the TOML file when given, then environment overrides. Invalid
/// values are errors; an absent file is only tolerated when none was named.
fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    AppConfig::load_from(path).with_context(|| match path {
        Some(path) => format!("loading config from {}", path.display()),
        None => "loading config from LEADGEN__ environment".to_string(),
    })
}

fn emit<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn sorted(map: leadgen_core::AllocationMap) -> BTreeMap<String, f64> {
    map.into_iter().collect()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    init_tracing(cli.json_logs || config.log_json);

    // Apply CLI overrides
    if let Some(simulations) = cli.simulations {
        config.bandit.num_simulations = simulations;
    }
    if let Some(min_sample_size) = cli.min_sample_size {
        config.bandit.min_sample_size = min_sample_size;
    }
    match &cli.command {
        Command::Select {
            exploration_rate: Some(rate),
            ..
        } => config.bandit.exploration_rate = *rate,
        Command::Winner {
            confidence_threshold: Some(threshold),
            ..
        } => config.bandit.confidence_threshold = *threshold,
        _ => {}
    }

    info!(
        node_id = %config.node_id,
        num_simulations = config.bandit.num_simulations,
        winner_num_simulations = config.bandit.winner_num_simulations,
        min_sample_size = config.bandit.min_sample_size,
        seeded = cli.seed.is_some(),
        "Configuration loaded"
    );

    let engine = BanditEngine::new(config.bandit.clone()).context("invalid bandit configuration")?;
    let mut rng = engine_rng(cli.seed);

    match cli.command {
        Command::Select { input, .. } => {
            let variants = load_variants(&engine, &input.variants)?;
            emit(&engine.select_variant(&variants, &mut rng)?)
        }
        Command::Allocate { input } => {
            let variants = load_variants(&engine, &input.variants)?;
            emit(&sorted(engine.allocate_traffic(&variants, &mut rng)?))
        }
        Command::Winner { input, .. } => {
            let variants = load_variants(&engine, &input.variants)?;
            emit(&engine.determine_winner(&variants, &mut rng)?)
        }
        Command::Loss { input } => {
            let variants = load_variants(&engine, &input.variants)?;
            emit(&sorted(engine.expected_loss(&variants, &mut rng)?))
        }
        Command::Stats {
            alpha,
            beta,
            impressions,
            conversions,
            confidence,
        } => {
            let confidence = confidence.unwrap_or(config.bandit.credible_level);
            emit(&variant_statistics(
                alpha,
                beta,
                impressions,
                conversions,
                confidence,
            )?)
        }
        Command::Report { input } => {
            let variants = load_variants(&engine, &input.variants)?;
            emit(&engine.report(&variants, &mut rng)?)
        }
    }
}
