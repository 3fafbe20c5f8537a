use crate::error::{EngineError, EngineResult};
use crate::types::BetaPrior;
use serde::Deserialize;
use std::path::Path;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `LEADGEN__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub log_json: bool,
    #[serde(default)]
    pub bandit: BanditConfig,
}

/// Tuning knobs for the Thompson sampling engine.
#[derive(Debug, Clone, Deserialize)]
pub struct BanditConfig {
    /// Monte Carlo trials for reporting-time allocation and expected loss.
    #[serde(default = "default_num_simulations")]
    pub num_simulations: usize,
    /// Monte Carlo trials when deciding a winner.
    #[serde(default = "default_winner_num_simulations")]
    pub winner_num_simulations: usize,
    #[serde(default = "default_min_sample_size")]
    pub min_sample_size: u64,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_exploration_rate")]
    pub exploration_rate: f64,
    #[serde(default = "default_credible_level")]
    pub credible_level: f64,
    /// Rows drawn per batched simulation block.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_prior_alpha")]
    pub prior_alpha: f64,
    #[serde(default = "default_prior_beta")]
    pub prior_beta: f64,
}

// Default functions
fn default_node_id() -> String {
    "optimizer-01".to_string()
}
fn default_num_simulations() -> usize {
    10_000
}
fn default_winner_num_simulations() -> usize {
    50_000
}
fn default_min_sample_size() -> u64 {
    100
}
fn default_confidence_threshold() -> f64 {
    0.95
}
fn default_exploration_rate() -> f64 {
    0.1
}
fn default_credible_level() -> f64 {
    0.95
}
fn default_batch_size() -> usize {
    4_096
}
fn default_prior_alpha() -> f64 {
    1.0
}
fn default_prior_beta() -> f64 {
    1.0
}

impl Default for BanditConfig {
    fn default() -> Self {
        Self {
            num_simulations: default_num_simulations(),
            winner_num_simulations: default_winner_num_simulations(),
            min_sample_size: default_min_sample_size(),
            confidence_threshold: default_confidence_threshold(),
            exploration_rate: default_exploration_rate(),
            credible_level: default_credible_level(),
            batch_size: default_batch_size(),
            prior_alpha: default_prior_alpha(),
            prior_beta: default_prior_beta(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            log_json: false,
            bandit: BanditConfig::default(),
        }
    }
}

impl BanditConfig {
    pub fn prior(&self) -> EngineResult<BetaPrior> {
        BetaPrior::new(self.prior_alpha, self.prior_beta)
            .map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.num_simulations == 0 || self.winner_num_simulations == 0 {
            return Err(EngineError::Config(
                "simulation counts must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(EngineError::Config("batch_size must be at least 1".to_string()));
        }
        if !(self.confidence_threshold > 0.0 && self.confidence_threshold < 1.0) {
            return Err(EngineError::Config(format!(
                "confidence_threshold must lie in (0, 1), got {}",
                self.confidence_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.credible_level) {
            return Err(EngineError::Config(format!(
                "credible_level must lie in [0, 1], got {}",
                self.credible_level
            )));
        }
        if !self.exploration_rate.is_finite() {
            return Err(EngineError::Config("exploration_rate must be finite".to_string()));
        }
        self.prior().map(|_| ())
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file, then environment
    /// variables. Environment values take precedence.
    pub fn load_from(path: Option<&Path>) -> EngineResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("LEADGEN")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.bandit.validate()?;
        Ok(config)
    }
}
