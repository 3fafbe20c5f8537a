//! Per-variant reporting bundle: observed rate, posterior mean, credible
//! interval and standard error.

use crate::posterior::BetaPosterior;
use leadgen_core::{EngineError, EngineResult, VariantState, VariantStatistics};

pub const DEFAULT_CREDIBLE_LEVEL: f64 = 0.95;

#[derive(Debug, Clone, Copy)]
pub struct VariantStatisticsReporter {
    confidence: f64,
}

impl VariantStatisticsReporter {
    pub fn new(confidence: f64) -> EngineResult<Self> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(EngineError::invalid(format!(
                "confidence must lie in [0, 1], got {}",
                confidence
            )));
        }
        Ok(Self { confidence })
    }

    pub fn compute(
        &self,
        alpha: f64,
        beta: f64,
        impressions: u64,
        conversions: u64,
    ) -> EngineResult<VariantStatistics> {
        let posterior = BetaPosterior::new(alpha, beta)?;
        let conversion_rate = if impressions > 0 {
            conversions as f64 / impressions as f64
        } else {
            0.0
        };

        Ok(VariantStatistics {
            conversion_rate,
            bayesian_estimate: posterior.mean(),
            confidence_interval: posterior.credible_interval(self.confidence)?,
            standard_error: posterior.std_dev(),
            alpha,
            beta,
            impressions,
            conversions,
        })
    }

    pub fn report(&self, variant: &VariantState) -> EngineResult<VariantStatistics> {
        self.compute(
            variant.alpha,
            variant.beta,
            variant.impressions,
            variant.conversions,
        )
    }
}

impl Default for VariantStatisticsReporter {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CREDIBLE_LEVEL,
        }
    }
}

pub fn variant_statistics(
    alpha: f64,
    beta: f64,
    impressions: u64,
    conversions: u64,
    confidence: f64,
) -> EngineResult<VariantStatistics> {
    VariantStatisticsReporter::new(confidence)?.compute(alpha, beta, impressions, conversions)
}
