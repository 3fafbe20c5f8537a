//! Online Thompson sampling: which variant serves the next impression.

use crate::posterior::BetaPosterior;
use crate::simulation::{argmax, posteriors};
use leadgen_core::{EngineError, EngineResult, SelectionResult, VariantState};
use rand::Rng;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct VariantSampler {
    exploration_rate: f64,
}

impl VariantSampler {
    /// Out-of-range rates are clamped into `[0, 1]`; NaN and infinities are rejected.
    pub fn new(exploration_rate: f64) -> EngineResult<Self> {
        if !exploration_rate.is_finite() {
            return Err(EngineError::invalid(format!(
                "exploration_rate must be finite, got {}",
                exploration_rate
            )));
        }
        Ok(Self {
            exploration_rate: exploration_rate.clamp(0.0, 1.0),
        })
    }

    pub fn exploration_rate(&self) -> f64 {
        self.exploration_rate
    }

    /// Draws once from each variant's exploration-boosted posterior and
    /// returns the highest draw. Ties go to the earliest variant.
    pub fn select<R: Rng + ?Sized>(
        &self,
        variants: &[VariantState],
        rng: &mut R,
    ) -> EngineResult<SelectionResult> {
        let boosted = posteriors(variants)?
            .iter()
            .map(|p| p.boosted(self.exploration_rate))
            .collect::<EngineResult<Vec<BetaPosterior>>>()?;

        let draws: Vec<f64> = boosted.iter().map(|p| p.sample(&mut *rng)).collect();
        let (idx, sampled_score) = argmax(draws).ok_or(EngineError::NoVariants)?;
        let variant_id = variants[idx].id.clone();

        debug!(
            variant_id = %variant_id,
            sampled_score,
            exploration_rate = self.exploration_rate,
            candidates = variants.len(),
            "Variant selected"
        );

        Ok(SelectionResult {
            variant_id,
            sampled_score,
        })
    }
}

/// One-shot selection with an explicit exploration rate.
pub fn select_variant<R: Rng + ?Sized>(
    variants: &[VariantState],
    exploration_rate: f64,
    rng: &mut R,
) -> EngineResult<SelectionResult> {
    VariantSampler::new(exploration_rate)?.select(variants, rng)
}
