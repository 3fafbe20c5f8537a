//! Decides whether an experiment can be concluded.
//!
//! A variant wins once its probability of being the best arm, estimated at
//! high simulation count, clears the confidence threshold. Variants below the
//! minimum sample size block any decision.

use crate::allocation::TrafficAllocator;
use crate::simulation::{argmax, posteriors, DEFAULT_BATCH_SIZE, WINNER_NUM_SIMULATIONS};
use leadgen_core::{AllocationMap, EngineError, EngineResult, VariantState, WinnerAnalysis};
use rand::Rng;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
pub struct WinnerDeterminer {
    confidence_threshold: f64,
    allocator: TrafficAllocator,
}

impl WinnerDeterminer {
    pub fn new(confidence_threshold: f64, min_sample_size: u64) -> EngineResult<Self> {
        Self::with_simulations(
            confidence_threshold,
            min_sample_size,
            WINNER_NUM_SIMULATIONS,
            DEFAULT_BATCH_SIZE,
        )
    }

    pub fn with_simulations(
        confidence_threshold: f64,
        min_sample_size: u64,
        num_simulations: usize,
        batch_size: usize,
    ) -> EngineResult<Self> {
        if !(confidence_threshold > 0.0 && confidence_threshold < 1.0) {
            return Err(EngineError::invalid(format!(
                "confidence_threshold must lie in (0, 1), got {}",
                confidence_threshold
            )));
        }
        Ok(Self {
            confidence_threshold,
            allocator: TrafficAllocator::with_batch_size(
                min_sample_size,
                num_simulations,
                batch_size,
            )?,
        })
    }

    pub fn determine<R: Rng + ?Sized>(
        &self,
        variants: &[VariantState],
        rng: &mut R,
    ) -> EngineResult<WinnerAnalysis> {
        posteriors(variants)?;

        let min_sample_size = self.allocator.min_sample_size();
        if let Some(short) = variants.iter().find(|v| v.impressions < min_sample_size) {
            debug!(
                variant_id = %short.id,
                impressions = short.impressions,
                min_sample_size,
                "Sample size gate not met"
            );
            return Ok(WinnerAnalysis::insufficient_data());
        }

        let ratios = self.allocator.win_probabilities(variants, rng)?;
        let (best, confidence) = argmax(ratios.iter().copied()).ok_or(EngineError::NoVariants)?;
        let probabilities: AllocationMap = variants
            .iter()
            .zip(ratios.iter())
            .map(|(v, &p)| (v.id.clone(), p))
            .collect();

        let best_variant = &variants[best];
        if confidence >= self.confidence_threshold {
            info!(
                winner_id = %best_variant.id,
                confidence,
                threshold = self.confidence_threshold,
                "Winner declared"
            );
            Ok(WinnerAnalysis::winner(
                best_variant.id.clone(),
                confidence,
                best_variant.conversion_rate(),
                probabilities,
            ))
        } else {
            debug!(
                best_variant_id = %best_variant.id,
                confidence,
                threshold = self.confidence_threshold,
                "No variant clears the confidence threshold"
            );
            Ok(WinnerAnalysis::insufficient_confidence(
                best_variant.id.clone(),
                confidence,
                probabilities,
            ))
        }
    }
}

/// One-shot winner check at 50,000 trials.
pub fn determine_winner<R: Rng + ?Sized>(
    variants: &[VariantState],
    confidence_threshold: f64,
    min_sample_size: u64,
    rng: &mut R,
) -> EngineResult<WinnerAnalysis> {
    WinnerDeterminer::new(confidence_threshold, min_sample_size)?.determine(variants, rng)
}
