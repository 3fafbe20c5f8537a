//! Traffic allocation from the probability that each variant is the best arm.

use crate::simulation::{posteriors, MonteCarlo, DEFAULT_BATCH_SIZE, DEFAULT_NUM_SIMULATIONS};
use leadgen_core::{AllocationMap, EngineResult, VariantState};
use rand::Rng;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct TrafficAllocator {
    min_sample_size: u64,
    simulation: MonteCarlo,
}

impl TrafficAllocator {
    pub fn new(min_sample_size: u64, num_simulations: usize) -> EngineResult<Self> {
        Self::with_batch_size(min_sample_size, num_simulations, DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(
        min_sample_size: u64,
        num_simulations: usize,
        batch_size: usize,
    ) -> EngineResult<Self> {
        Ok(Self {
            min_sample_size,
            simulation: MonteCarlo::new(num_simulations, batch_size)?,
        })
    }

    pub fn min_sample_size(&self) -> u64 {
        self.min_sample_size
    }

    pub fn allocate<R: Rng + ?Sized>(
        &self,
        variants: &[VariantState],
        rng: &mut R,
    ) -> EngineResult<AllocationMap> {
        let ratios = self.win_probabilities(variants, rng)?;
        Ok(variants
            .iter()
            .zip(ratios)
            .map(|(variant, ratio)| (variant.id.clone(), ratio))
            .collect())
    }

    /// Ratios aligned with the input order. Falls back to a uniform split
    /// while total traffic is below `min_sample_size` per variant.
    pub fn win_probabilities<R: Rng + ?Sized>(
        &self,
        variants: &[VariantState],
        rng: &mut R,
    ) -> EngineResult<Vec<f64>> {
        let posteriors = posteriors(variants)?;
        let n = variants.len();

        let total_impressions = variants
            .iter()
            .fold(0u64, |acc, v| acc.saturating_add(v.impressions));
        let required = self.min_sample_size.saturating_mul(n as u64);
        if total_impressions < required {
            debug!(
                total_impressions,
                required, variants = n, "Not enough traffic to optimize, splitting uniformly"
            );
            return Ok(vec![1.0 / n as f64; n]);
        }

        let ratios = self.simulation.win_probabilities(&posteriors, rng);
        debug!(
            variants = n,
            simulations = self.simulation.num_simulations(),
            "Computed Thompson allocation"
        );
        Ok(ratios)
    }
}

/// One-shot allocation with explicit parameters.
pub fn allocate_traffic<R: Rng + ?Sized>(
    variants: &[VariantState],
    min_sample_size: u64,
    num_simulations: usize,
    rng: &mut R,
) -> EngineResult<AllocationMap> {
    TrafficAllocator::new(min_sample_size, num_simulations)?.allocate(variants, rng)
}

/// Allocation at the reporting-time default of 10,000 trials.
pub fn allocate_traffic_default<R: Rng + ?Sized>(
    variants: &[VariantState],
    min_sample_size: u64,
    rng: &mut R,
) -> EngineResult<AllocationMap> {
    allocate_traffic(variants, min_sample_size, DEFAULT_NUM_SIMULATIONS, rng)
}
