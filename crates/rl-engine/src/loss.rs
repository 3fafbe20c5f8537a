//! Expected loss (regret) of committing to each variant.

use crate::simulation::{posteriors, MonteCarlo, DEFAULT_BATCH_SIZE, DEFAULT_NUM_SIMULATIONS};
use leadgen_core::{AllocationMap, EngineResult, VariantState};
use rand::Rng;

#[derive(Debug, Clone, Copy)]
pub struct ExpectedLossCalculator {
    simulation: MonteCarlo,
}

impl ExpectedLossCalculator {
    pub fn new(num_simulations: usize) -> EngineResult<Self> {
        Self::with_batch_size(num_simulations, DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(num_simulations: usize, batch_size: usize) -> EngineResult<Self> {
        Ok(Self {
            simulation: MonteCarlo::new(num_simulations, batch_size)?,
        })
    }

    /// Losses aligned with the input order.
    pub fn losses<R: Rng + ?Sized>(
        &self,
        variants: &[VariantState],
        rng: &mut R,
    ) -> EngineResult<Vec<f64>> {
        let posteriors = posteriors(variants)?;
        Ok(self.simulation.expected_losses(&posteriors, rng))
    }

    pub fn calculate<R: Rng + ?Sized>(
        &self,
        variants: &[VariantState],
        rng: &mut R,
    ) -> EngineResult<AllocationMap> {
        let losses = self.losses(variants, rng)?;
        Ok(variants
            .iter()
            .zip(losses)
            .map(|(variant, loss)| (variant.id.clone(), loss))
            .collect())
    }
}

pub fn expected_loss<R: Rng + ?Sized>(
    variants: &[VariantState],
    num_simulations: usize,
    rng: &mut R,
) -> EngineResult<AllocationMap> {
    ExpectedLossCalculator::new(num_simulations)?.calculate(variants, rng)
}

pub fn expected_loss_default<R: Rng + ?Sized>(
    variants: &[VariantState],
    rng: &mut R,
) -> EngineResult<AllocationMap> {
    expected_loss(variants, DEFAULT_NUM_SIMULATIONS, rng)
}
