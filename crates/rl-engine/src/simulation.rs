//! Batched Monte Carlo kernel shared by traffic allocation, winner
//! determination and expected loss.
//!
//! Each trial draws one value per variant from its unboosted posterior. Trials
//! are batched into `[rows, variants]` blocks. A block is filled one variant
//! column at a time, then scanned row by row.

use crate::posterior::BetaPosterior;
use leadgen_core::{EngineError, EngineResult, VariantState};
use ndarray::{Array2, ArrayView1, Axis};
use rand::Rng;
use std::collections::HashSet;

pub const DEFAULT_NUM_SIMULATIONS: usize = 10_000;
pub const WINNER_NUM_SIMULATIONS: usize = 50_000;
pub const DEFAULT_BATCH_SIZE: usize = 4_096;

/// Validates a variant list and builds one posterior per variant, in input order.
pub fn posteriors(variants: &[VariantState]) -> EngineResult<Vec<BetaPosterior>> {
    if variants.is_empty() {
        return Err(EngineError::NoVariants);
    }
    let mut seen = HashSet::with_capacity(variants.len());
    variants
        .iter()
        .map(|variant| {
            if !seen.insert(variant.id.as_str()) {
                return Err(EngineError::DuplicateVariant(variant.id.clone()));
            }
            BetaPosterior::from_state(variant)
        })
        .collect()
}

/// Index and value of the first maximum.
pub fn argmax<I>(values: I) -> Option<(usize, f64)>
where
    I: IntoIterator<Item = f64>,
{
    let mut best: Option<(usize, f64)> = None;
    for (idx, value) in values.into_iter().enumerate() {
        match best {
            None => best = Some((idx, value)),
            Some((_, top)) if value > top => best = Some((idx, value)),
            _ => {}
        }
    }
    best
}

#[derive(Debug, Clone, Copy)]
pub struct MonteCarlo {
    num_simulations: usize,
    batch_size: usize,
}

impl MonteCarlo {
    pub fn new(num_simulations: usize, batch_size: usize) -> EngineResult<Self> {
        if num_simulations == 0 {
            return Err(EngineError::invalid("num_simulations must be at least 1"));
        }
        if batch_size == 0 {
            return Err(EngineError::invalid("batch_size must be at least 1"));
        }
        Ok(Self {
            num_simulations,
            batch_size,
        })
    }

    pub fn with_simulations(num_simulations: usize) -> EngineResult<Self> {
        Self::new(num_simulations, DEFAULT_BATCH_SIZE)
    }

    pub fn num_simulations(&self) -> usize {
        self.num_simulations
    }

    /// Share of trials in which each variant drew the highest value.
    pub fn win_probabilities<R: Rng + ?Sized>(
        &self,
        posteriors: &[BetaPosterior],
        rng: &mut R,
    ) -> Vec<f64> {
        let mut wins = vec![0u64; posteriors.len()];
        self.for_each_block(posteriors, rng, |block| {
            for row in block.axis_iter(Axis(0)) {
                if let Some((idx, _)) = argmax(row.iter().copied()) {
                    wins[idx] += 1;
                }
            }
        });
        let total = self.num_simulations as f64;
        wins.into_iter().map(|w| w as f64 / total).collect()
    }

    /// Mean shortfall of each variant against the best draw of the same trial.
    pub fn expected_losses<R: Rng + ?Sized>(
        &self,
        posteriors: &[BetaPosterior],
        rng: &mut R,
    ) -> Vec<f64> {
        let mut losses = vec![0.0f64; posteriors.len()];
        self.for_each_block(posteriors, rng, |block| {
            for row in block.axis_iter(Axis(0)) {
                accumulate_regret(row, &mut losses);
            }
        });
        let total = self.num_simulations as f64;
        losses.into_iter().map(|l| l / total).collect()
    }

    fn for_each_block<R, F>(&self, posteriors: &[BetaPosterior], rng: &mut R, mut visit: F)
    where
        R: Rng + ?Sized,
        F: FnMut(&Array2<f64>),
    {
        let mut remaining = self.num_simulations;
        while remaining > 0 {
            let rows = remaining.min(self.batch_size);
            let block = draw_block(posteriors, rows, rng);
            visit(&block);
            remaining -= rows;
        }
    }
}

fn draw_block<R: Rng + ?Sized>(posteriors: &[BetaPosterior], rows: usize, rng: &mut R) -> Array2<f64> {
    let mut block = Array2::zeros((rows, posteriors.len()));
    for (col, posterior) in posteriors.iter().enumerate() {
        block
            .column_mut(col)
            .iter_mut()
            .for_each(|x| *x = posterior.sample(&mut *rng));
    }
    block
}

fn accumulate_regret(row: ArrayView1<'_, f64>, losses: &mut [f64]) {
    let best = row.fold(f64::NEG_INFINITY, |acc, &x| acc.max(x));
    for (loss, &draw) in losses.iter_mut().zip(row.iter()) {
        *loss += best - draw;
    }
}
