//! Configured entry point used by the experiment service layer.
//!
//! `BanditEngine` holds only validated configuration. Every operation takes the
//! caller's variant snapshot and RNG, so one engine can be shared across
//! concurrent requests.

use crate::allocation::TrafficAllocator;
use crate::loss::ExpectedLossCalculator;
use crate::report::{ExperimentReport, ReportBuilder};
use crate::rng::engine_rng;
use crate::sampler::VariantSampler;
use crate::statistics::VariantStatisticsReporter;
use crate::winner::WinnerDeterminer;
use leadgen_core::{
    AllocationMap, BanditConfig, BetaPrior, EngineResult, SelectionResult, VariantRecord,
    VariantState, VariantStatistics, WinnerAnalysis,
};
use rand::Rng;

#[derive(Debug, Clone)]
pub struct BanditEngine {
    prior: BetaPrior,
    sampler: VariantSampler,
    allocator: TrafficAllocator,
    determiner: WinnerDeterminer,
    loss: ExpectedLossCalculator,
    statistics: VariantStatisticsReporter,
}

impl BanditEngine {
    pub fn new(config: BanditConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            prior: config.prior()?,
            sampler: VariantSampler::new(config.exploration_rate)?,
            allocator: TrafficAllocator::with_batch_size(
                config.min_sample_size,
                config.num_simulations,
                config.batch_size,
            )?,
            determiner: WinnerDeterminer::with_simulations(
                config.confidence_threshold,
                config.min_sample_size,
                config.winner_num_simulations,
                config.batch_size,
            )?,
            loss: ExpectedLossCalculator::with_batch_size(
                config.num_simulations,
                config.batch_size,
            )?,
            statistics: VariantStatisticsReporter::new(config.credible_level)?,
        })
    }

    /// Converts upstream records into validated states using the configured prior.
    pub fn states_from_records(&self, records: Vec<VariantRecord>) -> EngineResult<Vec<VariantState>> {
        records
            .into_iter()
            .map(|record| record.into_state(self.prior))
            .collect()
    }

    pub fn select_variant<R: Rng + ?Sized>(
        &self,
        variants: &[VariantState],
        rng: &mut R,
    ) -> EngineResult<SelectionResult> {
        self.sampler.select(variants, rng)
    }

    /// Selection with a fresh generator: reproducible for `Some(seed)`.
    pub fn select_variant_seeded(
        &self,
        variants: &[VariantState],
        seed: Option<u64>,
    ) -> EngineResult<SelectionResult> {
        self.sampler.select(variants, &mut engine_rng(seed))
    }

    pub fn allocate_traffic<R: Rng + ?Sized>(
        &self,
        variants: &[VariantState],
        rng: &mut R,
    ) -> EngineResult<AllocationMap> {
        self.allocator.allocate(variants, rng)
    }

    pub fn determine_winner<R: Rng + ?Sized>(
        &self,
        variants: &[VariantState],
        rng: &mut R,
    ) -> EngineResult<WinnerAnalysis> {
        self.determiner.determine(variants, rng)
    }

    pub fn expected_loss<R: Rng + ?Sized>(
        &self,
        variants: &[VariantState],
        rng: &mut R,
    ) -> EngineResult<AllocationMap> {
        self.loss.calculate(variants, rng)
    }

    pub fn variant_statistics(&self, variant: &VariantState) -> EngineResult<VariantStatistics> {
        self.statistics.report(variant)
    }

    pub fn report<R: Rng + ?Sized>(
        &self,
        variants: &[VariantState],
        rng: &mut R,
    ) -> EngineResult<ExperimentReport> {
        ReportBuilder {
            allocator: &self.allocator,
            determiner: &self.determiner,
            loss: &self.loss,
            statistics: &self.statistics,
        }
        .build(variants, rng)
    }
}
