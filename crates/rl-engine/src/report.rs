//! Experiment-level reporting: statistics, allocation, win probability and
//! regret for every variant in one pass.

use crate::allocation::TrafficAllocator;
use crate::loss::ExpectedLossCalculator;
use crate::statistics::VariantStatisticsReporter;
use crate::winner::WinnerDeterminer;
use chrono::{DateTime, Utc};
use leadgen_core::{EngineResult, VariantState, VariantStatistics, WinnerAnalysis};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantReport {
    pub variant_id: String,
    pub name: String,
    pub statistics: VariantStatistics,
    pub traffic_allocation: f64,
    /// Present only when the winner check ran its simulation.
    pub win_probability: Option<f64>,
    pub expected_loss: f64,
    pub is_winner: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub variants: Vec<VariantReport>,
    pub winner: WinnerAnalysis,
    pub total_impressions: u64,
    pub total_conversions: u64,
    pub generated_at: DateTime<Utc>,
}

impl ExperimentReport {
    pub fn variant(&self, variant_id: &str) -> Option<&VariantReport> {
        self.variants.iter().find(|v| v.variant_id == variant_id)
    }
}

pub struct ReportBuilder<'a> {
    pub allocator: &'a TrafficAllocator,
    pub determiner: &'a WinnerDeterminer,
    pub loss: &'a ExpectedLossCalculator,
    pub statistics: &'a VariantStatisticsReporter,
}

impl ReportBuilder<'_> {
    /// Draws allocation, winner and loss simulations from one RNG stream, in
    /// that order.
    pub fn build<R: Rng + ?Sized>(
        &self,
        variants: &[VariantState],
        rng: &mut R,
    ) -> EngineResult<ExperimentReport> {
        let allocation = self.allocator.win_probabilities(variants, rng)?;
        let winner = self.determiner.determine(variants, rng)?;
        let losses = self.loss.losses(variants, rng)?;

        let mut reports = Vec::with_capacity(variants.len());
        for ((variant, traffic_allocation), expected_loss) in
            variants.iter().zip(allocation).zip(losses)
        {
            reports.push(VariantReport {
                variant_id: variant.id.clone(),
                name: variant.name.clone(),
                statistics: self.statistics.report(variant)?,
                traffic_allocation,
                win_probability: winner.probabilities.get(&variant.id).copied(),
                expected_loss,
                is_winner: winner.winner_id.as_deref() == Some(variant.id.as_str()),
            });
        }

        Ok(ExperimentReport {
            variants: reports,
            total_impressions: variants
                .iter()
                .fold(0u64, |acc, v| acc.saturating_add(v.impressions)),
            total_conversions: variants
                .iter()
                .fold(0u64, |acc, v| acc.saturating_add(v.conversions)),
            winner,
            generated_at: Utc::now(),
        })
    }
}
