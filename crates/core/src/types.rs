//! Domain records exchanged between the experiment service layer and the
//! bandit engine. Everything here is request-scoped.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Variant id → value, as returned by allocation and expected-loss queries.
pub type AllocationMap = HashMap<String, f64>;

/// Prior pseudo-counts for the Beta-Bernoulli conjugate update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaPrior {
    pub alpha: f64,
    pub beta: f64,
}

impl BetaPrior {
    pub fn new(alpha: f64, beta: f64) -> EngineResult<Self> {
        check_shape("prior alpha", alpha)?;
        check_shape("prior beta", beta)?;
        Ok(Self { alpha, beta })
    }

    /// Uninformative Beta(1, 1) prior.
    pub fn uniform() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
        }
    }
}

impl Default for BetaPrior {
    fn default() -> Self {
        Self::uniform()
    }
}

/// Current belief and counters for one experiment variant.
///
/// Construct through [`VariantState::new`], [`VariantState::from_counts`] or
/// [`VariantRecord::into_state`] so that `alpha > 0` and `beta > 0` hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VariantRecord")]
pub struct VariantState {
    pub id: String,
    pub name: String,
    pub alpha: f64,
    pub beta: f64,
    pub impressions: u64,
    pub conversions: u64,
}

impl VariantState {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        alpha: f64,
        beta: f64,
        impressions: u64,
        conversions: u64,
    ) -> EngineResult<Self> {
        let id = id.into();
        check_shape(&format!("alpha of variant {}", id), alpha)?;
        check_shape(&format!("beta of variant {}", id), beta)?;
        Ok(Self {
            name: name.into(),
            id,
            alpha,
            beta,
            impressions,
            conversions,
        })
    }

    /// Builds the posterior from raw counters:
    /// `alpha = prior.alpha + conversions`, `beta = prior.beta + failures`.
    pub fn from_counts(
        id: impl Into<String>,
        name: impl Into<String>,
        impressions: u64,
        conversions: u64,
        prior: BetaPrior,
    ) -> EngineResult<Self> {
        let failures = impressions.saturating_sub(conversions);
        Self::new(
            id,
            name,
            prior.alpha + conversions as f64,
            prior.beta + failures as f64,
            impressions,
            conversions,
        )
    }

    /// Applies one Bernoulli observation to the counters and the posterior.
    pub fn record_outcome(&mut self, converted: bool) {
        self.impressions += 1;
        if converted {
            self.conversions += 1;
            self.alpha += 1.0;
        } else {
            self.beta += 1.0;
        }
    }

    /// Observed conversion rate, 0.0 before the first impression.
    pub fn conversion_rate(&self) -> f64 {
        if self.impressions > 0 {
            self.conversions as f64 / self.impressions as f64
        } else {
            0.0
        }
    }

    /// Caller-side guard: the engine itself never rejects `conversions > impressions`.
    pub fn check_consistency(&self) -> EngineResult<()> {
        if self.conversions > self.impressions {
            return Err(EngineError::InconsistentState {
                variant_id: self.id.clone(),
                conversions: self.conversions,
                impressions: self.impressions,
            });
        }
        Ok(())
    }
}

/// Partially populated variant record as delivered by upstream storage.
/// Only `id` is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariantRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub alpha: Option<f64>,
    #[serde(default)]
    pub beta: Option<f64>,
    #[serde(default)]
    pub impressions: Option<u64>,
    #[serde(default)]
    pub conversions: Option<u64>,
}

impl VariantRecord {
    /// Applies defaults once: name falls back to the id, counters to zero, and
    /// missing posterior parameters are derived from `prior` and the counters.
    pub fn into_state(self, prior: BetaPrior) -> EngineResult<VariantState> {
        let impressions = self.impressions.unwrap_or(0);
        let conversions = self.conversions.unwrap_or(0);
        let failures = impressions.saturating_sub(conversions);
        let alpha = self.alpha.unwrap_or(prior.alpha + conversions as f64);
        let beta = self.beta.unwrap_or(prior.beta + failures as f64);
        let name = self.name.unwrap_or_else(|| self.id.clone());
        VariantState::new(self.id, name, alpha, beta, impressions, conversions)
    }
}

impl TryFrom<VariantRecord> for VariantState {
    type Error = EngineError;

    fn try_from(record: VariantRecord) -> Result<Self, Self::Error> {
        record.into_state(BetaPrior::uniform())
    }
}

/// Outcome of one online selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub variant_id: String,
    /// Raw Beta draw of the chosen arm, not a probability of being best.
    pub sampled_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoWinnerReason {
    InsufficientData,
    InsufficientConfidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinnerAnalysis {
    pub has_winner: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_variant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<NoWinnerReason>,
    pub probabilities: AllocationMap,
}

impl WinnerAnalysis {
    pub fn insufficient_data() -> Self {
        Self {
            has_winner: false,
            winner_id: None,
            best_variant_id: None,
            confidence: None,
            conversion_rate: None,
            reason: Some(NoWinnerReason::InsufficientData),
            probabilities: AllocationMap::new(),
        }
    }

    pub fn winner(
        winner_id: String,
        confidence: f64,
        conversion_rate: f64,
        probabilities: AllocationMap,
    ) -> Self {
        Self {
            has_winner: true,
            winner_id: Some(winner_id.clone()),
            best_variant_id: Some(winner_id),
            confidence: Some(confidence),
            conversion_rate: Some(conversion_rate),
            reason: None,
            probabilities,
        }
    }

    pub fn insufficient_confidence(
        best_variant_id: String,
        confidence: f64,
        probabilities: AllocationMap,
    ) -> Self {
        Self {
            has_winner: false,
            winner_id: None,
            best_variant_id: Some(best_variant_id),
            confidence: Some(confidence),
            conversion_rate: None,
            reason: Some(NoWinnerReason::InsufficientConfidence),
            probabilities,
        }
    }
}

/// Equal-tailed Bayesian credible interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CredibleInterval {
    pub lower: f64,
    pub upper: f64,
    pub level: f64,
}

impl CredibleInterval {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Reporting bundle for a single variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantStatistics {
    pub conversion_rate: f64,
    pub bayesian_estimate: f64,
    pub confidence_interval: CredibleInterval,
    pub standard_error: f64,
    pub alpha: f64,
    pub beta: f64,
    pub impressions: u64,
    pub conversions: u64,
}

fn check_shape(label: &str, value: f64) -> EngineResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::invalid(format!(
            "{} must be a finite value > 0, got {}",
            label, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_counts_uses_conjugate_update() {
        let state = VariantState::from_counts("a", "Control", 200, 30, BetaPrior::uniform()).unwrap();
        assert_eq!(state.alpha, 31.0);
        assert_eq!(state.beta, 171.0);
        assert_eq!(state.impressions, 200);
        assert_eq!(state.conversions, 30);
    }

    #[test]
    fn test_rejects_non_positive_shape() {
        assert!(matches!(
            VariantState::new("a", "A", 0.0, 1.0, 0, 0),
            Err(EngineError::InvalidParameter(_))
        ));
        assert!(matches!(
            VariantState::new("a", "A", 1.0, -2.0, 0, 0),
            Err(EngineError::InvalidParameter(_))
        ));
        assert!(VariantState::new("a", "A", f64::NAN, 1.0, 0, 0).is_err());
        assert!(BetaPrior::new(0.0, 1.0).is_err());
    }

    #[test]
    fn test_record_outcome() {
        let mut state = VariantState::from_counts("a", "A", 0, 0, BetaPrior::uniform()).unwrap();
        state.record_outcome(true);
        state.record_outcome(false);
        state.record_outcome(false);
        assert_eq!(state.impressions, 3);
        assert_eq!(state.conversions, 1);
        assert_eq!(state.alpha, 2.0);
        assert_eq!(state.beta, 3.0);
        assert!((state.conversion_rate() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_record_defaults_applied_once() {
        let record: VariantRecord =
            serde_json::from_str(r#"{"id": "hero-b", "impressions": 50, "conversions": 5}"#).unwrap();
        let state = record.into_state(BetaPrior::uniform()).unwrap();
        assert_eq!(state.name, "hero-b");
        assert_eq!(state.alpha, 6.0);
        assert_eq!(state.beta, 46.0);

        let bare: VariantRecord = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        let state = bare.into_state(BetaPrior::new(2.0, 3.0).unwrap()).unwrap();
        assert_eq!((state.alpha, state.beta), (2.0, 3.0));
        assert_eq!(state.impressions, 0);
        assert_eq!(state.conversion_rate(), 0.0);
    }

    #[test]
    fn test_variant_state_deserializes_through_validation() {
        let ok: VariantState =
            serde_json::from_str(r#"{"id": "a", "alpha": 3.5, "beta": 7.0}"#).unwrap();
        assert_eq!(ok.alpha, 3.5);

        let bad = serde_json::from_str::<VariantState>(r#"{"id": "a", "alpha": 0.0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_consistency_check() {
        let mut state = VariantState::new("a", "A", 1.0, 1.0, 10, 11).unwrap();
        assert!(matches!(
            state.check_consistency(),
            Err(EngineError::InconsistentState { conversions: 11, impressions: 10, .. })
        ));
        state.impressions = 11;
        assert!(state.check_consistency().is_ok());
    }

    #[test]
    fn test_winner_analysis_serialization() {
        let analysis = WinnerAnalysis::insufficient_data();
        let json = serde_json::to_string(&analysis).unwrap();
        assert!(json.contains("\"reason\":\"insufficient_data\""));
        assert!(!json.contains("winner_id"));

        let mut probs = AllocationMap::new();
        probs.insert("a".to_string(), 0.97);
        probs.insert("b".to_string(), 0.03);
        let analysis = WinnerAnalysis::winner("a".to_string(), 0.97, 0.5, probs);
        let json = serde_json::to_string(&analysis).unwrap();
        assert!(json.contains("\"has_winner\":true"));
        assert!(json.contains("\"winner_id\":\"a\""));
    }
}
