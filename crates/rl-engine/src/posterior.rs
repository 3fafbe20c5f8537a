//! Beta(α, β) posterior over a variant's true conversion rate.

use leadgen_core::{CredibleInterval, EngineError, EngineResult, VariantState};
use rand::Rng;
use rand_distr::{Beta, Distribution};
use statrs::function::beta::beta_reg;

/// Relative width at which bisection stops.
const QUANTILE_TOLERANCE: f64 = 1e-12;
// Enough halvings to reach the smallest subnormal from [0, 1].
const MAX_BISECTION_STEPS: usize = 1_100;

#[derive(Debug, Clone)]
pub struct BetaPosterior {
    alpha: f64,
    beta: f64,
    dist: Beta<f64>,
}

impl BetaPosterior {
    pub fn new(alpha: f64, beta: f64) -> EngineResult<Self> {
        if !(alpha.is_finite() && alpha > 0.0) || !(beta.is_finite() && beta > 0.0) {
            return Err(EngineError::invalid(format!(
                "Beta parameters must be finite and > 0 (alpha={}, beta={})",
                alpha, beta
            )));
        }
        let dist = Beta::new(alpha, beta).map_err(|e| {
            EngineError::invalid(format!(
                "Beta({}, {}) rejected by sampler: {}",
                alpha, beta, e
            ))
        })?;
        Ok(Self { alpha, beta, dist })
    }

    pub fn from_state(state: &VariantState) -> EngineResult<Self> {
        Self::new(state.alpha, state.beta)
    }

    /// Posterior with `bonus` added to both shape parameters. Pulls draws of
    /// thinly observed variants toward 0.5.
    pub fn boosted(&self, bonus: f64) -> EngineResult<Self> {
        Self::new(self.alpha + bonus, self.beta + bonus)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.dist.sample(rng).clamp(0.0, 1.0)
    }

    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    pub fn variance(&self) -> f64 {
        let total = self.alpha + self.beta;
        (self.alpha * self.beta) / (total * total * (total + 1.0))
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Inverse CDF at `p`, found by bisection on the regularized incomplete
    /// beta function. The stopping rule is relative to the bracket, so tail
    /// quantiles near 0 keep their significant digits.
    pub fn percentile(&self, p: f64) -> EngineResult<f64> {
        if !(0.0..=1.0).contains(&p) {
            return Err(EngineError::invalid(format!(
                "percentile must lie in [0, 1], got {}",
                p
            )));
        }
        if p == 0.0 {
            return Ok(0.0);
        }
        if p == 1.0 {
            return Ok(1.0);
        }

        let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
        for _ in 0..MAX_BISECTION_STEPS {
            let mid = 0.5 * (lo + hi);
            if mid <= lo || mid >= hi {
                break;
            }
            if beta_reg(self.alpha, self.beta, mid) < p {
                lo = mid;
            } else {
                hi = mid;
            }
            if hi - lo < QUANTILE_TOLERANCE * hi.max(f64::MIN_POSITIVE) {
                break;
            }
        }
        Ok(0.5 * (lo + hi))
    }

    /// Equal-tailed credible interval holding `level` of the posterior mass.
    pub fn credible_interval(&self, level: f64) -> EngineResult<CredibleInterval> {
        if !(0.0..=1.0).contains(&level) {
            return Err(EngineError::invalid(format!(
                "confidence must lie in [0, 1], got {}",
                level
            )));
        }
        let tail = (1.0 - level) / 2.0;
        Ok(CredibleInterval {
            lower: self.percentile(tail)?,
            upper: self.percentile(1.0 - tail)?,
            level,
        })
    }
}
