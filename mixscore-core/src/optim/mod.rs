//! Bounded derivative-free minimization.
//!
//! Multivariate models are fitted with CMA-ES; the single admixture
//! parameter uses Brent's method. Both implement [`Minimizer`] and always
//! return the best point seen together with the [`StopReason`].

pub mod brent;
pub mod cmaes;

pub use brent::Brent;
pub use cmaes::CmaEs;

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Box constraints, one interval per dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Bounds {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Self {
        assert_eq!(lower.len(), upper.len());
        Self { lower, upper }
    }

    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    /// Project a point onto the box.
    pub fn clamp(&self, x: &[f64]) -> Vec<f64> {
        assert_eq!(x.len(), self.dim());
        x.iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(&v, (&lo, &hi))| v.max(lo).min(hi))
            .collect()
    }

    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.dim()
            && x
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(&v, (&lo, &hi))| v >= lo && v <= hi)
    }

    pub fn validate(&self) -> Result<()> {
        for (i, (&lo, &hi)) in self.lower.iter().zip(&self.upper).enumerate() {
            ensure!(
                lo.is_finite() && hi.is_finite() && lo < hi,
                "invalid bounds in dimension {}: [{}, {}]",
                i,
                lo,
                hi
            );
        }
        Ok(())
    }
}

/// Result of a minimization.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    /// Best point found, inside the bounds.
    pub point: Vec<f64>,
    /// Objective value at `point`.
    pub value: f64,
    /// Number of objective evaluations.
    pub evaluations: usize,
    pub stop: StopReason,
}

impl Minimum {
    pub fn converged(&self) -> bool {
        self.stop == StopReason::Converged
    }
}

/// Why a minimization stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A convergence criterion fired.
    Converged,
    /// The evaluation budget ran out first.
    BudgetExhausted,
    /// The search state became non-finite or could not be decomposed.
    NumericalBreakdown,
}

/// A bounded minimizer of a black-box objective.
pub trait Minimizer {
    /// Minimize `objective` from `initial` (clamped into `bounds` first).
    /// `steps` gives the per-dimension initial search scale.
    fn minimize(
        &self,
        objective: &dyn Fn(&[f64]) -> f64,
        initial: &[f64],
        bounds: &Bounds,
        steps: &[f64],
    ) -> Minimum;
}

/// Optimizer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Allele frequencies are searched in `[eps, 1 - eps]`.
    pub frequency_epsilon: f64,
    /// Upper bound of odds ratios; the lower bound is 0.
    pub max_odds_ratio: f64,
    /// Upper bound of the admixture omega; the lower bound is 0.
    pub max_omega: f64,
    /// Initial CMA-ES step size of frequency parameters.
    pub frequency_step: f64,
    /// Initial CMA-ES step size of odds-ratio parameters.
    pub ratio_step: f64,
    /// CMA-ES offspring per generation.
    pub population_size: usize,
    /// Objective evaluation budget of a single fit.
    pub max_evaluations: usize,
    /// Brent relative tolerance.
    pub brent_relative_tolerance: f64,
    /// Brent absolute tolerance.
    pub brent_absolute_tolerance: f64,
    /// Seed of the CMA-ES sampler.
    pub seed: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            frequency_epsilon: 1e-5,
            max_odds_ratio: 20.0,
            max_omega: 50.0,
            frequency_step: 0.001,
            ratio_step: 0.01,
            population_size: 5,
            max_evaluations: 100_000,
            brent_relative_tolerance: 1e-10,
            brent_absolute_tolerance: 1e-14,
            seed: 42,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.frequency_epsilon > 0.0 && self.frequency_epsilon < 0.5,
            "frequency epsilon must be in (0, 0.5), got {}",
            self.frequency_epsilon
        );
        ensure!(
            self.max_odds_ratio.is_finite() && self.max_odds_ratio > 1.0,
            "maximum odds ratio must be finite and > 1, got {}",
            self.max_odds_ratio
        );
        ensure!(
            self.max_omega.is_finite() && self.max_omega > 1.0,
            "maximum omega must be finite and > 1, got {}",
            self.max_omega
        );
        for (name, step) in [("frequency", self.frequency_step), ("ratio", self.ratio_step)] {
            ensure!(
                step.is_finite() && step > 0.0,
                "{} step size must be positive, got {}",
                name,
                step
            );
        }
        ensure!(
            self.population_size >= 2,
            "population size must be at least 2, got {}",
            self.population_size
        );
        ensure!(
            self.max_evaluations > self.population_size,
            "evaluation budget {} does not cover one generation",
            self.max_evaluations
        );
        ensure!(
            self.brent_relative_tolerance > 0.0 && self.brent_absolute_tolerance > 0.0,
            "Brent tolerances must be positive"
        );
        Ok(())
    }

    pub fn frequency_bounds(&self) -> (f64, f64) {
        (self.frequency_epsilon, 1.0 - self.frequency_epsilon)
    }

    pub fn cmaes(&self) -> CmaEs {
        CmaEs::new(self.population_size, self.max_evaluations, self.seed)
    }

    pub fn brent(&self) -> Brent {
        Brent::new(
            self.brent_relative_tolerance,
            self.brent_absolute_tolerance,
            self.max_evaluations,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp() {
        let b = Bounds::new(vec![0.0, 1e-5], vec![20.0, 1.0 - 1e-5]);
        assert_eq!(b.clamp(&[-1.0, 0.5]), vec![0.0, 0.5]);
        assert_eq!(b.clamp(&[25.0, 1.0]), vec![20.0, 1.0 - 1e-5]);
        assert!(b.contains(&[0.0, 0.5]));
        assert!(!b.contains(&[0.0, 1.0]));
    }

    #[test]
    fn test_bounds_validate() {
        assert!(Bounds::new(vec![0.0], vec![1.0]).validate().is_ok());
        assert!(Bounds::new(vec![1.0], vec![1.0]).validate().is_err());
        assert!(Bounds::new(vec![0.0], vec![f64::INFINITY]).validate().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = OptimizerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frequency_bounds(), (1e-5, 1.0 - 1e-5));
        assert_eq!(config.population_size, 5);
        assert_eq!(config.max_evaluations, 100_000);
    }

    #[test]
    fn test_invalid_config() {
        let config = OptimizerConfig {
            ratio_step: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = OptimizerConfig {
            frequency_epsilon: 0.7,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
