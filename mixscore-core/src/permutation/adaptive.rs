//! Adaptive replicate budget.
//!
//! Replicates are drawn in increments; after each increment the running
//! empirical p-value `successes / total` is compared with `stop_p_value`
//! and the run ends as soon as it is reached. Only small p-values earn the
//! full budget.

use anyhow::{ensure, Result};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::draw_rng;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// Replicates added per round.
    pub increment: usize,
    /// Upper bound on the total number of replicates.
    pub max_replicates: usize,
    /// Stop once the running p-value reaches this value.
    pub stop_p_value: f64,
    pub seed: u64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            increment: 1000,
            max_replicates: 100_000,
            stop_p_value: 0.05,
            seed: 42,
        }
    }
}

impl AdaptiveConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.increment > 0, "increment must be positive");
        ensure!(
            self.max_replicates >= self.increment,
            "replicate cap {} is below one increment of {}",
            self.max_replicates,
            self.increment
        );
        ensure!(
            self.stop_p_value > 0.0 && self.stop_p_value <= 1.0,
            "stop p-value must be in (0, 1], got {}",
            self.stop_p_value
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveOutcome {
    /// Replicates at least as extreme as the observation.
    pub successes: usize,
    /// Replicates drawn.
    pub total: usize,
    pub p_value: f64,
}

/// Draw replicates until the running p-value reaches the threshold or the
/// cap is hit. `replicate` returns whether its draw is extreme.
pub fn run_adaptive<F>(config: &AdaptiveConfig, replicate: F) -> AdaptiveOutcome
where
    F: Fn(&mut ChaCha8Rng) -> bool + Sync,
{
    let mut successes = 0;
    let mut total = 0;
    let mut p_value = 1.0;

    while total < config.max_replicates {
        let batch = config.increment.min(config.max_replicates - total);
        successes += (total..total + batch)
            .into_par_iter()
            .filter(|&draw| {
                let mut rng = draw_rng(config.seed, draw as u64);
                replicate(&mut rng)
            })
            .count();
        total += batch;
        p_value = successes as f64 / total as f64;
        if p_value >= config.stop_p_value {
            break;
        }
    }

    debug!(
        "adaptive run: {} of {} replicates extreme (p = {:.3e})",
        successes, total, p_value
    );
    AdaptiveOutcome {
        successes,
        total,
        p_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_stops_after_first_increment_when_common() {
        let outcome = run_adaptive(&AdaptiveConfig::default(), |_| true);
        assert_eq!(outcome.total, 1000);
        assert_eq!(outcome.successes, 1000);
        assert_eq!(outcome.p_value, 1.0);
    }

    #[test]
    fn test_runs_to_cap_when_rare() {
        let config = AdaptiveConfig {
            max_replicates: 5500,
            ..Default::default()
        };
        let outcome = run_adaptive(&config, |_| false);
        assert_eq!(outcome.total, 5500);
        assert_eq!(outcome.successes, 0);
        assert_eq!(outcome.p_value, 0.0);
    }

    #[test]
    fn test_moderate_rate() {
        let config = AdaptiveConfig::default();
        let outcome = run_adaptive(&config, |rng| rng.gen::<f64>() < 0.3);
        assert_eq!(outcome.total, 1000);
        assert!((outcome.p_value - 0.3).abs() < 0.06);
    }

    #[test]
    fn test_validate() {
        assert!(AdaptiveConfig::default().validate().is_ok());
        let bad = AdaptiveConfig {
            stop_p_value: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
