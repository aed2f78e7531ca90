//! Case/control relabeling with early stopping.
//!
//! Draws run in parallel batches of `check_every`. Each draw shuffles its
//! own copy of the pooled individuals, splits it into a case-sized prefix
//! and a control-sized suffix, recomputes the statistic, and records it in
//! the shared tally. The batch that trips the stopping rule completes, and
//! no further batch is started.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use anyhow::{ensure, Result};
use rand::seq::SliceRandom;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::draw_rng;
use super::tally::PermutationTally;

/// Permutation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermutationConfig {
    /// Maximum number of draws per site.
    pub max_permutations: usize,
    /// Draws between stopping-rule checks.
    pub check_every: usize,
    /// Stop once this fraction of draws is at or above the observed value.
    pub stop_fraction: f64,
    pub seed: u64,
}

impl Default for PermutationConfig {
    fn default() -> Self {
        Self {
            max_permutations: 1000,
            check_every: 100,
            stop_fraction: 0.2,
            seed: 42,
        }
    }
}

impl PermutationConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.max_permutations > 0, "permutation count must be positive");
        ensure!(self.check_every > 0, "check interval must be positive");
        ensure!(
            self.stop_fraction > 0.0 && self.stop_fraction <= 1.0,
            "stop fraction must be in (0, 1], got {}",
            self.stop_fraction
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermutationStatus {
    Running,
    /// The stopping rule fired.
    EarlyStopped,
    /// The draw budget ran out without the rule firing.
    Exhausted,
    /// The observed statistic was not finite; nothing was drawn.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermutationOutcome {
    pub original: f64,
    pub smaller: usize,
    pub larger_or_equal: usize,
    pub status: PermutationStatus,
}

impl PermutationOutcome {
    pub fn total(&self) -> usize {
        self.smaller + self.larger_or_equal
    }

    /// Empirical p-value `larger_or_equal / total`; NaN without draws.
    pub fn empirical_p_value(&self) -> f64 {
        if self.total() == 0 {
            f64::NAN
        } else {
            self.larger_or_equal as f64 / self.total() as f64
        }
    }
}

/// Permute case/control labels and tally `statistic` against `original`.
///
/// `stream` separates the random streams of different sites sharing a seed.
pub fn run_permutations<F>(
    original: f64,
    cases: &[usize],
    controls: &[usize],
    stream: u64,
    config: &PermutationConfig,
    statistic: F,
) -> PermutationOutcome
where
    F: Fn(&[usize], &[usize]) -> f64 + Sync,
{
    if !original.is_finite() {
        debug!("observed statistic {} is not finite, skipping permutations", original);
        return PermutationOutcome {
            original,
            smaller: 0,
            larger_or_equal: 0,
            status: PermutationStatus::Skipped,
        };
    }

    let pool: Vec<usize> = cases.iter().chain(controls).copied().collect();
    let n_cases = cases.len();
    let seed = config.seed.wrapping_add(stream);
    let tally = Mutex::new(PermutationTally::new(
        original,
        config.check_every,
        config.stop_fraction,
    ));
    let stopped = AtomicBool::new(false);

    let mut status = PermutationStatus::Running;
    let mut next = 0;
    while status == PermutationStatus::Running {
        if next >= config.max_permutations {
            status = PermutationStatus::Exhausted;
            break;
        }
        let end = (next + config.check_every).min(config.max_permutations);
        (next..end).into_par_iter().for_each(|draw| {
            let mut rng = draw_rng(seed, draw as u64);
            let mut ids = pool.clone();
            ids.shuffle(&mut rng);
            let (perm_cases, perm_controls) = ids.split_at(n_cases);
            let value = statistic(perm_cases, perm_controls);
            let keep = tally
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .record(value);
            if !keep {
                stopped.store(true, Ordering::SeqCst);
            }
        });
        next = end;
        if stopped.load(Ordering::SeqCst) {
            status = PermutationStatus::EarlyStopped;
        }
    }

    let tally = tally.into_inner().unwrap_or_else(PoisonError::into_inner);
    debug!(
        "permutations {:?}: {} smaller, {} at or above {:.4}",
        status, tally.smaller, tally.larger_or_equal, original
    );
    PermutationOutcome {
        original,
        smaller: tally.smaller,
        larger_or_equal: tally.larger_or_equal,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_early_stop_after_first_check() {
        let calls = AtomicUsize::new(0);
        let config = PermutationConfig {
            max_permutations: 10_000,
            ..Default::default()
        };
        let outcome = run_permutations(1.0, &[0, 1, 2], &[3, 4, 5], 0, &config, |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            2.0
        });
        assert_eq!(outcome.status, PermutationStatus::EarlyStopped);
        assert_eq!(outcome.larger_or_equal, 100);
        assert_eq!(outcome.smaller, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn test_exhausted_budget() {
        let config = PermutationConfig {
            max_permutations: 250,
            ..Default::default()
        };
        let outcome = run_permutations(1.0, &[0, 1], &[2, 3], 0, &config, |_, _| 0.0);
        assert_eq!(outcome.status, PermutationStatus::Exhausted);
        assert_eq!(outcome.smaller, 250);
        assert_eq!(outcome.total(), 250);
        assert_eq!(outcome.empirical_p_value(), 0.0);
    }

    #[test]
    fn test_non_finite_original_skipped() {
        let outcome = run_permutations(
            f64::NAN,
            &[0],
            &[1],
            0,
            &PermutationConfig::default(),
            |_, _| panic!("no draws expected"),
        );
        assert_eq!(outcome.status, PermutationStatus::Skipped);
        assert_eq!(outcome.total(), 0);
        assert!(outcome.empirical_p_value().is_nan());
    }

    #[test]
    fn test_split_sizes_and_membership() {
        let cases = [0, 1, 2];
        let controls = [3, 4, 5, 6, 7];
        let config = PermutationConfig {
            max_permutations: 50,
            check_every: 10,
            ..Default::default()
        };
        run_permutations(100.0, &cases, &controls, 3, &config, |c, k| {
            assert_eq!(c.len(), 3);
            assert_eq!(k.len(), 5);
            let mut all: Vec<usize> = c.iter().chain(k).copied().collect();
            all.sort_unstable();
            assert_eq!(all, (0..8).collect::<Vec<_>>());
            0.0
        });
    }

    #[test]
    fn test_reproducible() {
        let config = PermutationConfig {
            max_permutations: 300,
            ..Default::default()
        };
        // statistic: sum of case ids, observed at its expected value
        let stat = |c: &[usize], _: &[usize]| c.iter().sum::<usize>() as f64;
        let a = run_permutations(14.0, &[0, 1, 2, 3], &[4, 5, 6, 7], 9, &config, stat);
        let b = run_permutations(14.0, &[0, 1, 2, 3], &[4, 5, 6, 7], 9, &config, stat);
        assert_eq!(a, b);
    }
}
