//! Shared tally of permuted statistics.

use serde::{Deserialize, Serialize};

/// Counts of permuted statistics below and at-or-above the observed one.
///
/// Every `check_every` recorded draws the fraction at-or-above is compared
/// with `stop_fraction`; reaching it ends the permutation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermutationTally {
    pub original: f64,
    pub smaller: usize,
    pub larger_or_equal: usize,
    check_every: usize,
    stop_fraction: f64,
    since_check: usize,
}

impl PermutationTally {
    pub fn new(original: f64, check_every: usize, stop_fraction: f64) -> Self {
        assert!(check_every > 0);
        Self {
            original,
            smaller: 0,
            larger_or_equal: 0,
            check_every,
            stop_fraction,
            since_check: 0,
        }
    }

    /// Record one permuted value. Returns false once the stopping rule fires.
    ///
    /// NaN compares false against the original and counts as smaller.
    pub fn record(&mut self, value: f64) -> bool {
        if value >= self.original {
            self.larger_or_equal += 1;
        } else {
            self.smaller += 1;
        }
        self.since_check += 1;
        if self.since_check == self.check_every {
            self.since_check = 0;
            if self.fraction_larger() >= self.stop_fraction {
                return false;
            }
        }
        true
    }

    pub fn total(&self) -> usize {
        self.smaller + self.larger_or_equal
    }

    pub fn fraction_larger(&self) -> f64 {
        self.larger_or_equal as f64 / self.total() as f64
    }
}
