//! Frequency-based bootstrap for compound heterozygosity.
//!
//! Given the population allele frequencies of the variant sites of one
//! gene, each replicate simulates every individual's genotype at every
//! site as two Bernoulli draws and counts individuals heterozygous at two
//! or more sites. The p-value is the adaptive fraction of replicates whose
//! count reaches the observed number of carriers.

use anyhow::{ensure, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::permutation::{run_adaptive, AdaptiveConfig, AdaptiveOutcome};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompoundHetConfig {
    /// Frequency used for sites with a non-positive annotated frequency.
    pub mutation_rate: f64,
    pub adaptive: AdaptiveConfig,
}

impl Default for CompoundHetConfig {
    fn default() -> Self {
        Self {
            mutation_rate: 1e-6,
            adaptive: AdaptiveConfig::default(),
        }
    }
}

impl CompoundHetConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.mutation_rate > 0.0 && self.mutation_rate < 1.0,
            "mutation rate must be in (0, 1), got {}",
            self.mutation_rate
        );
        self.adaptive.validate()
    }
}

/// Number of simulated individuals heterozygous at two or more sites.
fn simulate_carriers<R: Rng>(rng: &mut R, frequencies: &[f64], n_individuals: usize) -> usize {
    (0..n_individuals)
        .filter(|_| {
            let het_sites = frequencies
                .iter()
                .filter(|&&f| {
                    let a1 = rng.gen::<f64>() <= f;
                    let a2 = rng.gen::<f64>() <= f;
                    a1 != a2
                })
                .count();
            het_sites >= 2
        })
        .count()
}

/// Adaptive bootstrap p-value of observing `observed` compound
/// heterozygous carriers among `n_individuals`.
///
/// An observed count of zero is not tested: p = 1 with no replicates.
pub fn compound_het_pvalue(
    frequencies: &[f64],
    n_individuals: usize,
    observed: usize,
    config: &CompoundHetConfig,
) -> Result<AdaptiveOutcome> {
    config.validate()?;
    ensure!(
        frequencies.iter().all(|f| !f.is_nan() && *f <= 1.0),
        "site frequencies must be at most 1"
    );

    if observed == 0 {
        return Ok(AdaptiveOutcome {
            successes: 0,
            total: 0,
            p_value: 1.0,
        });
    }

    let frequencies: Vec<f64> = frequencies
        .iter()
        .map(|&f| if f <= 0.0 { config.mutation_rate } else { f })
        .collect();
    info!(
        "bootstrapping {} sites over {} individuals, observed {} carriers",
        frequencies.len(),
        n_individuals,
        observed
    );

    Ok(run_adaptive(&config.adaptive, |rng| {
        simulate_carriers(rng, &frequencies, n_individuals) >= observed
    }))
}
