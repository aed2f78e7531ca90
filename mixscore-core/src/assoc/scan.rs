//! Multi-site scan.
//!
//! Without permutations sites are tested in parallel. With permutations
//! sites are processed in order and the draws of each site run in
//! parallel instead.

use anyhow::{ensure, Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::algorithm::Algorithm;
use super::site::{test_site, Cohort, Site, SiteTest};
use crate::optim::OptimizerConfig;
use crate::permutation::{run_permutations, PermutationConfig, PermutationOutcome};

/// Configuration of a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssocConfig {
    pub algorithm: Algorithm,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    /// Permute case/control labels per site when set.
    #[serde(default)]
    pub permutation: Option<PermutationConfig>,
    /// Worker threads; the global rayon pool when unset.
    #[serde(default)]
    pub threads: Option<usize>,
}

impl AssocConfig {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            optimizer: OptimizerConfig::default(),
            permutation: None,
            threads: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.optimizer
            .validate()
            .context("invalid optimizer configuration")?;
        if let Some(perm) = &self.permutation {
            perm.validate().context("invalid permutation configuration")?;
        }
        ensure!(self.threads != Some(0), "thread count must be positive");
        Ok(())
    }
}

/// Result of one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteReport {
    pub test: SiteTest,
    pub permutation: Option<PermutationOutcome>,
}

/// Test every site for association.
///
/// Configuration, array shapes and the cohort are validated before any
/// site is processed.
pub fn scan_sites(sites: &[Site], cohort: &Cohort, config: &AssocConfig) -> Result<Vec<SiteReport>> {
    config.validate()?;
    let Some(first) = sites.first() else {
        return Ok(Vec::new());
    };
    let n_individuals = first.n_individuals();
    for site in sites {
        site.validate(n_individuals)?;
    }
    cohort.validate(n_individuals, config.algorithm)?;

    info!(
        "Testing {} sites with {} ({} cases, {} controls)",
        sites.len(),
        config.algorithm,
        cohort.cases.len(),
        cohort.controls.len()
    );

    let reports = match config.threads {
        Some(n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()
            .context("failed to build thread pool")?
            .install(|| run_scan(sites, cohort, config)),
        None => run_scan(sites, cohort, config),
    }?;

    let failed = reports.iter().filter(|r| r.test.is_failed()).count();
    let degenerate = reports
        .iter()
        .filter(|r| !r.test.is_failed() && r.test.is_degenerate())
        .count();
    if failed + degenerate > 0 {
        warn!(
            "{} sites failed to converge, {} sites were degenerate",
            failed, degenerate
        );
    }
    info!("Finished {} sites", reports.len());
    Ok(reports)
}

fn run_scan(sites: &[Site], cohort: &Cohort, config: &AssocConfig) -> Result<Vec<SiteReport>> {
    let proportions = cohort.pop1_proportion.as_deref();
    let test = |site: &Site, cases: &[usize], controls: &[usize]| {
        test_site(
            config.algorithm,
            site,
            cases,
            controls,
            proportions,
            &config.optimizer,
        )
    };

    match &config.permutation {
        None => sites
            .par_iter()
            .map(|site| -> Result<SiteReport> {
                Ok(SiteReport {
                    test: test(site, &cohort.cases, &cohort.controls)?,
                    permutation: None,
                })
            })
            .collect(),
        Some(perm) => sites
            .iter()
            .enumerate()
            .map(|(idx, site)| -> Result<SiteReport> {
                let observed = test(site, &cohort.cases, &cohort.controls)?;
                let outcome = run_permutations(
                    observed.chi_square(),
                    &cohort.cases,
                    &cohort.controls,
                    idx as u64,
                    perm,
                    |cases, controls| {
                        test(site, cases, controls)
                            .map(|t| t.chi_square())
                            .unwrap_or(f64::NAN)
                    },
                );
                Ok(SiteReport {
                    test: observed,
                    permutation: Some(outcome),
                })
            })
            .collect(),
    }
}
