//! Per-site association testing.
//!
//! A site is tested by fitting every model pair of the selected algorithm
//! to the counts of the given case/control split. The site statistic is
//! the sum of the pair statistics; it is NaN whenever one of the fits did
//! not converge.

use anyhow::{anyhow, ensure, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::algorithm::{Algorithm, Comparison};
use super::statistic::{chi_square_p_value, LikelihoodRatioTest};
use crate::counts::{admixture_dosages, pop1_proportions, AlleleCount, GenotypeCount};
use crate::likelihood::AdmixtureLikelihood;
use crate::model::{
    fit_admixture, fit_genotype_model, fit_haplotype_model, seed_from_null, DataFamily,
    FitOutcome,
};
use crate::optim::OptimizerConfig;

/// Haplotype-level data of one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    /// Local ancestry per haplotype: 0 = pop1, 1 = pop2.
    pub ancestry: Vec<u8>,
    /// Allele per haplotype: 0 = reference, 1 = non-reference.
    pub alleles: Vec<u8>,
}

impl Site {
    pub fn new(id: impl Into<String>, ancestry: Vec<u8>, alleles: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            ancestry,
            alleles,
        }
    }

    /// Individuals covered, two haplotypes each.
    pub fn n_individuals(&self) -> usize {
        self.ancestry.len() / 2
    }

    pub fn validate(&self, n_individuals: usize) -> Result<()> {
        ensure!(
            self.ancestry.len() == self.alleles.len(),
            "site {}: {} ancestry labels but {} alleles",
            self.id,
            self.ancestry.len(),
            self.alleles.len()
        );
        ensure!(
            self.ancestry.len() == 2 * n_individuals,
            "site {}: expected {} haplotypes, got {}",
            self.id,
            2 * n_individuals,
            self.ancestry.len()
        );
        ensure!(
            self.ancestry.iter().all(|&a| a <= 1) && self.alleles.iter().all(|&a| a <= 1),
            "site {}: ancestry labels and alleles must be 0 or 1",
            self.id
        );
        Ok(())
    }
}

/// Case/control partition of the individuals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cohort {
    pub cases: Vec<usize>,
    pub controls: Vec<usize>,
    /// Genome-wide pop1 proportion per individual, indexed like the sites.
    pub pop1_proportion: Option<Vec<f64>>,
}

impl Cohort {
    pub fn new(cases: Vec<usize>, controls: Vec<usize>) -> Self {
        Self {
            cases,
            controls,
            pop1_proportion: None,
        }
    }

    pub fn with_proportions(mut self, proportions: Vec<f64>) -> Self {
        self.pop1_proportion = Some(proportions);
        self
    }

    pub fn validate(&self, n_individuals: usize, algorithm: Algorithm) -> Result<()> {
        for (label, group) in [("case", &self.cases), ("control", &self.controls)] {
            if let Some(&bad) = group.iter().find(|&&i| i >= n_individuals) {
                return Err(anyhow!(
                    "{} index {} out of range for {} individuals",
                    label,
                    bad,
                    n_individuals
                ));
            }
        }
        if algorithm.needs_proportions() {
            let props = self.pop1_proportion.as_ref().ok_or_else(|| {
                anyhow!("algorithm {} requires pop1 ancestry proportions", algorithm)
            })?;
            ensure!(
                props.len() == n_individuals,
                "expected {} ancestry proportions, got {}",
                n_individuals,
                props.len()
            );
            ensure!(
                props.iter().all(|p| (0.0..=1.0).contains(p)),
                "ancestry proportions must lie in [0, 1]"
            );
        }
        Ok(())
    }
}

/// Fits and statistic of one model pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub comparison: Comparison,
    pub null: FitOutcome,
    pub alt: FitOutcome,
    /// Present when both fits converged.
    pub test: Option<LikelihoodRatioTest>,
}

impl ComparisonResult {
    pub fn chi_square(&self) -> f64 {
        self.test.as_ref().map_or(f64::NAN, |t| t.chi_square)
    }

    pub fn is_failed(&self) -> bool {
        self.null.is_failed() || self.alt.is_failed()
    }

    pub fn is_degenerate(&self) -> bool {
        self.null.is_degenerate() || self.alt.is_degenerate()
    }
}

/// All model pairs of one algorithm at one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteTest {
    pub site_id: String,
    pub algorithm: Algorithm,
    pub comparisons: Vec<ComparisonResult>,
}

impl SiteTest {
    /// Sum of the pair statistics.
    pub fn chi_square(&self) -> f64 {
        self.comparisons.iter().map(|c| c.chi_square()).sum()
    }

    pub fn degrees_of_freedom(&self) -> usize {
        self.algorithm.degrees_of_freedom()
    }

    pub fn p_value(&self) -> f64 {
        chi_square_p_value(self.chi_square(), self.degrees_of_freedom())
    }

    pub fn is_failed(&self) -> bool {
        self.comparisons.iter().any(|c| c.is_failed())
    }

    pub fn is_degenerate(&self) -> bool {
        self.comparisons.iter().any(|c| c.is_degenerate())
    }

    pub fn comparison(&self, comparison: Comparison) -> Option<&ComparisonResult> {
        self.comparisons.iter().find(|c| c.comparison == comparison)
    }
}

/// Test one site under the given case/control split.
///
/// Array lengths and index ranges are checked by [`Site::validate`] and
/// [`Cohort::validate`]; violating them here panics.
pub fn test_site(
    algorithm: Algorithm,
    site: &Site,
    cases: &[usize],
    controls: &[usize],
    proportions: Option<&[f64]>,
    config: &OptimizerConfig,
) -> Result<SiteTest> {
    let mut comparisons = Vec::with_capacity(algorithm.comparisons().len());

    for &comparison in algorithm.comparisons() {
        let (null, alt) = match comparison.family() {
            DataFamily::Genotype => {
                let case_counts =
                    GenotypeCount::from_haplotype_arrays(cases, &site.ancestry, &site.alleles);
                let control_counts =
                    GenotypeCount::from_haplotype_arrays(controls, &site.ancestry, &site.alleles);
                let null =
                    fit_genotype_model(comparison.null, &case_counts, &control_counts, None, config);
                let seed = null
                    .best_effort()
                    .and_then(|fit| seed_from_null(fit, comparison.alt));
                let alt = fit_genotype_model(
                    comparison.alt,
                    &case_counts,
                    &control_counts,
                    seed.as_deref(),
                    config,
                );
                (null, alt)
            }
            DataFamily::Haplotype => {
                let case_counts = AlleleCount::from_haplotypes(cases, &site.ancestry, &site.alleles);
                let control_counts =
                    AlleleCount::from_haplotypes(controls, &site.ancestry, &site.alleles);
                let null =
                    fit_haplotype_model(comparison.null, &case_counts, &control_counts, None, config);
                let seed = null
                    .best_effort()
                    .and_then(|fit| seed_from_null(fit, comparison.alt));
                let alt = fit_haplotype_model(
                    comparison.alt,
                    &case_counts,
                    &control_counts,
                    seed.as_deref(),
                    config,
                );
                (null, alt)
            }
            DataFamily::Admixture => {
                let props = proportions.ok_or_else(|| {
                    anyhow!("algorithm {} requires pop1 ancestry proportions", algorithm)
                })?;
                let likelihood = AdmixtureLikelihood::new(
                    admixture_dosages(cases, &site.ancestry),
                    pop1_proportions(cases, props),
                );
                let null = fit_admixture(comparison.null, &likelihood, config);
                let alt = fit_admixture(comparison.alt, &likelihood, config);
                (null, alt)
            }
        };

        let test = match (null.converged(), alt.converged()) {
            (Some(n), Some(a)) => Some(LikelihoodRatioTest::new(n.clone(), a.clone())?),
            _ => {
                warn!(
                    "site {}: {:?} vs {:?} not tested (null {}, alternative {})",
                    site.id,
                    comparison.null,
                    comparison.alt,
                    outcome_label(&null),
                    outcome_label(&alt)
                );
                None
            }
        };
        comparisons.push(ComparisonResult {
            comparison,
            null,
            alt,
            test,
        });
    }

    Ok(SiteTest {
        site_id: site.id.clone(),
        algorithm,
        comparisons,
    })
}

fn outcome_label(outcome: &FitOutcome) -> &'static str {
    match outcome {
        FitOutcome::Converged(_) => "converged",
        FitOutcome::Failed(_) => "failed",
        FitOutcome::Degenerate(_) => "degenerate",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Four individuals per ancestry pattern; cases carry more alternate alleles.
    fn toy_site() -> Site {
        let mut ancestry = Vec::new();
        let mut alleles = Vec::new();
        for i in 0..40 {
            ancestry.extend_from_slice(&[(i % 2) as u8, ((i / 2) % 2) as u8]);
            let alt = if i < 20 { (i % 3 == 0) as u8 } else { (i % 3 != 0) as u8 };
            alleles.extend_from_slice(&[alt, (i % 5 == 0) as u8]);
        }
        Site::new("rs1", ancestry, alleles)
    }

    #[test]
    fn test_site_validate() {
        let site = toy_site();
        assert_eq!(site.n_individuals(), 40);
        assert!(site.validate(40).is_ok());
        assert!(site.validate(41).is_err());
        let bad = Site::new("x", vec![0, 2], vec![0, 0]);
        assert!(bad.validate(1).is_err());
    }

    #[test]
    fn test_cohort_validate() {
        let cohort = Cohort::new(vec![0, 1], vec![2, 3]);
        assert!(cohort.validate(4, Algorithm::Snp1).is_ok());
        assert!(cohort.validate(3, Algorithm::Snp1).is_err());
        assert!(cohort.validate(4, Algorithm::Adm).is_err());
        let cohort = cohort.with_proportions(vec![0.5; 4]);
        assert!(cohort.validate(4, Algorithm::AdmHap2).is_ok());
    }

    #[test]
    fn test_snp1_site() {
        let site = toy_site();
        let cases: Vec<usize> = (20..40).collect();
        let controls: Vec<usize> = (0..20).collect();
        let result = test_site(
            Algorithm::Snp1,
            &site,
            &cases,
            &controls,
            None,
            &OptimizerConfig::default(),
        )
        .unwrap();
        assert_eq!(result.site_id, "rs1");
        assert_eq!(result.comparisons.len(), 1);
        assert_eq!(result.degrees_of_freedom(), 1);
        assert!(result.chi_square() >= -1e-6);
        assert!(result.p_value() <= 1.0);
    }

    #[test]
    fn test_admixture_requires_proportions() {
        let site = toy_site();
        let cases: Vec<usize> = (20..40).collect();
        let controls: Vec<usize> = (0..20).collect();
        let result = test_site(
            Algorithm::Adm,
            &site,
            &cases,
            &controls,
            None,
            &OptimizerConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_admhap2_sums_statistics() {
        let site = toy_site();
        let cases: Vec<usize> = (20..40).collect();
        let controls: Vec<usize> = (0..20).collect();
        let props = vec![0.5; 40];
        let result = test_site(
            Algorithm::AdmHap2,
            &site,
            &cases,
            &controls,
            Some(&props),
            &OptimizerConfig::default(),
        )
        .unwrap();
        assert_eq!(result.comparisons.len(), 2);
        let total: f64 = result.comparisons.iter().map(|c| c.chi_square()).sum();
        assert!((result.chi_square() - total).abs() < 1e-12);
        assert_eq!(result.degrees_of_freedom(), 3);
    }
}
