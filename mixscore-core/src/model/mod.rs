//! Fitted models and their outcomes.
//!
//! Every likelihood model belongs to one data family and has a fixed
//! number of free parameters. A fit either converges, exhausts its
//! evaluation budget, or is degenerate because the input cannot support
//! an estimate.

pub mod fit;

pub use fit::{fit_admixture, fit_genotype_model, fit_haplotype_model, seed_from_null};

use serde::{Deserialize, Serialize};

/// The input a model is fitted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataFamily {
    Genotype,
    Haplotype,
    Admixture,
}

/// The nested model variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    /// Genotype model, odds ratio fixed at 1: `[pa, pe]`.
    FrequencyOnly,
    /// Genotype model, one odds ratio for both ancestries: `[pa, pe, r]`.
    SharedOddsRatio,
    /// Genotype model, one odds ratio per ancestry: `[pa, pe, ra, re]`.
    TwoOddsRatios,
    /// Haplotype model, cases share control frequencies: `[pa, pe]`.
    HaplotypeFrequencyOnly,
    /// Haplotype model, one odds ratio: `[pa, pe, r]`.
    HaplotypeSharedOddsRatio,
    /// Haplotype model, free case frequencies: `[pa, pe, pa', pe']`.
    /// Reported as `[pa, pe, ra, re]` after the fit.
    HaplotypeTwoOddsRatios,
    /// Admixture model with omega fixed at 1.
    AdmixtureNull,
    /// Admixture model with free omega: `[omega]`.
    Admixture,
}

impl ModelKind {
    /// Number of free parameters.
    pub fn arity(&self) -> usize {
        match self {
            ModelKind::FrequencyOnly | ModelKind::HaplotypeFrequencyOnly => 2,
            ModelKind::SharedOddsRatio | ModelKind::HaplotypeSharedOddsRatio => 3,
            ModelKind::TwoOddsRatios | ModelKind::HaplotypeTwoOddsRatios => 4,
            ModelKind::AdmixtureNull => 0,
            ModelKind::Admixture => 1,
        }
    }

    pub fn family(&self) -> DataFamily {
        match self {
            ModelKind::FrequencyOnly | ModelKind::SharedOddsRatio | ModelKind::TwoOddsRatios => {
                DataFamily::Genotype
            }
            ModelKind::HaplotypeFrequencyOnly
            | ModelKind::HaplotypeSharedOddsRatio
            | ModelKind::HaplotypeTwoOddsRatios => DataFamily::Haplotype,
            ModelKind::AdmixtureNull | ModelKind::Admixture => DataFamily::Admixture,
        }
    }
}

/// Optimized model: negative log-likelihood and reported parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFit {
    pub kind: ModelKind,
    pub neg_log_likelihood: f64,
    pub parameters: Vec<f64>,
    /// Objective evaluations spent by the optimizer.
    pub evaluations: usize,
}

/// Why a fit did not converge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FitFailure {
    /// The optimizer ran out of evaluations; `best` is the best point seen.
    EvaluationBudgetExhausted { best: ModelFit },
    /// The search state became non-finite before any stopping rule fired.
    NumericalBreakdown { best: ModelFit },
}

/// Why the input could not support a fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Degeneracy {
    /// An ancestry group needed for an initial frequency has no observations.
    EmptyAncestryGroup,
    /// The optimum has a non-finite likelihood or parameter.
    NonFiniteOptimum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FitOutcome {
    Converged(ModelFit),
    Failed(FitFailure),
    Degenerate(Degeneracy),
}

impl FitOutcome {
    /// The fit, if it converged.
    pub fn converged(&self) -> Option<&ModelFit> {
        match self {
            FitOutcome::Converged(fit) => Some(fit),
            _ => None,
        }
    }

    /// The best point found, converged or not.
    pub fn best_effort(&self) -> Option<&ModelFit> {
        match self {
            FitOutcome::Converged(fit) => Some(fit),
            FitOutcome::Failed(
                FitFailure::EvaluationBudgetExhausted { best } | FitFailure::NumericalBreakdown { best },
            ) => Some(best),
            FitOutcome::Degenerate(_) => None,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, FitOutcome::Converged(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FitOutcome::Failed(_))
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, FitOutcome::Degenerate(_))
    }
}
