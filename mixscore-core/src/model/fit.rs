//! Model fitting: initial guesses, search boxes and outcome classification.
//!
//! Genotype and haplotype models start from the control-group frequency
//! estimates with odds ratios at 1, or from an explicit seed (normally the
//! optimum of the nested null, see [`seed_from_null`]). Starting points
//! that cannot be computed because an ancestry group is empty make the fit
//! degenerate instead of being searched.

use tracing::debug;

use super::{Degeneracy, FitFailure, FitOutcome, ModelFit, ModelKind};
use crate::counts::{AlleleCount, GenotypeCount};
use crate::likelihood::haplotype::frequency_estimates;
use crate::likelihood::{
    odds_ratio_from_frequencies, AdmixtureLikelihood, GenotypeLikelihood, HaplotypeLikelihood,
    Likelihood,
};
use crate::optim::{Bounds, Minimizer, OptimizerConfig, StopReason};

/// Fit a genotype model to case and control counts.
pub fn fit_genotype_model(
    kind: ModelKind,
    cases: &GenotypeCount,
    controls: &GenotypeCount,
    initial: Option<&[f64]>,
    config: &OptimizerConfig,
) -> FitOutcome {
    let likelihood = GenotypeLikelihood::new(kind, cases, controls);
    let start = match initial {
        Some(seed) => seed.to_vec(),
        None => initial_guess(kind, likelihood.controls().frequency_estimates()),
    };
    fit_with(&likelihood, kind, start, config)
}

/// Fit a haplotype model to case and control allele counts.
pub fn fit_haplotype_model(
    kind: ModelKind,
    cases: &AlleleCount,
    controls: &AlleleCount,
    initial: Option<&[f64]>,
    config: &OptimizerConfig,
) -> FitOutcome {
    let likelihood = HaplotypeLikelihood::new(kind, cases, controls);
    let start = match initial {
        Some(seed) => seed.to_vec(),
        None => initial_guess(kind, frequency_estimates(controls)),
    };
    fit_with(&likelihood, kind, start, config)
}

/// Fit the admixture model: omega fixed at 1 for the null, Brent search
/// on `[0, max_omega]` from 1 otherwise.
pub fn fit_admixture(
    kind: ModelKind,
    likelihood: &AdmixtureLikelihood,
    config: &OptimizerConfig,
) -> FitOutcome {
    match kind {
        ModelKind::AdmixtureNull => {
            let value = likelihood.neg_log_likelihood_at(1.0);
            if !value.is_finite() {
                return FitOutcome::Degenerate(Degeneracy::NonFiniteOptimum);
            }
            FitOutcome::Converged(ModelFit {
                kind,
                neg_log_likelihood: value,
                parameters: Vec::new(),
                evaluations: 1,
            })
        }
        ModelKind::Admixture => {
            let bounds = Bounds::new(vec![0.0], vec![config.max_omega]);
            let objective = |p: &[f64]| likelihood.neg_log_likelihood(p);
            let min = config.brent().minimize(&objective, &[1.0], &bounds, &[]);
            classify(kind, min.point, min.value, min.evaluations, min.stop)
        }
        other => panic!("{:?} is not an admixture model", other),
    }
}

/// Starting point of `alt` derived from the optimum of its nested null.
///
/// The seed reproduces the null's likelihood exactly, so the alternative
/// can only improve on it. Returns `None` for pairs that are not nested.
pub fn seed_from_null(null: &ModelFit, alt: ModelKind) -> Option<Vec<f64>> {
    let p = &null.parameters;
    match (null.kind, alt) {
        (ModelKind::FrequencyOnly, ModelKind::SharedOddsRatio)
        | (ModelKind::HaplotypeFrequencyOnly, ModelKind::HaplotypeSharedOddsRatio) => {
            Some(vec![p[0], p[1], 1.0])
        }
        (ModelKind::FrequencyOnly, ModelKind::TwoOddsRatios) => Some(vec![p[0], p[1], 1.0, 1.0]),
        (ModelKind::SharedOddsRatio, ModelKind::TwoOddsRatios) => {
            Some(vec![p[0], p[1], p[2], p[2]])
        }
        (ModelKind::HaplotypeFrequencyOnly, ModelKind::HaplotypeTwoOddsRatios) => {
            Some(vec![p[0], p[1], p[0], p[1]])
        }
        (ModelKind::AdmixtureNull, ModelKind::Admixture) => Some(vec![1.0]),
        _ => None,
    }
}

/// Default start: control frequencies, odds ratios at 1.
fn initial_guess(kind: ModelKind, [pa, pe]: [f64; 2]) -> Vec<f64> {
    match kind {
        ModelKind::HaplotypeTwoOddsRatios => vec![pa, pe, pa, pe],
        _ => {
            let mut start = vec![pa, pe];
            start.resize(kind.arity(), 1.0);
            start
        }
    }
}

/// Search box and initial step sizes of a frequency/odds-ratio model.
fn search_space(kind: ModelKind, config: &OptimizerConfig) -> (Bounds, Vec<f64>) {
    let (f_lo, f_hi) = config.frequency_bounds();
    let n = kind.arity();
    let mut lower = Vec::with_capacity(n);
    let mut upper = Vec::with_capacity(n);
    let mut steps = Vec::with_capacity(n);
    for i in 0..n {
        if i < 2 || kind == ModelKind::HaplotypeTwoOddsRatios {
            lower.push(f_lo);
            upper.push(f_hi);
            steps.push(config.frequency_step);
        } else {
            lower.push(0.0);
            upper.push(config.max_odds_ratio);
            steps.push(config.ratio_step);
        }
    }
    (Bounds::new(lower, upper), steps)
}

fn fit_with<L: Likelihood>(
    likelihood: &L,
    kind: ModelKind,
    start: Vec<f64>,
    config: &OptimizerConfig,
) -> FitOutcome {
    assert_eq!(start.len(), kind.arity());
    if start.iter().any(|v| !v.is_finite()) {
        debug!("{:?}: no starting point, an ancestry group is empty", kind);
        return FitOutcome::Degenerate(Degeneracy::EmptyAncestryGroup);
    }

    let (bounds, steps) = search_space(kind, config);
    let objective = |p: &[f64]| likelihood.neg_log_likelihood(p);
    let min = config.cmaes().minimize(&objective, &start, &bounds, &steps);
    classify(kind, min.point, min.value, min.evaluations, min.stop)
}

fn classify(
    kind: ModelKind,
    point: Vec<f64>,
    value: f64,
    evaluations: usize,
    stop: StopReason,
) -> FitOutcome {
    if !value.is_finite() || point.iter().any(|v| !v.is_finite()) {
        debug!("{:?}: non-finite optimum {}", kind, value);
        return FitOutcome::Degenerate(Degeneracy::NonFiniteOptimum);
    }

    let parameters = match kind {
        // report case frequencies as odds ratios against the controls
        ModelKind::HaplotypeTwoOddsRatios => vec![
            point[0],
            point[1],
            odds_ratio_from_frequencies(point[0], point[2]),
            odds_ratio_from_frequencies(point[1], point[3]),
        ],
        _ => point,
    };
    let fit = ModelFit {
        kind,
        neg_log_likelihood: value,
        parameters,
        evaluations,
    };
    debug!(
        "{:?}: nll {:.6} at {:?} after {} evaluations",
        kind, fit.neg_log_likelihood, fit.parameters, fit.evaluations
    );

    match stop {
        StopReason::Converged => FitOutcome::Converged(fit),
        StopReason::BudgetExhausted => {
            FitOutcome::Failed(FitFailure::EvaluationBudgetExhausted { best: fit })
        }
        StopReason::NumericalBreakdown => {
            FitOutcome::Failed(FitFailure::NumericalBreakdown { best: fit })
        }
    }
}
