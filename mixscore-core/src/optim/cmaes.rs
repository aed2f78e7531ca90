//! Covariance matrix adaptation evolution strategy.
//!
//! (mu/mu_w, lambda)-CMA-ES with rank-one and rank-mu covariance updates
//! and cumulative step-size adaptation. Box constraints are handled by
//! evaluating the objective at the clamped point and adding a penalty
//! proportional to the clamping distance, scaled by the spread of the
//! generation's values. Selection ranks the unclamped samples by the
//! penalized fitness; the returned optimum is the best unpenalized value
//! seen at a clamped point, the starting point included.
//!
//! Stopping rules: all coordinate deviations below `tol_x`, any deviation
//! above `tol_up_x`, fitness range below `tol_fun` over the recent history,
//! history range below `tol_hist_fun`, a covariance condition number above
//! 1e14, or a flat generation once the step size is already below `tol_x`.
//! Fitness tolerances are relative to `max(1, |best value|)`. Running out of
//! evaluations or a non-finite search state is reported as non-convergence.

use std::collections::VecDeque;

use mixscore_linalg::{DenseMatrix, SymmetricEigen};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use tracing::trace;

use super::{Bounds, Minimizer, Minimum, StopReason};

/// CMA-ES settings.
#[derive(Debug, Clone)]
pub struct CmaEs {
    /// Offspring per generation (lambda).
    pub population_size: usize,
    /// Objective evaluation budget, including the starting point.
    pub max_evaluations: usize,
    /// Seed of the Gaussian sampler.
    pub seed: u64,
    /// Relative step-size floor (multiplied by the largest initial step).
    pub tol_x: f64,
    /// Relative step-size ceiling (multiplied by the largest initial step).
    pub tol_up_x: f64,
    pub tol_fun: f64,
    pub tol_hist_fun: f64,
}

impl CmaEs {
    pub fn new(population_size: usize, max_evaluations: usize, seed: u64) -> Self {
        Self {
            population_size,
            max_evaluations,
            seed,
            tol_x: 1e-11,
            tol_up_x: 1e3,
            tol_fun: 1e-12,
            tol_hist_fun: 1e-13,
        }
    }
}

impl Default for CmaEs {
    fn default() -> Self {
        Self::new(5, 100_000, 42)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Termination {
    TolX,
    TolUpX,
    TolFun,
    TolHistFun,
    IllConditioned,
    FlatFitness,
    Numerical,
    BudgetExhausted,
}

/// Objective wrapper that clamps, counts and penalizes.
struct Evaluator<'a> {
    objective: &'a dyn Fn(&[f64]) -> f64,
    bounds: &'a Bounds,
    evaluations: usize,
}

struct Evaluated {
    repaired: Vec<f64>,
    value: f64,
    penalty: f64,
}

impl Evaluator<'_> {
    fn evaluate(&mut self, x: &[f64]) -> Evaluated {
        let repaired = self.bounds.clamp(x);
        let penalty = x.iter().zip(&repaired).map(|(a, r)| (a - r).abs()).sum::<f64>();
        let value = (self.objective)(&repaired);
        self.evaluations += 1;
        Evaluated {
            repaired,
            value: if value.is_nan() { f64::INFINITY } else { value },
            penalty,
        }
    }
}

impl Minimizer for CmaEs {
    fn minimize(
        &self,
        objective: &dyn Fn(&[f64]) -> f64,
        initial: &[f64],
        bounds: &Bounds,
        steps: &[f64],
    ) -> Minimum {
        let n = initial.len();
        assert_eq!(n, bounds.dim());
        assert_eq!(n, steps.len());
        assert!(n > 0);

        let lambda = self.population_size;
        let mu = lambda / 2;
        let nf = n as f64;

        // Log-linear recombination weights
        let raw: Vec<f64> = (1..=mu)
            .map(|i| ((mu + 1) as f64).ln() - (i as f64).ln())
            .collect();
        let raw_sum: f64 = raw.iter().sum();
        let weights: Vec<f64> = raw.iter().map(|w| w / raw_sum).collect();
        let mueff = 1.0 / weights.iter().map(|w| w * w).sum::<f64>();

        // Strategy parameters
        let max_iterations = (self.max_evaluations / lambda) as f64;
        let cc = (4.0 + mueff / nf) / (nf + 4.0 + 2.0 * mueff / nf);
        let cs = (mueff + 2.0) / (nf + mueff + 3.0);
        let damps = (1.0 + 2.0 * (((mueff - 1.0) / (nf + 1.0)).sqrt() - 1.0).max(0.0))
            * 0.3f64.max(1.0 - nf / (1e-6 + max_iterations))
            + cs;
        let ccov1 = 2.0 / ((nf + 1.3).powi(2) + mueff);
        let ccovmu = (1.0 - ccov1)
            .min(2.0 * (mueff - 2.0 + 1.0 / mueff) / ((nf + 2.0).powi(2) + mueff));
        let chi_n = nf.sqrt() * (1.0 - 1.0 / (4.0 * nf) + 1.0 / (21.0 * nf * nf));
        let history_len = 10 + (30.0 * nf / lambda as f64) as usize;

        // Per-dimension steps become the initial diagonal of D
        let sigma0 = steps.iter().copied().fold(0.0, f64::max);
        let mut sigma = sigma0;
        let mut diag_d: Vec<f64> = steps.iter().map(|s| s / sigma0).collect();
        let mut b = DenseMatrix::identity(n);
        let mut c = DenseMatrix::from_diag(&diag_d.iter().map(|d| d * d).collect::<Vec<_>>());
        let mut bd = DenseMatrix::from_diag(&diag_d);
        let mut pc = vec![0.0; n];
        let mut ps = vec![0.0; n];
        let stop_tol_x = self.tol_x * sigma0;
        let stop_tol_up_x = self.tol_up_x * sigma0;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut evaluator = Evaluator {
            objective,
            bounds,
            evaluations: 0,
        };

        let mut xmean = bounds.clamp(initial);
        let start = evaluator.evaluate(&xmean);
        let mut best_point = start.repaired;
        let mut best_value = start.value;

        let mut history: VecDeque<f64> = VecDeque::with_capacity(history_len + 1);
        history.push_back(best_value);

        let mut arz = vec![vec![0.0; n]; lambda];
        let mut arx = vec![vec![0.0; n]; lambda];
        let mut values = vec![0.0; lambda];
        let mut penalties = vec![0.0; lambda];
        let mut iteration: i32 = 0;

        let termination = loop {
            if evaluator.evaluations + lambda > self.max_evaluations {
                break Termination::BudgetExhausted;
            }
            iteration += 1;

            // Sample and evaluate offspring
            for k in 0..lambda {
                for z in arz[k].iter_mut() {
                    *z = rng.sample(StandardNormal);
                }
                let y = bd.mat_vec(&arz[k]);
                for i in 0..n {
                    arx[k][i] = xmean[i] + sigma * y[i];
                }
                let e = evaluator.evaluate(&arx[k]);
                if e.value < best_value {
                    best_value = e.value;
                    best_point = e.repaired;
                }
                values[k] = e.value;
                penalties[k] = e.penalty;
            }

            let (lo, hi) = values
                .iter()
                .filter(|v| v.is_finite())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                });
            let value_range = if hi >= lo { (hi - lo).max(1.0) } else { 1.0 };
            let fitness: Vec<f64> = values
                .iter()
                .zip(&penalties)
                .map(|(&v, &p)| if p > 0.0 { v + p * value_range } else { v })
                .collect();
            let mut order: Vec<usize> = (0..lambda).collect();
            order.sort_by(|&i, &j| fitness[i].total_cmp(&fitness[j]));

            // Recombination
            let xold = xmean.clone();
            let mut zmean = vec![0.0; n];
            xmean = vec![0.0; n];
            for (w, &k) in weights.iter().zip(&order) {
                for i in 0..n {
                    xmean[i] += w * arx[k][i];
                    zmean[i] += w * arz[k][i];
                }
            }

            // Evolution paths
            let bz = b.mat_vec(&zmean);
            let ps_scale = (cs * (2.0 - cs) * mueff).sqrt();
            for i in 0..n {
                ps[i] = (1.0 - cs) * ps[i] + ps_scale * bz[i];
            }
            let norm_ps = DenseMatrix::dot(&ps, &ps).sqrt();
            let hsig = norm_ps / (1.0 - (1.0 - cs).powi(2 * iteration)).sqrt() / chi_n
                < 1.4 + 2.0 / (nf + 1.0);
            let pc_scale = (cc * (2.0 - cc) * mueff).sqrt();
            for i in 0..n {
                pc[i] *= 1.0 - cc;
                if hsig {
                    pc[i] += pc_scale * (xmean[i] - xold[i]) / sigma;
                }
            }

            // Covariance update
            let old_fac = (if hsig { 0.0 } else { ccov1 * cc * (2.0 - cc) }) + 1.0 - ccov1 - ccovmu;
            c.scale_mut(old_fac);
            c.rank_one_update(ccov1, &pc, &pc);
            for (w, &k) in weights.iter().zip(&order) {
                let step: Vec<f64> = (0..n).map(|i| (arx[k][i] - xold[i]) / sigma).collect();
                c.rank_one_update(ccovmu * w, &step, &step);
            }

            sigma *= ((norm_ps / chi_n - 1.0) * cs / damps).min(1.0).exp();
            if !sigma.is_finite() {
                break Termination::Numerical;
            }

            // Decompose C = B diag(D^2) B'
            c.symmetrize_from_upper();
            let eig = match SymmetricEigen::new(&c) {
                Ok(eig) => eig,
                Err(_) => break Termination::Numerical,
            };
            let mut ev = eig.values;
            if ev.iter().any(|&v| v <= 0.0) {
                for v in ev.iter_mut() {
                    *v = v.max(0.0);
                }
                let tfac = ev.iter().copied().fold(0.0, f64::max) / 1e14;
                add_to_diagonal(&mut c, tfac);
                ev.iter_mut().for_each(|v| *v += tfac);
            }
            let ev_max = ev.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let ev_min = ev.iter().copied().fold(f64::INFINITY, f64::min);
            if ev_max > 1e14 * ev_min {
                let tfac = ev_max / 1e14 - ev_min;
                add_to_diagonal(&mut c, tfac);
                ev.iter_mut().for_each(|v| *v += tfac);
            }
            b = eig.vectors;
            diag_d = ev.iter().map(|v| v.sqrt()).collect();
            bd = b.clone();
            for j in 0..n {
                for i in 0..n {
                    bd.set(i, j, b.get(i, j) * diag_d[j]);
                }
            }

            // Stopping rules
            let best_fitness = fitness[order[0]];
            let worst_fitness = fitness[order[lambda - 1]];
            let diag_c = c.diag();
            if (0..n).all(|i| sigma * pc[i].abs().max(diag_c[i].sqrt()) <= stop_tol_x) {
                break Termination::TolX;
            }
            if (0..n).any(|i| sigma * diag_c[i].sqrt() > stop_tol_up_x) {
                break Termination::TolUpX;
            }
            let d_max = diag_d.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let d_min = diag_d.iter().copied().fold(f64::INFINITY, f64::min);
            if sigma * d_max > stop_tol_up_x {
                break Termination::TolUpX;
            }
            let f_scale = best_value.abs().max(1.0);
            let hist_best = history.iter().copied().fold(f64::INFINITY, f64::min);
            let hist_worst = history.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if iteration > 2
                && hist_worst.max(worst_fitness) - hist_best.min(best_fitness)
                    < self.tol_fun * f_scale
            {
                break Termination::TolFun;
            }
            if iteration as usize > history_len
                && hist_worst - hist_best < self.tol_hist_fun * f_scale
            {
                break Termination::TolHistFun;
            }
            if d_max / d_min > 1e7 {
                break Termination::IllConditioned;
            }

            // Escape flat fitness while the search is still wide
            let flat_generation =
                fitness[order[0]] == fitness[order[(0.1 + lambda as f64 / 4.0) as usize]];
            let flat_history = iteration > 2
                && hist_worst.max(best_fitness) - hist_best.min(best_fitness) == 0.0;
            if flat_generation || flat_history {
                let spread = sigma * diag_c.iter().copied().fold(0.0, f64::max).sqrt();
                if spread <= stop_tol_x {
                    break Termination::FlatFitness;
                }
                let flat_escape = (0.2 + cs / damps).exp();
                if flat_generation {
                    sigma *= flat_escape;
                }
                if flat_history {
                    sigma *= flat_escape;
                }
            }

            history.push_back(best_fitness);
            if history.len() > history_len {
                history.pop_front();
            }
        };

        let stop = match termination {
            Termination::BudgetExhausted => StopReason::BudgetExhausted,
            Termination::Numerical => StopReason::NumericalBreakdown,
            _ => StopReason::Converged,
        };
        trace!(
            "CMA-ES stopped after {} generations ({} evaluations): {:?}, best {:.6}",
            iteration,
            evaluator.evaluations,
            termination,
            best_value
        );

        Minimum {
            point: best_point,
            value: best_value,
            evaluations: evaluator.evaluations,
            stop,
        }
    }
}

fn add_to_diagonal(m: &mut DenseMatrix, value: f64) {
    for i in 0..m.nrows() {
        let v = m.get(i, i);
        m.set(i, i, v + value);
    }
}
