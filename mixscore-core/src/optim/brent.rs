//! Univariate bounded minimization with Brent's method.
//!
//! Delegates to argmin's `BrentOpt` on `[lower, upper]`. The starting
//! point is evaluated as well and wins ties, so the result is never worse
//! than the start.

use std::cell::Cell;

use argmin::core::{CostFunction, Error, Executor, State, TerminationReason};
use argmin::solver::brent::BrentOpt;
use tracing::trace;

use super::{Bounds, Minimizer, Minimum, StopReason};

/// Brent line-search settings.
#[derive(Debug, Clone)]
pub struct Brent {
    pub relative_tolerance: f64,
    pub absolute_tolerance: f64,
    pub max_iterations: usize,
}

impl Brent {
    pub fn new(relative_tolerance: f64, absolute_tolerance: f64, max_iterations: usize) -> Self {
        Self {
            relative_tolerance,
            absolute_tolerance,
            max_iterations,
        }
    }
}

impl Default for Brent {
    fn default() -> Self {
        Self::new(1e-10, 1e-14, 100_000)
    }
}

struct LineCost<'a> {
    objective: &'a dyn Fn(&[f64]) -> f64,
    evaluations: &'a Cell<usize>,
}

impl LineCost<'_> {
    fn value(&self, x: f64) -> f64 {
        self.evaluations.set(self.evaluations.get() + 1);
        let v = (self.objective)(&[x]);
        if v.is_nan() {
            f64::INFINITY
        } else {
            v
        }
    }
}

impl CostFunction for LineCost<'_> {
    type Param = f64;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.value(*param))
    }
}

impl Minimizer for Brent {
    fn minimize(
        &self,
        objective: &dyn Fn(&[f64]) -> f64,
        initial: &[f64],
        bounds: &Bounds,
        _steps: &[f64],
    ) -> Minimum {
        assert_eq!(bounds.dim(), 1);
        assert_eq!(initial.len(), 1);
        let start = bounds.clamp(initial)[0];
        let evaluations = Cell::new(0);
        let cost = LineCost {
            objective,
            evaluations: &evaluations,
        };
        let start_value = cost.value(start);

        let solver = BrentOpt::new(bounds.lower[0], bounds.upper[0])
            .set_tolerance(self.relative_tolerance, self.absolute_tolerance);
        let run = Executor::new(cost, solver)
            .configure(|state| state.param(start).max_iters(self.max_iterations as u64))
            .run();

        let (mut point, mut value, stop) = match run {
            Ok(res) => {
                let state = res.state();
                let stop = match state.get_termination_reason() {
                    Some(TerminationReason::SolverConverged) => StopReason::Converged,
                    _ => StopReason::BudgetExhausted,
                };
                (state.best_param.unwrap_or(start), state.best_cost, stop)
            }
            Err(e) => {
                trace!("Brent search aborted: {}", e);
                (start, start_value, StopReason::NumericalBreakdown)
            }
        };
        if value.is_nan() || value >= start_value {
            point = start;
            value = start_value;
        }
        trace!(
            "Brent stopped after {} evaluations at {:.6}: {:?}",
            evaluations.get(),
            point,
            stop
        );

        Minimum {
            point: vec![point],
            value,
            evaluations: evaluations.get(),
            stop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parabola() {
        let f = |x: &[f64]| (x[0] - 2.5).powi(2) + 1.0;
        let bounds = Bounds::new(vec![0.0], vec![50.0]);
        let min = Brent::default().minimize(&f, &[1.0], &bounds, &[]);
        assert!(min.converged());
        assert!((min.point[0] - 2.5).abs() < 1e-6);
        assert!((min.value - 1.0).abs() < 1e-10);
        assert!(min.evaluations > 1);
    }

    #[test]
    fn test_minimum_at_bound() {
        let f = |x: &[f64]| x[0];
        let bounds = Bounds::new(vec![0.0], vec![50.0]);
        let min = Brent::default().minimize(&f, &[1.0], &bounds, &[]);
        assert!(min.point[0] < 1e-6);
        assert!(min.value <= 1.0);
    }

    #[test]
    fn test_start_wins_on_flat_objective() {
        let f = |_: &[f64]| 3.0;
        let bounds = Bounds::new(vec![0.0], vec![50.0]);
        let min = Brent::default().minimize(&f, &[1.0], &bounds, &[]);
        assert_eq!(min.point, vec![1.0]);
        assert_eq!(min.value, 3.0);
    }
}
