//! Labelled stopping rules layered on top of an argmin solver.
//!
//! argmin's L-BFGS reports both its gradient and its cost-change test as
//! `SolverConverged`, and it has no parameter-change test at all. The
//! refinement engine needs to know *which* rule ended a run, so
//! [`StoppingRules`] wraps any solver over the crate's `IterState` and checks
//! the configured rules first, terminating with a labelled
//! `TerminationReason::SolverExit`. The inner solver's own test runs after
//! ours and is reported unchanged.
use crate::optimization::local_optimizer::{
    traits::Tolerances,
    types::{Cost, Grad, Point},
};
use argmin::core::{
    Error, IterState, KV, Problem, Solver, State, TerminationReason, TerminationStatus,
};
use argmin_math::ArgminL2Norm;

/// Exit label used when the gradient-norm rule fires.
pub const GRADIENT_RULE: &str = "gradient tolerance met";
/// Exit label used when the absolute cost-change rule fires.
pub const COST_RULE: &str = "function value tolerance met";
/// Exit label used when the step-length rule fires.
pub const PARAMETER_RULE: &str = "parameter change tolerance met";

/// State type shared by every gradient-based solver in this crate.
pub type LbfgsState = IterState<Point, Grad, (), (), (), Cost>;

/// Solver wrapper that adds labelled gradient, cost and parameter rules.
#[derive(Debug, Clone)]
pub struct StoppingRules<S> {
    inner: S,
    tol_grad: Option<f64>,
    tol_cost: Option<f64>,
    tol_param: Option<f64>,
}

impl<S> StoppingRules<S> {
    /// Wrap `inner` with the rules carried by `tols` (`max_iter` is applied by
    /// the executor, not here).
    pub fn new(inner: S, tols: &Tolerances) -> Self {
        Self { inner, tol_grad: tols.tol_grad, tol_cost: tols.tol_cost, tol_param: tols.tol_param }
    }

    fn labelled(label: &str) -> TerminationStatus {
        TerminationStatus::Terminated(TerminationReason::SolverExit(label.to_string()))
    }
}

impl<O, S> Solver<O, LbfgsState> for StoppingRules<S>
where
    S: Solver<O, LbfgsState>,
{
    const NAME: &'static str = "L-BFGS with labelled stopping rules";

    fn init(
        &mut self, problem: &mut Problem<O>, state: LbfgsState,
    ) -> Result<(LbfgsState, Option<KV>), Error> {
        self.inner.init(problem, state)
    }

    fn next_iter(
        &mut self, problem: &mut Problem<O>, state: LbfgsState,
    ) -> Result<(LbfgsState, Option<KV>), Error> {
        self.inner.next_iter(problem, state)
    }

    fn terminate(&mut self, state: &LbfgsState) -> TerminationStatus {
        if let (Some(tol), Some(grad)) = (self.tol_grad, state.get_gradient()) {
            if grad.l2_norm() < tol {
                return Self::labelled(GRADIENT_RULE);
            }
        }
        if state.get_iter() > 0 {
            if let Some(tol) = self.tol_cost {
                let change = (state.get_prev_cost() - state.get_cost()).abs();
                if change < tol {
                    return Self::labelled(COST_RULE);
                }
            }
            if let (Some(tol), Some(x), Some(prev)) =
                (self.tol_param, state.get_param(), state.get_prev_param())
            {
                if (x - prev).l2_norm() < tol {
                    return Self::labelled(PARAMETER_RULE);
                }
            }
        }
        self.inner.terminate(state)
    }
}
