//! Execution helper that runs an `argmin` solver on an objective and returns
//! a crate-friendly [`OptimOutcome`].
use crate::optimization::{
    errors::OptResult,
    local_optimizer::{
        adapter::ArgMinAdapter,
        stopping::{LbfgsState, StoppingRules},
        traits::{MinimizeOptions, Objective, OptimOutcome},
        types::Point,
    },
};
use argmin::core::{CostFunction, Executor, Solver, State};
use log::{debug, log_enabled, Level};

/// run_lbfgs — execute a configured solver and normalize its result.
///
/// The solver is wrapped in [`StoppingRules`] so the outcome records which
/// rule ended the run. `opts.tols.max_iter` becomes the executor's
/// iteration cap.
///
/// # Errors
/// - Any error raised by the objective or the backend during the run.
/// - Validation errors for a missing or non-finite minimizer/value.
pub fn run_lbfgs<'a, F, S>(
    x0: Point, opts: &MinimizeOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<OptimOutcome>
where
    F: Objective + ?Sized,
    S: Solver<ArgMinAdapter<'a, F>, LbfgsState> + Send + 'static,
{
    if log_enabled!(Level::Debug) {
        if let Ok(f0) = problem.cost(&x0) {
            debug!("lbfgs start: f(x0) = {f0:.6e}, dim = {}", x0.len());
        }
    }
    let solver = StoppingRules::new(solver, &opts.tols);
    let mut optimizer = Executor::new(problem, solver);
    optimizer = optimizer.configure(|state| state.param(x0));
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let grad = result.take_gradient();
    let outcome = OptimOutcome::new(
        result.take_best_param(),
        result.get_best_cost(),
        &termination,
        iterations,
        function_counts,
        grad,
    )?;
    debug!(
        "lbfgs done: f = {:.6e}, iterations = {}, stop = {:?}",
        outcome.value, outcome.iterations, outcome.stop
    );
    Ok(outcome)
}
