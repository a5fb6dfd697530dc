//! refinement::engine — gradient-based refinement of one candidate.
//!
//! Purpose
//! -------
//! Polish a surrogate critical point on the true objective with L-BFGS and
//! report a [`RefinementResult`] describing what happened.
//!
//! Key behaviors
//! -------------
//! - [`select_tolerance`]: values with `|f(x₀)| < precision_threshold` get
//!   the high-precision gradient tolerance, all others the standard one.
//! - The local run stops on the gradient norm, the absolute cost change, the
//!   step length, or the iteration cap. Each rule is labelled, so the
//!   convergence reason is exact rather than inferred.
//! - The final gradient norm is measured independently of the optimizer
//!   through [`objective_gradient`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Numerical non-convergence is data, never an error: optimizer failures,
//!   non-finite results, and runs that do not lower the value yield
//!   `ConvergenceReason::Failed` with the initial point preserved. So do
//!   runs that travel farther than `RefinementConfig::max_displacement`.
//! - An objective failure at the *initial* point is external and surfaces
//!   as [`PipelineError::Transient`].
//! - `converged` implies `final_gradient_norm <= tolerance_used *
//!   gradient_slack`.
use crate::{
    candidates::extractor::CandidatePoint,
    errors::{PipelineError, PipelineResult, Stage, transient},
    optimization::{
        errors::OptError,
        local_optimizer::{
            api::minimize,
            finite_diff::objective_gradient,
            traits::{Objective, StopReason},
            types::Point,
        },
    },
    refinement::{
        config::RefinementConfig,
        result::{ConvergenceReason, RefinementResult, euclidean, min_distance},
    },
};
use argmin_math::ArgminL2Norm;
use log::debug;
use std::time::Instant;

/// select_tolerance — gradient tolerance for a start value.
///
/// Returns the tolerance and a human-readable reason naming the branch.
pub fn select_tolerance(initial_value: f64, config: &RefinementConfig) -> (f64, String) {
    let magnitude = initial_value.abs();
    if magnitude < config.precision_threshold {
        (
            config.high_precision_tolerance,
            format!(
                "high precision: |f(x0)| = {magnitude:.3e} < precision threshold {:.1e}, tolerance {:.1e}",
                config.precision_threshold, config.high_precision_tolerance
            ),
        )
    } else {
        (
            config.standard_tolerance,
            format!(
                "standard: |f(x0)| = {magnitude:.3e} >= precision threshold {:.1e}, tolerance {:.1e}",
                config.precision_threshold, config.standard_tolerance
            ),
        )
    }
}

/// refine — refine one candidate on the true objective.
///
/// `references` are known critical points; when non-empty the result
/// records the distance from the refined point to the nearest one.
///
/// # Errors
/// - [`PipelineError::InvalidConfig`] for an invalid `config`.
/// - [`PipelineError::Transient`] when the objective fails at the
///   candidate.
pub fn refine<F: Objective + ?Sized>(
    objective: &F, candidate: &CandidatePoint, config: &RefinementConfig, references: &[Point],
) -> PipelineResult<RefinementResult> {
    config.validate()?;
    let start = Instant::now();
    let x0 = &candidate.coordinates;
    let v0 = initial_value(objective, x0, Stage::Refinement)?;
    let (tolerance, reason) = select_tolerance(v0, config);

    let run = run_local(objective, x0, v0, tolerance, config, Stage::Refinement)?;
    debug!(
        "region {}: refined {:.6e} -> {:.6e} ({}, {} iterations, |g| = {:.2e})",
        candidate.source_region_id, v0, run.value, run.reason, run.iterations, run.grad_norm
    );
    Ok(RefinementResult {
        position_change_magnitude: euclidean(&run.point, x0),
        value_improvement: v0 - run.value,
        distance_to_reference: min_distance(&run.point, references),
        initial_point: x0.clone(),
        refined_point: run.point,
        initial_value: v0,
        refined_value: run.value,
        converged: run.converged,
        iterations_used: run.iterations,
        convergence_reason: run.reason,
        tolerance_used: tolerance,
        tolerance_selection_reason: reason,
        final_gradient_norm: run.grad_norm,
        region_label: format!("region {}", candidate.source_region_id),
        source_region_id: candidate.source_region_id,
        elapsed_time: start.elapsed(),
    })
}

/// Outcome of one labelled L-BFGS run, already classified.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LocalRun {
    pub point: Point,
    pub value: f64,
    pub reason: ConvergenceReason,
    pub converged: bool,
    pub iterations: usize,
    pub grad_norm: f64,
}

/// Validate the start point and evaluate the objective there.
pub(crate) fn initial_value<F: Objective + ?Sized>(
    objective: &F, x0: &Point, stage: Stage,
) -> PipelineResult<f64> {
    objective.check(x0).map_err(|e| transient(stage, e))?;
    let v0 = objective.value(x0).map_err(|e| transient(stage, e))?;
    if !v0.is_finite() {
        return Err(transient(stage, OptError::NonFiniteCost { value: v0 }));
    }
    Ok(v0)
}

/// run_local — one L-BFGS run from `x0` at gradient tolerance `tolerance`,
/// classified into a [`ConvergenceReason`].
///
/// A start that already meets the gradient rule is returned unchanged
/// without running the optimizer.
pub(crate) fn run_local<F: Objective + ?Sized>(
    objective: &F, x0: &Point, v0: f64, tolerance: f64, config: &RefinementConfig, stage: Stage,
) -> PipelineResult<LocalRun> {
    let opts = config.minimize_options(tolerance).map_err(|_| PipelineError::InvalidConfig {
        field: "tolerance",
        value: tolerance,
        reason: "Gradient tolerance must be finite and positive.",
    })?;
    let g0 = objective_gradient(objective, x0).map_err(|e| transient(stage, e))?.l2_norm();
    let slack = config.gradient_slack;
    let failed = || LocalRun {
        point: x0.clone(),
        value: v0,
        reason: ConvergenceReason::Failed,
        converged: false,
        iterations: 0,
        grad_norm: g0,
    };
    if g0 <= tolerance {
        return Ok(LocalRun {
            point: x0.clone(),
            value: v0,
            reason: ConvergenceReason::GradientToleranceMet,
            converged: true,
            iterations: 0,
            grad_norm: g0,
        });
    }

    let outcome = match minimize(objective, x0.clone(), &opts) {
        Ok(outcome) => outcome,
        Err(e) => {
            debug!("local optimizer failed: {e}");
            return Ok(failed());
        }
    };
    if !outcome.value.is_finite() {
        return Ok(failed());
    }
    if let Some(limit) = config.max_displacement {
        let moved = euclidean(&outcome.minimizer, x0);
        if moved > limit {
            debug!("local run moved {moved:.3e} > {limit:.3e}, discarding");
            return Ok(LocalRun { iterations: outcome.iterations, ..failed() });
        }
    }
    let grad_norm = match objective_gradient(objective, &outcome.minimizer) {
        Ok(g) => g.l2_norm(),
        Err(_) => return Ok(failed()),
    };
    let reason = match outcome.stop {
        StopReason::GradientTolerance => ConvergenceReason::GradientToleranceMet,
        StopReason::CostTolerance => ConvergenceReason::FunctionToleranceMet,
        StopReason::MaxIterations => ConvergenceReason::IterationLimit,
        _ if grad_norm <= tolerance * slack => ConvergenceReason::GradientToleranceMet,
        _ => ConvergenceReason::Failed,
    };
    let improved = outcome.value < v0;
    if reason == ConvergenceReason::Failed || !improved {
        return Ok(LocalRun { iterations: outcome.iterations, ..failed() });
    }
    Ok(LocalRun {
        converged: reason.is_success() && grad_norm <= tolerance * slack,
        point: outcome.minimizer,
        value: outcome.value,
        reason,
        iterations: outcome.iterations,
        grad_norm,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        optimization::errors::OptResult,
        test_functions::{FnObjective, Quadratic, TiltedDoubleWell},
    };
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Tolerance selection at both sides of the precision threshold.
    // - Convergence from a nearby candidate, with and without references.
    // - Failure semantics: no-improvement runs keep the initial point, and
    //   objective errors at the start are transient.
    // -------------------------------------------------------------------------

    fn candidate(x: Point) -> CandidatePoint {
        CandidatePoint { coordinates: x, source_region_id: 2, surrogate_value: 0.0 }
    }

    #[test]
    // Purpose
    // -------
    // Start values below the precision threshold select the high-precision
    // tolerance; larger values select the standard one.
    //
    // Given
    // -----
    // - Default configuration (threshold 1e-6).
    //
    // Expect
    // ------
    // - `1e-8` ⇒ high precision (1e-12); `1e-4` ⇒ standard (1e-8).
    fn tolerance_selection_branches() {
        let config = RefinementConfig::default();

        let (tol_small, reason_small) = select_tolerance(1e-8, &config);
        let (tol_large, reason_large) = select_tolerance(1e-4, &config);

        assert_eq!(tol_small, config.high_precision_tolerance);
        assert!(reason_small.starts_with("high precision"));
        assert_eq!(tol_large, config.standard_tolerance);
        assert!(reason_large.starts_with("standard"));
        assert_eq!(select_tolerance(-1e-8, &config).0, config.high_precision_tolerance);
    }

    #[test]
    // Purpose
    // -------
    // A candidate near the deep minimum of the double well converges to it
    // and the record is internally consistent.
    //
    // Given
    // -----
    // - Candidate `(-0.7, 0.7)`, reference `(-0.74, 0.74)`.
    //
    // Expect
    // ------
    // - Converged with gradient or function reason, refined value below the
    //   initial one, distance to reference below 0.01, and the slack bound
    //   on the final gradient norm.
    fn refine_converges_near_minimum() {
        let w = TiltedDoubleWell::default();
        let config = RefinementConfig::default();
        let refs = vec![array![-0.74, 0.74]];

        let r = refine(&w, &candidate(array![-0.7, 0.7]), &config, &refs).expect("refine");

        assert!(r.converged, "reason {:?}, |g| {}", r.convergence_reason, r.final_gradient_norm);
        assert!(r.convergence_reason.is_success());
        assert!(r.refined_value < r.initial_value);
        assert_relative_eq!(r.value_improvement, r.initial_value - r.refined_value);
        assert!(r.distance_to_reference.expect("reference given") < 0.01);
        assert!(r.final_gradient_norm <= r.tolerance_used * config.gradient_slack);
        assert_eq!(r.region_label, "region 2");
    }

    #[test]
    // Purpose
    // -------
    // A candidate that already sits at the minimizer meets the gradient rule
    // without iterating and keeps its position.
    fn refine_at_exact_minimizer_keeps_point() {
        let f = Quadratic::new(array![0.25, -0.5]);
        let r = refine(&f, &candidate(array![0.25, -0.5]), &RefinementConfig::default(), &[])
            .expect("refine");
        assert!(r.converged);
        assert_eq!(r.convergence_reason, ConvergenceReason::GradientToleranceMet);
        assert_eq!(r.iterations_used, 0);
        assert_eq!(r.refined_point, r.initial_point);
        assert_eq!(r.distance_to_reference, None);
    }

    #[test]
    // Purpose
    // -------
    // An unbounded-below objective cannot satisfy any rule; the run is
    // reported as not converged rather than as an error.
    //
    // Given
    // -----
    // - `f(x) = x₀` (linear), `max_iterations = 5`.
    //
    // Expect
    // ------
    // - `converged == false` and a non-success reason.
    fn refine_of_linear_objective_is_not_converged() {
        let f = FnObjective::new(1, |x: &Point| x[0]);
        let mut config = RefinementConfig::default();
        config.max_iterations = 5;

        let r = refine(&f, &candidate(array![0.0]), &config, &[]).expect("refine");

        assert!(!r.converged);
        assert!(!r.convergence_reason.is_success());
        assert!(r.final_gradient_norm > r.tolerance_used * config.gradient_slack);
    }

    #[test]
    // Purpose
    // -------
    // A run that escapes past the displacement limit is discarded even if
    // the optimizer reports a stop.
    //
    // Given
    // -----
    // - `f(x) = x₀` from `0`, `max_displacement = 2`.
    //
    // Expect
    // ------
    // - `Failed`, not converged, and the initial point is kept.
    fn refine_discards_runs_that_leave_the_neighbourhood() {
        let f = FnObjective::new(1, |x: &Point| x[0]);
        let mut config = RefinementConfig::default().with_max_displacement(2.0);
        config.max_iterations = 5;

        let r = refine(&f, &candidate(array![0.0]), &config, &[]).expect("refine");

        assert_eq!(r.convergence_reason, ConvergenceReason::Failed);
        assert!(!r.converged);
        assert_eq!(r.refined_point, r.initial_point);
        assert_eq!(r.position_change_magnitude, 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Objective failures at the candidate are transient pipeline errors.
    fn objective_failure_at_start_is_transient() {
        struct Failing;
        impl Objective for Failing {
            fn dim(&self) -> usize {
                1
            }
            fn value(&self, _x: &Point) -> OptResult<f64> {
                Err(OptError::ObjectiveFailed { reason: "timeout".into() })
            }
        }
        let err = refine(&Failing, &candidate(array![0.0]), &RefinementConfig::default(), &[])
            .expect_err("start evaluation fails");
        assert!(matches!(err, PipelineError::Transient { stage: Stage::Refinement, .. }));
    }
}
