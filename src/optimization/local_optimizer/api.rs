//! High-level entry point for minimizing a user-provided `Objective`.
//!
//! This selects an L-BFGS solver with either Hager–Zhang or More–Thuente line
//! search, wraps the objective in an `ArgMinAdapter`, and delegates the run to
//! `run_lbfgs`.
use crate::optimization::{
    errors::OptResult,
    local_optimizer::{
        adapter::ArgMinAdapter,
        builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::run_lbfgs,
        traits::{LineSearcher, MinimizeOptions, Objective, OptimOutcome},
        types::Point,
    },
};

/// minimize — run L-BFGS on `f` from `x0`.
///
/// Parameters
/// ----------
/// - `f`: objective; `f.check(&x0)` is called once before the run.
/// - `x0`: starting point.
/// - `opts`: tolerances, line search and L-BFGS memory.
///
/// Returns
/// -------
/// `OptResult<OptimOutcome>` with the best point found, its value, the stop
/// rule that fired and the backend's evaluation counters.
///
/// # Errors
/// - Errors from `f.check`.
/// - Solver configuration errors from the builders.
/// - Objective or backend errors raised while running.
pub fn minimize<F: Objective + ?Sized>(
    f: &F, x0: Point, opts: &MinimizeOptions,
) -> OptResult<OptimOutcome> {
    f.check(&x0)?;
    let problem = ArgMinAdapter::new(f);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(x0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(x0, opts, problem, solver)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::{
        errors::OptError,
        local_optimizer::traits::{StopReason, Tolerances},
    };
    use crate::test_functions::{Quadratic, TiltedDoubleWell};
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Convergence of `minimize` on smooth objectives with both line searches.
    // - Reporting of the stop rule and input validation.
    //
    // They intentionally DO NOT cover:
    // - Stage logic of the refinement engines (see `refinement`).
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // `minimize` finds the minimizer of a shifted quadratic and reports the
    // gradient rule.
    //
    // Given
    // -----
    // - `f(x) = Σ (x_i - c_i)²` with `c = (0.3, -0.2)`, start at the origin.
    //
    // Expect
    // ------
    // - Minimizer ≈ `c`, value ≈ 0.
    // - Stop reason is `GradientTolerance` or the backend's own convergence.
    fn minimize_converges_on_quadratic() {
        // Arrange
        let f = Quadratic::new(array![0.3, -0.2]);
        let opts = MinimizeOptions::default();

        // Act
        let out = minimize(&f, array![0.0, 0.0], &opts).expect("minimize should succeed");

        // Assert
        assert_relative_eq!(out.minimizer[0], 0.3, epsilon = 1e-6);
        assert_relative_eq!(out.minimizer[1], -0.2, epsilon = 1e-6);
        assert!(out.value.abs() < 1e-10);
        assert!(matches!(out.stop, StopReason::GradientTolerance | StopReason::SolverConverged));
    }

    #[test]
    // Purpose
    // -------
    // Both line searches reach the deeper well of the tilted double well when
    // started inside its basin.
    fn minimize_both_line_searches_reach_deep_well() {
        // Arrange
        let f = TiltedDoubleWell::default();
        let tols = Tolerances::new(Some(1e-9), None, None, Some(200)).expect("valid tolerances");

        for ls in [LineSearcher::MoreThuente, LineSearcher::HagerZhang] {
            let opts = MinimizeOptions::new(tols, ls, None).expect("valid options");

            // Act
            let out = minimize(&f, array![-0.6, 0.6], &opts).expect("minimize should succeed");

            // Assert
            assert_relative_eq!(out.minimizer[0], -0.74, epsilon = 1e-2);
            assert_relative_eq!(out.minimizer[1], 0.74, epsilon = 1e-2);
            assert!(out.value < -0.87);
        }
    }

    #[test]
    // Purpose
    // -------
    // A starting point of the wrong dimension is rejected before any solver
    // work.
    fn minimize_rejects_wrong_dimension() {
        let f = Quadratic::new(array![0.0, 0.0]);
        let result = minimize(&f, array![0.0], &MinimizeOptions::default());
        assert_eq!(result, Err(OptError::DimensionMismatch { expected: 2, found: 1 }));
    }
}
