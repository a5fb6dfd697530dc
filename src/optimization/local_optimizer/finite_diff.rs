//! local_optimizer::finite_diff — gradient provider and finite-difference helpers.
//!
//! Purpose
//! -------
//! Supply derivatives of an [`Objective`] to the rest of the crate without
//! depending directly on the `finitediff` API. [`objective_gradient`] is the
//! differentiation provider used both inside the optimizer adapter and when
//! the refinement engine reports an independent `final_gradient_norm`.
//!
//! Key behaviors
//! -------------
//! - Prefer the objective's analytic gradient when it is implemented.
//! - Otherwise take central differences of `f`, retrying with forward
//!   differences when an evaluation fails or the result is non-finite
//!   ([`run_fd_diff`]).
//! - Construct central-difference Hessians of a gradient map, falling back
//!   to forward differences when validation fails, and symmetrize them
//!   ([`compute_hessian`]).
//! - Objectives without an analytic gradient get their Hessian from values
//!   alone, with the larger `ε^{1/4}` step that second differences need.
//!
//! Step sizes
//! ----------
//! `finitediff` perturbs every coordinate by a fixed `sqrt(ε)`. Differencing
//! happens in scaled coordinates `y_i = x_i / s_i` with
//! `s_i = factor · max(1, |x_i|)`, so the effective step in `x` is relative
//! for large coordinates and never drops below the spacing of `f64`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Any error raised by the objective during finite differencing is
//!   captured in a `RefCell` side channel (the FD closure must return
//!   `f64`) and surfaced as an [`OptError`] afterwards.
//! - Gradients and Hessians returned from this module satisfy
//!   [`validate_grad`] and [`validate_hessian`].
use crate::optimization::{
    errors::{OptError, OptResult},
    local_optimizer::{
        traits::Objective,
        types::{Grad, Hessian, Point},
        validation::{validate_grad, validate_hessian},
    },
};
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// objective_gradient — gradient of an objective at `x`.
///
/// Parameters
/// ----------
/// - `f`: objective implementing [`Objective`].
/// - `x`: evaluation point; its length defines the gradient dimension.
///
/// Returns
/// -------
/// `OptResult<Grad>`
///   The analytic gradient when `f.grad` is implemented, otherwise a
///   validated finite-difference approximation.
///
/// Errors
/// ------
/// - Propagates user errors from `grad` other than `GradientNotImplemented`.
/// - Propagates the first objective error raised during finite differencing.
/// - `OptError::GradientDimMismatch` / `OptError::InvalidGradient` when the
///   resulting vector fails validation.
pub fn objective_gradient<F: Objective + ?Sized>(f: &F, x: &Point) -> OptResult<Grad> {
    let dim = x.len();
    match f.grad(x) {
        Ok(g) => {
            validate_grad(&g, dim)?;
            Ok(g)
        }
        Err(OptError::GradientNotImplemented) => {
            let scales = step_scales(x, 1.0);
            let y = x / &scales;
            let closure_err: RefCell<Option<OptError>> = RefCell::new(None);
            let value_func = |y: &Point| scaled_value(f, y, &scales, &closure_err);
            let central = y.central_diff(&value_func) / &scales;
            if closure_err.borrow().is_none() && validate_grad(&central, dim).is_ok() {
                return Ok(central);
            }
            run_fd_diff(&y, &value_func, &closure_err).map(|g| g / &scales)
        }
        Err(e) => Err(e),
    }
}

/// run_fd_diff — forward-difference gradient with error capture and validation.
///
/// The FD closure can’t return `Result`, so any error raised by `func` is
/// stored into `closure_err` and the closure returns `NaN`. This helper:
/// - clears `closure_err`,
/// - performs `forward_diff`,
/// - if an error was captured, returns it as `Err`,
/// - validates the resulting gradient.
///
/// # Errors
/// Returns any error captured during evaluation of `func` inside the FD routine
/// or by validation of the resulting gradient.
pub fn run_fd_diff<G: Fn(&Point) -> f64>(
    x: &Point, func: &G, closure_err: &RefCell<Option<OptError>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let fd_grad = x.forward_diff(func);
    let dim = x.len();
    if let Some(err) = closure_err.take() {
        return Err(err);
    }
    validate_grad(&fd_grad, dim)?;
    Ok(fd_grad)
}

/// compute_hessian — finite-difference Hessian with validation and symmetry.
///
/// Approximates the Hessian of the gradient map `f` at `x` with central
/// differences, falling back to forward differences when validation fails.
/// The result is symmetrized in-place before being returned.
///
/// # Errors
/// - `OptError::HessianDimMismatch` / `OptError::InvalidHessian` when both
///   approximations fail validation.
pub fn compute_hessian<F: Fn(&Point) -> Grad>(f: &F, x: &Point) -> OptResult<Hessian> {
    let dim = x.len();
    let mut cent_hess = x.central_hessian(f);
    match validate_hessian(&cent_hess, dim) {
        Ok(_) => {
            symmetrize_hess(&mut cent_hess);
            Ok(cent_hess)
        }
        Err(_) => {
            let mut forward_hess = x.forward_hessian(f);
            validate_hessian(&forward_hess, dim)?;
            symmetrize_hess(&mut forward_hess);
            Ok(forward_hess)
        }
    }
}

/// objective_hessian — Hessian of an objective at `x`.
///
/// With an analytic gradient, differentiates it once more. Without one,
/// builds the Hessian from values ([`value_hessian`]); differencing a
/// `sqrt(ε)`-step gradient a second time would leave only rounding noise.
///
/// Failures at the perturbed points poison the affected column with `NaN`,
/// which [`compute_hessian`] then reports as `OptError::InvalidHessian`; the
/// first such error is returned in preference when one was captured.
pub fn objective_hessian<F: Objective + ?Sized>(f: &F, x: &Point) -> OptResult<Hessian> {
    match f.grad(x) {
        Ok(_) => gradient_hessian(f, x),
        Err(OptError::GradientNotImplemented) => value_hessian(f, x),
        Err(e) => Err(e),
    }
}

/// value_hessian — Hessian from objective values only.
///
/// Central differences of a central-difference gradient, both with step
/// `ε^{1/4} · max(1, |x_i|)`, which balances truncation against rounding
/// for second derivatives.
pub fn value_hessian<F: Objective + ?Sized>(f: &F, x: &Point) -> OptResult<Hessian> {
    let scales = step_scales(x, f64::EPSILON.powf(-0.25));
    let y = x / &scales;
    let closure_err: RefCell<Option<OptError>> = RefCell::new(None);
    let value_func = |y: &Point| scaled_value(f, y, &scales, &closure_err);
    let grad_func = |y: &Point| -> Grad { y.central_diff(&value_func) };
    match (compute_hessian(&grad_func, &y), closure_err.take()) {
        (Ok(mut h), _) => {
            for ((i, j), entry) in h.indexed_iter_mut() {
                *entry /= scales[i] * scales[j];
            }
            Ok(h)
        }
        (Err(_), Some(err)) => Err(err),
        (Err(err), None) => Err(err),
    }
}

// ---- Helper methods ----

fn gradient_hessian<F: Objective + ?Sized>(f: &F, x: &Point) -> OptResult<Hessian> {
    let dim = x.len();
    let closure_err: RefCell<Option<OptError>> = RefCell::new(None);
    let grad_func = |x: &Point| -> Grad {
        match objective_gradient(f, x) {
            Ok(g) => g,
            Err(e) => {
                let mut slot = closure_err.borrow_mut();
                if slot.is_none() {
                    *slot = Some(e);
                }
                Grad::from_elem(dim, f64::NAN)
            }
        }
    };
    let hessian = compute_hessian(&grad_func, x);
    match (hessian, closure_err.take()) {
        (Ok(h), _) => Ok(h),
        (Err(_), Some(err)) => Err(err),
        (Err(err), None) => Err(err),
    }
}

/// Per-coordinate scales `factor · max(1, |x_i|)`.
fn step_scales(x: &Point, factor: f64) -> Point {
    x.mapv(|v| factor * v.abs().max(1.0))
}

/// `f(s ∘ y)`, recording the first failure in `closure_err` and returning
/// `NaN` in its place.
fn scaled_value<F: Objective + ?Sized>(
    f: &F, y: &Point, scales: &Point, closure_err: &RefCell<Option<OptError>>,
) -> f64 {
    let failure = match f.value(&(y * scales)) {
        Ok(val) if val.is_finite() => return val,
        Ok(val) => OptError::NonFiniteCost { value: val },
        Err(e) => e,
    };
    let mut slot = closure_err.borrow_mut();
    if slot.is_none() {
        *slot = Some(failure);
    }
    f64::NAN
}

fn symmetrize_hess(hess: &mut Hessian) {
    for i in 0..hess.nrows() {
        for j in 0..i {
            let avg = 0.5 * (hess[[i, j]] + hess[[j, i]]);
            hess[[i, j]] = avg;
            hess[[j, i]] = avg;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_functions::FnObjective;
    use approx::assert_relative_eq;
    use ndarray::{Array1, Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The analytic-vs-finite-difference switch in `objective_gradient`.
    // - Forward-difference gradient computation with and without closure errors.
    // - Finite-difference Hessian construction, symmetry, and validation.
    //
    // They intentionally DO NOT cover:
    // - End-to-end optimizer behavior (handled in `api` tests and the
    //   integration suite).
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Verify that `objective_gradient` falls back to finite differences for an
    // objective without an analytic gradient and matches the exact gradient.
    //
    // Given
    // -----
    // - `f(x) = x₀² + 3 x₁²` evaluated at `(1, -2)`.
    //
    // Expect
    // ------
    // - Gradient ≈ `(2, -12)`.
    fn objective_gradient_uses_finite_differences_when_needed() {
        // Arrange
        let f = FnObjective::new(2, |x: &Point| x[0] * x[0] + 3.0 * x[1] * x[1]);
        let x = array![1.0, -2.0];

        // Act
        let g = objective_gradient(&f, &x).expect("FD gradient should succeed");

        // Assert
        assert_relative_eq!(g[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(g[1], -12.0, epsilon = 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // Ensure that `run_fd_diff` propagates an error captured in `closure_err`.
    //
    // Given
    // -----
    // - An objective closure that writes an `OptError` into `closure_err`
    //   and returns `NaN`.
    //
    // Expect
    // ------
    // - `run_fd_diff` returns that error rather than a gradient.
    fn run_fd_diff_closure_error_is_propagated() {
        // Arrange
        let x: Point = Array1::from(vec![1.0_f64]);
        let closure_err: RefCell<Option<OptError>> = RefCell::new(None);
        let f = |_: &Point| {
            closure_err.replace(Some(OptError::ObjectiveFailed { reason: "fd test".into() }));
            f64::NAN
        };

        // Act
        let result = run_fd_diff(&x, &f, &closure_err);

        // Assert
        assert_eq!(result, Err(OptError::ObjectiveFailed { reason: "fd test".into() }));
    }

    #[test]
    // Purpose
    // -------
    // Confirm that `run_fd_diff` returns an error when the finite-difference
    // gradient contains non-finite entries.
    fn run_fd_diff_non_finite_gradient_yields_invalidgradient_error() {
        // Arrange
        let x: Point = Array1::from(vec![0.0_f64, 1.0]);
        let closure_err: RefCell<Option<OptError>> = RefCell::new(None);
        let f = |_x: &Point| f64::NAN;

        // Act
        let result = run_fd_diff(&x, &f, &closure_err);

        // Assert
        match result {
            Err(OptError::InvalidGradient { .. }) => {}
            other => panic!("Expected InvalidGradient, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify that `objective_hessian` recovers the constant Hessian of a
    // quadratic with a cross term.
    //
    // Given
    // -----
    // - `f(x) = x₀² + x₀x₁ + 2x₁²`, Hessian `[[2, 1], [1, 4]]`.
    //
    // Expect
    // ------
    // - Symmetric Hessian matching the exact one.
    fn objective_hessian_matches_quadratic() {
        // Arrange
        let f = FnObjective::new(2, |x: &Point| x[0] * x[0] + x[0] * x[1] + 2.0 * x[1] * x[1]);
        let x = array![0.3, -0.7];

        // Act
        let h = objective_hessian(&f, &x).expect("Hessian should be computed");

        // Assert
        assert_relative_eq!(h[[0, 0]], 2.0, epsilon = 1e-3);
        assert_relative_eq!(h[[0, 1]], 1.0, epsilon = 1e-3);
        assert_relative_eq!(h[[1, 1]], 4.0, epsilon = 1e-3);
        assert_eq!(h[[0, 1]], h[[1, 0]]);
    }

    #[test]
    // Purpose
    // -------
    // Verify that the finite-difference step grows with the coordinate, so
    // far from the origin the gradient does not collapse to zero.
    //
    // Given
    // -----
    // - `f(x) = x₀` at `x₀ = -3.6e8`, where `sqrt(ε)` is below the spacing
    //   of representable values.
    //
    // Expect
    // ------
    // - Gradient ≈ 1.
    fn objective_gradient_is_accurate_at_large_coordinates() {
        // Arrange
        let f = FnObjective::new(1, |x: &Point| x[0]);
        let x = array![-3.6e8];

        // Act
        let g = objective_gradient(&f, &x).expect("FD gradient should succeed");

        // Assert
        assert_relative_eq!(g[0], 1.0, epsilon = 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // Verify that a value-only Hessian resolves small curvature on top of a
    // large constant.
    //
    // Given
    // -----
    // - `f(x) = 1e-3 |x|² + 5` at `(0.3, -0.2)`, Hessian `2e-3 · I`.
    //
    // Expect
    // ------
    // - Diagonal ≈ 2e-3 and off-diagonal ≈ 0, to 1e-6.
    fn value_hessian_resolves_small_curvature() {
        // Arrange
        let f = FnObjective::new(2, |x: &Point| 1e-3 * x.dot(x) + 5.0);
        let x = array![0.3, -0.2];

        // Act
        let h = objective_hessian(&f, &x).expect("Hessian should be computed");

        // Assert
        assert_relative_eq!(h[[0, 0]], 2e-3, epsilon = 1e-6);
        assert_relative_eq!(h[[1, 1]], 2e-3, epsilon = 1e-6);
        assert_relative_eq!(h[[0, 1]], 0.0, epsilon = 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // Ensure that `compute_hessian` surfaces a validation error when both the
    // central- and forward-difference Hessians contain non-finite entries.
    fn compute_hessian_non_finite_entries_yield_invalidhessian_error() {
        // Arrange
        let x: Point = Array1::from(vec![0.0_f64]);
        let grad_fn = |_x: &Point| Array1::from(vec![f64::NAN]);

        // Act
        let result = compute_hessian(&grad_fn, &x);

        // Assert
        match result {
            Err(OptError::InvalidHessian { .. }) => {}
            other => panic!("Expected InvalidHessian, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify that `symmetrize_hess` averages each off-diagonal pair and
    // leaves the diagonal untouched.
    fn symmetrize_hess_makes_matrix_symmetric() {
        // Arrange
        let mut h: Hessian = Array2::from_shape_vec((2, 2), vec![1.0_f64, 2.0, 0.0, 3.0]).unwrap();
        let expected_avg = 0.5 * (h[[0, 1]] + h[[1, 0]]);

        // Act
        super::symmetrize_hess(&mut h);

        // Assert
        assert_eq!(h[[0, 0]], 1.0);
        assert_eq!(h[[1, 1]], 3.0);
        assert_eq!(h[[0, 1]], expected_avg);
        assert_eq!(h[[1, 0]], expected_avg);
    }
}
