//! Validation helpers for local optimization.
//!
//! This module centralizes common consistency checks used across the
//! optimizer interface:
//!
//! - **Tolerance checks**: [`verify_tol_grad`], [`verify_tol_cost`],
//!   [`verify_tol_param`] ensure numeric tolerances are finite and strictly
//!   positive when provided.
//! - **Points**: [`validate_point`] enforces dimension and finite entries on
//!   user-supplied starting points.
//! - **Gradient validation**: [`validate_grad`] enforces correct dimension
//!   and finite entries.
//! - **Minimizers**: [`validate_minimizer`] ensures a solver result exists
//!   and contains only finite values.
//! - **Objective values**: [`validate_value`] checks objective outputs for
//!   finiteness.
//!
//! These helpers standardize error reporting by returning domain-specific
//! [`OptError`] variants.
use crate::optimization::{
    errors::{OptError, OptResult},
    local_optimizer::types::{Grad, Hessian, Point},
};

/// Validate the optional gradient‐norm tolerance.
///
/// - Accepts `None` (no stopping rule on gradient).
/// - If `Some`, the value must be **finite** and **strictly positive**.
///
/// # Errors
/// Returns [`OptError::InvalidTolGrad`] if the value is non-finite or ≤ 0.0.
pub fn verify_tol_grad(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

/// Validate the optional cost‐change tolerance (for convergence).
///
/// # Errors
/// Returns [`OptError::InvalidTolCost`] if the value is non-finite or ≤ 0.0.
pub fn verify_tol_cost(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

/// Validate the optional parameter‐change tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidTolParam`] if the value is non-finite or ≤ 0.0.
pub fn verify_tol_param(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(OptError::InvalidTolParam { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidTolParam { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

/// Validate a point against the expected dimension and finiteness.
///
/// # Errors
/// - [`OptError::DimensionMismatch`] if `x.len() != dim`.
/// - [`OptError::InvalidPoint`] for the first non-finite coordinate.
pub fn validate_point(x: &Point, dim: usize) -> OptResult<()> {
    if x.len() != dim {
        return Err(OptError::DimensionMismatch { expected: dim, found: x.len() });
    }
    for (index, &value) in x.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidPoint { index, value });
        }
    }
    Ok(())
}

/// Validate a gradient vector against dimension and finiteness.
///
/// Checks:
/// - `grad.len() == dim`
/// - every element is finite (`NaN` or `±∞` are rejected)
///
/// # Errors
/// - [`OptError::GradientDimMismatch`] if length does not match `dim`.
/// - [`OptError::InvalidGradient`] with the index/value/reason of the first
///   offending element.
pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    for (index, &value) in grad.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidGradient {
                index,
                value,
                reason: "Gradient elements must be finite.",
            });
        }
    }
    Ok(())
}

/// Validate and unwrap a minimizer returned by a solver.
///
/// Accepts only a present vector with all **finite** entries.
///
/// # Errors
/// - [`OptError::MissingMinimizer`] if no vector was provided.
/// - [`OptError::InvalidMinimizer`] if any element is non-finite.
pub fn validate_minimizer(minimizer: Option<Point>) -> OptResult<Point> {
    match minimizer {
        Some(x) => {
            for (index, &value) in x.iter().enumerate() {
                if !value.is_finite() {
                    return Err(OptError::InvalidMinimizer {
                        index,
                        value,
                        reason: "Minimizer coordinates must be finite.",
                    });
                }
            }
            Ok(x)
        }
        None => Err(OptError::MissingMinimizer),
    }
}

/// Validate that a scalar objective value is finite.
///
/// # Errors
/// Returns [`OptError::NonFiniteCost`] if the value is `NaN` or infinite.
pub fn validate_value(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCost { value });
    }
    Ok(())
}

/// Validate the shape and entries of a Hessian matrix.
///
/// # Errors
/// - [`OptError::HessianDimMismatch`] if dimensions do not match `dim`.
/// - [`OptError::InvalidHessian`] if any entry is non-finite, with offending
///   row/col indices and value.
pub fn validate_hessian(hessian: &Hessian, dim: usize) -> OptResult<()> {
    if hessian.nrows() != dim || hessian.ncols() != dim {
        return Err(OptError::HessianDimMismatch {
            expected: dim,
            found: (hessian.nrows(), hessian.ncols()),
        });
    }
    for ((i, j), &value) in hessian.indexed_iter() {
        if !value.is_finite() {
            return Err(OptError::InvalidHessian { row: i, col: j, value });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Check that tolerance validators reject zero, negative and non-finite
    // values while accepting `None` and positive finite values.
    fn tolerance_validators_reject_non_positive_and_non_finite() {
        assert!(verify_tol_grad(None).is_ok());
        assert!(verify_tol_grad(Some(1e-8)).is_ok());
        assert!(matches!(verify_tol_grad(Some(0.0)), Err(OptError::InvalidTolGrad { .. })));
        assert!(matches!(verify_tol_cost(Some(-1.0)), Err(OptError::InvalidTolCost { .. })));
        assert!(matches!(
            verify_tol_param(Some(f64::NAN)),
            Err(OptError::InvalidTolParam { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Ensure `validate_point` reports dimension mismatches before finiteness.
    fn validate_point_reports_dimension_then_finiteness() {
        let x = array![1.0, f64::NAN];
        assert_eq!(
            validate_point(&x, 3),
            Err(OptError::DimensionMismatch { expected: 3, found: 2 })
        );
        assert!(matches!(validate_point(&x, 2), Err(OptError::InvalidPoint { index: 1, .. })));
    }

    #[test]
    // Purpose
    // -------
    // Ensure `validate_minimizer` distinguishes a missing result from a
    // non-finite one.
    fn validate_minimizer_missing_and_non_finite() {
        assert_eq!(validate_minimizer(None), Err(OptError::MissingMinimizer));
        assert!(matches!(
            validate_minimizer(Some(array![0.0, f64::INFINITY])),
            Err(OptError::InvalidMinimizer { index: 1, .. })
        ));
        assert_eq!(validate_minimizer(Some(array![0.5])), Ok(array![0.5]));
    }
}
