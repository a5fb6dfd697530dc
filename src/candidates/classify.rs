//! candidates::classify — critical-point type from Hessian eigenvalues.
//!
//! Purpose
//! -------
//! Label a refined point as a minimum, maximum, saddle or degenerate point
//! by the signs of the eigenvalues of the objective Hessian there.
//!
//! Key behaviors
//! -------------
//! - Build the Hessian with [`objective_hessian`] (differences of the
//!   analytic gradient, or of values when there is none; symmetrized
//!   upstream).
//! - Copy it into a `nalgebra::DMatrix` ([`fill_dmatrix`]) and take the
//!   symmetric eigendecomposition.
//! - Eigenvalues with magnitude at most
//!   `DEGENERACY_EPS · max(1, max|λ|)` count as zero.
//!
//! Conventions
//! -----------
//! - Classification never fails the pipeline: a Hessian that cannot be
//!   computed yields [`PointType::Unclassified`].
use crate::optimization::{
    errors::OptResult,
    local_optimizer::{
        finite_diff::objective_hessian,
        traits::Objective,
        types::{Hessian, Point},
    },
};
use nalgebra::DMatrix;
use serde::Serialize;

/// Relative threshold below which an eigenvalue is treated as zero.
pub const DEGENERACY_EPS: f64 = 1e-5;

/// Type of a critical point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PointType {
    Minimum,
    Maximum,
    Saddle,
    /// At least one eigenvalue is numerically zero and the others share a
    /// sign.
    Degenerate,
    /// The Hessian could not be evaluated.
    Unclassified,
}

/// classify_point — label `x` by the Hessian eigenvalue signs of `f`.
///
/// Returns [`PointType::Unclassified`] when the Hessian cannot be formed.
pub fn classify_point<F: Objective + ?Sized>(f: &F, x: &Point) -> PointType {
    match hessian_eigenvalues(f, x) {
        Ok(eigenvalues) => classify_eigenvalues(&eigenvalues),
        Err(_) => PointType::Unclassified,
    }
}

/// hessian_eigenvalues — eigenvalues of the objective Hessian at `x`,
/// sorted ascending.
///
/// # Errors
/// Propagates Hessian construction errors from [`objective_hessian`].
pub fn hessian_eigenvalues<F: Objective + ?Sized>(f: &F, x: &Point) -> OptResult<Vec<f64>> {
    let hess = objective_hessian(f, x)?;
    let mut hess_nalg = DMatrix::<f64>::zeros(hess.nrows(), hess.ncols());
    fill_dmatrix(&hess, &mut hess_nalg);
    let mut eigenvalues: Vec<f64> = hess_nalg.symmetric_eigenvalues().iter().copied().collect();
    eigenvalues.sort_by(|a, b| a.total_cmp(b));
    Ok(eigenvalues)
}

/// classify_eigenvalues — map eigenvalue signs to a [`PointType`].
pub fn classify_eigenvalues(eigenvalues: &[f64]) -> PointType {
    if eigenvalues.is_empty() || eigenvalues.iter().any(|l| !l.is_finite()) {
        return PointType::Unclassified;
    }
    let scale = eigenvalues.iter().fold(1.0_f64, |m, l| m.max(l.abs()));
    let threshold = DEGENERACY_EPS * scale;
    let positive = eigenvalues.iter().filter(|&&l| l > threshold).count();
    let negative = eigenvalues.iter().filter(|&&l| l < -threshold).count();
    let n = eigenvalues.len();
    match (positive, negative) {
        (p, 0) if p == n => PointType::Minimum,
        (0, q) if q == n => PointType::Maximum,
        (p, q) if p > 0 && q > 0 => PointType::Saddle,
        _ => PointType::Degenerate,
    }
}

// ---- Helper methods ----

/// Copy a square `ndarray` Hessian into a preallocated `DMatrix`.
fn fill_dmatrix(hess: &Hessian, hess_nalg: &mut DMatrix<f64>) {
    for ((i, j), &value) in hess.indexed_iter() {
        hess_nalg[(i, j)] = value;
    }
}
