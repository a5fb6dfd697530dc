//! surrogate::tensor — separable transforms on dense `n`-dimensional grids.
//!
//! A tensor-product projection factorizes into one small matrix applied along
//! each axis in turn, so the cost is `O(n · mⁿ⁺¹)` instead of `O(m²ⁿ)`.
use crate::surrogate::basis::PolynomialBasis;
use ndarray::{Array2, ArrayD, Axis, IxDyn, Zip};

/// Apply `mat` (shape `r × s`) to every lane of `t` along `axis`.
///
/// The input must have length `s` on `axis`; the output has length `r` there
/// and matches `t` elsewhere.
pub fn apply_along_axis(t: &ArrayD<f64>, axis: usize, mat: &Array2<f64>) -> ArrayD<f64> {
    let mut shape = t.shape().to_vec();
    shape[axis] = mat.nrows();
    let mut out = ArrayD::<f64>::zeros(IxDyn(&shape));
    Zip::from(out.lanes_mut(Axis(axis))).and(t.lanes(Axis(axis))).for_each(|mut o, i| {
        o.assign(&mat.dot(&i));
    });
    out
}

/// Apply the same matrix along every axis.
pub fn apply_all_axes(t: &ArrayD<f64>, mat: &Array2<f64>) -> ArrayD<f64> {
    (0..t.ndim()).fold(t.clone(), |acc, axis| apply_along_axis(&acc, axis, mat))
}

/// Analysis matrix `A[k, j] = w_j φ_k(x_j) / ‖φ_k‖²` (shape `(degree+1) × m`).
///
/// Applied along every axis of a grid of samples at the Gauss nodes it
/// yields the discrete orthogonal projection coefficients.
pub fn analysis_matrix(
    basis: PolynomialBasis, degree: usize, nodes: &[f64], weights: &[f64],
) -> Array2<f64> {
    let mut a = Array2::<f64>::zeros((degree + 1, nodes.len()));
    for (j, (&x, &w)) in nodes.iter().zip(weights).enumerate() {
        let phi = basis.eval(degree, x).value;
        for k in 0..=degree {
            a[[k, j]] = w * phi[k] / basis.norm_sq(k);
        }
    }
    a
}

/// Synthesis matrix `S[j, k] = φ_k(x_j)` (shape `m × (degree+1)`).
pub fn synthesis_matrix(basis: PolynomialBasis, degree: usize, nodes: &[f64]) -> Array2<f64> {
    let mut s = Array2::<f64>::zeros((nodes.len(), degree + 1));
    for (j, &x) in nodes.iter().enumerate() {
        let phi = basis.eval(degree, x).value;
        for k in 0..=degree {
            s[[j, k]] = phi[k];
        }
    }
    s
}
