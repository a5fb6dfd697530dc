//! surrogate::builder — polynomial surrogates of an objective over a box.
//!
//! Purpose
//! -------
//! Define the [`SurrogateBuilder`] capability used by the degree-adaptation
//! loop, the [`Surrogate`] it produces, and the default
//! [`TensorProductBuilder`].
//!
//! Key behaviors
//! -------------
//! - [`TensorProductBuilder`] samples the objective on a tensor grid of Gauss
//!   nodes, projects the samples onto the tensor-product basis of per-axis
//!   degree `d`, and reports the RMS residual over the grid.
//! - [`Surrogate`] evaluates its value, gradient and Hessian both in
//!   reference coordinates `u ∈ [-1, 1]ⁿ` and in physical coordinates
//!   `x = center + half_widths ∘ u`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Coefficient arrays have shape `[d+1; n]`.
//! - Samples per axis `m = max(⌈oversampling·(d+1)⌉, d+2)`, so the grid
//!   always over-determines the coefficients and the residual is a genuine
//!   error estimate.
//! - Objective failures while sampling are returned unchanged; the pipeline
//!   classifies them as transient.
use crate::{
    optimization::{
        errors::{OptError, OptResult},
        local_optimizer::{
            traits::Objective,
            types::{Grad, Hessian, Point},
        },
    },
    surrogate::{
        basis::{BasisValues, PolynomialBasis},
        tensor::{analysis_matrix, apply_all_axes, synthesis_matrix},
    },
};
use log::trace;
use ndarray::{Array1, Array2, ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

/// Default ratio of samples to coefficients per axis.
pub const DEFAULT_OVERSAMPLING: f64 = 1.5;

/// Capability: build a polynomial surrogate of `objective` on a box.
///
/// Returns the surrogate together with its approximation error. Must be
/// callable repeatedly with increasing degree and must not mutate its
/// inputs.
pub trait SurrogateBuilder: Sync {
    fn build(
        &self, objective: &dyn Objective, center: &Point, half_widths: &Point, degree: usize,
        basis: PolynomialBasis,
    ) -> OptResult<(Surrogate, f64)>;
}

/// Tensor-product polynomial over a box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Surrogate {
    pub basis: PolynomialBasis,
    pub degree: usize,
    pub center: Point,
    pub half_widths: Point,
    pub coefficients: ArrayD<f64>,
}

impl Surrogate {
    pub fn dim(&self) -> usize {
        self.center.len()
    }

    /// Map a physical point into reference coordinates.
    pub fn to_reference(&self, x: &Point) -> Point {
        (x - &self.center) / &self.half_widths
    }

    /// Map reference coordinates back into the physical box.
    pub fn to_physical(&self, u: &Point) -> Point {
        &self.center + &(u * &self.half_widths)
    }

    fn axis_values(&self, u: &Point) -> Vec<BasisValues> {
        u.iter().map(|&ua| self.basis.eval(self.degree, ua)).collect()
    }

    /// Surrogate value at reference coordinates `u`.
    pub fn value_reference(&self, u: &Point) -> f64 {
        let per_axis = self.axis_values(u);
        self.coefficients
            .indexed_iter()
            .map(|(idx, &c)| {
                c * (0..self.dim()).map(|a| per_axis[a].value[idx[a]]).product::<f64>()
            })
            .sum()
    }

    /// Gradient with respect to reference coordinates.
    pub fn gradient_reference(&self, u: &Point) -> Grad {
        let n = self.dim();
        let per_axis = self.axis_values(u);
        let mut grad = Array1::<f64>::zeros(n);
        for (idx, &c) in self.coefficients.indexed_iter() {
            for a in 0..n {
                let mut term = c * per_axis[a].first[idx[a]];
                for b in (0..n).filter(|&b| b != a) {
                    term *= per_axis[b].value[idx[b]];
                }
                grad[a] += term;
            }
        }
        grad
    }

    /// Hessian with respect to reference coordinates.
    pub fn hessian_reference(&self, u: &Point) -> Hessian {
        let n = self.dim();
        let per_axis = self.axis_values(u);
        let mut hess = Array2::<f64>::zeros((n, n));
        for (idx, &c) in self.coefficients.indexed_iter() {
            for a in 0..n {
                for b in a..n {
                    let mut term = c;
                    for e in 0..n {
                        let vals = &per_axis[e];
                        term *= match (e == a, e == b) {
                            (true, true) => vals.second[idx[e]],
                            (true, false) | (false, true) => vals.first[idx[e]],
                            (false, false) => vals.value[idx[e]],
                        };
                    }
                    hess[[a, b]] += term;
                }
            }
        }
        for a in 0..n {
            for b in 0..a {
                hess[[a, b]] = hess[[b, a]];
            }
        }
        hess
    }

    /// Surrogate value at a physical point.
    pub fn value(&self, x: &Point) -> f64 {
        self.value_reference(&self.to_reference(x))
    }

    /// Gradient with respect to physical coordinates.
    pub fn gradient(&self, x: &Point) -> Grad {
        self.gradient_reference(&self.to_reference(x)) / &self.half_widths
    }
}

/// Discrete orthogonal projection on a tensor grid of Gauss nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TensorProductBuilder {
    pub oversampling: f64,
}

impl Default for TensorProductBuilder {
    fn default() -> Self {
        Self { oversampling: DEFAULT_OVERSAMPLING }
    }
}

impl TensorProductBuilder {
    /// # Errors
    /// `OptError::InvalidParameter` if `oversampling` is not finite or is
    /// below 1.
    pub fn new(oversampling: f64) -> OptResult<Self> {
        if !oversampling.is_finite() || oversampling < 1.0 {
            return Err(OptError::InvalidParameter {
                text: format!("oversampling must be finite and at least 1, got {oversampling}"),
            });
        }
        Ok(Self { oversampling })
    }

    /// Samples per axis for per-axis degree `degree`.
    pub fn samples_per_axis(&self, degree: usize) -> usize {
        let scaled = (self.oversampling * (degree + 1) as f64).ceil() as usize;
        scaled.max(degree + 2)
    }
}

impl SurrogateBuilder for TensorProductBuilder {
    fn build(
        &self, objective: &dyn Objective, center: &Point, half_widths: &Point, degree: usize,
        basis: PolynomialBasis,
    ) -> OptResult<(Surrogate, f64)> {
        let n = center.len();
        if half_widths.len() != n {
            return Err(OptError::DimensionMismatch { expected: n, found: half_widths.len() });
        }
        if objective.dim() != n {
            return Err(OptError::DimensionMismatch { expected: objective.dim(), found: n });
        }
        let m = self.samples_per_axis(degree);
        let (nodes, weights) = basis.gauss_rule(m);

        let mut samples = ArrayD::<f64>::zeros(IxDyn(&vec![m; n]));
        let mut x = center.clone();
        for (idx, slot) in samples.indexed_iter_mut() {
            for a in 0..n {
                x[a] = center[a] + half_widths[a] * nodes[idx[a]];
            }
            let value = objective.value(&x)?;
            if !value.is_finite() {
                return Err(OptError::NonFiniteCost { value });
            }
            *slot = value;
        }

        let coefficients = apply_all_axes(&samples, &analysis_matrix(basis, degree, &nodes, &weights));
        let reconstructed = apply_all_axes(&coefficients, &synthesis_matrix(basis, degree, &nodes));
        let mse = (&reconstructed - &samples).mapv(|r| r * r).mean().unwrap_or(0.0);
        let approx_error = mse.sqrt();
        trace!("tensor surrogate: degree {degree}, {m}^{n} samples, rms error {approx_error:.3e}");

        let surrogate =
            Surrogate { basis, degree, center: center.clone(), half_widths: half_widths.clone(), coefficients };
        Ok((surrogate, approx_error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_functions::{FnObjective, TiltedDoubleWell};
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Exactness of the projection for polynomials inside the span.
    // - Agreement of surrogate derivatives with the objective's derivatives.
    // - Error reporting for non-polynomial objectives and sampling failures.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // A quartic objective is reproduced exactly by a degree-4 surrogate, in
    // both bases.
    //
    // Given
    // -----
    // - The tilted double well on the box centered at `(-0.3, 0.3)` with
    //   half-widths `(0.6, 0.6)`.
    //
    // Expect
    // ------
    // - Approximation error below 1e-12.
    // - Surrogate value and physical gradient match the objective at an
    //   off-grid point.
    fn quartic_is_reproduced_at_degree_four() {
        let w = TiltedDoubleWell::default();
        let center = array![-0.3, 0.3];
        let half = array![0.6, 0.6];
        let x = array![-0.71, 0.52];

        for basis in [PolynomialBasis::Chebyshev, PolynomialBasis::Legendre] {
            let (s, err) = TensorProductBuilder::default()
                .build(&w, &center, &half, 4, basis)
                .expect("build should succeed");

            assert!(err < 1e-12, "{basis}: error {err}");
            assert_relative_eq!(s.value(&x), w.value(&x).unwrap(), epsilon = 1e-11);
            let g = s.gradient(&x);
            let exact = w.grad(&x).unwrap();
            assert_relative_eq!(g[0], exact[0], epsilon = 1e-10);
            assert_relative_eq!(g[1], exact[1], epsilon = 1e-10);
        }
    }

    #[test]
    // Purpose
    // -------
    // The reference Hessian of the surrogate equals the scaled objective
    // Hessian for a polynomial in the span.
    //
    // Given
    // -----
    // - `f(x, y) = x²y + 3y²` on the box `[0, 2] × [-1, 1]` (center `(1, 0)`,
    //   half-widths `(1, 1)`).
    //
    // Expect
    // ------
    // - At `x = (1.5, 0.5)`: `∂²f = [[2y, 2x], [2x, 6]] = [[1, 3], [3, 6]]`.
    fn hessian_matches_closed_form() {
        let f = FnObjective::new(2, |p: &Point| p[0] * p[0] * p[1] + 3.0 * p[1] * p[1]);
        let (s, _) = TensorProductBuilder::default()
            .build(&f, &array![1.0, 0.0], &array![1.0, 1.0], 3, PolynomialBasis::Chebyshev)
            .expect("build should succeed");

        let h = s.hessian_reference(&s.to_reference(&array![1.5, 0.5]));

        assert_relative_eq!(h[[0, 0]], 1.0, epsilon = 1e-10);
        assert_relative_eq!(h[[0, 1]], 3.0, epsilon = 1e-10);
        assert_relative_eq!(h[[1, 0]], 3.0, epsilon = 1e-10);
        assert_relative_eq!(h[[1, 1]], 6.0, epsilon = 1e-10);
    }

    #[test]
    // Purpose
    // -------
    // A non-polynomial objective yields a positive error that shrinks with
    // degree.
    fn error_decreases_with_degree_for_smooth_objective() {
        let f = FnObjective::new(1, |p: &Point| (3.0 * p[0]).sin());
        let b = TensorProductBuilder::default();
        let (_, e4) = b.build(&f, &array![0.0], &array![1.0], 4, PolynomialBasis::Legendre).unwrap();
        let (_, e8) = b.build(&f, &array![0.0], &array![1.0], 8, PolynomialBasis::Legendre).unwrap();
        assert!(e4 > 0.0);
        assert!(e8 < e4);
    }

    #[test]
    // Purpose
    // -------
    // Sampling failures are returned unchanged and the sample count respects
    // its floor.
    fn sampling_errors_propagate_and_sample_floor_holds() {
        struct Failing;
        impl Objective for Failing {
            fn dim(&self) -> usize {
                1
            }
            fn value(&self, _x: &Point) -> OptResult<f64> {
                Err(OptError::ObjectiveFailed { reason: "offline".into() })
            }
        }
        let b = TensorProductBuilder::new(1.0).expect("valid oversampling");
        assert_eq!(b.samples_per_axis(3), 5);
        assert_eq!(TensorProductBuilder::default().samples_per_axis(4), 8);
        let result = b.build(&Failing, &array![0.0], &array![1.0], 2, PolynomialBasis::Chebyshev);
        assert_eq!(result, Err(OptError::ObjectiveFailed { reason: "offline".into() }));
    }
}
