//! candidates::solver — critical points of a polynomial surrogate.
//!
//! Purpose
//! -------
//! Define the [`CriticalPointSolver`] capability and provide the default
//! [`NewtonCriticalSolver`], which solves `∇s(u) = 0` for a surrogate `s` by
//! damped Newton iteration from a tensor grid of Chebyshev start points in
//! the reference cube.
//!
//! Key behaviors
//! -------------
//! - Newton steps solve `H δ = -g` with an LU factorization (`nalgebra`);
//!   steps longer than `max_step` (∞-norm, reference units) are scaled back.
//! - Iterates that leave `[-escape_radius, escape_radius]ⁿ`, hit a singular
//!   Hessian, or exhaust `max_iterations` are discarded.
//! - Roots closer than `merge_radius` (∞-norm, reference units) to an
//!   already-found root are merged, keeping the first in start order, so
//!   the output order is deterministic.
//! - Roots are returned in physical coordinates; filtering to the region
//!   box is the extractor's job.
use crate::{
    optimization::{
        errors::{OptError, OptResult},
        local_optimizer::types::Point,
    },
    surrogate::builder::Surrogate,
};
use log::trace;
use nalgebra::{DMatrix, DVector};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Relative step length below which a Newton run counts as stalled at a root.
const STEP_FLOOR: f64 = 1e-14;

/// Capability: all critical points of a surrogate that the solver can find.
pub trait CriticalPointSolver: Sync {
    fn solve(&self, surrogate: &Surrogate) -> OptResult<Vec<Point>>;
}

/// Multi-start damped Newton on the surrogate gradient.
///
/// Defaults: 3 starts per axis, 50 iterations, gradient tolerance 1e-10,
/// max step 0.5, merge radius 1e-6, escape radius 1.5.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewtonCriticalSolver {
    pub starts_per_axis: usize,
    pub max_iterations: usize,
    pub gradient_tolerance: f64,
    pub max_step: f64,
    pub merge_radius: f64,
    pub escape_radius: f64,
}

impl Default for NewtonCriticalSolver {
    fn default() -> Self {
        Self {
            starts_per_axis: 3,
            max_iterations: 50,
            gradient_tolerance: 1e-10,
            max_step: 0.5,
            merge_radius: 1e-6,
            escape_radius: 1.5,
        }
    }
}

impl NewtonCriticalSolver {
    /// Construct a validated solver.
    ///
    /// # Errors
    /// `OptError::InvalidParameter` for zero counts or non-finite,
    /// non-positive radii and tolerances, or `escape_radius < 1`.
    pub fn new(
        starts_per_axis: usize, max_iterations: usize, gradient_tolerance: f64, max_step: f64,
        merge_radius: f64, escape_radius: f64,
    ) -> OptResult<Self> {
        let solver = Self {
            starts_per_axis,
            max_iterations,
            gradient_tolerance,
            max_step,
            merge_radius,
            escape_radius,
        };
        solver.validate()?;
        Ok(solver)
    }

    fn validate(&self) -> OptResult<()> {
        if self.starts_per_axis == 0 || self.max_iterations == 0 {
            return Err(OptError::InvalidParameter {
                text: "starts_per_axis and max_iterations must be at least 1".to_string(),
            });
        }
        for (name, value) in [
            ("gradient_tolerance", self.gradient_tolerance),
            ("max_step", self.max_step),
            ("merge_radius", self.merge_radius),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(OptError::InvalidParameter {
                    text: format!("{name} must be finite and positive, got {value}"),
                });
            }
        }
        if !self.escape_radius.is_finite() || self.escape_radius < 1.0 {
            return Err(OptError::InvalidParameter {
                text: format!("escape_radius must be at least 1, got {}", self.escape_radius),
            });
        }
        Ok(())
    }

    /// Start points: tensor grid of Chebyshev nodes in `[-1, 1]ⁿ`.
    fn start_points(&self, dim: usize) -> Vec<Point> {
        let s = self.starts_per_axis;
        let nodes: Vec<f64> = (0..s).map(|j| (PI * (j as f64 + 0.5) / s as f64).cos()).collect();
        let total = s.pow(dim as u32);
        (0..total)
            .map(|mut k| {
                let mut u = Array1::<f64>::zeros(dim);
                for a in 0..dim {
                    u[a] = nodes[k % s];
                    k /= s;
                }
                u
            })
            .collect()
    }

    /// Newton iteration from `u0`; returns the reference-space root if found.
    fn newton(&self, surrogate: &Surrogate, u0: Point) -> Option<Point> {
        let n = u0.len();
        let mut u = u0;
        for _ in 0..self.max_iterations {
            let g = surrogate.gradient_reference(&u);
            if !g.iter().all(|v| v.is_finite()) {
                return None;
            }
            if l2(&g) <= self.gradient_tolerance {
                return Some(u);
            }
            let h = surrogate.hessian_reference(&u);
            let h_nalg = DMatrix::from_fn(n, n, |i, j| h[[i, j]]);
            let rhs = DVector::from_iterator(n, g.iter().map(|v| -v));
            let delta = h_nalg.lu().solve(&rhs)?;
            let step_inf = delta.amax();
            if !step_inf.is_finite() {
                return None;
            }
            let scale = if step_inf > self.max_step { self.max_step / step_inf } else { 1.0 };
            for a in 0..n {
                u[a] += scale * delta[a];
            }
            if u.iter().any(|ua| ua.abs() > self.escape_radius) {
                return None;
            }
            if scale * step_inf <= STEP_FLOOR * (1.0 + u.iter().fold(0.0_f64, |m, v| m.max(v.abs()))) {
                let g = surrogate.gradient_reference(&u);
                return (l2(&g) <= self.gradient_tolerance.sqrt()).then_some(u);
            }
        }
        let g = surrogate.gradient_reference(&u);
        (l2(&g) <= self.gradient_tolerance).then_some(u)
    }
}

impl CriticalPointSolver for NewtonCriticalSolver {
    fn solve(&self, surrogate: &Surrogate) -> OptResult<Vec<Point>> {
        self.validate()?;
        let dim = surrogate.dim();
        let mut roots: Vec<Point> = Vec::new();
        for u0 in self.start_points(dim) {
            let Some(root) = self.newton(surrogate, u0) else {
                continue;
            };
            let duplicate = roots.iter().any(|r| {
                r.iter().zip(root.iter()).all(|(a, b)| (a - b).abs() <= self.merge_radius)
            });
            if !duplicate {
                roots.push(root);
            }
        }
        trace!("newton solver: {} distinct roots of a degree-{} surrogate", roots.len(), surrogate.degree);
        Ok(roots.iter().map(|u| surrogate.to_physical(u)).collect())
    }
}

fn l2(v: &Point) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}
