//! local_optimizer::derivative_free — Nelder–Mead search inside a box.
//!
//! Used as the last polishing stage of the ultra-precision engine, where
//! gradients near the floating-point floor are too noisy to steer L-BFGS.
//! The box is enforced by projection: the objective is evaluated at the
//! clamped point and a quadratic penalty on the projection distance keeps the
//! simplex from drifting into the flat exterior.
use crate::optimization::{
    errors::{OptError, OptResult},
    local_optimizer::{
        traits::Objective,
        types::{Cost, Point},
        validation::{validate_minimizer, validate_value},
    },
};
use argmin::{
    core::{CostFunction, Error, Executor, State, TerminationReason, TerminationStatus},
    solver::neldermead::NelderMead,
};
use serde::{Deserialize, Serialize};

/// Fraction of the box width used to offset each initial simplex vertex.
const SIMPLEX_OFFSET: f64 = 0.25;

/// Options for [`minimize_bounded`].
///
/// - `max_iter`: iteration cap for the simplex search.
/// - `sd_tolerance`: stop when the standard deviation of the simplex cost
///   values falls below this threshold.
/// - `penalty_weight`: weight of the squared projection distance added to
///   the cost outside the box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundedOptions {
    pub max_iter: u64,
    pub sd_tolerance: f64,
    pub penalty_weight: f64,
}

impl BoundedOptions {
    /// Construct validated options.
    ///
    /// # Errors
    /// - [`OptError::InvalidMaxIter`] if `max_iter == 0`.
    /// - [`OptError::InvalidTolCost`] if `sd_tolerance` is not finite and
    ///   positive.
    /// - [`OptError::InvalidParameter`] if `penalty_weight` is negative or
    ///   not finite.
    pub fn new(max_iter: u64, sd_tolerance: f64, penalty_weight: f64) -> OptResult<Self> {
        if max_iter == 0 {
            return Err(OptError::InvalidMaxIter {
                max_iter: 0,
                reason: "Maximum iterations must be greater than zero.",
            });
        }
        if !sd_tolerance.is_finite() || sd_tolerance <= 0.0 {
            return Err(OptError::InvalidTolCost {
                tol: sd_tolerance,
                reason: "Simplex tolerance must be finite and positive.",
            });
        }
        if !penalty_weight.is_finite() || penalty_weight < 0.0 {
            return Err(OptError::InvalidParameter {
                text: format!("penalty_weight must be finite and non-negative, got {penalty_weight}"),
            });
        }
        Ok(Self { max_iter, sd_tolerance, penalty_weight })
    }
}

impl Default for BoundedOptions {
    fn default() -> Self {
        Self { max_iter: 200, sd_tolerance: 1e-15, penalty_weight: 1e3 }
    }
}

/// Result of a bounded Nelder–Mead run.
///
/// `minimizer` always lies inside the box; `converged` is true when the
/// simplex tolerance (rather than the iteration cap) ended the run.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedOutcome {
    pub minimizer: Point,
    pub value: f64,
    pub converged: bool,
    pub iterations: u64,
}

/// minimize_bounded — derivative-free minimization of `f` over `[lower, upper]`.
///
/// The simplex starts at the box midpoint with one vertex per axis offset by
/// a quarter of that axis' width. The reported value is `f` at the projected
/// minimizer, without the penalty.
///
/// # Errors
/// - [`OptError::InvalidBounds`] if the bounds differ in length from
///   `f.dim()` or some `lower[i] >= upper[i]` or a bound is not finite.
/// - Objective and backend errors raised during the search.
pub fn minimize_bounded<F: Objective + ?Sized>(
    f: &F, lower: &Point, upper: &Point, opts: &BoundedOptions,
) -> OptResult<BoundedOutcome> {
    validate_bounds(lower, upper, f.dim())?;
    let center: Point = (lower + upper) * 0.5;
    let simplex = initial_simplex(&center, lower, upper);
    let problem = BoxProjected { f, lower, upper, penalty_weight: opts.penalty_weight };
    let solver: NelderMead<Point, Cost> =
        NelderMead::new(simplex).with_sd_tolerance(opts.sd_tolerance)?;

    let result = Executor::new(problem, solver)
        .configure(|state| state.max_iters(opts.max_iter))
        .run()?;
    let state = result.state();
    let converged = matches!(
        state.get_termination_status(),
        TerminationStatus::Terminated(TerminationReason::SolverConverged)
    );
    let iterations = state.get_iter();
    let best = validate_minimizer(state.get_best_param().cloned())?;
    let minimizer = project(&best, lower, upper);
    let value = f.value(&minimizer)?;
    validate_value(value)?;
    Ok(BoundedOutcome { minimizer, value, converged, iterations })
}

// ---- Helper methods ----

struct BoxProjected<'a, F: Objective + ?Sized> {
    f: &'a F,
    lower: &'a Point,
    upper: &'a Point,
    penalty_weight: f64,
}

impl<'a, F: Objective + ?Sized> CostFunction for BoxProjected<'a, F> {
    type Param = Point;
    type Output = Cost;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, Error> {
        let projected = project(x, self.lower, self.upper);
        let value = self.f.value(&projected)?;
        if !value.is_finite() {
            return Err((OptError::NonFiniteCost { value }).into());
        }
        let outside: f64 = (x - &projected).mapv(|d| d * d).sum();
        Ok(value + self.penalty_weight * outside)
    }
}

fn project(x: &Point, lower: &Point, upper: &Point) -> Point {
    let mut out = x.clone();
    for ((xi, &lo), &hi) in out.iter_mut().zip(lower.iter()).zip(upper.iter()) {
        *xi = xi.clamp(lo, hi);
    }
    out
}

fn initial_simplex(center: &Point, lower: &Point, upper: &Point) -> Vec<Point> {
    let mut vertices = Vec::with_capacity(center.len() + 1);
    vertices.push(center.clone());
    for i in 0..center.len() {
        let mut vertex = center.clone();
        vertex[i] += SIMPLEX_OFFSET * (upper[i] - lower[i]);
        vertices.push(vertex);
    }
    vertices
}

fn validate_bounds(lower: &Point, upper: &Point, dim: usize) -> OptResult<()> {
    if lower.len() != dim || upper.len() != dim {
        return Err(OptError::DimensionMismatch {
            expected: dim,
            found: if lower.len() != dim { lower.len() } else { upper.len() },
        });
    }
    for (index, (&lo, &hi)) in lower.iter().zip(upper.iter()).enumerate() {
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(OptError::InvalidBounds { index, lower: lo, upper: hi });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_functions::{FnObjective, Quadratic};
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Nelder–Mead finds an interior minimizer of a quadratic.
    //
    // Given
    // -----
    // - `f(x) = |x - (0.1, -0.05)|²` on the box `[-0.5, 0.5]²`.
    //
    // Expect
    // ------
    // - Minimizer within 1e-4 of the true one; value close to 0.
    fn minimize_bounded_finds_interior_minimum() {
        // Arrange
        let f = Quadratic::new(array![0.1, -0.05]);
        let opts = BoundedOptions::new(500, 1e-14, 1e3).expect("valid options");

        // Act
        let out = minimize_bounded(&f, &array![-0.5, -0.5], &array![0.5, 0.5], &opts)
            .expect("bounded search should succeed");

        // Assert
        assert_relative_eq!(out.minimizer[0], 0.1, epsilon = 1e-4);
        assert_relative_eq!(out.minimizer[1], -0.05, epsilon = 1e-4);
        assert!(out.value < 1e-8);
    }

    #[test]
    // Purpose
    // -------
    // When the unconstrained minimizer lies outside the box, the result is
    // projected and stays on the boundary.
    //
    // Given
    // -----
    // - `f(x) = (x - 2)²` on `[-1, 1]`.
    //
    // Expect
    // ------
    // - Minimizer ≈ 1 and never beyond it.
    fn minimize_bounded_respects_the_box() {
        // Arrange
        let f = FnObjective::new(1, |x: &Point| (x[0] - 2.0).powi(2));

        // Act
        let out = minimize_bounded(&f, &array![-1.0], &array![1.0], &BoundedOptions::default())
            .expect("bounded search should succeed");

        // Assert
        assert!(out.minimizer[0] <= 1.0);
        assert_relative_eq!(out.minimizer[0], 1.0, epsilon = 1e-3);
    }

    #[test]
    // Purpose
    // -------
    // Malformed bounds and options are rejected.
    fn minimize_bounded_rejects_invalid_inputs() {
        let f = Quadratic::new(array![0.0, 0.0]);
        assert!(matches!(
            minimize_bounded(&f, &array![0.0, 1.0], &array![1.0, 1.0], &BoundedOptions::default()),
            Err(OptError::InvalidBounds { index: 1, .. })
        ));
        assert!(matches!(BoundedOptions::new(0, 1e-8, 1.0), Err(OptError::InvalidMaxIter { .. })));
        assert!(matches!(
            BoundedOptions::new(10, -1.0, 1.0),
            Err(OptError::InvalidTolCost { .. })
        ));
    }
}
