//! Adapter that exposes a user `Objective` as an `argmin` problem.
//!
//! The cost is the objective value itself; the refinement layer always
//! minimizes. Gradients come from [`objective_gradient`], so an analytic
//! gradient is used when the objective provides one and robust finite
//! differences otherwise.
use crate::optimization::{
    errors::OptError,
    local_optimizer::{
        finite_diff::objective_gradient,
        traits::Objective,
        types::{Cost, Grad, Point},
    },
};
use argmin::core::{CostFunction, Error, Gradient};

/// Bridges a user `Objective` to `argmin`'s `CostFunction` and `Gradient`.
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: Objective + ?Sized> {
    pub f: &'a F,
}

impl<'a, F: Objective + ?Sized> CostFunction for ArgMinAdapter<'a, F> {
    type Param = Point;
    type Output = Cost;

    /// Evaluate `f(x)`.
    ///
    /// # Errors
    /// - Propagates any `OptError` from the user's `value` via `?`.
    /// - `OptError::NonFiniteCost` if the value is not finite.
    fn cost(&self, x: &Self::Param) -> Result<Self::Output, Error> {
        let output = self.f.value(x)?;
        if !output.is_finite() {
            return Err((OptError::NonFiniteCost { value: output }).into());
        }
        Ok(output)
    }
}

impl<'a, F: Objective + ?Sized> Gradient for ArgMinAdapter<'a, F> {
    type Param = Point;
    type Gradient = Grad;

    /// Evaluate `∇f(x)`, analytic when available and finite-difference
    /// otherwise.
    ///
    /// # Errors
    /// Propagates user, finite-difference and validation errors.
    fn gradient(&self, x: &Self::Param) -> Result<Self::Gradient, Error> {
        Ok(objective_gradient(self.f, x)?)
    }
}

impl<'a, F: Objective + ?Sized> ArgMinAdapter<'a, F> {
    /// Construct a new adapter over a user `Objective`.
    pub fn new(f: &'a F) -> Self {
        Self { f }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_functions::FnObjective;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // The adapter reports the objective value unchanged and rejects
    // non-finite outputs.
    //
    // Given
    // -----
    // - `f(x) = x₀ + x₁` and `g(x) = 1/x₀` evaluated at `x₀ = 0`.
    //
    // Expect
    // ------
    // - `cost` equals `f(x)` for the first.
    // - `cost` fails with `NonFiniteCost` for the second.
    fn cost_passes_value_through_and_rejects_non_finite() {
        // Arrange
        let f = FnObjective::new(2, |x: &Point| x[0] + x[1]);
        let g = FnObjective::new(1, |x: &Point| 1.0 / x[0]);

        // Act
        let ok = ArgMinAdapter::new(&f).cost(&array![1.5, 2.0]).expect("finite cost");
        let err = ArgMinAdapter::new(&g).cost(&array![0.0]).expect_err("infinite cost");

        // Assert
        assert_relative_eq!(ok, 3.5);
        assert!(matches!(OptError::from(err), OptError::NonFiniteCost { .. }));
    }

    #[test]
    // Purpose
    // -------
    // The adapter gradient matches the exact gradient of a smooth function
    // that has no analytic gradient.
    fn gradient_falls_back_to_finite_differences() {
        // Arrange
        let f = FnObjective::new(2, |x: &Point| (x[0] - 1.0).powi(2) + x[0] * x[1]);
        let adapter = ArgMinAdapter::new(&f);

        // Act
        let g = adapter.gradient(&array![2.0, 3.0]).expect("gradient");

        // Assert
        assert_relative_eq!(g[0], 5.0, epsilon = 1e-6);
        assert_relative_eq!(g[1], 2.0, epsilon = 1e-6);
    }
}
