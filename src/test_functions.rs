//! Benchmark objectives with known critical points.
//!
//! These are used by the unit and integration tests and are handy for
//! exercising a sweep configuration before pointing it at an expensive
//! objective.
//!
//! - [`TiltedDoubleWell`]: a coupled quartic in 2D with two minima of
//!   different depth and two saddles.
//! - [`PairedDoubleWell`]: the sum of tilted double wells over consecutive
//!   coordinate pairs, in any even dimension.
//! - [`Quadratic`]: `|x - c|²`.
//! - [`FnObjective`]: wraps a plain closure (no analytic gradient).
use crate::optimization::{
    errors::OptResult,
    local_optimizer::{
        traits::Objective,
        types::{Cost, Grad, Point},
        validation::validate_point,
    },
};
use ndarray::Array1;

/// Tilted double well
///
/// `w(x, y) = k [ (x² - c)² + (y² - c)² + b x y ] + e (x - y)`
///
/// With the default constants the deeper minimum sits at `(-0.74, 0.74)`
/// with value `-0.87107`, the shallower one near `(0.728, -0.728)` with value
/// `-0.7243`, and two saddles near `(0.21, 0.18)` and `(-0.18, -0.21)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiltedDoubleWell {
    pub c: f64,
    pub k: f64,
    pub b: f64,
    pub e: f64,
}

impl Default for TiltedDoubleWell {
    fn default() -> Self {
        Self { c: 0.2888331068364538, k: 1.9267819941196995, b: 1.0, e: 0.05 }
    }
}

impl TiltedDoubleWell {
    /// Location of the deeper minimum for the default constants.
    pub const DEEP_MINIMUM: [f64; 2] = [-0.74, 0.74];
    /// Value at [`Self::DEEP_MINIMUM`] for the default constants.
    pub const DEEP_MINIMUM_VALUE: f64 = -0.87107;

    fn value_at(&self, x: f64, y: f64) -> f64 {
        self.k * ((x * x - self.c).powi(2) + (y * y - self.c).powi(2) + self.b * x * y)
            + self.e * (x - y)
    }

    fn grad_at(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.k * (4.0 * x * (x * x - self.c) + self.b * y) + self.e,
            self.k * (4.0 * y * (y * y - self.c) + self.b * x) - self.e,
        )
    }
}

impl Objective for TiltedDoubleWell {
    fn dim(&self) -> usize {
        2
    }

    fn value(&self, x: &Point) -> OptResult<Cost> {
        validate_point(x, 2)?;
        Ok(self.value_at(x[0], x[1]))
    }

    fn grad(&self, x: &Point) -> OptResult<Grad> {
        validate_point(x, 2)?;
        let (gx, gy) = self.grad_at(x[0], x[1]);
        Ok(Array1::from(vec![gx, gy]))
    }
}

/// Sum of [`TiltedDoubleWell`]s over the pairs `(x₀, x₁), (x₂, x₃), …`.
///
/// In 4D the global minimum is `(-0.74, 0.74, -0.74, 0.74)` with value
/// `-1.74214`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairedDoubleWell {
    pub pairs: usize,
    pub well: TiltedDoubleWell,
}

impl PairedDoubleWell {
    pub fn new(pairs: usize) -> Self {
        Self { pairs, well: TiltedDoubleWell::default() }
    }

    /// Global minimizer for the default well constants.
    pub fn global_minimum(&self) -> Point {
        Array1::from_iter(
            (0..self.pairs).flat_map(|_| TiltedDoubleWell::DEEP_MINIMUM.iter().copied()),
        )
    }
}

impl Objective for PairedDoubleWell {
    fn dim(&self) -> usize {
        2 * self.pairs
    }

    fn value(&self, x: &Point) -> OptResult<Cost> {
        validate_point(x, self.dim())?;
        Ok((0..self.pairs).map(|p| self.well.value_at(x[2 * p], x[2 * p + 1])).sum())
    }

    fn grad(&self, x: &Point) -> OptResult<Grad> {
        validate_point(x, self.dim())?;
        let mut g = Array1::zeros(self.dim());
        for p in 0..self.pairs {
            let (gx, gy) = self.well.grad_at(x[2 * p], x[2 * p + 1]);
            g[2 * p] = gx;
            g[2 * p + 1] = gy;
        }
        Ok(g)
    }
}

/// `f(x) = |x - center|²`
#[derive(Debug, Clone, PartialEq)]
pub struct Quadratic {
    pub center: Point,
}

impl Quadratic {
    pub fn new(center: Point) -> Self {
        Self { center }
    }
}

impl Objective for Quadratic {
    fn dim(&self) -> usize {
        self.center.len()
    }

    fn value(&self, x: &Point) -> OptResult<Cost> {
        validate_point(x, self.dim())?;
        Ok((x - &self.center).mapv(|d| d * d).sum())
    }

    fn grad(&self, x: &Point) -> OptResult<Grad> {
        validate_point(x, self.dim())?;
        Ok((x - &self.center) * 2.0)
    }
}

/// Objective backed by a closure; derivatives come from finite differences.
pub struct FnObjective<G> {
    dim: usize,
    func: G,
}

impl<G: Fn(&Point) -> f64 + Sync> FnObjective<G> {
    pub fn new(dim: usize, func: G) -> Self {
        Self { dim, func }
    }
}

impl<G: Fn(&Point) -> f64 + Sync> Objective for FnObjective<G> {
    fn dim(&self) -> usize {
        self.dim
    }

    fn value(&self, x: &Point) -> OptResult<Cost> {
        Ok((self.func)(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::local_optimizer::finite_diff::objective_gradient;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // The documented deep minimum of the tilted double well has the
    // documented value and a (near) vanishing gradient.
    fn tilted_double_well_deep_minimum() {
        let w = TiltedDoubleWell::default();
        let x = array![-0.74, 0.74];
        assert_relative_eq!(w.value(&x).unwrap(), -0.87107, epsilon = 1e-4);
        let g = w.grad(&x).unwrap();
        assert!(g[0].abs() < 1e-2 && g[1].abs() < 1e-2);
    }

    #[test]
    // Purpose
    // -------
    // The analytic gradient agrees with finite differences away from the
    // critical points.
    fn tilted_double_well_gradient_matches_finite_differences() {
        let w = TiltedDoubleWell::default();
        let x = array![0.3, -0.55];
        let analytic = w.grad(&x).unwrap();
        let numeric = objective_gradient(&FnObjective::new(2, |p: &Point| w.value_at(p[0], p[1])), &x)
            .unwrap();
        assert_relative_eq!(analytic[0], numeric[0], epsilon = 1e-6);
        assert_relative_eq!(analytic[1], numeric[1], epsilon = 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // The 4D paired well attains the documented global value at its
    // documented minimizer.
    fn paired_double_well_global_minimum_value() {
        let f = PairedDoubleWell::new(2);
        let x = f.global_minimum();
        assert_eq!(x, array![-0.74, 0.74, -0.74, 0.74]);
        assert_relative_eq!(f.value(&x).unwrap(), -1.74214, epsilon = 2e-4);
    }
}
