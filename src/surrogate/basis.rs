//! surrogate::basis — orthogonal polynomial families on `[-1, 1]`.
//!
//! Each family is described by its three-term recurrence
//! `φ_{k+1}(x) = a_k x φ_k(x) - b_k φ_{k-1}(x)`, its Gauss quadrature rule,
//! and the squared norms `‖φ_k‖²` under the matching weight. Derivatives are
//! carried through the same recurrence, so values, first and second
//! derivatives of all degrees up to `d` cost one pass.
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

const NEWTON_TOL: f64 = 1e-15;
const NEWTON_MAX_ITER: usize = 100;

/// Orthogonal polynomial family used for surrogate construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PolynomialBasis {
    /// Chebyshev polynomials of the first kind, weight `1/√(1-x²)`.
    #[default]
    Chebyshev,
    /// Legendre polynomials, unit weight.
    Legendre,
}

impl fmt::Display for PolynomialBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolynomialBasis::Chebyshev => write!(f, "chebyshev"),
            PolynomialBasis::Legendre => write!(f, "legendre"),
        }
    }
}

/// Values and derivatives of `φ_0..=φ_d` at one abscissa.
#[derive(Debug, Clone, PartialEq)]
pub struct BasisValues {
    pub value: Vec<f64>,
    pub first: Vec<f64>,
    pub second: Vec<f64>,
}

impl PolynomialBasis {
    /// Recurrence coefficients `(a_k, b_k)` producing `φ_{k+1}`.
    fn recurrence(&self, k: usize) -> (f64, f64) {
        match self {
            PolynomialBasis::Chebyshev => {
                if k == 0 {
                    (1.0, 0.0)
                } else {
                    (2.0, 1.0)
                }
            }
            PolynomialBasis::Legendre => {
                let k = k as f64;
                ((2.0 * k + 1.0) / (k + 1.0), k / (k + 1.0))
            }
        }
    }

    /// Squared norm `‖φ_k‖²` under the family's weight.
    pub fn norm_sq(&self, k: usize) -> f64 {
        match self {
            PolynomialBasis::Chebyshev => {
                if k == 0 {
                    PI
                } else {
                    PI / 2.0
                }
            }
            PolynomialBasis::Legendre => 2.0 / (2.0 * k as f64 + 1.0),
        }
    }

    /// Evaluate `φ_0..=φ_degree` and their first two derivatives at `x`.
    pub fn eval(&self, degree: usize, x: f64) -> BasisValues {
        let n = degree + 1;
        let mut value = vec![0.0; n];
        let mut first = vec![0.0; n];
        let mut second = vec![0.0; n];
        value[0] = 1.0;
        for k in 0..degree {
            let (a, b) = self.recurrence(k);
            let (p_prev, d_prev, s_prev) =
                if k == 0 { (0.0, 0.0, 0.0) } else { (value[k - 1], first[k - 1], second[k - 1]) };
            value[k + 1] = a * x * value[k] - b * p_prev;
            first[k + 1] = a * (value[k] + x * first[k]) - b * d_prev;
            second[k + 1] = a * (2.0 * first[k] + x * second[k]) - b * s_prev;
        }
        BasisValues { value, first, second }
    }

    /// Gauss nodes and weights with `m` points for this family's weight.
    ///
    /// Nodes are returned in decreasing order.
    pub fn gauss_rule(&self, m: usize) -> (Vec<f64>, Vec<f64>) {
        match self {
            PolynomialBasis::Chebyshev => {
                let nodes = (0..m).map(|j| (PI * (j as f64 + 0.5) / m as f64).cos()).collect();
                (nodes, vec![PI / m as f64; m])
            }
            PolynomialBasis::Legendre => gauss_legendre(m),
        }
    }
}

// ---- Helper methods ----

/// Gauss–Legendre rule by Newton iteration on `P_m`.
fn gauss_legendre(m: usize) -> (Vec<f64>, Vec<f64>) {
    let mut nodes = Vec::with_capacity(m);
    let mut weights = Vec::with_capacity(m);
    let basis = PolynomialBasis::Legendre;
    for j in 0..m {
        let mut x = (PI * (j as f64 + 0.75) / (m as f64 + 0.5)).cos();
        for _ in 0..NEWTON_MAX_ITER {
            let vals = basis.eval(m, x);
            let step = vals.value[m] / vals.first[m];
            x -= step;
            if step.abs() < NEWTON_TOL {
                break;
            }
        }
        let dp = basis.eval(m, x).first[m];
        nodes.push(x);
        weights.push(2.0 / ((1.0 - x * x) * dp * dp));
    }
    (nodes, weights)
}
