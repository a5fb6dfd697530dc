//! surrogate — polynomial approximations of the objective on each region.
//!
//! - [`basis`]: Chebyshev/Legendre recurrences and Gauss rules.
//! - [`tensor`]: separable per-axis transforms on dense grids.
//! - [`builder`]: the [`SurrogateBuilder`] capability, [`Surrogate`] and the
//!   default [`TensorProductBuilder`].
//! - [`adapter`]: the degree-adaptation loop, [`fit_surrogate`].
pub mod adapter;
pub mod basis;
pub mod builder;
pub mod tensor;

pub use self::adapter::{SurrogateFit, SurrogateSettings, fit_surrogate};
pub use self::basis::PolynomialBasis;
pub use self::builder::{Surrogate, SurrogateBuilder, TensorProductBuilder};
