//! candidates — surrogate critical points and their classification.
//!
//! - [`solver`]: the [`CriticalPointSolver`] capability and the default
//!   multi-start [`NewtonCriticalSolver`].
//! - [`extractor`]: [`extract_candidates`], which keeps the roots inside a
//!   region.
//! - [`classify`]: Hessian-eigenvalue labelling of refined points.
pub mod classify;
pub mod extractor;
pub mod solver;

pub use self::classify::{PointType, classify_point};
pub use self::extractor::{CandidatePoint, extract_candidates};
pub use self::solver::{CriticalPointSolver, NewtonCriticalSolver};
