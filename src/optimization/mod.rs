//! optimization — local search stack and unified optimizer error surface.
//!
//! Purpose
//! -------
//! Provide the local optimization layer used to refine critical-point
//! candidates: an argmin-backed L-BFGS minimizer with labelled stopping
//! rules, a bounded Nelder–Mead search, finite-difference derivatives, and a
//! single error/result surface.
//!
//! Key behaviors
//! -------------
//! - Expose a high-level API for **minimizing objectives** `f(x)`
//!   (`local_optimizer`), including configuration of solvers and stopping
//!   criteria.
//! - Normalize configuration issues, numerical failures, and backend solver
//!   errors into a single enum (`errors::OptError`) with a common result
//!   alias (`OptResult<T>`).
//!
//! Conventions
//! -----------
//! - Points, gradients, and Hessians are `ndarray`-based aliases (`Point`,
//!   `Grad`, `Hessian`).
//! - Public entrypoints that can fail return `OptResult<T>`; callers never
//!   see raw argmin errors.
//! - Progress is reported through the `log` facade at `debug` level only;
//!   installing a logger is left to the application.
//!
//! Downstream usage
//! ----------------
//! - The refinement engines call `minimize`, `minimize_bounded` and
//!   `objective_gradient`; the candidate classifier calls
//!   `objective_hessian`.
//! - Front-ends typically import `optimization::prelude::*`.

pub mod errors;
pub mod local_optimizer;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::local_optimizer::prelude::*;
}
