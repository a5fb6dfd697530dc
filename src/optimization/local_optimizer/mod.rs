//! local_optimizer — argmin-powered local minimization of user objectives.
//!
//! Purpose
//! -------
//! Provide the local search machinery the refinement engines build on.
//! Callers implement a single trait, [`Objective`], and invoke either
//! [`minimize`] (L-BFGS with a configurable line search, labelled stopping
//! rules and finite-difference fallbacks) or [`minimize_bounded`]
//! (Nelder–Mead restricted to a box).
//!
//! Key behaviors
//! -------------
//! - Bridge objectives into argmin through [`adapter::ArgMinAdapter`].
//! - Select and configure L-BFGS via [`builders`] based on
//!   [`traits::LineSearcher`], wrap it in [`stopping::StoppingRules`], and
//!   execute via [`run::run_lbfgs`].
//! - Normalize results into [`OptimOutcome`], whose [`StopReason`] names the
//!   rule that ended the run.
//! - Supply gradients and Hessians in [`finite_diff`] when analytic
//!   derivatives are missing, with post-hoc validation and error capture.
//!
//! Invariants & assumptions
//! ------------------------
//! - All solvers **minimize** `f(x)`.
//! - [`Objective::value`] and [`Objective::grad`] report invalid inputs as
//!   recoverable [`OptError`](crate::optimization::errors::OptError) values,
//!   never panics.
//! - Configuration types ([`Tolerances`], [`MinimizeOptions`],
//!   [`BoundedOptions`]) are validated on construction.
//!
//! Testing notes
//! -------------
//! - Unit tests in submodules cover stop-rule decoding, solver wiring,
//!   finite-difference behavior and small convergence problems.
//! - End-to-end use through the refinement engines is covered by the
//!   `refinement` tests and the integration suite.
pub mod adapter;
pub mod api;
pub mod builders;
pub mod derivative_free;
pub mod finite_diff;
pub mod run;
pub mod stopping;
pub mod traits;
pub mod types;
pub mod validation;

pub use self::api::minimize;
pub use self::derivative_free::{BoundedOptions, BoundedOutcome, minimize_bounded};
pub use self::finite_diff::{compute_hessian, objective_gradient, objective_hessian};
pub use self::traits::{
    LineSearcher, MinimizeOptions, Objective, OptimOutcome, StopReason, Tolerances,
};
pub use self::types::{Cost, Grad, Hessian, Point};

pub mod prelude {
    pub use super::{
        BoundedOptions, BoundedOutcome, Cost, Grad, Hessian, LineSearcher, MinimizeOptions,
        Objective, OptimOutcome, Point, StopReason, Tolerances, minimize, minimize_bounded,
        objective_gradient,
    };
}
