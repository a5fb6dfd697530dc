//! critpoint_sweep — adaptive multi-region critical-point location.
//!
//! Purpose
//! -------
//! Locate and certify the critical points of a smooth objective `f: ℝⁿ → ℝ`
//! over a bounded box. The box is split into overlapping orthant regions,
//! each region gets an adaptive-degree polynomial surrogate, the
//! surrogate's critical points seed local refinement on the true objective,
//! and the refined points are deduplicated and classified. A tolerance
//! sweep repeats this for a strictly decreasing sequence of surrogate
//! tolerances, retrying levels that hit transient failures.
//!
//! Key behaviors
//! -------------
//! - [`sweep::region`]: orthant decomposition with configurable overlap.
//! - [`surrogate`]: degree adaptation over a pluggable
//!   [`surrogate::SurrogateBuilder`] (tensor-product Chebyshev/Legendre
//!   projection by default).
//! - [`candidates`]: surrogate critical points via a pluggable
//!   [`candidates::CriticalPointSolver`] and Hessian-based classification.
//! - [`refinement`]: adaptive-tolerance L-BFGS refinement and the staged
//!   ultra-precision engine.
//! - [`sweep`]: deduplication, the single-level pipeline and the retrying
//!   [`sweep::ToleranceSweep`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Objectives are `Sync`; regions of one level may be processed in
//!   parallel, but every result sequence is ordered by region id and
//!   discovery order regardless of scheduling.
//! - Numerical non-convergence is data (`degraded` fits, `Failed`
//!   refinements), never an error. Errors are reserved for invalid inputs
//!   and external failures of the objective.
//!
//! Conventions
//! -----------
//! - Points, gradients and Hessians are `ndarray` types
//!   (`optimization::local_optimizer::types`).
//! - Progress is reported through the `log` facade; the library never
//!   installs a logger.
//!
//! Downstream usage
//! ----------------
//! - Most callers only need `prelude::*`: build a [`sweep::SweepConfig`],
//!   a [`sweep::DomainConfig`], and call
//!   [`sweep::ToleranceSweep::run_sweep`].
//! - [`test_functions`] provides the benchmark objectives used in tests.

pub mod candidates;
pub mod errors;
pub mod optimization;
pub mod refinement;
pub mod surrogate;
pub mod sweep;
pub mod test_functions;

pub mod prelude {
    pub use crate::candidates::{CandidatePoint, CriticalPointSolver, PointType, classify_point};
    pub use crate::errors::{PipelineError, PipelineResult, Stage};
    pub use crate::optimization::prelude::*;
    pub use crate::refinement::{
        ConvergenceReason, RefinementConfig, RefinementResult, UltraPrecisionConfig,
        UltraPrecisionResult, refine, refine_ultra,
    };
    pub use crate::surrogate::{PolynomialBasis, SurrogateBuilder, SurrogateSettings};
    pub use crate::sweep::{
        DomainConfig, LevelStatus, SweepConfig, SweepResult, ToleranceLevelSummary,
        ToleranceSweep, deduplicate,
    };
}
