//! Public API surface for local minimization.
//!
//! - [`Objective`]: trait users implement for the function under study.
//! - [`MinimizeOptions`] and [`Tolerances`]: configuration for the optimizer.
//! - [`LineSearcher`]: choice of line search used by L-BFGS.
//! - [`StopReason`]: which stopping rule ended a run.
//! - [`OptimOutcome`]: normalized result returned by the high-level `minimize` API.
use crate::optimization::{
    errors::{OptError, OptResult},
    local_optimizer::{
        stopping::{COST_RULE, GRADIENT_RULE, PARAMETER_RULE},
        types::{Cost, FnEvalMap, Grad, Point},
        validation::{
            validate_minimizer, validate_point, validate_value, verify_tol_cost, verify_tol_grad,
            verify_tol_param,
        },
    },
};
use argmin::core::{TerminationReason, TerminationStatus};
use argmin_math::ArgminL2Norm;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// User-implemented objective interface.
///
/// The pipeline *minimizes* `f(x)` and looks for points where `∇f(x) = 0`.
///
/// Required:
/// - `dim() -> usize`: dimension `n` of the domain.
/// - `value(&Point) -> OptResult<Cost>`: evaluate `f(x)`.
///   Errors: return a descriptive `OptError` for invalid inputs or failures
///   of an external model. The pipeline treats these as transient.
///
/// Optional:
/// - `grad(&Point) -> OptResult<Grad>`: analytic gradient `∇f(x)`.
///   If not implemented, robust finite differences are used automatically.
/// - `check(&Point) -> OptResult<()>`: validation hook called once before a
///   local optimization. Defaults to a dimension and finiteness check.
///
/// Objectives must be `Sync`: regions of one tolerance level are processed
/// on a thread pool and share the objective by reference.
pub trait Objective: Sync {
    // Required methods
    fn dim(&self) -> usize;
    fn value(&self, x: &Point) -> OptResult<Cost>;

    // Optional methods
    fn grad(&self, _x: &Point) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }

    fn check(&self, x: &Point) -> OptResult<()> {
        validate_point(x, self.dim())
    }
}

/// Choice of line search used inside the L-BFGS solver.
///
/// Parsing:
/// This enum implements `FromStr` and accepts case-insensitive names
/// (`"MoreThuente"`, `"HagerZhang"`). Unknown names return
/// `OptError::InvalidLineSearch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineSearcher {
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morethuente" => Ok(LineSearcher::MoreThuente),
            "hagerzhang" => Ok(LineSearcher::HagerZhang),
            _ => Err(OptError::InvalidLineSearch {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'MoreThuente' or 'HagerZhang'.",
            }),
        }
    }
}

/// Optimizer-level configuration.
///
/// Fields:
/// - `tols: Tolerances` — stopping rules and iteration limits.
/// - `line_searcher: LineSearcher` — line-search algorithm used by L-BFGS.
/// - `lbfgs_mem`: `None` uses [`DEFAULT_LBFGS_MEM`](super::types::DEFAULT_LBFGS_MEM).
///
/// Default:
/// - `tols`: `tol_grad = 1e-8`, `tol_cost = None`, `tol_param = None`, `max_iter = 300`
/// - `line_searcher`: `MoreThuente`
/// - `lbfgs_mem`: `None`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimizeOptions {
    pub tols: Tolerances,
    pub line_searcher: LineSearcher,
    pub lbfgs_mem: Option<usize>,
}

impl MinimizeOptions {
    /// Create a new set of optimizer options.
    ///
    /// Numeric tolerances are validated inside [`Tolerances::new`]; this
    /// constructor only checks the L-BFGS memory.
    pub fn new(
        tols: Tolerances, line_searcher: LineSearcher, lbfgs_mem: Option<usize>,
    ) -> OptResult<Self> {
        if let Some(m) = lbfgs_mem {
            if m == 0 {
                return Err(OptError::InvalidLBFGSMem {
                    mem: m,
                    reason: "L-BFGS memory must be greater than zero.",
                });
            }
        }
        Ok(Self { tols, line_searcher, lbfgs_mem })
    }
}

impl Default for MinimizeOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances { tol_grad: Some(1e-8), tol_cost: None, tol_param: None, max_iter: Some(300) },
            line_searcher: LineSearcher::MoreThuente,
            lbfgs_mem: None,
        }
    }
}

/// Stopping rules and iteration limits used by the optimizer.
///
/// - `tol_grad`: terminate when the gradient norm falls below this threshold.
/// - `tol_cost`: terminate when the absolute change in cost falls below this threshold.
/// - `tol_param`: terminate when the step length falls below this threshold.
/// - `max_iter`: hard cap on the number of iterations.
///
/// Any field can be `None` but **at least one** must be provided
/// (see [`Tolerances::new`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub tol_param: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// Construct validated tolerances.
    ///
    /// # Rules
    /// - At least one field must be `Some`.
    /// - If provided, tolerances must be **finite and strictly positive**.
    /// - If provided, `max_iter` must be `> 0`.
    ///
    /// # Errors
    /// - [`OptError::NoTolerancesProvided`] if all fields are `None`.
    /// - [`OptError::InvalidTolGrad`] / [`OptError::InvalidTolCost`] /
    ///   [`OptError::InvalidTolParam`] for non-finite or non-positive tolerances.
    /// - [`OptError::InvalidMaxIter`] if `max_iter == 0`.
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, tol_param: Option<f64>,
        max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && tol_param.is_none() && max_iter.is_none()
        {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol_grad(tol_grad)?;
        verify_tol_cost(tol_cost)?;
        verify_tol_param(tol_param)?;
        if let Some(max_iter) = max_iter {
            if max_iter == 0 {
                return Err(OptError::InvalidMaxIter {
                    max_iter,
                    reason: "Maximum iterations must be greater than zero.",
                });
            }
        }
        Ok(Self { tol_grad, tol_cost, tol_param, max_iter })
    }
}

/// Which rule ended an optimizer run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// Gradient norm fell below `tol_grad`.
    GradientTolerance,
    /// Absolute cost change fell below `tol_cost`.
    CostTolerance,
    /// Step length fell below `tol_param`.
    ParameterTolerance,
    /// Iteration budget exhausted.
    MaxIterations,
    /// The backend solver's own convergence test fired.
    SolverConverged,
    /// Any other termination reported by the backend.
    Other(String),
    /// The executor returned without terminating.
    NotTerminated,
}

impl StopReason {
    /// Translate an argmin termination status into a [`StopReason`].
    pub fn from_status(status: &TerminationStatus) -> Self {
        match status {
            TerminationStatus::NotTerminated => StopReason::NotTerminated,
            TerminationStatus::Terminated(reason) => match reason {
                TerminationReason::MaxItersReached => StopReason::MaxIterations,
                TerminationReason::SolverConverged => StopReason::SolverConverged,
                TerminationReason::SolverExit(label) if label == GRADIENT_RULE => {
                    StopReason::GradientTolerance
                }
                TerminationReason::SolverExit(label) if label == COST_RULE => {
                    StopReason::CostTolerance
                }
                TerminationReason::SolverExit(label) if label == PARAMETER_RULE => {
                    StopReason::ParameterTolerance
                }
                other => StopReason::Other(format!("{other:?}")),
            },
        }
    }
}

/// Canonical result returned by `minimize`.
///
/// - `minimizer`: best point found.
/// - `value`: best objective value `f(x*)`.
/// - `stop`: which rule ended the run.
/// - `status`: human-readable termination status string.
/// - `iterations`: number of optimizer iterations performed.
/// - `fn_evals`: function-evaluation counters reported by `argmin`.
/// - `grad_norm`: norm of the last available gradient, if present.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimOutcome {
    pub minimizer: Point,
    pub value: f64,
    pub stop: StopReason,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
}

impl OptimOutcome {
    /// Build a validated [`OptimOutcome`] from raw solver state.
    ///
    /// # Errors
    /// - Propagates any validation errors for `minimizer` or `value`.
    pub fn new(
        minimizer_opt: Option<Point>, value: f64, termination: &TerminationStatus, iterations: u64,
        fn_evals: FnEvalMap, grad: Option<Grad>,
    ) -> OptResult<Self> {
        let minimizer = validate_minimizer(minimizer_opt)?;
        validate_value(value)?;
        let stop = StopReason::from_status(termination);
        let status = match termination {
            TerminationStatus::NotTerminated => "Not terminated".to_string(),
            TerminationStatus::Terminated(reason) => format!("{reason:?}"),
        };
        let iterations = iterations as usize;
        let grad_norm = grad.map(|g| g.l2_norm());
        Ok(Self { minimizer, value, stop, status, iterations, fn_evals, grad_norm })
    }
}
