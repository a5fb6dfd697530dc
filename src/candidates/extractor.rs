//! candidates::extractor — surrogate critical points inside a region.
//!
//! Runs a [`CriticalPointSolver`] on a region's surrogate and keeps the
//! roots whose reference coordinates satisfy `|u_a| <= 1 + bound_tolerance`
//! on every axis. Roots keep the solver's discovery order.
use crate::{
    candidates::solver::CriticalPointSolver,
    errors::{PipelineError, PipelineResult, Stage, transient},
    optimization::local_optimizer::types::Point,
    surrogate::adapter::SurrogateFit,
    sweep::region::Region,
};
use log::debug;
use serde::Serialize;

/// Default slack on the reference-cube bounds.
pub const DEFAULT_BOUND_TOLERANCE: f64 = 1e-3;

/// A surrogate critical point awaiting refinement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidatePoint {
    pub coordinates: Point,
    pub source_region_id: usize,
    pub surrogate_value: f64,
}

/// extract_candidates — critical points of `fit.surrogate` inside `region`.
///
/// # Errors
/// - [`PipelineError::InvalidConfig`] for a negative or non-finite
///   `bound_tolerance`.
/// - [`PipelineError::Transient`] when the solver fails.
pub fn extract_candidates<S: CriticalPointSolver + ?Sized>(
    solver: &S, fit: &SurrogateFit, region: &Region, bound_tolerance: f64,
) -> PipelineResult<Vec<CandidatePoint>> {
    if !bound_tolerance.is_finite() || bound_tolerance < 0.0 {
        return Err(PipelineError::InvalidConfig {
            field: "bound_tolerance",
            value: bound_tolerance,
            reason: "Bound tolerance must be finite and non-negative.",
        });
    }
    let roots =
        solver.solve(&fit.surrogate).map_err(|e| transient(Stage::CandidateExtraction, e))?;
    let found = roots.len();
    let candidates: Vec<CandidatePoint> = roots
        .into_iter()
        .filter(|x| region.contains_reference(&region.to_reference(x), bound_tolerance))
        .map(|x| CandidatePoint {
            surrogate_value: fit.surrogate.value(&x),
            coordinates: x,
            source_region_id: region.id,
        })
        .collect();
    debug!("{region}: {} of {found} surrogate critical points inside the region", candidates.len());
    Ok(candidates)
}
