//! refinement::result — records produced by the refinement engines.
use crate::optimization::local_optimizer::types::Point;
use serde::Serialize;
use std::{fmt, time::Duration};

/// Why a refinement ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConvergenceReason {
    GradientToleranceMet,
    IterationLimit,
    FunctionToleranceMet,
    Failed,
}

impl ConvergenceReason {
    /// Reasons that can accompany `converged == true`.
    pub fn is_success(&self) -> bool {
        matches!(self, ConvergenceReason::GradientToleranceMet | ConvergenceReason::FunctionToleranceMet)
    }
}

impl fmt::Display for ConvergenceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ConvergenceReason::GradientToleranceMet => "gradient tolerance met",
            ConvergenceReason::IterationLimit => "iteration limit",
            ConvergenceReason::FunctionToleranceMet => "function tolerance met",
            ConvergenceReason::Failed => "failed",
        };
        write!(f, "{text}")
    }
}

/// Outcome of refining one candidate.
///
/// `converged` implies `final_gradient_norm <= tolerance_used *
/// gradient_slack` for the slack of the configuration that produced it.
/// `refined_value <= initial_value` is not guaranteed in general, but a
/// `Failed` result keeps `refined_point == initial_point`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefinementResult {
    pub initial_point: Point,
    pub refined_point: Point,
    pub initial_value: f64,
    pub refined_value: f64,
    pub converged: bool,
    pub iterations_used: usize,
    pub convergence_reason: ConvergenceReason,
    pub tolerance_used: f64,
    pub tolerance_selection_reason: String,
    pub final_gradient_norm: f64,
    pub position_change_magnitude: f64,
    pub value_improvement: f64,
    pub region_label: String,
    pub source_region_id: usize,
    pub distance_to_reference: Option<f64>,
    pub elapsed_time: Duration,
}

/// Method that produced the final point of an ultra-precision run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FinalMethod {
    StagedGradient,
    LogReparametrized,
    DerivativeFreePolish,
}

/// One attempted stage of an ultra-precision run.
///
/// `value_after_stage <= value_before_stage` always holds: a stage that does
/// not strictly improve is recorded with `accepted == false` and the
/// previous value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRecord {
    pub stage_index: usize,
    pub method: FinalMethod,
    pub tolerance_used: f64,
    pub value_before_stage: f64,
    pub value_after_stage: f64,
    pub iterations_used: usize,
    pub accepted: bool,
    pub converged: bool,
}

/// Outcome of the staged ultra-precision refinement.
///
/// `base` describes the best point over all stages, relative to the
/// original candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UltraPrecisionResult {
    pub base: RefinementResult,
    pub stage_history: Vec<StageRecord>,
    pub stages_completed: usize,
    pub final_method: FinalMethod,
    pub target_gap: Option<f64>,
}

/// Smallest Euclidean distance from `x` to any of `references`.
pub fn min_distance(x: &Point, references: &[Point]) -> Option<f64> {
    references.iter().map(|r| euclidean(x, r)).min_by(|a, b| a.total_cmp(b))
}

/// Euclidean distance between two points of equal length.
pub fn euclidean(a: &Point, b: &Point) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "distance between points of different dimension");
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // `min_distance` picks the nearest reference and is `None` without
    // references.
    fn min_distance_picks_nearest_reference() {
        let x = array![0.0, 0.0];
        let refs = vec![array![3.0, 4.0], array![0.0, -2.0]];
        assert_eq!(min_distance(&x, &refs), Some(2.0));
        assert_eq!(min_distance(&x, &[]), None);
    }

    #[test]
    // Purpose
    // -------
    // Only gradient and function tolerance reasons count as success.
    fn success_reasons() {
        assert!(ConvergenceReason::GradientToleranceMet.is_success());
        assert!(ConvergenceReason::FunctionToleranceMet.is_success());
        assert!(!ConvergenceReason::IterationLimit.is_success());
        assert!(!ConvergenceReason::Failed.is_success());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "different dimension")]
    // Purpose
    // -------
    // Points of different length are never silently truncated.
    fn euclidean_rejects_mismatched_lengths() {
        euclidean(&array![0.0, 1.0], &array![0.0]);
    }
}
