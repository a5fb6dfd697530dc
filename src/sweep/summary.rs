//! sweep::summary — validated result records of a sweep.
//!
//! - [`RegionSummary`]: per-region fit and refinement statistics.
//! - [`SuccessRates`]: share of reference points recovered by raw and
//!   refined candidates.
//! - [`ToleranceLevelSummary`]: everything one successful level produced.
//!   Only constructible through [`ToleranceLevelSummary::new`], which
//!   enforces the index alignment of the per-candidate sequences.
//! - [`ToleranceLevel`] / [`LevelStatus`]: per-level bookkeeping of the
//!   orchestrator.
//! - [`SweepResult`]: all levels of a sweep, in sequence order.
use crate::{
    candidates::classify::PointType,
    errors::{PipelineError, PipelineResult},
    optimization::local_optimizer::types::Point,
    refinement::result::{RefinementResult, UltraPrecisionResult, euclidean, min_distance},
    sweep::config::DomainConfig,
};
use serde::Serialize;
use statrs::statistics::{Data, Median};
use std::time::Duration;

/// Fit and refinement statistics of one region.
///
/// `success_rate` is the share of the region's candidates whose refinement
/// converged (0 without candidates); `median_distance` is the median of
/// their refined distances.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    pub region_id: usize,
    pub sign_pattern: Vec<i8>,
    pub success_rate: f64,
    pub median_distance: Option<f64>,
    pub degree_used: usize,
    pub approx_error: f64,
    pub degraded: bool,
    pub candidate_count: usize,
    pub compute_time: Duration,
}

/// Share of reference points recovered within the success radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SuccessRates {
    pub raw: f64,
    pub refined: f64,
    pub combined: f64,
}

impl SuccessRates {
    /// success_rates — recovery shares of `references` by raw and refined
    /// points. All rates are 0 without references.
    pub fn compute(
        references: &[Point], raw_points: &[Point], refined_points: &[Point], radius: f64,
    ) -> Self {
        if references.is_empty() {
            return Self { raw: 0.0, refined: 0.0, combined: 0.0 };
        }
        let hit = |reference: &Point, points: &[Point]| {
            min_distance(reference, points).is_some_and(|d| d < radius)
        };
        let (mut raw, mut refined, mut combined) = (0usize, 0usize, 0usize);
        for reference in references {
            let raw_hit = hit(reference, raw_points);
            let refined_hit = hit(reference, refined_points);
            raw += usize::from(raw_hit);
            refined += usize::from(refined_hit);
            combined += usize::from(raw_hit || refined_hit);
        }
        let n = references.len() as f64;
        Self { raw: raw as f64 / n, refined: refined as f64 / n, combined: combined as f64 / n }
    }
}

/// Median of the finite entries, `None` when there are none.
pub fn median_distance(distances: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = distances.iter().copied().filter(|d| d.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    Some(Data::new(finite).median())
}

/// Outcome of one successful tolerance level.
///
/// `raw_distances`, `refined_distances`, `point_types` and `refinements` are
/// index-aligned, one entry per candidate in region-id then discovery
/// order. Distances are measured to the configured reference points, or to
/// the level's own unique points when none were given.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToleranceLevelSummary {
    pub tolerance: f64,
    pub raw_distances: Vec<f64>,
    pub refined_distances: Vec<f64>,
    pub point_types: Vec<PointType>,
    pub refinements: Vec<RefinementResult>,
    pub region_summaries: Vec<RegionSummary>,
    pub success_rates: SuccessRates,
    pub unique_points: Vec<Point>,
    pub unique_values: Vec<f64>,
    pub ultra_results: Vec<UltraPrecisionResult>,
    pub compute_time: Duration,
}

impl ToleranceLevelSummary {
    /// Construct a validated level summary for a `dimension`-dimensional
    /// domain.
    ///
    /// # Errors
    /// [`PipelineError::InvalidSequence`] when the per-candidate sequences
    /// differ in length, the region count is not `2^dimension`, a rate lies
    /// outside `[0, 1]`, a distance is negative or NaN, the unique points and
    /// values differ in length, or the tolerance is not finite and positive.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tolerance: f64, dimension: usize, raw_distances: Vec<f64>, refined_distances: Vec<f64>,
        point_types: Vec<PointType>, refinements: Vec<RefinementResult>,
        region_summaries: Vec<RegionSummary>, success_rates: SuccessRates,
        unique_points: Vec<Point>, unique_values: Vec<f64>,
        ultra_results: Vec<UltraPrecisionResult>, compute_time: Duration,
    ) -> PipelineResult<Self> {
        let malformed =
            |reason: String| -> PipelineResult<Self> { Err(PipelineError::InvalidSequence { reason }) };
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return malformed(format!("tolerance must be finite and positive, got {tolerance}"));
        }
        let n = point_types.len();
        if raw_distances.len() != n || refined_distances.len() != n || refinements.len() != n {
            return malformed(format!(
                "per-candidate sequences differ in length: raw {}, refined {}, types {n}, refinements {}",
                raw_distances.len(),
                refined_distances.len(),
                refinements.len()
            ));
        }
        if raw_distances.iter().chain(refined_distances.iter()).any(|d| d.is_nan() || *d < 0.0) {
            return malformed("distances must be non-negative".to_string());
        }
        let expected_regions = 1usize.checked_shl(dimension as u32).unwrap_or(0);
        if region_summaries.len() != expected_regions {
            return malformed(format!(
                "expected {expected_regions} region summaries, got {}",
                region_summaries.len()
            ));
        }
        let in_unit = |r: f64| (0.0..=1.0).contains(&r);
        if let Some(bad) = region_summaries.iter().find(|r| !in_unit(r.success_rate)) {
            return malformed(format!(
                "region {} success rate {} outside [0, 1]",
                bad.region_id, bad.success_rate
            ));
        }
        let rates = [success_rates.raw, success_rates.refined, success_rates.combined];
        if !rates.into_iter().all(in_unit) {
            return malformed(format!("success rates {success_rates:?} outside [0, 1]"));
        }
        if unique_points.len() != unique_values.len() {
            return malformed(format!(
                "unique points and values differ in length: {} and {}",
                unique_points.len(),
                unique_values.len()
            ));
        }
        Ok(Self {
            tolerance,
            raw_distances,
            refined_distances,
            point_types,
            refinements,
            region_summaries,
            success_rates,
            unique_points,
            unique_values,
            ultra_results,
            compute_time,
        })
    }

    /// Refinements that converged within `radius` of `point`.
    pub fn converged_near<'a>(
        &'a self, point: &'a Point, radius: f64,
    ) -> impl Iterator<Item = &'a RefinementResult> + 'a {
        self.refinements
            .iter()
            .filter(move |r| r.converged && euclidean(&r.refined_point, point) < radius)
    }
}

/// Lifecycle of a tolerance level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LevelStatus {
    Pending,
    Running,
    Succeeded,
    RetryExhausted,
}

/// Bookkeeping for one tolerance of a sweep.
///
/// `summary` is present exactly when `status == Succeeded`; `last_error`
/// exactly when `status == RetryExhausted`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToleranceLevel {
    pub tolerance: f64,
    pub status: LevelStatus,
    pub attempts: usize,
    pub summary: Option<ToleranceLevelSummary>,
    pub last_error: Option<PipelineError>,
}

impl ToleranceLevel {
    pub fn pending(tolerance: f64) -> Self {
        Self { tolerance, status: LevelStatus::Pending, attempts: 0, summary: None, last_error: None }
    }
}

/// Outcome of a whole sweep, one level per tolerance in sequence order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepResult {
    pub tolerance_sequence: Vec<f64>,
    pub levels: Vec<ToleranceLevel>,
    pub total_compute_time: Duration,
    pub domain: DomainConfig,
}

impl SweepResult {
    /// Level run at exactly `tolerance`.
    pub fn level(&self, tolerance: f64) -> Option<&ToleranceLevel> {
        self.levels.iter().find(|l| l.tolerance == tolerance)
    }

    /// Summaries of the levels that succeeded, in sequence order.
    pub fn summaries(&self) -> impl Iterator<Item = &ToleranceLevelSummary> {
        self.levels.iter().filter_map(|l| l.summary.as_ref())
    }

    pub fn all_succeeded(&self) -> bool {
        self.levels.iter().all(|l| l.status == LevelStatus::Succeeded)
    }
}
