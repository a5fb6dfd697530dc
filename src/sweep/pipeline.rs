//! sweep::pipeline — one tolerance level, end to end.
//!
//! decompose → (per region) surrogate fit → candidate extraction →
//! refinement → deduplication → optional ultra-precision refinement of the
//! unique points → [`ToleranceLevelSummary`].
//!
//! Regions are processed on rayon's global pool when
//! `SweepConfig::parallel` is set. Results are collected in region-id
//! order in both modes, so every downstream sequence (and therefore the
//! deduplication outcome) is independent of scheduling.
use crate::{
    candidates::{
        classify::{PointType, classify_point},
        extractor::{CandidatePoint, extract_candidates},
        solver::CriticalPointSolver,
    },
    errors::PipelineResult,
    optimization::local_optimizer::{traits::Objective, types::Point},
    refinement::{
        engine::refine,
        result::{RefinementResult, UltraPrecisionResult, min_distance},
        ultra::refine_ultra,
    },
    surrogate::{
        adapter::{SurrogateFit, fit_surrogate},
        builder::SurrogateBuilder,
    },
    sweep::{
        config::{DomainConfig, LevelConfig},
        dedup::deduplicate_indices,
        region::{Region, decompose},
        summary::{RegionSummary, SuccessRates, ToleranceLevelSummary, median_distance},
    },
};
use log::debug;
use rayon::prelude::*;
use std::time::{Duration, Instant};

/// Everything one region produced.
#[derive(Debug, Clone)]
struct RegionOutput {
    region: Region,
    fit: SurrogateFit,
    candidates: Vec<CandidatePoint>,
    refinements: Vec<RefinementResult>,
    compute_time: Duration,
}

/// run_level — the single-level pipeline at `level.tolerance`.
///
/// # Errors
/// - Configuration and decomposition errors.
/// - [`crate::errors::PipelineError::Transient`] from any stage; the
///   orchestrator decides whether to retry.
pub fn run_level<F, B, S>(
    objective: &F, domain: &DomainConfig, level: &LevelConfig, builder: &B, solver: &S,
) -> PipelineResult<ToleranceLevelSummary>
where
    F: Objective,
    B: SurrogateBuilder + ?Sized,
    S: CriticalPointSolver + ?Sized,
{
    let start = Instant::now();
    let settings = &level.settings;
    let regions =
        decompose(domain.dimension, &domain.center, domain.half_width, settings.overlap_fraction)?;

    let process = |region: &Region| process_region(objective, region, level, builder, solver);
    let outputs: Vec<RegionOutput> = if settings.parallel {
        regions.par_iter().map(process).collect::<PipelineResult<Vec<_>>>()?
    } else {
        regions.iter().map(process).collect::<PipelineResult<Vec<_>>>()?
    };

    let raw_points: Vec<Point> = outputs
        .iter()
        .flat_map(|o| o.candidates.iter().map(|c| c.coordinates.clone()))
        .collect();
    let refinements: Vec<RefinementResult> =
        outputs.iter().flat_map(|o| o.refinements.iter().cloned()).collect();
    let refined_points: Vec<Point> = refinements.iter().map(|r| r.refined_point.clone()).collect();
    let refined_values: Vec<f64> = refinements.iter().map(|r| r.refined_value).collect();

    let kept = deduplicate_indices(&refined_points, &refined_values, settings.dedup_tolerance)?;
    let unique_points: Vec<Point> = kept.iter().map(|&i| refined_points[i].clone()).collect();
    let unique_values: Vec<f64> = kept.iter().map(|&i| refined_values[i]).collect();
    debug!(
        "tolerance {:.1e}: {} refined points, {} unique",
        level.tolerance,
        refinements.len(),
        unique_points.len()
    );

    let ultra_results: Vec<UltraPrecisionResult> = match &settings.ultra {
        Some(ultra) => kept
            .iter()
            .map(|&i| {
                let source = &refinements[i];
                let candidate = CandidatePoint {
                    coordinates: source.refined_point.clone(),
                    source_region_id: source.source_region_id,
                    surrogate_value: source.refined_value,
                };
                refine_ultra(objective, &candidate, settings.target_value, ultra, &settings.reference_points)
                    .map(|mut result| {
                        result.base.region_label = source.region_label.clone();
                        result
                    })
            })
            .collect::<PipelineResult<Vec<_>>>()?,
        None => Vec::new(),
    };

    let references: &[Point] = if settings.reference_points.is_empty() {
        &unique_points
    } else {
        &settings.reference_points
    };
    let distance_to = |x: &Point| min_distance(x, references).unwrap_or(f64::INFINITY);
    let raw_distances: Vec<f64> = raw_points.iter().map(distance_to).collect();
    let refined_distances: Vec<f64> = refined_points.iter().map(distance_to).collect();
    let point_types: Vec<PointType> =
        refined_points.iter().map(|x| classify_point(objective, x)).collect();
    let success_rates =
        SuccessRates::compute(references, &raw_points, &refined_points, settings.success_radius);

    let mut offset = 0;
    let region_summaries: Vec<RegionSummary> = outputs
        .iter()
        .map(|o| {
            let count = o.refinements.len();
            let distances = &refined_distances[offset..offset + count];
            offset += count;
            let converged = o.refinements.iter().filter(|r| r.converged).count();
            RegionSummary {
                region_id: o.region.id,
                sign_pattern: o.region.sign_pattern.clone(),
                success_rate: if count == 0 { 0.0 } else { converged as f64 / count as f64 },
                median_distance: median_distance(distances),
                degree_used: o.fit.degree,
                approx_error: o.fit.approx_error,
                degraded: o.fit.degraded,
                candidate_count: o.candidates.len(),
                compute_time: o.compute_time,
            }
        })
        .collect();

    ToleranceLevelSummary::new(
        level.tolerance,
        domain.dimension,
        raw_distances,
        refined_distances,
        point_types,
        refinements,
        region_summaries,
        success_rates,
        unique_points,
        unique_values,
        ultra_results,
        start.elapsed(),
    )
}

// ---- Helper methods ----

fn process_region<F, B, S>(
    objective: &F, region: &Region, level: &LevelConfig, builder: &B, solver: &S,
) -> PipelineResult<RegionOutput>
where
    F: Objective,
    B: SurrogateBuilder + ?Sized,
    S: CriticalPointSolver + ?Sized,
{
    let start = Instant::now();
    let settings = &level.settings;
    let fit = fit_surrogate(builder, objective, region, level.tolerance, &settings.surrogate)?;
    let candidates = extract_candidates(solver, &fit, region, settings.bound_tolerance)?;
    let label = region.label();
    // Twice the region diagonal: refinements may cross into any other
    // region but never leave the neighbourhood of the domain.
    let refinement = match settings.refinement.max_displacement {
        Some(_) => settings.refinement,
        None => settings
            .refinement
            .with_max_displacement(4.0 * region.half_widths.dot(&region.half_widths).sqrt()),
    };
    let refinements = candidates
        .iter()
        .map(|c| {
            refine(objective, c, &refinement, &settings.reference_points).map(|mut r| {
                r.region_label = label.clone();
                r
            })
        })
        .collect::<PipelineResult<Vec<_>>>()?;
    let converged = refinements.iter().filter(|r| r.converged).count();
    debug!(
        "{region}: degree {}, {} candidates, {converged} converged",
        fit.degree,
        candidates.len()
    );
    Ok(RegionOutput {
        region: region.clone(),
        fit,
        candidates,
        refinements,
        compute_time: start.elapsed(),
    })
}
