//! refinement::ultra — staged ultra-precision refinement.
//!
//! Purpose
//! -------
//! Push one candidate towards the numerical floor of the objective by
//! chaining increasingly strict local searches, each starting from the best
//! point found so far.
//!
//! Stage schedule
//! --------------
//! 1. Progressive L-BFGS stages at `standard_tolerance · factor[k]`, stopping
//!    at the first stage that does not converge.
//! 2. A log-reparametrized stage minimizing `ln f` when the best value lies
//!    in `(0, log_value_threshold)`. Gradients of `ln f` stay well scaled
//!    when `f` itself is tiny.
//! 3. A bounded Nelder–Mead polish on `best ± polish_radius`.
//!
//! Every attempted stage is recorded. A stage only replaces the best point
//! when it strictly lowers the objective, so the value never increases
//! along the history. The total number of stages is capped by
//! `max_precision_stages`, and the run stops early once a supplied target
//! value is matched within `target_value_tolerance`.
use crate::{
    candidates::extractor::CandidatePoint,
    errors::{PipelineResult, Stage, transient},
    optimization::{
        errors::{OptError, OptResult},
        local_optimizer::{
            derivative_free::minimize_bounded,
            finite_diff::objective_gradient,
            traits::Objective,
            types::{Cost, Grad, Point},
        },
    },
    refinement::{
        config::UltraPrecisionConfig,
        engine::{LocalRun, initial_value, run_local},
        result::{
            ConvergenceReason, FinalMethod, RefinementResult, StageRecord, UltraPrecisionResult,
            euclidean, min_distance,
        },
    },
};
use argmin_math::ArgminL2Norm;
use log::debug;
use std::time::Instant;

/// refine_ultra — staged refinement of one candidate.
///
/// `target_value`, when given, is a known optimum value used for early
/// stopping and reported through `target_gap`.
///
/// # Errors
/// - [`crate::errors::PipelineError::InvalidConfig`] or
///   [`crate::errors::PipelineError::InvalidSequence`] for an invalid
///   `config`.
/// - [`crate::errors::PipelineError::Transient`] when the objective fails at
///   the candidate or at the point returned by the log-reparametrized
///   stage.
pub fn refine_ultra<F: Objective + ?Sized>(
    objective: &F, candidate: &CandidatePoint, target_value: Option<f64>,
    config: &UltraPrecisionConfig, references: &[Point],
) -> PipelineResult<UltraPrecisionResult> {
    config.validate()?;
    let start = Instant::now();
    let x0 = &candidate.coordinates;
    let v0 = initial_value(objective, x0, Stage::UltraRefinement)?;
    let refinement = &config.refinement;
    let slack = refinement.gradient_slack;

    let mut best = LocalRun {
        point: x0.clone(),
        value: v0,
        reason: ConvergenceReason::Failed,
        converged: false,
        iterations: 0,
        grad_norm: f64::INFINITY,
    };
    let mut final_method = FinalMethod::StagedGradient;
    let mut tolerance_used = refinement.standard_tolerance * config.stage_factors[0];
    let mut total_iterations = 0;
    let mut history: Vec<StageRecord> = Vec::new();
    let target_met = |value: f64| {
        target_value.is_some_and(|t| (value - t).abs() <= config.target_value_tolerance)
    };

    // ---- Progressive gradient stages ----
    for &factor in &config.stage_factors {
        let started = !history.is_empty();
        if history.len() >= config.max_precision_stages || (started && target_met(best.value)) {
            break;
        }
        let tolerance = refinement.standard_tolerance * factor;
        let run =
            run_local(objective, &best.point, best.value, tolerance, refinement, Stage::UltraRefinement)?;
        total_iterations += run.iterations;
        let accepted = run.value < best.value;
        history.push(StageRecord {
            stage_index: history.len(),
            method: FinalMethod::StagedGradient,
            tolerance_used: tolerance,
            value_before_stage: best.value,
            value_after_stage: if accepted { run.value } else { best.value },
            iterations_used: run.iterations,
            accepted,
            converged: run.converged,
        });
        let stage_converged = run.converged;
        if accepted || stage_converged || history.len() == 1 {
            if stage_converged {
                tolerance_used = tolerance;
            }
            // A converged run that could not improve still certifies the
            // current point at the stricter tolerance.
            best.reason = run.reason;
            best.converged = stage_converged;
            best.grad_norm = run.grad_norm;
            if accepted {
                best.point = run.point;
                best.value = run.value;
            }
        }
        if !stage_converged {
            break;
        }
    }

    // ---- Log-reparametrized stage ----
    if config.enable_log_reparametrization
        && history.len() < config.max_precision_stages
        && !target_met(best.value)
        && best.value > 0.0
        && best.value < config.log_value_threshold
    {
        let log_objective = LogReparametrized { inner: objective, floor: config.log_floor };
        let tolerance = refinement.standard_tolerance;
        let run = run_local(
            &log_objective,
            &best.point,
            best.value.ln(),
            tolerance,
            refinement,
            Stage::UltraRefinement,
        )?;
        total_iterations += run.iterations;
        let candidate_value = objective
            .value(&run.point)
            .map_err(|e| transient(Stage::UltraRefinement, e))?;
        let accepted = candidate_value < best.value;
        history.push(StageRecord {
            stage_index: history.len(),
            method: FinalMethod::LogReparametrized,
            tolerance_used: tolerance,
            value_before_stage: best.value,
            value_after_stage: if accepted { candidate_value } else { best.value },
            iterations_used: run.iterations,
            accepted,
            converged: run.converged,
        });
        if accepted {
            final_method = FinalMethod::LogReparametrized;
            best.point = run.point;
            best.value = candidate_value;
            refresh_gradient(objective, &mut best, tolerance_used);
        }
    }

    // ---- Derivative-free polish ----
    if config.enable_derivative_free_polish
        && history.len() < config.max_precision_stages
        && !target_met(best.value)
    {
        let lower = best.point.mapv(|v| v - config.polish_radius);
        let upper = best.point.mapv(|v| v + config.polish_radius);
        let polished = config
            .bounded_options()
            .and_then(|opts| minimize_bounded(objective, &lower, &upper, &opts));
        let (value, iterations, converged, point) = match polished {
            Ok(out) => (out.value, out.iterations as usize, out.converged, Some(out.minimizer)),
            Err(e) => {
                debug!("polish stage failed: {e}");
                (f64::NAN, 0, false, None)
            }
        };
        total_iterations += iterations;
        let accepted = value < best.value;
        history.push(StageRecord {
            stage_index: history.len(),
            method: FinalMethod::DerivativeFreePolish,
            tolerance_used: config.polish_sd_tolerance,
            value_before_stage: best.value,
            value_after_stage: if accepted { value } else { best.value },
            iterations_used: iterations,
            accepted,
            converged,
        });
        if let (true, Some(point)) = (accepted, point) {
            final_method = FinalMethod::DerivativeFreePolish;
            best.point = point;
            best.value = value;
            refresh_gradient(objective, &mut best, tolerance_used);
        }
    }

    let converged = best.reason.is_success() && best.grad_norm <= tolerance_used * slack;
    let stages_completed = history.len();
    debug!(
        "region {}: ultra refinement {:.6e} -> {:.6e} after {stages_completed} stages ({final_method:?})",
        candidate.source_region_id, v0, best.value
    );
    let base = RefinementResult {
        position_change_magnitude: euclidean(&best.point, x0),
        value_improvement: v0 - best.value,
        distance_to_reference: min_distance(&best.point, references),
        initial_point: x0.clone(),
        refined_point: best.point,
        initial_value: v0,
        refined_value: best.value,
        converged,
        iterations_used: total_iterations,
        convergence_reason: best.reason,
        tolerance_used,
        tolerance_selection_reason: format!(
            "ultra precision: {stages_completed} stages, strictest converged tolerance {tolerance_used:.1e}"
        ),
        final_gradient_norm: best.grad_norm,
        region_label: format!("region {}", candidate.source_region_id),
        source_region_id: candidate.source_region_id,
        elapsed_time: start.elapsed(),
    };
    Ok(UltraPrecisionResult {
        base,
        stage_history: history,
        stages_completed,
        final_method,
        target_gap: target_value.map(|t| (best.value - t).abs()),
    })
}

/// `ln f` view of an objective, with `floor` standing in for `ln f` when
/// `f <= 0`.
pub struct LogReparametrized<'a, F: Objective + ?Sized> {
    pub inner: &'a F,
    pub floor: f64,
}

impl<'a, F: Objective + ?Sized> Objective for LogReparametrized<'a, F> {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn value(&self, x: &Point) -> OptResult<Cost> {
        let v = self.inner.value(x)?;
        if v > 0.0 { Ok(v.ln().max(self.floor)) } else { Ok(self.floor) }
    }

    fn grad(&self, x: &Point) -> OptResult<Grad> {
        let v = self.inner.value(x)?;
        if v.is_nan() || v <= 0.0 || v.ln() < self.floor {
            return Ok(Grad::zeros(self.dim()));
        }
        let g = objective_gradient(self.inner, x)?;
        let scaled = g / v;
        if let Some((index, value)) = scaled.iter().enumerate().find(|(_, g)| !g.is_finite()) {
            return Err(OptError::InvalidGradient {
                index,
                value: *value,
                reason: "Log-scaled gradient is not finite.",
            });
        }
        Ok(scaled)
    }
}

// ---- Helper methods ----

/// Re-measure the gradient at a point accepted by a non-gradient stage.
fn refresh_gradient<F: Objective + ?Sized>(objective: &F, best: &mut LocalRun, tolerance: f64) {
    best.grad_norm = objective_gradient(objective, &best.point)
        .map(|g| g.l2_norm())
        .unwrap_or(f64::INFINITY);
    best.reason = if best.grad_norm <= tolerance {
        ConvergenceReason::GradientToleranceMet
    } else if best.reason.is_success() {
        best.reason
    } else {
        ConvergenceReason::Failed
    };
}
