//! sweep::orchestrator — multi-tolerance sweep with per-level retries.
//!
//! Purpose
//! -------
//! Run the single-level pipeline for every tolerance of a strictly
//! decreasing sequence and collect one [`ToleranceLevel`] per entry.
//!
//! Key behaviors
//! -------------
//! - All preconditions (sequence shape, retry budget, dimensions, sweep
//!   settings) are checked before the objective is evaluated even once.
//! - Each level gets a fresh [`LevelConfig`]; nothing is shared mutably
//!   between levels.
//! - Transient failures are retried with unchanged inputs up to
//!   `max_retries` attempts. A level that exhausts its attempts is recorded
//!   as `RetryExhausted` and the sweep moves on, so the result always covers
//!   the whole sequence.
use crate::{
    candidates::solver::{CriticalPointSolver, NewtonCriticalSolver},
    errors::{PipelineError, PipelineResult},
    optimization::local_optimizer::traits::Objective,
    surrogate::builder::{SurrogateBuilder, TensorProductBuilder},
    sweep::{
        config::{DomainConfig, LevelConfig, SweepConfig},
        pipeline::run_level,
        summary::{LevelStatus, SweepResult, ToleranceLevel},
    },
};
use log::{info, warn};
use std::time::Instant;

/// Tolerance sweep driver with pluggable surrogate builder and critical
/// point solver.
#[derive(Debug, Clone)]
pub struct ToleranceSweep<B = TensorProductBuilder, S = NewtonCriticalSolver> {
    config: SweepConfig,
    builder: B,
    solver: S,
}

impl ToleranceSweep<TensorProductBuilder, NewtonCriticalSolver> {
    /// Sweep with the default collaborators. The builder inherits the
    /// surrogate oversampling from `config`.
    ///
    /// # Errors
    /// See [`SweepConfig::validate`].
    pub fn new(config: SweepConfig) -> PipelineResult<Self> {
        config.validate()?;
        let builder = TensorProductBuilder::new(config.surrogate.oversampling).map_err(|_| {
            PipelineError::InvalidConfig {
                field: "oversampling",
                value: config.surrogate.oversampling,
                reason: "Oversampling must be finite and at least 1.",
            }
        })?;
        Ok(Self { config, builder, solver: NewtonCriticalSolver::default() })
    }
}

impl<B: SurrogateBuilder, S: CriticalPointSolver> ToleranceSweep<B, S> {
    /// # Errors
    /// See [`SweepConfig::validate`].
    pub fn with_collaborators(config: SweepConfig, builder: B, solver: S) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self { config, builder, solver })
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// run_sweep — run every level of `tolerance_sequence` on `domain`.
    ///
    /// # Errors
    /// Only precondition violations are errors; level failures are recorded
    /// in the returned [`SweepResult`].
    /// - [`PipelineError::InvalidSequence`] unless the sequence has at least
    ///   two finite, positive, strictly decreasing entries.
    /// - [`PipelineError::InvalidConfig`] if `max_retries == 0`.
    /// - [`PipelineError::DimensionMismatch`] if the objective or a reference
    ///   point disagrees with the domain dimension.
    /// - Domain validation errors from [`DomainConfig::validate`].
    pub fn run_sweep<F: Objective>(
        &self, tolerance_sequence: &[f64], domain: &DomainConfig, objective: &F, max_retries: usize,
    ) -> PipelineResult<SweepResult> {
        validate_sequence(tolerance_sequence)?;
        if max_retries == 0 {
            return Err(PipelineError::InvalidConfig {
                field: "max_retries",
                value: 0.0,
                reason: "At least one attempt per level is required.",
            });
        }
        domain.validate()?;
        if objective.dim() != domain.dimension {
            return Err(PipelineError::DimensionMismatch {
                expected: domain.dimension,
                found: objective.dim(),
            });
        }
        if let Some(bad) = self.config.reference_points.iter().find(|p| p.len() != domain.dimension) {
            return Err(PipelineError::DimensionMismatch {
                expected: domain.dimension,
                found: bad.len(),
            });
        }
        self.config.validate()?;

        let start = Instant::now();
        info!(
            "sweep over {} tolerances in {} dimensions (2^{} regions per level)",
            tolerance_sequence.len(),
            domain.dimension,
            domain.dimension
        );
        let mut levels = Vec::with_capacity(tolerance_sequence.len());
        for &tolerance in tolerance_sequence {
            let level_config = LevelConfig::new(tolerance, &self.config)?;
            levels.push(self.run_with_retries(&level_config, domain, objective, max_retries));
        }
        let total_compute_time = start.elapsed();
        let succeeded = levels.iter().filter(|l| l.status == LevelStatus::Succeeded).count();
        info!(
            "sweep finished: {succeeded}/{} levels succeeded in {:.2?}",
            levels.len(),
            total_compute_time
        );
        Ok(SweepResult {
            tolerance_sequence: tolerance_sequence.to_vec(),
            levels,
            total_compute_time,
            domain: domain.clone(),
        })
    }

    fn run_with_retries<F: Objective>(
        &self, level_config: &LevelConfig, domain: &DomainConfig, objective: &F, max_retries: usize,
    ) -> ToleranceLevel {
        let tolerance = level_config.tolerance;
        let mut level = ToleranceLevel::pending(tolerance);
        level.status = LevelStatus::Running;
        info!("tolerance {tolerance:.1e}: level started");

        let mut last_error = None;
        while level.attempts < max_retries {
            level.attempts += 1;
            match run_level(objective, domain, level_config, &self.builder, &self.solver) {
                Ok(summary) => {
                    info!(
                        "tolerance {tolerance:.1e}: {} candidates, {} unique points after {} attempt(s) in {:.2?}",
                        summary.refinements.len(),
                        summary.unique_points.len(),
                        level.attempts,
                        summary.compute_time
                    );
                    level.status = LevelStatus::Succeeded;
                    level.summary = Some(summary);
                    return level;
                }
                Err(e) => {
                    warn!(
                        "tolerance {tolerance:.1e}: attempt {}/{max_retries} failed: {e}",
                        level.attempts
                    );
                    let retry = e.is_transient();
                    last_error = Some(e);
                    if !retry {
                        break;
                    }
                }
            }
        }

        warn!("tolerance {tolerance:.1e}: giving up after {} attempt(s)", level.attempts);
        level.status = LevelStatus::RetryExhausted;
        level.last_error = last_error.map(|e| PipelineError::RetryExhausted {
            tolerance,
            attempts: level.attempts,
            last_error: Box::new(e),
        });
        level
    }
}

/// validate_sequence — at least two finite, positive, strictly decreasing
/// tolerances.
///
/// # Errors
/// [`PipelineError::InvalidSequence`] naming the first violation.
pub fn validate_sequence(tolerance_sequence: &[f64]) -> PipelineResult<()> {
    if tolerance_sequence.len() < 2 {
        return Err(PipelineError::InvalidSequence {
            reason: format!(
                "at least two tolerances are required, got {}",
                tolerance_sequence.len()
            ),
        });
    }
    if let Some((i, t)) =
        tolerance_sequence.iter().enumerate().find(|(_, t)| !t.is_finite() || **t <= 0.0)
    {
        return Err(PipelineError::InvalidSequence {
            reason: format!("tolerance {i} must be finite and positive, got {t}"),
        });
    }
    if let Some(i) = tolerance_sequence.windows(2).position(|w| w[1] >= w[0]) {
        return Err(PipelineError::InvalidSequence {
            reason: format!(
                "tolerances must be strictly decreasing, got {} then {}",
                tolerance_sequence[i],
                tolerance_sequence[i + 1]
            ),
        });
    }
    Ok(())
}
