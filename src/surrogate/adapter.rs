//! surrogate::adapter — degree adaptation for a region surrogate.
//!
//! Purpose
//! -------
//! Raise the polynomial degree until the builder's approximation error meets
//! the requested tolerance or the degree ceiling is reached.
//!
//! Key behaviors
//! -------------
//! - Start at `min_degree`, increase by `degree_step` (clamped to the
//!   ceiling), stop on success or at the ceiling.
//! - Always return the last fit together with its error and the full
//!   `(degree, error)` history. Hitting the ceiling without meeting the
//!   tolerance sets `degraded` and logs a warning; it is not an error.
//! - Builder failures are external and surface as
//!   [`PipelineError::Transient`](crate::errors::PipelineError).
use crate::{
    errors::{PipelineError, PipelineResult, Stage, transient},
    optimization::local_optimizer::traits::Objective,
    surrogate::{
        basis::PolynomialBasis,
        builder::{DEFAULT_OVERSAMPLING, Surrogate, SurrogateBuilder},
    },
    sweep::region::Region,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Degree-adaptation settings.
///
/// Defaults: Chebyshev basis, degrees `2, 3, …, 12`, oversampling 1.5.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurrogateSettings {
    pub basis: PolynomialBasis,
    pub min_degree: usize,
    pub degree_step: usize,
    pub degree_ceiling: usize,
    pub oversampling: f64,
}

impl Default for SurrogateSettings {
    fn default() -> Self {
        Self {
            basis: PolynomialBasis::Chebyshev,
            min_degree: 2,
            degree_step: 1,
            degree_ceiling: 12,
            oversampling: DEFAULT_OVERSAMPLING,
        }
    }
}

impl SurrogateSettings {
    /// Construct validated settings.
    ///
    /// # Errors
    /// [`PipelineError::InvalidConfig`] if `degree_step == 0`,
    /// `min_degree > degree_ceiling`, or `oversampling` is not finite or is
    /// below 1.
    pub fn new(
        basis: PolynomialBasis, min_degree: usize, degree_step: usize, degree_ceiling: usize,
        oversampling: f64,
    ) -> PipelineResult<Self> {
        let settings = Self { basis, min_degree, degree_step, degree_ceiling, oversampling };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.degree_step == 0 {
            return Err(PipelineError::InvalidConfig {
                field: "degree_step",
                value: 0.0,
                reason: "Degree step must be at least 1.",
            });
        }
        if self.min_degree > self.degree_ceiling {
            return Err(PipelineError::InvalidConfig {
                field: "min_degree",
                value: self.min_degree as f64,
                reason: "Minimum degree must not exceed the degree ceiling.",
            });
        }
        if !self.oversampling.is_finite() || self.oversampling < 1.0 {
            return Err(PipelineError::InvalidConfig {
                field: "oversampling",
                value: self.oversampling,
                reason: "Oversampling must be finite and at least 1.",
            });
        }
        Ok(())
    }
}

/// Result of degree adaptation for one region.
///
/// Invariant: `approx_error <= requested tolerance` or `degree` equals the
/// ceiling, with `degraded` set exactly when the tolerance was missed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurrogateFit {
    pub region_id: usize,
    pub degree: usize,
    pub basis: PolynomialBasis,
    pub approx_error: f64,
    pub surrogate: Surrogate,
    pub degraded: bool,
    pub history: Vec<(usize, f64)>,
}

/// fit_surrogate — adapt the surrogate degree for `region`.
///
/// # Errors
/// - [`PipelineError::InvalidConfig`] for invalid settings or a non-finite or
///   non-positive `target_tolerance`.
/// - [`PipelineError::Transient`] when the builder fails (typically an
///   objective failure while sampling).
pub fn fit_surrogate<B, F>(
    builder: &B, objective: &F, region: &Region, target_tolerance: f64,
    settings: &SurrogateSettings,
) -> PipelineResult<SurrogateFit>
where
    B: SurrogateBuilder + ?Sized,
    F: Objective,
{
    settings.validate()?;
    if !target_tolerance.is_finite() || target_tolerance <= 0.0 {
        return Err(PipelineError::InvalidConfig {
            field: "target_tolerance",
            value: target_tolerance,
            reason: "Target tolerance must be finite and positive.",
        });
    }

    let mut degree = settings.min_degree;
    let mut history = Vec::new();
    loop {
        let (surrogate, approx_error) = builder
            .build(objective, &region.center, &region.half_widths, degree, settings.basis)
            .map_err(|e| transient(Stage::SurrogateFit, e))?;
        history.push((degree, approx_error));
        debug!("{region}: degree {degree} error {approx_error:.3e} (target {target_tolerance:.1e})");

        let met = approx_error <= target_tolerance;
        if met || degree >= settings.degree_ceiling {
            let degraded = !met;
            if degraded {
                warn!(
                    "{region}: degree ceiling {} reached with error {approx_error:.3e} > {target_tolerance:.1e}",
                    settings.degree_ceiling
                );
            }
            return Ok(SurrogateFit {
                region_id: region.id,
                degree,
                basis: settings.basis,
                approx_error,
                surrogate,
                degraded,
                history,
            });
        }
        degree = (degree + settings.degree_step).min(settings.degree_ceiling);
    }
}
