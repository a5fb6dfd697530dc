//! refinement::config — validated settings for the refinement engines.
//!
//! - [`RefinementConfig`]: tolerance selection and L-BFGS stopping rules for
//!   one local refinement.
//! - [`UltraPrecisionConfig`]: stage schedule for the ultra-precision engine
//!   layered on top of a [`RefinementConfig`].
//!
//! Both follow the crate's configuration pattern: public fields, a `new`
//! constructor that validates, a `validate` method for configurations edited
//! in place, and a `Default` with the documented values.
use crate::{
    errors::{PipelineError, PipelineResult},
    optimization::{
        errors::OptResult,
        local_optimizer::{
            derivative_free::BoundedOptions,
            traits::{LineSearcher, MinimizeOptions, Tolerances},
        },
    },
};
use serde::{Deserialize, Serialize};

/// Settings for one gradient-based refinement.
///
/// Defaults: standard tolerance 1e-8, high-precision tolerance 1e-12,
/// precision threshold 1e-6, 300 iterations, absolute cost-change
/// tolerance 1e-15, parameter-change tolerance 1e-12, More–Thuente line
/// search, default L-BFGS memory, gradient slack 10, unbounded
/// displacement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefinementConfig {
    pub standard_tolerance: f64,
    pub high_precision_tolerance: f64,
    pub precision_threshold: f64,
    pub max_iterations: usize,
    pub function_value_abs_tolerance: f64,
    pub parameter_change_tolerance: f64,
    pub line_searcher: LineSearcher,
    pub lbfgs_mem: Option<usize>,
    /// A converged result satisfies `final_gradient_norm <= tolerance_used *
    /// gradient_slack`.
    pub gradient_slack: f64,
    /// Runs that move farther than this from their start point are
    /// classified as failed and keep the start point.
    pub max_displacement: Option<f64>,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            standard_tolerance: 1e-8,
            high_precision_tolerance: 1e-12,
            precision_threshold: 1e-6,
            max_iterations: 300,
            function_value_abs_tolerance: 1e-15,
            parameter_change_tolerance: 1e-12,
            line_searcher: LineSearcher::MoreThuente,
            lbfgs_mem: None,
            gradient_slack: 10.0,
            max_displacement: None,
        }
    }
}

impl RefinementConfig {
    /// Construct a validated configuration with the default line search,
    /// memory and slack.
    ///
    /// # Errors
    /// [`PipelineError::InvalidConfig`] when a numeric field is not finite
    /// and positive, `max_iterations == 0`, or
    /// `high_precision_tolerance >= standard_tolerance`.
    pub fn new(
        standard_tolerance: f64, high_precision_tolerance: f64, precision_threshold: f64,
        max_iterations: usize, function_value_abs_tolerance: f64,
        parameter_change_tolerance: f64,
    ) -> PipelineResult<Self> {
        let config = Self {
            standard_tolerance,
            high_precision_tolerance,
            precision_threshold,
            max_iterations,
            function_value_abs_tolerance,
            parameter_change_tolerance,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        positive("standard_tolerance", self.standard_tolerance)?;
        positive("high_precision_tolerance", self.high_precision_tolerance)?;
        positive("precision_threshold", self.precision_threshold)?;
        positive("function_value_abs_tolerance", self.function_value_abs_tolerance)?;
        positive("parameter_change_tolerance", self.parameter_change_tolerance)?;
        if self.high_precision_tolerance >= self.standard_tolerance {
            return Err(PipelineError::InvalidConfig {
                field: "high_precision_tolerance",
                value: self.high_precision_tolerance,
                reason: "High-precision tolerance must be below the standard tolerance.",
            });
        }
        if self.max_iterations == 0 {
            return Err(PipelineError::InvalidConfig {
                field: "max_iterations",
                value: 0.0,
                reason: "At least one iteration is required.",
            });
        }
        if !self.gradient_slack.is_finite() || self.gradient_slack < 1.0 {
            return Err(PipelineError::InvalidConfig {
                field: "gradient_slack",
                value: self.gradient_slack,
                reason: "Gradient slack must be finite and at least 1.",
            });
        }
        if let Some(limit) = self.max_displacement {
            positive("max_displacement", limit)?;
        }
        if self.lbfgs_mem == Some(0) {
            return Err(PipelineError::InvalidConfig {
                field: "lbfgs_mem",
                value: 0.0,
                reason: "L-BFGS memory must be at least 1.",
            });
        }
        Ok(())
    }

    /// Copy of `self` with the displacement limit set to `limit`.
    pub fn with_max_displacement(mut self, limit: f64) -> Self {
        self.max_displacement = Some(limit);
        self
    }

    /// L-BFGS options for a run at gradient tolerance `tolerance`.
    pub fn minimize_options(&self, tolerance: f64) -> OptResult<MinimizeOptions> {
        let tols = Tolerances::new(
            Some(tolerance),
            Some(self.function_value_abs_tolerance),
            Some(self.parameter_change_tolerance),
            Some(self.max_iterations),
        )?;
        MinimizeOptions::new(tols, self.line_searcher, self.lbfgs_mem)
    }
}

/// Stage schedule for the ultra-precision engine.
///
/// Defaults: stage factors `[0.1, 0.01, 0.001]`, at most 5 stages, log
/// stage enabled below 1e-6 with floor -745, Nelder–Mead polish enabled with
/// radius 1e-3, 200 iterations and simplex tolerance 1e-15, target value
/// tolerance 1e-12.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UltraPrecisionConfig {
    pub refinement: RefinementConfig,
    pub stage_factors: Vec<f64>,
    pub max_precision_stages: usize,
    pub enable_log_reparametrization: bool,
    pub log_value_threshold: f64,
    /// Value substituted for `ln f` when `f <= 0`.
    pub log_floor: f64,
    pub enable_derivative_free_polish: bool,
    pub polish_radius: f64,
    pub polish_max_iterations: u64,
    pub polish_sd_tolerance: f64,
    pub target_value_tolerance: f64,
}

impl Default for UltraPrecisionConfig {
    fn default() -> Self {
        Self {
            refinement: RefinementConfig::default(),
            stage_factors: vec![0.1, 0.01, 0.001],
            max_precision_stages: 5,
            enable_log_reparametrization: true,
            log_value_threshold: 1e-6,
            log_floor: -745.0,
            enable_derivative_free_polish: true,
            polish_radius: 1e-3,
            polish_max_iterations: 200,
            polish_sd_tolerance: 1e-15,
            target_value_tolerance: 1e-12,
        }
    }
}

impl UltraPrecisionConfig {
    /// Construct a validated schedule with default log and polish settings.
    ///
    /// # Errors
    /// See [`UltraPrecisionConfig::validate`].
    pub fn new(
        refinement: RefinementConfig, stage_factors: Vec<f64>, max_precision_stages: usize,
    ) -> PipelineResult<Self> {
        let config = Self { refinement, stage_factors, max_precision_stages, ..Self::default() };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// [`PipelineError::InvalidConfig`] for an invalid refinement config, a
    /// zero stage cap, non-finite radii or tolerances, or a finite
    /// `log_floor` that is not negative; [`PipelineError::InvalidSequence`]
    /// when `stage_factors` is empty, not positive, or not strictly
    /// decreasing.
    pub fn validate(&self) -> PipelineResult<()> {
        self.refinement.validate()?;
        if self.stage_factors.is_empty() {
            return Err(PipelineError::InvalidSequence {
                reason: "stage_factors must not be empty".to_string(),
            });
        }
        if self.stage_factors.iter().any(|f| !f.is_finite() || *f <= 0.0) {
            return Err(PipelineError::InvalidSequence {
                reason: "stage_factors must be finite and positive".to_string(),
            });
        }
        if self.stage_factors.windows(2).any(|w| w[1] >= w[0]) {
            return Err(PipelineError::InvalidSequence {
                reason: "stage_factors must be strictly decreasing".to_string(),
            });
        }
        if self.max_precision_stages == 0 {
            return Err(PipelineError::InvalidConfig {
                field: "max_precision_stages",
                value: 0.0,
                reason: "At least one stage is required.",
            });
        }
        positive("log_value_threshold", self.log_value_threshold)?;
        if !self.log_floor.is_finite() || self.log_floor >= 0.0 {
            return Err(PipelineError::InvalidConfig {
                field: "log_floor",
                value: self.log_floor,
                reason: "Log floor must be finite and negative.",
            });
        }
        positive("polish_radius", self.polish_radius)?;
        positive("polish_sd_tolerance", self.polish_sd_tolerance)?;
        positive("target_value_tolerance", self.target_value_tolerance)?;
        if self.polish_max_iterations == 0 {
            return Err(PipelineError::InvalidConfig {
                field: "polish_max_iterations",
                value: 0.0,
                reason: "At least one polish iteration is required.",
            });
        }
        Ok(())
    }

    /// Nelder–Mead options for the polish stage.
    pub fn bounded_options(&self) -> OptResult<BoundedOptions> {
        BoundedOptions::new(
            self.polish_max_iterations,
            self.polish_sd_tolerance,
            BoundedOptions::default().penalty_weight,
        )
    }
}

// ---- Helper methods ----

fn positive(field: &'static str, value: f64) -> PipelineResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(PipelineError::InvalidConfig {
            field,
            value,
            reason: "Value must be finite and positive.",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // `RefinementConfig::new` enforces the tolerance ordering and positivity.
    fn refinement_config_validation() {
        assert!(RefinementConfig::new(1e-8, 1e-12, 1e-6, 300, 1e-15, 1e-12).is_ok());
        assert!(matches!(
            RefinementConfig::new(1e-8, 1e-8, 1e-6, 300, 1e-15, 1e-12),
            Err(PipelineError::InvalidConfig { field: "high_precision_tolerance", .. })
        ));
        assert!(matches!(
            RefinementConfig::new(1e-8, 1e-12, 1e-6, 0, 1e-15, 1e-12),
            Err(PipelineError::InvalidConfig { field: "max_iterations", .. })
        ));
        assert!(matches!(
            RefinementConfig::new(1e-8, 1e-12, -1.0, 300, 1e-15, 1e-12),
            Err(PipelineError::InvalidConfig { field: "precision_threshold", .. })
        ));
        assert!(matches!(
            RefinementConfig::default().with_max_displacement(0.0).validate(),
            Err(PipelineError::InvalidConfig { field: "max_displacement", .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Stage factors must be non-empty, positive and strictly decreasing.
    fn ultra_config_stage_factor_validation() {
        let r = RefinementConfig::default();
        assert!(UltraPrecisionConfig::new(r, vec![0.1, 0.01], 3).is_ok());
        assert!(matches!(
            UltraPrecisionConfig::new(r, vec![], 3),
            Err(PipelineError::InvalidSequence { .. })
        ));
        assert!(matches!(
            UltraPrecisionConfig::new(r, vec![0.1, 0.1], 3),
            Err(PipelineError::InvalidSequence { .. })
        ));
        assert!(matches!(
            UltraPrecisionConfig::new(r, vec![0.1], 0),
            Err(PipelineError::InvalidConfig { field: "max_precision_stages", .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // The derived L-BFGS options carry every configured stopping rule.
    fn minimize_options_carry_all_rules() {
        let opts = RefinementConfig::default().minimize_options(1e-9).expect("valid options");
        assert_eq!(opts.tols.tol_grad, Some(1e-9));
        assert_eq!(opts.tols.tol_cost, Some(1e-15));
        assert_eq!(opts.tols.tol_param, Some(1e-12));
        assert_eq!(opts.tols.max_iter, Some(300));
    }
}
