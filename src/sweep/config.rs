//! sweep::config — domain and sweep settings.
//!
//! - [`DomainConfig`]: the box `center ± half_width` being searched.
//! - [`SweepConfig`]: every setting shared by the levels of a sweep.
//! - [`LevelConfig`]: one level's tolerance together with its own copy of
//!   the sweep settings. Built fresh for every level and passed down
//!   explicitly, so no stage ever reads or mutates shared configuration.
use crate::{
    candidates::extractor::DEFAULT_BOUND_TOLERANCE,
    errors::{PipelineError, PipelineResult},
    optimization::local_optimizer::types::Point,
    refinement::config::{RefinementConfig, UltraPrecisionConfig},
    surrogate::adapter::SurrogateSettings,
};
use serde::{Deserialize, Serialize};

/// Search domain `center ± half_width` in `dimension` coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    pub center: Point,
    pub half_width: f64,
    pub dimension: usize,
}

impl DomainConfig {
    /// # Errors
    /// - [`PipelineError::InvalidDimension`] if `dimension == 0`.
    /// - [`PipelineError::DimensionMismatch`] if `center.len() != dimension`.
    /// - [`PipelineError::InvalidConfig`] for a non-finite center coordinate
    ///   or a non-finite, non-positive `half_width`.
    pub fn new(center: Point, half_width: f64, dimension: usize) -> PipelineResult<Self> {
        let domain = Self { center, half_width, dimension };
        domain.validate()?;
        Ok(domain)
    }

    /// Domain centered at the origin.
    pub fn centered(dimension: usize, half_width: f64) -> PipelineResult<Self> {
        Self::new(Point::zeros(dimension), half_width, dimension)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.dimension == 0 {
            return Err(PipelineError::InvalidDimension {
                dimension: 0,
                reason: "Dimension must be at least 1.",
            });
        }
        if self.center.len() != self.dimension {
            return Err(PipelineError::DimensionMismatch {
                expected: self.dimension,
                found: self.center.len(),
            });
        }
        if let Some(&bad) = self.center.iter().find(|c| !c.is_finite()) {
            return Err(PipelineError::InvalidConfig {
                field: "center",
                value: bad,
                reason: "Center coordinates must be finite.",
            });
        }
        if !self.half_width.is_finite() || self.half_width <= 0.0 {
            return Err(PipelineError::InvalidConfig {
                field: "half_width",
                value: self.half_width,
                reason: "Half-width must be finite and positive.",
            });
        }
        Ok(())
    }
}

/// Settings shared by every level of a sweep.
///
/// Defaults: default surrogate and refinement settings, no ultra-precision
/// stage, bound tolerance 1e-3, overlap 0.1, dedup tolerance 1e-4, success
/// radius 1e-2, no reference points, parallel regions.
///
/// - `reference_points`: known critical points. When empty, distances are
///   measured to the level's own deduplicated points.
/// - `target_value`: known optimum value handed to the ultra-precision
///   engine.
/// - `success_radius`: a reference counts as recovered when a point lies
///   within this distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub surrogate: SurrogateSettings,
    pub bound_tolerance: f64,
    pub refinement: RefinementConfig,
    pub ultra: Option<UltraPrecisionConfig>,
    pub target_value: Option<f64>,
    pub overlap_fraction: f64,
    pub dedup_tolerance: f64,
    pub success_radius: f64,
    pub reference_points: Vec<Point>,
    pub parallel: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            surrogate: SurrogateSettings::default(),
            bound_tolerance: DEFAULT_BOUND_TOLERANCE,
            refinement: RefinementConfig::default(),
            ultra: None,
            target_value: None,
            overlap_fraction: 0.1,
            dedup_tolerance: 1e-4,
            success_radius: 1e-2,
            reference_points: Vec::new(),
            parallel: true,
        }
    }
}

impl SweepConfig {
    /// Attach known critical points for distance reporting.
    pub fn with_reference_points(mut self, reference_points: Vec<Point>) -> Self {
        self.reference_points = reference_points;
        self
    }

    /// Enable the ultra-precision engine on deduplicated points.
    pub fn with_ultra(mut self, ultra: UltraPrecisionConfig) -> Self {
        self.ultra = Some(ultra);
        self
    }

    /// # Errors
    /// [`PipelineError::InvalidConfig`] or [`PipelineError::InvalidSequence`]
    /// from any nested configuration or an out-of-range field.
    pub fn validate(&self) -> PipelineResult<()> {
        self.surrogate.validate()?;
        self.refinement.validate()?;
        if let Some(ultra) = &self.ultra {
            ultra.validate()?;
        }
        if !self.bound_tolerance.is_finite() || self.bound_tolerance < 0.0 {
            return Err(PipelineError::InvalidConfig {
                field: "bound_tolerance",
                value: self.bound_tolerance,
                reason: "Bound tolerance must be finite and non-negative.",
            });
        }
        if !(0.0..1.0).contains(&self.overlap_fraction) {
            return Err(PipelineError::InvalidConfig {
                field: "overlap_fraction",
                value: self.overlap_fraction,
                reason: "Overlap fraction must lie in [0, 1).",
            });
        }
        for (field, value) in
            [("dedup_tolerance", self.dedup_tolerance), ("success_radius", self.success_radius)]
        {
            if !value.is_finite() || value <= 0.0 {
                return Err(PipelineError::InvalidConfig {
                    field,
                    value,
                    reason: "Value must be finite and positive.",
                });
            }
        }
        if let Some(target) = self.target_value.filter(|t| !t.is_finite()) {
            return Err(PipelineError::InvalidConfig {
                field: "target_value",
                value: target,
                reason: "Target value must be finite.",
            });
        }
        Ok(())
    }
}

/// One level's tolerance and its private copy of the sweep settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub tolerance: f64,
    pub settings: SweepConfig,
}

impl LevelConfig {
    /// # Errors
    /// [`PipelineError::InvalidSequence`] for a non-finite or non-positive
    /// tolerance; otherwise see [`SweepConfig::validate`].
    pub fn new(tolerance: f64, settings: &SweepConfig) -> PipelineResult<Self> {
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(PipelineError::InvalidSequence {
                reason: format!("tolerance must be finite and positive, got {tolerance}"),
            });
        }
        settings.validate()?;
        Ok(Self { tolerance, settings: settings.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // `DomainConfig::new` rejects each malformed input with the matching
    // variant.
    fn domain_config_validation() {
        assert!(DomainConfig::new(array![0.0, 0.0], 1.0, 2).is_ok());
        assert!(matches!(
            DomainConfig::new(Point::zeros(0), 1.0, 0),
            Err(PipelineError::InvalidDimension { dimension: 0, .. })
        ));
        assert!(matches!(
            DomainConfig::new(array![0.0], 1.0, 2),
            Err(PipelineError::DimensionMismatch { expected: 2, found: 1 })
        ));
        assert!(matches!(
            DomainConfig::centered(2, -1.0),
            Err(PipelineError::InvalidConfig { field: "half_width", .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Level configs carry an independent copy of the sweep settings.
    //
    // Given
    // -----
    // - A level built from a sweep config that is modified afterwards.
    //
    // Expect
    // ------
    // - The level keeps the original values.
    fn level_config_owns_its_settings() {
        let mut sweep = SweepConfig::default();
        let level = LevelConfig::new(0.1, &sweep).expect("valid level");
        sweep.dedup_tolerance = 0.5;

        assert_eq!(level.tolerance, 0.1);
        assert_eq!(level.settings.dedup_tolerance, 1e-4);
        assert!(matches!(
            LevelConfig::new(0.0, &sweep),
            Err(PipelineError::InvalidSequence { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Out-of-range sweep fields are rejected.
    fn sweep_config_validation() {
        let bad_overlap = SweepConfig { overlap_fraction: 1.0, ..SweepConfig::default() };
        let bad_radius = SweepConfig { success_radius: 0.0, ..SweepConfig::default() };
        assert!(matches!(
            bad_overlap.validate(),
            Err(PipelineError::InvalidConfig { field: "overlap_fraction", .. })
        ));
        assert!(matches!(
            bad_radius.validate(),
            Err(PipelineError::InvalidConfig { field: "success_radius", .. })
        ));
        assert!(SweepConfig::default().validate().is_ok());
    }
}
