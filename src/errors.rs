//! Unified error handling for the critical-point pipeline.
//!
//! `PipelineError` separates caller mistakes (invalid dimension, sequence or
//! configuration) from external failures raised while evaluating the
//! objective (`Transient`), and records retry exhaustion for a tolerance
//! level. Degraded surrogate fits and failed refinements are *not* errors;
//! they travel as data in the corresponding result records.
use crate::optimization::errors::OptError;
use serde::Serialize;

/// Crate-wide result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Pipeline stage in which a transient failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    SurrogateFit,
    CandidateExtraction,
    Refinement,
    UltraRefinement,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::SurrogateFit => "surrogate fit",
            Stage::CandidateExtraction => "candidate extraction",
            Stage::Refinement => "refinement",
            Stage::UltraRefinement => "ultra-precision refinement",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PipelineError {
    // ---- Caller errors ----
    /// Dimension must be at least 1 and small enough to enumerate all
    /// orthants.
    InvalidDimension {
        dimension: usize,
        reason: &'static str,
    },

    /// A tolerance sequence or an index-aligned collection is malformed.
    InvalidSequence {
        reason: String,
    },

    /// A configuration value is out of range.
    InvalidConfig {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// Objective dimension does not match the domain dimension.
    DimensionMismatch {
        expected: usize,
        found: usize,
    },

    // ---- External failures ----
    /// The objective (or a collaborator driving it) failed; retrying the
    /// level may succeed.
    Transient {
        stage: Stage,
        source: OptError,
    },

    /// Every attempt at a tolerance level failed.
    RetryExhausted {
        tolerance: f64,
        attempts: usize,
        last_error: Box<PipelineError>,
    },
}

impl PipelineError {
    /// True for failures worth retrying with unchanged inputs.
    pub fn is_transient(&self) -> bool {
        matches!(self, PipelineError::Transient { .. })
    }
}

/// Wrap an optimizer-level error raised in `stage` as a transient failure.
pub fn transient(stage: Stage, source: OptError) -> PipelineError {
    PipelineError::Transient { stage, source }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Transient { source, .. } => Some(source),
            PipelineError::RetryExhausted { last_error, .. } => Some(last_error.as_ref()),
            _ => None,
        }
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Caller errors ----
            PipelineError::InvalidDimension { dimension, reason } => {
                write!(f, "Invalid dimension {dimension}: {reason}")
            }
            PipelineError::InvalidSequence { reason } => {
                write!(f, "Invalid sequence: {reason}")
            }
            PipelineError::InvalidConfig { field, value, reason } => {
                write!(f, "Invalid configuration {field} = {value}: {reason}")
            }
            PipelineError::DimensionMismatch { expected, found } => {
                write!(f, "Dimension mismatch: expected {expected}, found {found}")
            }

            // ---- External failures ----
            PipelineError::Transient { stage, source } => {
                write!(f, "Transient failure during {stage}: {source}")
            }
            PipelineError::RetryExhausted { tolerance, attempts, last_error } => {
                write!(
                    f,
                    "Tolerance level {tolerance:e} failed after {attempts} attempts; last error: {last_error}"
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Only `Transient` is retryable, and its `source` chain exposes the
    // optimizer error.
    fn transient_is_retryable_and_chains_source() {
        // Arrange
        let err = transient(Stage::Refinement, OptError::NonFiniteCost { value: f64::NAN });
        let config = PipelineError::InvalidConfig {
            field: "max_retries",
            value: 0.0,
            reason: "must be at least 1",
        };

        // Act / Assert
        assert!(err.is_transient());
        assert!(!config.is_transient());
        let source = std::error::Error::source(&err).expect("source present");
        assert!(source.to_string().contains("Non-finite cost"));
        assert!(err.to_string().contains("refinement"));
    }

    #[test]
    // Purpose
    // -------
    // `RetryExhausted` reports the tolerance, the attempts and the wrapped
    // last error.
    fn retry_exhausted_display_mentions_last_error() {
        let inner = transient(
            Stage::SurrogateFit,
            OptError::ObjectiveFailed { reason: "model offline".to_string() },
        );
        let err = PipelineError::RetryExhausted {
            tolerance: 0.01,
            attempts: 3,
            last_error: Box::new(inner),
        };
        let text = err.to_string();
        assert!(text.contains("3 attempts"));
        assert!(text.contains("model offline"));
    }
}
