//! refinement — local refinement of candidates on the true objective.
//!
//! - [`config`]: [`RefinementConfig`] and [`UltraPrecisionConfig`].
//! - [`engine`]: [`refine`], one adaptive-tolerance L-BFGS refinement.
//! - [`ultra`]: [`refine_ultra`], the staged ultra-precision engine.
//! - [`result`]: the records both engines produce.
pub mod config;
pub mod engine;
pub mod result;
pub mod ultra;

pub use self::config::{RefinementConfig, UltraPrecisionConfig};
pub use self::engine::{refine, select_tolerance};
pub use self::result::{
    ConvergenceReason, FinalMethod, RefinementResult, StageRecord, UltraPrecisionResult,
};
pub use self::ultra::{LogReparametrized, refine_ultra};
