//! sweep — domain decomposition, per-level pipeline and the tolerance sweep.
//!
//! - [`region`]: orthant decomposition into overlapping [`Region`]s.
//! - [`dedup`]: merging of near-duplicate refined points.
//! - [`config`]: [`DomainConfig`], [`SweepConfig`] and per-level
//!   [`LevelConfig`].
//! - [`pipeline`]: [`run_level`], one tolerance end to end.
//! - [`orchestrator`]: [`ToleranceSweep`], the retrying multi-level driver.
//! - [`summary`]: validated result records.
pub mod config;
pub mod dedup;
pub mod orchestrator;
pub mod pipeline;
pub mod region;
pub mod summary;

pub use self::config::{DomainConfig, LevelConfig, SweepConfig};
pub use self::dedup::{deduplicate, deduplicate_indices};
pub use self::orchestrator::{ToleranceSweep, validate_sequence};
pub use self::pipeline::run_level;
pub use self::region::{Region, decompose};
pub use self::summary::{
    LevelStatus, RegionSummary, SuccessRates, SweepResult, ToleranceLevel, ToleranceLevelSummary,
};
