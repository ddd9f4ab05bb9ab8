#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Nest detection.
//!
//! Turns the raw sightings of one area into a ranked list of nests: one
//! winning species per spawn point, filtered by the area's thresholds and
//! by an area-wide minimum number of qualifying spawn points. The analyzer
//! is independent of where sightings come from; any [`SightingSource`] can
//! feed it.

pub mod analyzer;
pub mod policy;
pub mod progress;
pub mod source;

pub use analyzer::{AnalysisStats, AreaNests, NestAnalyzer, analyze_areas};
pub use policy::{AnalysisPolicy, RankBy};
pub use source::{SightingQuery, SightingSource};

use thiserror::Error;

/// Errors that can occur during analysis.
#[derive(Debug, Error)]
pub enum AnalyzeError<E: std::error::Error + 'static> {
    /// The sighting source failed for an area.
    #[error("Sighting source failed for area '{area}': {source}")]
    Source {
        /// Area being analyzed.
        area: String,
        /// Underlying source error.
        #[source]
        source: E,
    },
}
