#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aggregation of per-area nest results.
//!
//! [`aggregate`] merges every area's nests into one `GeoJSON`
//! `FeatureCollection` and renders a text summary for each area that has
//! a notification target. Writing the collection to disk is done by
//! [`features::write_collection`]; delivery lives in `nestwatch_notify`.

pub mod aggregate;
pub mod features;
pub mod names;
pub mod summary;

pub use aggregate::{Aggregate, aggregate};
pub use names::SpeciesNames;
pub use summary::{AreaSummary, SummaryTemplate};

/// Errors that can occur while producing output.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
