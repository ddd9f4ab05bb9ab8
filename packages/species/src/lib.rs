#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Nesting species and event feeds.
//!
//! Fetches the nesting species reference list and the currently running
//! event, then computes which species are eligible to nest: every nesting
//! species except those boosted by an event that has not ended yet.

pub mod feeds;
pub mod filter;
pub mod retry;

pub use feeds::{ActiveEvent, fetch_active_event, fetch_nesting_species};
pub use filter::{EligibleSpecies, SkippedEntry, SpeciesParseError, compute_eligible_species};

use thiserror::Error;

/// Public feed listing the currently active event.
pub const DEFAULT_EVENT_URL: &str =
    "https://raw.githubusercontent.com/ccev/pogoinfo/info/events/active.json";

/// Public feed listing every species known to nest.
pub const DEFAULT_SPECIES_URL: &str = "https://pogoapi.net/api/v1/nesting_pokemon.json";

/// Errors that can occur while fetching species data.
#[derive(Debug, Error)]
pub enum SpeciesError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The feed responded with an unexpected shape or status.
    #[error("Feed error: {message}")]
    Feed {
        /// Description of what went wrong.
        message: String,
    },
}
