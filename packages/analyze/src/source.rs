//! Sighting source abstraction.

use std::convert::Infallible;

use chrono::{DateTime, Utc};
use nestwatch_nest_models::{Bounds, Coordinate, RawSighting};

/// Restricts which sightings a source returns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SightingQuery {
    /// Bounding box of the area being analyzed.
    pub bounds: Bounds,
    /// When set, only (spawn point, species) combinations seen at or after
    /// this instant are of interest. Sources may use it to narrow the
    /// query; the analyzer applies it again per combination.
    pub since: Option<DateTime<Utc>>,
}

/// Anything that can produce raw sightings for an area.
pub trait SightingSource {
    /// Error returned when the underlying store fails.
    type Error: std::error::Error + 'static;

    /// Returns the sightings inside `query.bounds`.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the store cannot be read.
    fn sightings(&self, query: &SightingQuery) -> Result<Vec<RawSighting>, Self::Error>;
}

/// An in-memory source. Rows without a coordinate are passed through so
/// the analyzer can report them.
impl SightingSource for [RawSighting] {
    type Error = Infallible;

    fn sightings(&self, query: &SightingQuery) -> Result<Vec<RawSighting>, Self::Error> {
        Ok(self
            .iter()
            .filter(|row| match (row.lat, row.lon) {
                (Some(lat), Some(lon)) => query.bounds.contains(Coordinate::new(lat, lon)),
                _ => true,
            })
            .cloned()
            .collect())
    }
}

impl SightingSource for Vec<RawSighting> {
    type Error = Infallible;

    fn sightings(&self, query: &SightingQuery) -> Result<Vec<RawSighting>, Self::Error> {
        self.as_slice().sightings(query)
    }
}
