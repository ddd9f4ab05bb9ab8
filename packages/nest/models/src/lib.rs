#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Sighting, spawn point, and nest candidate types.
//!
//! These types are shared by the analyzer, the sighting store, and the
//! output stage. Raw rows from a sighting source arrive as
//! [`RawSighting`] and are validated into [`SightingRecord`] before any
//! aggregation happens.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A species identifier as used by the reference feeds (e.g. `"Pikachu"`
/// or `"25"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeciesId(String);

impl SpeciesId {
    /// Creates a species identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpeciesId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of a spawn point as stored by the scanner database.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpawnPointId(String);

impl SpawnPointId {
    /// Creates a spawn point identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpawnPointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpawnPointId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl Coordinate {
    /// Creates a coordinate from latitude and longitude.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Returns `true` if both components are finite and within the valid
    /// latitude/longitude ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// An axis-aligned bounding box used to restrict sighting queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Southern edge.
    pub min_lat: f64,
    /// Western edge.
    pub min_lon: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Eastern edge.
    pub max_lon: f64,
}

impl Bounds {
    /// Returns `true` if the coordinate lies inside or on the edge of the
    /// box.
    #[must_use]
    pub fn contains(&self, coordinate: Coordinate) -> bool {
        (self.min_lat..=self.max_lat).contains(&coordinate.lat)
            && (self.min_lon..=self.max_lon).contains(&coordinate.lon)
    }
}

/// A sighting row exactly as returned by a sighting source.
///
/// Location and timestamp are optional because the scanner database
/// occasionally stores incomplete rows. Use [`SightingRecord::try_from`]
/// to validate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSighting {
    /// Species identifier.
    pub species: String,
    /// Spawn point identifier.
    pub spawnpoint_id: String,
    /// Latitude, if recorded.
    pub lat: Option<f64>,
    /// Longitude, if recorded.
    pub lon: Option<f64>,
    /// When the sighting was recorded.
    pub seen_at: Option<DateTime<Utc>>,
    /// Whether the spawn's despawn time was verified by a full scan.
    pub confirmed: bool,
}

/// Reasons a [`RawSighting`] is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SightingError {
    /// The species identifier is empty.
    #[error("sighting has no species")]
    MissingSpecies,

    /// The spawn point identifier is empty.
    #[error("sighting has no spawn point")]
    MissingSpawnPoint,

    /// Latitude or longitude is absent.
    #[error("sighting at spawn point {spawnpoint_id} has no coordinate")]
    MissingCoordinate {
        /// Spawn point of the rejected row.
        spawnpoint_id: String,
    },

    /// Latitude or longitude is out of range or not finite.
    #[error("sighting at spawn point {spawnpoint_id} has an invalid coordinate")]
    InvalidCoordinate {
        /// Spawn point of the rejected row.
        spawnpoint_id: String,
    },

    /// The timestamp is absent.
    #[error("sighting at spawn point {spawnpoint_id} has no timestamp")]
    MissingTimestamp {
        /// Spawn point of the rejected row.
        spawnpoint_id: String,
    },
}

/// A validated, immutable sighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SightingRecord {
    /// Species seen.
    pub species: SpeciesId,
    /// Spawn point the species appeared at.
    pub spawnpoint_id: SpawnPointId,
    /// Location of the spawn point.
    pub coordinate: Coordinate,
    /// When the sighting was recorded.
    pub seen_at: DateTime<Utc>,
    /// Whether the spawn's despawn time was verified by a full scan.
    pub confirmed: bool,
}

impl TryFrom<RawSighting> for SightingRecord {
    type Error = SightingError;

    fn try_from(raw: RawSighting) -> Result<Self, Self::Error> {
        if raw.species.trim().is_empty() {
            return Err(SightingError::MissingSpecies);
        }
        if raw.spawnpoint_id.trim().is_empty() {
            return Err(SightingError::MissingSpawnPoint);
        }

        let (Some(lat), Some(lon)) = (raw.lat, raw.lon) else {
            return Err(SightingError::MissingCoordinate {
                spawnpoint_id: raw.spawnpoint_id,
            });
        };

        let coordinate = Coordinate::new(lat, lon);
        if !coordinate.is_valid() {
            return Err(SightingError::InvalidCoordinate {
                spawnpoint_id: raw.spawnpoint_id,
            });
        }

        let Some(seen_at) = raw.seen_at else {
            return Err(SightingError::MissingTimestamp {
                spawnpoint_id: raw.spawnpoint_id,
            });
        };

        Ok(Self {
            species: SpeciesId::new(raw.species),
            spawnpoint_id: SpawnPointId::new(raw.spawnpoint_id),
            coordinate,
            seen_at,
            confirmed: raw.confirmed,
        })
    }
}

/// A location at which sightings recur.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    /// Spawn point identifier.
    pub id: SpawnPointId,
    /// Location of the spawn point.
    pub coordinate: Coordinate,
}

/// A qualifying nest: the winning species at one spawn point of an area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestCandidate {
    /// Name of the area the spawn point belongs to.
    pub area: String,
    /// The spawn point hosting the nest.
    pub spawnpoint: SpawnPoint,
    /// The nesting species.
    pub species: SpeciesId,
    /// Number of sightings of the species at the spawn point.
    pub count: u64,
    /// Sightings per scanned hour.
    pub average: f64,
    /// Share of all eligible sightings at the spawn point that belong to
    /// this species (1.0 when no other species competes).
    pub ratio: f64,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn raw() -> RawSighting {
        RawSighting {
            species: "Eevee".to_string(),
            spawnpoint_id: "sp-1".to_string(),
            lat: Some(52.52),
            lon: Some(13.405),
            seen_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
            confirmed: true,
        }
    }

    #[test]
    fn validates_complete_row() {
        let record = SightingRecord::try_from(raw()).unwrap();
        assert_eq!(record.species.as_str(), "Eevee");
        assert_eq!(record.spawnpoint_id.as_str(), "sp-1");
        assert!(record.confirmed);
    }

    #[test]
    fn rejects_missing_coordinate() {
        let mut row = raw();
        row.lon = None;
        assert_eq!(
            SightingRecord::try_from(row),
            Err(SightingError::MissingCoordinate {
                spawnpoint_id: "sp-1".to_string()
            })
        );
    }

    #[test]
    fn rejects_out_of_range_coordinate() {
        let mut row = raw();
        row.lat = Some(91.0);
        assert!(matches!(
            SightingRecord::try_from(row),
            Err(SightingError::InvalidCoordinate { .. })
        ));

        let mut row = raw();
        row.lon = Some(f64::NAN);
        assert!(matches!(
            SightingRecord::try_from(row),
            Err(SightingError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn rejects_missing_timestamp() {
        let mut row = raw();
        row.seen_at = None;
        assert!(matches!(
            SightingRecord::try_from(row),
            Err(SightingError::MissingTimestamp { .. })
        ));
    }

    #[test]
    fn rejects_blank_identifiers() {
        let mut row = raw();
        row.species = "  ".to_string();
        assert_eq!(
            SightingRecord::try_from(row),
            Err(SightingError::MissingSpecies)
        );

        let mut row = raw();
        row.spawnpoint_id = String::new();
        assert_eq!(
            SightingRecord::try_from(row),
            Err(SightingError::MissingSpawnPoint)
        );
    }

    #[test]
    fn bounds_contain_edges() {
        let bounds = Bounds {
            min_lat: 0.0,
            min_lon: 0.0,
            max_lat: 1.0,
            max_lon: 1.0,
        };
        assert!(bounds.contains(Coordinate::new(1.0, 0.0)));
        assert!(!bounds.contains(Coordinate::new(1.1, 0.5)));
    }

    #[test]
    fn species_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&SpeciesId::new("Pikachu")).unwrap();
        assert_eq!(json, "\"Pikachu\"");
    }
}
