#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Area boundaries and their resolved settings.
//!
//! Areas are read from a `GeoJSON` `FeatureCollection` where every feature
//! carries a `name` property and a `Polygon` or `MultiPolygon` geometry.
//! [`build_areas`] pairs each boundary with its effective
//! [`AreaSettings`] and rejects inconsistent configuration before any
//! analysis starts.

use std::collections::BTreeSet;
use std::path::Path;

use geo::{BoundingRect, Contains, MultiPolygon};
use geojson::GeoJson;
use nestwatch_area_models::{AreaSettings, SettingsConfig, SettingsError};
use nestwatch_nest_models::{Bounds, Coordinate};
use thiserror::Error;

/// Errors that can occur while loading areas.
#[derive(Debug, Error)]
pub enum AreaError {
    /// Reading the areas file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The areas file is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Settings are inconsistent with the configured areas.
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// An area feature is unusable.
    #[error("Invalid area: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },
}

/// A named boundary as read from the areas file.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaBoundary {
    /// Area name, unique across the file.
    pub name: String,
    /// The area polygon(s).
    pub polygon: MultiPolygon<f64>,
}

/// One geographic area with its effective settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Area {
    name: String,
    polygon: MultiPolygon<f64>,
    bounds: Bounds,
    settings: AreaSettings,
}

impl Area {
    /// Creates an area from a boundary and its resolved settings.
    #[must_use]
    pub fn new(boundary: AreaBoundary, settings: AreaSettings) -> Self {
        let bounds = compute_bounds(&boundary.polygon);
        Self {
            name: boundary.name,
            polygon: boundary.polygon,
            bounds,
            settings,
        }
    }

    /// Area name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Effective settings.
    #[must_use]
    pub const fn settings(&self) -> &AreaSettings {
        &self.settings
    }

    /// Bounding box of the boundary, used to narrow sighting queries.
    #[must_use]
    pub const fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Returns `true` if the coordinate lies strictly inside the boundary.
    #[must_use]
    pub fn contains(&self, coordinate: Coordinate) -> bool {
        if !self.bounds.contains(coordinate) {
            return false;
        }
        self.polygon
            .contains(&geo::Point::new(coordinate.lon, coordinate.lat))
    }
}

/// Reads area boundaries from a `GeoJSON` file.
///
/// # Errors
///
/// Returns [`AreaError`] if the file cannot be read or parsed.
pub fn load_boundaries(path: &Path) -> Result<Vec<AreaBoundary>, AreaError> {
    let text = std::fs::read_to_string(path)?;
    let boundaries = parse_boundaries(&text)?;
    log::info!(
        "Loaded {} area boundaries from {}",
        boundaries.len(),
        path.display()
    );
    Ok(boundaries)
}

/// Parses area boundaries from `GeoJSON` text, preserving feature order.
///
/// # Errors
///
/// Returns [`AreaError::Invalid`] if the document is not a
/// `FeatureCollection`, a feature lacks a non-empty `name`, or its geometry
/// is not a polygon.
pub fn parse_boundaries(text: &str) -> Result<Vec<AreaBoundary>, AreaError> {
    let geojson: GeoJson = text.parse()?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(AreaError::Invalid {
            message: "areas file must be a FeatureCollection".to_string(),
        });
    };

    let mut boundaries = Vec::with_capacity(collection.features.len());

    for (i, feature) in collection.features.into_iter().enumerate() {
        let name = feature
            .property("name")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AreaError::Invalid {
                message: format!("feature {i} has no name property"),
            })?
            .to_string();

        let polygon = feature
            .geometry
            .and_then(geometry_to_multipolygon)
            .ok_or_else(|| AreaError::Invalid {
                message: format!("area '{name}' has no polygon geometry"),
            })?;

        boundaries.push(AreaBoundary { name, polygon });
    }

    Ok(boundaries)
}

/// Pairs each boundary with its resolved settings.
///
/// Area order follows `boundaries`.
///
/// # Errors
///
/// Returns [`AreaError::Invalid`] for duplicate area names and
/// [`AreaError::Settings`] if an override names an unknown area or a
/// resolved value is unusable.
pub fn build_areas(
    boundaries: Vec<AreaBoundary>,
    settings: &SettingsConfig,
) -> Result<Vec<Area>, AreaError> {
    let mut names = BTreeSet::new();
    for boundary in &boundaries {
        if !names.insert(boundary.name.as_str()) {
            return Err(AreaError::Invalid {
                message: format!("duplicate area name '{}'", boundary.name),
            });
        }
    }

    settings.validate(&names)?;

    Ok(boundaries
        .into_iter()
        .map(|boundary| {
            let resolved = settings.resolve_for(&boundary.name);
            log::debug!("Area '{}' settings: {resolved:?}", boundary.name);
            Area::new(boundary, resolved)
        })
        .collect())
}

fn geometry_to_multipolygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geometry: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geometry {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

fn compute_bounds(mp: &MultiPolygon<f64>) -> Bounds {
    mp.bounding_rect().map_or(
        Bounds {
            min_lat: 0.0,
            min_lon: 0.0,
            max_lat: 0.0,
            max_lon: 0.0,
        },
        |rect| Bounds {
            min_lat: rect.min().y,
            min_lon: rect.min().x,
            max_lat: rect.max().y,
            max_lon: rect.max().x,
        },
    )
}
