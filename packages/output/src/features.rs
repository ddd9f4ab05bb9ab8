//! `GeoJSON` features for nests and the atomic artifact write.

use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use nestwatch_nest_models::NestCandidate;

use crate::OutputError;

/// Builds the point feature for one nest.
///
/// Properties: `area`, `spawnpoint`, `species`, `count`, `average`,
/// `ratio`.
#[must_use]
pub fn nest_feature(nest: &NestCandidate) -> Feature {
    let coordinate = nest.spawnpoint.coordinate;

    let mut properties = JsonObject::new();
    properties.insert("area".to_string(), JsonValue::from(nest.area.as_str()));
    properties.insert(
        "spawnpoint".to_string(),
        JsonValue::from(nest.spawnpoint.id.as_str()),
    );
    properties.insert("species".to_string(), JsonValue::from(nest.species.as_str()));
    properties.insert("count".to_string(), JsonValue::from(nest.count));
    properties.insert("average".to_string(), JsonValue::from(nest.average));
    properties.insert("ratio".to_string(), JsonValue::from(nest.ratio));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::Point(vec![
            coordinate.lon,
            coordinate.lat,
        ]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes the collection to `path`.
///
/// The file is written to a `.tmp` sibling first and renamed into place,
/// so readers never see a partial artifact and a failed write keeps the
/// previous one.
///
/// # Errors
///
/// Returns [`OutputError`] if the file cannot be written or serialized.
pub fn write_collection(path: &Path, collection: &FeatureCollection) -> Result<(), OutputError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = tmp_path(path);
    let file = std::fs::File::create(&tmp_path)?;
    let mut writer = BufWriter::new(file);

    if let Err(e) = serde_json::to_writer(&mut writer, collection) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    writer.flush()?;
    drop(writer);

    std::fs::rename(&tmp_path, path)?;

    log::info!(
        "Wrote {} nests to {}",
        collection.features.len(),
        path.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use nestwatch_nest_models::{Coordinate, SpawnPoint, SpawnPointId, SpeciesId};

    use super::*;

    fn nest() -> NestCandidate {
        NestCandidate {
            area: "Park".to_string(),
            spawnpoint: SpawnPoint {
                id: SpawnPointId::from("sp1"),
                coordinate: Coordinate::new(52.5, 13.4),
            },
            species: SpeciesId::from("Eevee"),
            count: 12,
            average: 0.5,
            ratio: 0.75,
        }
    }

    #[test]
    fn feature_is_lon_lat_point_with_properties() {
        let feature = nest_feature(&nest());

        let Some(geojson::Value::Point(position)) = feature.geometry.map(|g| g.value) else {
            panic!("expected point geometry");
        };
        assert_eq!(position, vec![13.4, 52.5]);

        let properties = feature.properties.unwrap();
        assert_eq!(properties["species"], "Eevee");
        assert_eq!(properties["spawnpoint"], "sp1");
        assert_eq!(properties["area"], "Park");
        assert_eq!(properties["count"], 12);
        assert_eq!(properties["ratio"], 0.75);
    }

    #[test]
    fn tmp_sibling_keeps_directory() {
        assert_eq!(
            tmp_path(Path::new("/srv/www/nests.geojson")),
            PathBuf::from("/srv/www/nests.geojson.tmp")
        );
    }

    #[test]
    fn write_replaces_existing_file() {
        let dir = std::env::temp_dir().join(format!("nestwatch-output-{}", std::process::id()));
        let path = dir.join("out").join("nests.geojson");

        let first = FeatureCollection {
            bbox: None,
            features: vec![nest_feature(&nest())],
            foreign_members: None,
        };
        write_collection(&path, &first).unwrap();

        let empty = FeatureCollection {
            bbox: None,
            features: vec![],
            foreign_members: None,
        };
        write_collection(&path, &empty).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: FeatureCollection = text.parse::<geojson::GeoJson>().unwrap().try_into().unwrap();
        assert!(parsed.features.is_empty());
        assert!(!tmp_path(&path).exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
