//! Merging per-area results.

use geojson::FeatureCollection;
use nestwatch_analyze::AreaNests;
use nestwatch_area::Area;

use crate::features::nest_feature;
use crate::{AreaSummary, SpeciesNames, SummaryTemplate};

/// Everything a run publishes.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    /// All nests of all areas, areas in configured order.
    pub collection: FeatureCollection,
    /// One summary per area with a notification target.
    pub summaries: Vec<AreaSummary>,
}

impl Aggregate {
    /// Total number of nests.
    #[must_use]
    pub fn nest_count(&self) -> usize {
        self.collection.features.len()
    }
}

/// Merges analyzed areas into one feature collection and the summaries
/// to deliver.
///
/// `results` must be in the same order as `areas`, as produced by
/// `nestwatch_analyze::analyze_areas`. An area without a result is
/// skipped with a warning.
#[must_use]
pub fn aggregate(
    areas: &[Area],
    results: &[AreaNests],
    template: &SummaryTemplate,
    names: &SpeciesNames,
) -> Aggregate {
    let mut features = Vec::new();
    let mut summaries = Vec::new();

    for area in areas {
        let Some(result) = results.iter().find(|r| r.area == area.name()) else {
            log::warn!("[{}] No analysis result, skipping", area.name());
            continue;
        };

        features.extend(result.nests.iter().map(nest_feature));

        let target = &area.settings().discord;
        if target.is_some() {
            summaries.push(template.render(area.name(), target.clone(), &result.nests, names));
        }
    }

    Aggregate {
        collection: FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        },
        summaries,
    }
}

#[cfg(test)]
mod tests {
    use nestwatch_analyze::AnalysisStats;
    use nestwatch_area::parse_boundaries;
    use nestwatch_area_models::{AreaSettings, NotificationTarget};
    use nestwatch_nest_models::{Coordinate, NestCandidate, SpawnPoint, SpawnPointId, SpeciesId};

    use super::*;

    const AREAS: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{"name":"North"},
         "geometry":{"type":"Polygon","coordinates":[[[0,1],[1,1],[1,2],[0,2],[0,1]]]}},
        {"type":"Feature","properties":{"name":"South"},
         "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}}
    ]}"#;

    fn areas() -> Vec<Area> {
        parse_boundaries(AREAS)
            .unwrap()
            .into_iter()
            .map(|boundary| {
                let discord = if boundary.name == "North" {
                    NotificationTarget::Webhook("https://example.invalid/hook".to_string())
                } else {
                    NotificationTarget::None
                };
                Area::new(
                    boundary,
                    AreaSettings {
                        discord,
                        ..AreaSettings::default()
                    },
                )
            })
            .collect()
    }

    fn nest(area: &str, spawnpoint: &str, average: f64) -> NestCandidate {
        NestCandidate {
            area: area.to_string(),
            spawnpoint: SpawnPoint {
                id: SpawnPointId::from(spawnpoint),
                coordinate: Coordinate::new(0.5, 0.5),
            },
            species: SpeciesId::from("Eevee"),
            count: 10,
            average,
            ratio: 1.0,
        }
    }

    fn result(area: &str, nests: Vec<NestCandidate>) -> AreaNests {
        AreaNests {
            area: area.to_string(),
            nests,
            stats: AnalysisStats::default(),
        }
    }

    #[test]
    fn merges_in_configured_area_order() {
        let results = vec![
            result("South", vec![nest("South", "s1", 0.9)]),
            result("North", vec![nest("North", "n1", 0.8), nest("North", "n2", 0.6)]),
        ];

        let out = aggregate(
            &areas(),
            &results,
            &SummaryTemplate::default(),
            &SpeciesNames::default(),
        );

        let spawnpoints: Vec<String> = out
            .collection
            .features
            .iter()
            .map(|f| f.property("spawnpoint").unwrap().as_str().unwrap().to_string())
            .collect();
        assert_eq!(spawnpoints, ["n1", "n2", "s1"]);
        assert_eq!(out.nest_count(), 3);
    }

    #[test]
    fn summaries_only_for_areas_with_targets() {
        let results = vec![
            result("North", vec![]),
            result("South", vec![nest("South", "s1", 0.9)]),
        ];

        let out = aggregate(
            &areas(),
            &results,
            &SummaryTemplate::default(),
            &SpeciesNames::default(),
        );

        assert_eq!(out.summaries.len(), 1);
        assert_eq!(out.summaries[0].area, "North");
        assert_eq!(out.summaries[0].nests, 0);
        assert_eq!(out.summaries[0].lines, ["No nests found in North."]);
    }

    #[test]
    fn no_areas_gives_empty_collection() {
        let out = aggregate(&[], &[], &SummaryTemplate::default(), &SpeciesNames::default());
        assert_eq!(out.nest_count(), 0);
        assert!(out.summaries.is_empty());
    }
}
