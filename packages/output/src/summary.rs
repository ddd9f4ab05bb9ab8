//! Per-area text summaries.

use nestwatch_area_models::NotificationTarget;
use nestwatch_nest_models::NestCandidate;
use serde::{Deserialize, Serialize};

use crate::SpeciesNames;

/// Summary text templates.
///
/// Placeholders: `{area}` and `{nests}` everywhere; `{species}`,
/// `{count}`, `{average}` and `{ratio}` in [`Self::line`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryTemplate {
    /// Summary title.
    pub title: String,
    /// One line per nest.
    pub line: String,
    /// Single line used when the area has no nests.
    pub empty: String,
}

impl Default for SummaryTemplate {
    fn default() -> Self {
        Self {
            title: "Nests in {area}".to_string(),
            line: "**{species}**: {count} seen, {average}/h ({ratio})".to_string(),
            empty: "No nests found in {area}.".to_string(),
        }
    }
}

/// A rendered summary for one area, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaSummary {
    /// Area name.
    pub area: String,
    /// Where to deliver it.
    pub target: NotificationTarget,
    /// Rendered title.
    pub title: String,
    /// Rendered lines, best nest first.
    pub lines: Vec<String>,
    /// Number of nests summarized.
    pub nests: usize,
}

impl SummaryTemplate {
    /// Renders the summary of one area.
    #[must_use]
    pub fn render(
        &self,
        area: &str,
        target: NotificationTarget,
        nests: &[NestCandidate],
        names: &SpeciesNames,
    ) -> AreaSummary {
        let count = nests.len().to_string();
        let common = |template: &str| {
            template
                .replace("{area}", area)
                .replace("{nests}", &count)
        };

        let lines = if nests.is_empty() {
            vec![common(&self.empty)]
        } else {
            nests
                .iter()
                .map(|nest| {
                    common(&self.line)
                        .replace("{species}", names.display(&nest.species))
                        .replace("{count}", &nest.count.to_string())
                        .replace("{average}", &format!("{:.2}", nest.average))
                        .replace("{ratio}", &format!("{:.0}%", nest.ratio * 100.0))
                })
                .collect()
        };

        AreaSummary {
            area: area.to_string(),
            target,
            title: common(&self.title),
            lines,
            nests: nests.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use nestwatch_nest_models::{Coordinate, SpawnPoint, SpawnPointId, SpeciesId};

    use super::*;

    fn nest(species: &str, count: u64, average: f64, ratio: f64) -> NestCandidate {
        NestCandidate {
            area: "Park".to_string(),
            spawnpoint: SpawnPoint {
                id: SpawnPointId::from("sp"),
                coordinate: Coordinate::new(1.0, 1.0),
            },
            species: SpeciesId::from(species),
            count,
            average,
            ratio,
        }
    }

    #[test]
    fn renders_one_line_per_nest() {
        let names = SpeciesNames::parse(r#"{"Eevee": "Evoli"}"#).unwrap();
        let summary = SummaryTemplate::default().render(
            "Park",
            NotificationTarget::Channel(7),
            &[nest("Eevee", 12, 0.5, 0.75), nest("Rattata", 10, 0.416_666, 1.0)],
            &names,
        );

        assert_eq!(summary.title, "Nests in Park");
        assert_eq!(
            summary.lines,
            [
                "**Evoli**: 12 seen, 0.50/h (75%)",
                "**Rattata**: 10 seen, 0.42/h (100%)",
            ]
        );
        assert_eq!(summary.nests, 2);
    }

    #[test]
    fn empty_area_uses_empty_line() {
        let template = SummaryTemplate {
            title: "{area}: {nests} nests".to_string(),
            ..SummaryTemplate::default()
        };
        let summary = template.render(
            "Park",
            NotificationTarget::None,
            &[],
            &SpeciesNames::default(),
        );
        assert_eq!(summary.title, "Park: 0 nests");
        assert_eq!(summary.lines, ["No nests found in Park."]);
    }

    #[test]
    fn partial_template_keeps_defaults() {
        let template: SummaryTemplate = toml::from_str(r#"line = "{species} x{count}""#).unwrap();
        assert_eq!(template.title, SummaryTemplate::default().title);
        assert_eq!(template.line, "{species} x{count}");
    }
}
