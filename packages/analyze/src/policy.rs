//! Tunable analysis policy.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Metric used to pick the winning species at a spawn point.
///
/// Whichever metric is not primary breaks ties, then the lexicographically
/// smallest species id.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RankBy {
    /// Sightings per scanned hour.
    #[default]
    Average,
    /// Raw sighting count.
    Count,
}

/// Policy knobs for [`crate::NestAnalyzer`], read from the `[analysis]`
/// config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisPolicy {
    /// Only consider (spawn point, species) combinations last seen within
    /// `hours_since_change` hours.
    pub only_recent_changes: bool,
    /// Lookback window in hours.
    pub hours_since_change: u32,
    /// Lower bound for the elapsed days used to normalize averages.
    pub min_elapsed_days: f64,
    /// Winner selection metric.
    pub rank_by: RankBy,
    /// Ignore sightings whose despawn time was not verified.
    pub confirmed_only: bool,
}

impl Default for AnalysisPolicy {
    fn default() -> Self {
        Self {
            only_recent_changes: true,
            hours_since_change: 96,
            min_elapsed_days: 1.0,
            rank_by: RankBy::Average,
            confirmed_only: false,
        }
    }
}

impl AnalysisPolicy {
    /// Lookback window, if enabled.
    #[must_use]
    pub fn lookback(&self) -> Option<chrono::Duration> {
        self.only_recent_changes
            .then(|| chrono::Duration::hours(i64::from(self.hours_since_change)))
    }
}
