//! The nest analyzer.
//!
//! For one area:
//!
//! 1. fetch sightings inside the area's bounding box,
//! 2. drop malformed rows and rows outside the polygon,
//! 3. group by (spawn point, species) and score each group,
//! 4. keep eligible species only, then the best species per spawn point,
//! 5. apply `min_pokemon` / `min_average`,
//! 6. apply the area-wide `min_spawnpoints` gate,
//! 7. sort by average then count, both descending.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use nestwatch_area::Area;
use nestwatch_nest_models::{
    Coordinate, NestCandidate, SightingRecord, SpawnPoint, SpawnPointId, SpeciesId,
};

use crate::progress::AreaProgress;
use crate::{AnalysisPolicy, AnalyzeError, RankBy, SightingQuery, SightingSource};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Counters describing what happened to an area's rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisStats {
    /// Rows returned by the source.
    pub rows: usize,
    /// Rows rejected as malformed.
    pub malformed: usize,
    /// Rows dropped because they were unconfirmed and the policy requires
    /// confirmation.
    pub unconfirmed: usize,
    /// Rows inside the bounding box but outside the polygon.
    pub outside: usize,
    /// Distinct spawn points seen.
    pub spawnpoints: usize,
    /// Spawn points whose winner passed the per-spawn point thresholds.
    pub qualifying_spawnpoints: usize,
}

/// Nests found for one area.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaNests {
    /// Area name.
    pub area: String,
    /// Qualifying nests, best first.
    pub nests: Vec<NestCandidate>,
    /// Row accounting.
    pub stats: AnalysisStats,
}

/// Sightings of one species at one spawn point.
#[derive(Debug, Clone)]
struct Group {
    count: u64,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

impl Group {
    const fn new(seen_at: DateTime<Utc>) -> Self {
        Self {
            count: 1,
            first_seen: seen_at,
            last_seen: seen_at,
        }
    }

    fn add(&mut self, seen_at: DateTime<Utc>) {
        self.count += 1;
        self.first_seen = self.first_seen.min(seen_at);
        self.last_seen = self.last_seen.max(seen_at);
    }
}

/// A scored (spawn point, species) group.
#[derive(Debug, Clone)]
struct Scored {
    species: SpeciesId,
    count: u64,
    average: f64,
}

/// Detects nests using a fixed policy and reference time.
#[derive(Debug, Clone)]
pub struct NestAnalyzer {
    policy: AnalysisPolicy,
    now: DateTime<Utc>,
}

impl NestAnalyzer {
    /// Creates an analyzer. `now` anchors the lookback window so that
    /// repeated runs over the same data give the same result.
    #[must_use]
    pub const fn new(policy: AnalysisPolicy, now: DateTime<Utc>) -> Self {
        Self { policy, now }
    }

    /// The policy in use.
    #[must_use]
    pub const fn policy(&self) -> &AnalysisPolicy {
        &self.policy
    }

    /// Finds the nests of `area`.
    ///
    /// An empty source or an area without matching spawn points yields an
    /// empty result. Malformed rows are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzeError::Source`] if the source fails.
    pub fn analyze<S>(
        &self,
        area: &Area,
        eligible: &BTreeSet<SpeciesId>,
        source: &S,
    ) -> Result<AreaNests, AnalyzeError<S::Error>>
    where
        S: SightingSource + ?Sized,
    {
        let since = self.policy.lookback().map(|window| self.now - window);
        let query = SightingQuery {
            bounds: area.bounds(),
            since,
        };

        let rows = source
            .sightings(&query)
            .map_err(|source| AnalyzeError::Source {
                area: area.name().to_string(),
                source,
            })?;

        let mut stats = AnalysisStats {
            rows: rows.len(),
            ..AnalysisStats::default()
        };

        let mut locations: BTreeMap<SpawnPointId, Coordinate> = BTreeMap::new();
        let mut groups: BTreeMap<SpawnPointId, BTreeMap<SpeciesId, Group>> = BTreeMap::new();

        for raw in rows {
            let record = match SightingRecord::try_from(raw) {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("[{}] Skipping malformed sighting: {e}", area.name());
                    stats.malformed += 1;
                    continue;
                }
            };

            if self.policy.confirmed_only && !record.confirmed {
                stats.unconfirmed += 1;
                continue;
            }

            if !area.contains(record.coordinate) {
                stats.outside += 1;
                continue;
            }

            locations
                .entry(record.spawnpoint_id.clone())
                .or_insert(record.coordinate);

            groups
                .entry(record.spawnpoint_id)
                .or_default()
                .entry(record.species)
                .and_modify(|g| g.add(record.seen_at))
                .or_insert_with(|| Group::new(record.seen_at));
        }

        stats.spawnpoints = groups.len();

        let settings = area.settings();
        let mut nests = Vec::new();

        for (spawnpoint_id, species_groups) in groups {
            let scored: Vec<Scored> = species_groups
                .into_iter()
                .filter(|(_, group)| since.is_none_or(|since| group.last_seen >= since))
                .filter(|(species, _)| eligible.contains(species))
                .map(|(species, group)| Scored {
                    average: self.average(&group, settings.scan_hours_per_day),
                    count: group.count,
                    species,
                })
                .collect();

            let total: u64 = scored.iter().map(|s| s.count).sum();

            let Some(winner) = scored
                .into_iter()
                .min_by(|a, b| rank(a, b, self.policy.rank_by))
            else {
                continue;
            };

            if winner.count < settings.min_pokemon || winner.average < settings.min_average {
                log::debug!(
                    "[{}] {spawnpoint_id}: {} below thresholds (count={}, average={:.3})",
                    area.name(),
                    winner.species,
                    winner.count,
                    winner.average,
                );
                continue;
            }

            #[allow(clippy::cast_precision_loss)]
            let ratio = winner.count as f64 / total as f64;

            let Some(&coordinate) = locations.get(&spawnpoint_id) else {
                continue;
            };

            nests.push(NestCandidate {
                area: area.name().to_string(),
                spawnpoint: SpawnPoint {
                    id: spawnpoint_id,
                    coordinate,
                },
                species: winner.species,
                count: winner.count,
                average: winner.average,
                ratio,
            });
        }

        stats.qualifying_spawnpoints = nests.len();

        if nests.len() < settings.min_spawnpoints {
            log::info!(
                "[{}] Only {} qualifying spawn points (min {}), no nests",
                area.name(),
                nests.len(),
                settings.min_spawnpoints,
            );
            nests.clear();
        }

        nests.sort_by(|a, b| {
            b.average
                .total_cmp(&a.average)
                .then_with(|| b.count.cmp(&a.count))
                .then_with(|| a.spawnpoint.id.cmp(&b.spawnpoint.id))
        });

        if stats.malformed > 0 {
            log::warn!(
                "[{}] Skipped {} malformed sightings",
                area.name(),
                stats.malformed
            );
        }
        log::info!(
            "[{}] {} nests from {} rows at {} spawn points",
            area.name(),
            nests.len(),
            stats.rows,
            stats.spawnpoints,
        );

        Ok(AreaNests {
            area: area.name().to_string(),
            nests,
            stats,
        })
    }

    /// Sightings per scanned hour, using at least `min_elapsed_days` days.
    fn average(&self, group: &Group, scan_hours_per_day: f64) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let span_days = (group.last_seen - group.first_seen).num_seconds() as f64 / SECONDS_PER_DAY;
        let elapsed_days = span_days.max(self.policy.min_elapsed_days);

        #[allow(clippy::cast_precision_loss)]
        let count = group.count as f64;

        count / (elapsed_days * scan_hours_per_day)
    }
}

/// Orders candidates best first: the primary metric descending, the other
/// metric descending, then species id ascending.
fn rank(a: &Scored, b: &Scored, rank_by: RankBy) -> Ordering {
    let by_average = || b.average.total_cmp(&a.average);
    let by_count = || b.count.cmp(&a.count);

    match rank_by {
        RankBy::Average => by_average().then_with(by_count),
        RankBy::Count => by_count().then_with(by_average),
    }
    .then_with(|| a.species.cmp(&b.species))
}

/// Analyzes every area in order, one result slot per area.
///
/// # Errors
///
/// Returns the first [`AnalyzeError`]; no partial results are returned.
pub fn analyze_areas<S>(
    analyzer: &NestAnalyzer,
    areas: &[Area],
    eligible: &BTreeSet<SpeciesId>,
    source: &S,
    progress: &dyn AreaProgress,
) -> Result<Vec<AreaNests>, AnalyzeError<S::Error>>
where
    S: SightingSource + ?Sized,
{
    progress.start(areas.len() as u64);

    let mut results = Vec::with_capacity(areas.len());
    for area in areas {
        let result = analyzer.analyze(area, eligible, source)?;
        progress.area_done(area.name(), result.nests.len());
        results.push(result);
    }

    let total: usize = results.iter().map(|r| r.nests.len()).sum();
    progress.finish(format!("{total} nests in {} areas", results.len()));

    Ok(results)
}
