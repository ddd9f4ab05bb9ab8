//! Event-aware nesting eligibility.
//!
//! Species boosted by a running event spawn everywhere, so their sightings
//! say nothing about nests. They are removed from the reference list while
//! the event lasts.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use nestwatch_nest_models::SpeciesId;

use crate::ActiveEvent;

/// Why a spawn-boost entry could not be turned into a species id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpeciesParseError {
    /// The entry is not a JSON string.
    #[error("entry is not a string")]
    NotAString,

    /// The entry has no family tag before the first `_`.
    #[error("entry has an empty species tag")]
    EmptyTag,
}

/// A spawn-boost entry that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// The entry as it appeared in the feed.
    pub entry: String,
    /// Why it was skipped.
    pub reason: SpeciesParseError,
}

/// Result of [`compute_eligible_species`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EligibleSpecies {
    /// Species allowed to nest.
    pub species: BTreeSet<SpeciesId>,
    /// Species excluded because an active event boosts them.
    pub boosted: BTreeSet<SpeciesId>,
    /// Event entries that could not be parsed.
    pub skipped: Vec<SkippedEntry>,
}

impl EligibleSpecies {
    /// Returns `true` if `species` may nest.
    #[must_use]
    pub fn contains(&self, species: &SpeciesId) -> bool {
        self.species.contains(species)
    }
}

/// Parses one spawn-boost entry, keeping only the family tag before the
/// first `_` (`"Pikachu_normal"` becomes `"Pikachu"`).
///
/// # Errors
///
/// Returns [`SpeciesParseError`] if the entry is not a string or its tag
/// is empty.
pub fn parse_boosted_species(entry: &serde_json::Value) -> Result<SpeciesId, SpeciesParseError> {
    let text = entry.as_str().ok_or(SpeciesParseError::NotAString)?;
    let tag = text.split('_').next().unwrap_or_default().trim();

    if tag.is_empty() {
        return Err(SpeciesParseError::EmptyTag);
    }

    Ok(SpeciesId::from(tag))
}

/// Computes the species eligible to nest at `now`.
///
/// Without an event, or once the event has ended, every species in
/// `full_species` is eligible. Otherwise the boosted species are removed.
/// Unparseable boost entries are collected in
/// [`EligibleSpecies::skipped`] and never abort the computation.
#[must_use]
pub fn compute_eligible_species(
    full_species: &[SpeciesId],
    event: Option<&ActiveEvent>,
    now: NaiveDateTime,
) -> EligibleSpecies {
    let mut result = EligibleSpecies {
        species: full_species.iter().cloned().collect(),
        ..EligibleSpecies::default()
    };

    let Some(event) = event.filter(|e| e.is_active_at(now)) else {
        log::info!("No ongoing event found");
        return result;
    };

    log::info!("Found ongoing event: {} (ends {})", event.name, event.end);

    for entry in &event.spawns {
        match parse_boosted_species(entry) {
            Ok(species) => {
                result.boosted.insert(species);
            }
            Err(reason) => {
                log::warn!("Skipping event spawn entry {entry}: {reason}");
                result.skipped.push(SkippedEntry {
                    entry: entry.to_string(),
                    reason,
                });
            }
        }
    }

    result.species.retain(|s| !result.boosted.contains(s));

    log::debug!("Event species: {:?}", result.boosted);

    result
}
