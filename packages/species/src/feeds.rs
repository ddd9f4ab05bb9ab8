//! Event and nesting species reference feeds.

use chrono::NaiveDateTime;
use nestwatch_nest_models::SpeciesId;
use serde::Deserialize;

use crate::{SpeciesError, retry};

/// Timestamp formats used by the event feed's `end` field.
const EVENT_END_FORMATS: &[&str] = &["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"];

/// A timed event as published by the event feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveEvent {
    /// Event name.
    pub name: String,
    /// Local wall-clock time at which the event ends.
    pub end: NaiveDateTime,
    /// Raw spawn-boost entries, e.g. `"Pikachu_normal"`.
    pub spawns: Vec<serde_json::Value>,
}

impl ActiveEvent {
    /// Returns `true` if `now` is strictly before the event's end.
    #[must_use]
    pub fn is_active_at(&self, now: NaiveDateTime) -> bool {
        self.end > now
    }
}

#[derive(Deserialize)]
struct EventBody {
    name: String,
    end: String,
    #[serde(default)]
    details: EventDetails,
}

#[derive(Default, Deserialize)]
struct EventDetails {
    #[serde(default)]
    spawns: Vec<serde_json::Value>,
}

/// Parses the event feed body.
///
/// An empty body (`null` or `{}`) means no event is scheduled.
///
/// # Errors
///
/// Returns [`SpeciesError`] if required fields are missing or the end
/// timestamp cannot be parsed.
pub fn parse_event(body: &serde_json::Value) -> Result<Option<ActiveEvent>, SpeciesError> {
    if body.is_null() || body.as_object().is_some_and(serde_json::Map::is_empty) {
        return Ok(None);
    }

    let event = EventBody::deserialize(body)?;

    let end = EVENT_END_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(event.end.trim(), fmt).ok())
        .ok_or_else(|| SpeciesError::Feed {
            message: format!("unparseable event end '{}'", event.end),
        })?;

    Ok(Some(ActiveEvent {
        name: event.name,
        end,
        spawns: event.details.spawns,
    }))
}

/// Parses the nesting species feed: a JSON object keyed by species id.
///
/// # Errors
///
/// Returns [`SpeciesError::Feed`] if the body is not a JSON object.
pub fn parse_species(body: &serde_json::Value) -> Result<Vec<SpeciesId>, SpeciesError> {
    let map = body.as_object().ok_or_else(|| SpeciesError::Feed {
        message: "nesting species feed is not a JSON object".to_string(),
    })?;

    Ok(map
        .keys()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(SpeciesId::from)
        .collect())
}

/// Fetches the current event, if any.
///
/// A malformed event body is logged and treated as "no event" so that a
/// broken feed cannot abort the run; network failures are still errors.
///
/// # Errors
///
/// Returns [`SpeciesError`] if the request fails after all retries.
#[allow(clippy::future_not_send)]
pub async fn fetch_active_event(
    client: &reqwest::Client,
    url: &str,
) -> Result<Option<ActiveEvent>, SpeciesError> {
    let body = retry::send_json(|| client.get(url)).await?;

    match parse_event(&body) {
        Ok(event) => Ok(event),
        Err(e) => {
            log::warn!("Ignoring malformed event feed from {url}: {e}");
            Ok(None)
        }
    }
}

/// Fetches the full list of nesting species.
///
/// # Errors
///
/// Returns [`SpeciesError`] if the request fails or the body has the
/// wrong shape.
#[allow(clippy::future_not_send)]
pub async fn fetch_nesting_species(
    client: &reqwest::Client,
    url: &str,
) -> Result<Vec<SpeciesId>, SpeciesError> {
    let body = retry::send_json(|| client.get(url)).await?;
    let species = parse_species(&body)?;
    log::info!("Got {} nesting species", species.len());
    Ok(species)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_event_body() {
        let body = json!({
            "name": "Kanto Tour",
            "end": "2024-02-25 20:00",
            "details": { "spawns": ["Pikachu_normal", "Bulbasaur"] }
        });

        let event = parse_event(&body).unwrap().unwrap();
        assert_eq!(event.name, "Kanto Tour");
        assert_eq!(
            event.end,
            NaiveDate::from_ymd_opt(2024, 2, 25)
                .unwrap()
                .and_hms_opt(20, 0, 0)
                .unwrap()
        );
        assert_eq!(event.spawns.len(), 2);
    }

    #[test]
    fn event_without_spawns_has_empty_list() {
        let body = json!({ "name": "Quiet Week", "end": "2024-02-25 20:00:00" });
        let event = parse_event(&body).unwrap().unwrap();
        assert!(event.spawns.is_empty());
    }

    #[test]
    fn empty_body_means_no_event() {
        assert_eq!(parse_event(&json!(null)).unwrap(), None);
        assert_eq!(parse_event(&json!({})).unwrap(), None);
    }

    #[test]
    fn rejects_unparseable_end() {
        let body = json!({ "name": "Broken", "end": "next tuesday" });
        assert!(matches!(
            parse_event(&body),
            Err(SpeciesError::Feed { .. })
        ));
    }

    #[test]
    fn is_active_strictly_before_end() {
        let end = NaiveDate::from_ymd_opt(2024, 2, 25)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap();
        let event = ActiveEvent {
            name: "Tour".to_string(),
            end,
            spawns: Vec::new(),
        };
        assert!(event.is_active_at(end - chrono::Duration::minutes(1)));
        assert!(!event.is_active_at(end));
    }

    #[test]
    fn species_feed_keys_become_ids() {
        let body = json!({
            "1": { "name": "Bulbasaur" },
            "25": { "name": "Pikachu" }
        });
        let species = parse_species(&body).unwrap();
        assert_eq!(species, vec![SpeciesId::new("1"), SpeciesId::new("25")]);
    }

    #[test]
    fn species_feed_must_be_object() {
        assert!(parse_species(&json!(["1", "25"])).is_err());
    }
}
