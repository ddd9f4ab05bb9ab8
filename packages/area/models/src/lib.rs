#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-area nest threshold settings and notification targets.
//!
//! Settings are layered: a single [`DefaultSettings`] record supplies every
//! value, and each area may carry a sparse [`AreaOverride`]. [`resolve`]
//! merges the two into the effective [`AreaSettings`] for one area.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Default minimum number of sightings for a spawn point to qualify.
pub const DEFAULT_MIN_POKEMON: u64 = 9;

/// Default minimum number of qualifying spawn points for an area.
pub const DEFAULT_MIN_SPAWNPOINTS: usize = 2;

/// Default minimum sightings per scanned hour.
pub const DEFAULT_MIN_AVERAGE: f64 = 0.5;

/// Default number of hours per day the area is scanned.
pub const DEFAULT_SCAN_HOURS_PER_DAY: f64 = 24.0;

/// Where an area's nest summary is delivered.
///
/// In TOML this is written as `discord = "none"`,
/// `discord = { webhook = "https://..." }` or `discord = { channel = 123 }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTarget {
    /// No notification.
    #[default]
    None,
    /// A Discord webhook URL.
    Webhook(String),
    /// A Discord channel ID, posted to by the bot account.
    Channel(u64),
}

impl NotificationTarget {
    /// Returns `true` unless the target is [`NotificationTarget::None`].
    #[must_use]
    pub const fn is_some(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// The global default settings record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultSettings {
    /// Minimum sightings of the winning species at a spawn point.
    pub min_pokemon: u64,
    /// Minimum number of qualifying spawn points in the area.
    pub min_spawnpoints: usize,
    /// Minimum sightings per scanned hour.
    pub min_average: f64,
    /// Hours per day the area is covered by scanners.
    pub scan_hours_per_day: f64,
    /// Notification target.
    pub discord: NotificationTarget,
}

impl Default for DefaultSettings {
    fn default() -> Self {
        Self {
            min_pokemon: DEFAULT_MIN_POKEMON,
            min_spawnpoints: DEFAULT_MIN_SPAWNPOINTS,
            min_average: DEFAULT_MIN_AVERAGE,
            scan_hours_per_day: DEFAULT_SCAN_HOURS_PER_DAY,
            discord: NotificationTarget::None,
        }
    }
}

/// A sparse per-area override. Unset fields fall back to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AreaOverride {
    /// Overrides [`DefaultSettings::min_pokemon`].
    pub min_pokemon: Option<u64>,
    /// Overrides [`DefaultSettings::min_spawnpoints`].
    pub min_spawnpoints: Option<usize>,
    /// Overrides [`DefaultSettings::min_average`].
    pub min_average: Option<f64>,
    /// Overrides [`DefaultSettings::scan_hours_per_day`].
    pub scan_hours_per_day: Option<f64>,
    /// Overrides [`DefaultSettings::discord`].
    pub discord: Option<NotificationTarget>,
}

/// Effective settings for one area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaSettings {
    /// Minimum sightings of the winning species at a spawn point.
    pub min_pokemon: u64,
    /// Minimum number of qualifying spawn points in the area.
    pub min_spawnpoints: usize,
    /// Minimum sightings per scanned hour.
    pub min_average: f64,
    /// Hours per day the area is covered by scanners.
    pub scan_hours_per_day: f64,
    /// Notification target.
    pub discord: NotificationTarget,
}

impl Default for AreaSettings {
    fn default() -> Self {
        resolve(&DefaultSettings::default(), None)
    }
}

/// The `[settings]` section of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultSettings,
    /// Overrides keyed by area name.
    #[serde(default)]
    pub areas: BTreeMap<String, AreaOverride>,
}

/// Errors raised while validating settings.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    /// An override names an area that is not configured.
    #[error("settings reference unknown area '{area}'")]
    UnknownArea {
        /// The unknown area name.
        area: String,
    },

    /// A setting has a value that can never be satisfied.
    #[error("invalid setting for '{scope}': {message}")]
    Invalid {
        /// `"defaults"` or the area name.
        scope: String,
        /// Description of what went wrong.
        message: String,
    },
}

/// Merges an optional override on top of the defaults.
#[must_use]
pub fn resolve(defaults: &DefaultSettings, area: Option<&AreaOverride>) -> AreaSettings {
    let Some(area) = area else {
        return AreaSettings {
            min_pokemon: defaults.min_pokemon,
            min_spawnpoints: defaults.min_spawnpoints,
            min_average: defaults.min_average,
            scan_hours_per_day: defaults.scan_hours_per_day,
            discord: defaults.discord.clone(),
        };
    };

    AreaSettings {
        min_pokemon: area.min_pokemon.unwrap_or(defaults.min_pokemon),
        min_spawnpoints: area.min_spawnpoints.unwrap_or(defaults.min_spawnpoints),
        min_average: area.min_average.unwrap_or(defaults.min_average),
        scan_hours_per_day: area.scan_hours_per_day.unwrap_or(defaults.scan_hours_per_day),
        discord: area
            .discord
            .clone()
            .unwrap_or_else(|| defaults.discord.clone()),
    }
}

impl AreaSettings {
    /// Checks that the settings can be applied.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] if `scan_hours_per_day` is not in
    /// `(0, 24]`, `min_average` is negative or not finite, or a webhook
    /// URL is empty.
    pub fn validate(&self, scope: &str) -> Result<(), SettingsError> {
        let invalid = |message: String| SettingsError::Invalid {
            scope: scope.to_string(),
            message,
        };

        if !(self.scan_hours_per_day > 0.0 && self.scan_hours_per_day <= 24.0) {
            return Err(invalid(format!(
                "scan_hours_per_day must be in (0, 24], got {}",
                self.scan_hours_per_day
            )));
        }
        if !self.min_average.is_finite() || self.min_average < 0.0 {
            return Err(invalid(format!(
                "min_average must be a non-negative number, got {}",
                self.min_average
            )));
        }
        if let NotificationTarget::Webhook(url) = &self.discord
            && url.trim().is_empty()
        {
            return Err(invalid("webhook URL is empty".to_string()));
        }

        Ok(())
    }
}

impl SettingsConfig {
    /// Returns the effective settings for `area`.
    #[must_use]
    pub fn resolve_for(&self, area: &str) -> AreaSettings {
        resolve(&self.defaults, self.areas.get(area))
    }

    /// Checks every override against the set of configured area names and
    /// validates the resolved settings of every area.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::UnknownArea`] for an override without a
    /// matching area, or [`SettingsError::Invalid`] for unusable values.
    pub fn validate(&self, area_names: &BTreeSet<&str>) -> Result<(), SettingsError> {
        if let Some(unknown) = self
            .areas
            .keys()
            .find(|name| !area_names.contains(name.as_str()))
        {
            return Err(SettingsError::UnknownArea {
                area: unknown.clone(),
            });
        }

        resolve(&self.defaults, None).validate("defaults")?;
        for name in area_names {
            self.resolve_for(name).validate(name)?;
        }

        Ok(())
    }
}
