//! The configuration file.

use std::path::{Path, PathBuf};

use nestwatch_analyze::AnalysisPolicy;
use nestwatch_area::Area;
use nestwatch_area_models::{NotificationTarget, SettingsConfig};
use nestwatch_database::paths;
use nestwatch_notify::EmbedStyle;
use nestwatch_output::SummaryTemplate;
use serde::Deserialize;

/// Errors raised while loading or validating the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has unknown keys.
    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value is unusable.
    #[error("Invalid config: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },
}

/// `[paths]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    /// Scanner `DuckDB` file.
    pub database: PathBuf,
    /// Area boundaries `GeoJSON`.
    pub areas: PathBuf,
    /// Nest `GeoJSON` artifact.
    pub output: PathBuf,
    /// Directory holding `<language>.json` species names.
    #[serde(default)]
    pub locale_dir: Option<PathBuf>,
}

/// `[feeds]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedsConfig {
    /// Active event feed.
    pub event_url: String,
    /// Nesting species feed.
    pub species_url: String,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            event_url: nestwatch_species::DEFAULT_EVENT_URL.to_string(),
            species_url: nestwatch_species::DEFAULT_SPECIES_URL.to_string(),
        }
    }
}

/// `[discord.template]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TemplateConfig {
    /// Title and line text.
    #[serde(flatten)]
    pub text: SummaryTemplate,
    /// Embed color and footer.
    #[serde(flatten)]
    pub embed: EmbedStyle,
}

/// `[discord]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscordConfig {
    /// Bot token, required when any area posts to a channel.
    pub token: Option<String>,
    /// Language of species display names.
    pub language: String,
    /// Summary templates.
    pub template: TemplateConfig,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: None,
            language: "en".to_string(),
            template: TemplateConfig::default(),
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// File locations.
    pub paths: PathsConfig,
    /// Analysis policy.
    #[serde(default)]
    pub analysis: AnalysisPolicy,
    /// Reference feeds.
    #[serde(default)]
    pub feeds: FeedsConfig,
    /// Discord delivery.
    #[serde(default)]
    pub discord: DiscordConfig,
    /// Per-area thresholds.
    #[serde(default)]
    pub settings: SettingsConfig,
}

impl Config {
    /// Parses and validates configuration text. Relative paths are
    /// resolved against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the text is invalid.
    pub fn parse(text: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(text)?;

        config.paths.database = paths::resolve(base_dir, &config.paths.database);
        config.paths.areas = paths::resolve(base_dir, &config.paths.areas);
        config.paths.output = paths::resolve(base_dir, &config.paths.output);
        config.paths.locale_dir = config
            .paths
            .locale_dir
            .map(|dir| paths::resolve(base_dir, &dir));

        config.validate()?;
        Ok(config)
    }

    /// Reads the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let config = Self::parse(&text, base_dir)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| {
            Err(ConfigError::Invalid {
                message: message.to_string(),
            })
        };

        if self.feeds.event_url.trim().is_empty() || self.feeds.species_url.trim().is_empty() {
            return invalid("feed URLs must not be empty");
        }
        if self.discord.language.trim().is_empty() {
            return invalid("discord.language must not be empty");
        }
        if !(self.analysis.min_elapsed_days.is_finite() && self.analysis.min_elapsed_days > 0.0) {
            return invalid("analysis.min_elapsed_days must be positive");
        }
        if self.analysis.only_recent_changes && self.analysis.hours_since_change == 0 {
            return invalid("analysis.hours_since_change must be at least 1");
        }

        Ok(())
    }

    /// Checks that every area's notification target can be served.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if an area posts to a channel and
    /// no bot token is configured.
    pub fn check_targets(&self, areas: &[Area]) -> Result<(), ConfigError> {
        let has_token = self
            .discord
            .token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());

        if let Some(area) = areas
            .iter()
            .find(|a| matches!(a.settings().discord, NotificationTarget::Channel(_)))
            && !has_token
        {
            return Err(ConfigError::Invalid {
                message: format!(
                    "area '{}' posts to a Discord channel but discord.token is not set",
                    area.name()
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use nestwatch_analyze::RankBy;
    use nestwatch_area::parse_boundaries;
    use nestwatch_area_models::AreaSettings;

    use super::*;

    const MINIMAL: &str = r#"
        [paths]
        database = "data/scan.duckdb"
        areas = "areas.geojson"
        output = "/srv/www/nests.geojson"
    "#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::parse(MINIMAL, Path::new("/etc/nestwatch")).unwrap();

        assert_eq!(
            config.paths.database,
            PathBuf::from("/etc/nestwatch/data/scan.duckdb")
        );
        assert_eq!(config.paths.output, PathBuf::from("/srv/www/nests.geojson"));
        assert_eq!(config.analysis, AnalysisPolicy::default());
        assert_eq!(config.feeds, FeedsConfig::default());
        assert_eq!(config.discord.language, "en");
        assert_eq!(config.settings.defaults.min_pokemon, 9);
    }

    #[test]
    fn full_config_parses() {
        let text = format!(
            r#"{MINIMAL}
            locale_dir = "locale"

            [analysis]
            hours_since_change = 48
            rank_by = "count"

            [feeds]
            species_url = "http://localhost/species.json"

            [discord]
            token = "abc"
            language = "de"

            [discord.template]
            title = "Nester in {{area}}"
            color = 16711680

            [settings.defaults]
            min_pokemon = 5
            discord = {{ channel = 1234 }}

            [settings.areas."Central Park"]
            min_spawnpoints = 1
            discord = "none"
            "#
        );

        let config = Config::parse(&text, Path::new("/cfg")).unwrap();

        assert_eq!(config.paths.locale_dir, Some(PathBuf::from("/cfg/locale")));
        assert_eq!(config.analysis.hours_since_change, 48);
        assert_eq!(config.analysis.rank_by, RankBy::Count);
        assert_eq!(config.feeds.species_url, "http://localhost/species.json");
        assert_eq!(
            config.feeds.event_url,
            nestwatch_species::DEFAULT_EVENT_URL
        );
        assert_eq!(config.discord.template.text.title, "Nester in {area}");
        assert_eq!(
            config.discord.template.text.line,
            SummaryTemplate::default().line
        );
        assert_eq!(config.discord.template.embed.color, 0xFF_00_00);

        let park = config.settings.resolve_for("Central Park");
        assert_eq!(park.min_pokemon, 5);
        assert_eq!(park.min_spawnpoints, 1);
        assert_eq!(park.discord, NotificationTarget::None);
        assert_eq!(
            config.settings.resolve_for("Elsewhere").discord,
            NotificationTarget::Channel(1234)
        );
    }

    #[test]
    fn example_config_is_valid() {
        let config = Config::parse(
            include_str!("../../../config/config.example.toml"),
            Path::new("/etc/nestwatch"),
        )
        .unwrap();

        assert_eq!(
            config.paths.areas,
            PathBuf::from("/etc/nestwatch/areas.geojson")
        );
        assert_eq!(
            config.settings.resolve_for("Riverside").discord,
            NotificationTarget::Channel(123_456_789_012_345_678)
        );
        assert_eq!(config.discord.template.embed.color, 0x2E_CC_71);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let text = format!("{MINIMAL}\n[analysis]\nhours = 3\n");
        assert!(matches!(
            Config::parse(&text, Path::new("")),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn rejects_zero_elapsed_day_floor() {
        let text = format!("{MINIMAL}\n[analysis]\nmin_elapsed_days = 0.0\n");
        assert!(matches!(
            Config::parse(&text, Path::new("")),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn channel_target_requires_token() {
        let config = Config::parse(MINIMAL, Path::new("")).unwrap();
        let boundary = parse_boundaries(
            r#"{"type":"FeatureCollection","features":[{"type":"Feature",
                "properties":{"name":"Park"},
                "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}}]}"#,
        )
        .unwrap()
        .remove(0);

        let webhook = Area::new(
            boundary.clone(),
            AreaSettings {
                discord: NotificationTarget::Webhook("https://hook".to_string()),
                ..AreaSettings::default()
            },
        );
        assert!(config.check_targets(&[webhook]).is_ok());

        let channel = Area::new(
            boundary,
            AreaSettings {
                discord: NotificationTarget::Channel(9),
                ..AreaSettings::default()
            },
        );
        assert!(matches!(
            config.check_targets(&[channel]),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
