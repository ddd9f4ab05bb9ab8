//! Localized species display names.
//!
//! A locale file `<locale_dir>/<language>.json` is a flat JSON object
//! mapping species ids to display names. Ids without an entry are shown
//! as-is.

use std::collections::BTreeMap;
use std::path::Path;

use nestwatch_nest_models::SpeciesId;

use crate::OutputError;

/// Species id to display name lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeciesNames {
    names: BTreeMap<String, String>,
}

impl SpeciesNames {
    /// Parses a locale file's contents.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError::Json`] if the text is not a JSON object of
    /// strings.
    pub fn parse(text: &str) -> Result<Self, OutputError> {
        Ok(Self {
            names: serde_json::from_str(text)?,
        })
    }

    /// Loads `<dir>/<language>.json`. A missing file yields an empty
    /// lookup so ids are displayed unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load(dir: &Path, language: &str) -> Result<Self, OutputError> {
        let path = dir.join(format!("{language}.json"));
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                let names = Self::parse(&text)?;
                log::info!(
                    "Loaded {} species names from {}",
                    names.names.len(),
                    path.display()
                );
                Ok(names)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!(
                    "No species names for language '{language}' at {}",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Display name for `species`, falling back to its id.
    #[must_use]
    pub fn display<'a>(&'a self, species: &'a SpeciesId) -> &'a str {
        self.names
            .get(species.as_str())
            .map_or_else(|| species.as_str(), String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_species_id() {
        let names = SpeciesNames::parse(r#"{"Eevee": "Evoli"}"#).unwrap();
        assert_eq!(names.display(&SpeciesId::from("Eevee")), "Evoli");
        assert_eq!(names.display(&SpeciesId::from("Rattata")), "Rattata");
    }

    #[test]
    fn missing_locale_file_is_not_an_error() {
        let names = SpeciesNames::load(Path::new("/nonexistent/locale"), "xx").unwrap();
        assert_eq!(names, SpeciesNames::default());
    }

    #[test]
    fn rejects_non_string_values() {
        assert!(matches!(
            SpeciesNames::parse(r#"{"Eevee": 133}"#),
            Err(OutputError::Json(_))
        ));
    }
}
