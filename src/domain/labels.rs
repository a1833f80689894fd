//! Locale-keyed class label tables.
//!
//! The vocabulary itself is external data. A table maps a class index to a
//! display name and there is one table per locale. On disk each locale is a
//! `{locale}.json` file holding either a JSON array of names or an object
//! keyed by class index (`{"0": "tench", "1": "goldfish"}`).

use crate::core::constants::MAX_LABEL_CLASSES;
use crate::core::errors::{EffNetError, EffNetResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum LabelFile {
    List(Vec<String>),
    Indexed(HashMap<String, String>),
}

/// Class names for each supported locale.
#[derive(Debug, Clone, Default)]
pub struct LabelTable {
    tables: HashMap<String, Vec<String>>,
}

impl LabelTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the names for `locale`; index `i` labels class `i`.
    pub fn with_locale(mut self, locale: impl Into<String>, labels: Vec<String>) -> Self {
        self.insert(locale, labels);
        self
    }

    /// Adds or replaces the names for `locale`.
    pub fn insert(&mut self, locale: impl Into<String>, labels: Vec<String>) {
        self.tables.insert(locale.into(), labels);
    }

    /// Loads every `*.json` file in `dir`, using the file stem as the locale.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be read or a file is not a valid table.
    pub fn from_dir(dir: impl AsRef<Path>) -> EffNetResult<Self> {
        let mut table = Self::new();
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(locale) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let labels = Self::parse(&std::fs::read_to_string(&path)?)?;
            tracing::debug!(locale, classes = labels.len(), "loaded label table");
            table.insert(locale.to_string(), labels);
        }
        Ok(table)
    }

    /// Parses a single table in either supported JSON shape.
    pub fn parse(json: &str) -> EffNetResult<Vec<String>> {
        match serde_json::from_str::<LabelFile>(json)? {
            LabelFile::List(labels) => Ok(labels),
            LabelFile::Indexed(map) => {
                let mut indexed = map
                    .into_iter()
                    .map(|(key, label)| match key.trim().parse::<usize>() {
                        Ok(idx) if idx < MAX_LABEL_CLASSES => Ok((idx, label)),
                        Ok(_) => Err(EffNetError::config_error(format!(
                            "label table key '{key}' exceeds the limit of {MAX_LABEL_CLASSES} classes"
                        ))),
                        Err(_) => Err(EffNetError::config_error(format!(
                            "label table key '{key}' is not a class index"
                        ))),
                    })
                    .collect::<EffNetResult<Vec<_>>>()?;
                indexed.sort_by_key(|(idx, _)| *idx);
                let len = indexed.last().map_or(0, |(idx, _)| idx + 1);
                let mut labels = vec![String::new(); len];
                for (idx, label) in indexed {
                    labels[idx] = label;
                }
                Ok(labels)
            }
        }
    }

    /// Names for `locale`.
    ///
    /// # Errors
    ///
    /// Returns [`EffNetError::UnsupportedLocale`] when no table was registered
    /// for the locale. There is no fallback to another locale.
    pub fn labels(&self, locale: &str) -> EffNetResult<&[String]> {
        self.tables
            .get(locale)
            .map(Vec::as_slice)
            .ok_or_else(|| EffNetError::unsupported_locale(locale))
    }

    /// Whether a table exists for `locale`.
    pub fn supports(&self, locale: &str) -> bool {
        self.tables.contains_key(locale)
    }

    /// Registered locales in sorted order.
    pub fn locales(&self) -> Vec<&str> {
        let mut locales: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        locales.sort_unstable();
        locales
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let labels = LabelTable::parse(r#"["tench", "goldfish"]"#).unwrap();
        assert_eq!(labels, vec!["tench", "goldfish"]);
    }

    #[test]
    fn test_parse_indexed_fills_gaps() {
        let labels = LabelTable::parse(r#"{"2": "shark", "0": "tench"}"#).unwrap();
        assert_eq!(labels, vec!["tench", "", "shark"]);
    }

    #[test]
    fn test_parse_rejects_non_numeric_keys() {
        assert!(LabelTable::parse(r#"{"zero": "tench"}"#).is_err());
    }

    #[test]
    fn test_parse_rejects_out_of_range_keys() {
        for json in [
            r#"{"18446744073709551615": "x"}"#,
            r#"{"0": "tench", "1000000000000": "goldfish"}"#,
            r#"{"65536": "x"}"#,
        ] {
            let err = LabelTable::parse(json).unwrap_err();
            assert!(matches!(err, EffNetError::ConfigError { .. }), "{json}");
        }
    }

    #[test]
    fn test_parse_accepts_largest_key() {
        let labels = LabelTable::parse(r#"{"65535": "last"}"#).unwrap();
        assert_eq!(labels.len(), MAX_LABEL_CLASSES);
        assert_eq!(labels[MAX_LABEL_CLASSES - 1], "last");
    }

    #[test]
    fn test_missing_locale_is_unsupported() {
        let table = LabelTable::new().with_locale("en", vec!["tench".to_string()]);
        assert!(table.supports("en"));
        assert!(matches!(
            table.labels("fr"),
            Err(EffNetError::UnsupportedLocale { locale }) if locale == "fr"
        ));
    }

    #[test]
    fn test_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("en.json"), r#"["tench", "goldfish"]"#).unwrap();
        std::fs::write(dir.path().join("es.json"), r#"{"0": "tenca", "1": "carpa dorada"}"#)
            .unwrap();
        std::fs::write(dir.path().join("README.txt"), "ignored").unwrap();

        let table = LabelTable::from_dir(dir.path()).unwrap();
        assert_eq!(table.locales(), vec!["en", "es"]);
        assert_eq!(table.labels("es").unwrap()[1], "carpa dorada");
    }
}
