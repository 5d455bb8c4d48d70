//! Pass configuration
//!
//! Everything a user may want to tune between runs (column aliases, table
//! naming conventions, keyword tables, value maps) lives in [`Settings`].
//! It is passed into each pass explicitly and persisted as JSON.

use crate::alias::AliasTable;
use crate::error::{Error, Result};
use crate::value_map::ValueMaps;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Keyword in free-text notes standing for a subtype code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtypeKeyword {
    pub keyword: String,
    pub code: String,
}

/// Keyword in free-text notes selecting a value map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalKeyword {
    pub keyword: String,
    pub map: String,
}

/// Configuration for one mapping pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Canonical column name -> accepted spellings
    pub aliases: AliasTable,
    /// Sheet names that mark a mapping table even without its column signature
    pub mapping_table_names: Vec<String>,
    /// Table-name prefixes of the primary (personal data) table
    pub primary_table_prefixes: Vec<String>,
    /// Table-name keywords of the primary table
    pub primary_table_keywords: Vec<String>,
    /// Table-name markers of lookup/reference tables
    pub lookup_table_markers: Vec<String>,
    /// Fallback subtype codes, checked in order
    pub subtype_keywords: Vec<SubtypeKeyword>,
    /// Notes keywords selecting a value map, checked in order
    pub categorical_keywords: Vec<CategoricalKeyword>,
    /// Built-in and user value maps
    pub value_maps: ValueMaps,
    /// Report entities with several candidate rows when no subtype is given
    pub strict_rows: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            aliases: AliasTable::default(),
            mapping_table_names: strings(&["MAPPING", "CONFIG", "MAPPING_CONFIG"]),
            primary_table_prefixes: strings(&["PA0002"]),
            primary_table_keywords: strings(&["personal"]),
            lookup_table_markers: strings(&["LOOKUP", "REF"]),
            subtype_keywords: vec![
                SubtypeKeyword {
                    keyword: "EMAIL".to_string(),
                    code: "10".to_string(),
                },
                SubtypeKeyword {
                    keyword: "PHONE".to_string(),
                    code: "20".to_string(),
                },
            ],
            categorical_keywords: [
                ("gender", "gender"),
                ("sex", "gender"),
                ("marital", "maritalStatus"),
                ("status", "status"),
            ]
            .iter()
            .map(|(keyword, map)| CategoricalKeyword {
                keyword: keyword.to_string(),
                map: map.to_string(),
            })
            .collect(),
            value_maps: ValueMaps::default(),
            strict_rows: false,
        }
    }
}

impl Settings {
    /// Load settings from JSON. Missing fields keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Parse settings from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(Error::Json)
    }

    /// Save settings as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
