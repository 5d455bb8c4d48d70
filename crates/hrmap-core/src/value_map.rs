//! Named code -> display value maps used by categorical lookups

use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Registry of value maps, keyed by logical map name (e.g. `gender`).
///
/// Map names are matched case-insensitively. Codes are stored upper-cased
/// so lookups can normalize the raw value the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueMaps {
    maps: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for ValueMaps {
    fn default() -> Self {
        let mut maps = Self::empty();
        maps.insert_map(
            "gender",
            &[
                ("1", "Male"),
                ("M", "Male"),
                ("MALE", "Male"),
                ("2", "Female"),
                ("F", "Female"),
                ("FEMALE", "Female"),
            ],
        );
        maps.insert_map(
            "maritalStatus",
            &[
                ("0", "Single"),
                ("1", "Married"),
                ("2", "Divorced"),
                ("3", "Widowed"),
                ("4", "Separated"),
            ],
        );
        maps.insert_map(
            "status",
            &[
                ("A", "Active"),
                ("ACTIVE", "Active"),
                ("I", "Inactive"),
                ("INACTIVE", "Inactive"),
                ("T", "Terminated"),
                ("TERMINATED", "Terminated"),
                ("1", "Active"),
                ("0", "Inactive"),
            ],
        );
        maps
    }
}

impl ValueMaps {
    /// A registry with no maps at all
    pub fn empty() -> Self {
        Self {
            maps: BTreeMap::new(),
        }
    }

    /// Add entries to a map, creating it if needed. Later entries win.
    pub fn insert_map(&mut self, name: &str, entries: &[(&str, &str)]) {
        let key = self.key_for(name);
        let map = self.maps.entry(key).or_default();
        for (code, value) in entries {
            map.insert(normalize_code(code), value.to_string());
        }
    }

    /// Does a map with this name exist?
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Registered map names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.maps.keys().map(|k| k.as_str())
    }

    /// Look up a raw code in the named map
    pub fn lookup(&self, name: &str, code: &str) -> Option<&str> {
        self.find(name)?.get(&normalize_code(code)).map(|v| v.as_str())
    }

    /// Merge a reference table into the registry.
    ///
    /// The map name is the table name without its lookup marker, e.g.
    /// `LOOKUP_gender` feeds `gender`. Returns the map name used, or `None`
    /// when the table has fewer than two columns or no usable name.
    pub fn register_table(&mut self, table: &Table, markers: &[String]) -> Option<String> {
        if table.column_count() < 2 {
            return None;
        }
        let name = lookup_map_name(&table.name, markers)?;

        let lower = table.lowercase_column_names();
        let key_idx = position_of(&lower, &["code", "key"]).unwrap_or(0);
        let value_idx = position_of(&lower, &["value", "text", "description"])
            .filter(|&i| i != key_idx)
            .unwrap_or(if key_idx == 1 { 0 } else { 1 });

        let entries: Vec<(String, String)> = table
            .rows
            .iter()
            .filter_map(|row| {
                let code = row.get(key_idx).filter(|c| !c.is_null())?;
                let value = row.get(value_idx).filter(|c| !c.is_null())?;
                Some((code.to_string_value(), value.to_string_value()))
            })
            .collect();

        let key = self.key_for(&name);
        let map = self.maps.entry(key).or_default();
        for (code, value) in entries {
            map.insert(normalize_code(&code), value);
        }

        tracing::debug!(map = %name, table = %table.name, "registered lookup table");
        Some(name)
    }

    fn find(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        self.maps
            .get(name)
            .or_else(|| {
                self.maps
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v)
            })
    }

    /// Existing spelling of a map name, or the name itself
    fn key_for(&self, name: &str) -> String {
        self.maps
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn position_of(columns: &[String], fragments: &[&str]) -> Option<usize> {
    fragments
        .iter()
        .find_map(|f| columns.iter().position(|c| c.contains(f)))
}

/// Strip the lookup marker and separators from a table name
fn lookup_map_name(table_name: &str, markers: &[String]) -> Option<String> {
    let upper = table_name.to_ascii_uppercase();
    let mut name = table_name.to_string();
    for marker in markers {
        if let Some(pos) = upper.find(&marker.to_ascii_uppercase()) {
            name = format!("{}{}", &table_name[..pos], &table_name[pos + marker.len()..]);
            break;
        }
    }
    let name = name.trim_matches(|c: char| c == '_' || c == '-' || c == ' ');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
