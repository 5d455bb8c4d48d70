//! Name resolution for columns whose spelling varies between sources
//!
//! Every "which column holds X" question goes through [`AliasTable::resolve`],
//! keyed by a canonical name such as `entity_id` or `source_table`.

use crate::table::{Column, Table};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ENTITY_ID: &str = "entity_id";
pub const SUBTYPE: &str = "subtype";
pub const TARGET_FIELD: &str = "target_field";
pub const SOURCE_TABLE: &str = "source_table";
pub const SOURCE_FIELD: &str = "source_field";
pub const NOTES: &str = "notes";
pub const DEFAULT_VALUE: &str = "default_value";

/// How an alias is compared with a column name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Byte-for-byte equality
    Exact,
    /// Equality ignoring ASCII case
    CaseInsensitive,
    /// Case-insensitive substring of the column name
    Contains,
}

impl MatchMode {
    fn matches(self, alias: &str, column: &str) -> bool {
        let column = column.trim();
        match self {
            MatchMode::Exact => column == alias,
            MatchMode::CaseInsensitive => column.eq_ignore_ascii_case(alias),
            MatchMode::Contains => column.to_lowercase().contains(&alias.to_lowercase()),
        }
    }
}

/// Known spellings of one canonical column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRule {
    pub aliases: Vec<String>,
    pub mode: MatchMode,
}

impl AliasRule {
    pub fn new(mode: MatchMode, aliases: &[&str]) -> Self {
        Self {
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            mode,
        }
    }

    /// Does this rule accept the given column name?
    pub fn matches(&self, column: &str) -> bool {
        self.aliases.iter().any(|a| self.mode.matches(a, column))
    }
}

/// Canonical column name -> accepted spellings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasTable {
    entries: BTreeMap<String, AliasRule>,
}

impl Default for AliasTable {
    fn default() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            ENTITY_ID.to_string(),
            AliasRule::new(
                MatchMode::CaseInsensitive,
                &["PERNR", "Personnel Number", "PersonnelNumber", "EmpID", "EmployeeID"],
            ),
        );
        entries.insert(SUBTYPE.to_string(), AliasRule::new(MatchMode::Exact, &["SUBTY"]));
        entries.insert(
            TARGET_FIELD.to_string(),
            AliasRule::new(MatchMode::Contains, &["target column", "target field"]),
        );
        entries.insert(
            SOURCE_TABLE.to_string(),
            AliasRule::new(MatchMode::Contains, &["source table"]),
        );
        entries.insert(
            SOURCE_FIELD.to_string(),
            AliasRule::new(MatchMode::Contains, &["technical field", "source field"]),
        );
        entries.insert(
            NOTES.to_string(),
            AliasRule::new(MatchMode::Contains, &["notes", "transformation"]),
        );
        entries.insert(
            DEFAULT_VALUE.to_string(),
            AliasRule::new(MatchMode::Contains, &["default value", "default"]),
        );
        Self { entries }
    }
}

impl AliasTable {
    /// Get the rule for a canonical name
    pub fn rule(&self, canonical: &str) -> Option<&AliasRule> {
        self.entries.get(canonical)
    }

    /// Replace or add the rule for a canonical name
    pub fn set(&mut self, canonical: impl Into<String>, rule: AliasRule) {
        self.entries.insert(canonical.into(), rule);
    }

    /// Find the column standing for `canonical` in `table`.
    ///
    /// Aliases are tried in declaration order and, for each alias, columns
    /// in table order, so the first listed alias has priority.
    pub fn resolve<'t>(&self, canonical: &str, table: &'t Table) -> Option<&'t Column> {
        let rule = self.entries.get(canonical)?;
        rule.aliases.iter().find_map(|alias| {
            table
                .columns
                .iter()
                .find(|c| rule.mode.matches(alias, &c.name))
        })
    }

    /// All columns standing for `canonical`, in table order
    pub fn resolve_all<'t>(&self, canonical: &str, table: &'t Table) -> Vec<&'t Column> {
        match self.entries.get(canonical) {
            Some(rule) => table.columns.iter().filter(|c| rule.matches(&c.name)).collect(),
            None => Vec::new(),
        }
    }

    /// Human-readable list of aliases, for error messages
    pub fn describe(&self, canonical: &str) -> String {
        self.entries
            .get(canonical)
            .map(|r| r.aliases.join(", "))
            .unwrap_or_default()
    }
}
