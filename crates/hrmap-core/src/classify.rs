//! Assign each input table a role from its name and column signature

use crate::alias;
use crate::diagnostics::Diagnostic;
use crate::settings::Settings;
use crate::table::Table;
use serde::Serialize;
use std::fmt;

/// Role of a table within a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableRole {
    MappingConfig,
    PrimaryEntity,
    SatelliteEntity,
    Lookup,
    Unclassified,
}

impl fmt::Display for TableRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TableRole::MappingConfig => "mapping",
            TableRole::PrimaryEntity => "primary",
            TableRole::SatelliteEntity => "satellite",
            TableRole::Lookup => "lookup",
            TableRole::Unclassified => "unclassified",
        };
        f.write_str(s)
    }
}

/// Tables grouped by role. Holds references; no table data is copied.
#[derive(Debug, Default)]
pub struct Classification<'a> {
    pub mapping: Option<&'a Table>,
    pub primary: Option<&'a Table>,
    pub satellites: Vec<&'a Table>,
    pub lookups: Vec<&'a Table>,
    pub unclassified: Vec<&'a Table>,
    /// Ambiguity warnings for singleton roles
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> Classification<'a> {
    /// Role assigned to the named table, if it was part of the input
    pub fn role_of(&self, name: &str) -> Option<TableRole> {
        let is = |t: &&Table| t.name == name;
        if self.mapping.as_ref().is_some_and(is) {
            Some(TableRole::MappingConfig)
        } else if self.primary.as_ref().is_some_and(is) {
            Some(TableRole::PrimaryEntity)
        } else if self.satellites.iter().any(is) {
            Some(TableRole::SatelliteEntity)
        } else if self.lookups.iter().any(is) {
            Some(TableRole::Lookup)
        } else if self.unclassified.iter().any(is) {
            Some(TableRole::Unclassified)
        } else {
            None
        }
    }

    /// Primary table first, then satellites in input order
    pub fn entity_tables(&self) -> impl Iterator<Item = &'a Table> + '_ {
        self.primary.into_iter().chain(self.satellites.iter().copied())
    }
}

/// Classify tables by structural signature.
///
/// Checks run in this order, first match wins: mapping signature or sheet
/// name, primary table name, lookup marker, entity id column (satellite).
/// When a second table matches a singleton role the first one is kept and a
/// warning is recorded; a losing mapping candidate becomes unclassified, a losing
/// primary candidate is demoted to satellite if it has an id column.
pub fn classify<'a>(tables: &'a [Table], settings: &Settings) -> Classification<'a> {
    let mut result = Classification::default();

    for table in tables {
        let has_id = settings.aliases.resolve(alias::ENTITY_ID, table).is_some();

        if is_mapping_table(table, settings) {
            match result.mapping {
                None => result.mapping = Some(table),
                Some(chosen) => {
                    push_ambiguity(&mut result.diagnostics, TableRole::MappingConfig, chosen, table);
                    result.unclassified.push(table);
                }
            }
        } else if is_primary_name(&table.name, settings) {
            match result.primary {
                None => result.primary = Some(table),
                Some(chosen) => {
                    push_ambiguity(&mut result.diagnostics, TableRole::PrimaryEntity, chosen, table);
                    if has_id {
                        result.satellites.push(table);
                    } else {
                        result.unclassified.push(table);
                    }
                }
            }
        } else if is_lookup_name(&table.name, settings) {
            result.lookups.push(table);
        } else if has_id {
            result.satellites.push(table);
        } else {
            result.unclassified.push(table);
        }
    }

    tracing::debug!(
        mapping = result.mapping.map(|t| t.name.as_str()),
        primary = result.primary.map(|t| t.name.as_str()),
        satellites = result.satellites.len(),
        lookups = result.lookups.len(),
        unclassified = result.unclassified.len(),
        "classified tables"
    );

    result
}

fn push_ambiguity(diagnostics: &mut Vec<Diagnostic>, role: TableRole, chosen: &Table, ignored: &Table) {
    let diagnostic = Diagnostic::AmbiguousClassification {
        role: role.to_string(),
        chosen: chosen.name.clone(),
        ignored: ignored.name.clone(),
    };
    diagnostic.emit();
    diagnostics.push(diagnostic);
}

/// A mapping table has both a target-field and a source-table column, as
/// the compiler resolves them, or carries one of the configured sheet names.
fn is_mapping_table(table: &Table, settings: &Settings) -> bool {
    let has = |canonical: &str| settings.aliases.resolve(canonical, table).is_some();
    if has(alias::TARGET_FIELD) && has(alias::SOURCE_TABLE) {
        return true;
    }
    let name = table.name.trim();
    settings
        .mapping_table_names
        .iter()
        .any(|n| n.eq_ignore_ascii_case(name))
}

fn is_primary_name(name: &str, settings: &Settings) -> bool {
    let upper = name.to_uppercase();
    settings
        .primary_table_prefixes
        .iter()
        .any(|p| upper.starts_with(&p.to_uppercase()))
        || settings
            .primary_table_keywords
            .iter()
            .any(|k| upper.contains(&k.to_uppercase()))
}

fn is_lookup_name(name: &str, settings: &Settings) -> bool {
    let upper = name.to_uppercase();
    settings
        .lookup_table_markers
        .iter()
        .any(|m| upper.contains(&m.to_uppercase()))
}
