//! Fetch the raw value of one field rule for one entity

use crate::compiler::FieldRule;
use crate::index::{SourceIndex, TableKey};
use crate::table::{canonical_key_str, CellValue};
use serde::Serialize;

/// Why a rule produced no source cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    /// The rule has no source table or no source field
    NoSource,
    /// The source table matches no indexed table
    UnresolvedTable,
    /// The entity has no (matching) row in the source table
    MissingRow,
    /// The row exists but the source column does not
    MissingColumn,
}

/// Outcome of resolving a rule for an entity
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The source cell holds a value
    Found(CellValue),
    /// The source cell exists but is null; defaults do not apply
    Null,
    /// No source cell; carries the rule's default, if any
    Missing {
        reason: MissReason,
        default: Option<CellValue>,
    },
}

impl Resolution {
    /// Collapse to the raw value: found value, default, or nothing
    pub fn into_raw(self) -> Option<CellValue> {
        match self {
            Resolution::Found(value) => Some(value),
            Resolution::Null => None,
            Resolution::Missing { default, .. } => default,
        }
    }
}

/// A rule with its source table, column and subtype located once per pass
#[derive(Debug, Clone)]
pub struct BoundRule<'r> {
    pub rule: &'r FieldRule,
    /// Indexed table the rule reads from
    pub table: Option<TableKey>,
    /// Index of the source column in that table
    pub column: Option<usize>,
    /// Subtype in canonical key form
    pub subtype: Option<String>,
}

/// Resolves field rules against a [`SourceIndex`]
#[derive(Debug, Clone, Copy)]
pub struct ValueResolver<'i, 'a> {
    index: &'i SourceIndex<'a>,
}

impl<'i, 'a> ValueResolver<'i, 'a> {
    pub fn new(index: &'i SourceIndex<'a>) -> Self {
        Self { index }
    }

    /// The indexed table a rule reads from, if it can be found
    pub fn source_table(&self, rule: &FieldRule) -> Option<TableKey> {
        rule.source_table
            .as_deref()
            .and_then(|name| self.index.find_table(name))
    }

    /// Locate a rule's table and column so that resolving it per entity is
    /// a pair of hash lookups
    pub fn bind<'r>(&self, rule: &'r FieldRule) -> BoundRule<'r> {
        let table = self.source_table(rule);
        let column = table
            .zip(rule.source_field.as_deref())
            .and_then(|(key, field)| self.index.table(key).find_column_tolerant(field))
            .map(|c| c.index);

        BoundRule {
            rule,
            table,
            column,
            subtype: rule.subtype.as_deref().and_then(canonical_key_str),
        }
    }

    /// Raw value of `rule` for `entity_id`: the cell value, or the default
    /// when the table, row or column is missing. A null cell gives `None`
    /// even when the rule has a default.
    pub fn resolve(&self, entity_id: &str, rule: &FieldRule) -> Option<CellValue> {
        self.resolution(entity_id, rule).into_raw()
    }

    /// Like [`ValueResolver::resolve`], keeping the reason for a miss
    pub fn resolution(&self, entity_id: &str, rule: &FieldRule) -> Resolution {
        let id = canonical_key_str(entity_id).unwrap_or_default();
        self.resolve_bound(&id, &self.bind(rule))
    }

    /// Resolve a bound rule for an entity id in canonical key form
    pub fn resolve_bound(&self, id: &str, bound: &BoundRule<'_>) -> Resolution {
        let rule = bound.rule;
        let missing = |reason| Resolution::Missing {
            reason,
            default: rule.default.clone().map(CellValue::String),
        };

        if rule.source_table.is_none() || rule.source_field.is_none() {
            return missing(MissReason::NoSource);
        }

        let Some(key) = bound.table else {
            return missing(MissReason::UnresolvedTable);
        };

        let Some(row) = self.index.lookup_canonical(key, id, bound.subtype.as_deref()) else {
            return missing(MissReason::MissingRow);
        };

        match bound.column.and_then(|index| row.cell(index)) {
            None => missing(MissReason::MissingColumn),
            Some(cell) if cell.is_null() => Resolution::Null,
            Some(cell) => Resolution::Found(cell.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_csv_str;
    use crate::settings::Settings;
    use crate::table::Table;

    fn tables() -> Vec<Table> {
        vec![
            parse_csv_str("PERNR,VORNA,GESCH\n1001,Jane,2\n1002,,1\n", "PA0002").unwrap(),
            parse_csv_str(
                "PERNR,SUBTY,USRID_LONG\n1001,10,jane@example.com\n1002,20,555-0100\n",
                "PA0105",
            )
            .unwrap(),
        ]
    }

    #[test]
    fn test_resolve_found() {
        let tables = tables();
        let index = SourceIndex::build(&tables, &Settings::default());
        let resolver = ValueResolver::new(&index);

        let rule = FieldRule::new("firstName", "PA0002", "vorna");
        assert_eq!(
            resolver.resolve("1001", &rule),
            Some(CellValue::String("Jane".to_string()))
        );
    }

    #[test]
    fn test_missing_row_uses_default() {
        let tables = tables();
        let index = SourceIndex::build(&tables, &Settings::default());
        let resolver = ValueResolver::new(&index);

        let rule = FieldRule::new("email", "PA0105", "USRID_LONG")
            .with_subtype("10")
            .with_default("");

        assert_eq!(
            resolver.resolution("1003", &rule),
            Resolution::Missing {
                reason: MissReason::MissingRow,
                default: Some(CellValue::String(String::new())),
            }
        );
        assert_eq!(resolver.resolve("1003", &rule), Some(CellValue::String(String::new())));
        // Entity exists but not with that subtype
        assert_eq!(resolver.resolve("1002", &rule), Some(CellValue::String(String::new())));
    }

    #[test]
    fn test_null_cell_ignores_default() {
        let tables = tables();
        let index = SourceIndex::build(&tables, &Settings::default());
        let resolver = ValueResolver::new(&index);

        let rule = FieldRule::new("firstName", "PA0002", "VORNA").with_default("Unknown");

        assert_eq!(resolver.resolution("1002", &rule), Resolution::Null);
        assert_eq!(resolver.resolve("1002", &rule), None);
    }

    #[test]
    fn test_missing_row_without_default_is_none() {
        let tables = tables();
        let index = SourceIndex::build(&tables, &Settings::default());
        let resolver = ValueResolver::new(&index);

        let rule = FieldRule::new("firstName", "PA0002", "VORNA");
        assert_eq!(resolver.resolve("9999", &rule), None);
    }

    #[test]
    fn test_unresolved_table_and_missing_column() {
        let tables = tables();
        let index = SourceIndex::build(&tables, &Settings::default());
        let resolver = ValueResolver::new(&index);

        let rule = FieldRule::new("salary", "PA0008", "BET01").with_default("0");
        assert_eq!(
            resolver.resolution("1001", &rule),
            Resolution::Missing {
                reason: MissReason::UnresolvedTable,
                default: Some(CellValue::String("0".to_string())),
            }
        );
        assert!(resolver.source_table(&rule).is_none());

        let rule = FieldRule::new("title", "PA0002", "TITEL");
        assert_eq!(
            resolver.resolution("1001", &rule),
            Resolution::Missing {
                reason: MissReason::MissingColumn,
                default: None,
            }
        );
    }

    #[test]
    fn test_rule_without_source() {
        let tables = tables();
        let index = SourceIndex::build(&tables, &Settings::default());
        let resolver = ValueResolver::new(&index);

        let mut rule = FieldRule::new("displayName", "PA0002", "VORNA");
        rule.source_field = None;

        assert!(matches!(
            resolver.resolution("1001", &rule),
            Resolution::Missing {
                reason: MissReason::NoSource,
                ..
            }
        ));
    }

    #[test]
    fn test_bind_locates_table_and_column_once() {
        let tables = tables();
        let index = SourceIndex::build(&tables, &Settings::default());
        let resolver = ValueResolver::new(&index);

        let rule = FieldRule::new("email", "pa0105", "usrid_long").with_subtype("0010");
        let bound = resolver.bind(&rule);

        assert_eq!(bound.table, index.find_table("PA0105"));
        assert_eq!(bound.column, Some(2));
        assert_eq!(bound.subtype.as_deref(), Some("10"));
        assert_eq!(
            resolver.resolve_bound("1001", &bound),
            Resolution::Found(CellValue::String("jane@example.com".to_string()))
        );

        let salary_rule = FieldRule::new("salary", "PA0008", "BET01");
        let unbound = resolver.bind(&salary_rule);
        assert_eq!(unbound.table, None);
        assert_eq!(unbound.column, None);
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let tables = tables();
        let index = SourceIndex::build(&tables, &Settings::default());
        let resolver = ValueResolver::new(&index);
        let rule = FieldRule::new("gender", "PA0002", "GESCH");

        let first = resolver.resolve("1001", &rule);
        for _ in 0..10 {
            assert_eq!(resolver.resolve("1001", &rule), first);
        }
    }
}
