//! Per-table entity/subtype index over primary and satellite tables
//!
//! Built once per pass so that resolving a field is a hash lookup instead of
//! a rescan of the source table. The index stores row references only.

use crate::alias;
use crate::settings::Settings;
use crate::table::{canonical_key_str, RowRef, Table};
use std::collections::HashMap;

/// Handle to one indexed table, returned by [`SourceIndex::find_table`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableKey(usize);

/// Rows of one entity within one table
#[derive(Debug, Default)]
struct EntityRows {
    /// Row indices in input order
    rows: Vec<usize>,
    /// Subtype code -> row indices with that code, in input order
    by_subtype: HashMap<String, Vec<usize>>,
}

#[derive(Debug)]
struct IndexedTable<'a> {
    table: &'a Table,
    /// Lower-cased table name for reference matching
    name: String,
    has_subtype: bool,
    entities: HashMap<String, EntityRows>,
}

impl<'a> IndexedTable<'a> {
    fn build(table: &'a Table, settings: &Settings) -> Option<Self> {
        let id_col = settings.aliases.resolve(alias::ENTITY_ID, table)?.index;
        let subtype_col = settings.aliases.resolve(alias::SUBTYPE, table).map(|c| c.index);

        let mut entities: HashMap<String, EntityRows> = HashMap::new();
        for (row_idx, row) in table.rows.iter().enumerate() {
            let Some(id) = row.get(id_col).and_then(|c| c.canonical_key()) else {
                continue;
            };
            let entry = entities.entry(id).or_default();
            entry.rows.push(row_idx);

            if let Some(code) = subtype_col
                .and_then(|c| row.get(c))
                .and_then(|c| c.canonical_key())
            {
                entry.by_subtype.entry(code).or_default().push(row_idx);
            }
        }

        Some(Self {
            table,
            name: table.name.to_lowercase(),
            has_subtype: subtype_col.is_some(),
            entities,
        })
    }
}

/// Lookup structure over all entity-bearing tables of a pass
#[derive(Debug, Default)]
pub struct SourceIndex<'a> {
    tables: Vec<IndexedTable<'a>>,
}

impl<'a> SourceIndex<'a> {
    /// Index every table that has an entity id column.
    ///
    /// Tables without one are skipped with a warning. Input order is kept
    /// and decides ties in [`SourceIndex::find_table`].
    pub fn build<I>(tables: I, settings: &Settings) -> Self
    where
        I: IntoIterator<Item = &'a Table>,
    {
        let mut indexed = Vec::new();
        for table in tables {
            match IndexedTable::build(table, settings) {
                Some(t) => {
                    tracing::debug!(
                        table = %table.name,
                        entities = t.entities.len(),
                        subtyped = t.has_subtype,
                        "indexed table"
                    );
                    indexed.push(t);
                }
                None => tracing::warn!(table = %table.name, "no entity id column, table not indexed"),
            }
        }
        Self { tables: indexed }
    }

    /// Number of indexed tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Find the indexed table a rule's source-table reference points at.
    ///
    /// Case-insensitive exact name match first, then containment in either
    /// direction ("PA0105" matches "PA0105_Communication" and vice versa).
    pub fn find_table(&self, reference: &str) -> Option<TableKey> {
        let reference = reference.trim().to_lowercase();
        if reference.is_empty() {
            return None;
        }

        self.tables
            .iter()
            .position(|t| t.name == reference)
            .or_else(|| {
                self.tables
                    .iter()
                    .position(|t| t.name.contains(&reference) || reference.contains(t.name.as_str()))
            })
            .map(TableKey)
    }

    /// Key of an indexed table, by identity
    pub fn key_for(&self, table: &Table) -> Option<TableKey> {
        self.tables
            .iter()
            .position(|t| std::ptr::eq(t.table, table))
            .map(TableKey)
    }

    /// The table behind a key
    pub fn table(&self, key: TableKey) -> &'a Table {
        self.tables[key.0].table
    }

    /// Whether the table has a subtype column
    pub fn has_subtype(&self, key: TableKey) -> bool {
        self.tables[key.0].has_subtype
    }

    /// Fetch the row for an entity, optionally narrowed by subtype.
    ///
    /// With a subtype on a subtyped table, the first row carrying that code
    /// is returned. Without a subtype, or on a table that has no subtype
    /// column, the entity's first row in input order is returned.
    pub fn lookup(&self, key: TableKey, entity_id: &str, subtype: Option<&str>) -> Option<RowRef<'a>> {
        let id = canonical_key_str(entity_id)?;
        let subtype = subtype.and_then(canonical_key_str);
        self.lookup_canonical(key, &id, subtype.as_deref())
    }

    /// [`SourceIndex::lookup`] for an id and subtype already in canonical key form
    pub fn lookup_canonical(&self, key: TableKey, id: &str, subtype: Option<&str>) -> Option<RowRef<'a>> {
        let row_idx = *self.candidates(key, id, subtype)?.first()?;
        self.tables[key.0].table.row_ref(row_idx)
    }

    /// How many rows a canonical lookup chose from; more than one means the
    /// first row in input order was picked among several
    pub fn candidate_count(&self, key: TableKey, id: &str, subtype: Option<&str>) -> usize {
        self.candidates(key, id, subtype).map_or(0, |rows| rows.len())
    }

    fn candidates(&self, key: TableKey, id: &str, subtype: Option<&str>) -> Option<&[usize]> {
        let indexed = &self.tables[key.0];
        let rows = indexed.entities.get(id)?;
        match subtype {
            Some(code) if indexed.has_subtype => rows.by_subtype.get(code).map(Vec::as_slice),
            _ => Some(rows.rows.as_slice()),
        }
    }

    /// Number of rows an entity has in a table
    pub fn row_count(&self, key: TableKey, entity_id: &str) -> usize {
        canonical_key_str(entity_id)
            .and_then(|id| self.tables[key.0].entities.get(&id))
            .map_or(0, |rows| rows.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_csv_str;
    use crate::table::CellValue;

    fn tables() -> Vec<Table> {
        vec![
            parse_csv_str("PERNR,VORNA\n1001,Jane\n1002,John\n", "PA0002").unwrap(),
            parse_csv_str(
                "PERNR,SUBTY,USRID_LONG\n\
                 00001001,0010,jane@example.com\n\
                 1001,0020,+49 30 1234\n\
                 1001,10,second@example.com\n\
                 1002,20,+49 40 5678\n",
                "PA0105_Communication",
            )
            .unwrap(),
        ]
    }

    fn value(row: Option<RowRef<'_>>, column: &str) -> Option<String> {
        row.and_then(|r| r.get(column)).map(CellValue::to_string_value)
    }

    #[test]
    fn test_find_table_exact_and_substring() {
        let tables = tables();
        let index = SourceIndex::build(&tables, &Settings::default());

        assert_eq!(index.find_table("pa0002"), Some(TableKey(0)));
        assert_eq!(index.find_table("PA0105"), Some(TableKey(1)));
        assert_eq!(index.find_table("PA0105_Communication_v2"), Some(TableKey(1)));
        assert_eq!(index.find_table("PA0008"), None);
        assert_eq!(index.find_table("  "), None);
    }

    #[test]
    fn test_lookup_with_subtype() {
        let tables = tables();
        let index = SourceIndex::build(&tables, &Settings::default());
        let key = index.find_table("PA0105").unwrap();

        assert_eq!(
            value(index.lookup(key, "1001", Some("10")), "USRID_LONG").as_deref(),
            Some("jane@example.com")
        );
        assert_eq!(
            value(index.lookup(key, "1001", Some("0020")), "USRID_LONG").as_deref(),
            Some("+49 30 1234")
        );
        assert!(index.lookup(key, "1002", Some("10")).is_none());
    }

    #[test]
    fn test_lookup_without_subtype_returns_first_row() {
        let tables = tables();
        let index = SourceIndex::build(&tables, &Settings::default());
        let key = index.find_table("PA0105").unwrap();

        assert_eq!(
            value(index.lookup(key, "1001", None), "USRID_LONG").as_deref(),
            Some("jane@example.com")
        );
        assert_eq!(index.row_count(key, "1001"), 3);
    }

    #[test]
    fn test_lookup_ids_across_types() {
        let tables = tables();
        let index = SourceIndex::build(&tables, &Settings::default());
        let key = index.find_table("PA0002").unwrap();

        assert_eq!(value(index.lookup(key, "00001002", None), "VORNA").as_deref(), Some("John"));
        assert_eq!(value(index.lookup(key, "1002.0", None), "VORNA").as_deref(), Some("John"));
        assert!(index.lookup(key, "9999", None).is_none());
    }

    #[test]
    fn test_subtype_ignored_on_table_without_subtype_column() {
        let tables = tables();
        let index = SourceIndex::build(&tables, &Settings::default());
        let key = index.find_table("PA0002").unwrap();

        assert!(!index.has_subtype(key));
        assert_eq!(value(index.lookup(key, "1001", Some("10")), "VORNA").as_deref(), Some("Jane"));
    }

    #[test]
    fn test_tables_without_id_are_skipped() {
        let tables = vec![
            parse_csv_str("Code,Value\n1,Male\n", "LOOKUP_gender").unwrap(),
            parse_csv_str("EmpID,Name\n7,Ann\n", "Extra").unwrap(),
        ];
        let index = SourceIndex::build(&tables, &Settings::default());

        assert_eq!(index.len(), 1);
        assert_eq!(index.key_for(&tables[1]), Some(TableKey(0)));
        assert_eq!(index.key_for(&tables[0]), None);
    }

    #[test]
    fn test_candidate_count_per_subtype() {
        let tables = tables();
        let index = SourceIndex::build(&tables, &Settings::default());
        let key = index.find_table("PA0105").unwrap();

        // Two rows carry subtype 10 for entity 1001
        assert_eq!(index.candidate_count(key, "1001", Some("10")), 2);
        assert_eq!(index.candidate_count(key, "1001", Some("20")), 1);
        assert_eq!(index.candidate_count(key, "1001", None), 3);
        assert_eq!(index.candidate_count(key, "1002", Some("10")), 0);
        assert_eq!(
            value(index.lookup_canonical(key, "1001", Some("10")), "USRID_LONG").as_deref(),
            Some("jane@example.com")
        );
    }

    #[test]
    fn test_null_ids_are_not_indexed() {
        let tables = vec![parse_csv_str("PERNR,VORNA\n,Ghost\n1001,Jane\n", "PA0002").unwrap()];
        let index = SourceIndex::build(&tables, &Settings::default());
        let key = index.key_for(&tables[0]).unwrap();

        assert_eq!(index.row_count(key, "1001"), 1);
        assert!(index.lookup(key, "", None).is_none());
    }
}
