//! Build one output record per entity of the primary table

use crate::alias;
use crate::compiler::{FieldRule, TransformSpec};
use crate::diagnostics::Diagnostic;
use crate::error::{ConfigError, Result};
use crate::index::SourceIndex;
use crate::resolver::{BoundRule, MissReason, Resolution, ValueResolver};
use crate::settings::Settings;
use crate::table::{CellValue, RowRef, Table};
use crate::transform::TransformationPipeline;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Resolved target fields of one entity, in declared field order
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    pub entity_id: String,
    pub values: Vec<(String, Option<CellValue>)>,
}

impl OutputRecord {
    /// Value of a target field; `None` for null or unknown fields
    pub fn get(&self, field: &str) -> Option<&CellValue> {
        self.values
            .iter()
            .find(|(name, _)| name == field)
            .and_then(|(_, value)| value.as_ref())
    }
}

/// Serialized as a flat `{field: value}` object
impl Serialize for OutputRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (field, value) in &self.values {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

/// The flat output table: one record per entity
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputTable {
    /// Target field names in first-declared order
    pub columns: Vec<String>,
    pub records: Vec<OutputRecord>,
}

impl OutputTable {
    /// Get the number of records
    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    /// Values of one column across all records
    pub fn column_values<'s>(&'s self, field: &'s str) -> impl Iterator<Item = Option<&'s CellValue>> + 's {
        self.records.iter().map(move |r| r.get(field))
    }
}

/// Counts of resolution outcomes over a pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PassSummary {
    pub entities: usize,
    pub rules: usize,
    /// Source cells holding a value
    pub found: usize,
    /// Source cells present but null
    pub null_cells: usize,
    /// Misses by reason
    pub missing: BTreeMap<MissReason, usize>,
    /// Misses that were filled from a rule default
    pub defaults_used: usize,
}

impl PassSummary {
    fn record(&mut self, resolution: &Resolution) {
        match resolution {
            Resolution::Found(_) => self.found += 1,
            Resolution::Null => self.null_cells += 1,
            Resolution::Missing { reason, default } => {
                *self.missing.entry(*reason).or_default() += 1;
                if default.is_some() {
                    self.defaults_used += 1;
                }
            }
        }
    }
}

/// Output of [`assemble`]
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub output: OutputTable,
    pub summary: PassSummary,
    pub diagnostics: Vec<Diagnostic>,
}

/// Distinct, non-null entity ids of the primary table in first-seen order.
///
/// Fails if the table has no recognizable id column.
pub fn entity_ids(primary: &Table, settings: &Settings) -> Result<Vec<String>> {
    let id_col = settings
        .aliases
        .resolve(alias::ENTITY_ID, primary)
        .ok_or_else(|| ConfigError::MissingIdColumn {
            table: primary.name.clone(),
            aliases: settings.aliases.describe(alias::ENTITY_ID),
        })?;

    let mut seen = HashSet::new();
    Ok(primary
        .rows
        .iter()
        .filter_map(|row| row.get(id_col.index).and_then(CellValue::canonical_key))
        .filter(|id| seen.insert(id.clone()))
        .collect())
}

/// Bound rules whose source table matches nothing in the index
pub fn unresolved_rules(bound: &[BoundRule<'_>]) -> Vec<Diagnostic> {
    bound
        .iter()
        .filter(|b| b.table.is_none())
        .filter_map(|b| {
            let source_table = b.rule.source_table.as_ref()?;
            Some(Diagnostic::UnresolvedRule {
                target_field: b.rule.target_field.clone(),
                source_table: source_table.clone(),
            })
        })
        .collect()
}

/// Resolve and transform every rule for every entity of `primary`.
///
/// Entity ids are validated before any record is built, so a missing id
/// column aborts without partial output. Rules are bound to their table and
/// column once; each record is complete when it is appended.
pub fn assemble(
    primary: &Table,
    rules: &[FieldRule],
    index: &SourceIndex<'_>,
    pipeline: &TransformationPipeline,
    settings: &Settings,
) -> Result<Assembly> {
    let ids = entity_ids(primary, settings)?;

    let resolver = ValueResolver::new(index);
    let bound: Vec<BoundRule<'_>> = rules.iter().map(|rule| resolver.bind(rule)).collect();
    let primary_key = index.key_for(primary);

    let mut assembly = Assembly {
        output: OutputTable {
            columns: rules.iter().map(|r| r.target_field.clone()).collect(),
            records: Vec::with_capacity(ids.len()),
        },
        summary: PassSummary {
            entities: ids.len(),
            rules: rules.len(),
            ..PassSummary::default()
        },
        diagnostics: unresolved_rules(&bound),
    };
    for diagnostic in &assembly.diagnostics {
        diagnostic.emit();
    }

    for id in ids {
        let primary_row = primary_key.and_then(|key| index.lookup_canonical(key, &id, None));

        let mut values = Vec::with_capacity(bound.len());
        for rule in &bound {
            let resolution = resolver.resolve_bound(&id, rule);
            assembly.summary.record(&resolution);

            if settings.strict_rows {
                if let Some(diagnostic) = check_row_ambiguity(index, rule, &id) {
                    diagnostic.emit();
                    assembly.diagnostics.push(diagnostic);
                }
            }

            let value = field_value(pipeline, rule.rule, resolution, primary_row);
            values.push((rule.rule.target_field.clone(), value));
        }

        assembly.output.records.push(OutputRecord {
            entity_id: id,
            values,
        });
    }

    tracing::debug!(
        entities = assembly.summary.entities,
        rules = assembly.summary.rules,
        found = assembly.summary.found,
        "assembled output records"
    );

    Ok(assembly)
}

/// Final value of one field. Defaults are substituted verbatim; concat
/// reads the primary row whatever the rule's own source cell holds.
fn field_value(
    pipeline: &TransformationPipeline,
    rule: &FieldRule,
    resolution: Resolution,
    primary_row: Option<RowRef<'_>>,
) -> Option<CellValue> {
    match (&rule.transform, resolution) {
        (TransformSpec::Concat { .. }, _) => pipeline.apply(None, &rule.transform, primary_row),
        (spec, Resolution::Found(raw)) => pipeline.apply(Some(&raw), spec, primary_row),
        (_, Resolution::Null) => None,
        (_, Resolution::Missing { default, .. }) => default,
    }
}

/// Several rows competing for one lookup, with or without a subtype
fn check_row_ambiguity(index: &SourceIndex<'_>, rule: &BoundRule<'_>, id: &str) -> Option<Diagnostic> {
    let key = rule.table?;
    let subtype = rule.subtype.as_deref().filter(|_| index.has_subtype(key));
    let rows = index.candidate_count(key, id, subtype);
    (rows > 1).then(|| Diagnostic::AmbiguousRow {
        table: index.table(key).name.clone(),
        entity_id: id.to_string(),
        target_field: rule.rule.target_field.clone(),
        subtype: subtype.map(str::to_string),
        rows,
    })
}
