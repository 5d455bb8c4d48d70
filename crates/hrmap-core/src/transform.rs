//! Value transformations selected by a rule's [`TransformSpec`]
//!
//! Transformations never fail. Anything that does not fit the expected shape
//! is passed through unchanged.

use crate::compiler::TransformSpec;
use crate::table::{CellValue, RowRef};
use crate::value_map::ValueMaps;

/// Applies compiled transforms using a set of value maps
#[derive(Debug, Clone, Default)]
pub struct TransformationPipeline {
    value_maps: ValueMaps,
}

impl TransformationPipeline {
    pub fn new(value_maps: ValueMaps) -> Self {
        Self { value_maps }
    }

    pub fn value_maps(&self) -> &ValueMaps {
        &self.value_maps
    }

    /// Transform a raw value.
    ///
    /// A null raw value yields `None` without running the transform, except
    /// for `Concat`, whose inputs are the fields of `entity_row` (the
    /// entity's primary row) rather than the raw value.
    pub fn apply(
        &self,
        raw: Option<&CellValue>,
        spec: &TransformSpec,
        entity_row: Option<RowRef<'_>>,
    ) -> Option<CellValue> {
        let raw = raw.filter(|v| !v.is_null());

        match spec {
            TransformSpec::Concat { fields } => concat(fields, entity_row),
            TransformSpec::None => raw.cloned(),
            TransformSpec::Date8 => raw.map(date8),
            TransformSpec::Lookup { map } => raw.map(|v| self.lookup(map, v)),
        }
    }

    fn lookup(&self, map: &str, raw: &CellValue) -> CellValue {
        match self.value_maps.lookup(map, &raw.to_string_value()) {
            Some(mapped) => CellValue::String(mapped.to_string()),
            None => raw.clone(),
        }
    }
}

/// Render an eight-digit `YYYYMMDD` value as `YYYY-MM-DD`.
///
/// Any other value, including an already formatted date, is returned unchanged.
pub fn date8(raw: &CellValue) -> CellValue {
    let s = raw.to_string_value();
    let s = s.trim();
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        CellValue::String(format!("{}-{}-{}", &s[0..4], &s[4..6], &s[6..8]))
    } else {
        raw.clone()
    }
}

/// Join the named fields of a row with single spaces.
///
/// Missing or null fields count as empty strings. Returns `None` when every
/// field is absent.
pub fn concat(fields: &[String], row: Option<RowRef<'_>>) -> Option<CellValue> {
    let row = row?;
    let parts: Vec<Option<String>> = fields
        .iter()
        .map(|f| {
            row.get(f)
                .filter(|c| !c.is_null())
                .map(CellValue::to_string_value)
        })
        .collect();

    if parts.iter().all(Option::is_none) {
        return None;
    }

    let joined = parts
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect::<Vec<_>>()
        .join(" ");
    Some(CellValue::String(joined.trim().to_string()))
}
