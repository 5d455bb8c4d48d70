//! Compile a mapping-configuration table into field rules
//!
//! The notes column is free text. It is scanned once here; everything
//! downstream works on the tagged [`TransformSpec`] and never looks at the
//! text again.

use crate::alias;
use crate::diagnostics::Diagnostic;
use crate::error::{ConfigError, Result};
use crate::settings::Settings;
use crate::table::{canonical_key_str, CellValue, Column, Row, Table};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

static SUBTYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)subty[\s=:_\-]*(\d+)").expect("valid subtype pattern"));

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)date|yyyymmdd").expect("valid date pattern"));

static CONCAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)concat[a-z]*").expect("valid concat pattern"));

static EXPLICIT_LOOKUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)lookup\s*(?:\(\s*|:\s*)([A-Za-z][A-Za-z0-9_]*)").expect("valid lookup pattern")
});

static TECHNICAL_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][A-Z0-9_]*\b").expect("valid identifier pattern"));

/// Compiled transformation, selected once from the notes text
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformSpec {
    /// Pass the raw value through
    #[default]
    None,
    /// `YYYYMMDD` -> `YYYY-MM-DD`
    Date8,
    /// Categorical normalization through a named value map
    Lookup { map: String },
    /// Join fields of the entity's primary row with spaces
    Concat { fields: Vec<String> },
}

/// One executable target-field rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    /// Target field name, unique within a compiled rule list
    pub target_field: String,
    /// Source table name or fragment of one, e.g. "PA0105"
    pub source_table: Option<String>,
    /// Column to read from the source row
    pub source_field: Option<String>,
    /// Canonical subtype code selecting among an entity's rows
    pub subtype: Option<String>,
    pub transform: TransformSpec,
    /// Substituted when the source table, row or column is missing
    pub default: Option<String>,
}

impl FieldRule {
    /// A pass-through rule reading `table.field`
    pub fn new(target_field: &str, source_table: &str, source_field: &str) -> Self {
        Self {
            target_field: target_field.to_string(),
            source_table: Some(source_table.to_string()),
            source_field: Some(source_field.to_string()),
            subtype: None,
            transform: TransformSpec::None,
            default: None,
        }
    }

    pub fn with_subtype(mut self, subtype: &str) -> Self {
        self.subtype = canonical_key_str(subtype);
        self
    }

    pub fn with_transform(mut self, transform: TransformSpec) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }
}

/// Output of [`compile`]: rules in first-declaration order plus overwrite notices
#[derive(Debug, Clone, Default)]
pub struct CompiledMapping {
    pub rules: Vec<FieldRule>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Located columns of a mapping table
struct MappingColumns<'t> {
    target: &'t Column,
    table: &'t Column,
    field: &'t Column,
    notes: Vec<&'t Column>,
    default: Option<&'t Column>,
}

impl<'t> MappingColumns<'t> {
    fn locate(table: &'t Table, settings: &Settings) -> Result<Self> {
        let required = |canonical: &str, element: &str| {
            settings
                .aliases
                .resolve(canonical, table)
                .ok_or_else(|| ConfigError::MissingColumn {
                    table: table.name.clone(),
                    element: element.to_string(),
                })
        };

        Ok(Self {
            target: required(alias::TARGET_FIELD, "target column")?,
            table: required(alias::SOURCE_TABLE, "source table")?,
            field: required(alias::SOURCE_FIELD, "technical field")?,
            notes: settings.aliases.resolve_all(alias::NOTES, table),
            default: settings.aliases.resolve(alias::DEFAULT_VALUE, table),
        })
    }
}

/// Compile a mapping table into field rules.
///
/// `primary` is the primary entity table, if known; its columns help pick
/// concatenation fields out of free text. Rows without a target field are
/// skipped. When several rows name the
/// same target field the last row wins: its rule replaces the earlier one
/// at the earlier one's position, and a [`Diagnostic::DuplicateTarget`] is
/// recorded.
pub fn compile(mapping: &Table, primary: Option<&Table>, settings: &Settings) -> Result<CompiledMapping> {
    let columns = MappingColumns::locate(mapping, settings)?;

    let mut compiled = CompiledMapping::default();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (row_idx, row) in mapping.rows.iter().enumerate() {
        let Some(rule) = compile_row(row, &columns, primary, settings) else {
            continue;
        };

        match positions.get(&rule.target_field) {
            Some(&pos) => {
                let diagnostic = Diagnostic::DuplicateTarget {
                    target_field: rule.target_field.clone(),
                    row: row_idx + 1,
                };
                diagnostic.emit();
                compiled.diagnostics.push(diagnostic);
                compiled.rules[pos] = rule;
            }
            None => {
                positions.insert(rule.target_field.clone(), compiled.rules.len());
                compiled.rules.push(rule);
            }
        }
    }

    tracing::debug!(
        table = %mapping.name,
        rules = compiled.rules.len(),
        "compiled mapping configuration"
    );

    Ok(compiled)
}

fn compile_row(
    row: &Row,
    columns: &MappingColumns<'_>,
    primary: Option<&Table>,
    settings: &Settings,
) -> Option<FieldRule> {
    let target_field = text(row, columns.target)?;
    let source_table = text(row, columns.table);
    let source_field = text(row, columns.field);

    let notes = columns
        .notes
        .iter()
        .filter_map(|c| text(row, c))
        .collect::<Vec<_>>()
        .join(" ");

    let subtype = parse_subtype(&notes, settings);
    let transform = parse_transform(&notes, source_field.as_deref(), primary, settings);
    let default = columns.default.and_then(|c| text(row, c));

    Some(FieldRule {
        target_field,
        source_table,
        source_field,
        subtype,
        transform,
        default,
    })
}

/// Trimmed, non-empty text of a cell
fn text(row: &Row, column: &Column) -> Option<String> {
    row.get(column.index)
        .filter(|c| !c.is_null())
        .map(CellValue::to_string_value)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extract a subtype code from notes text.
///
/// Explicit `SUBTY` digits win; otherwise the first configured keyword
/// found in the text supplies the code.
pub fn parse_subtype(notes: &str, settings: &Settings) -> Option<String> {
    if let Some(caps) = SUBTYPE_RE.captures(notes) {
        return canonical_key_str(&caps[1]);
    }

    let upper = notes.to_uppercase();
    settings
        .subtype_keywords
        .iter()
        .find(|k| upper.contains(&k.keyword.to_uppercase()))
        .and_then(|k| canonical_key_str(&k.code))
}

/// Select the transform for a rule from its notes text.
///
/// Priority: date, concatenation, categorical lookup, pass-through.
pub fn parse_transform(
    notes: &str,
    source_field: Option<&str>,
    primary: Option<&Table>,
    settings: &Settings,
) -> TransformSpec {
    if notes.is_empty() {
        return TransformSpec::None;
    }

    if DATE_RE.is_match(notes) {
        return TransformSpec::Date8;
    }

    if let Some(m) = CONCAT_RE.find(notes) {
        let fields = concat_fields(&notes[m.end()..], source_field, primary);
        if !fields.is_empty() {
            return TransformSpec::Concat { fields };
        }
        tracing::warn!(notes, "concatenation names no fields, passing value through");
        return TransformSpec::None;
    }

    if let Some(caps) = EXPLICIT_LOOKUP_RE.captures(notes) {
        let name = &caps[1];
        if settings.value_maps.contains(name) {
            return TransformSpec::Lookup {
                map: name.to_string(),
            };
        }
    }

    let lower = notes.to_lowercase();
    settings
        .categorical_keywords
        .iter()
        .find(|k| lower.contains(&k.keyword.to_lowercase()))
        .map(|k| TransformSpec::Lookup { map: k.map.clone() })
        .unwrap_or_default()
}

/// Field names to join, from the text following the concat keyword.
///
/// A parenthesized list wins. Next comes the technical-field cell when it
/// splits on `+`, `,` or `&` into two or more names. Otherwise upper-case
/// words of the text are taken, but only those that look like technical
/// names (a digit or underscore) or name a column of the primary table.
/// A single technical field is the last resort.
fn concat_fields(rest: &str, source_field: Option<&str>, primary: Option<&Table>) -> Vec<String> {
    let trimmed = rest.trim_start();
    if let Some(inner) = trimmed.strip_prefix('(') {
        let inner = inner.split(')').next().unwrap_or_default();
        let fields = split_field_list(inner);
        if !fields.is_empty() {
            return fields;
        }
    }

    let listed = source_field.map(split_field_list).unwrap_or_default();
    if listed.len() >= 2 {
        return listed;
    }

    let named: Vec<String> = TECHNICAL_NAME_RE
        .find_iter(rest)
        .map(|m| m.as_str())
        .filter(|name| is_field_name(name, primary))
        .map(str::to_string)
        .collect();
    if !named.is_empty() {
        return named;
    }

    listed
}

fn is_field_name(word: &str, primary: Option<&Table>) -> bool {
    word.bytes().any(|b| b.is_ascii_digit() || b == b'_')
        || primary.is_some_and(|table| table.find_column_tolerant(word).is_some())
}

fn split_field_list(list: &str) -> Vec<String> {
    list.split(['+', ',', '&'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::parser::parse_csv_str;

    const HEADER: &str = "Target Column (SuccessFactors),Source Table (SAP),Technical Field (SAP),Notes / Transformation,Default Value\n";

    fn compile_csv(body: &str) -> CompiledMapping {
        let table = parse_csv_str(&format!("{HEADER}{body}"), "Mapping").unwrap();
        compile(&table, None, &Settings::default()).unwrap()
    }

    #[test]
    fn test_compile_basic_rules() {
        let compiled = compile_csv(
            "firstName,PA0002,VORNA,,\n\
             dateOfBirth,PA0002,GBDAT,Convert date YYYYMMDD,\n\
             gender,PA0002,GESCH,Map gender codes,\n\
             email,PA0105,USRID_LONG,SUBTY=0010,\n",
        );

        let rules = &compiled.rules;
        assert_eq!(rules.len(), 4);
        assert_eq!(rules[0], FieldRule::new("firstName", "PA0002", "VORNA"));
        assert_eq!(rules[1].transform, TransformSpec::Date8);
        assert_eq!(
            rules[2].transform,
            TransformSpec::Lookup {
                map: "gender".to_string()
            }
        );
        assert_eq!(rules[3].subtype.as_deref(), Some("10"));
        assert_eq!(rules[3].transform, TransformSpec::None);
    }

    #[test]
    fn test_skip_rows_without_target() {
        let compiled = compile_csv(",PA0002,VORNA,,\n  ,PA0002,NACHN,,\nlastName,PA0002,NACHN,,\n");
        assert_eq!(compiled.rules.len(), 1);
        assert_eq!(compiled.rules[0].target_field, "lastName");
    }

    #[test]
    fn test_duplicate_target_last_wins() {
        let compiled = compile_csv(
            "status,PA0000,STAT2,Map status,\n\
             firstName,PA0002,VORNA,,\n\
             status,PA0001,PERSG,,Active\n",
        );

        assert_eq!(compiled.rules.len(), 2);
        let status = &compiled.rules[0];
        assert_eq!(status.target_field, "status");
        assert_eq!(status.source_table.as_deref(), Some("PA0001"));
        assert_eq!(status.source_field.as_deref(), Some("PERSG"));
        assert_eq!(status.transform, TransformSpec::None);
        assert_eq!(status.default.as_deref(), Some("Active"));
        assert_eq!(
            compiled.diagnostics,
            vec![Diagnostic::DuplicateTarget {
                target_field: "status".to_string(),
                row: 3
            }]
        );
    }

    #[test]
    fn test_missing_required_column() {
        let table = parse_csv_str("Target Column,Notes\nx,y\n", "Mapping").unwrap();
        let err = compile(&table, None, &Settings::default()).unwrap_err();

        match err {
            Error::Config(ConfigError::MissingColumn { table, element }) => {
                assert_eq!(table, "Mapping");
                assert_eq!(element, "source table");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_subtype_variants() {
        let settings = Settings::default();
        assert_eq!(parse_subtype("SUBTY 10", &settings).as_deref(), Some("10"));
        assert_eq!(parse_subtype("use subty:0001", &settings).as_deref(), Some("1"));
        assert_eq!(parse_subtype("Subty=0", &settings).as_deref(), Some("0"));
        assert_eq!(parse_subtype("SUBTY_0000", &settings).as_deref(), Some("0"));
        assert_eq!(parse_subtype("no subtype here", &settings), None);
    }

    #[test]
    fn test_parse_subtype_keyword_fallback() {
        let settings = Settings::default();
        assert_eq!(parse_subtype("Business email", &settings).as_deref(), Some("10"));
        assert_eq!(parse_subtype("Phone number", &settings).as_deref(), Some("20"));
        // Explicit digits beat keywords
        assert_eq!(parse_subtype("Email, SUBTY 0030", &settings).as_deref(), Some("30"));
    }

    #[test]
    fn test_transform_priority() {
        let settings = Settings::default();
        // Date beats everything else
        assert_eq!(
            parse_transform("date of status change", None, None, &settings),
            TransformSpec::Date8
        );
        // Concat beats categorical
        let primary = parse_csv_str("PERNR,VORNA,NACHN\n1001,Jane,Doe\n", "PA0002").unwrap();
        assert_eq!(
            parse_transform("Concatenate VORNA + NACHN, gender neutral", None, Some(&primary), &settings),
            TransformSpec::Concat {
                fields: vec!["VORNA".to_string(), "NACHN".to_string()]
            }
        );
        assert_eq!(
            parse_transform("Marital status code", None, None, &settings),
            TransformSpec::Lookup {
                map: "maritalStatus".to_string()
            }
        );
        assert_eq!(
            parse_transform("Employment status", None, None, &settings),
            TransformSpec::Lookup {
                map: "status".to_string()
            }
        );
        assert_eq!(parse_transform("copy as is", None, None, &settings), TransformSpec::None);
        assert_eq!(parse_transform("", None, None, &settings), TransformSpec::None);
    }

    #[test]
    fn test_concat_field_forms() {
        let settings = Settings::default();
        let expected = TransformSpec::Concat {
            fields: vec!["VORNA".to_string(), "NACHN".to_string()],
        };

        assert_eq!(parse_transform("concat(VORNA, NACHN)", None, None, &settings), expected);
        assert_eq!(parse_transform("CONCAT (VORNA & NACHN)", None, None, &settings), expected);
        assert_eq!(
            parse_transform("concatenation of names", Some("VORNA + NACHN"), None, &settings),
            expected
        );
        assert_eq!(parse_transform("concat", None, None, &settings), TransformSpec::None);
    }

    #[test]
    fn test_concat_ignores_all_caps_prose() {
        let settings = Settings::default();
        let primary = parse_csv_str("PERNR,VORNA,NACHN\n1001,Jane,Doe\n", "PA0002").unwrap();
        let expected = TransformSpec::Concat {
            fields: vec!["VORNA".to_string(), "NACHN".to_string()],
        };

        // The technical-field list beats words of the notes
        assert_eq!(
            parse_transform(
                "CONCATENATE FIRST AND LAST NAME",
                Some("VORNA + NACHN"),
                Some(&primary),
                &settings
            ),
            expected
        );
        // Words are kept only when they name primary columns or look technical
        assert_eq!(
            parse_transform("CONCAT VORNA AND NACHN", Some("VORNA"), Some(&primary), &settings),
            expected
        );
        assert_eq!(
            parse_transform("CONCAT FIRST NAME WITH USRID_LONG", None, None, &settings),
            TransformSpec::Concat {
                fields: vec!["USRID_LONG".to_string()]
            }
        );
        // Nothing usable in the prose: fall back to the single technical field
        assert_eq!(
            parse_transform("CONCATENATE NAMES", Some("VORNA"), None, &settings),
            TransformSpec::Concat {
                fields: vec!["VORNA".to_string()]
            }
        );
    }

    #[test]
    fn test_explicit_lookup() {
        let mut settings = Settings::default();
        settings.value_maps.insert_map("country", &[("DE", "Germany")]);

        assert_eq!(
            parse_transform("lookup(country)", None, None, &settings),
            TransformSpec::Lookup {
                map: "country".to_string()
            }
        );
        assert_eq!(
            parse_transform("lookup: gender", None, None, &settings),
            TransformSpec::Lookup {
                map: "gender".to_string()
            }
        );
        // Unknown map falls through to keyword scanning
        assert_eq!(parse_transform("lookup(unknown)", None, None, &settings), TransformSpec::None);
    }

    #[test]
    fn test_notes_and_transformation_columns_are_combined() {
        let csv = "Target Field,Source Table,Source Field,Transformation,Notes\n\
                   email,PA0105,USRID_LONG,,SUBTY 10\n\
                   birth,PA0002,GBDAT,Date,\n";
        let table = parse_csv_str(csv, "Mapping").unwrap();
        let compiled = compile(&table, None, &Settings::default()).unwrap();

        assert_eq!(compiled.rules[0].subtype.as_deref(), Some("10"));
        assert_eq!(compiled.rules[1].transform, TransformSpec::Date8);
    }

    #[test]
    fn test_transform_json_shape() {
        let spec = TransformSpec::Lookup {
            map: "gender".to_string(),
        };
        let json = serde_json::to_string(&spec).unwrap();
        assert_eq!(json, r#"{"kind":"lookup","map":"gender"}"#);
    }
}
