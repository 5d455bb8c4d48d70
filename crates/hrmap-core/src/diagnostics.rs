//! Non-fatal conditions collected during a pass
//!
//! None of these abort a pass. They are logged as warnings when produced and
//! handed back to the caller for an optional diagnostics summary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-fatal condition observed while classifying, compiling or resolving
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// More than one table matched a singleton role; the first one was kept
    AmbiguousClassification {
        role: String,
        chosen: String,
        ignored: String,
    },
    /// A rule names a source table that matches no loaded table
    UnresolvedRule {
        target_field: String,
        source_table: String,
    },
    /// A later mapping row replaced an earlier rule for the same target field
    DuplicateTarget { target_field: String, row: usize },
    /// A lookup saw several candidate rows for one entity (strict mode only)
    AmbiguousRow {
        table: String,
        entity_id: String,
        target_field: String,
        /// Subtype the rows share, if the lookup used one
        subtype: Option<String>,
        rows: usize,
    },
}

impl Diagnostic {
    /// Log this diagnostic as a warning
    pub fn emit(&self) {
        tracing::warn!("{}", self);
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::AmbiguousClassification {
                role,
                chosen,
                ignored,
            } => write!(
                f,
                "tables '{}' and '{}' both look like the {} table; using '{}'",
                chosen, ignored, role, chosen
            ),
            Diagnostic::UnresolvedRule {
                target_field,
                source_table,
            } => write!(
                f,
                "rule for '{}' names source table '{}' which is not loaded",
                target_field, source_table
            ),
            Diagnostic::DuplicateTarget { target_field, row } => write!(
                f,
                "mapping row {} redefines target field '{}'; the later row wins",
                row, target_field
            ),
            Diagnostic::AmbiguousRow {
                table,
                entity_id,
                target_field,
                subtype: Some(code),
                rows,
            } => write!(
                f,
                "entity {} has {} rows with subtype {} in '{}' for '{}'; using the first",
                entity_id, rows, code, table, target_field
            ),
            Diagnostic::AmbiguousRow {
                table,
                entity_id,
                target_field,
                subtype: None,
                rows,
            } => write!(
                f,
                "entity {} has {} rows in '{}' and no subtype for '{}'; using the first",
                entity_id, rows, table, target_field
            ),
        }
    }
}
