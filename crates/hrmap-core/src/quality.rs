//! Per-field completeness statistics over a finished output table

use crate::assembler::OutputTable;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Completeness of one output column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCompleteness {
    pub field: String,
    pub non_null_count: usize,
    /// Percentage of records with a value, rounded to 2 decimals
    pub completeness_percent: f64,
}

/// Data quality report for one pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub generated_at: DateTime<Utc>,
    pub total_records: usize,
    pub fields: Vec<FieldCompleteness>,
    /// Mean of the per-field percentages, rounded to 2 decimals
    pub average_completeness: f64,
}

impl QualityReport {
    /// Build the report for an output table
    pub fn from_output(output: &OutputTable) -> Self {
        let total_records = output.row_count();

        let fields: Vec<FieldCompleteness> = output
            .columns
            .iter()
            .map(|field| {
                let non_null_count = output
                    .column_values(field)
                    .filter(|v| v.is_some_and(|c| !c.is_null()))
                    .count();
                FieldCompleteness {
                    field: field.clone(),
                    non_null_count,
                    completeness_percent: percent(non_null_count, total_records),
                }
            })
            .collect();

        let average_completeness = if fields.is_empty() {
            0.0
        } else {
            round2(fields.iter().map(|f| f.completeness_percent).sum::<f64>() / fields.len() as f64)
        };

        Self {
            generated_at: Utc::now(),
            total_records,
            fields,
            average_completeness,
        }
    }

    /// Fields sorted by completeness, most complete first
    pub fn ranked(&self) -> Vec<&FieldCompleteness> {
        let mut ranked: Vec<_> = self.fields.iter().collect();
        ranked.sort_by(|a, b| b.completeness_percent.total_cmp(&a.completeness_percent));
        ranked
    }
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(count as f64 / total as f64 * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
