//! One complete mapping pass over a set of loaded tables
//!
//! Phases run strictly in order: classify, compile, index, assemble. Any
//! configuration error aborts the pass before records are produced.

use crate::assembler::{assemble, OutputTable, PassSummary};
use crate::classify::{classify, Classification};
use crate::compiler::{compile, CompiledMapping, FieldRule};
use crate::diagnostics::Diagnostic;
use crate::error::{ConfigError, Result};
use crate::index::SourceIndex;
use crate::settings::Settings;
use crate::table::Table;
use crate::transform::TransformationPipeline;

/// Everything a pass produces
#[derive(Debug, Clone)]
pub struct PassOutput {
    pub output: OutputTable,
    /// Compiled rules, in output column order
    pub rules: Vec<FieldRule>,
    pub summary: PassSummary,
    /// Non-fatal conditions from every phase, in phase order
    pub diagnostics: Vec<Diagnostic>,
}

/// Settings for this pass: the given ones plus lookup tables found in the input
fn effective_settings(classification: &Classification<'_>, settings: &Settings) -> Settings {
    let mut effective = settings.clone();
    for table in &classification.lookups {
        effective
            .value_maps
            .register_table(table, &settings.lookup_table_markers);
    }
    effective
}

/// Classify the tables and compile their mapping configuration
pub fn compile_tables(tables: &[Table], settings: &Settings) -> Result<CompiledMapping> {
    let classification = classify(tables, settings);
    let mapping = classification.mapping.ok_or(ConfigError::MissingMappingTable)?;
    let settings = effective_settings(&classification, settings);

    let mut compiled = compile(mapping, classification.primary, &settings)?;
    let mut diagnostics = classification.diagnostics;
    diagnostics.append(&mut compiled.diagnostics);
    compiled.diagnostics = diagnostics;
    Ok(compiled)
}

/// Run a full pass: classify, compile, index, assemble
pub fn run_pass(tables: &[Table], settings: &Settings) -> Result<PassOutput> {
    let classification = classify(tables, settings);
    let mapping = classification.mapping.ok_or(ConfigError::MissingMappingTable)?;
    let primary = classification.primary.ok_or(ConfigError::MissingPrimaryTable)?;
    let settings = effective_settings(&classification, settings);

    let compiled = compile(mapping, Some(primary), &settings)?;

    let index = SourceIndex::build(classification.entity_tables(), &settings);
    let pipeline = TransformationPipeline::new(settings.value_maps.clone());
    let assembly = assemble(primary, &compiled.rules, &index, &pipeline, &settings)?;

    let mut diagnostics = classification.diagnostics;
    diagnostics.extend(compiled.diagnostics);
    diagnostics.extend(assembly.diagnostics);

    tracing::info!(
        entities = assembly.summary.entities,
        fields = compiled.rules.len(),
        warnings = diagnostics.len(),
        "mapping pass complete"
    );

    Ok(PassOutput {
        output: assembly.output,
        rules: compiled.rules,
        summary: assembly.summary,
        diagnostics,
    })
}
