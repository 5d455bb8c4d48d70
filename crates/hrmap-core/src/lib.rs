//! hrmap-core: Core library for mapping HR source tables onto target fields
//!
//! This library provides functionality to:
//! - Load exported sheets (CSV) as in-memory tables
//! - Classify tables into mapping, primary, satellite and lookup roles
//! - Compile a mapping configuration into typed field rules
//! - Index entity tables by employee id and subtype
//! - Resolve and transform every target field for every employee
//! - Export the result and report per-field completeness

pub mod alias;
pub mod assembler;
pub mod classify;
pub mod compiler;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod index;
pub mod parser;
pub mod pass;
pub mod quality;
pub mod resolver;
pub mod scanner;
pub mod settings;
pub mod table;
pub mod transform;
pub mod value_map;

pub use assembler::{assemble, OutputRecord, OutputTable, PassSummary};
pub use classify::{classify, Classification, TableRole};
pub use compiler::{compile, CompiledMapping, FieldRule, TransformSpec};
pub use diagnostics::Diagnostic;
pub use error::{ConfigError, Error, Result};
pub use export::{export_to_file, write_csv, write_json, ExportFormat};
pub use index::SourceIndex;
pub use parser::{parse_csv, parse_csv_str};
pub use pass::{compile_tables, run_pass, PassOutput};
pub use quality::{FieldCompleteness, QualityReport};
pub use resolver::{BoundRule, MissReason, Resolution, ValueResolver};
pub use scanner::{load_tables, scan_directory, ScanResult};
pub use settings::Settings;
pub use table::{CellValue, Column, Row, RowRef, Table};
pub use transform::TransformationPipeline;
pub use value_map::ValueMaps;
