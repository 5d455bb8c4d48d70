//! Input discovery: find exported sheets on disk and load them as tables
//!
//! Each CSV file stands in for one workbook sheet. Discovery order is the
//! sorted path order, which gives the classifier a stable input order.

use crate::error::Result;
use crate::parser::parse_csv;
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Result of scanning input paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Paths that were scanned
    pub roots: Vec<PathBuf>,
    /// CSV files found, in stable order
    pub files: Vec<PathBuf>,
}

impl ScanResult {
    /// Get the number of files found
    pub fn total_files(&self) -> usize {
        self.files.len()
    }
}

/// Scan files and directories for CSV sheets.
///
/// A file argument is taken as-is; a directory is walked recursively and its
/// CSV files are added in sorted order.
pub fn scan_directory<P: AsRef<Path>>(roots: &[P]) -> Result<ScanResult> {
    let mut files = Vec::new();

    for root in roots {
        let root = root.as_ref();

        if root.is_file() {
            files.push(root.to_path_buf());
            continue;
        }

        let mut found: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type().is_file() && is_csv(path) {
                found.push(path.to_path_buf());
            }
        }
        found.sort();
        files.extend(found);
    }

    Ok(ScanResult {
        roots: roots.iter().map(|r| r.as_ref().to_path_buf()).collect(),
        files,
    })
}

/// Scan the given paths and parse every CSV found into a table
pub fn load_tables<P: AsRef<Path>>(roots: &[P]) -> Result<Vec<Table>> {
    let scan = scan_directory(roots)?;

    let tables = scan
        .files
        .iter()
        .map(parse_csv)
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(tables = tables.len(), "loaded input tables");
    Ok(tables)
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}
