//! CSV parser turning exported sheets into tables

use crate::error::{Error, Result};
use crate::table::{CellValue, Column, Row, Table};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Parse a CSV file into a Table named after the file stem
pub fn parse_csv<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    let mut table = read_table(BufReader::new(file), &name, path)?;
    table.source_path = Some(path.to_path_buf());
    Ok(table)
}

/// Parse CSV from a string (useful for testing)
pub fn parse_csv_str(content: &str, table_name: &str) -> Result<Table> {
    read_table(content.as_bytes(), table_name, Path::new(table_name))
}

fn read_table<R: Read>(reader: R, name: &str, path: &Path) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true) // Allow varying number of fields
        .from_reader(reader);

    // Parse headers into columns
    let headers = csv_reader.headers().map_err(|e| Error::Csv {
        path: path.to_path_buf(),
        source: e,
    })?;

    let columns: Vec<Column> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| Column::new(name.trim().to_string(), i))
        .collect();

    if columns.iter().all(|c| c.name.is_empty()) {
        return Err(Error::CsvParse {
            path: path.to_path_buf(),
            message: "no columns found in CSV".to_string(),
        });
    }

    let mut rows = Vec::new();
    for (row_idx, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| Error::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut cells: Vec<CellValue> = record.iter().map(CellValue::parse).collect();

        if cells.len() > columns.len() {
            tracing::warn!(
                row = row_idx + 1,
                table = name,
                "row has more cells than columns, truncating"
            );
        }
        // Pad short rows, truncate long ones
        cells.resize(columns.len(), CellValue::Empty);

        rows.push(Row::new(cells));
    }

    tracing::debug!(table = name, rows = rows.len(), "parsed CSV table");

    Ok(Table {
        name: name.to_string(),
        columns,
        rows,
        source_path: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_csv() {
        let csv = "PERNR,VORNA,NACHN\n1001,Jane,Doe\n1002,John,Roe\n";
        let table = parse_csv_str(csv, "PA0002").unwrap();

        assert_eq!(table.name, "PA0002");
        assert_eq!(table.columns.len(), 3);
        assert_eq!(table.columns[0].name, "PERNR");
        assert_eq!(table.columns[2].name, "NACHN");

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].cells[0], CellValue::Integer(1001));
        assert_eq!(table.rows[1].cells[1], CellValue::String("John".to_string()));
    }

    #[test]
    fn test_parse_with_empty_cells() {
        let csv = "PERNR,VORNA,NACHN\n1001,,Doe\n1002,John,\n";
        let table = parse_csv_str(csv, "PA0002").unwrap();

        assert_eq!(table.rows[0].cells[1], CellValue::Empty);
        assert_eq!(table.rows[1].cells[2], CellValue::Empty);
    }

    #[test]
    fn test_parse_header_with_spaces_and_parens() {
        let csv = "Target Column (SuccessFactors), Source Table (SAP) ,Technical Field (SAP)\nfirstName,PA0002,VORNA\n";
        let table = parse_csv_str(csv, "Mapping").unwrap();

        assert_eq!(table.columns[0].name, "Target Column (SuccessFactors)");
        assert_eq!(table.columns[1].name, "Source Table (SAP)");
    }

    #[test]
    fn test_parse_ragged_rows() {
        let csv = "PERNR,SUBTY,USRID\n1001,10\n1002,20,x@y.z,extra\n";
        let table = parse_csv_str(csv, "PA0105").unwrap();

        assert_eq!(table.rows[0].cells.len(), 3);
        assert_eq!(table.rows[0].cells[2], CellValue::Empty);
        assert_eq!(table.rows[1].cells.len(), 3);
        assert_eq!(table.rows[1].cells[2], CellValue::String("x@y.z".to_string()));
    }

    #[test]
    fn test_parse_quoted_fields() {
        let csv = "Notes / Transformation\n\"Concatenate VORNA, NACHN\"\n";
        let table = parse_csv_str(csv, "Mapping").unwrap();

        assert_eq!(
            table.rows[0].cells[0],
            CellValue::String("Concatenate VORNA, NACHN".to_string())
        );
    }
}
