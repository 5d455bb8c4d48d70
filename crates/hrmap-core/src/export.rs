//! Write the output table as CSV or JSON

use crate::assembler::OutputTable;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unknown format '{}', expected csv or json", other)),
        }
    }
}

/// Write as CSV: header of target fields, null values as empty cells
pub fn write_csv<W: Write>(output: &OutputTable, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record(&output.columns)?;
    for record in &output.records {
        csv_writer.write_record(
            record
                .values
                .iter()
                .map(|(_, value)| value.as_ref().map(|v| v.to_string_value()).unwrap_or_default()),
        )?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Write as a JSON array of `{field: value}` objects
pub fn write_json<W: Write>(output: &OutputTable, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, &output.records)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Export to a file in the given format
pub fn export_to_file<P: AsRef<Path>>(output: &OutputTable, path: P, format: ExportFormat) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| Error::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    let writer = BufWriter::new(file);

    match format {
        ExportFormat::Csv => write_csv(output, writer)?,
        ExportFormat::Json => write_json(output, writer)?,
    }

    tracing::info!(path = %path.display(), records = output.row_count(), "exported output");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::OutputRecord;
    use crate::table::CellValue;

    fn output() -> OutputTable {
        OutputTable {
            columns: vec!["displayName".to_string(), "email".to_string()],
            records: vec![
                OutputRecord {
                    entity_id: "1001".to_string(),
                    values: vec![
                        ("displayName".to_string(), Some(CellValue::String("Doe, Jane".to_string()))),
                        ("email".to_string(), None),
                    ],
                },
                OutputRecord {
                    entity_id: "1002".to_string(),
                    values: vec![
                        ("displayName".to_string(), Some(CellValue::Integer(7))),
                        ("email".to_string(), Some(CellValue::String("a@b.c".to_string()))),
                    ],
                },
            ],
        }
    }

    #[test]
    fn test_write_csv() {
        let mut buf = Vec::new();
        write_csv(&output(), &mut buf).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "displayName,email\n\"Doe, Jane\",\n7,a@b.c\n");
    }

    #[test]
    fn test_write_json() {
        let mut buf = Vec::new();
        write_json(&output(), &mut buf).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value[0]["displayName"], "Doe, Jane");
        assert!(value[0]["email"].is_null());
        assert_eq!(value[1]["displayName"], 7);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("CSV".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert_eq!("json".parse::<ExportFormat>(), Ok(ExportFormat::Json));
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }
}
