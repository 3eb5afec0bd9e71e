// 📄 Spreadsheet decode - workbook / CSV / JSON file → header-first raw table

use crate::error::{ExplorerError, Result};
use crate::table::{Cell, RawTable};
use calamine::{open_workbook_auto, Data, Reader};
use serde_json::{Number, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// How spreadsheet date-times are written into the table
pub const DATETIME_OUTPUT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Workbook,
    Csv,
    Json,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(FileKind::Workbook),
            "csv" => Ok(FileKind::Csv),
            "json" => Ok(FileKind::Json),
            _ => Err(ExplorerError::UnsupportedFile(path.display().to_string())),
        }
    }
}

/// Read a file into rows, first row = header. Workbooks use the first sheet.
pub fn read_table(path: &Path) -> Result<RawTable> {
    let table = match FileKind::from_path(path)? {
        FileKind::Workbook => read_workbook(path)?,
        FileKind::Csv => read_csv(path)?,
        FileKind::Json => read_json(path)?,
    };
    info!("read {} rows from {}", table.len(), path.display());
    Ok(table)
}

fn read_workbook(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| ExplorerError::Spreadsheet(format!("{}: {}", path.display(), e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ExplorerError::Spreadsheet(format!("{}: no worksheet", path.display())))?
        .map_err(|e| ExplorerError::Spreadsheet(format!("{}: {}", path.display(), e)))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(data_to_cell).collect())
        .collect())
}

/// Workbook cell → JSON cell. Empty, error and non-finite cells become null.
pub fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::Number((*i).into()),
        Data::Float(f) => float_cell(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => Value::String(naive.format(DATETIME_OUTPUT).to_string()),
            None => float_cell(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
    }
}

fn float_cell(f: f64) -> Cell {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

fn read_csv(path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Value::Null
                    } else {
                        Value::String(field.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(rows)
}

fn read_json(path: &Path) -> Result<RawTable> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_file_kind() {
        assert_eq!(FileKind::from_path(Path::new("a.XLSX")).unwrap(), FileKind::Workbook);
        assert_eq!(FileKind::from_path(Path::new("a.csv")).unwrap(), FileKind::Csv);
        assert!(matches!(
            FileKind::from_path(Path::new("a.pdf")),
            Err(ExplorerError::UnsupportedFile(_))
        ));
    }

    #[test]
    fn test_read_csv_keeps_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tx.csv");
        fs::write(&path, "date,amount,memo\n2024-01-01T10:00,5,\n2024-01-02T11:00\n").unwrap();

        let table = read_table(&path).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table[0], vec![json!("date"), json!("amount"), json!("memo")]);
        assert_eq!(table[1], vec![json!("2024-01-01T10:00"), json!("5"), Value::Null]);
        assert_eq!(table[2].len(), 1);
    }

    #[test]
    fn test_read_json_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tx.json");
        fs::write(&path, r#"[["date","amount"],["2024-01-01",5]]"#).unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table[1][1], json!(5));
    }

    #[test]
    fn test_data_to_cell() {
        assert_eq!(data_to_cell(&Data::Empty), Value::Null);
        assert_eq!(data_to_cell(&Data::Int(3)), json!(3));
        assert_eq!(data_to_cell(&Data::Float(2.5)), json!(2.5));
        assert_eq!(data_to_cell(&Data::Float(f64::NAN)), Value::Null);
        assert_eq!(data_to_cell(&Data::String("x".into())), json!("x"));
        assert_eq!(data_to_cell(&Data::Bool(false)), json!(false));
    }
}
