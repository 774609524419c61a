//! Spreadsheet ingestion
//!
//! Reads `.csv`, `.xlsx`, `.xlsm`, `.xls` and `.ods` exports into raw rows
//! keyed by the header row. Cell values keep their native type where the
//! format has one (numbers stay numbers in workbooks), empty cells become
//! `null`.

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ReaderBuilder;
use serde_json::{Number, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::RawRow;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Supported spreadsheet containers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    /// Any workbook calamine can open (xlsx, xlsm, xls, ods)
    Workbook,
}

impl SheetFormat {
    /// Detect format from a file name's extension
    pub fn from_file_name(name: &str) -> Result<Self> {
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" | "xlsm" | "xls" | "ods" => Ok(Self::Workbook),
            _ => Err(Error::UnsupportedFormat(name.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_file_name(&path.to_string_lossy())
    }
}

/// Read a spreadsheet file from disk
pub fn read_file(path: &Path) -> Result<Vec<RawRow>> {
    let format = SheetFormat::from_path(path)?;
    let data = std::fs::read(path)?;
    read_rows(&data, format)
}

/// Read spreadsheet bytes in the given format
pub fn read_rows(data: &[u8], format: SheetFormat) -> Result<Vec<RawRow>> {
    let rows = match format {
        SheetFormat::Csv => read_csv(data)?,
        SheetFormat::Workbook => read_workbook(data)?,
    };
    debug!("Read {} spreadsheet rows ({:?})", rows.len(), format);
    Ok(rows)
}

/// Pick `;` when the header line has more semicolons than commas
fn detect_delimiter(data: &[u8]) -> u8 {
    let header = data.split(|b| *b == b'\n').next().unwrap_or_default();
    let semicolons = header.iter().filter(|b| **b == b';').count();
    let commas = header.iter().filter(|b| **b == b',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

fn read_csv(data: &[u8]) -> Result<Vec<RawRow>> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(detect_delimiter(data))
        .from_reader(data);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut rows = Vec::new();

    for result in rdr.records() {
        let record = result?;
        let mut row = RawRow::new();
        let mut has_value = false;

        for (header, value) in headers.iter().zip(record.iter()) {
            if header.is_empty() {
                continue;
            }
            let value = value.trim();
            if value.is_empty() {
                row.insert(header.clone(), Value::Null);
            } else {
                has_value = true;
                row.insert(header.clone(), Value::String(value.to_string()));
            }
        }

        if has_value {
            rows.push(row);
        }
    }

    Ok(rows)
}

fn read_workbook(data: &[u8]) -> Result<Vec<RawRow>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(data.to_vec()))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| Error::Import("Workbook has no sheets".to_string()))?;
    let range = workbook.worksheet_range(&sheet)?;

    let mut lines = range.rows().skip_while(|cells| cells.iter().all(is_blank));

    let headers: Vec<String> = match lines.next() {
        Some(cells) => cells.iter().map(header_text).collect(),
        None => return Ok(Vec::new()),
    };

    let mut rows = Vec::new();
    for cells in lines {
        if cells.iter().all(is_blank) {
            continue;
        }

        let mut row = RawRow::new();
        for (header, cell) in headers.iter().zip(cells.iter()) {
            if !header.is_empty() {
                row.insert(header.clone(), cell_value(cell));
            }
        }
        rows.push(row);
    }

    debug!("Read sheet '{}' with {} columns", sheet, headers.len());
    Ok(rows)
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn header_text(cell: &Data) -> String {
    match cell_value(cell) {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Convert a workbook cell to JSON, keeping numbers numeric
fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Value::Null
            } else {
                Value::String(s.to_string())
            }
        }
        Data::Int(i) => Value::Number((*i).into()),
        Data::Float(f) => float_value(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => float_value(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
    }
}

fn float_value(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
        Value::Number((f as i64).into())
    } else {
        Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(SheetFormat::from_file_name("dre.csv").unwrap(), SheetFormat::Csv);
        assert_eq!(SheetFormat::from_file_name("DRE.XLSX").unwrap(), SheetFormat::Workbook);
        assert_eq!(SheetFormat::from_file_name("old.xls").unwrap(), SheetFormat::Workbook);
        assert!(matches!(
            SheetFormat::from_file_name("notes.txt"),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(SheetFormat::from_file_name("no_extension").is_err());
    }

    #[test]
    fn test_read_comma_csv() {
        let csv = "Relatorio,Natureza,Lancamento,Projeto,Periodo\n\
                   Realizado,RECEITA,1500.50,Alpha,1/2024\n\
                   Previsto,CUSTO,,Alpha,2/2024\n";

        let rows = read_rows(csv.as_bytes(), SheetFormat::Csv).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Relatorio"], "Realizado");
        assert_eq!(rows[0]["Lancamento"], "1500.50");
        assert_eq!(rows[1]["Lancamento"], Value::Null);
    }

    #[test]
    fn test_read_semicolon_csv_with_bom() {
        let csv = "\u{feff}Relatorio;Natureza;Lancamento;Projeto\n\
                   Realizado;RECEITA;\"10.000,00\";Alpha\n";

        let rows = read_rows(csv.as_bytes(), SheetFormat::Csv).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Relatorio"], "Realizado");
        assert_eq!(rows[0]["Lancamento"], "10.000,00");
        assert_eq!(rows[0]["Projeto"], "Alpha");
    }

    #[test]
    fn test_blank_csv_lines_are_skipped() {
        let csv = "Relatorio,Lancamento\n,\nRealizado,10\n";
        let rows = read_rows(csv.as_bytes(), SheetFormat::Csv).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_cell_values() {
        assert_eq!(cell_value(&Data::Empty), Value::Null);
        assert_eq!(cell_value(&Data::String("  ".into())), Value::Null);
        assert_eq!(cell_value(&Data::String(" Alpha ".into())), Value::String("Alpha".into()));
        assert_eq!(cell_value(&Data::Float(10000.0)), serde_json::json!(10000));
        assert_eq!(cell_value(&Data::Float(12.5)), serde_json::json!(12.5));
        assert_eq!(cell_value(&Data::Int(3)), serde_json::json!(3));
    }

    #[test]
    fn test_invalid_workbook_is_an_error() {
        let result = read_rows(b"not a workbook", SheetFormat::Workbook);
        assert!(matches!(result, Err(Error::Excel(_))));
    }

    #[test]
    fn test_read_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        std::fs::write(&path, "Relatorio,Lancamento\nRealizado,\"1.234,56\"\n").unwrap();

        let rows = read_file(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Lancamento"], "1.234,56");
    }
}
