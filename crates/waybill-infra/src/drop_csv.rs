//! CSV loader for drop lists
//!
//! Expected header: `consignee,cbm[,rate]`. Column order is free; extra
//! columns are ignored.

use std::fs::File;
use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DropCsvError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid number format in row {row}, column {column}: {value}")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Missing consignee name in row {0}")]
    MissingConsignee(usize),

    #[error("Missing required column: {0}")]
    MissingColumn(String),
}

impl From<DropCsvError> for waybill_types::Error {
    fn from(err: DropCsvError) -> Self {
        waybill_types::Error::Import(err.to_string())
    }
}

/// One parsed CSV line; validation against the truck happens in the session
#[derive(Debug, Clone, PartialEq)]
pub struct DropRow {
    pub consignee_name: String,
    pub cbm: f64,
    pub rate: Option<f64>,
}

pub fn load_drops_from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<DropRow>, DropCsvError> {
    let file = File::open(path)?;
    parse_drops(file)
}

pub fn parse_drops<R: std::io::Read>(reader: R) -> Result<Vec<DropRow>, DropCsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let consignee_col = find_column(&headers, &["consignee", "consignee_name", "name"])
        .ok_or_else(|| DropCsvError::MissingColumn("consignee".to_string()))?;
    let cbm_col = find_column(&headers, &["cbm"])
        .ok_or_else(|| DropCsvError::MissingColumn("cbm".to_string()))?;
    let rate_col = find_column(&headers, &["rate"]);

    let mut rows = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result?;
        let row_num = row_idx + 2; // header is row 1

        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let consignee_name = record.get(consignee_col).unwrap_or("").to_string();
        if consignee_name.is_empty() {
            return Err(DropCsvError::MissingConsignee(row_num));
        }
        let cbm = parse_f64(record.get(cbm_col).unwrap_or(""), row_num, "cbm")?;
        let rate = match rate_col.and_then(|c| record.get(c)) {
            Some(s) if !s.is_empty() => Some(parse_f64(s, row_num, "rate")?),
            _ => None,
        };

        rows.push(DropRow {
            consignee_name,
            cbm,
            rate,
        });
    }

    Ok(rows)
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
}

fn parse_f64(s: &str, row: usize, column: &str) -> Result<f64, DropCsvError> {
    s.replace(',', "")
        .parse()
        .map_err(|_| DropCsvError::InvalidNumber {
            row,
            column: column.to_string(),
            value: s.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_rate() {
        let csv = "consignee,cbm,rate\nABC - Store 1,30,5000\nXYZ - Depot,70,\n";
        let rows = parse_drops(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].consignee_name, "ABC - Store 1");
        assert_eq!(rows[0].rate, Some(5000.0));
        assert!((rows[1].cbm - 70.0).abs() < f64::EPSILON);
        assert_eq!(rows[1].rate, None);
    }

    #[test]
    fn test_reordered_columns_and_blank_lines() {
        let csv = "CBM,Name\n12.5,\"A - 1\"\n,\n4,B - 2\n";
        let rows = parse_drops(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].consignee_name, "B - 2");
    }

    #[test]
    fn test_invalid_number_reports_row() {
        let csv = "consignee,cbm\nA - 1,ten\n";
        match parse_drops(csv.as_bytes()) {
            Err(DropCsvError::InvalidNumber { row, column, .. }) => {
                assert_eq!(row, 2);
                assert_eq!(column, "cbm");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_missing_column() {
        let csv = "consignee,volume\nA,1\n";
        assert!(matches!(
            parse_drops(csv.as_bytes()),
            Err(DropCsvError::MissingColumn(c)) if c == "cbm"
        ));
    }
}
