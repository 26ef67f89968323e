//! Workbook ingestion.
//!
//! Reads the first (or a named) sheet of a spreadsheet workbook with
//! every cell rendered as text, then maps the header row onto [`RawRow`].

use crate::error::LipaError;
use crate::models::RawRow;
use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::{debug, info};

pub const COL_CREATED_ON: &str = "LIPA Created On";
pub const COL_COMBINED_STATUS: &str = "Combined Status";
pub const COL_EXTERNAL_ID: &str = "LIPA EX33 FZ / ExtDlvID";
pub const COL_REASON: &str = "Reason code desc.";
pub const COL_DELIVERY_NO: &str = "LIPA No. / Delivery";
pub const COL_PROCESS_STATUS: &str = "Process status";
pub const COL_CUSTOMER_REF: &str = "Customer Ref. Ord.No.";
pub const COL_MATERIAL_NUMBER: &str = "Material number";
pub const COL_MATERIAL_DESCRIPTION: &str = "Material Description";
pub const COL_QUANTITY: &str = "Delivery Quantity";
pub const COL_MODEL_SERIES: &str = "Model series";

/// Columns that must be present in the header row.
///
/// `Combined Status` is looked up per row and may be absent entirely.
pub const REQUIRED_COLUMNS: [&str; 10] = [
    COL_CREATED_ON,
    COL_EXTERNAL_ID,
    COL_REASON,
    COL_DELIVERY_NO,
    COL_PROCESS_STATUS,
    COL_CUSTOMER_REF,
    COL_MATERIAL_NUMBER,
    COL_MATERIAL_DESCRIPTION,
    COL_QUANTITY,
    COL_MODEL_SERIES,
];

/// A sheet as text: a header row and data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub sheet_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

#[cfg(test)]
impl Table {
    /// Index of a header, if present.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell text at (row, column name), `None` when empty or absent.
    pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
        let col = self.column(name)?;
        self.rows.get(row)?.get(col)?.as_deref()
    }
}

impl Table {
    /// Map data rows onto the fixed input schema.
    pub fn to_raw_rows(&self) -> Result<Vec<RawRow>, LipaError> {
        let index: HashMap<&str, usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.as_str(), i))
            .collect();

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| !index.contains_key(*c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(LipaError::MissingColumns(missing));
        }

        let rows = self
            .rows
            .iter()
            .map(|cells| {
                let get = |name: &str| -> Option<String> {
                    index
                        .get(name)
                        .and_then(|&i| cells.get(i))
                        .cloned()
                        .flatten()
                };
                RawRow {
                    created_on: get(COL_CREATED_ON),
                    combined_status: get(COL_COMBINED_STATUS),
                    external_id: get(COL_EXTERNAL_ID),
                    reason: get(COL_REASON),
                    delivery_no: get(COL_DELIVERY_NO),
                    process_status: get(COL_PROCESS_STATUS),
                    customer_ref: get(COL_CUSTOMER_REF),
                    material_number: get(COL_MATERIAL_NUMBER),
                    material_description: get(COL_MATERIAL_DESCRIPTION),
                    quantity: get(COL_QUANTITY),
                    model_series: get(COL_MODEL_SERIES),
                }
            })
            .collect();

        Ok(rows)
    }
}

/// Read a workbook file (xlsx, xlsm, xlsb, xls or ods).
pub fn read_table_from_path(path: &Path, sheet: Option<&str>) -> Result<Table, LipaError> {
    info!("Reading workbook: {}", path.display());
    let mut workbook = open_workbook_auto(path)?;
    read_table(&mut workbook, sheet)
}

/// Read a workbook held in memory.
#[cfg(test)]
pub fn read_table_from_bytes(bytes: Vec<u8>, sheet: Option<&str>) -> Result<Table, LipaError> {
    let mut workbook = calamine::open_workbook_auto_from_rs(std::io::Cursor::new(bytes))?;
    read_table(&mut workbook, sheet)
}

fn read_table<RS: Read + Seek>(
    workbook: &mut Sheets<RS>,
    sheet: Option<&str>,
) -> Result<Table, LipaError> {
    let names = workbook.sheet_names();
    let sheet_name = match sheet {
        Some(name) => {
            if !names.iter().any(|n| n == name) {
                return Err(LipaError::Parse(format!(
                    "sheet '{}' not found (available: {})",
                    name,
                    names.join(", ")
                )));
            }
            name.to_string()
        }
        None => names
            .first()
            .cloned()
            .ok_or_else(|| LipaError::Parse("workbook contains no sheets".to_string()))?,
    };

    let range = workbook.worksheet_range(&sheet_name)?;
    let table = table_from_range(&sheet_name, &range)?;
    debug!(
        "Sheet '{}': {} columns, {} data rows",
        table.sheet_name,
        table.headers.len(),
        table.rows.len()
    );
    Ok(table)
}

fn table_from_range(sheet_name: &str, range: &Range<Data>) -> Result<Table, LipaError> {
    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| LipaError::Parse(format!("sheet '{}' is empty", sheet_name)))?
        .iter()
        .map(|c| cell_text(c).map(|s| s.trim().to_string()).unwrap_or_default())
        .collect();

    let rows = rows
        .map(|cells| cells.iter().map(cell_text).collect())
        .collect();

    Ok(Table {
        sheet_name: sheet_name.to_string(),
        headers,
        rows,
    })
}

/// Render a cell as text. Whole floats drop their fractional part.
pub fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(format_float(*f)),
        Data::Bool(b) => Some(if *b { "True" } else { "False" }.to_string()),
        Data::DateTime(dt) => Some(match dt.as_datetime() {
            Some(naive) => naive.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => format_float(dt.as_f64()),
        }),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
    }
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_headers() -> Vec<String> {
        let mut headers: Vec<String> = REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect();
        headers.push(COL_COMBINED_STATUS.to_string());
        headers
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Empty), None);
        assert_eq!(cell_text(&Data::Float(7001234.0)).as_deref(), Some("7001234"));
        assert_eq!(cell_text(&Data::Float(2.5)).as_deref(), Some("2.5"));
        assert_eq!(cell_text(&Data::Int(42)).as_deref(), Some("42"));
        assert_eq!(cell_text(&Data::Bool(true)).as_deref(), Some("True"));
        assert_eq!(
            cell_text(&Data::String("abc".to_string())).as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn test_missing_required_columns() {
        let table = Table {
            sheet_name: "Sheet1".to_string(),
            headers: vec![COL_CREATED_ON.to_string(), COL_REASON.to_string()],
            rows: vec![],
        };

        match table.to_raw_rows() {
            Err(LipaError::MissingColumns(cols)) => {
                assert!(cols.contains(&COL_EXTERNAL_ID.to_string()));
                assert!(!cols.contains(&COL_REASON.to_string()));
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_combined_status_is_optional() {
        let headers: Vec<String> = REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect();
        let row = vec![Some("x".to_string()); headers.len()];
        let table = Table {
            sheet_name: "Sheet1".to_string(),
            headers,
            rows: vec![row],
        };

        let raw = table.to_raw_rows().unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].combined_status, None);
        assert_eq!(raw[0].reason.as_deref(), Some("x"));
    }

    #[test]
    fn test_header_mapping_ignores_column_order() {
        let mut headers = full_headers();
        headers.reverse();
        let mut row: Vec<Option<String>> = vec![None; headers.len()];
        let ext_idx = headers.iter().position(|h| h == COL_EXTERNAL_ID).unwrap();
        row[ext_idx] = Some("7001".to_string());

        let table = Table {
            sheet_name: "Sheet1".to_string(),
            headers,
            rows: vec![row],
        };

        let raw = table.to_raw_rows().unwrap();
        assert_eq!(raw[0].external_id.as_deref(), Some("7001"));
        assert_eq!(raw[0].created_on, None);
        assert_eq!(table.cell(0, COL_EXTERNAL_ID), Some("7001"));
    }

    #[test]
    fn test_read_garbage_bytes_is_parse_failure() {
        let result = read_table_from_bytes(b"not a workbook".to_vec(), None);
        assert!(matches!(result, Err(LipaError::Parse(_))));
    }
}
