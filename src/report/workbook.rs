//! Workbook assembly.
//!
//! Serializes partitions into an xlsx buffer, one sheet per partition,
//! with the fixed projection columns. No I/O happens here.

use crate::error::LipaError;
use crate::models::{Partition, PartitionRow, PROJECTED_COLUMNS};
use rust_xlsxwriter::{ColNum, Format, RowNum, Workbook, Worksheet};
use tracing::debug;

/// Sheet name used for single-region downloads.
pub const SINGLE_SHEET_NAME: &str = "Sheet1";

/// Build a workbook with one sheet per non-empty partition, named after its region.
///
/// Returns `None` when every partition is empty.
pub fn assemble_workbook<'a>(
    partitions: impl IntoIterator<Item = &'a Partition>,
) -> Result<Option<Vec<u8>>, LipaError> {
    let sheets: Vec<(String, &Partition)> = partitions
        .into_iter()
        .filter(|p| !p.is_empty())
        .map(|p| (p.region.to_string(), p))
        .collect();
    write_sheets(&sheets)
}

/// Build a single-sheet workbook for one partition.
///
/// Returns `None` for an empty partition.
pub fn assemble_region_workbook(partition: &Partition) -> Result<Option<Vec<u8>>, LipaError> {
    if partition.is_empty() {
        return Ok(None);
    }
    write_sheets(&[(SINGLE_SHEET_NAME.to_string(), partition)])
}

fn write_sheets(sheets: &[(String, &Partition)]) -> Result<Option<Vec<u8>>, LipaError> {
    if sheets.is_empty() {
        return Ok(None);
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    for (name, partition) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(name.as_str())?;

        for (col, header) in PROJECTED_COLUMNS.iter().enumerate() {
            worksheet.write_string_with_format(0, col as ColNum, *header, &header_format)?;
        }

        for (i, row) in partition.rows.iter().enumerate() {
            write_row(worksheet, (i + 1) as RowNum, row, &date_format)?;
        }

        debug!("Sheet '{}': {} rows", name, partition.len());
    }

    Ok(Some(workbook.save_to_buffer()?))
}

fn write_row(
    worksheet: &mut Worksheet,
    row_num: RowNum,
    row: &PartitionRow,
    date_format: &Format,
) -> Result<(), LipaError> {
    let record = &row.record;

    worksheet.write_number(row_num, 0, row.sr_no as f64)?;
    write_text(worksheet, row_num, 1, record.external_id.as_text())?;
    if let Some(created) = &record.created_on {
        worksheet.write_datetime_with_format(row_num, 2, created, date_format)?;
    }
    if let Some(age) = record.age_days {
        worksheet.write_number(row_num, 3, age as f64)?;
    }

    let passthrough = [
        record.delivery_no.as_str(),
        record.process_status.as_str(),
        record.reason_code.as_str(),
        record.customer_ref.as_str(),
        record.material_number.as_str(),
        record.material_description.as_str(),
        record.quantity.as_str(),
        record.model_series.as_str(),
    ];
    for (offset, value) in passthrough.iter().enumerate() {
        write_text(worksheet, row_num, (4 + offset) as ColNum, value)?;
    }

    Ok(())
}

/// Empty text leaves the cell blank.
fn write_text(
    worksheet: &mut Worksheet,
    row_num: RowNum,
    col: ColNum,
    value: &str,
) -> Result<(), LipaError> {
    if !value.is_empty() {
        worksheet.write_string(row_num, col, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::read_table_from_bytes;
    use crate::models::{ExternalId, ReasonCode, Record, Region};
    use chrono::NaiveDate;

    fn row(sr_no: usize, id: ExternalId, region: Region, age: i64, reason: ReasonCode) -> PartitionRow {
        PartitionRow {
            sr_no,
            record: Record {
                external_id: id,
                created_on: Some(
                    NaiveDate::from_ymd_opt(2024, 1, 5)
                        .unwrap()
                        .and_hms_opt(0, 0, 0)
                        .unwrap(),
                ),
                age_days: Some(age),
                region,
                reason_code: reason,
                process_status: "Open".to_string(),
                delivery_no: format!("8000{}", sr_no),
                customer_ref: "PO-1".to_string(),
                material_number: "A100-77".to_string(),
                material_description: "Pump housing".to_string(),
                quantity: "2".to_string(),
                model_series: "A1".to_string(),
            },
        }
    }

    fn usa() -> Partition {
        Partition {
            region: Region::Usa,
            rows: vec![
                row(
                    1,
                    ExternalId::Delivery("7001234".to_string()),
                    Region::Usa,
                    40,
                    ReasonCode::Given("Credit".to_string()),
                ),
                row(2, ExternalId::Blanked, Region::Usa, 15, ReasonCode::DefaultSentinel),
            ],
        }
    }

    #[test]
    fn test_round_trip_preserves_columns_and_order() {
        let usa = usa();
        let bytes = assemble_workbook([&usa, &Partition::empty(Region::Germany)])
            .unwrap()
            .unwrap();

        let table = read_table_from_bytes(bytes, Some("USA")).unwrap();

        assert_eq!(table.headers, PROJECTED_COLUMNS.to_vec());
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.cell(0, "Sr No."), Some("1"));
        assert_eq!(table.cell(0, "LIPA EX33 FZ / ExtDlvID"), Some("7001234"));
        assert_eq!(table.cell(0, "LIPA Created On"), Some("2024-01-05 00:00:00"));
        assert_eq!(table.cell(0, "Day"), Some("40"));
        assert_eq!(table.cell(0, "LIPA No. / Delivery"), Some("80001"));
        assert_eq!(table.cell(0, "Reason code desc."), Some("Credit"));
        assert_eq!(table.cell(0, "Delivery Quantity"), Some("2"));
        assert_eq!(table.cell(1, "Sr No."), Some("2"));
        assert_eq!(table.cell(1, "LIPA EX33 FZ / ExtDlvID"), None);
        assert_eq!(table.cell(1, "Reason code desc."), Some("GSS classic"));
        assert_eq!(table.cell(1, "Day"), Some("15"));
    }

    #[test]
    fn test_only_non_empty_partitions_get_sheets() {
        let bytes = assemble_workbook([&usa(), &Partition::empty(Region::Germany)])
            .unwrap()
            .unwrap();

        assert!(read_table_from_bytes(bytes.clone(), Some("USA")).is_ok());
        assert!(read_table_from_bytes(bytes, Some("Germany")).is_err());
    }

    #[test]
    fn test_all_empty_produces_nothing() {
        let usa = Partition::empty(Region::Usa);
        let germany = Partition::empty(Region::Germany);

        assert!(assemble_workbook([&usa, &germany]).unwrap().is_none());
        assert!(assemble_region_workbook(&germany).unwrap().is_none());
    }

    #[test]
    fn test_region_workbook_uses_single_sheet() {
        let bytes = assemble_region_workbook(&usa()).unwrap().unwrap();
        let table = read_table_from_bytes(bytes, None).unwrap();

        assert_eq!(table.sheet_name, SINGLE_SHEET_NAME);
        assert_eq!(table.rows.len(), 2);
    }
}
