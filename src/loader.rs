//! Reads CSV and XLSX uploads into a [`RiskTable`].

use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use tracing::{debug, info};

use crate::config::{LoadOptions, SourceFormat};
use crate::error::{DashboardError, Result};
use crate::models::{CellDate, Column, RiskRecord, RiskTable};

pub fn load_table(bytes: &[u8], format: SourceFormat, options: &LoadOptions) -> Result<RiskTable> {
    let (headers, rows) = match format {
        SourceFormat::Csv => read_csv(bytes, options)?,
        SourceFormat::Xlsx => read_xlsx(bytes, options)?,
    };
    let table = build_table(&headers, rows)?;
    info!(
        rows = table.len(),
        columns = headers.len(),
        "Risk table loaded"
    );
    if table.is_empty() {
        info!("Upload has a header row but no risks");
    }
    let missing = table.missing_columns();
    if !missing.is_empty() {
        info!("Upload is missing columns: {:?}", missing);
    }
    if !table.extra_columns().is_empty() {
        debug!("Ignoring columns: {:?}", table.extra_columns());
    }
    Ok(table)
}

fn read_csv(bytes: &[u8], options: &LoadOptions) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok((headers, rows))
}

fn read_xlsx(bytes: &[u8], options: &LoadOptions) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let sheet = match &options.sheet {
        Some(sheet) => sheet.clone(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| DashboardError::Parse("workbook has no worksheets".to_string()))?,
    };
    debug!("Reading worksheet '{}'", sheet);

    let range = workbook.worksheet_range(&sheet)?;
    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let headers = rows.next().unwrap_or_default();
    Ok((headers, rows.collect()))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(text) | Data::DateTimeIso(text) | Data::DurationIso(text) => text.clone(),
        Data::DateTime(value) => value
            .as_datetime()
            .map(|datetime| datetime.date().format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| value.as_f64().to_string()),
        other => other.to_string(),
    }
}

fn build_table(headers: &[String], rows: Vec<Vec<String>>) -> Result<RiskTable> {
    if headers.iter().all(|header| header.is_empty()) {
        return Err(DashboardError::Parse("missing header row".to_string()));
    }

    let mut columns = Vec::new();
    let mut extra = Vec::new();
    let mut layout: Vec<Option<Column>> = Vec::with_capacity(headers.len());
    for header in headers {
        match Column::from_header(header) {
            Some(column) if !columns.contains(&column) => {
                columns.push(column);
                layout.push(Some(column));
            }
            _ => {
                extra.push(header.clone());
                layout.push(None);
            }
        }
    }

    let records = rows
        .into_iter()
        .filter(|cells| cells.iter().any(|cell| !cell.is_empty()))
        .map(|cells| record_from_cells(&layout, cells))
        .collect();

    Ok(RiskTable::new(columns, records).with_extra_columns(extra))
}

fn record_from_cells(layout: &[Option<Column>], cells: Vec<String>) -> RiskRecord {
    let mut record = RiskRecord::default();
    for (column, cell) in layout.iter().zip(cells) {
        let Some(column) = column else { continue };
        if cell.is_empty() {
            continue;
        }
        match column {
            Column::WorkName => record.work_name = Some(cell),
            Column::Status => record.status = Some(cell),
            Column::Classification => record.classification = Some(cell),
            Column::MitigationPlan => record.mitigation_plan = Some(cell),
            Column::Priority => record.priority = Some(cell),
            Column::DateOfAssessment => record.date_of_assessment = CellDate::parse(&cell),
            Column::AtrDate => record.atr_date = CellDate::parse(&cell),
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
Work Name,Date of Assessment,Status,Classification,ATR Date,Mitigation Plan,Priority,Owner
Bridge,2024-01-10,Open,High,,Reroute traffic,P1,Asha
Bridge,2024-02-01,Closed,Moderate,2024-02-15,,P2,Asha
Tunnel,not assessed,Open,Substantial,,,P1,Ravi
";

    fn load_csv(text: &str) -> Result<RiskTable> {
        load_table(text.as_bytes(), SourceFormat::Csv, &LoadOptions::default())
    }

    #[test]
    fn loads_typed_records_from_csv() {
        let table = load_csv(SAMPLE).unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.missing_columns().is_empty());
        assert_eq!(table.extra_columns(), ["Owner".to_string()]);

        let first = &table.records()[0];
        assert_eq!(first.work_name.as_deref(), Some("Bridge"));
        assert_eq!(
            first.date_of_assessment,
            Some(CellDate::Date(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()))
        );
        assert_eq!(first.atr_date, None);
        assert_eq!(first.mitigation_plan.as_deref(), Some("Reroute traffic"));

        let third = &table.records()[2];
        assert_eq!(
            third.date_of_assessment,
            Some(CellDate::Text("not assessed".to_string()))
        );
    }

    #[test]
    fn records_absent_columns_without_failing() {
        let table = load_csv("Work Name,Status\nBridge,Open\n").unwrap();
        assert!(table.has_column(Column::Status));
        assert!(!table.has_column(Column::Classification));
        assert_eq!(table.records()[0].classification, None);
    }

    #[test]
    fn short_rows_leave_trailing_cells_missing() {
        let table = load_csv("Work Name,Status,Priority\nBridge,Open\n").unwrap();
        assert_eq!(table.records()[0].priority, None);
        assert_eq!(table.records()[0].status.as_deref(), Some("Open"));
    }

    #[test]
    fn keeps_whitespace_in_work_names() {
        let table = load_csv("Work Name,Status\n Bridge ,Open\n").unwrap();
        assert_eq!(table.records()[0].work_name.as_deref(), Some(" Bridge "));
    }

    #[test]
    fn header_only_upload_is_an_empty_table() {
        let table = load_csv("Work Name,Status\n").unwrap();
        assert!(table.is_empty());
        assert!(table.has_column(Column::WorkName));
    }

    #[test]
    fn honours_custom_delimiter() {
        let options = LoadOptions::builder().delimiter(b';').build();
        let table = load_table(b"Work Name;Status\nBridge;Open\n", SourceFormat::Csv, &options)
            .unwrap();
        assert_eq!(table.records()[0].status.as_deref(), Some("Open"));
    }

    #[test]
    fn empty_file_is_a_parse_error() {
        let err = load_csv("").unwrap_err();
        assert_eq!(err.error_code(), "PARSE_ERROR");
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let bytes = b"Work Name,Status\n\xff\xfe,Open\n";
        let err = load_table(bytes, SourceFormat::Csv, &LoadOptions::default()).unwrap_err();
        assert_eq!(err.error_code(), "PARSE_ERROR");
    }

    fn workbook_bytes() -> Vec<u8> {
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let mut workbook = Workbook::new();
        workbook
            .add_worksheet()
            .set_name("Notes")
            .unwrap()
            .write_string(0, 0, "Fill in the Risks sheet")
            .unwrap();

        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let assessed = ExcelDateTime::from_ymd(2024, 3, 5).unwrap();
        let sheet = workbook.add_worksheet().set_name("Risks").unwrap();
        sheet.write_row(0, 0, Column::ALL.map(Column::header)).unwrap();
        sheet.write_string(1, 0, "Bridge").unwrap();
        sheet
            .write_datetime_with_format(1, 1, &assessed, &date_format)
            .unwrap();
        sheet.write_string(1, 2, "Open").unwrap();
        sheet.write_string(1, 3, "High").unwrap();
        sheet.write_number(1, 6, 1.0).unwrap();

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn reads_named_sheet_from_workbook() {
        let options = LoadOptions::builder().sheet("Risks").build();
        let table = load_table(&workbook_bytes(), SourceFormat::Xlsx, &options).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.missing_columns().is_empty());

        let record = &table.records()[0];
        assert_eq!(record.work_name.as_deref(), Some("Bridge"));
        assert_eq!(
            record.date_of_assessment,
            Some(CellDate::Date(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()))
        );
        assert_eq!(record.classification.as_deref(), Some("High"));
        assert_eq!(record.atr_date, None);
        assert_eq!(record.mitigation_plan, None);
        assert_eq!(record.priority.as_deref(), Some("1"));
    }

    #[test]
    fn workbook_defaults_to_first_sheet() {
        let table = load_table(&workbook_bytes(), SourceFormat::Xlsx, &LoadOptions::default())
            .unwrap();
        assert!(table.is_empty());
        assert_eq!(table.missing_columns().len(), Column::ALL.len());
        assert_eq!(table.extra_columns(), ["Fill in the Risks sheet".to_string()]);
    }

    #[test]
    fn unknown_sheet_is_a_parse_error() {
        let options = LoadOptions::builder().sheet("Summary").build();
        let err = load_table(&workbook_bytes(), SourceFormat::Xlsx, &options).unwrap_err();
        assert_eq!(err.error_code(), "PARSE_ERROR");
    }

    #[test]
    fn corrupt_workbook_is_a_parse_error() {
        let err = load_table(b"not a zip archive", SourceFormat::Xlsx, &LoadOptions::default())
            .unwrap_err();
        assert_eq!(err.error_code(), "PARSE_ERROR");
    }
}
