// ============================================================
// SPREADSHEET READER
// ============================================================
// First worksheet of an .xlsx/.xls upload as a member table

use std::fmt;
use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, DataType, Range, Reader, Xls, Xlsx};

use crate::domain::error::{AppError, Result};
use crate::domain::report::{Cell, MemberTable};

/// Workbook readers, tried in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetEngine {
    Xlsx,
    Xls,
}

/// Date cells are shown the way pandas prints timestamps
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const SPREADSHEET_ENGINES: &[SpreadsheetEngine] = &[SpreadsheetEngine::Xlsx, SpreadsheetEngine::Xls];

impl SpreadsheetEngine {
    pub fn name(&self) -> &'static str {
        match self {
            SpreadsheetEngine::Xlsx => "xlsx",
            SpreadsheetEngine::Xls => "xls",
        }
    }

    pub fn read(&self, bytes: &[u8]) -> Result<MemberTable> {
        match self {
            SpreadsheetEngine::Xlsx => read_first_sheet::<Xlsx<Cursor<Vec<u8>>>>(bytes),
            SpreadsheetEngine::Xls => read_first_sheet::<Xls<Cursor<Vec<u8>>>>(bytes),
        }
    }
}

/// Whether the file name asks for spreadsheet parsing
pub fn is_spreadsheet_name(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    lower.ends_with(".xlsx") || lower.ends_with(".xls")
}

fn read_first_sheet<R>(bytes: &[u8]) -> Result<MemberTable>
where
    R: Reader<Cursor<Vec<u8>>>,
    R::Error: fmt::Display,
{
    let mut workbook: R = open_workbook_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| AppError::ParseError(format!("Failed to open workbook: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::ParseError("No worksheet found".to_string()))?
        .map_err(|e| AppError::ParseError(format!("Failed to read worksheet: {}", e)))?;

    range_to_table(&range)
}

/// First row is the header; blank headers get pandas-style placeholders
fn range_to_table(range: &Range<Data>) -> Result<MemberTable> {
    let mut rows = range.rows();
    let header_row = rows
        .next()
        .ok_or_else(|| AppError::ParseError("Worksheet is empty".to_string()))?;

    let headers = header_row
        .iter()
        .enumerate()
        .map(|(idx, cell)| match cell_from_data(cell) {
            Cell::Missing => format!("Unnamed: {}", idx),
            other => other.display().trim().to_string(),
        })
        .collect();

    let body = rows
        .filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)))
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    Ok(MemberTable::new(headers, body))
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Missing,
        Data::Int(v) => Cell::number(*v as f64),
        Data::Float(v) => Cell::number(*v),
        Data::String(s) => Cell::from_raw(s.trim()),
        Data::DateTime(_) | Data::DateTimeIso(_) => match data.as_datetime() {
            Some(datetime) => Cell::Text(datetime.format(DATETIME_FORMAT).to_string()),
            None => Cell::from_raw(&data.to_string()),
        },
        other => Cell::from_raw(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_to_table_uses_first_row_as_header() {
        let mut range = Range::new((0, 0), (2, 2));
        range.set_value((0, 0), Data::String("Vorname".into()));
        range.set_value((0, 1), Data::String(" Nachname ".into()));
        range.set_value((1, 0), Data::String("Anna".into()));
        range.set_value((1, 1), Data::String("Meier".into()));
        range.set_value((1, 2), Data::Int(7));

        let table = range_to_table(&range).unwrap();
        assert_eq!(table.columns(), &["Vorname", "Nachname", "Unnamed: 2"]);
        // the all-empty third row is dropped
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0][2], Cell::Number(7.0));
    }

    #[test]
    fn test_xlsx_workbook_reads_first_sheet_with_dates() {
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let mut workbook = Workbook::new();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let date = ExcelDateTime::from_ymd(2024, 5, 1).unwrap();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Datum").unwrap();
        sheet.write_string(0, 1, "Mitglied").unwrap();
        sheet.write_string(0, 2, "Punkte").unwrap();
        sheet.write_datetime_with_format(1, 0, &date, &date_format).unwrap();
        sheet.write_string(1, 1, "Clara von Berg").unwrap();
        sheet.write_number(1, 2, 95.0).unwrap();
        workbook.add_worksheet().write_string(0, 0, "zweites Blatt").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let table = SpreadsheetEngine::Xlsx.read(&bytes).unwrap();
        assert_eq!(table.columns(), &["Datum", "Mitglied", "Punkte"]);
        assert_eq!(table.rows()[0][0], Cell::Text("2024-05-01 00:00:00".into()));
        assert_eq!(table.rows()[0][2], Cell::Number(95.0));

        // the legacy engine cannot open an xlsx container
        assert!(SpreadsheetEngine::Xls.read(&bytes).is_err());
    }

    #[test]
    fn test_engines_try_xlsx_before_xls() {
        let names: Vec<&str> = SPREADSHEET_ENGINES.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["xlsx", "xls"]);
    }

    #[test]
    fn test_garbage_bytes_fail_every_engine() {
        for engine in SPREADSHEET_ENGINES {
            assert!(engine.read(b"not a workbook").is_err(), "{}", engine.name());
        }
    }

    #[test]
    fn test_spreadsheet_name_detection() {
        assert!(is_spreadsheet_name("Bericht.XLSX"));
        assert!(is_spreadsheet_name("alt.xls"));
        assert!(!is_spreadsheet_name("palms.csv"));
    }
}
