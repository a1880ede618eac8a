// ============================================================
// LOAD REPORT USE CASE
// ============================================================
// Uploaded bytes -> parsed, format-detected, coerced member table

use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Local;

use crate::domain::error::{AppError, Result};
use crate::domain::report::{detect_format, LoadedReport, MemberTable, ReportFormat};
use crate::infrastructure::cache::LoadCache;
use crate::infrastructure::csv::CsvParser;
use crate::infrastructure::excel::{is_spreadsheet_name, SPREADSHEET_ENGINES};
use crate::interfaces::http::{add_log, LogEntry};

pub struct LoadReportUseCase {
    cache: LoadCache,
}

impl LoadReportUseCase {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            cache: LoadCache::new(cache_capacity),
        }
    }

    pub fn execute(
        &self,
        file_name: &str,
        bytes: &[u8],
        logs: &Mutex<Vec<LogEntry>>,
    ) -> Result<Arc<LoadedReport>> {
        if bytes.is_empty() {
            return Err(AppError::ValidationError(
                "Die hochgeladene Datei ist leer".to_string(),
            ));
        }

        let key = LoadCache::key_for(file_name, bytes);
        if let Some(report) = self.cache.get(&key) {
            add_log(
                logs,
                "INFO",
                "Loader",
                &format!("Serving cached parse for {}", file_name),
            );
            return Ok(report);
        }

        let start = Instant::now();
        let (table, notices) = read_table(file_name, bytes, logs)?;
        let (table, format) = prepare_table(table)?;

        add_log(
            logs,
            "INFO",
            "Loader",
            &format!(
                "Loaded {} ({} rows, {} columns, format={}) in {} ms",
                file_name,
                table.len(),
                table.columns().len(),
                format,
                start.elapsed().as_millis()
            ),
        );

        let report = Arc::new(LoadedReport {
            file_name: file_name.to_string(),
            format,
            table,
            notices,
            loaded_at: Local::now(),
        });
        self.cache.insert(key, report.clone());
        Ok(report)
    }
}

/// Spreadsheet engines first for .xls/.xlsx names, then the CSV brute force
fn read_table(
    file_name: &str,
    bytes: &[u8],
    logs: &Mutex<Vec<LogEntry>>,
) -> Result<(MemberTable, Vec<String>)> {
    let mut errors = Vec::new();

    if is_spreadsheet_name(file_name) {
        for engine in SPREADSHEET_ENGINES {
            match engine.read(bytes) {
                Ok(table) => {
                    let notice = format!("Datei erfolgreich als Excel mit {} gelesen", engine.name());
                    add_log(logs, "INFO", "Loader", &notice);
                    return Ok((table, vec![notice]));
                }
                Err(e) => errors.push(format!("Fehler beim Lesen mit {}: {}", engine.name(), e)),
            }
        }
    }

    match CsvParser::parse_bytes_auto_detect(bytes) {
        Ok((table, dialect)) => {
            let notice = format!(
                "Datei erfolgreich als CSV mit Encoding {} und Trennzeichen '{}' gelesen",
                dialect.encoding,
                dialect.separator_label()
            );
            add_log(logs, "INFO", "Loader", &notice);
            Ok((table, vec![notice]))
        }
        Err(csv_errors) => {
            errors.extend(csv_errors);
            add_log(
                logs,
                "ERROR",
                "Loader",
                &format!("No reader could parse {} ({} attempts)", file_name, errors.len()),
            );
            Err(AppError::ParseError(errors.join("\n")))
        }
    }
}

/// Trim headers, detect the format, coerce its numeric columns and derive
/// first/last name columns for Pagisto exports
pub fn prepare_table(mut table: MemberTable) -> Result<(MemberTable, ReportFormat)> {
    table.trim_headers();

    if table.is_empty() {
        return Err(AppError::ValidationError(
            "Die Datei enthält keine Datenzeilen".to_string(),
        ));
    }

    let format = detect_format(table.columns());
    if format == ReportFormat::Pagisto && table.has_column("Mitglied") {
        table.split_column("Mitglied", "Vorname", "Nachname")?;
    }
    table.coerce_numeric(format.numeric_columns());

    Ok((table, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::Cell;

    const PALMS_CSV: &str = "Vorname;Nachname;P;A;L;M;S;G (Eigenbedarf);G (extern);R (Eigenbedarf);R (extern);V;1-2-1;U;CTE;T\n\
        Anna;Meier;20;1;0;0;1;5;3;4;2;1;6;1500;4;2\n\
        Ben;Abel;18;3;1;0;0;2;1;x;0;0;3;250,5;2;1\n";

    const PAGISTO_CSV: &str = " Datum ,Mitglied,Platzierung,Abwesenheit,Empfehlungen,Umsatzdanke,Besucher,121s,Testimonials,CTE,Punkte\n\
        2024-05-01,Clara von Berg,1,0,7,3200,2,5,1,3,95\n\
        2024-05-01,Dieter Koch,2,1,4,800,0,3,0,1,70\n";

    fn logs() -> Mutex<Vec<LogEntry>> {
        Mutex::new(Vec::new())
    }

    #[test]
    fn test_loads_palms_semicolon_csv() {
        let use_case = LoadReportUseCase::new(4);
        let report = use_case
            .execute("palms.csv", PALMS_CSV.as_bytes(), &logs())
            .unwrap();

        assert_eq!(report.format, ReportFormat::Palms);
        assert_eq!(report.table.len(), 2);
        assert!(report.notices[0].contains("Trennzeichen ';'"));

        let u = report.table.numeric_values("U").unwrap();
        assert_eq!(u, vec![Some(1500.0), Some(250.5)]);
        let r = report.table.numeric_values("R (Eigenbedarf)").unwrap();
        assert_eq!(r, vec![Some(4.0), None]);
    }

    #[test]
    fn test_loads_pagisto_and_splits_names() {
        let use_case = LoadReportUseCase::new(4);
        let report = use_case
            .execute("pagisto.csv", PAGISTO_CSV.as_bytes(), &logs())
            .unwrap();

        assert_eq!(report.format, ReportFormat::Pagisto);
        assert!(report.table.has_column("Datum"));
        assert_eq!(
            report.table.text_values("Nachname").unwrap(),
            vec!["von Berg", "Koch"]
        );
        assert_eq!(report.table.rows()[0][2], Cell::Number(1.0));
    }

    #[test]
    fn test_loads_pagisto_xlsx_with_excel_engine() {
        use crate::domain::report::PAGISTO_COLUMNS;
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let mut workbook = Workbook::new();
        let date_format = Format::new().set_num_format("dd.mm.yyyy");
        let date = ExcelDateTime::from_ymd(2024, 5, 1).unwrap();
        let sheet = workbook.add_worksheet();
        for (col, name) in PAGISTO_COLUMNS.iter().enumerate() {
            sheet.write_string(0, col as u16, *name).unwrap();
        }
        for (idx, member) in ["Clara von Berg", "Dieter Koch"].iter().enumerate() {
            let row = idx as u32 + 1;
            sheet.write_datetime_with_format(row, 0, &date, &date_format).unwrap();
            sheet.write_string(row, 1, *member).unwrap();
            for col in 2..PAGISTO_COLUMNS.len() as u16 {
                sheet.write_number(row, col, f64::from(col) * f64::from(row)).unwrap();
            }
        }
        let bytes = workbook.save_to_buffer().unwrap();

        let report = LoadReportUseCase::new(4)
            .execute("Bericht.XLSX", &bytes, &logs())
            .unwrap();

        assert_eq!(report.format, ReportFormat::Pagisto);
        assert_eq!(report.notices, vec!["Datei erfolgreich als Excel mit xlsx gelesen"]);
        assert_eq!(
            report.table.text_values("Datum").unwrap(),
            vec!["2024-05-01 00:00:00", "2024-05-01 00:00:00"]
        );
        assert_eq!(
            report.table.text_values("Nachname").unwrap(),
            vec!["von Berg", "Koch"]
        );
        assert_eq!(
            report.table.numeric_values("Punkte").unwrap(),
            vec![Some(10.0), Some(20.0)]
        );
    }

    #[test]
    fn test_second_upload_hits_cache() {
        let use_case = LoadReportUseCase::new(4);
        let logs = logs();
        let first = use_case.execute("p.csv", PALMS_CSV.as_bytes(), &logs).unwrap();
        let second = use_case.execute("p.csv", PALMS_CSV.as_bytes(), &logs).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(logs
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.message.contains("cached")));
    }

    #[test]
    fn test_unreadable_file_reports_every_attempt() {
        let use_case = LoadReportUseCase::new(4);
        let err = use_case
            .execute("broken.xlsx", b"einspaltig\n1\n", &logs())
            .unwrap_err();

        let AppError::ParseError(msg) = err else {
            panic!("expected parse error, got {:?}", err);
        };
        assert!(msg.contains("Fehler beim Lesen mit xlsx"));
        assert!(msg.contains("Fehler beim Lesen mit xls"));
        assert!(msg.contains("windows-1252"));
    }

    #[test]
    fn test_empty_upload_and_header_only_file_are_rejected() {
        let use_case = LoadReportUseCase::new(4);
        assert!(matches!(
            use_case.execute("a.csv", b"", &logs()),
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            use_case.execute("a.csv", b"Vorname,Nachname\n", &logs()),
            Err(AppError::ValidationError(_))
        ));
    }
}
