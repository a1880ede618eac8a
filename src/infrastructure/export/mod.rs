use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::error::Result;
use crate::domain::report::MemberTable;
use crate::shared::html::escape;

pub const DEFAULT_DOWNLOAD_NAME: &str = "bni_data.csv";

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());

static REPEATED_UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{2,}").unwrap());

/// `data:` URI carrying the CSV text as base64
pub fn csv_data_uri(csv: &str) -> String {
    format!("data:file/csv;base64,{}", STANDARD.encode(csv.as_bytes()))
}

/// Anchor that downloads the whole table as CSV without a server round trip
pub fn download_link(table: &MemberTable, file_name: &str) -> Result<String> {
    let csv = table.to_csv()?;
    Ok(format!(
        r#"<a href="{}" download="{}">Download als CSV</a>"#,
        csv_data_uri(&csv),
        escape(file_name)
    ))
}

/// File name for `/download.csv`, derived from the uploaded name
pub fn export_file_name(upload_name: &str) -> String {
    let stem = upload_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(upload_name);

    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(stem.trim(), "_");
    let cleaned = REPEATED_UNDERSCORES.replace_all(&cleaned, "_");
    let cleaned = cleaned.trim_matches(|c| c == '_' || c == '.');

    if cleaned.is_empty() {
        DEFAULT_DOWNLOAD_NAME.to_string()
    } else {
        format!("{}.csv", cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::Cell;

    #[test]
    fn test_download_link_round_trips_csv() {
        let table = MemberTable::new(
            vec!["Nachname".into(), "U".into()],
            vec![vec![Cell::Text("Müller".into()), Cell::Number(1500.0)]],
        );
        let link = download_link(&table, DEFAULT_DOWNLOAD_NAME).unwrap();
        assert!(link.contains(r#"download="bni_data.csv""#));

        let encoded = link
            .split("base64,")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap();
        let decoded = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
        assert_eq!(decoded, "Nachname,U\nMüller,1500\n");
    }

    #[test]
    fn test_export_file_name_is_sanitised() {
        assert_eq!(export_file_name("PALMS Bericht (März).xlsx"), "PALMS_Bericht_M_rz.csv");
        assert_eq!(export_file_name("report.csv"), "report.csv");
        assert_eq!(export_file_name("???.csv"), DEFAULT_DOWNLOAD_NAME);
    }
}
