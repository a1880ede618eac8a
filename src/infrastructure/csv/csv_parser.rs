// ============================================================
// CSV PARSER
// ============================================================
// Decode and parse delimited text, brute-forcing encoding and
// separator until one combination yields a real table

use csv::{ReaderBuilder, Trim};
use encoding_rs::Encoding;

use crate::domain::error::{AppError, Result};
use crate::domain::report::{Cell, MemberTable};

/// Encodings tried in order; the latin1 aliases all resolve to windows-1252
pub const CSV_ENCODINGS: &[&str] = &["utf-8", "latin1", "cp1252", "iso-8859-1", "windows-1252"];

/// Separators tried for every encoding
pub const CSV_SEPARATORS: &[u8] = &[b',', b';', b'\t'];

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// The (encoding, separator) pair that produced a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvDialect {
    pub encoding: &'static str,
    pub separator: u8,
}

impl CsvDialect {
    /// Separator as shown to users ("\t" for tab)
    pub fn separator_label(&self) -> String {
        separator_label(self.separator)
    }
}

pub fn separator_label(separator: u8) -> String {
    match separator {
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}

/// CSV parser for a single dialect. Values are always trimmed.
pub struct CsvParser {
    /// Delimiter character (default: comma)
    delimiter: u8,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Parse decoded CSV text into a table.
    ///
    /// Fails when the header has fewer than two columns or any row has
    /// more fields than the header. Short rows are padded and blank
    /// headers become `Unnamed: <index>`.
    pub fn parse_content(&self, content: &str) -> Result<MemberTable> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?
            .iter()
            .enumerate()
            .map(|(idx, h)| {
                if h.is_empty() {
                    format!("Unnamed: {}", idx)
                } else {
                    h.to_string()
                }
            })
            .collect();

        if headers.len() < 2 {
            return Err(AppError::ParseError(format!(
                "Expected at least 2 columns, found {}",
                headers.len()
            )));
        }

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse CSV row {}: {}", index + 1, e))
            })?;

            if record.len() > headers.len() {
                return Err(AppError::ParseError(format!(
                    "Expected {} fields in row {}, saw {}",
                    headers.len(),
                    index + 1,
                    record.len()
                )));
            }
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }

            rows.push(record.iter().map(Cell::from_raw).collect());
        }

        Ok(MemberTable::new(headers, rows))
    }

    /// Try every encoding/separator pair in order. On failure the error
    /// carries one line per attempt.
    pub fn parse_bytes_auto_detect(bytes: &[u8]) -> std::result::Result<(MemberTable, CsvDialect), Vec<String>> {
        let mut errors = Vec::new();

        for &encoding in CSV_ENCODINGS {
            let content = match decode_strict(bytes, encoding) {
                Ok(content) => content,
                Err(e) => {
                    for &separator in CSV_SEPARATORS {
                        errors.push(attempt_error(encoding, separator, &e));
                    }
                    continue;
                }
            };

            for &separator in CSV_SEPARATORS {
                match Self::new().with_delimiter(separator).parse_content(&content) {
                    Ok(table) => {
                        return Ok((table, CsvDialect { encoding, separator }));
                    }
                    Err(e) => errors.push(attempt_error(encoding, separator, &e)),
                }
            }
        }

        Err(errors)
    }
}

fn attempt_error(encoding: &str, separator: u8, err: &AppError) -> String {
    format!(
        "Fehler beim Lesen als CSV mit {} und '{}': {}",
        encoding,
        separator_label(separator),
        err
    )
}

/// Decode without replacement characters; a UTF-8 BOM is dropped
pub fn decode_strict(bytes: &[u8], label: &str) -> Result<String> {
    let encoding = Encoding::for_label(label.as_bytes())
        .ok_or_else(|| AppError::ValidationError(format!("Unknown encoding '{}'", label)))?;

    let bytes = if encoding == encoding_rs::UTF_8 {
        bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
    } else {
        bytes
    };

    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
        .ok_or_else(|| AppError::ParseError(format!("Content is not valid {}", encoding.name())))
}
