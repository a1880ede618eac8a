// ============================================================
// MEMBER TABLE
// ============================================================
// In-memory table of member records with the handful of frame
// operations the dashboard needs (sort, head, filter, melt, export)

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::domain::error::{AppError, Result};

/// A single table cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Cell {
    Text(String),
    Number(f64),
    Missing,
}

impl Cell {
    /// Build a cell from raw text. Blank values become `Missing`.
    pub fn from_raw(raw: &str) -> Self {
        if raw.trim().is_empty() {
            Cell::Missing
        } else {
            Cell::Text(raw.to_string())
        }
    }

    pub fn number(value: f64) -> Self {
        if value.is_finite() {
            Cell::Number(value)
        } else {
            Cell::Missing
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Coerce to a number; anything unparseable becomes `Missing`
    pub fn coerce_numeric(&self) -> Cell {
        match self {
            Cell::Number(v) => Cell::number(*v),
            Cell::Missing => Cell::Missing,
            Cell::Text(text) => parse_number(text).map(Cell::number).unwrap_or(Cell::Missing),
        }
    }

    /// Text used in tables, CSV export and chart axes
    pub fn display(&self) -> String {
        match self {
            Cell::Text(text) => text.clone(),
            Cell::Number(v) => v.to_string(),
            Cell::Missing => String::new(),
        }
    }

    fn compare(&self, other: &Cell) -> Ordering {
        match (self, other) {
            (Cell::Number(a), Cell::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Cell::Text(a), Cell::Text(b)) => a.cmp(b),
            (Cell::Number(_), Cell::Text(_)) => Ordering::Less,
            (Cell::Text(_), Cell::Number(_)) => Ordering::Greater,
            _ => Ordering::Equal,
        }
    }
}

/// Parse a numeric string, accepting a single German decimal comma ("12,5")
fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = trimmed.parse::<f64>() {
        return Some(value);
    }
    if trimmed.matches(',').count() == 1 && !trimmed.contains('.') {
        return trimmed.replace(',', ".").parse::<f64>().ok();
    }
    None
}

/// One row of a melted (long format) table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeltedRow {
    pub id: String,
    pub category: String,
    pub value: Option<f64>,
}

/// Ordered columns plus rows of cells. Rows always have one cell per column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl MemberTable {
    /// Create a table, padding short rows with `Missing` and dropping overflow cells
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Missing);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| AppError::NotFound(format!("column '{}'", name)))
    }

    /// Strip surrounding whitespace from every header
    pub fn trim_headers(&mut self) {
        for column in &mut self.columns {
            *column = column.trim().to_string();
        }
    }

    /// Coerce the listed columns to numbers. Absent columns are skipped.
    pub fn coerce_numeric(&mut self, columns: &[&str]) {
        for name in columns {
            if let Some(idx) = self.column_index(name) {
                for row in &mut self.rows {
                    row[idx] = row[idx].coerce_numeric();
                }
            }
        }
    }

    /// Split `source` on its first space into `first` and `second`,
    /// replacing those columns if they already exist.
    pub fn split_column(&mut self, source: &str, first: &str, second: &str) -> Result<()> {
        let src = self.require_column(source)?;
        let first_idx = self.ensure_column(first);
        let second_idx = self.ensure_column(second);

        for row in &mut self.rows {
            let (head, tail) = match &row[src] {
                Cell::Missing => (Cell::Missing, Cell::Missing),
                cell => {
                    let text = cell.display();
                    match text.split_once(' ') {
                        Some((head, tail)) => (Cell::from_raw(head), Cell::from_raw(tail)),
                        None => (Cell::from_raw(&text), Cell::Missing),
                    }
                }
            };
            row[first_idx] = head;
            row[second_idx] = tail;
        }
        Ok(())
    }

    fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(Cell::Missing);
        }
        self.columns.len() - 1
    }

    /// Stable sort on one column; missing values always go last
    pub fn sorted_by(&self, column: &str, ascending: bool) -> Result<MemberTable> {
        let idx = self.require_column(column)?;
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| match (a[idx].is_missing(), b[idx].is_missing()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ord = a[idx].compare(&b[idx]);
                if ascending {
                    ord
                } else {
                    ord.reverse()
                }
            }
        });
        Ok(MemberTable {
            columns: self.columns.clone(),
            rows,
        })
    }

    pub fn head(&self, n: usize) -> MemberTable {
        MemberTable {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Rows whose `column` text is one of `names`
    pub fn filter_by(&self, column: &str, names: &[String]) -> Result<MemberTable> {
        let idx = self.require_column(column)?;
        let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
        let rows = self
            .rows
            .iter()
            .filter(|row| !row[idx].is_missing() && wanted.contains(row[idx].display().as_str()))
            .cloned()
            .collect();
        Ok(MemberTable {
            columns: self.columns.clone(),
            rows,
        })
    }

    pub fn select(&self, columns: &[&str]) -> Result<MemberTable> {
        let indices = columns
            .iter()
            .map(|name| self.require_column(name))
            .collect::<Result<Vec<_>>>()?;
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(MemberTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        })
    }

    /// Non-missing display values of a column, in row order
    pub fn text_values(&self, column: &str) -> Result<Vec<String>> {
        let idx = self.require_column(column)?;
        Ok(self
            .rows
            .iter()
            .filter(|row| !row[idx].is_missing())
            .map(|row| row[idx].display())
            .collect())
    }

    pub fn numeric_values(&self, column: &str) -> Result<Vec<Option<f64>>> {
        let idx = self.require_column(column)?;
        Ok(self.rows.iter().map(|row| row[idx].as_number()).collect())
    }

    /// Sum of a column, skipping missing values
    pub fn column_sum(&self, column: &str) -> Result<f64> {
        Ok(self.numeric_values(column)?.into_iter().flatten().sum())
    }

    /// Append `name = a + b`; missing when either side is missing
    pub fn with_sum_column(&self, name: &str, a: &str, b: &str) -> Result<MemberTable> {
        let a_idx = self.require_column(a)?;
        let b_idx = self.require_column(b)?;
        let mut table = self.clone();
        let target = table.ensure_column(name);
        for row in &mut table.rows {
            row[target] = match (row[a_idx].as_number(), row[b_idx].as_number()) {
                (Some(x), Some(y)) => Cell::number(x + y),
                _ => Cell::Missing,
            };
        }
        Ok(table)
    }

    /// Long format: one row per (id, value column). `value_columns` pairs a
    /// column with the category label it gets in the output.
    pub fn melt(&self, id_column: &str, value_columns: &[(&str, &str)]) -> Result<Vec<MeltedRow>> {
        let id_idx = self.require_column(id_column)?;
        let value_indices = value_columns
            .iter()
            .map(|(column, label)| Ok((self.require_column(column)?, *label)))
            .collect::<Result<Vec<_>>>()?;

        let mut melted = Vec::with_capacity(self.rows.len() * value_indices.len());
        for (idx, label) in &value_indices {
            for row in &self.rows {
                melted.push(MeltedRow {
                    id: row[id_idx].display(),
                    category: label.to_string(),
                    value: row[*idx].as_number(),
                });
            }
        }
        Ok(melted)
    }

    /// Comma separated export, header first, no index column
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(Cell::display))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| AppError::Internal(format!("Failed to flush CSV writer: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("CSV export is not valid UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> MemberTable {
        MemberTable::new(
            vec!["Nachname".into(), "U".into()],
            vec![
                vec![Cell::Text("Meier".into()), Cell::Number(300.0)],
                vec![Cell::Text("Schulz".into()), Cell::Missing],
                vec![Cell::Text("Abel".into()), Cell::Number(1200.0)],
                vec![Cell::Text("Zander".into()), Cell::Number(300.0)],
            ],
        )
    }

    #[test]
    fn test_short_rows_are_padded() {
        let t = MemberTable::new(vec!["a".into(), "b".into()], vec![vec![Cell::Number(1.0)]]);
        assert_eq!(t.rows()[0], vec![Cell::Number(1.0), Cell::Missing]);
    }

    #[test]
    fn test_coerce_numeric_handles_junk_and_decimal_comma() {
        assert_eq!(Cell::Text(" 42 ".into()).coerce_numeric(), Cell::Number(42.0));
        assert_eq!(Cell::Text("12,5".into()).coerce_numeric(), Cell::Number(12.5));
        assert_eq!(Cell::Text("n/a".into()).coerce_numeric(), Cell::Missing);
        assert_eq!(Cell::Text("NaN".into()).coerce_numeric(), Cell::Missing);
        assert_eq!(Cell::Text("1.000,5".into()).coerce_numeric(), Cell::Missing);
    }

    #[test]
    fn test_sort_descending_puts_missing_last_and_is_stable() {
        let sorted = table().sorted_by("U", false).unwrap();
        let names = sorted.text_values("Nachname").unwrap();
        assert_eq!(names, vec!["Abel", "Meier", "Zander", "Schulz"]);
    }

    #[test]
    fn test_sort_ascending_puts_missing_last() {
        let sorted = table().sorted_by("U", true).unwrap();
        let names = sorted.text_values("Nachname").unwrap();
        assert_eq!(names, vec!["Meier", "Zander", "Abel", "Schulz"]);
    }

    #[test]
    fn test_sort_unknown_column_is_not_found() {
        assert!(matches!(table().sorted_by("X", true), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_split_column_on_first_space() {
        let mut t = MemberTable::new(
            vec!["Mitglied".into()],
            vec![
                vec![Cell::Text("Anna Maria Schmidt".into())],
                vec![Cell::Text("Cher".into())],
                vec![Cell::Missing],
            ],
        );
        t.split_column("Mitglied", "Vorname", "Nachname").unwrap();
        assert_eq!(t.columns(), &["Mitglied", "Vorname", "Nachname"]);
        assert_eq!(t.rows()[0][1], Cell::Text("Anna".into()));
        assert_eq!(t.rows()[0][2], Cell::Text("Maria Schmidt".into()));
        assert_eq!(t.rows()[1][2], Cell::Missing);
        assert_eq!(t.rows()[2][1], Cell::Missing);
    }

    #[test]
    fn test_filter_select_and_sum() {
        let t = table();
        let picked = t
            .filter_by("Nachname", &["Abel".to_string(), "Schulz".to_string()])
            .unwrap();
        assert_eq!(picked.len(), 2);
        assert_eq!(t.column_sum("U").unwrap(), 1800.0);
        assert!(t.select(&["Nachname", "V"]).is_err());
        assert_eq!(t.select(&["U"]).unwrap().columns(), &["U"]);
    }

    #[test]
    fn test_with_sum_column_propagates_missing() {
        let t = MemberTable::new(
            vec!["a".into(), "b".into()],
            vec![
                vec![Cell::Number(1.0), Cell::Number(2.0)],
                vec![Cell::Number(1.0), Cell::Missing],
            ],
        );
        let summed = t.with_sum_column("c", "a", "b").unwrap();
        assert_eq!(summed.rows()[0][2], Cell::Number(3.0));
        assert_eq!(summed.rows()[1][2], Cell::Missing);
    }

    #[test]
    fn test_melt_relabels_categories() {
        let melted = table().head(2).melt("Nachname", &[("U", "Umsatz")]).unwrap();
        assert_eq!(melted.len(), 2);
        assert_eq!(melted[0].category, "Umsatz");
        assert_eq!(melted[1].value, None);
    }

    #[test]
    fn test_to_csv_quotes_and_blanks() {
        let t = MemberTable::new(
            vec!["Name".into(), "U".into()],
            vec![vec![Cell::Text("Meier, Hans".into()), Cell::Missing]],
        );
        assert_eq!(t.to_csv().unwrap(), "Name,U\n\"Meier, Hans\",\n");
    }
}
