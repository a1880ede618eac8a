use serde::Serialize;

use super::{Cell, MemberTable, ReportFormat, ViewOptions};

/// Rendered table: headers plus display strings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl From<&MemberTable> for TableView {
    fn from(table: &MemberTable) -> Self {
        Self {
            columns: table.columns().to_vec(),
            rows: table
                .rows()
                .iter()
                .map(|row| row.iter().map(Cell::display).collect())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Block {
    Heading(String),
    /// Inline SVG markup
    Chart(String),
    Table(TableView),
    Warning(String),
    Error(String),
    /// Side-by-side columns
    Columns(Vec<Vec<Block>>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tab {
    pub title: String,
    pub blocks: Vec<Block>,
    /// Render the member/metric selection form above the blocks
    pub member_picker: bool,
}

/// Everything the page renderer needs for one request
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub format: ReportFormat,
    pub file_name: String,
    pub row_count: usize,
    pub view: ViewOptions,
    pub warnings: Vec<String>,
    pub tabs: Vec<Tab>,
    pub raw: TableView,
    pub download_link: String,
}

impl Dashboard {
    /// Error blocks anywhere in the tabs, mostly for tests and logging
    pub fn error_count(&self) -> usize {
        fn count(blocks: &[Block]) -> usize {
            blocks
                .iter()
                .map(|b| match b {
                    Block::Error(_) => 1,
                    Block::Columns(cols) => cols.iter().map(|c| count(c)).sum(),
                    _ => 0,
                })
                .sum()
        }
        self.tabs.iter().map(|t| count(&t.blocks)).sum()
    }

    pub fn chart_count(&self) -> usize {
        fn count(blocks: &[Block]) -> usize {
            blocks
                .iter()
                .map(|b| match b {
                    Block::Chart(_) => 1,
                    Block::Columns(cols) => cols.iter().map(|c| count(c)).sum(),
                    _ => 0,
                })
                .sum()
        }
        self.tabs.iter().map(|t| count(&t.blocks)).sum()
    }
}
