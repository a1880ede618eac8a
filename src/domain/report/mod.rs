// ============================================================
// REPORT DOMAIN LAYER
// ============================================================
// Member tables, report formats, view selections and the dashboard
// view model. No I/O here.

mod chart;
mod dashboard;
mod format;
mod table;
mod view;

use chrono::{DateTime, Local};
use serde::Serialize;

pub use chart::{BarChart, Palette};
pub use dashboard::{Block, Dashboard, Tab, TableView};
pub use format::{detect_format, ReportFormat};
#[cfg(test)]
pub use format::{PAGISTO_COLUMNS, PALMS_COLUMNS};
pub use table::{Cell, MeltedRow, MemberTable};
pub use view::{ViewDefaults, ViewOptions};

/// A parsed upload, ready for rendering
#[derive(Debug, Clone, Serialize)]
pub struct LoadedReport {
    pub file_name: String,
    pub format: ReportFormat,
    pub table: MemberTable,
    /// Success messages from the loader (engine, encoding, separator)
    pub notices: Vec<String>,
    pub loaded_at: DateTime<Local>,
}
