pub mod dashboard;
pub mod load_report;
