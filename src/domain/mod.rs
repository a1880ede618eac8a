pub mod error;

// Member reports and dashboard view model
pub mod report;
