pub mod use_cases;

pub use use_cases::dashboard::DashboardUseCase;
pub use use_cases::load_report::LoadReportUseCase;
