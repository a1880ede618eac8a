pub mod cache;
pub mod charts;
#[path = "config/mod.rs"]
pub mod config_mod;
pub use config_mod as config;
pub mod csv;
pub mod excel;
pub mod export;
