use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use crate::infrastructure::config::AppConfig;
use crate::interfaces::http::{add_log, start_server};

pub async fn run() -> std::io::Result<()> {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
            tracing::error!("Failed to load configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_str()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let logs = Arc::new(Mutex::new(Vec::new()));
    add_log(
        &logs,
        "INFO",
        "Server",
        &format!(
            "Dashboard listening on http://{}:{}",
            config.host, config.port
        ),
    );

    start_server(&config, logs)?.await
}
