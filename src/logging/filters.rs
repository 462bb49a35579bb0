use tracing_subscriber::EnvFilter;

use crate::logging::config::LoggingConfig;

/// Фильтр из `RUST_LOG`, иначе из конфигурации, иначе `info`.
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    if let Ok(env_filter) = EnvFilter::try_from_default_env() {
        return env_filter;
    }
    EnvFilter::try_new(&config.level).unwrap_or_else(|e| {
        eprintln!(
            "Invalid log filter directive from config ('{}'): {}; falling back to 'info'",
            config.level, e
        );
        EnvFilter::new("info")
    })
}
