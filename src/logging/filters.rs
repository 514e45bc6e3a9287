use tracing_subscriber::EnvFilter;

use super::config::LoggingConfig;

/// Строит фильтр событий.
///
/// `RUST_LOG` имеет приоритет; без него используется директива из
/// конфигурации. Конфигурация к этому моменту уже провалидирована, так что
/// откат на `info` срабатывает только при гонке с внешним изменением.
pub fn build_filter_from_config(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.build_filter_directive()))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
