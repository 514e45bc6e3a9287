//! Структурированное логирование на `tracing`.
//!
//! Фильтр строится из конфигурации (или `RUST_LOG`), события пишутся в
//! консоль и, по желанию, в файл с ротацией через неблокирующий writer.

pub mod config;
mod filters;
mod formatter;
pub mod handle;

pub use config::{ConsoleConfig, FileConfig, LogFormat, LoggingConfig, Rotation};
pub use handle::LoggingHandle;
use keyroute_error::ConfigError;
use thiserror::Error;
use tracing_appender::{non_blocking, rolling::RollingFileAppender};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Ошибки инициализации логирования.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid logging configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Failed to prepare log directory: {0}")]
    LogDir(#[source] std::io::Error),
    #[error("Failed to open log file: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),
    #[error("Global subscriber is already set: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

/// Инициализация логирования с конфигурацией.
///
/// Устанавливает глобальный subscriber, поэтому успешно отрабатывает один
/// раз на процесс. Возвращённый handle нужно держать до завершения.
pub fn init_logging(config: LoggingConfig) -> Result<LoggingHandle, LoggingError> {
    config.validate()?;
    config.ensure_log_dir().map_err(LoggingError::LogDir)?;

    let env_filter = filters::build_filter_from_config(&config);
    let mut layers = Vec::new();

    if config.console.enabled {
        layers.push(formatter::console_layer(&config.console));
    }

    let file_guard = if config.file.enabled {
        let appender = RollingFileAppender::builder()
            .rotation(config.file.rotation.into())
            .filename_prefix(&config.file.prefix)
            .build(&config.file.dir)?;
        let (writer, guard) = non_blocking(appender);
        let opts = formatter::FmtOptions {
            format: config.file.format,
            with_ansi: false,
            with_target: true,
            with_thread_ids: config.console.with_thread_ids,
            with_line_numbers: config.console.with_line_numbers,
        };
        layers.push(formatter::build_layer(opts, writer));
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        console_enabled = config.console.enabled,
        file_enabled = config.file.enabled,
        "Logging system initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет, что невалидная конфигурация отклоняется до установки
    /// глобального subscriber-а.
    #[test]
    fn test_init_rejects_invalid_config() {
        let cfg = LoggingConfig {
            level: "chatty".into(),
            ..Default::default()
        };
        assert!(matches!(init_logging(cfg), Err(LoggingError::Config(_))));
    }
}
