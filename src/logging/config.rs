use std::{fs, io, path::PathBuf, str::FromStr};

use keyroute_error::ConfigError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Формат вывода событий.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

/// Период ротации файлового лога.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    Hourly,
    #[default]
    Daily,
    Never,
}

/// Настройки вывода в консоль (stdout).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_thread_ids: bool,
    pub with_line_numbers: bool,
}

/// Настройки файлового вывода через неблокирующий writer.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    pub enabled: bool,
    /// Каталог для файлов лога
    pub dir: PathBuf,
    /// Префикс имени файла (к нему добавляется дата)
    pub prefix: String,
    pub rotation: Rotation,
    pub format: LogFormat,
}

/// Конфигурация логирования.
///
/// `level` задаёт общий уровень, `directives` добавляют точечные правила в
/// синтаксисе `EnvFilter` (например `keyroute::link=trace`). Переменная
/// окружения `RUST_LOG`, если задана, имеет приоритет над обоими.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub directives: Vec<String>,
    pub console: ConsoleConfig,
    pub file: FileConfig,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl LoggingConfig {
    /// Собирает директиву фильтра: `"<level>,<directive>,..."`.
    pub fn build_filter_directive(&self) -> String {
        std::iter::once(self.level.as_str())
            .chain(self.directives.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Проверяет уровень и директивы.
    pub fn validate(&self) -> Result<(), ConfigError> {
        LevelFilter::from_str(&self.level).map_err(|e| ConfigError::Invalid {
            field: "logging.level".into(),
            reason: format!("'{}': {e}", self.level),
        })?;

        for directive in &self.directives {
            EnvFilter::try_new(directive).map_err(|e| ConfigError::Invalid {
                field: "logging.directives".into(),
                reason: format!("'{directive}': {e}"),
            })?;
        }

        if self.file.enabled && self.file.prefix.is_empty() {
            return Err(ConfigError::Invalid {
                field: "logging.file.prefix".into(),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Создаёт каталог для файлового лога, если он включён.
    pub fn ensure_log_dir(&self) -> io::Result<()> {
        if self.file.enabled {
            fs::create_dir_all(&self.file.dir)?;
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: LogFormat::Compact,
            with_ansi: true,
            with_target: true,
            with_thread_ids: false,
            with_line_numbers: false,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::from("logs"),
            prefix: "keyroute.log".to_string(),
            rotation: Rotation::Daily,
            format: LogFormat::Json,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directives: Vec::new(),
            console: ConsoleConfig::default(),
            file: FileConfig::default(),
        }
    }
}

impl From<Rotation> for tracing_appender::rolling::Rotation {
    fn from(value: Rotation) -> Self {
        match value {
            Rotation::Hourly => Self::HOURLY,
            Rotation::Daily => Self::DAILY,
            Rotation::Never => Self::NEVER,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
