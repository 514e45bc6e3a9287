use std::path::Path;

use config::{Config, Environment, File};
use keyroute_error::ConfigError;
use serde::{Deserialize, Serialize};

use super::SessionConfig;
use crate::logging::LoggingConfig;

/// Префикс переменных окружения: `KEYROUTE_SESSION__RELAY=true`.
pub const ENV_PREFIX: &str = "KEYROUTE";

/// Полная конфигурация процесса.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Загружает настройки: значения по умолчанию, затем файл (если указан),
    /// затем переменные окружения. Результат проверяется.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // Добавляем переменные окружения с префиксом KEYROUTE_
        let cfg = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("session.endpoints")
                    .with_list_parse_key("logging.directives"),
            )
            .build()
            .map_err(load_error)?;

        // Десериализуем конфигурацию в нашу структуру
        let settings: Settings = cfg.try_deserialize().map_err(load_error)?;
        settings.session.validate()?;
        settings.logging.validate()?;
        Ok(settings)
    }
}

fn load_error(e: config::ConfigError) -> ConfigError {
    ConfigError::Load {
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::{env, io::Write};

    use serial_test::serial;

    use super::*;
    use crate::logging::LogFormat;

    fn clear_env() {
        for (key, _) in env::vars() {
            if key.starts_with("KEYROUTE_") {
                env::remove_var(key);
            }
        }
    }

    fn toml_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    #[serial]
    fn test_load_defaults() {
        clear_env();
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        clear_env();
        let file = toml_file(
            r#"
            [session]
            work_thread_num = 4
            endpoints = ["mem/a", "mem/b"]

            [logging]
            level = "debug"
            [logging.console]
            format = "json"
            "#,
        );

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.session.work_thread_num, 4);
        assert_eq!(settings.session.endpoints, vec!["mem/a", "mem/b"]);
        assert_eq!(settings.session.queue_capacity, 1024);
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.logging.console.format, LogFormat::Json);
    }

    /// Тест проверяет, что переменные окружения перекрывают файл.
    #[test]
    #[serial]
    fn test_env_overrides_file() {
        clear_env();
        let file = toml_file("[session]\nwork_thread_num = 4\n");
        env::set_var("KEYROUTE_SESSION__WORK_THREAD_NUM", "6");
        env::set_var("KEYROUTE_SESSION__RELAY", "true");
        env::set_var("KEYROUTE_SESSION__ENDPOINTS", "mem/x,mem/y");

        let result = Settings::load(Some(file.path()));
        clear_env();

        let settings = result.unwrap();
        assert_eq!(settings.session.work_thread_num, 6);
        assert!(settings.session.relay);
        assert_eq!(settings.session.endpoints, vec!["mem/x", "mem/y"]);
    }

    #[test]
    #[serial]
    fn test_invalid_values_rejected() {
        clear_env();
        env::set_var("KEYROUTE_SESSION__QUEUE_CAPACITY", "0");
        let result = Settings::load(None);
        clear_env();

        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    #[serial]
    fn test_missing_file_is_load_error() {
        clear_env();
        let result = Settings::load(Some(Path::new("/nonexistent/keyroute.toml")));
        assert!(matches!(result, Err(ConfigError::Load { .. })));
    }
}
