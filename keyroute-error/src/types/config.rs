use std::any::Any;

use crate::{ErrorExt, StatusCode};

/// Ошибки конфигурации сессии и логирования
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Значение поля недопустимо
    Invalid { field: String, reason: String },
    /// Источник конфигурации не прочитан или не десериализован
    Load { reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Invalid { field, reason } => {
                write!(f, "Invalid configuration value for '{field}': {reason}")
            }
            Self::Load { reason } => write!(f, "Failed to load configuration: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ErrorExt for ConfigError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Invalid { .. } => StatusCode::InvalidConfig,
            Self::Load { .. } => StatusCode::ConfigLoadFailed,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = ConfigError::Invalid {
            field: "queue_capacity".into(),
            reason: "must be positive".into(),
        };
        assert_eq!(err.status_code(), StatusCode::InvalidConfig);
        assert!(err.to_string().contains("queue_capacity"));
    }
}
