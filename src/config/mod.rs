//! Конфигурация: настройки сессии и загрузка из файла и окружения.

mod session;
mod settings;

pub use session::{SessionConfig, SessionConfigBuilder};
pub use settings::{Settings, ENV_PREFIX};
