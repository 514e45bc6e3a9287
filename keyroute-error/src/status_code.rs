use std::fmt;

use num_enum::TryFromPrimitive;
#[cfg(feature = "serde_repr")]
use serde_repr::{Deserialize_repr, Serialize_repr};
#[cfg(feature = "strum")]
use strum_macros::{AsRefStr, EnumIter};

/// Коды статуса для категоризации ошибок маршрутизатора.
///
/// # Диапазоны:
/// - 0xxx: Успех
/// - 1xxx: Общие ошибки
/// - 2xxx: Ключевые выражения
/// - 3xxx: Подписки
/// - 4xxx: Сессия
/// - 5xxx: Слушатели
/// - 6xxx: Линки / транспорт
/// - 7xxx: Конфигурация
///
/// `num_enum::TryFromPrimitive` даёт `TryFrom<u32>`, что удобно, когда код
/// уходит за пределы процесса.
#[cfg_attr(feature = "strum", derive(AsRefStr, EnumIter))]
#[cfg_attr(feature = "serde_repr", derive(Serialize_repr, Deserialize_repr))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 0xxx: Успех ===
    Success = 0,

    // === 1xxx: Общие ошибки ===
    Unknown = 1000,
    Internal = 1001,
    InvalidArgs = 1002,
    RuntimeUnavailable = 1003,

    // === 2xxx: Ключевые выражения ===
    MalformedExpression = 2000,
    NotConcrete = 2001,

    // === 3xxx: Подписки ===
    UnknownSubscription = 3000,

    // === 4xxx: Сессия ===
    SessionClosed = 4000,
    UnknownLink = 4001,

    // === 5xxx: Слушатели ===
    ListenerFailure = 5000,
    ListenerQueueFull = 5001,

    // === 6xxx: Линки ===
    LinkClosed = 6000,
    LinkSendFailed = 6001,
    DecodeFailed = 6002,
    EncodeFailed = 6003,
    ConnectFailed = 6004,

    // === 7xxx: Конфигурация ===
    InvalidConfig = 7000,
    ConfigLoadFailed = 7001,
}

/// Рекомендуемый уровень логирования для кода статуса.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Возвращает вариант по числовому коду или `None`, если такого нет.
    pub fn from_u32(v: u32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// Имеет ли смысл повторить операцию вызывающему слою.
    ///
    /// Ядро само никогда ничего не повторяет.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ListenerQueueFull | Self::LinkSendFailed | Self::ConnectFailed
        )
    }

    /// Ошибка вызывающей стороны: неверный ключ, неизвестный id, закрытая
    /// сессия.
    pub fn is_client_error(&self) -> bool {
        let c = self.code();
        (2000..=4999).contains(&c) || matches!(self, Self::InvalidArgs)
    }

    /// Ошибка транспорта (диапазон 6xxx).
    pub fn is_link_error(&self) -> bool {
        (6000..=6999).contains(&self.code())
    }

    /// Требуется ли логировать как критическую ошибку.
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::Internal | Self::RuntimeUnavailable)
    }

    /// Рекомендуемый уровень логирования для данного кода.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Success => LogLevel::Trace,
            Self::UnknownSubscription | Self::UnknownLink | Self::SessionClosed => LogLevel::Debug,
            Self::MalformedExpression | Self::NotConcrete | Self::InvalidArgs => LogLevel::Info,
            Self::ListenerFailure
            | Self::ListenerQueueFull
            | Self::LinkClosed
            | Self::LinkSendFailed
            | Self::DecodeFailed => LogLevel::Warn,
            Self::Internal | Self::RuntimeUnavailable => LogLevel::Error,
            _ => LogLevel::Warn,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        #[cfg(feature = "strum")]
        {
            write!(f, "{} ({})", self.as_ref(), self.code())
        }
        #[cfg(not(feature = "strum"))]
        {
            write!(f, "{:?} ({})", self, self.code())
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет конвертацию через `TryFrom<u32>` и `from_u32`.
    #[test]
    fn test_from_try_from_u32() {
        let n = StatusCode::SessionClosed.code();
        assert_eq!(StatusCode::try_from(n).unwrap(), StatusCode::SessionClosed);
        assert_eq!(StatusCode::from_u32(2000), Some(StatusCode::MalformedExpression));
        assert!(StatusCode::from_u32(99999).is_none());
    }

    /// Тест проверяет разделение клиентских и транспортных ошибок.
    #[test]
    fn test_client_vs_link() {
        assert!(StatusCode::MalformedExpression.is_client_error());
        assert!(StatusCode::UnknownSubscription.is_client_error());
        assert!(StatusCode::SessionClosed.is_client_error());
        assert!(!StatusCode::LinkSendFailed.is_client_error());
        assert!(StatusCode::LinkSendFailed.is_link_error());
        assert!(!StatusCode::ListenerFailure.is_link_error());
    }

    #[test]
    fn test_retryable() {
        assert!(StatusCode::ListenerQueueFull.is_retryable());
        assert!(!StatusCode::SessionClosed.is_retryable());
        assert!(!StatusCode::MalformedExpression.is_retryable());
    }

    /// Тест проверяет уровни логирования для типичных кодов.
    #[test]
    fn test_log_level_mappings() {
        assert_eq!(StatusCode::Success.log_level(), LogLevel::Trace);
        assert_eq!(StatusCode::UnknownSubscription.log_level(), LogLevel::Debug);
        assert_eq!(StatusCode::ListenerFailure.log_level(), LogLevel::Warn);
        assert_eq!(StatusCode::Internal.log_level(), LogLevel::Error);
        assert!(StatusCode::Internal.is_critical());
    }

    /// Тест проверяет, что `Display` содержит имя варианта и числовой код.
    #[test]
    fn test_display_contains_name_and_code() {
        let s = format!("{}", StatusCode::SessionClosed);
        assert!(s.contains("4000"), "got: {s}");
        assert!(s.contains("SessionClosed"), "got: {s}");
    }
}
