use std::any::Any;

use crate::{ErrorExt, StatusCode};

/// Ошибки таблицы подписок
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// Подписка с таким id отсутствует
    Unknown { id: u64 },
}

/// Ошибки жизненного цикла сессии
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Сессия уже закрыта
    Closed,
    /// Линк с таким id не подключён
    UnknownLink { id: u64 },
}

/// Отказ слушателя при обработке сэмпла.
///
/// Маршрутизатор перехватывает такие ошибки, логирует их и продолжает
/// доставку остальным слушателям.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerError {
    /// Слушатель сообщил об ошибке
    Failed { reason: String },
    /// Слушатель запаниковал
    Panicked { message: String },
    /// Очередь канального слушателя переполнена
    QueueFull { capacity: usize },
    /// Получатель канального слушателя уничтожен
    Disconnected,
}

/// Ошибки получения сэмплов из канального подписчика
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecvError {
    /// Подписка снята или сессия закрыта
    Closed,
}

/// Ошибки неблокирующего получения сэмплов
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TryRecvError {
    /// Нет доступных сэмплов
    Empty,
    /// Подписка снята или сессия закрыта
    Closed,
}

impl ListenerError {
    /// Удобный конструктор для пользовательских слушателей.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for SubscriptionError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Unknown { id } => write!(f, "Unknown subscription: {id}"),
        }
    }
}

impl std::error::Error for SubscriptionError {}

impl ErrorExt for SubscriptionError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unknown { .. } => StatusCode::UnknownSubscription,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let Self::Unknown { id } = self;
        vec![
            ("error_type", "subscription".to_string()),
            ("status_code", self.status_code().to_string()),
            ("subscription_id", id.to_string()),
        ]
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "Session is closed"),
            Self::UnknownLink { id } => write!(f, "Unknown link: {id}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl ErrorExt for SessionError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Closed => StatusCode::SessionClosed,
            Self::UnknownLink { .. } => StatusCode::UnknownLink,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Display for ListenerError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "Listener failed: {reason}"),
            Self::Panicked { message } => write!(f, "Listener panicked: {message}"),
            Self::QueueFull { capacity } => {
                write!(f, "Listener queue is full (capacity {capacity})")
            }
            Self::Disconnected => write!(f, "Listener receiver is gone"),
        }
    }
}

impl std::error::Error for ListenerError {}

impl ErrorExt for ListenerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::QueueFull { .. } => StatusCode::ListenerQueueFull,
            _ => StatusCode::ListenerFailure,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Display for RecvError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "Subscriber is closed"),
        }
    }
}

impl std::error::Error for RecvError {}

impl ErrorExt for RecvError {
    fn status_code(&self) -> StatusCode {
        StatusCode::SessionClosed
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Display for TryRecvError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "No samples available"),
            Self::Closed => write!(f, "Subscriber is closed"),
        }
    }
}

impl std::error::Error for TryRecvError {}

impl ErrorExt for TryRecvError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Empty => StatusCode::Success,
            Self::Closed => StatusCode::SessionClosed,
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
    fn test_subscription_error() {
        let err = SubscriptionError::Unknown { id: 42 };
        assert_eq!(err.status_code(), StatusCode::UnknownSubscription);
        assert!(err.to_string().contains("42"));
        assert!(err
            .metrics_tags()
            .iter()
            .any(|(k, v)| *k == "subscription_id" && v == "42"));
    }

    #[test]
    fn test_session_error() {
        assert_eq!(SessionError::Closed.status_code(), StatusCode::SessionClosed);
        assert_eq!(
            SessionError::UnknownLink { id: 3 }.status_code(),
            StatusCode::UnknownLink
        );
    }

    #[test]
    fn test_listener_error() {
        let err = ListenerError::failed("boom");
        assert_eq!(err.status_code(), StatusCode::ListenerFailure);
        assert_eq!(err.to_string(), "Listener failed: boom");
        assert_eq!(
            ListenerError::QueueFull { capacity: 8 }.status_code(),
            StatusCode::ListenerQueueFull
        );
    }
}
