use std::{any::Any, error::Error};

use crate::StatusCode;

/// Общий интерфейс типизированных ошибок крейта (object-safe).
///
/// Даёт код статуса, downcast через [`Any`], сообщение для внешнего
/// потребителя и теги для логов.
pub trait ErrorExt: Error + Send + Sync + 'static {
    /// Код статуса ошибки. По умолчанию [`StatusCode::Internal`].
    fn status_code(&self) -> StatusCode {
        StatusCode::Internal
    }

    /// Возвращает ошибку как `&dyn Any` для downcast к конкретному типу.
    fn as_any(&self) -> &dyn Any;

    /// Сообщение, которое безопасно показать вызывающей стороне.
    ///
    /// Для внутренних ошибок детали скрываются.
    fn client_message(&self) -> String {
        match self.status_code() {
            StatusCode::Unknown | StatusCode::Internal => "Internal error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Теги для структурированного логирования.
    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        vec![
            ("error_type", self.type_name()),
            ("status_code", self.status_code().to_string()),
        ]
    }

    /// Короткое имя типа ошибки (без пути модулей).
    fn type_name(&self) -> String {
        std::any::type_name::<Self>()
            .rsplit("::")
            .next()
            .unwrap_or("Unknown")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;

    #[derive(Debug)]
    struct PlainError;

    impl fmt::Display for PlainError {
        fn fmt(
            &self,
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            write!(f, "secret detail")
        }
    }

    impl Error for PlainError {}

    impl ErrorExt for PlainError {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Тест проверяет, что по умолчанию код `Internal`, а детали скрыты от
    /// клиента.
    #[test]
    fn test_default_status_hides_details() {
        let e = PlainError;
        assert_eq!(e.status_code(), StatusCode::Internal);
        assert_eq!(e.client_message(), "Internal error");
    }

    #[test]
    fn test_type_name_and_tags() {
        let e = PlainError;
        assert_eq!(e.type_name(), "PlainError");
        let tags = e.metrics_tags();
        assert!(tags.iter().any(|(k, v)| *k == "error_type" && v == "PlainError"));
        assert!(tags.iter().any(|(k, _)| *k == "status_code"));
    }

    #[test]
    fn test_as_any_downcast() {
        let e = PlainError;
        assert!(e.as_any().downcast_ref::<PlainError>().is_some());
    }
}
