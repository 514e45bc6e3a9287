use std::any::Any;

use crate::{ErrorExt, StatusCode};

/// Ошибки разбора ключевых выражений.
///
/// Все варианты, кроме `NotConcrete`, соответствуют коду
/// [`StatusCode::MalformedExpression`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyExprError {
    /// Пустое выражение
    Empty,
    /// Пустой сегмент (`a//b`, `/a`, `a/`)
    EmptySegment { expr: String, position: usize },
    /// Недопустимый символ в сегменте
    InvalidChar { expr: String, ch: char },
    /// `*` смешан с другими символами или звёзд больше двух
    InvalidWildcard { expr: String, segment: String },
    /// Ожидался конкретный ключ без wildcard-ов
    NotConcrete { expr: String },
}

impl std::fmt::Display for KeyExprError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Key expression is empty"),
            Self::EmptySegment { expr, position } => {
                write!(f, "Empty segment #{position} in key expression '{expr}'")
            }
            Self::InvalidChar { expr, ch } => {
                write!(f, "Invalid character {ch:?} in key expression '{expr}'")
            }
            Self::InvalidWildcard { expr, segment } => {
                write!(f, "Invalid wildcard segment '{segment}' in key expression '{expr}'")
            }
            Self::NotConcrete { expr } => {
                write!(f, "Key expression '{expr}' contains wildcards")
            }
        }
    }
}

impl std::error::Error for KeyExprError {}

impl ErrorExt for KeyExprError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotConcrete { .. } => StatusCode::NotConcrete,
            _ => StatusCode::MalformedExpression,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "key_expr".to_string()),
            ("status_code", self.status_code().to_string()),
        ];
        match self {
            Self::EmptySegment { expr, .. }
            | Self::InvalidChar { expr, .. }
            | Self::InvalidWildcard { expr, .. }
            | Self::NotConcrete { expr } => tags.push(("key_expr", expr.clone())),
            Self::Empty => {}
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(KeyExprError::Empty.status_code(), StatusCode::MalformedExpression);
        let err = KeyExprError::NotConcrete {
            expr: "a/*".into(),
        };
        assert_eq!(err.status_code(), StatusCode::NotConcrete);
        assert!(err.to_string().contains("a/*"));
    }

    #[test]
    fn test_tags_carry_expression() {
        let err = KeyExprError::InvalidChar {
            expr: "a/b#".into(),
            ch: '#',
        };
        let tags = err.metrics_tags();
        assert!(tags.iter().any(|(k, v)| *k == "key_expr" && v == "a/b#"));
    }
}
