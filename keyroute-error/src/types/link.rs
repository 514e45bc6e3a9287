use std::any::Any;

use crate::{ErrorExt, StatusCode};

/// Ошибки транспортной границы (линков) и кодека кадров.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Линк закрыт
    Closed { link: String },
    /// Транспорт не принял кадр
    SendFailed { link: String, reason: String },
    /// Кадр не удалось декодировать
    Decode { reason: String },
    /// Сэмпл не удалось закодировать
    Encode { reason: String },
    /// Коннектор не смог установить линк
    ConnectFailed { endpoint: String, reason: String },
}

impl std::fmt::Display for LinkError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Closed { link } => write!(f, "Link closed: {link}"),
            Self::SendFailed { link, reason } => {
                write!(f, "Failed to send frame on link {link}: {reason}")
            }
            Self::Decode { reason } => write!(f, "Frame decoding failed: {reason}"),
            Self::Encode { reason } => write!(f, "Frame encoding failed: {reason}"),
            Self::ConnectFailed { endpoint, reason } => {
                write!(f, "Failed to connect to {endpoint}: {reason}")
            }
        }
    }
}

impl std::error::Error for LinkError {}

impl ErrorExt for LinkError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Closed { .. } => StatusCode::LinkClosed,
            Self::SendFailed { .. } => StatusCode::LinkSendFailed,
            Self::Decode { .. } => StatusCode::DecodeFailed,
            Self::Encode { .. } => StatusCode::EncodeFailed,
            Self::ConnectFailed { .. } => StatusCode::ConnectFailed,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "link".to_string()),
            ("status_code", self.status_code().to_string()),
        ];
        match self {
            Self::Closed { link } | Self::SendFailed { link, .. } => {
                tags.push(("link", link.clone()));
            }
            Self::ConnectFailed { endpoint, .. } => {
                tags.push(("endpoint", endpoint.clone()));
            }
            _ => {}
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_error_codes() {
        let err = LinkError::SendFailed {
            link: "mem-1".into(),
            reason: "peer dropped".into(),
        };
        assert_eq!(err.status_code(), StatusCode::LinkSendFailed);
        assert!(err.status_code().is_retryable());
        assert!(err.metrics_tags().iter().any(|(k, v)| *k == "link" && v == "mem-1"));

        let err = LinkError::Decode {
            reason: "truncated".into(),
        };
        assert_eq!(err.status_code(), StatusCode::DecodeFailed);
    }
}
