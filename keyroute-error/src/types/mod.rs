pub mod config;
pub mod key_expr;
pub mod link;
pub mod pubsub;

pub use config::*;
pub use key_expr::*;
pub use link::*;
pub use pubsub::*;

use crate::{ErrorExt, StatusCode};

/// Ошибка с произвольным кодом и сообщением (для `bail!(code, "...")`).
#[derive(Debug, Clone)]
pub struct GenericError {
    code: StatusCode,
    message: String,
}

impl GenericError {
    pub fn new(
        code: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for GenericError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for GenericError {}

impl ErrorExt for GenericError {
    fn status_code(&self) -> StatusCode {
        self.code
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
