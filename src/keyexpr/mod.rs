//! Ключевые выражения: иерархические пути через `/` с wildcard-ами.
//!
//! - `*`: ровно один сегмент;
//! - `**`: ноль или больше сегментов.
//!
//! Регистр учитывается, пустые сегменты запрещены.

mod key_expr;
mod matcher;

pub use key_expr::{KeyExpr, Segment};
use keyroute_error::KeyExprError;

/// Всё, что можно превратить в [`KeyExpr`] на входе публичного API.
pub trait IntoKeyExpr {
    fn into_key_expr(self) -> Result<KeyExpr, KeyExprError>;
}

impl IntoKeyExpr for KeyExpr {
    fn into_key_expr(self) -> Result<KeyExpr, KeyExprError> {
        Ok(self)
    }
}

impl IntoKeyExpr for &KeyExpr {
    fn into_key_expr(self) -> Result<KeyExpr, KeyExprError> {
        Ok(self.clone())
    }
}

impl IntoKeyExpr for &str {
    fn into_key_expr(self) -> Result<KeyExpr, KeyExprError> {
        KeyExpr::parse(self)
    }
}

impl IntoKeyExpr for String {
    fn into_key_expr(self) -> Result<KeyExpr, KeyExprError> {
        KeyExpr::parse(&self)
    }
}

impl IntoKeyExpr for &String {
    fn into_key_expr(self) -> Result<KeyExpr, KeyExprError> {
        KeyExpr::parse(self)
    }
}
