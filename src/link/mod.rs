//! Транспортная граница сессии.
//!
//! Сессия не знает, как устроена сеть: она работает с абстрактным
//! [`Link`], который умеет отправлять непрозрачные кадры и сообщать о
//! входящих. Кадры кодируются в [`wire`].

mod memory;
pub mod wire;

use std::{fmt, sync::Arc};

use bytes::Bytes;
use keyroute_error::LinkError;
pub use memory::{MemoryConnector, MemoryLink};
pub use wire::WireFrame;

/// Обработчик входящих кадров, регистрируемый сессией на линке.
///
/// Вызывается синхронно из контекста транспорта и не блокирует.
pub type FrameHandler = Arc<dyn Fn(Bytes) + Send + Sync>;

/// Идентификатор линка, уникальный в пределах сессии.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkId(pub(crate) u64);

/// Соединение с удалённым участником.
pub trait Link: Send + Sync + 'static {
    /// Имя для логов и ошибок.
    fn name(&self) -> &str;

    /// Отправляет кадр. Не должен блокировать надолго.
    fn send(
        &self,
        frame: Bytes,
    ) -> Result<(), LinkError>;

    /// Регистрирует обработчик входящих кадров, заменяя прежний.
    fn on_receive(
        &self,
        handler: FrameHandler,
    );

    /// Закрывает линк. По умолчанию ничего не делает.
    fn close(&self) {}
}

/// Превращает сконфигурированный endpoint в линк.
pub trait Connector: Send + Sync {
    fn connect(
        &self,
        endpoint: &str,
    ) -> Result<Arc<dyn Link>, LinkError>;
}

impl LinkId {
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
