use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
};

use bytes::Bytes;
use keyroute_error::LinkError;
use parking_lot::{Mutex, RwLock};

use super::{Connector, FrameHandler, Link};

/// Внутрипроцессный линк: половина пары, соединённой «спина к спине».
///
/// `send` на одной стороне синхронно вызывает обработчик другой стороны.
pub struct MemoryLink {
    name: String,
    peer: Mutex<Weak<MemoryLink>>,
    handler: RwLock<Option<FrameHandler>>,
    closed: AtomicBool,
}

/// Коннектор, раздающий заранее зарегистрированные линки по endpoint-у.
///
/// Каждый линк выдаётся один раз.
#[derive(Default)]
pub struct MemoryConnector {
    links: Mutex<HashMap<String, Arc<MemoryLink>>>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl MemoryLink {
    /// Создаёт два связанных линка.
    pub fn pair(
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> (Arc<MemoryLink>, Arc<MemoryLink>) {
        let a = Arc::new(Self::unconnected(left.into()));
        let b = Arc::new(Self::unconnected(right.into()));
        *a.peer.lock() = Arc::downgrade(&b);
        *b.peer.lock() = Arc::downgrade(&a);
        (a, b)
    }

    fn unconnected(name: String) -> Self {
        Self {
            name,
            peer: Mutex::new(Weak::new()),
            handler: RwLock::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn closed_error(&self) -> LinkError {
        LinkError::Closed {
            link: self.name.clone(),
        }
    }
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Регистрирует линк под endpoint-ом.
    pub fn register(
        &self,
        endpoint: impl Into<String>,
        link: Arc<MemoryLink>,
    ) {
        self.links.lock().insert(endpoint.into(), link);
    }
}

////////////////////////////////////////////////////////////////////////////////
// Реализации Link / Connector
////////////////////////////////////////////////////////////////////////////////

impl Link for MemoryLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(
        &self,
        frame: Bytes,
    ) -> Result<(), LinkError> {
        if self.is_closed() {
            return Err(self.closed_error());
        }
        let peer = self.peer.lock().upgrade().ok_or_else(|| self.closed_error())?;
        if peer.is_closed() {
            return Err(self.closed_error());
        }
        // Обработчик клонируется, чтобы не держать блокировку во время вызова
        let handler = peer.handler.read().clone();
        match handler {
            Some(handler) => {
                handler(frame);
                Ok(())
            }
            None => Err(LinkError::SendFailed {
                link: self.name.clone(),
                reason: "peer has no receiver".into(),
            }),
        }
    }

    fn on_receive(
        &self,
        handler: FrameHandler,
    ) {
        *self.handler.write() = Some(handler);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.handler.write().take();
    }
}

impl Connector for MemoryConnector {
    fn connect(
        &self,
        endpoint: &str,
    ) -> Result<Arc<dyn Link>, LinkError> {
        self.links
            .lock()
            .remove(endpoint)
            .map(|link| link as Arc<dyn Link>)
            .ok_or_else(|| LinkError::ConnectFailed {
                endpoint: endpoint.to_string(),
                reason: "no memory link registered".into(),
            })
    }
}

impl std::fmt::Debug for MemoryLink {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("MemoryLink")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
