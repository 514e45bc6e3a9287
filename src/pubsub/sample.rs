use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use bytes::Bytes;
use keyroute_error::KeyExprError;
use serde::{Deserialize, Serialize};

use crate::keyexpr::KeyExpr;

/// Вид сэмпла.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleKind {
    Put,
    Delete,
}

/// Значение логических часов сессии.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(u64);

/// Монотонные логические часы (правило Лэмпорта).
///
/// `tick` выдаёт следующее локальное значение, `observe` сдвигает часы за
/// пределы полученной извне метки, так что всё опубликованное после приёма
/// упорядочено после принятого.
#[derive(Debug, Default)]
pub struct LogicalClock {
    last: AtomicU64,
}

/// Флаг жизни сессии, разделяемый между сессией, маршрутизатором и
/// доставленными сэмплами.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

/// Единица публикации: ключ, полезная нагрузка, вид и метка времени.
///
/// Неизменяем; каждый подходящий слушатель получает собственный клон
/// (payload разделяется через [`Bytes`] без копирования).
#[derive(Clone)]
pub struct Sample {
    key_expr: KeyExpr,
    payload: Bytes,
    kind: SampleKind,
    timestamp: Timestamp,
    liveness: Option<Liveness>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Timestamp {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl LogicalClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Следующая локальная метка.
    pub fn tick(&self) -> Timestamp {
        Timestamp(self.last.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Учитывает метку, пришедшую извне.
    pub fn observe(
        &self,
        remote: Timestamp,
    ) {
        self.last.fetch_max(remote.0, Ordering::AcqRel);
    }

    /// Последняя выданная или наблюдённая метка.
    pub fn now(&self) -> Timestamp {
        Timestamp(self.last.load(Ordering::Acquire))
    }
}

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Переводит флаг в «мёртвое» состояние. Возвращает `true`, если именно
    /// этот вызов его перевёл.
    pub(crate) fn kill(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

impl Sample {
    /// Создаёт сэмпл. Ключ обязан быть конкретным.
    pub fn new(
        key_expr: KeyExpr,
        payload: impl Into<Bytes>,
        kind: SampleKind,
        timestamp: Timestamp,
    ) -> Result<Self, KeyExprError> {
        if !key_expr.is_concrete() {
            return Err(KeyExprError::NotConcrete {
                expr: key_expr.to_string(),
            });
        }
        Ok(Self {
            key_expr,
            payload: payload.into(),
            kind,
            timestamp,
            liveness: None,
        })
    }

    pub(crate) fn with_liveness(
        mut self,
        liveness: Liveness,
    ) -> Self {
        self.liveness = Some(liveness);
        self
    }

    pub fn key_expr(&self) -> &KeyExpr {
        &self.key_expr
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn kind(&self) -> SampleKind {
        self.kind
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Жива ли сессия, доставившая сэмпл.
    ///
    /// Долгие слушатели могут проверять это и прекращать работу после
    /// закрытия сессии. Для сэмплов, созданных вне сессии, всегда `true`.
    pub fn is_session_alive(&self) -> bool {
        self.liveness.as_ref().is_none_or(Liveness::is_alive)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SampleKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            SampleKind::Put => write!(f, "PUT"),
            SampleKind::Delete => write!(f, "DELETE"),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Sample {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Sample")
            .field("key_expr", &self.key_expr)
            .field("kind", &self.kind)
            .field("timestamp", &self.timestamp)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// Флаг жизни в сравнении не участвует.
impl PartialEq for Sample {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.key_expr == other.key_expr
            && self.payload == other.payload
            && self.kind == other.kind
            && self.timestamp == other.timestamp
    }
}

impl Eq for Sample {}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
