//! Сессия: таблица подписок, маршрутизатор, линки и жизненный цикл.

mod inbound;
mod subscriber;

use std::{
    collections::HashMap,
    fmt,
    num::NonZeroUsize,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use bytes::Bytes;
use keyroute_error::{
    ensure, ConfigError, GenericError, ResultExt, RouteResult, SessionError, StatusCode,
    SubscriptionError,
};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use tokio::{runtime::Handle, sync::mpsc};
use tracing::{debug, info};
use uuid::Uuid;

use self::inbound::InboundFrame;
pub use self::subscriber::{ChannelSubscriber, Subscriber};
use crate::{
    config::SessionConfig,
    keyexpr::IntoKeyExpr,
    link::{Connector, Link, LinkId, WireFrame},
    pubsub::{
        channel_listener, DispatchReport, Listener, Liveness, LogicalClock, Router, RouterStats,
        Sample, SampleKind, SubscriptionId, SubscriptionTable,
    },
};

/// Открытая сессия.
///
/// Единственная точка входа: объявление подписок, публикация, подключение
/// линков. Все операции после [`close`](Session::close) завершаются
/// ошибкой [`SessionError::Closed`]. Drop закрывает сессию.
///
/// Открывать сессию нужно внутри tokio runtime: входящие кадры
/// обрабатываются его задачами.
pub struct Session {
    inner: Arc<SessionInner>,
}

/// Счётчики транспортной стороны сессии.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkStats {
    pub frames_sent: u64,
    pub send_failures: u64,
    pub frames_received: u64,
    pub frames_dropped: u64,
    pub decode_failures: u64,
    pub echoes_suppressed: u64,
    pub duplicates_dropped: u64,
    pub frames_relayed: u64,
    pub frames_ignored: u64,
}

/// Сколько последних `(origin, timestamp)` помнит сессия для отсева
/// повторов, пришедших по разным путям.
const RECENT_FRAMES: usize = 4096;

pub(crate) struct SessionInner {
    id: Uuid,
    config: SessionConfig,
    router: Router,
    clock: LogicalClock,
    liveness: Liveness,
    /// Подключённые линки: id -> линк
    links: RwLock<HashMap<LinkId, Arc<dyn Link>>>,
    /// Счётчик для генерации id линков
    link_counter: AtomicU64,
    /// Вход очереди входящих кадров; `None` после закрытия
    inbound_tx: RwLock<Option<mpsc::Sender<InboundFrame>>>,
    /// Недавно обработанные кадры: (origin, timestamp)
    seen: Mutex<LruCache<(Uuid, u64), ()>>,
    counters: LinkCounters,
}

#[derive(Debug, Default)]
struct LinkCounters {
    frames_sent: AtomicU64,
    send_failures: AtomicU64,
    frames_received: AtomicU64,
    frames_dropped: AtomicU64,
    decode_failures: AtomicU64,
    echoes_suppressed: AtomicU64,
    duplicates_dropped: AtomicU64,
    frames_relayed: AtomicU64,
    frames_ignored: AtomicU64,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Session {
    /// Открывает сессию без линков.
    ///
    /// Endpoint-ы в конфигурации требуют коннектора: для них есть
    /// [`Session::open_with`].
    pub fn open(config: SessionConfig) -> RouteResult<Session> {
        if !config.endpoints.is_empty() {
            return Err(ConfigError::Invalid {
                field: "session.endpoints".into(),
                reason: "endpoints require a connector (use Session::open_with)".into(),
            }
            .into());
        }
        Self::start(config)
    }

    /// Открывает сессию и подключает каждый endpoint конфигурации через
    /// `connector`. Ошибка подключения закрывает сессию.
    pub fn open_with(
        config: SessionConfig,
        connector: &dyn Connector,
    ) -> RouteResult<Session> {
        let session = Self::start(config)?;
        for endpoint in &session.inner.config.endpoints {
            let link = connector
                .connect(endpoint)
                .with_context(|| format!("connecting to {endpoint}"))?;
            session.attach_link(link)?;
        }
        Ok(session)
    }

    fn start(config: SessionConfig) -> RouteResult<Session> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|e| {
            GenericError::new(
                StatusCode::RuntimeUnavailable,
                format!("session must be opened inside a tokio runtime: {e}"),
            )
        })?;

        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let liveness = Liveness::new();
        let inner = Arc::new(SessionInner {
            id: Uuid::new_v4(),
            router: Router::new(Arc::new(SubscriptionTable::new()), liveness.clone()),
            clock: LogicalClock::new(),
            liveness,
            links: RwLock::new(HashMap::new()),
            link_counter: AtomicU64::new(0),
            inbound_tx: RwLock::new(Some(tx)),
            seen: Mutex::new(LruCache::new(
                NonZeroUsize::new(RECENT_FRAMES).unwrap_or(NonZeroUsize::MIN),
            )),
            counters: LinkCounters::default(),
            config,
        });
        inbound::spawn_workers(&inner, rx, &runtime);

        info!(
            session = %inner.id,
            workers = inner.config.work_thread_num,
            queue_capacity = inner.config.queue_capacity,
            relay = inner.config.relay,
            "Session opened"
        );
        Ok(Session { inner })
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn is_closed(&self) -> bool {
        !self.inner.liveness.is_alive()
    }

    /// Подключает линк: его входящие кадры начинают маршрутизироваться, а
    /// публикации сессии уходят в него.
    pub fn attach_link(
        &self,
        link: Arc<dyn Link>,
    ) -> RouteResult<LinkId> {
        self.inner.ensure_open()?;
        let id = LinkId(self.inner.link_counter.fetch_add(1, Ordering::Relaxed) + 1);

        let session = Arc::downgrade(&self.inner);
        link.on_receive(Arc::new(move |bytes: Bytes| {
            if let Some(session) = session.upgrade() {
                session.enqueue(id, bytes);
            }
        }));

        // Проверка и вставка под той же блокировкой, под которой close
        // забирает линки
        let attached = {
            let mut links = self.inner.links.write();
            let alive = self.inner.liveness.is_alive();
            if alive {
                links.insert(id, link.clone());
            }
            alive
        };
        if !attached {
            link.close();
            return Err(SessionError::Closed.into());
        }

        info!(session = %self.inner.id, link = %id, name = link.name(), "Link attached");
        Ok(id)
    }

    /// Отключает и закрывает линк.
    pub fn detach_link(
        &self,
        id: LinkId,
    ) -> RouteResult<()> {
        self.inner.ensure_open()?;
        let link = self
            .inner
            .links
            .write()
            .remove(&id)
            .ok_or(SessionError::UnknownLink { id: id.get() })?;
        link.close();
        info!(session = %self.inner.id, link = %id, name = link.name(), "Link detached");
        Ok(())
    }

    pub fn link_count(&self) -> usize {
        self.inner.links.read().len()
    }

    /// Объявляет подписку на шаблон.
    ///
    /// Некорректный шаблон отклоняется здесь и до маршрутизатора не доходит.
    pub fn declare_subscriber<K, L>(
        &self,
        key_expr: K,
        listener: L,
    ) -> RouteResult<Subscriber>
    where
        K: IntoKeyExpr,
        L: Listener,
    {
        self.inner.ensure_open()?;
        let key_expr = key_expr.into_key_expr()?;
        let table = self.inner.router.table();
        let id = table.insert(key_expr.clone(), listener);
        // close мог очистить таблицу между проверкой и вставкой
        if !self.inner.liveness.is_alive() {
            table.remove(id).ok();
            return Err(SessionError::Closed.into());
        }
        debug!(session = %self.inner.id, subscription = %id, pattern = %key_expr, "Subscriber declared");
        Ok(Subscriber::new(id, key_expr, &self.inner))
    }

    /// Объявляет подписку, сэмплы которой читаются из очереди на
    /// `capacity` элементов.
    pub fn declare_channel_subscriber<K: IntoKeyExpr>(
        &self,
        key_expr: K,
        capacity: usize,
    ) -> RouteResult<ChannelSubscriber> {
        self.inner.ensure_open()?;
        ensure!(
            capacity > 0,
            StatusCode::InvalidArgs,
            "channel capacity must be positive"
        );
        let (listener, receiver) = channel_listener(capacity);
        let subscriber = self.declare_subscriber(key_expr, listener)?;
        Ok(ChannelSubscriber::new(subscriber, receiver))
    }

    /// Снимает подписку. Handle другой сессии считается неизвестным.
    pub fn undeclare(
        &self,
        subscriber: Subscriber,
    ) -> RouteResult<()> {
        self.inner.ensure_open()?;
        ensure!(
            subscriber.belongs_to(&self.inner),
            SubscriptionError::Unknown {
                id: subscriber.id().get()
            }
        );
        self.inner.undeclare(subscriber.id())
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.router.table().len()
    }

    /// Публикует сэмпл: локальная доставка через маршрутизатор и отправка
    /// во все линки.
    ///
    /// Ключ должен быть конкретным. Ошибки линков логируются и в результат
    /// не попадают.
    pub fn publish<K: IntoKeyExpr>(
        &self,
        key: K,
        payload: impl Into<Bytes>,
        kind: SampleKind,
    ) -> RouteResult<DispatchReport> {
        self.inner.ensure_open()?;
        let key = key.into_key_expr()?;
        let sample = Sample::new(key, payload, kind, self.inner.clock.tick())?
            .with_liveness(self.inner.liveness.clone());

        let report = self.inner.router.dispatch(&sample);
        if self.inner.config.outbound {
            self.inner
                .broadcast(&WireFrame::from_sample(&sample, self.inner.id), None);
        }
        debug!(
            session = %self.inner.id,
            key = %sample.key_expr(),
            kind = %kind,
            matched = report.matched,
            delivered = report.delivered,
            "Sample published",
        );
        Ok(report)
    }

    pub fn put<K: IntoKeyExpr>(
        &self,
        key: K,
        payload: impl Into<Bytes>,
    ) -> RouteResult<DispatchReport> {
        self.publish(key, payload, SampleKind::Put)
    }

    pub fn delete<K: IntoKeyExpr>(
        &self,
        key: K,
    ) -> RouteResult<DispatchReport> {
        self.publish(key, Bytes::new(), SampleKind::Delete)
    }

    /// Закрывает сессию: снимает все подписки, закрывает линки и
    /// останавливает рабочие задачи. Уже начатые вызовы слушателей
    /// доходят до конца. Повторный вызов ничего не делает.
    pub fn close(&self) {
        self.inner.close();
    }

    pub fn router_stats(&self) -> RouterStats {
        self.inner.router.stats()
    }

    pub fn link_stats(&self) -> LinkStats {
        let c = &self.inner.counters;
        LinkStats {
            frames_sent: c.frames_sent.load(Ordering::Relaxed),
            send_failures: c.send_failures.load(Ordering::Relaxed),
            frames_received: c.frames_received.load(Ordering::Relaxed),
            frames_dropped: c.frames_dropped.load(Ordering::Relaxed),
            decode_failures: c.decode_failures.load(Ordering::Relaxed),
            echoes_suppressed: c.echoes_suppressed.load(Ordering::Relaxed),
            duplicates_dropped: c.duplicates_dropped.load(Ordering::Relaxed),
            frames_relayed: c.frames_relayed.load(Ordering::Relaxed),
            frames_ignored: c.frames_ignored.load(Ordering::Relaxed),
        }
    }
}

impl SessionInner {
    fn ensure_open(&self) -> RouteResult<()> {
        ensure!(self.liveness.is_alive(), SessionError::Closed);
        Ok(())
    }

    fn undeclare(
        &self,
        id: SubscriptionId,
    ) -> RouteResult<()> {
        self.ensure_open()?;
        self.router.table().remove(id)?;
        debug!(session = %self.id, subscription = %id, "Subscriber undeclared");
        Ok(())
    }

    fn close(&self) {
        if !self.liveness.kill() {
            return;
        }
        let subscriptions = self.router.table().clear();
        let links: Vec<_> = self.links.write().drain().collect();
        for (_, link) in &links {
            link.close();
        }
        // Закрываем очередь: рабочие задачи выйдут, дочитав её
        self.inbound_tx.write().take();

        info!(
            session = %self.id,
            subscriptions,
            links = links.len(),
            "Session closed"
        );
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl Drop for Session {
    fn drop(&mut self) {
        self.inner.close();
    }
}

impl fmt::Debug for Session {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("closed", &self.is_closed())
            .field("links", &self.link_count())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
