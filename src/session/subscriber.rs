use std::{
    fmt,
    sync::{Arc, Weak},
};

use keyroute_error::{RecvError, RouteResult, SessionError, TryRecvError};

use super::SessionInner;
use crate::{
    keyexpr::KeyExpr,
    pubsub::{Sample, SampleReceiver, SubscriptionId},
};

/// Handle объявленной подписки.
///
/// Drop не снимает подписку: она живёт до [`Subscriber::undeclare`],
/// [`Session::undeclare`](super::Session::undeclare) или закрытия сессии.
pub struct Subscriber {
    id: SubscriptionId,
    key_expr: KeyExpr,
    session: Weak<SessionInner>,
}

/// Подписка, складывающая сэмплы в очередь для асинхронного чтения.
///
/// После снятия подписки или закрытия сессии уже принятые сэмплы ещё можно
/// вычитать, затем `recv` вернёт [`RecvError::Closed`].
pub struct ChannelSubscriber {
    subscriber: Subscriber,
    receiver: SampleReceiver,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Subscriber {
    pub(super) fn new(
        id: SubscriptionId,
        key_expr: KeyExpr,
        session: &Arc<SessionInner>,
    ) -> Self {
        Self {
            id,
            key_expr,
            session: Arc::downgrade(session),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn key_expr(&self) -> &KeyExpr {
        &self.key_expr
    }

    /// Снимает подписку.
    pub fn undeclare(self) -> RouteResult<()> {
        let session = self.session.upgrade().ok_or(SessionError::Closed)?;
        session.undeclare(self.id)
    }

    /// Принадлежит ли handle указанной сессии.
    pub(super) fn belongs_to(
        &self,
        session: &Arc<SessionInner>,
    ) -> bool {
        std::ptr::eq(self.session.as_ptr(), Arc::as_ptr(session))
    }
}

impl ChannelSubscriber {
    pub(super) fn new(
        subscriber: Subscriber,
        receiver: SampleReceiver,
    ) -> Self {
        Self {
            subscriber,
            receiver,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.subscriber.id
    }

    pub fn key_expr(&self) -> &KeyExpr {
        &self.subscriber.key_expr
    }

    /// Ждёт следующий сэмпл.
    pub async fn recv(&mut self) -> Result<Sample, RecvError> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Result<Sample, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Снимает подписку, отдавая получатель для дочитывания очереди.
    pub fn undeclare(self) -> RouteResult<SampleReceiver> {
        self.subscriber.undeclare()?;
        Ok(self.receiver)
    }

    /// Разделяет подписку на handle и получатель.
    pub fn into_parts(self) -> (Subscriber, SampleReceiver) {
        (self.subscriber, self.receiver)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl fmt::Debug for Subscriber {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("key_expr", &self.key_expr)
            .finish()
    }
}

impl fmt::Debug for ChannelSubscriber {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ChannelSubscriber")
            .field("id", &self.subscriber.id)
            .field("key_expr", &self.subscriber.key_expr)
            .field("queued", &self.receiver.len())
            .finish()
    }
}
