use keyroute_error::{ListenerError, RecvError, TryRecvError};
use tokio::sync::mpsc::{self, error::TrySendError};

use super::Sample;

pub type ListenerResult = Result<(), ListenerError>;

/// Получатель сэмплов подписки.
///
/// Вызывается на рабочих задачах сессии, возможно конкурентно. Ошибка или
/// паника слушателя изолируются маршрутизатором и на других слушателей не
/// влияют. Слушатель не должен надолго блокировать поток: тяжёлую работу
/// лучше отдать через [`channel_listener`].
pub trait Listener: Send + Sync + 'static {
    fn on_sample(
        &self,
        sample: Sample,
    ) -> ListenerResult;
}

/// Слушатель, складывающий сэмплы в ограниченную очередь.
#[derive(Debug)]
pub struct ChannelListener {
    tx: mpsc::Sender<Sample>,
    capacity: usize,
}

/// Принимающая сторона [`ChannelListener`].
///
/// Возвращает [`RecvError::Closed`], когда подписка снята (или сессия
/// закрыта) и очередь вычитана до конца.
#[derive(Debug)]
pub struct SampleReceiver {
    rx: mpsc::Receiver<Sample>,
}

/// Создаёт пару «слушатель + получатель» с очередью на `capacity` сэмплов.
///
/// Если потребитель не успевает, новые сэмплы отклоняются с
/// [`ListenerError::QueueFull`], а не блокируют маршрутизацию.
///
/// # Panics
/// При `capacity == 0` (так же, как [`mpsc::channel`]).
pub fn channel_listener(capacity: usize) -> (ChannelListener, SampleReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (ChannelListener { tx, capacity }, SampleReceiver { rx })
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl SampleReceiver {
    /// Ждёт следующий сэмпл.
    pub async fn recv(&mut self) -> Result<Sample, RecvError> {
        self.rx.recv().await.ok_or(RecvError::Closed)
    }

    /// Забирает сэмпл без ожидания.
    pub fn try_recv(&mut self) -> Result<Sample, TryRecvError> {
        self.rx.try_recv().map_err(|e| match e {
            mpsc::error::TryRecvError::Empty => TryRecvError::Empty,
            mpsc::error::TryRecvError::Disconnected => TryRecvError::Closed,
        })
    }

    /// Число сэмплов, ожидающих в очереди.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Реализации Listener
////////////////////////////////////////////////////////////////////////////////

impl<F> Listener for F
where
    F: Fn(Sample) -> ListenerResult + Send + Sync + 'static,
{
    fn on_sample(
        &self,
        sample: Sample,
    ) -> ListenerResult {
        self(sample)
    }
}

impl Listener for ChannelListener {
    fn on_sample(
        &self,
        sample: Sample,
    ) -> ListenerResult {
        self.tx.try_send(sample).map_err(|e| match e {
            TrySendError::Full(_) => ListenerError::QueueFull {
                capacity: self.capacity,
            },
            TrySendError::Closed(_) => ListenerError::Disconnected,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use crate::{
        pubsub::{SampleKind, Timestamp},
        KeyExpr,
    };

    fn sample(n: u64) -> Sample {
        Sample::new(
            KeyExpr::parse("a/b").unwrap(),
            n.to_string(),
            SampleKind::Put,
            Timestamp::new(n),
        )
        .unwrap()
    }

    /// Тест проверяет, что замыкание является слушателем.
    #[test]
    fn test_closure_listener() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let listener = move |_s: Sample| -> ListenerResult {
            h.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        listener.on_sample(sample(1)).unwrap();
        listener.on_sample(sample(2)).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_channel_listener_delivers_in_order() {
        let (listener, mut rx) = channel_listener(4);
        listener.on_sample(sample(1)).unwrap();
        listener.on_sample(sample(2)).unwrap();
        assert_eq!(rx.len(), 2);
        assert_eq!(rx.recv().await.unwrap().timestamp(), Timestamp::new(1));
        assert_eq!(rx.try_recv().unwrap().timestamp(), Timestamp::new(2));
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    /// Тест проверяет, что переполненная очередь отклоняет сэмпл, а не ждёт.
    #[test]
    fn test_channel_listener_queue_full() {
        let (listener, _rx) = channel_listener(1);
        listener.on_sample(sample(1)).unwrap();
        assert_eq!(
            listener.on_sample(sample(2)).unwrap_err(),
            ListenerError::QueueFull { capacity: 1 }
        );
    }

    #[tokio::test]
    async fn test_receiver_closed_after_listener_dropped() {
        let (listener, mut rx) = channel_listener(2);
        listener.on_sample(sample(1)).unwrap();
        drop(listener);
        assert!(rx.recv().await.is_ok());
        assert_eq!(rx.recv().await.unwrap_err(), RecvError::Closed);
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Closed);
    }

    #[test]
    fn test_listener_disconnected() {
        let (listener, rx) = channel_listener(2);
        drop(rx);
        assert_eq!(
            listener.on_sample(sample(1)).unwrap_err(),
            ListenerError::Disconnected
        );
    }
}
