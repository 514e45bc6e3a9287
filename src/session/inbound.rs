//! Обработка входящих кадров: очередь, рабочие задачи, пересылка.

use std::sync::{atomic::Ordering, Arc};

use bytes::Bytes;
use keyroute_error::ErrorExt;
use tokio::{runtime::Handle, sync::mpsc};
use tracing::{debug, trace, warn};

use super::SessionInner;
use crate::link::{LinkId, WireFrame};

/// Кадр, принятый линком и ожидающий обработки.
pub(super) struct InboundFrame {
    pub link: LinkId,
    pub bytes: Bytes,
}

/// Запускает `work_thread_num` задач, разбирающих общую очередь.
///
/// Задачи завершаются, когда сессия закрывает очередь.
pub(super) fn spawn_workers(
    inner: &Arc<SessionInner>,
    rx: mpsc::Receiver<InboundFrame>,
    runtime: &Handle,
) {
    let rx = Arc::new(tokio::sync::Mutex::new(rx));
    for worker in 0..inner.config.work_thread_num {
        let inner = inner.clone();
        let rx = rx.clone();
        runtime.spawn(async move {
            trace!(session = %inner.id, worker, "inbound worker started");
            loop {
                let next = rx.lock().await.recv().await;
                let Some(frame) = next else { break };
                inner.handle_inbound(frame);
            }
            trace!(session = %inner.id, worker, "inbound worker stopped");
        });
    }
}

impl SessionInner {
    /// Кладёт кадр в очередь. Вызывается из обработчика линка и никогда не
    /// ждёт: при переполнении кадр отбрасывается.
    pub(super) fn enqueue(
        &self,
        link: LinkId,
        bytes: Bytes,
    ) {
        if !self.config.inbound {
            self.counters.frames_ignored.fetch_add(1, Ordering::Relaxed);
            trace!(session = %self.id, link = %link, "inbound disabled, frame ignored");
            return;
        }
        let guard = self.inbound_tx.read();
        let Some(tx) = guard.as_ref() else {
            trace!(session = %self.id, link = %link, "frame after close ignored");
            return;
        };
        if let Err(err) = tx.try_send(InboundFrame { link, bytes }) {
            self.counters.frames_dropped.fetch_add(1, Ordering::Relaxed);
            warn!(
                session = %self.id,
                link = %link,
                capacity = self.config.queue_capacity,
                reason = %err,
                "inbound frame dropped",
            );
        }
    }

    pub(super) fn handle_inbound(
        &self,
        frame: InboundFrame,
    ) {
        self.counters.frames_received.fetch_add(1, Ordering::Relaxed);

        let wire = match WireFrame::decode(&frame.bytes) {
            Ok(wire) => wire,
            Err(err) => {
                self.counters.decode_failures.fetch_add(1, Ordering::Relaxed);
                warn!(session = %self.id, link = %frame.link, error = %err, "undecodable frame dropped");
                return;
            }
        };

        if wire.origin == self.id {
            self.counters
                .echoes_suppressed
                .fetch_add(1, Ordering::Relaxed);
            trace!(session = %self.id, link = %frame.link, key = %wire.key, "own frame suppressed");
            return;
        }

        // Один сэмпл может прийти по нескольким путям
        if self
            .seen
            .lock()
            .put((wire.origin, wire.timestamp.get()), ())
            .is_some()
        {
            self.counters
                .duplicates_dropped
                .fetch_add(1, Ordering::Relaxed);
            trace!(session = %self.id, link = %frame.link, origin = %wire.origin, "duplicate frame dropped");
            return;
        }

        let sample = match wire.to_sample() {
            Ok(sample) => sample.with_liveness(self.liveness.clone()),
            Err(err) => {
                self.counters.decode_failures.fetch_add(1, Ordering::Relaxed);
                warn!(session = %self.id, link = %frame.link, error = %err, "invalid sample dropped");
                return;
            }
        };

        self.clock.observe(sample.timestamp());
        let report = self.router.dispatch(&sample);
        debug!(
            session = %self.id,
            link = %frame.link,
            origin = %wire.origin,
            key = %sample.key_expr(),
            matched = report.matched,
            delivered = report.delivered,
            failed = report.failed,
            "inbound sample routed",
        );

        if self.config.relay && self.config.outbound && wire.hops < self.config.max_relay_hops {
            let relayed = wire.relayed();
            let sent = self.broadcast(&relayed, Some(frame.link));
            self.counters
                .frames_relayed
                .fetch_add(sent as u64, Ordering::Relaxed);
        }
    }

    /// Рассылает кадр во все линки, кроме `except`. Возвращает число
    /// успешных отправок; ошибки линков логируются и считаются.
    pub(super) fn broadcast(
        &self,
        frame: &WireFrame,
        except: Option<LinkId>,
    ) -> usize {
        let bytes = match frame.encode() {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(session = %self.id, key = %frame.key, error = %err, "frame encoding failed");
                return 0;
            }
        };

        // Снимок линков: отправка идёт без блокировки
        let links: Vec<_> = self
            .links
            .read()
            .iter()
            .filter(|(id, _)| Some(**id) != except)
            .map(|(id, link)| (*id, link.clone()))
            .collect();

        let mut sent = 0;
        for (id, link) in links {
            match link.send(bytes.clone()) {
                Ok(()) => sent += 1,
                Err(err) => {
                    self.counters.send_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        session = %self.id,
                        link = %id,
                        name = link.name(),
                        status = %err.status_code(),
                        error = %err,
                        "failed to send frame",
                    );
                }
            }
        }
        self.counters
            .frames_sent
            .fetch_add(sent as u64, Ordering::Relaxed);
        sent
    }
}
