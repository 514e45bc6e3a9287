use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use keyroute_error::{ErrorExt, ListenerError};
use tracing::{trace, warn};

use super::{Liveness, Sample, Subscription, SubscriptionTable};

/// Итог доставки одного сэмпла.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Подписок, чей шаблон совпал с ключом
    pub matched: usize,
    /// Слушателей, успешно принявших сэмпл
    pub delivered: usize,
    /// Слушателей, вернувших ошибку или запаниковавших
    pub failed: usize,
    /// Пропущенных: подписка снята или сессия закрыта во время доставки
    pub skipped: usize,
}

/// Накопительные счётчики маршрутизатора.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RouterStats {
    pub samples_routed: u64,
    pub deliveries: u64,
    pub listener_failures: u64,
    pub skipped: u64,
}

/// Доставляет сэмплы всем слушателям с подходящим шаблоном.
///
/// Каждый слушатель вызывается изолированно: ошибка или паника одного не
/// мешает остальным. Порядок вызова слушателей одного сэмпла не определён.
pub struct Router {
    table: Arc<SubscriptionTable>,
    liveness: Liveness,
    /// Общее количество маршрутизированных сэмплов
    samples_routed: AtomicU64,
    /// Успешные вызовы слушателей
    deliveries: AtomicU64,
    /// Ошибки и паники слушателей
    listener_failures: AtomicU64,
    /// Пропущенные вызовы
    skipped: AtomicU64,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl DispatchReport {
    /// Все совпавшие слушатели приняли сэмпл.
    pub fn is_complete(&self) -> bool {
        self.delivered == self.matched
    }
}

impl Router {
    pub fn new(
        table: Arc<SubscriptionTable>,
        liveness: Liveness,
    ) -> Self {
        Self {
            table,
            liveness,
            samples_routed: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            listener_failures: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    pub fn table(&self) -> &Arc<SubscriptionTable> {
        &self.table
    }

    /// Доставляет сэмпл каждой активной подписке с совпадающим шаблоном.
    ///
    /// Перед каждым вызовом проверяются флаг жизни сессии и флаг активности
    /// записи: после закрытия сессии или снятия подписки новые вызовы не
    /// начинаются, уже начатые доходят до конца.
    pub fn dispatch(
        &self,
        sample: &Sample,
    ) -> DispatchReport {
        self.samples_routed.fetch_add(1, Ordering::Relaxed);

        let mut report = DispatchReport::default();
        for entry in self.table.matching(sample.key_expr()) {
            report.matched += 1;
            if !self.liveness.is_alive() || !entry.is_active() {
                report.skipped += 1;
                continue;
            }
            match invoke(&entry, sample.clone()) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        subscription = %entry.id(),
                        pattern = %entry.key_expr(),
                        key = %sample.key_expr(),
                        status = %err.status_code(),
                        error = %err,
                        "listener failed",
                    );
                }
            }
        }

        self.deliveries
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.listener_failures
            .fetch_add(report.failed as u64, Ordering::Relaxed);
        self.skipped
            .fetch_add(report.skipped as u64, Ordering::Relaxed);

        trace!(
            key = %sample.key_expr(),
            matched = report.matched,
            delivered = report.delivered,
            "sample routed",
        );
        report
    }

    pub fn stats(&self) -> RouterStats {
        RouterStats {
            samples_routed: self.samples_routed.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            listener_failures: self.listener_failures.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

/// Вызывает слушателя, превращая панику в [`ListenerError::Panicked`].
fn invoke(
    entry: &Subscription,
    sample: Sample,
) -> Result<(), ListenerError> {
    panic::catch_unwind(AssertUnwindSafe(|| entry.deliver(sample))).unwrap_or_else(|payload| {
        Err(ListenerError::Panicked {
            message: panic_message(payload.as_ref()),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
