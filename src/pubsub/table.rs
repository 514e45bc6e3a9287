use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    vec,
};

use keyroute_error::SubscriptionError;
use parking_lot::RwLock;

use super::{Listener, ListenerResult, Sample};
use crate::keyexpr::KeyExpr;

/// Идентификатор подписки, уникальный в пределах таблицы.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Запись таблицы: шаблон, слушатель и флаг активности.
///
/// Флаг сбрасывается при удалении записи, так что маршрутизатор, уже
/// взявший снимок, не вызовет снятого слушателя.
pub struct Subscription {
    id: SubscriptionId,
    key_expr: KeyExpr,
    listener: Arc<dyn Listener>,
    active: AtomicBool,
}

/// Реестр подписок сессии.
///
/// Читатели (маршрутизация) работают параллельно; вставка и удаление
/// берут блокировку на запись.
pub struct SubscriptionTable {
    /// Подписки: id -> запись
    entries: RwLock<HashMap<SubscriptionId, Arc<Subscription>>>,
    /// Счётчик для генерации id
    id_counter: AtomicU64,
}

/// Ленивый обход подписок, чей шаблон совпадает с ключом.
///
/// Работает по снимку таблицы на момент вызова [`SubscriptionTable::matching`]:
/// параллельные вставки и удаления его не портят. Удалённые после снимка
/// записи остаются в обходе, но уже неактивны.
pub struct Matching {
    key: KeyExpr,
    snapshot: vec::IntoIter<Arc<Subscription>>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl SubscriptionId {
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn key_expr(&self) -> &KeyExpr {
        &self.key_expr
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Передаёт сэмпл слушателю.
    pub fn deliver(
        &self,
        sample: Sample,
    ) -> ListenerResult {
        self.listener.on_sample(sample)
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            id_counter: AtomicU64::new(0),
        }
    }

    /// Регистрирует слушателя на шаблоне. Один слушатель может быть
    /// зарегистрирован многократно, каждый раз с новым id.
    pub fn insert<L: Listener>(
        &self,
        key_expr: KeyExpr,
        listener: L,
    ) -> SubscriptionId {
        self.insert_shared(key_expr, Arc::new(listener))
    }

    /// То же, что [`insert`](Self::insert), для уже разделяемого слушателя.
    pub fn insert_shared(
        &self,
        key_expr: KeyExpr,
        listener: Arc<dyn Listener>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.id_counter.fetch_add(1, Ordering::Relaxed) + 1);
        let entry = Arc::new(Subscription {
            id,
            key_expr,
            listener,
            active: AtomicBool::new(true),
        });
        self.entries.write().insert(id, entry);
        id
    }

    /// Удаляет подписку. После возврата маршрутизатор её больше не вызывает.
    pub fn remove(
        &self,
        id: SubscriptionId,
    ) -> Result<(), SubscriptionError> {
        let entry = self
            .entries
            .write()
            .remove(&id)
            .ok_or(SubscriptionError::Unknown { id: id.0 })?;
        entry.deactivate();
        Ok(())
    }

    /// Подписки, чей шаблон совпадает с конкретным ключом `key`.
    ///
    /// Блокировка на чтение держится только на время снятия снимка.
    pub fn matching(
        &self,
        key: &KeyExpr,
    ) -> Matching {
        let snapshot: Vec<_> = self.entries.read().values().cloned().collect();
        Matching {
            key: key.clone(),
            snapshot: snapshot.into_iter(),
        }
    }

    /// Удаляет все подписки. Возвращает, сколько было удалено.
    pub fn clear(&self) -> usize {
        let drained: Vec<_> = self.entries.write().drain().collect();
        for (_, entry) in &drained {
            entry.deactivate();
        }
        drained.len()
    }

    pub fn contains(
        &self,
        id: SubscriptionId,
    ) -> bool {
        self.entries.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Все зарегистрированные шаблоны, упорядоченные по id.
    pub fn patterns(&self) -> Vec<(SubscriptionId, KeyExpr)> {
        let mut out: Vec<_> = self
            .entries
            .read()
            .values()
            .map(|e| (e.id, e.key_expr.clone()))
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl Default for SubscriptionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for Matching {
    type Item = Arc<Subscription>;

    fn next(&mut self) -> Option<Self::Item> {
        let key = &self.key;
        self.snapshot.find(|e| e.key_expr.matches(key))
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("key_expr", &self.key_expr)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for SubscriptionTable {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("SubscriptionTable")
            .field("len", &self.len())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn ke(s: &str) -> KeyExpr {
        KeyExpr::parse(s).unwrap()
    }

    fn noop(_s: Sample) -> ListenerResult {
        Ok(())
    }

    fn matched_ids(
        table: &SubscriptionTable,
        key: &str,
    ) -> Vec<SubscriptionId> {
        let mut ids: Vec<_> = table.matching(&ke(key)).map(|e| e.id()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_insert_assigns_distinct_ids() {
        let table = SubscriptionTable::new();
        let a = table.insert(ke("a/*"), noop);
        let b = table.insert(ke("a/*"), noop);
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
        assert!(table.contains(a));
        assert_eq!(
            table.patterns(),
            vec![(a, ke("a/*")), (b, ke("a/*"))]
        );
    }

    #[test]
    fn test_matching_filters_by_pattern() {
        let table = SubscriptionTable::new();
        let star = table.insert(ke("a/*"), noop);
        let deep = table.insert(ke("a/**"), noop);
        let other = table.insert(ke("b/*"), noop);

        assert_eq!(matched_ids(&table, "a/x"), vec![star, deep]);
        assert_eq!(matched_ids(&table, "a/x/y"), vec![deep]);
        assert_eq!(matched_ids(&table, "b/x"), vec![other]);
        assert!(matched_ids(&table, "c").is_empty());
    }

    /// Тест проверяет, что удаление неизвестного id даёт ошибку, а
    /// повторное удаление не проходит.
    #[test]
    fn test_remove_unknown() {
        let table = SubscriptionTable::new();
        let id = table.insert(ke("a"), noop);
        table.remove(id).unwrap();
        assert_eq!(
            table.remove(id).unwrap_err(),
            SubscriptionError::Unknown { id: id.get() }
        );
        assert!(table.is_empty());
    }

    /// Тест проверяет, что снимок переживает удаление, но запись в нём
    /// становится неактивной.
    #[test]
    fn test_snapshot_sees_deactivation() {
        let table = SubscriptionTable::new();
        let id = table.insert(ke("a/**"), noop);
        let mut matching = table.matching(&ke("a/b"));
        table.remove(id).unwrap();

        let entry = matching.next().unwrap();
        assert_eq!(entry.id(), id);
        assert!(!entry.is_active());
        assert!(matching.next().is_none());
    }

    #[test]
    fn test_clear() {
        let table = SubscriptionTable::new();
        table.insert(ke("a"), noop);
        table.insert(ke("b"), noop);
        let snapshot: Vec<_> = table.matching(&ke("a")).collect();
        assert_eq!(table.clear(), 2);
        assert!(table.is_empty());
        assert!(snapshot.iter().all(|e| !e.is_active()));
    }

    /// Тест проверяет параллельные вставки, удаления и чтения.
    #[test]
    fn test_concurrent_insert_remove_match() {
        let table = Arc::new(SubscriptionTable::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = table.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        let id = table.insert(ke("x/**"), noop);
                        assert!(table.matching(&ke("x/y")).count() >= 1);
                        table.remove(id).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(table.is_empty());
    }
}
