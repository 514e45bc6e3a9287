use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use keyroute::{
    ListenerError, ListenerResult, RecvError, Sample, SampleKind, Session, SessionConfig,
    SessionError, StatusCode, TryRecvError,
};
use parking_lot::Mutex;

fn open() -> Session {
    Session::open(SessionConfig::default()).expect("session opens inside runtime")
}

fn counter() -> (Arc<AtomicUsize>, impl Fn(Sample) -> ListenerResult + Send + Sync + 'static) {
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    let listener = move |_s: Sample| -> ListenerResult {
        h.fetch_add(1, Ordering::SeqCst);
        Ok(())
    };
    (hits, listener)
}

/// Тест проверяет, что две подписки с одинаковым шаблоном получают
/// подходящий сэмпл ровно по одному разу.
#[tokio::test]
async fn test_identical_patterns_each_receive_once() {
    let session = open();
    let (first, l1) = counter();
    let (second, l2) = counter();
    session.declare_subscriber("drone/*/telemetry", l1).unwrap();
    session.declare_subscriber("drone/*/telemetry", l2).unwrap();

    let report = session.put("drone/7/telemetry", "alt=120").unwrap();

    assert_eq!(report.matched, 2);
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

/// Тест проверяет, что после снятия подписки она ничего не получает.
#[tokio::test]
async fn test_undeclared_subscription_receives_nothing() {
    let session = open();
    let (hits, listener) = counter();
    let sub = session.declare_subscriber("a/**", listener).unwrap();

    session.put("a/b", "1").unwrap();
    session.undeclare(sub).unwrap();
    let report = session.put("a/b", "2").unwrap();

    assert_eq!(report.matched, 0);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(session.subscriber_count(), 0);
}

#[tokio::test]
async fn test_subscriber_handle_undeclare() {
    let session = open();
    let (hits, listener) = counter();
    let sub = session.declare_subscriber("k", listener).unwrap();
    let id = sub.id();
    assert_eq!(sub.key_expr().as_str(), "k");

    sub.undeclare().unwrap();
    session.put("k", "x").unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(session.subscriber_count() == 0, "subscription {id} still present");
}

/// Тест проверяет, что публикация в закрытую сессию даёт SessionClosed.
#[tokio::test]
async fn test_publish_after_close_fails() {
    let session = open();
    session.close();

    let err = session.put("a/b", "x").unwrap_err();
    assert_eq!(err.status_code(), StatusCode::SessionClosed);
    assert_eq!(err.downcast_ref::<SessionError>(), Some(&SessionError::Closed));

    let err = session
        .declare_subscriber("a", |_s: Sample| -> ListenerResult { Ok(()) })
        .unwrap_err();
    assert!(err.is(StatusCode::SessionClosed));
}

/// Тест проверяет, что отказ первого слушателя не мешает второму получить
/// тот же сэмпл.
#[tokio::test]
async fn test_failing_listener_does_not_block_others() {
    let session = open();
    let calls = Arc::new(AtomicUsize::new(0));
    let c = calls.clone();
    session
        .declare_subscriber("k/*", move |_s: Sample| -> ListenerResult {
            // Падает только на первом вызове
            if c.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(ListenerError::failed("first call fails"));
            }
            Ok(())
        })
        .unwrap();
    let (second, listener) = counter();
    session.declare_subscriber("k/*", listener).unwrap();

    let report = session.put("k/1", "x").unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.delivered, 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);

    let report = session.put("k/2", "x").unwrap();
    assert_eq!(report.delivered, 2);
    assert_eq!(session.router_stats().listener_failures, 1);
}

/// Тест проверяет, что паника слушателя изолирована.
#[tokio::test]
async fn test_panicking_listener_isolated() {
    let session = open();
    session
        .declare_subscriber("k", |_s: Sample| -> ListenerResult { panic!("bad listener") })
        .unwrap();
    let (hits, listener) = counter();
    session.declare_subscriber("k", listener).unwrap();

    let report = session.put("k", "x").unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(session.put("k", "y").is_ok());
}

/// Тест проверяет, что сэмпл несёт ключ, payload, вид и растущие метки.
#[tokio::test]
async fn test_sample_fields_and_timestamps() {
    let session = open();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    session
        .declare_subscriber("@/*/@mavlink/v2/out", move |sample: Sample| -> ListenerResult {
            s.lock().push(sample);
            Ok(())
        })
        .unwrap();

    session.put("@/uav-1/@mavlink/v2/out", vec![0xfdu8, 0x01]).unwrap();
    session.delete("@/uav-1/@mavlink/v2/out").unwrap();
    session.put("@/uav-1/@mavlink/v2/in", "ignored").unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].key_expr().as_str(), "@/uav-1/@mavlink/v2/out");
    assert_eq!(seen[0].payload().as_ref(), &[0xfd, 0x01]);
    assert_eq!(seen[0].kind(), SampleKind::Put);
    assert_eq!(seen[1].kind(), SampleKind::Delete);
    assert!(seen[1].payload().is_empty());
    assert!(seen[1].timestamp() > seen[0].timestamp());
    assert!(seen[0].is_session_alive());
}

#[tokio::test]
async fn test_channel_subscriber_drains_after_undeclare() {
    let session = open();
    let mut sub = session.declare_channel_subscriber("q/**", 8).unwrap();

    session.put("q/1", "one").unwrap();
    session.put("q/2/3", "two").unwrap();

    let first = sub.recv().await.unwrap();
    assert_eq!(first.payload().as_ref(), b"one");

    let mut rx = sub.undeclare().unwrap();
    session.put("q/4", "late").unwrap();

    assert_eq!(rx.recv().await.unwrap().payload().as_ref(), b"two");
    assert_eq!(rx.recv().await.unwrap_err(), RecvError::Closed);
}

/// Тест проверяет, что переполнение очереди канального подписчика
/// считается отказом слушателя, а не блокирует публикацию.
#[tokio::test]
async fn test_channel_subscriber_overflow() {
    let session = open();
    let mut sub = session.declare_channel_subscriber("k", 1).unwrap();

    assert_eq!(session.put("k", "1").unwrap().delivered, 1);
    let report = session.put("k", "2").unwrap();
    assert_eq!(report.failed, 1);

    assert_eq!(sub.try_recv().unwrap().payload().as_ref(), b"1");
    assert_eq!(sub.try_recv().unwrap_err(), TryRecvError::Empty);
}

/// Тест проверяет, что закрытие сессии закрывает канальные подписки и
/// помечает доставленные сэмплы.
#[tokio::test]
async fn test_close_invalidates_subscriptions() {
    let session = open();
    let mut sub = session.declare_channel_subscriber("k", 4).unwrap();
    session.put("k", "before").unwrap();
    session.close();

    let sample = sub.recv().await.unwrap();
    assert!(!sample.is_session_alive());
    assert_eq!(sub.recv().await.unwrap_err(), RecvError::Closed);
    assert_eq!(session.subscriber_count(), 0);
}

/// Тест проверяет конкурентные объявления и публикации из многих задач.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_publishers() {
    let session = Arc::new(open());
    let (hits, listener) = counter();
    session.declare_subscriber("load/**", listener).unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|t| {
            let session = session.clone();
            tokio::spawn(async move {
                for i in 0..100 {
                    session.put(format!("load/{t}/{i}"), "x").unwrap();
                    if i % 10 == 0 {
                        let sub = session
                            .declare_subscriber("other", |_s: Sample| -> ListenerResult { Ok(()) })
                            .unwrap();
                        session.undeclare(sub).unwrap();
                    }
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(hits.load(Ordering::SeqCst), 800);
    assert_eq!(session.subscriber_count(), 1);
}

/// Тест проверяет, что слушатель, запущенный до закрытия, видит закрытие
/// через флаг жизни сэмпла.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_long_listener_observes_close() {
    let session = Arc::new(open());
    let (started_tx, started_rx) = std::sync::mpsc::channel();
    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    let done_tx = Mutex::new(Some(done_tx));

    session
        .declare_subscriber("slow", move |sample: Sample| -> ListenerResult {
            started_tx.send(()).ok();
            while sample.is_session_alive() {
                std::thread::sleep(Duration::from_millis(1));
            }
            if let Some(tx) = done_tx.lock().take() {
                tx.send(()).ok();
            }
            Ok(())
        })
        .unwrap();

    let publisher = session.clone();
    let handle = tokio::task::spawn_blocking(move || publisher.put("slow", "x"));

    started_rx.recv().unwrap();
    session.close();

    tokio::time::timeout(Duration::from_secs(5), done_rx)
        .await
        .expect("listener noticed close")
        .unwrap();
    assert!(handle.await.unwrap().is_ok());
}

/// Тест проверяет, что подписки, объявляемые параллельно с закрытием, не
/// остаются в таблице закрытой сессии.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_close_racing_declare_leaves_no_subscriptions() {
    for _ in 0..20 {
        let session = Arc::new(open());
        let barrier = Arc::new(std::sync::Barrier::new(5));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let session = session.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..200 {
                        let declared = session
                            .declare_subscriber("race/**", |_s: Sample| -> ListenerResult { Ok(()) });
                        if let Err(err) = declared {
                            assert_eq!(err.status_code(), StatusCode::SessionClosed);
                            break;
                        }
                    }
                })
            })
            .collect();

        barrier.wait();
        session.close();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(session.subscriber_count(), 0);
    }
}
