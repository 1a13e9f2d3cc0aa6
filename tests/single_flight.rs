/// Single-flight tests for asynchronous factories
///
/// Concurrent requests for an uncached lazy or scoped token must share one
/// in-flight future and one factory invocation.

use futures::future::join_all;
use keyed_di::{BoxError, Registry, Scope};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Config {
    port: u16,
}

struct Connection {
    port: u16,
}

#[tokio::test]
async fn test_concurrent_gets_connect_once() {
    let connects = Arc::new(AtomicU32::new(0));
    let counter = connects.clone();

    let mut registry = Registry::new();
    registry.set("cfg", Config { port: 8080 }).unwrap();
    registry
        .set_lazy_async("db", move |scope: &Scope| {
            let counter = counter.clone();
            let scope = scope.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                let cfg = scope.resolve::<Config>("cfg").await?;
                Ok::<_, BoxError>(Connection { port: cfg.port })
            }
        })
        .unwrap();

    let scope = registry.build();
    let first = scope.get("db").unwrap().unwrap();
    let second = scope.get("db").unwrap().unwrap();
    assert!(first.ptr_eq(&second));

    let (a, b) = tokio::join!(first.downcast::<Connection>(), second.downcast::<Connection>());
    let (a, b) = (a.unwrap(), b.unwrap());

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.port, 8080);
    assert_eq!(connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_many_waiters_across_scopes() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    let mut registry = Registry::new();
    registry
        .set_lazy_async("model", move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(vec![0.5f32; 16])
            }
        })
        .unwrap();

    let root = registry.build();
    let scopes: Vec<Scope> = (0..8).map(|_| root.create_scope()).collect();

    let pending: Vec<_> = scopes
        .iter()
        .map(|scope| scope.get("model").unwrap().unwrap())
        .collect();
    let values: Vec<_> = join_all(pending.into_iter().map(|r| r.value()))
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert!(values.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_settled_entry_becomes_ready() {
    let mut registry = Registry::new();
    registry
        .set_lazy_async("answer", |_| async { Ok(42u64) })
        .unwrap();

    let scope = registry.build();
    let pending = scope.get("answer").unwrap().unwrap();
    assert!(pending.is_pending());
    assert!(scope.is_cached("answer"));

    let value = pending.clone().value().await.unwrap();

    let later = scope.get("answer").unwrap().unwrap();
    assert!(!later.is_pending());
    assert!(Arc::ptr_eq(&later.ready().unwrap(), &value));
    // The stale handle still observes the settled value
    assert_eq!(*pending.ready_as::<u64>().unwrap(), 42);
}

#[tokio::test]
async fn test_scoped_async_is_per_scope() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    let mut registry = Registry::new();
    registry
        .set_scoped_async("session", move |_| {
            let id = counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(id) }
        })
        .unwrap();

    let root = registry.build();
    let a = root.create_scope();
    let b = root.create_scope();

    let a1 = a.get("session").unwrap().unwrap();
    let a2 = a.get("session").unwrap().unwrap();
    let b1 = b.get("session").unwrap().unwrap();
    assert!(a1.ptr_eq(&a2));
    assert!(!a1.ptr_eq(&b1));

    let (a_id, b_id) = tokio::join!(a1.downcast::<u32>(), b1.downcast::<u32>());
    assert_ne!(*a_id.unwrap(), *b_id.unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_transient_async_is_never_shared() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    let mut registry = Registry::new();
    registry
        .set_transient_async("nonce", move |_| {
            let nonce = counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, BoxError>(nonce) }
        })
        .unwrap();

    let scope = registry.build();
    let first = scope.get("nonce").unwrap().unwrap();
    let second = scope.get("nonce").unwrap().unwrap();
    assert!(!first.ptr_eq(&second));
    assert!(!scope.is_cached("nonce"));

    assert_eq!(*first.downcast::<u32>().await.unwrap(), 0);
    assert_eq!(*second.downcast::<u32>().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tasks_on_multi_thread_runtime_share_one_call() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    let mut registry = Registry::new();
    registry
        .set_lazy_async("cache", move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(String::from("warm"))
            }
        })
        .unwrap();

    let root = registry.build();
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let scope = root.create_scope();
            tokio::spawn(async move { scope.resolve::<String>("cache").await })
        })
        .collect();

    let mut values = Vec::new();
    for handle in handles {
        values.push(handle.await.unwrap().unwrap());
    }

    assert!(values.iter().all(|v| Arc::ptr_eq(v, &values[0])));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
