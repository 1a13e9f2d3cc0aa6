use keyed_di::{Registry, Scope};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

fn counting_registry() -> (Registry, Arc<AtomicU32>, Arc<AtomicU32>) {
    let lazy_calls = Arc::new(AtomicU32::new(0));
    let scoped_calls = Arc::new(AtomicU32::new(0));
    let lazy = lazy_calls.clone();
    let scoped = scoped_calls.clone();

    let mut registry = Registry::new();
    registry
        .set_lazy("pool", move |_| Ok(lazy.fetch_add(1, Ordering::SeqCst)))
        .unwrap()
        .set_scoped("request", move |_| Ok(scoped.fetch_add(1, Ordering::SeqCst)))
        .unwrap();
    (registry, lazy_calls, scoped_calls)
}

fn read(scope: &Scope, token: &'static str) -> u32 {
    *scope.get(token).unwrap().unwrap().ready_as::<u32>().unwrap()
}

#[test]
fn test_scoped_is_stable_within_scope() {
    let (registry, _, scoped_calls) = counting_registry();
    let scope = registry.build().create_scope();

    let first = scope.get("request").unwrap().unwrap();
    let second = scope.get("request").unwrap().unwrap();

    assert!(first.ptr_eq(&second));
    assert_eq!(scoped_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_sibling_scopes_are_isolated() {
    let (registry, _, scoped_calls) = counting_registry();
    let root = registry.build();
    let a = root.create_scope();
    let b = root.create_scope();

    assert_ne!(read(&a, "request"), read(&b, "request"));
    assert_eq!(scoped_calls.load(Ordering::SeqCst), 2);
    assert!(a.is_cached("request"));
    assert!(b.is_cached("request"));
    assert!(!root.is_cached("request"));
}

#[test]
fn test_root_resolves_scoped_in_its_own_cache() {
    let (registry, _, _) = counting_registry();
    let root = registry.build();
    let child = root.create_scope();

    assert_ne!(read(&root, "request"), read(&child, "request"));
    assert!(root.is_cached("request"));
}

#[test]
fn test_lazy_is_shared_by_the_whole_tree() {
    let (registry, lazy_calls, _) = counting_registry();
    let root = registry.build();
    let grandchild = root.create_scope().create_scope();
    let sibling = root.create_scope();

    let from_grandchild = grandchild.get("pool").unwrap().unwrap();
    let from_sibling = sibling.get("pool").unwrap().unwrap();
    let from_root = root.get("pool").unwrap().unwrap();

    assert!(from_grandchild.ptr_eq(&from_sibling));
    assert!(from_grandchild.ptr_eq(&from_root));
    assert_eq!(lazy_calls.load(Ordering::SeqCst), 1);

    // Lazy entries live in the root only
    assert!(root.is_cached("pool"));
    assert!(!grandchild.is_cached("pool"));
}

#[test]
fn test_separate_roots_do_not_share_lazy() {
    let (registry, lazy_calls, _) = counting_registry();
    let first = registry.build();
    let second = registry.build();

    assert_ne!(read(&first, "pool"), read(&second, "pool"));
    assert_eq!(lazy_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_scope_tree_navigation() {
    let root = Registry::new().build();
    let child = root.create_scope();
    let grandchild = child.create_scope();

    assert!(root.is_root());
    assert!(!child.is_root());
    assert!(grandchild.root().ptr_eq(&root));
    assert!(child.root().ptr_eq(&root));
    assert!(root.root().ptr_eq(&root));
    assert!(!child.ptr_eq(&grandchild));
    assert!(child.clone().ptr_eq(&child));
}

#[test]
fn test_lazy_factory_receives_requesting_scope() {
    let mut registry = Registry::new();
    registry
        .set_scoped("tenant", |scope: &Scope| Ok(scope.is_root()))
        .unwrap()
        .set_lazy("tenant_snapshot", |scope: &Scope| {
            let tenant = scope.get("tenant")?.ok_or("tenant missing")?;
            Ok(*tenant.ready_as::<bool>().ok_or("tenant has the wrong type")?)
        })
        .unwrap();

    let root = registry.build();
    let child = root.create_scope();

    let snapshot = child.get("tenant_snapshot").unwrap().unwrap();
    // Built from the child's scoped value, cached in the root
    assert!(!*snapshot.ready_as::<bool>().unwrap());
    assert!(child.is_cached("tenant"));
    assert!(!root.is_cached("tenant"));
    assert!(root.is_cached("tenant_snapshot"));
}

#[test]
fn test_clear_cache_rebuilds_on_next_get() {
    let (registry, _, scoped_calls) = counting_registry();
    let scope = registry.build().create_scope();

    let before = read(&scope, "request");
    assert!(scope.clear_cache("request"));
    assert!(!scope.clear_cache("request"));
    let after = read(&scope, "request");

    assert_ne!(before, after);
    assert_eq!(scoped_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_clearing_lazy_from_child_is_a_no_op() {
    let (registry, lazy_calls, _) = counting_registry();
    let root = registry.build();
    let child = root.create_scope();

    read(&child, "pool");
    assert!(!child.clear_cache("pool"));
    read(&child, "pool");
    assert_eq!(lazy_calls.load(Ordering::SeqCst), 1);

    assert!(root.clear_cache("pool"));
    read(&child, "pool");
    assert_eq!(lazy_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_clear_all_cache() {
    let (registry, _, _) = counting_registry();
    let root = registry.build();

    read(&root, "pool");
    read(&root, "request");
    assert_eq!(root.cache_size(), 2);

    root.clear_all_cache();
    assert_eq!(root.cache_size(), 0);
    assert!(!root.is_cached("pool"));
}

#[test]
fn test_singletons_never_enter_a_cache() {
    let mut registry = Registry::new();
    registry.set("cfg", 1u8).unwrap();
    let scope = registry.build();

    scope.get("cfg").unwrap();
    assert_eq!(scope.cache_size(), 0);
    assert!(!scope.is_cached("cfg"));
}

struct Session;

#[test]
fn test_dropped_scope_releases_unawaited_future() {
    let session = Arc::new(Session);
    let weak = Arc::downgrade(&session);

    let mut registry = Registry::new();
    registry
        .set_scoped_async("session", move |_| {
            let session = session.clone();
            async move { Ok(session) }
        })
        .unwrap();

    let root = registry.build();
    let child = root.create_scope();
    let pending = child.get("session").unwrap().unwrap();
    assert!(pending.is_pending());

    drop(pending);
    drop(child);
    drop(root);
    drop(registry);
    assert!(weak.upgrade().is_none());
}

#[test]
fn test_clearing_releases_future_that_holds_its_scope() {
    let session = Arc::new(Session);
    let weak = Arc::downgrade(&session);

    let mut registry = Registry::new();
    registry
        .set_scoped_async("report", move |scope: &Scope| {
            let scope = scope.clone();
            let session = session.clone();
            async move {
                let _ = scope.cache_size();
                Ok(session)
            }
        })
        .unwrap();

    let root = registry.build();
    let child = root.create_scope();
    drop(child.get("report").unwrap());

    // The future owns a handle to `child`, so only clearing breaks the loop
    child.clear_all_cache();
    drop(child);
    drop(root);
    drop(registry);
    assert!(weak.upgrade().is_none());
}
