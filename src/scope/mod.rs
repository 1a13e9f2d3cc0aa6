//! Scoped resolution and cache management.
//!
//! This module contains the `Scope` type, which resolves tokens against a
//! registry according to their lifetimes.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt};
use parking_lot::ReentrantMutex;

use crate::error::{BoxError, DiError, DiResult};
use crate::internal::StackGuard;
use crate::invoker::{Injectable, Invoker};
use crate::lifetime::Lifetime;
use crate::observer::Observers;
use crate::options::ContainerOptions;
use crate::registration::{AnyArc, FactoryFn, Produced, Registration};
use crate::registry::Registry;
use crate::token::Token;

mod cache;
mod resolved;

use cache::{next_ticket, ScopeCache, WeakScopeCache};
pub use resolved::{Pending, Resolved};

/// Resolution context with its own cache.
///
/// A root scope comes from [`Registry::build`]; child scopes come from
/// [`Scope::create_scope`]. Every scope shares the registry, knows its root,
/// and owns a cache no other scope writes to, except that lazy tokens are
/// always cached in the root.
///
/// `Scope` is a cheap handle: clones refer to the same scope and cache.
///
/// # Lifetime Behavior
///
/// - **Singleton**: the registered value, as-is
/// - **Lazy**: cached in the root scope, shared by all descendants
/// - **Scoped**: cached in this scope
/// - **Transient**: built on every call, never cached
///
/// # Single flight
///
/// The synchronous part of a lazy or scoped `get` (cache check, factory call,
/// cache store) runs under a re-entrant gate shared by the root and all its
/// descendants. When a factory returns a future, that future is stored before
/// `get` returns, so every request arriving before it settles receives the
/// same future instead of calling the factory again. Factories may resolve
/// other tokens synchronously; the gate admits re-entry from the same thread.
///
/// # Examples
///
/// ```
/// use keyed_di::Registry;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), keyed_di::DiError> {
/// let connects = Arc::new(AtomicU32::new(0));
/// let counter = connects.clone();
///
/// let mut registry = Registry::new();
/// registry.set_lazy_async("db", move |_| {
///     let counter = counter.clone();
///     async move {
///         counter.fetch_add(1, Ordering::SeqCst);
///         Ok(String::from("connection"))
///     }
/// })?;
///
/// let scope = registry.build();
/// let first = scope.get("db")?.unwrap();
/// let second = scope.get("db")?.unwrap();
/// let (a, b) = futures::join!(first.value(), second.value());
///
/// assert!(Arc::ptr_eq(&a?, &b?));
/// assert_eq!(connects.load(Ordering::SeqCst), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    registry: Registry,
    // None when this scope is the root
    root: Option<Scope>,
    cache: ScopeCache,
    gate: Arc<ReentrantMutex<()>>,
    options: ContainerOptions,
}

impl Scope {
    pub(crate) fn new_root(registry: Registry) -> Self {
        let options = registry.options();
        Self {
            inner: Arc::new(ScopeInner {
                registry,
                root: None,
                cache: ScopeCache::default(),
                gate: Arc::new(ReentrantMutex::new(())),
                options,
            }),
        }
    }

    // ----- Resolution -----

    /// Resolves `token`.
    ///
    /// Returns `Ok(None)` for unregistered tokens. Lazy and scoped tokens
    /// come from the cache when present, in-flight futures included.
    ///
    /// # Errors
    ///
    /// A factory that fails synchronously yields `ResolutionFailure` and
    /// leaves nothing cached. A factory future that fails yields
    /// `ResolutionFailure` from the `Pending` value, and its cache entry is
    /// removed so the next `get` calls the factory again.
    pub fn get(&self, token: impl Into<Token>) -> DiResult<Option<Resolved>> {
        let token = token.into();
        let Some(registration) = self.inner.registry.lookup(&token) else {
            return Ok(None);
        };

        let resolved = match registration {
            Registration::Singleton(value) => Resolved::Ready(value),
            Registration::Lazy(factory) => {
                self.resolve_cached(&token, Lifetime::Lazy, &factory, self.root_cache())?
            }
            Registration::Scoped(factory) => {
                self.resolve_cached(&token, Lifetime::Scoped, &factory, &self.inner.cache)?
            }
            Registration::Transient(factory) => self.resolve_transient(&token, &factory)?,
        };
        Ok(Some(resolved))
    }

    /// Resolves `token`, or returns `default` when it is not registered.
    pub fn get_or(&self, token: impl Into<Token>, default: Resolved) -> DiResult<Resolved> {
        Ok(self.get(token)?.unwrap_or(default))
    }

    /// Resolves each token in order; results keep that order.
    ///
    /// Stops at the first synchronous failure.
    ///
    /// # Examples
    ///
    /// ```
    /// # use keyed_di::Registry;
    /// let mut registry = Registry::new();
    /// registry.set("a", 1u8)?.set("c", 3u8)?;
    ///
    /// let results = registry.build().get_many(["a", "b", "c"])?;
    /// let values: Vec<Option<u8>> = results
    ///     .iter()
    ///     .map(|r| r.as_ref().and_then(|r| r.ready_as::<u8>()).map(|v| *v))
    ///     .collect();
    /// assert_eq!(values, [Some(1), None, Some(3)]);
    /// # Ok::<(), keyed_di::DiError>(())
    /// ```
    pub fn get_many<I, T>(&self, tokens: I) -> DiResult<Vec<Option<Resolved>>>
    where
        I: IntoIterator<Item = T>,
        T: Into<Token>,
    {
        tokens.into_iter().map(|token| self.get(token)).collect()
    }

    /// Resolves the callable's dependencies and calls it.
    ///
    /// See [`Invoker::invoke`].
    pub fn invoke<C: Injectable + ?Sized>(&self, callable: &C) -> DiResult<C::Output> {
        Invoker::invoke(self, callable)
    }

    /// Resolves `token` and downcasts it, awaiting in-flight values.
    ///
    /// # Errors
    ///
    /// `NotFound` when unregistered, `TypeMismatch` when the value is not a
    /// `T`, plus any resolution failure.
    pub async fn resolve<T: Any + Send + Sync>(&self, token: impl Into<Token>) -> DiResult<Arc<T>> {
        let token = token.into();
        match self.get(token.clone())? {
            Some(resolved) => resolved.downcast::<T>().await,
            None => Err(DiError::NotFound(token)),
        }
    }

    /// Like [`resolve`](Self::resolve), with `None` for unregistered tokens.
    pub async fn try_resolve<T: Any + Send + Sync>(
        &self,
        token: impl Into<Token>,
    ) -> DiResult<Option<Arc<T>>> {
        match self.get(token)? {
            Some(resolved) => resolved.downcast::<T>().await.map(Some),
            None => Ok(None),
        }
    }

    // ----- Scope tree -----

    /// Creates a child scope with an empty cache.
    ///
    /// The child shares this scope's registry and root; its root is this
    /// scope's root, not this scope.
    pub fn create_scope(&self) -> Scope {
        Scope {
            inner: Arc::new(ScopeInner {
                registry: self.inner.registry.clone(),
                root: Some(self.root()),
                cache: ScopeCache::default(),
                gate: Arc::clone(&self.inner.gate),
                options: self.inner.options.clone(),
            }),
        }
    }

    /// The root scope of this tree.
    pub fn root(&self) -> Scope {
        match &self.inner.root {
            Some(root) => root.clone(),
            None => self.clone(),
        }
    }

    /// Whether this scope is the root of its tree.
    pub fn is_root(&self) -> bool {
        self.inner.root.is_none()
    }

    /// The registry this scope resolves against.
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Whether both handles refer to the same scope.
    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ----- Cache management -----

    /// Removes `token` from this scope's cache; returns whether it was there.
    ///
    /// Lazy tokens live in the root's cache, so clearing one from a child is
    /// a no-op.
    pub fn clear_cache(&self, token: impl Into<Token>) -> bool {
        self.inner.cache.remove(&token.into())
    }

    /// Empties this scope's cache.
    pub fn clear_all_cache(&self) {
        self.inner.cache.clear();
    }

    /// Number of entries, ready or in flight, in this scope's cache.
    pub fn cache_size(&self) -> usize {
        self.inner.cache.len()
    }

    /// Whether this scope's cache holds `token`, ready or in flight.
    pub fn is_cached(&self, token: impl Into<Token>) -> bool {
        self.inner.cache.contains(&token.into())
    }

    // ----- Internals -----

    fn root_cache(&self) -> &ScopeCache {
        match &self.inner.root {
            Some(root) => &root.inner.cache,
            None => &self.inner.cache,
        }
    }

    fn resolve_cached(
        &self,
        token: &Token,
        lifetime: Lifetime,
        factory: &FactoryFn,
        target: &ScopeCache,
    ) -> DiResult<Resolved> {
        let _gate = self.inner.gate.lock();

        if let Some(hit) = target.lookup(token) {
            return Ok(hit);
        }

        let observers = self.inner.registry.observers();
        let started = Instant::now();
        match self.call_factory(token, lifetime, factory, &observers)? {
            Produced::Ready(value) => {
                target.insert_ready(token.clone(), value.clone());
                observers.resolved(token, lifetime, started.elapsed());
                Ok(Resolved::Ready(value))
            }
            Produced::Deferred(future) => {
                let ticket = next_ticket();
                let slot = Some((target.downgrade(), ticket));
                let pending = settle_later(future, token.clone(), lifetime, slot, observers, started);
                target.insert_in_flight(token.clone(), ticket, pending.clone());
                Ok(Resolved::Pending(pending))
            }
        }
    }

    fn resolve_transient(&self, token: &Token, factory: &FactoryFn) -> DiResult<Resolved> {
        let observers = self.inner.registry.observers();
        let started = Instant::now();
        match self.call_factory(token, Lifetime::Transient, factory, &observers)? {
            Produced::Ready(value) => {
                observers.resolved(token, Lifetime::Transient, started.elapsed());
                Ok(Resolved::Ready(value))
            }
            Produced::Deferred(future) => Ok(Resolved::Pending(settle_later(
                future,
                token.clone(),
                Lifetime::Transient,
                None,
                observers,
                started,
            ))),
        }
    }

    fn call_factory(
        &self,
        token: &Token,
        lifetime: Lifetime,
        factory: &FactoryFn,
        observers: &Observers,
    ) -> DiResult<Produced> {
        let _frame = StackGuard::enter(token, &self.inner.options)?;
        observers.resolving(token, lifetime);

        factory(self).map_err(|cause| {
            let error = DiError::resolution(token.clone(), cause);
            observers.resolution_failed(token, lifetime, &error);
            error
        })
    }
}

/// Wraps a factory future so it settles its cache slot when it completes.
///
/// A panic inside the factory future settles as a `ResolutionFailure`, so
/// the entry is removed and the next `get` calls the factory again.
fn settle_later(
    future: BoxFuture<'static, Result<AnyArc, BoxError>>,
    token: Token,
    lifetime: Lifetime,
    slot: Option<(WeakScopeCache, u64)>,
    observers: Observers,
    started: Instant,
) -> Pending {
    async move {
        let outcome = AssertUnwindSafe(future)
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(panic_cause(panic.as_ref())))
            .map_err(|cause| DiError::resolution(token.clone(), cause));

        if let Some((cache, ticket)) = slot {
            let settled = cache.settle(&token, ticket, &outcome);
            tracing::trace!(token = %token, ok = outcome.is_ok(), settled, "in-flight entry settled");
        }

        if observers.has_observers() {
            match &outcome {
                Ok(_) => observers.resolved(&token, lifetime, started.elapsed()),
                Err(error) => observers.resolution_failed(&token, lifetime, error),
            }
        }
        outcome
    }
    .boxed()
    .shared()
}

fn panic_cause(panic: &(dyn Any + Send)) -> BoxError {
    let message = panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload");
    format!("factory panicked: {message}").into()
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("root", &self.is_root())
            .field("cached", &self.cache_size())
            .finish()
    }
}
