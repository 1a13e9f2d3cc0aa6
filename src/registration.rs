//! Service registration types.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::async_factories::AsyncFactory;
use crate::error::BoxError;
use crate::lifetime::Lifetime;
use crate::scope::Scope;

/// Type-erased Arc for storage
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Type-erased factory: receives the requesting scope.
pub type FactoryFn = Arc<dyn Fn(&Scope) -> Result<Produced, BoxError> + Send + Sync>;

/// What a factory call produced.
pub enum Produced {
    /// The value itself
    Ready(AnyArc),
    /// A future that settles to the value
    Deferred(BoxFuture<'static, Result<AnyArc, BoxError>>),
}

impl Produced {
    /// Wraps a ready value.
    pub fn ready<T: Any + Send + Sync>(value: T) -> Self {
        Produced::Ready(Arc::new(value))
    }

    /// Wraps a future producing the value.
    pub fn deferred<T, Fut>(future: Fut) -> Self
    where
        T: Any + Send + Sync,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        Produced::Deferred(future.map(|result| result.map(|value| Arc::new(value) as AnyArc)).boxed())
    }
}

impl fmt::Debug for Produced {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Produced::Ready(_) => f.write_str("Produced::Ready(..)"),
            Produced::Deferred(_) => f.write_str("Produced::Deferred(..)"),
        }
    }
}

/// Value or factory handed to `Registry::register`.
///
/// Singletons take a `Value`; lazy, scoped and transient lifetimes take a
/// `Factory`. Mismatches are rejected at registration time.
///
/// # Examples
///
/// ```rust
/// use keyed_di::{DiError, Lifetime, Registry, Source};
///
/// let mut registry = Registry::new();
/// registry
///     .register("port", Lifetime::Singleton, Source::value(8080u16))?
///     .register("id", Lifetime::Transient, Source::factory(|_| Ok(7u64)))?;
///
/// let err = registry
///     .register("db", Lifetime::Lazy, Source::value("not a factory"))
///     .unwrap_err();
/// assert!(matches!(err, DiError::InvalidFactory { .. }));
/// # Ok::<(), DiError>(())
/// ```
#[derive(Clone)]
pub enum Source {
    /// A concrete, already constructed value
    Value(AnyArc),
    /// A factory invoked per the lifetime's caching rules
    Factory(FactoryFn),
}

impl Source {
    /// Wraps a concrete value.
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Source::Value(Arc::new(value))
    }

    /// Wraps a synchronous factory.
    pub fn factory<T, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Scope) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Source::Factory(Arc::new(move |scope: &Scope| factory(scope).map(Produced::ready)))
    }

    /// Wraps a factory returning a future.
    ///
    /// The future must own what it needs; clone the scope into it to resolve
    /// further tokens after an await point. A cached future holding its own
    /// scope keeps that scope alive until it completes or is cleared with
    /// [`Scope::clear_cache`].
    pub fn async_factory<T, F, Fut>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Scope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        Source::Factory(Arc::new(move |scope: &Scope| Ok(Produced::deferred(factory(scope)))))
    }

    /// Wraps an [`AsyncFactory`] implementation.
    pub fn from_async_factory<T, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: AsyncFactory<T> + 'static,
    {
        let factory = Arc::new(factory);
        Source::Factory(Arc::new(move |scope: &Scope| {
            let factory = Arc::clone(&factory);
            let scope = scope.clone();
            Ok(Produced::deferred(async move { factory.create(&scope).await }))
        }))
    }

    /// Wraps an already type-erased factory.
    pub fn raw(factory: impl Fn(&Scope) -> Result<Produced, BoxError> + Send + Sync + 'static) -> Self {
        Source::Factory(Arc::new(factory))
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Value(_) => f.write_str("Source::Value(..)"),
            Source::Factory(_) => f.write_str("Source::Factory(..)"),
        }
    }
}

/// Validated registration stored in the registry
#[derive(Clone)]
pub(crate) enum Registration {
    Singleton(AnyArc),
    Lazy(FactoryFn),
    Scoped(FactoryFn),
    Transient(FactoryFn),
}

impl Registration {
    /// Pairs a lifetime with a source, rejecting mismatches.
    pub(crate) fn new(lifetime: Lifetime, source: Source) -> Result<Self, &'static str> {
        match (lifetime, source) {
            (Lifetime::Singleton, Source::Value(value)) => Ok(Registration::Singleton(value)),
            (Lifetime::Singleton, Source::Factory(_)) => {
                Err("singleton registrations take a value, not a factory")
            }
            (Lifetime::Lazy, Source::Factory(f)) => Ok(Registration::Lazy(f)),
            (Lifetime::Scoped, Source::Factory(f)) => Ok(Registration::Scoped(f)),
            (Lifetime::Transient, Source::Factory(f)) => Ok(Registration::Transient(f)),
            (_, Source::Value(_)) => Err("source is not callable"),
        }
    }

    pub(crate) fn lifetime(&self) -> Lifetime {
        match self {
            Registration::Singleton(_) => Lifetime::Singleton,
            Registration::Lazy(_) => Lifetime::Lazy,
            Registration::Scoped(_) => Lifetime::Scoped,
            Registration::Transient(_) => Lifetime::Transient,
        }
    }
}
