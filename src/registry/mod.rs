//! Service registry module for dependency resolution.
//!
//! This module contains the `Registry` type used to register services under
//! tokens and to build root scopes from them.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::async_factories::AsyncFactory;
use crate::descriptors::ServiceDescriptor;
use crate::error::{BoxError, DiError, DiResult};
use crate::internal::Map;
use crate::lifetime::Lifetime;
use crate::observer::{DiObserver, Observers};
use crate::options::ContainerOptions;
use crate::registration::{Registration, Source};
use crate::scope::Scope;
use crate::token::Token;

pub mod service;
pub use service::Service;

/// Registry of service descriptors keyed by token.
///
/// The registry is pure configuration: it maps each token to a lifetime and a
/// value or factory, and builds root scopes that do the resolving. It is a
/// shared handle; clones, and every scope built from it, see the same
/// registrations, including ones added after `build()`.
///
/// Registering a token again replaces its descriptor.
///
/// # Examples
///
/// ```rust
/// use keyed_di::Registry;
///
/// struct Config {
///     port: u16,
/// }
///
/// let mut registry = Registry::new();
/// registry
///     .set("cfg", Config { port: 8080 })?
///     .set_lazy("greeting", |_| Ok(String::from("hello")))?;
///
/// let scope = registry.build();
/// let cfg = scope.get("cfg")?.unwrap();
/// assert_eq!(cfg.ready_as::<Config>().unwrap().port, 8080);
/// # Ok::<(), keyed_di::DiError>(())
/// ```
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<RegistryState>>,
}

#[derive(Default)]
struct RegistryState {
    services: Map<Token, Registration>,
    observers: Observers,
    options: ContainerOptions,
}

impl Registry {
    /// Creates a new empty registry with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty registry with the given options.
    pub fn with_options(options: ContainerOptions) -> Self {
        Self {
            inner: Arc::new(RwLock::new(RegistryState {
                options,
                ..RegistryState::default()
            })),
        }
    }

    /// Options scopes built from this registry resolve with.
    pub fn options(&self) -> ContainerOptions {
        self.inner.read().options.clone()
    }

    // ----- Registrations -----

    /// Registers a singleton value.
    ///
    /// The value is handed back as-is on every resolution; the registry never
    /// evaluates it, even when it is itself a future.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use keyed_di::Registry;
    /// let mut registry = Registry::new();
    /// registry.set("retries", 3u32)?;
    ///
    /// let scope = registry.build();
    /// let a = scope.get("retries")?.unwrap();
    /// let b = scope.get("retries")?.unwrap();
    /// assert!(a.ptr_eq(&b));
    /// # Ok::<(), keyed_di::DiError>(())
    /// ```
    pub fn set<T>(&mut self, token: impl Into<Token>, value: T) -> DiResult<&mut Self>
    where
        T: Any + Send + Sync,
    {
        self.register(token, Lifetime::Singleton, Source::value(value))
    }

    /// Registers a lazy factory: run at most once per root scope.
    ///
    /// Every scope under the root, however deep, shares the root's instance.
    /// The factory receives the scope that made the request.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use keyed_di::Registry;
    /// let mut registry = Registry::new();
    /// registry.set_lazy("pool", |_| Ok(vec![1, 2, 3]))?;
    ///
    /// let root = registry.build();
    /// let child = root.create_scope().create_scope();
    /// let from_child = child.get("pool")?.unwrap();
    /// let from_root = root.get("pool")?.unwrap();
    /// assert!(from_child.ptr_eq(&from_root));
    /// # Ok::<(), keyed_di::DiError>(())
    /// ```
    pub fn set_lazy<T, F>(&mut self, token: impl Into<Token>, factory: F) -> DiResult<&mut Self>
    where
        T: Any + Send + Sync,
        F: Fn(&Scope) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.register(token, Lifetime::Lazy, Source::factory(factory))
    }

    /// Registers a lazy factory returning a future.
    ///
    /// Concurrent requests made before the future settles all share that one
    /// future; the factory is not called again unless it fails.
    pub fn set_lazy_async<T, F, Fut>(&mut self, token: impl Into<Token>, factory: F) -> DiResult<&mut Self>
    where
        T: Any + Send + Sync,
        F: Fn(&Scope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        self.register(token, Lifetime::Lazy, Source::async_factory(factory))
    }

    /// Registers a lazy [`AsyncFactory`] implementation.
    pub fn set_lazy_factory<T, F>(&mut self, token: impl Into<Token>, factory: F) -> DiResult<&mut Self>
    where
        T: Any + Send + Sync,
        F: AsyncFactory<T> + 'static,
    {
        self.register(token, Lifetime::Lazy, Source::from_async_factory(factory))
    }

    /// Registers a scoped factory: run at most once per scope instance.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use keyed_di::Registry;
    /// let mut registry = Registry::new();
    /// registry.set_scoped("request", |_| Ok(String::from("ctx")))?;
    ///
    /// let root = registry.build();
    /// let a = root.create_scope();
    /// let b = root.create_scope();
    /// let a1 = a.get("request")?.unwrap();
    /// let a2 = a.get("request")?.unwrap();
    /// let b1 = b.get("request")?.unwrap();
    /// assert!(a1.ptr_eq(&a2));
    /// assert!(!a1.ptr_eq(&b1));
    /// # Ok::<(), keyed_di::DiError>(())
    /// ```
    pub fn set_scoped<T, F>(&mut self, token: impl Into<Token>, factory: F) -> DiResult<&mut Self>
    where
        T: Any + Send + Sync,
        F: Fn(&Scope) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.register(token, Lifetime::Scoped, Source::factory(factory))
    }

    /// Registers a scoped factory returning a future.
    pub fn set_scoped_async<T, F, Fut>(&mut self, token: impl Into<Token>, factory: F) -> DiResult<&mut Self>
    where
        T: Any + Send + Sync,
        F: Fn(&Scope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        self.register(token, Lifetime::Scoped, Source::async_factory(factory))
    }

    /// Registers a transient factory: run on every resolution, never cached.
    pub fn set_transient<T, F>(&mut self, token: impl Into<Token>, factory: F) -> DiResult<&mut Self>
    where
        T: Any + Send + Sync,
        F: Fn(&Scope) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.register(token, Lifetime::Transient, Source::factory(factory))
    }

    /// Registers a transient factory returning a future.
    pub fn set_transient_async<T, F, Fut>(&mut self, token: impl Into<Token>, factory: F) -> DiResult<&mut Self>
    where
        T: Any + Send + Sync,
        F: Fn(&Scope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        self.register(token, Lifetime::Transient, Source::async_factory(factory))
    }

    /// Registers `source` under `token` with the given lifetime.
    ///
    /// All `set*` methods reduce to this call. Validation happens before the
    /// registry is touched, so a failed registration leaves no trace.
    ///
    /// # Errors
    ///
    /// - `InvalidToken` for an empty name token
    /// - `InvalidFactory` when a factory lifetime gets a `Source::Value`, or a
    ///   singleton gets a `Source::Factory`
    pub fn register(
        &mut self,
        token: impl Into<Token>,
        lifetime: Lifetime,
        source: Source,
    ) -> DiResult<&mut Self> {
        let token = token.into();
        token.validate().map_err(DiError::InvalidToken)?;
        let registration = Registration::new(lifetime, source)
            .map_err(|reason| DiError::InvalidFactory { token: token.clone(), reason })?;

        let previous = self.inner.write().services.insert(token.clone(), registration);
        if let Some(previous) = previous {
            tracing::debug!(
                token = %token,
                from = %previous.lifetime(),
                to = %lifetime,
                "replaced existing registration"
            );
        }
        Ok(self)
    }

    /// Adds an observer notified of every factory call made by scopes of this registry.
    pub fn add_observer(&mut self, observer: Arc<dyn DiObserver>) -> &mut Self {
        self.inner.write().observers.add(observer);
        self
    }

    // ----- Introspection -----

    /// Whether `token` is registered.
    pub fn contains(&self, token: impl Into<Token>) -> bool {
        self.inner.read().services.contains_key(&token.into())
    }

    /// Lifetime registered for `token`.
    pub fn lifetime_of(&self, token: impl Into<Token>) -> Option<Lifetime> {
        self.inner
            .read()
            .services
            .get(&token.into())
            .map(Registration::lifetime)
    }

    /// Number of registered tokens.
    pub fn len(&self) -> usize {
        self.inner.read().services.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.read().services.is_empty()
    }

    /// Snapshot of all registrations, in no particular order.
    pub fn descriptors(&self) -> Vec<ServiceDescriptor> {
        self.inner
            .read()
            .services
            .iter()
            .map(|(token, registration)| ServiceDescriptor {
                token: token.clone(),
                lifetime: registration.lifetime(),
            })
            .collect()
    }

    /// Builds a new root scope.
    ///
    /// Each call yields an independent root with its own cache; all of them
    /// share this registry.
    pub fn build(&self) -> Scope {
        Scope::new_root(self.clone())
    }

    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        let state = self.inner.read();
        let mut lines: Vec<String> = state
            .services
            .iter()
            .map(|(token, registration)| format!("  {}: {}", token, registration.lifetime()))
            .collect();
        lines.sort();

        let mut s = String::from("=== Registry Debug ===\n");
        for line in lines {
            s.push_str(&line);
            s.push('\n');
        }
        s.push_str(&format!("Observers: {}\n", state.observers.len()));
        s
    }

    // ----- Scope support -----

    pub(crate) fn lookup(&self, token: &Token) -> Option<Registration> {
        self.inner.read().services.get(token).cloned()
    }

    pub(crate) fn observers(&self) -> Observers {
        self.inner.read().observers.clone()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.read();
        f.debug_struct("Registry")
            .field("services", &state.services.len())
            .field("observers", &state.observers.len())
            .field("options", &state.options)
            .finish()
    }
}
