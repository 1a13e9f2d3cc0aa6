//! Diagnostic observers for resolution traceability.
//!
//! Observers receive an event whenever a scope runs a factory: before the
//! call, when the value is available, and when the factory fails. Cache hits
//! and singleton lookups run no factory and produce no events.

use std::sync::Arc;
use std::time::Duration;

use crate::error::DiError;
use crate::lifetime::Lifetime;
use crate::token::Token;

/// Observer trait for factory execution events.
///
/// For deferred (async) factories, `resolving` fires when the factory is
/// called and `resolved` or `resolution_failed` fires when its future
/// settles, so the reported duration covers the whole construction.
///
/// # Performance
///
/// Observer calls are made synchronously during resolution, and for lazy
/// and scoped tokens while the resolution gate is held. Keep implementations
/// lightweight.
///
/// # Examples
///
/// ```
/// use keyed_di::{DiObserver, Lifetime, Registry, Token};
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Recorder {
///     seen: Mutex<Vec<String>>,
/// }
///
/// impl DiObserver for Recorder {
///     fn resolving(&self, token: &Token, lifetime: Lifetime) {
///         self.seen.lock().unwrap().push(format!("{lifetime} {token}"));
///     }
///
///     fn resolved(&self, _token: &Token, _lifetime: Lifetime, _duration: Duration) {}
/// }
///
/// let recorder = Arc::new(Recorder::default());
///
/// let mut registry = Registry::new();
/// registry
///     .add_observer(recorder.clone())
///     .set_lazy("db", |_| Ok("connection"))?;
///
/// let scope = registry.build();
/// scope.get("db")?;
/// scope.get("db")?;
///
/// assert_eq!(*recorder.seen.lock().unwrap(), ["lazy db"]);
/// # Ok::<(), keyed_di::DiError>(())
/// ```
pub trait DiObserver: Send + Sync {
    /// Called right before a factory is invoked.
    fn resolving(&self, token: &Token, lifetime: Lifetime);

    /// Called when a factory's value is available.
    ///
    /// `duration` runs from the factory call to the ready value, including
    /// the time its future spent in flight.
    fn resolved(&self, token: &Token, lifetime: Lifetime, duration: Duration);

    /// Called when a factory fails, synchronously or through its future.
    ///
    /// The error is still returned to the caller afterwards.
    fn resolution_failed(&self, token: &Token, lifetime: Lifetime, error: &DiError) {
        let _ = (token, lifetime, error);
    }
}

/// Container for registered observers.
///
/// Cloning is cheap; scopes take a snapshot per factory call.
#[derive(Clone, Default)]
pub(crate) struct Observers {
    observers: Arc<Vec<Arc<dyn DiObserver>>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn DiObserver>) {
        Arc::make_mut(&mut self.observers).push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    #[inline]
    pub(crate) fn resolving(&self, token: &Token, lifetime: Lifetime) {
        for observer in self.observers.iter() {
            observer.resolving(token, lifetime);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, token: &Token, lifetime: Lifetime, duration: Duration) {
        for observer in self.observers.iter() {
            observer.resolved(token, lifetime, duration);
        }
    }

    #[inline]
    pub(crate) fn resolution_failed(&self, token: &Token, lifetime: Lifetime, error: &DiError) {
        for observer in self.observers.iter() {
            observer.resolution_failed(token, lifetime, error);
        }
    }
}

/// Built-in observer that forwards events to `tracing`.
///
/// Resolutions are logged at `debug`, failures at `warn`, all under the
/// `keyed_di` target unless a custom one is given.
///
/// # Examples
///
/// ```
/// use keyed_di::{LoggingObserver, Registry};
/// use std::sync::Arc;
///
/// let mut registry = Registry::new();
/// registry.add_observer(Arc::new(LoggingObserver::new()));
/// ```
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    /// Creates a new logging observer with the default prefix.
    pub fn new() -> Self {
        Self {
            prefix: "keyed-di".to_string(),
        }
    }

    /// Creates a logging observer whose events carry a custom prefix field.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl DiObserver for LoggingObserver {
    fn resolving(&self, token: &Token, lifetime: Lifetime) {
        tracing::debug!(prefix = %self.prefix, token = %token, %lifetime, "resolving");
    }

    fn resolved(&self, token: &Token, lifetime: Lifetime, duration: Duration) {
        tracing::debug!(
            prefix = %self.prefix,
            token = %token,
            %lifetime,
            elapsed_us = saturating_micros(duration),
            "resolved"
        );
    }

    fn resolution_failed(&self, token: &Token, lifetime: Lifetime, error: &DiError) {
        tracing::warn!(prefix = %self.prefix, token = %token, %lifetime, error = %error, "resolution failed");
    }
}

// Saturates instead of truncating for durations past u64 microseconds
fn saturating_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}
