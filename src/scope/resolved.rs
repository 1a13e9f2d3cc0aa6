//! Values handed out by scope resolution.

use std::any::Any;
use std::fmt;
use std::future::IntoFuture;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::error::{DiError, DiResult};
use crate::registration::AnyArc;

/// A shared, cloneable future for a value whose factory is still running.
///
/// Every clone observes the same outcome; the underlying factory future is
/// driven once, by whichever holder polls first.
pub type Pending = Shared<BoxFuture<'static, DiResult<AnyArc>>>;

/// Result of resolving a registered token.
///
/// `Ready` carries the value itself. `Pending` carries the in-flight future of
/// an asynchronous factory; await it (or the `Resolved` itself) to get the
/// value. Failures of the future arrive as `DiError::ResolutionFailure`.
///
/// # Examples
///
/// ```rust
/// use keyed_di::Registry;
///
/// # async fn example() -> Result<(), keyed_di::DiError> {
/// let mut registry = Registry::new();
/// registry
///     .set("name", "keyed")?
///     .set_lazy_async("answer", |_| async { Ok(42u32) })?;
///
/// let scope = registry.build();
///
/// let name = scope.get("name")?.unwrap();
/// assert!(!name.is_pending());
/// assert_eq!(*name.ready_as::<&str>().unwrap(), "keyed");
///
/// let answer = scope.get("answer")?.unwrap();
/// assert!(answer.is_pending());
/// assert_eq!(*answer.downcast::<u32>().await?, 42);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub enum Resolved {
    /// A value available now
    Ready(AnyArc),
    /// A value whose factory future has not been observed to settle
    Pending(Pending),
}

impl Resolved {
    /// Whether this is an in-flight future.
    pub fn is_pending(&self) -> bool {
        matches!(self, Resolved::Pending(_))
    }

    /// The value, if it is available without awaiting.
    ///
    /// A `Pending` whose future already succeeded also counts as available.
    pub fn ready(&self) -> Option<AnyArc> {
        match self {
            Resolved::Ready(value) => Some(value.clone()),
            Resolved::Pending(pending) => match pending.peek() {
                Some(Ok(value)) => Some(value.clone()),
                _ => None,
            },
        }
    }

    /// The value downcast to `T`, if available without awaiting and of that type.
    pub fn ready_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.ready().and_then(|value| value.downcast::<T>().ok())
    }

    /// Awaits the value.
    pub async fn value(self) -> DiResult<AnyArc> {
        match self {
            Resolved::Ready(value) => Ok(value),
            Resolved::Pending(pending) => pending.await,
        }
    }

    /// Awaits the value and downcasts it to `T`.
    pub async fn downcast<T: Any + Send + Sync>(self) -> DiResult<Arc<T>> {
        self.value()
            .await?
            .downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// Whether both refer to the same value or the same in-flight future.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Resolved::Ready(a), Resolved::Ready(b)) => Arc::ptr_eq(a, b),
            (Resolved::Pending(a), Resolved::Pending(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl IntoFuture for Resolved {
    type Output = DiResult<AnyArc>;
    type IntoFuture = BoxFuture<'static, DiResult<AnyArc>>;

    fn into_future(self) -> Self::IntoFuture {
        self.value().boxed()
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Ready(_) => f.write_str("Resolved::Ready(..)"),
            Resolved::Pending(_) => f.write_str("Resolved::Pending(..)"),
        }
    }
}
