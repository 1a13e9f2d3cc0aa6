//! Async factory support.
//!
//! This module provides a trait for services that need asynchronous
//! initialization, such as database connections, network handshakes or
//! credential fetches, and that carry configuration of their own.

use async_trait::async_trait;

use crate::error::BoxError;
use crate::scope::Scope;

/// Trait for factories that create services asynchronously.
///
/// Register one with [`Registry::set_lazy_factory`](crate::Registry::set_lazy_factory).
/// The scope is the one that requested the service and can be used to
/// resolve its dependencies.
///
/// # Examples
///
/// ```
/// use keyed_di::{AsyncFactory, BoxError, Registry, Scope};
/// use async_trait::async_trait;
///
/// struct DatabasePool {
///     connection_string: String,
/// }
///
/// struct PoolFactory {
///     connection_string: String,
/// }
///
/// #[async_trait]
/// impl AsyncFactory<DatabasePool> for PoolFactory {
///     async fn create(&self, _scope: &Scope) -> Result<DatabasePool, BoxError> {
///         Ok(DatabasePool {
///             connection_string: self.connection_string.clone(),
///         })
///     }
/// }
///
/// # async fn example() -> Result<(), keyed_di::DiError> {
/// let mut registry = Registry::new();
/// registry.set_lazy_factory::<DatabasePool, _>(
///     "pool",
///     PoolFactory { connection_string: "postgres://localhost".into() },
/// )?;
///
/// let scope = registry.build();
/// let pool = scope.resolve::<DatabasePool>("pool").await?;
/// assert_eq!(pool.connection_string, "postgres://localhost");
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait AsyncFactory<T: Send + Sync + 'static>: Send + Sync {
    /// Creates a new instance of the service asynchronously.
    async fn create(&self, scope: &Scope) -> Result<T, BoxError>;
}

#[async_trait]
impl<T, F, Fut> AsyncFactory<T> for F
where
    T: Send + Sync + 'static,
    F: Fn(&Scope) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<T, BoxError>> + Send + 'static,
{
    async fn create(&self, scope: &Scope) -> Result<T, BoxError> {
        self(scope).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DiError, Registry};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct Handshake {
        peer: String,
    }

    struct HandshakeFactory {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl AsyncFactory<Handshake> for HandshakeFactory {
        async fn create(&self, scope: &Scope) -> Result<Handshake, BoxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            let peer = scope.resolve::<String>("peer").await?;
            Ok(Handshake { peer: (*peer).clone() })
        }
    }

    #[tokio::test]
    async fn struct_factory_runs_once_per_root() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut registry = Registry::new();
        registry
            .set("peer", String::from("10.0.0.1"))
            .unwrap()
            .set_lazy_factory::<Handshake, _>("handshake", HandshakeFactory { calls: calls.clone() })
            .unwrap();

        let root = registry.build();
        let child = root.create_scope();
        let (a, b) = tokio::join!(
            root.resolve::<Handshake>("handshake"),
            child.resolve::<Handshake>("handshake"),
        );

        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.peer, "10.0.0.1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_factory_surfaces_resolution_failure() {
        struct Refused;

        #[async_trait]
        impl AsyncFactory<u32> for Refused {
            async fn create(&self, _scope: &Scope) -> Result<u32, BoxError> {
                Err("connection refused".into())
            }
        }

        let mut registry = Registry::new();
        registry.set_lazy_factory::<u32, _>("conn", Refused).unwrap();
        let scope = registry.build();

        let err = scope.resolve::<u32>("conn").await.unwrap_err();
        assert!(matches!(err, DiError::ResolutionFailure { .. }));
        assert!(err.to_string().contains("connection refused"));
        assert!(!scope.is_cached("conn"));
    }

    #[tokio::test]
    async fn closures_implement_async_factory() {
        fn check<F: AsyncFactory<u8>>(_: &F) {}

        let factory = |_: &Scope| async { Ok::<u8, BoxError>(9) };
        check(&factory);

        let mut registry = Registry::new();
        registry.set_lazy_factory::<u8, _>("nine", factory).unwrap();
        let nine = registry.build().resolve::<u8>("nine").await.unwrap();
        assert_eq!(*nine, 9);
    }
}
