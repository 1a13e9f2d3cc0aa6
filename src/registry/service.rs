//! Type-inferred lazy registration.
//!
//! A `Service` knows how to build itself from a scope, and registers under
//! its own type token. This is sugar over `Registry::set_lazy`; resolution
//! treats it like any other lazy token.

use std::any::Any;
use std::sync::Arc;

use crate::error::{BoxError, DiResult};
use crate::registry::Registry;
use crate::scope::Scope;
use crate::token::Token;

/// A type that can construct itself from a scope.
///
/// # Examples
///
/// ```rust
/// use keyed_di::{BoxError, Registry, Scope, Service};
///
/// struct Config {
///     url: String,
/// }
///
/// struct Repository {
///     url: String,
/// }
///
/// impl Service for Repository {
///     fn create(scope: &Scope) -> Result<Self, BoxError> {
///         let config = scope.get("config")?.ok_or("config missing")?;
///         let config = config.ready_as::<Config>().ok_or("config has the wrong type")?;
///         Ok(Repository { url: config.url.clone() })
///     }
/// }
///
/// # async fn example() -> Result<(), keyed_di::DiError> {
/// let mut registry = Registry::new();
/// registry
///     .set("config", Config { url: "postgres://localhost".into() })?
///     .add_service::<Repository>()?;
///
/// let scope = registry.build();
/// let repo = scope.resolve_service::<Repository>().await?;
/// assert_eq!(repo.url, "postgres://localhost");
/// # Ok(())
/// # }
/// ```
pub trait Service: Any + Send + Sync + Sized {
    /// Builds the service; called at most once per root scope.
    fn create(scope: &Scope) -> Result<Self, BoxError>;
}

impl Registry {
    /// Registers `T` as a lazy service under `Token::of::<T>()`.
    pub fn add_service<T: Service>(&mut self) -> DiResult<&mut Self> {
        self.set_lazy(Token::of::<T>(), T::create)
    }
}

impl Scope {
    /// Resolves a service registered with [`Registry::add_service`].
    pub async fn resolve_service<T: Service>(&self) -> DiResult<Arc<T>> {
        self.resolve::<T>(Token::of::<T>()).await
    }
}
