//! Service descriptors for introspection and diagnostics.

use crate::lifetime::Lifetime;
use crate::token::Token;

/// Service descriptor for introspection and diagnostics
///
/// A snapshot of one registration: which token, under which lifetime. Values
/// and factories stay inside the registry.
///
/// # Examples
///
/// ```rust
/// use keyed_di::{Lifetime, Registry, Symbol};
///
/// let mut registry = Registry::new();
/// registry
///     .set("config", "prod")?
///     .set_lazy(Symbol::new("pool"), |_| Ok(4usize))?
///     .set_transient("id", |_| Ok(1u64))?;
///
/// let descriptors = registry.descriptors();
/// assert_eq!(descriptors.len(), 3);
///
/// let lazy = descriptors
///     .iter()
///     .filter(|d| d.lifetime == Lifetime::Lazy)
///     .count();
/// assert_eq!(lazy, 1);
///
/// let config = descriptors.iter().find(|d| d.is_named("config")).unwrap();
/// assert_eq!(config.lifetime, Lifetime::Singleton);
/// # Ok::<(), keyed_di::DiError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// The service token
    pub token: Token,
    /// Service lifetime
    pub lifetime: Lifetime,
}

impl ServiceDescriptor {
    /// Whether the token is the string `name`.
    pub fn is_named(&self, name: &str) -> bool {
        self.token.as_name() == Some(name)
    }

    /// Whether resolving this service runs a factory.
    pub fn has_factory(&self) -> bool {
        self.lifetime != Lifetime::Singleton
    }
}
