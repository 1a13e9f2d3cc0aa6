//! Service lifetime definitions.

use std::fmt;

/// Service lifetimes controlling caching behavior
///
/// Fixed per token at registration time.
///
/// # Lifetime Characteristics
///
/// - **Singleton**: a ready value handed back as-is, nothing is ever invoked
/// - **Lazy**: factory runs once per root scope, shared by every descendant
/// - **Scoped**: factory runs once per scope instance
/// - **Transient**: factory runs on every resolution, never cached
///
/// # Examples
///
/// ```rust
/// use keyed_di::{Lifetime, Registry};
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
///
/// let calls = Arc::new(AtomicU32::new(0));
/// let counter = calls.clone();
///
/// let mut registry = Registry::new();
/// registry
///     .set("url", "postgres://localhost")?
///     .set_scoped("request", move |_| Ok(counter.fetch_add(1, Ordering::SeqCst)))?;
///
/// assert_eq!(registry.lifetime_of("url"), Some(Lifetime::Singleton));
/// assert_eq!(registry.lifetime_of("request"), Some(Lifetime::Scoped));
///
/// let root = registry.build();
/// let a = root.create_scope();
/// let b = root.create_scope();
/// a.get("request")?;
/// a.get("request")?;
/// b.get("request")?;
/// assert_eq!(calls.load(Ordering::SeqCst), 2);
/// # Ok::<(), keyed_di::DiError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Registered value, returned unevaluated
    Singleton,
    /// Single instance per root scope, cached in the root
    ///
    /// Every scope in the tree, however deep, reads and writes the root's
    /// cache for lazy tokens. The factory still receives the requesting scope.
    Lazy,
    /// Single instance per scope, cached for the scope's lifetime
    Scoped,
    /// New instance per resolution, never cached
    Transient,
}

impl Lifetime {
    /// Whether resolutions of this lifetime go through a scope cache.
    pub fn is_cached(self) -> bool {
        matches!(self, Lifetime::Lazy | Lifetime::Scoped)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Lazy => "lazy",
            Lifetime::Scoped => "scoped",
            Lifetime::Transient => "transient",
        };
        f.write_str(name)
    }
}
