//! Service token types for the dependency resolution container.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::internal::Map;

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(1);

// Global symbol registry backing `Symbol::for_key`
fn interned() -> &'static Mutex<Map<String, Symbol>> {
    static INTERNED: OnceLock<Mutex<Map<String, Symbol>>> = OnceLock::new();
    INTERNED.get_or_init(|| Mutex::new(Map::default()))
}

/// Opaque, identity-compared service handle.
///
/// Two symbols are equal only if they come from the same `Symbol::new` call,
/// or from `Symbol::for_key` with the same key. The description is for
/// diagnostics and plays no part in equality.
///
/// # Examples
///
/// ```rust
/// use keyed_di::Symbol;
///
/// let a = Symbol::new("logger");
/// let b = Symbol::new("logger");
/// assert_ne!(a, b);
///
/// assert_eq!(Symbol::for_key("app.logger"), Symbol::for_key("app.logger"));
/// ```
#[derive(Debug, Clone)]
pub struct Symbol {
    id: u64,
    description: Arc<str>,
}

impl Symbol {
    /// Creates a fresh symbol, distinct from every other symbol.
    pub fn new(description: impl Into<Arc<str>>) -> Self {
        Self {
            id: NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed),
            description: description.into(),
        }
    }

    /// Returns the process-wide symbol interned under `key`, creating it on first use.
    pub fn for_key(key: &str) -> Self {
        let mut registry = interned().lock();
        if let Some(symbol) = registry.get(key) {
            return symbol.clone();
        }
        let symbol = Symbol::new(key);
        registry.insert(key.to_owned(), symbol.clone());
        symbol
    }

    /// The description given at creation.
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Key for service registration and lookup.
///
/// Tokens identify services in the registry. Three kinds can share one
/// registry:
///
/// - **Name**: a string, compared by value
/// - **Symbol**: an opaque handle, compared by identity
/// - **Type**: a Rust type used purely as a unique handle, compared by `TypeId`
///
/// # Examples
///
/// ```rust
/// use keyed_di::{Registry, Symbol, Token};
///
/// struct Clock;
///
/// let logger = Symbol::new("logger");
///
/// let mut registry = Registry::new();
/// registry
///     .set("port", 8080u16)?
///     .set(logger.clone(), "stderr")?
///     .set(Token::of::<Clock>(), Clock)?;
///
/// assert!(registry.contains("port"));
/// assert!(registry.contains(logger));
/// assert!(registry.contains(Token::of::<Clock>()));
/// assert!(!registry.contains(Symbol::new("logger")));
/// # Ok::<(), keyed_di::DiError>(())
/// ```
#[derive(Debug, Clone)]
pub enum Token {
    /// String key, compared by value
    Name(Arc<str>),
    /// Opaque symbol handle, compared by identity
    Symbol(Symbol),
    /// Type handle with TypeId and name for diagnostics
    Type(TypeId, &'static str),
}

impl Token {
    /// Creates a string token.
    pub fn name(name: impl Into<Arc<str>>) -> Self {
        Token::Name(name.into())
    }

    /// Creates a token keyed by the type `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Token::Type(TypeId::of::<T>(), std::any::type_name::<T>())
    }

    /// Human-readable form for diagnostics.
    pub fn display_name(&self) -> &str {
        match self {
            Token::Name(name) => name,
            Token::Symbol(symbol) => symbol.description(),
            Token::Type(_, name) => name,
        }
    }

    /// Returns the string for `Name` tokens.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Token::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Whether the token may be used for registration.
    ///
    /// Only empty names are rejected; symbols and types are always valid.
    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        match self {
            Token::Name(name) if name.is_empty() => Err("token name must not be empty"),
            _ => Ok(()),
        }
    }
}

impl PartialEq for Token {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Token::Name(a), Token::Name(b)) => a == b,
            (Token::Symbol(a), Token::Symbol(b)) => a == b,
            // Type name is diagnostic only
            (Token::Type(a, _), Token::Type(b, _)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Token {}

impl Hash for Token {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Token::Name(name) => {
                0u8.hash(state);
                name.hash(state);
            }
            Token::Symbol(symbol) => {
                1u8.hash(state);
                symbol.hash(state);
            }
            Token::Type(id, _) => {
                2u8.hash(state);
                id.hash(state);
            }
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Name(name) => f.write_str(name),
            Token::Symbol(symbol) => write!(f, "Symbol({})", symbol.description()),
            Token::Type(_, name) => f.write_str(name),
        }
    }
}

impl From<&'static str> for Token {
    fn from(name: &'static str) -> Self {
        Token::Name(Arc::from(name))
    }
}

impl From<String> for Token {
    fn from(name: String) -> Self {
        Token::Name(Arc::from(name))
    }
}

impl From<Arc<str>> for Token {
    fn from(name: Arc<str>) -> Self {
        Token::Name(name)
    }
}

impl From<Symbol> for Token {
    fn from(symbol: Symbol) -> Self {
        Token::Symbol(symbol)
    }
}

impl From<&Symbol> for Token {
    fn from(symbol: &Symbol) -> Self {
        Token::Symbol(symbol.clone())
    }
}

impl From<&Token> for Token {
    fn from(token: &Token) -> Self {
        token.clone()
    }
}
