//! Error types for the dependency resolution container.

use std::error::Error as StdError;
use std::sync::Arc;

use crate::token::Token;

/// Boxed error returned by user factories.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Dependency resolution errors
///
/// Registration errors (`InvalidToken`, `InvalidFactory`) are raised
/// synchronously by the registration call and leave the registry untouched.
/// Factory errors are never swallowed: they come back as `ResolutionFailure`
/// carrying the failing token and the original error as its source.
///
/// # Examples
///
/// ```rust
/// use keyed_di::{DiError, Registry};
/// use std::error::Error;
///
/// let mut registry = Registry::new();
/// assert!(matches!(registry.set("", 1u8), Err(DiError::InvalidToken(_))));
///
/// registry.set_transient("flaky", |_| -> Result<u8, _> { Err("backend down".into()) })?;
/// let scope = registry.build();
///
/// match scope.get("flaky") {
///     Err(DiError::ResolutionFailure { token, cause }) => {
///         assert_eq!(token.to_string(), "flaky");
///         assert_eq!(cause.to_string(), "backend down");
///     }
///     _ => unreachable!(),
/// }
///
/// let err = scope.get("flaky").unwrap_err();
/// assert_eq!(err.to_string(), "Failed to resolve flaky: backend down");
/// assert!(err.source().is_some());
/// # Ok::<(), DiError>(())
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum DiError {
    /// Registration with an unusable token
    #[error("Invalid token: {0}")]
    InvalidToken(&'static str),
    /// Registration source does not match the lifetime
    #[error("Invalid factory for {token}: {reason}")]
    InvalidFactory {
        /// Token being registered
        token: Token,
        /// What was wrong with the source
        reason: &'static str,
    },
    /// A factory failed, synchronously or through its future
    #[error("Failed to resolve {token}: {cause}")]
    ResolutionFailure {
        /// Token whose factory failed
        token: Token,
        /// The factory's own error
        #[source]
        cause: Arc<dyn StdError + Send + Sync>,
    },
    /// Service not registered
    #[error("Service not found: {0}")]
    NotFound(Token),
    /// Type downcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),
    /// A value was read synchronously while its factory is still in flight
    #[error("Service not ready: {0}")]
    NotReady(Token),
    /// Circular dependency detected (includes path)
    #[error("Circular dependency: {}", join_path(.0))]
    Circular(Vec<Token>),
    /// Maximum recursion depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// Argument index past the end of a dependency manifest
    #[error("Argument index {index} out of range for {len} dependencies")]
    ArgumentOutOfRange {
        /// Requested position
        index: usize,
        /// Manifest length
        len: usize,
    },
}

fn join_path(path: &[Token]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl DiError {
    pub(crate) fn resolution(token: Token, cause: BoxError) -> Self {
        DiError::ResolutionFailure {
            token,
            cause: Arc::from(cause),
        }
    }

    /// Token the error is about, if any.
    pub fn token(&self) -> Option<&Token> {
        match self {
            DiError::InvalidFactory { token, .. }
            | DiError::ResolutionFailure { token, .. }
            | DiError::NotFound(token)
            | DiError::NotReady(token) => Some(token),
            DiError::Circular(path) => path.last(),
            DiError::InvalidToken(_)
            | DiError::TypeMismatch(_)
            | DiError::DepthExceeded(_)
            | DiError::ArgumentOutOfRange { .. } => None,
        }
    }

    /// Walks nested `ResolutionFailure` causes down to the innermost error.
    ///
    /// Factories that resolve other tokens wrap their dependencies' failures,
    /// so a failure three levels deep surfaces as three nested
    /// `ResolutionFailure`s. This returns the error at the bottom of that
    /// chain, which may be another `DiError` such as `Circular`.
    pub fn root_cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        let mut current: &(dyn StdError + Send + Sync + 'static) = self;
        while let Some(DiError::ResolutionFailure { cause, .. }) = current.downcast_ref::<DiError>() {
            current = cause.as_ref();
        }
        current
    }
}

/// Result type for DI operations
pub type DiResult<T> = Result<T, DiError>;
