//! Argument binding for callables with declared dependencies.
//!
//! A callable declares the tokens it needs, in order, as an explicit
//! manifest. The invoker resolves the manifest through a scope and hands the
//! results to the callable in the same order. Whatever the callable returns
//! (a value, a future, a stream) is passed through untouched.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::scope::{Resolved, Scope};
use crate::token::Token;

/// A callable with an ordered dependency manifest.
pub trait Injectable {
    /// What the callable returns.
    type Output;

    /// Tokens to resolve, in argument order.
    fn dependencies(&self) -> &[Token];

    /// Calls with resolved arguments, in manifest order.
    fn call(&self, args: Arguments) -> Self::Output;
}

/// Resolved arguments, positionally matching a dependency manifest.
///
/// Entries for unregistered tokens are `None`. Entries may be pending if
/// their factory is asynchronous.
pub struct Arguments {
    tokens: Vec<Token>,
    values: Vec<Option<Resolved>>,
}

impl Arguments {
    pub(crate) fn new(tokens: Vec<Token>, values: Vec<Option<Resolved>>) -> Self {
        debug_assert_eq!(tokens.len(), values.len());
        Self { tokens, values }
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the manifest was empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The manifest these arguments were resolved from.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Argument at `index`; `None` if its token is unregistered or the index
    /// is out of range.
    pub fn get(&self, index: usize) -> Option<&Resolved> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// Takes the argument at `index`, leaving `None` in its place.
    pub fn take(&mut self, index: usize) -> Option<Resolved> {
        self.values.get_mut(index).and_then(Option::take)
    }

    /// Argument at `index` as a `T`, without awaiting.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unregistered token, `NotReady` when its factory
    /// future has not completed, `TypeMismatch` for a wrong type, and
    /// `ArgumentOutOfRange` past the end of the manifest.
    pub fn ready<T: Any + Send + Sync>(&self, index: usize) -> DiResult<Arc<T>> {
        let (token, slot) = self.slot(index)?;
        let resolved = slot.as_ref().ok_or_else(|| DiError::NotFound(token.clone()))?;
        let value = resolved
            .ready()
            .ok_or_else(|| DiError::NotReady(token.clone()))?;
        value
            .downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// Argument at `index` as a `T`, awaiting it if in flight.
    pub async fn value<T: Any + Send + Sync>(&self, index: usize) -> DiResult<Arc<T>> {
        let (token, slot) = self.slot(index)?;
        match slot.clone() {
            Some(resolved) => resolved.downcast::<T>().await,
            None => Err(DiError::NotFound(token.clone())),
        }
    }

    fn slot(&self, index: usize) -> DiResult<(&Token, &Option<Resolved>)> {
        self.tokens
            .get(index)
            .zip(self.values.get(index))
            .ok_or(DiError::ArgumentOutOfRange {
                index,
                len: self.values.len(),
            })
    }

    /// The raw results, in manifest order.
    pub fn into_vec(self) -> Vec<Option<Resolved>> {
        self.values
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.tokens.iter().map(ToString::to_string).zip(self.values.iter()))
            .finish()
    }
}

/// A closure paired with its dependency manifest.
///
/// Built by [`inject`].
pub struct Injected<F> {
    dependencies: Vec<Token>,
    body: F,
}

/// Pairs `body` with the tokens it depends on.
///
/// # Examples
///
/// ```
/// use keyed_di::{inject, Registry};
///
/// struct Config {
///     port: u16,
/// }
///
/// let mut registry = Registry::new();
/// registry
///     .set("cfg", Config { port: 8080 })?
///     .set("host", String::from("localhost"))?;
///
/// let address = inject(["host", "cfg"], |args| -> keyed_di::DiResult<String> {
///     let host = args.ready::<String>(0)?;
///     let cfg = args.ready::<Config>(1)?;
///     Ok(format!("{}:{}", host, cfg.port))
/// });
///
/// let scope = registry.build();
/// assert_eq!(scope.invoke(&address)??, "localhost:8080");
/// # Ok::<(), keyed_di::DiError>(())
/// ```
pub fn inject<D, T, F, R>(dependencies: D, body: F) -> Injected<F>
where
    D: IntoIterator<Item = T>,
    T: Into<Token>,
    F: Fn(Arguments) -> R,
{
    Injected {
        dependencies: dependencies.into_iter().map(Into::into).collect(),
        body,
    }
}

impl<F, R> Injectable for Injected<F>
where
    F: Fn(Arguments) -> R,
{
    type Output = R;

    fn dependencies(&self) -> &[Token] {
        &self.dependencies
    }

    fn call(&self, args: Arguments) -> R {
        (self.body)(args)
    }
}

impl<F> fmt::Debug for Injected<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injected")
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

/// Resolves dependency manifests and calls the callables that declare them.
pub struct Invoker;

impl Invoker {
    /// Resolves `callable`'s dependencies through `scope` and calls it.
    ///
    /// The callable's return value is forwarded as-is.
    ///
    /// # Errors
    ///
    /// Synchronous resolution failures abort before the callable runs.
    pub fn invoke<C: Injectable + ?Sized>(scope: &Scope, callable: &C) -> DiResult<C::Output> {
        let tokens = callable.dependencies().to_vec();
        let values = scope.get_many(tokens.iter().cloned())?;
        Ok(callable.call(Arguments::new(tokens, values)))
    }
}
