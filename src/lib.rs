//! # keyed-di
//!
//! Token-keyed dependency injection with hierarchical scopes and
//! single-flight asynchronous construction.
//!
//! ## Features
//!
//! - **Flexible tokens**: services are keyed by names, unique symbols, or types
//! - **Four lifetimes**: Singleton, Lazy, Scoped, and Transient
//! - **Scope trees**: lazy values are shared by a whole tree, scoped values by one scope
//! - **Single flight**: concurrent requests for an uncached async service share one future
//! - **Failure recovery**: a failed factory leaves no cache entry behind, so the next request retries
//! - **Circular dependency detection**: synchronous cycles fail with the full token path
//!
//! ## Quick Start
//!
//! ```rust
//! use keyed_di::{Registry, Scope};
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let mut registry = Registry::new();
//! registry
//!     .set("db", Database { connection_string: "postgres://localhost".to_string() })?
//!     .set_transient("users", |scope: &Scope| {
//!         let db = scope.get("db")?.and_then(|db| db.ready_as::<Database>()).ok_or("db missing")?;
//!         Ok(UserService { db })
//!     })?;
//!
//! let scope = registry.build();
//! let users = scope.get("users")?.unwrap().ready_as::<UserService>().unwrap();
//! assert_eq!(users.db.connection_string, "postgres://localhost");
//! # Ok::<(), keyed_di::DiError>(())
//! ```
//!
//! ## Lifetimes
//!
//! - **Singleton**: a value registered as-is and handed back unchanged
//! - **Lazy**: built on first request, once per root scope
//! - **Scoped**: built once per scope instance
//! - **Transient**: built on every request
//!
//! ## Asynchronous Factories
//!
//! ```rust
//! use keyed_di::Registry;
//!
//! # async fn example() -> Result<(), keyed_di::DiError> {
//! let mut registry = Registry::new();
//! registry.set_lazy_async("config", |_| async { Ok(String::from("loaded")) })?;
//!
//! let scope = registry.build();
//! let first = scope.get("config")?.unwrap();
//! let second = scope.get("config")?.unwrap();
//! assert!(first.ptr_eq(&second));
//!
//! let config = scope.resolve::<String>("config").await?;
//! assert_eq!(*config, "loaded");
//! # Ok(())
//! # }
//! ```
//!
//! ## Scopes
//!
//! ```rust
//! use keyed_di::Registry;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! static NEXT: AtomicU64 = AtomicU64::new(0);
//!
//! let mut registry = Registry::new();
//! registry.set_scoped("request_id", |_| Ok(NEXT.fetch_add(1, Ordering::SeqCst)))?;
//!
//! let root = registry.build();
//! let a = root.create_scope();
//! let b = root.create_scope();
//!
//! let a_id = a.get("request_id")?.unwrap().ready_as::<u64>().unwrap();
//! let b_id = b.get("request_id")?.unwrap().ready_as::<u64>().unwrap();
//! assert_ne!(*a_id, *b_id);
//! # Ok::<(), keyed_di::DiError>(())
//! ```

pub mod async_factories;
pub mod descriptors;
pub mod error;
pub mod invoker;
pub mod lifetime;
pub mod observer;
pub mod options;
pub mod registration;
pub mod registry;
pub mod scope;
pub mod token;

// Internal modules
mod internal;

// Re-export core types
pub use async_factories::AsyncFactory;
pub use descriptors::ServiceDescriptor;
pub use error::{BoxError, DiError, DiResult};
pub use invoker::{inject, Arguments, Injectable, Injected, Invoker};
pub use lifetime::Lifetime;
pub use observer::{DiObserver, LoggingObserver};
pub use options::{ContainerOptions, DEFAULT_MAX_DEPTH};
pub use registration::{AnyArc, FactoryFn, Produced, Source};
pub use registry::{Registry, Service};
pub use scope::{Pending, Resolved, Scope};
pub use token::{Symbol, Token};
