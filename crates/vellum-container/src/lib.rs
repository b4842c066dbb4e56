//! Lazy service-binding container.
//!
//! `vellum-container` provides [`Container`], a string-keyed registry of
//! lazily constructed services. It is the wiring backbone of the vellum
//! rendering pipeline, but carries no rendering knowledge of its own and can
//! hold any `'static` value.
//!
//! # Binding Semantics
//!
//! Two rules govern the container, and everything else follows from them:
//!
//! 1. **First binding wins.** [`Container::bind_if`] registers a factory only
//!    if the key is still unbound. A host that wants to replace a stage
//!    pre-registers its own factory before the default wiring runs; the
//!    default `bind_if` for that key then becomes a no-op.
//! 2. **At most one construction per key.** [`Container::get`] invokes the
//!    factory on first resolution, memoizes the result, and hands out the
//!    same instance forever after. Bindings are never removed or replaced.
//!
//! Together these give deterministic one-time construction and make test
//! injection trivial: bind a stub under the same key before anything
//! resolves, and every consumer sees the stub.
//!
//! # Example
//!
//! ```rust
//! use vellum_container::Container;
//!
//! let container = Container::new();
//! container.bind_if("greeting", |_| Ok(String::from("hello")));
//!
//! // Too late: the key is already bound.
//! container.bind_if("greeting", |_| Ok(String::from("goodbye")));
//!
//! let greeting = container.get::<String>("greeting").unwrap();
//! assert_eq!(*greeting, "hello");
//! ```

mod container;

pub use container::{Container, ContainerError, FactoryError};
