//! Rendering engines and their resolver.
//!
//! An [`Engine`] turns a resolved view file plus a data mapping into output.
//! Three engines cover the default extensions:
//!
//! | Engine | Extension | Behavior |
//! |--------|-----------|----------|
//! | `template` ([`CompilerEngine`]) | `.vellum` | Compile (or reuse the cached artifact), then render with minijinja |
//! | `jinja` ([`JinjaEngine`]) | `.jinja` | Render the source directly with minijinja |
//! | `file` ([`FileEngine`]) | `.txt` | Return the file contents verbatim |
//!
//! [`EngineResolver`] maps engine names to lazily constructed, memoized
//! instances.

mod engine;
mod resolver;

pub use engine::{CompilerEngine, Engine, FileEngine, JinjaEngine, ViewData};
pub use resolver::{EngineFactory, EngineResolver};
