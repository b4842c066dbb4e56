//! # Vellum — Standalone Template Rendering
//!
//! `vellum` assembles a complete template-rendering pipeline — view
//! resolution, compilation with a persistent artifact cache, and
//! render-time data composition — without a surrounding application
//! framework. A [`Vellum`] instance owns a small service container wired
//! with override-friendly lazy bindings, and drives the pipeline:
//!
//! ```text
//! finder → compiler + cache → engine resolver → view factory
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vellum::Vellum;
//! use serde_json::json;
//!
//! // views/greet.vellum:  Hello, {{ name }}!
//! let vellum = Vellum::new("./views", "./storage/cache")?;
//! let output = vellum.render("greet", json!({"name": "World"}))?;
//! assert_eq!(output, "Hello, World!");
//! ```
//!
//! ## Views
//!
//! A view identifier is either a bare name (`"pages.home"`, dots map to
//! subdirectories, searched against the configured paths in order) or a
//! namespaced name (`"admin::dashboard"`, searched only against that
//! namespace's hint directories). The extension picks the engine:
//! `.vellum` files go through the directive-expanding compiler and its
//! cache, `.jinja` files render directly, `.txt` files pass through
//! verbatim.
//!
//! ## Extension Points
//!
//! - [`Vellum::directive`] — compile-time `@name(args)` substitutions
//! - [`Vellum::if_directive`] — `@name`/`@elsename`/`@endname` trios whose
//!   predicate is evaluated on every render, not baked into the cache
//! - [`Vellum::composer`] / [`Vellum::creator`] — callbacks around view
//!   construction and rendering, matched by name or `*` wildcard
//! - [`Vellum::share`] — data visible to every subsequently created view
//!
//! ## Replacing Stages
//!
//! Construction wires each stage with `bind_if`, so a pre-populated
//! container substitutes any stage while the rest of the wiring proceeds
//! unchanged:
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use vellum::{Container, Filesystem, Vellum};
//!
//! let container = Rc::new(Container::new());
//! container.bind_if("files", |_| Ok(Rc::new(MemoryFilesystem::new()) as Rc<dyn Filesystem>));
//! let vellum = Vellum::with_container("/views", "/cache", container)?;
//! ```
//!
//! ## Concurrency
//!
//! The pipeline is single-threaded and synchronous: one resolving thread
//! per `Vellum` instance, no locks, no shared state between instances. The
//! artifact cache directory is the only cross-process surface; writes are
//! atomic (staged, then renamed) and compilation is idempotent, so
//! concurrent writers are a performance concern, not a correctness one.

pub mod config;
pub mod engines;
mod error;
pub mod events;
pub mod facade;
pub mod factory;
pub mod finder;
mod pattern;

pub use config::ConfigStore;
pub use engines::{
    CompilerEngine, Engine, EngineFactory, EngineResolver, FileEngine, JinjaEngine, ViewData,
};
pub use error::Error;
pub use events::{Dispatcher, Listener};
pub use facade::{Vellum, ViewPaths};
pub use factory::{View, ViewFactory};
pub use finder::{ViewFinder, DEFAULT_EXTENSIONS, HINT_PATH_DELIMITER};

// The lower layers are part of the public surface.
pub use vellum_compile::{
    CompileError, Compiler, DirectiveHandler, Filesystem, IfPredicate, OsFilesystem,
    TemplateCompiler,
};
pub use vellum_container::{Container, ContainerError, FactoryError};
