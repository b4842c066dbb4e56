//! The composition root.
//!
//! [`Vellum`] wires the whole pipeline into a [`Container`] and exposes the
//! factory and compiler surface as plain methods. Every stage is registered
//! with `bind_if` in dependency order, so a host that pre-populates the
//! container before construction can swap any stage — bind an in-memory
//! filesystem under `"files"` and the finder, compiler and engines all use
//! it, while the rest of the default wiring proceeds unchanged.
//!
//! Binding keys, in registration order:
//!
//! | Key | Value |
//! |-----|-------|
//! | `files` | `Rc<dyn Filesystem>` |
//! | `events` | [`Dispatcher`] |
//! | `config` | [`ConfigStore`] (`view.paths`, `view.compiled`) |
//! | `template.compiler` | [`TemplateCompiler`] |
//! | `view.engine.resolver` | [`EngineResolver`] (`template`, `jinja`, `file`) |
//! | `view.finder` | [`ViewFinder`] |
//! | `view` | [`ViewFactory`] |
//!
//! Each factory closure closes only over services bound before it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use vellum_compile::{Filesystem, OsFilesystem, TemplateCompiler};
use vellum_container::Container;

use crate::config::ConfigStore;
use crate::engines::{CompilerEngine, Engine, EngineResolver, FileEngine, JinjaEngine};
use crate::error::Error;
use crate::events::Dispatcher;
use crate::factory::{View, ViewFactory};
use crate::finder::ViewFinder;

/// One or many view search directories, normalized to a list.
#[derive(Debug, Clone)]
pub struct ViewPaths(Vec<PathBuf>);

impl From<&str> for ViewPaths {
    fn from(path: &str) -> Self {
        Self(vec![PathBuf::from(path)])
    }
}

impl From<String> for ViewPaths {
    fn from(path: String) -> Self {
        Self(vec![PathBuf::from(path)])
    }
}

impl From<&Path> for ViewPaths {
    fn from(path: &Path) -> Self {
        Self(vec![path.to_path_buf()])
    }
}

impl From<PathBuf> for ViewPaths {
    fn from(path: PathBuf) -> Self {
        Self(vec![path])
    }
}

impl From<Vec<PathBuf>> for ViewPaths {
    fn from(paths: Vec<PathBuf>) -> Self {
        Self(paths)
    }
}

impl From<Vec<&str>> for ViewPaths {
    fn from(paths: Vec<&str>) -> Self {
        Self(paths.into_iter().map(PathBuf::from).collect())
    }
}

/// Standalone template rendering front end.
///
/// # Example
///
/// ```rust,ignore
/// use vellum::Vellum;
/// use serde_json::json;
///
/// let vellum = Vellum::new("./views", "./cache")?;
/// vellum.share("app_name", "Acme");
/// let html = vellum.render("pages.home", json!({"user": "Ada"}))?;
/// ```
pub struct Vellum {
    container: Rc<Container>,
    factory: Rc<ViewFactory>,
    compiler: Rc<TemplateCompiler>,
}

impl Vellum {
    /// Builds a rendering pipeline over `view_paths` with compiled
    /// artifacts cached under `cache_path`.
    pub fn new(
        view_paths: impl Into<ViewPaths>,
        cache_path: impl Into<PathBuf>,
    ) -> Result<Self, Error> {
        Self::with_container(view_paths, cache_path, Rc::new(Container::new()))
    }

    /// Like [`new`](Self::new), but wires into a caller-supplied container.
    ///
    /// Bindings already present in `container` win over the default wiring,
    /// which is how stages are replaced for tests or embedding.
    pub fn with_container(
        view_paths: impl Into<ViewPaths>,
        cache_path: impl Into<PathBuf>,
        container: Rc<Container>,
    ) -> Result<Self, Error> {
        let ViewPaths(paths) = view_paths.into();
        setup_container(&container, paths, cache_path.into());

        let factory = container.get::<ViewFactory>("view")?;
        let compiler = container.get::<TemplateCompiler>("template.compiler")?;
        Ok(Self {
            container,
            factory,
            compiler,
        })
    }

    /// Renders a view to a string.
    pub fn render(&self, view: &str, data: impl Serialize) -> Result<String, Error> {
        let mut view = self.factory.make(view, data)?;
        view.render()
    }

    /// Renders a view with an extra mapping that wins over `data` on key
    /// collision.
    pub fn render_with(
        &self,
        view: &str,
        data: impl Serialize,
        merge_data: impl Serialize,
    ) -> Result<String, Error> {
        let mut view = self.factory.make_with(view, data, merge_data)?;
        view.render()
    }

    /// Builds an unrendered [`View`].
    pub fn make(&self, view: &str, data: impl Serialize) -> Result<View, Error> {
        self.factory.make(view, data)
    }

    /// Builds an unrendered [`View`] with merge data.
    pub fn make_with(
        &self,
        view: &str,
        data: impl Serialize,
        merge_data: impl Serialize,
    ) -> Result<View, Error> {
        self.factory.make_with(view, data, merge_data)
    }

    /// Builds a view directly from a file path, bypassing view resolution.
    pub fn file(&self, path: impl Into<PathBuf>, data: impl Serialize) -> Result<View, Error> {
        self.factory.file(path, data)
    }

    /// Like [`file`](Self::file), with merge data.
    pub fn file_with(
        &self,
        path: impl Into<PathBuf>,
        data: impl Serialize,
        merge_data: impl Serialize,
    ) -> Result<View, Error> {
        self.factory.file_with(path, data, merge_data)
    }

    /// Returns true if `view` resolves to an existing file.
    pub fn exists(&self, view: &str) -> bool {
        self.factory.exists(view)
    }

    /// Shares a value with every view created from now on.
    pub fn share(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.factory.share(key, value);
    }

    /// Registers a composer hook. See [`ViewFactory::composer`].
    pub fn composer<F>(&self, pattern: &str, callback: F) -> Vec<String>
    where
        F: Fn(&mut View) + 'static,
    {
        self.factory.composer(pattern, callback)
    }

    /// Registers a creator hook. See [`ViewFactory::creator`].
    pub fn creator<F>(&self, pattern: &str, callback: F) -> Vec<String>
    where
        F: Fn(&mut View) + 'static,
    {
        self.factory.creator(pattern, callback)
    }

    /// Appends hint directories to a namespace.
    pub fn add_namespace<I, P>(&self, namespace: impl Into<String>, hints: I) -> &Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.factory.add_namespace(namespace, hints);
        self
    }

    /// Replaces a namespace's hint directories.
    pub fn replace_namespace<I, P>(&self, namespace: impl Into<String>, hints: I) -> &Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.factory.replace_namespace(namespace, hints);
        self
    }

    /// Registers a compile-time directive on the compiler.
    pub fn directive<F>(&self, name: impl Into<String>, handler: F) -> Result<(), Error>
    where
        F: Fn(&str) -> String + 'static,
    {
        self.compiler.directive(name, handler)?;
        Ok(())
    }

    /// Registers a conditional directive (`@name`/`@elsename`/`@endname`)
    /// whose predicate is evaluated on every render.
    pub fn if_directive<F>(&self, name: impl Into<String>, predicate: F) -> Result<(), Error>
    where
        F: Fn() -> bool + 'static,
    {
        self.compiler.if_directive(name, predicate)?;
        Ok(())
    }

    /// The template compiler.
    pub fn compiler(&self) -> &Rc<TemplateCompiler> {
        &self.compiler
    }

    /// The view factory.
    pub fn factory(&self) -> &Rc<ViewFactory> {
        &self.factory
    }

    /// The container the pipeline was wired into.
    pub fn container(&self) -> &Rc<Container> {
        &self.container
    }
}

fn setup_container(container: &Container, paths: Vec<PathBuf>, cache_path: PathBuf) {
    container.bind_if("files", |_| Ok(Rc::new(OsFilesystem) as Rc<dyn Filesystem>));
    container.bind_if("events", |_| Ok(Dispatcher::new()));

    let view_paths = Value::Array(
        paths
            .iter()
            .map(|path| Value::String(path.to_string_lossy().into_owned()))
            .collect(),
    );
    let compiled = Value::String(cache_path.to_string_lossy().into_owned());
    container.bind_if("config", move |_| {
        Ok(ConfigStore::new(HashMap::from([
            (String::from("view.paths"), view_paths.clone()),
            (String::from("view.compiled"), compiled.clone()),
        ])))
    });

    container.bind_if("template.compiler", |c| {
        let files = c.get_owned::<Rc<dyn Filesystem>>("files")?;
        let config = c.get::<ConfigStore>("config")?;
        Ok(TemplateCompiler::new(files, config.get_path("view.compiled")?))
    });

    container.bind_if("view.engine.resolver", |c| {
        let files = c.get_owned::<Rc<dyn Filesystem>>("files")?;
        let compiler = c.get::<TemplateCompiler>("template.compiler")?;

        let resolver = EngineResolver::new();
        {
            let files = files.clone();
            resolver.register("file", move || {
                Rc::new(FileEngine::new(files.clone())) as Rc<dyn Engine>
            });
        }
        {
            let files = files.clone();
            resolver.register("jinja", move || {
                Rc::new(JinjaEngine::new(files.clone())) as Rc<dyn Engine>
            });
        }
        resolver.register("template", move || {
            Rc::new(CompilerEngine::new(compiler.clone(), files.clone())) as Rc<dyn Engine>
        });
        Ok(resolver)
    });

    container.bind_if("view.finder", |c| {
        let files = c.get_owned::<Rc<dyn Filesystem>>("files")?;
        let config = c.get::<ConfigStore>("config")?;
        Ok(ViewFinder::new(files, config.get_paths("view.paths")?))
    });

    container.bind_if("view", |c| {
        Ok(ViewFactory::new(
            c.get::<EngineResolver>("view.engine.resolver")?,
            c.get::<ViewFinder>("view.finder")?,
            c.get::<Dispatcher>("events")?,
        ))
    });

    debug!("view pipeline bindings registered");
}
