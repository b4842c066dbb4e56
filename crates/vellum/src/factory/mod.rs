//! The view factory: the top-level API behind the facade.
//!
//! The factory composes the pipeline's stages: it asks the finder for a
//! path, picks an engine from the file extension, merges shared and
//! explicit data, and fires lifecycle hooks. Creators run once, when a view
//! is constructed; composers run immediately before each render and may
//! mutate the view's data.
//!
//! # Data Precedence
//!
//! Three data sources merge into every view, later ones winning on key
//! collision:
//!
//! 1. factory-wide shared data (snapshotted at construction — `share`
//!    calls after a view exists do not reach it)
//! 2. explicit `data`
//! 3. `merge_data`

mod view;

pub use view::View;

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::engines::{EngineResolver, ViewData};
use crate::error::Error;
use crate::events::Dispatcher;
use crate::finder::ViewFinder;
use crate::pattern;

/// Builds [`View`] instances and hosts shared data and lifecycle hooks.
pub struct ViewFactory {
    engines: Rc<EngineResolver>,
    finder: Rc<ViewFinder>,
    events: Rc<Dispatcher>,
    shared: RefCell<ViewData>,
    // (extension, engine name), highest priority first.
    extensions: RefCell<Vec<(String, String)>>,
}

impl ViewFactory {
    /// Creates a factory over the given resolver, finder and event bus.
    pub fn new(engines: Rc<EngineResolver>, finder: Rc<ViewFinder>, events: Rc<Dispatcher>) -> Self {
        Self {
            engines,
            finder,
            events,
            shared: RefCell::new(ViewData::new()),
            extensions: RefCell::new(vec![
                (String::from("vellum"), String::from("template")),
                (String::from("jinja"), String::from("jinja")),
                (String::from("txt"), String::from("file")),
            ]),
        }
    }

    /// Resolves `view` and builds an unrendered [`View`] from `data`.
    pub fn make(&self, view: &str, data: impl Serialize) -> Result<View, Error> {
        self.make_with(view, data, Value::Null)
    }

    /// Like [`make`](Self::make), with an extra mapping that wins over
    /// `data` on key collision.
    pub fn make_with(
        &self,
        view: &str,
        data: impl Serialize,
        merge_data: impl Serialize,
    ) -> Result<View, Error> {
        let name = view.trim().to_string();
        let path = self.finder.find(&name)?;
        self.view_instance(name, path, data, merge_data)
    }

    /// Builds a view directly from a file path, bypassing the finder.
    pub fn file(&self, path: impl Into<PathBuf>, data: impl Serialize) -> Result<View, Error> {
        self.file_with(path, data, Value::Null)
    }

    /// Like [`file`](Self::file), with an extra mapping that wins over
    /// `data` on key collision.
    pub fn file_with(
        &self,
        path: impl Into<PathBuf>,
        data: impl Serialize,
        merge_data: impl Serialize,
    ) -> Result<View, Error> {
        let path = path.into();
        let name = path.to_string_lossy().into_owned();
        self.view_instance(name, path, data, merge_data)
    }

    fn view_instance(
        &self,
        name: String,
        path: PathBuf,
        data: impl Serialize,
        merge_data: impl Serialize,
    ) -> Result<View, Error> {
        let engine_name = self.engine_for(&path)?;
        let engine = self.engines.resolve(&engine_name)?;

        let mut merged = self.shared.borrow().clone();
        merge_into(&mut merged, data)?;
        merge_into(&mut merged, merge_data)?;

        debug!(view = %name, engine = %engine_name, "view constructed");
        let mut view = View::new(self.events.clone(), engine, name, path, merged);
        self.events
            .dispatch(&format!("creating: {}", view.name()), &mut view);
        Ok(view)
    }

    /// Returns true if `view` resolves to an existing file. The only
    /// operation that converts a missing view into a boolean instead of an
    /// error.
    pub fn exists(&self, view: &str) -> bool {
        self.finder.find(view.trim()).is_ok()
    }

    /// Inserts a key into the factory-wide shared data, visible to every
    /// view created afterwards.
    pub fn share(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.shared.borrow_mut().insert(key.into(), value.into());
    }

    /// A snapshot of the current shared data.
    pub fn shared(&self) -> ViewData {
        self.shared.borrow().clone()
    }

    /// Registers a composer: `callback` runs immediately before any view
    /// matching `pattern` renders, and may mutate its data.
    ///
    /// Returns the identifiers currently known to match, evaluated now
    /// against the finder's paths and registered namespaces.
    pub fn composer<F>(&self, pattern: &str, callback: F) -> Vec<String>
    where
        F: Fn(&mut View) + 'static,
    {
        self.register_hook("composing", pattern, callback)
    }

    /// Registers a creator: `callback` runs once when a view matching
    /// `pattern` is constructed.
    ///
    /// Returns the identifiers currently known to match, like
    /// [`composer`](Self::composer).
    pub fn creator<F>(&self, pattern: &str, callback: F) -> Vec<String>
    where
        F: Fn(&mut View) + 'static,
    {
        self.register_hook("creating", pattern, callback)
    }

    fn register_hook<F>(&self, phase: &str, pattern: &str, callback: F) -> Vec<String>
    where
        F: Fn(&mut View) + 'static,
    {
        self.events
            .listen(format!("{phase}: {pattern}"), Rc::new(callback));
        self.finder
            .available()
            .into_iter()
            .filter(|name| pattern::matches(pattern, name))
            .collect()
    }

    /// Appends hint directories to a namespace. Delegates to the finder.
    pub fn add_namespace<I, P>(&self, namespace: impl Into<String>, hints: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.finder.add_namespace(namespace, hints);
    }

    /// Replaces a namespace's hint directories. Delegates to the finder.
    pub fn replace_namespace<I, P>(&self, namespace: impl Into<String>, hints: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.finder.replace_namespace(namespace, hints);
    }

    /// Maps a new file extension to an engine, at highest priority for both
    /// finding and engine selection.
    pub fn add_extension(&self, extension: impl Into<String>, engine: impl Into<String>) {
        let extension = extension.into();
        self.finder.add_extension(extension.clone());
        let mut extensions = self.extensions.borrow_mut();
        extensions.retain(|(existing, _)| existing != &extension);
        extensions.insert(0, (extension, engine.into()));
    }

    fn engine_for(&self, path: &Path) -> Result<String, Error> {
        let name = path.to_string_lossy();
        self.extensions
            .borrow()
            .iter()
            .find(|(extension, _)| name.ends_with(&format!(".{extension}")))
            .map(|(_, engine)| engine.clone())
            .ok_or_else(|| Error::UnrecognizedExtension(path.to_path_buf()))
    }

    /// The finder this factory resolves views through.
    pub fn finder(&self) -> &Rc<ViewFinder> {
        &self.finder
    }

    /// The engine resolver this factory selects engines from.
    pub fn engines(&self) -> &Rc<EngineResolver> {
        &self.engines
    }

    /// The event bus lifecycle hooks are registered on.
    pub fn events(&self) -> &Rc<Dispatcher> {
        &self.events
    }
}

fn merge_into(target: &mut ViewData, data: impl Serialize) -> Result<(), Error> {
    let value = serde_json::to_value(data).map_err(|err| Error::Serialization(err.to_string()))?;
    match value {
        Value::Null => Ok(()),
        Value::Object(map) => {
            for (key, value) in map {
                target.insert(key, value);
            }
            Ok(())
        }
        other => Err(Error::Serialization(format!(
            "view data must serialize to an object, got: {other}"
        ))),
    }
}
