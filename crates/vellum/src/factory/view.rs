//! A single renderable view.

use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::Value;

use crate::engines::{Engine, ViewData};
use crate::error::Error;
use crate::events::Dispatcher;

/// A resolved view bound to its engine and render data.
///
/// Views are cheap, short-lived values: one is created per `make`/`file`
/// call and discarded after [`render`](View::render) returns. The data
/// mapping was merged at construction (shared data, then explicit data,
/// then merge data — later sources win on key collision) and can still be
/// adjusted with [`with`](View::with) or by composer callbacks.
pub struct View {
    events: Rc<Dispatcher>,
    engine: Rc<dyn Engine>,
    name: String,
    path: PathBuf,
    data: ViewData,
}

impl View {
    pub(crate) fn new(
        events: Rc<Dispatcher>,
        engine: Rc<dyn Engine>,
        name: String,
        path: PathBuf,
        data: ViewData,
    ) -> Self {
        Self {
            events,
            engine,
            name,
            path,
            data,
        }
    }

    /// The identifier this view was made from (or the raw path, for views
    /// built via `file`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolved template file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current render data.
    pub fn data(&self) -> &ViewData {
        &self.data
    }

    /// Mutable access to the render data; composers use this to reshape a
    /// view before it renders.
    pub fn data_mut(&mut self) -> &mut ViewData {
        &mut self.data
    }

    /// Adds one piece of data, overwriting any existing value under `key`.
    pub fn with(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Renders the view: fires matching composers, then evaluates the
    /// engine against the final data.
    pub fn render(&mut self) -> Result<String, Error> {
        let events = self.events.clone();
        events.dispatch(&format!("composing: {}", self.name), self);
        self.engine.get(&self.path, &self.data)
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("data_keys", &self.data.len())
            .finish()
    }
}
