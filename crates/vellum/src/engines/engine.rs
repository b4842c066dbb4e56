//! The engine seam and its three implementations.

use std::path::Path;
use std::rc::Rc;

use minijinja::Environment;
use serde_json::{Map, Value};
use vellum_compile::{Compiler, Filesystem};

use crate::error::Error;

/// The data mapping a view is rendered against.
pub type ViewData = Map<String, Value>;

/// Executes a resolved view file against data, producing output.
pub trait Engine {
    /// Evaluates the view at `path` against `data`.
    fn get(&self, path: &Path, data: &ViewData) -> Result<String, Error>;
}

/// Returns file contents verbatim. Used for plain-text views.
pub struct FileEngine {
    files: Rc<dyn Filesystem>,
}

impl FileEngine {
    pub fn new(files: Rc<dyn Filesystem>) -> Self {
        Self { files }
    }
}

impl Engine for FileEngine {
    fn get(&self, path: &Path, _data: &ViewData) -> Result<String, Error> {
        self.files.get(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Renders a raw minijinja source file, without a compilation pass.
pub struct JinjaEngine {
    files: Rc<dyn Filesystem>,
    env: Environment<'static>,
}

impl JinjaEngine {
    pub fn new(files: Rc<dyn Filesystem>) -> Self {
        Self {
            files,
            env: Environment::new(),
        }
    }
}

impl Engine for JinjaEngine {
    fn get(&self, path: &Path, data: &ViewData) -> Result<String, Error> {
        let source = self.files.get(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let output = self
            .env
            .render_str(&source, minijinja::Value::from_serialize(data))?;
        Ok(output)
    }
}

/// Drives the compiler, then renders the cached artifact.
///
/// Before rendering, the compiler's [`render_context`](Compiler::render_context)
/// values are merged into the data — that is where conditional-directive
/// predicates are evaluated, once per render. Explicit view data wins over
/// injected slots.
pub struct CompilerEngine {
    compiler: Rc<dyn Compiler>,
    files: Rc<dyn Filesystem>,
    env: Environment<'static>,
}

impl CompilerEngine {
    pub fn new(compiler: Rc<dyn Compiler>, files: Rc<dyn Filesystem>) -> Self {
        Self {
            compiler,
            files,
            env: Environment::new(),
        }
    }
}

impl Engine for CompilerEngine {
    fn get(&self, path: &Path, data: &ViewData) -> Result<String, Error> {
        let artifact = self.compiler.compile(path)?;
        let source = self.files.get(&artifact).map_err(|source| Error::Io {
            path: artifact.clone(),
            source,
        })?;

        let mut context = data.clone();
        for (slot, value) in self.compiler.render_context() {
            context.entry(slot).or_insert(Value::Bool(value));
        }

        let output = self
            .env
            .render_str(&source, minijinja::Value::from_serialize(&context))?;
        Ok(output)
    }
}
