//! View resolution from search paths and namespace hints.
//!
//! Identifiers come in two shapes:
//!
//! - `"pages.index"` — searched against the global path list, in order.
//!   Dots map to directory separators, so this resolves
//!   `<path>/pages/index.<ext>` for each recognized extension.
//! - `"admin::dashboard"` — searched only against the hint directories
//!   registered for the `admin` namespace. Namespaces are isolated: an
//!   unregistered namespace is a missing view, never a fallback to the
//!   global paths.
//!
//! Resolutions are cached per identifier for the finder's lifetime; the
//! view file set is assumed static once the process is running. The one
//! exception is [`ViewFinder::replace_namespace`], which drops the cached
//! entries of the namespace it reconfigures.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, trace};
use vellum_compile::Filesystem;

use crate::error::Error;

/// Separator between a namespace and the view name.
pub const HINT_PATH_DELIMITER: &str = "::";

/// Recognized view file extensions, highest priority first.
pub const DEFAULT_EXTENSIONS: &[&str] = &["vellum", "jinja", "txt"];

/// Resolves view identifiers to files under ordered candidate directories.
pub struct ViewFinder {
    files: Rc<dyn Filesystem>,
    paths: Vec<PathBuf>,
    hints: RefCell<HashMap<String, Vec<PathBuf>>>,
    extensions: RefCell<Vec<String>>,
    views: RefCell<HashMap<String, PathBuf>>,
}

impl ViewFinder {
    /// Creates a finder over the given global search paths.
    pub fn new(files: Rc<dyn Filesystem>, paths: Vec<PathBuf>) -> Self {
        Self {
            files,
            paths,
            hints: RefCell::new(HashMap::new()),
            extensions: RefCell::new(
                DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            ),
            views: RefCell::new(HashMap::new()),
        }
    }

    /// Resolves `name` to an existing file.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::ViewNotFound`] when no candidate exists, including
    /// for namespaces that were never registered.
    pub fn find(&self, name: &str) -> Result<PathBuf, Error> {
        let name = name.trim();
        if let Some(path) = self.views.borrow().get(name) {
            trace!(view = name, "finder cache hit");
            return Ok(path.clone());
        }

        let path = match name.split_once(HINT_PATH_DELIMITER) {
            Some((namespace, view)) => self.find_namespaced(name, namespace, view)?,
            None => self.search(name, name, &self.paths)?,
        };

        self.views.borrow_mut().insert(name.to_string(), path.clone());
        Ok(path)
    }

    fn find_namespaced(
        &self,
        identifier: &str,
        namespace: &str,
        view: &str,
    ) -> Result<PathBuf, Error> {
        let hints = self.hints.borrow();
        let Some(dirs) = hints.get(namespace) else {
            debug!(view = identifier, namespace, "namespace has no registered hints");
            return Err(Error::ViewNotFound(identifier.to_string()));
        };
        self.search(identifier, view, dirs)
    }

    fn search(&self, identifier: &str, view: &str, dirs: &[PathBuf]) -> Result<PathBuf, Error> {
        let relative = view.replace('.', "/");
        for dir in dirs {
            for extension in self.extensions.borrow().iter() {
                let candidate = dir.join(format!("{relative}.{extension}"));
                if self.files.exists(&candidate) {
                    trace!(view = identifier, path = %candidate.display(), "view resolved");
                    return Ok(candidate);
                }
            }
        }
        debug!(view = identifier, "view not found in any search path");
        Err(Error::ViewNotFound(identifier.to_string()))
    }

    /// Appends hint directories to a namespace, registering it if needed.
    ///
    /// Hints keep their registration order and are not deduplicated.
    pub fn add_namespace<I, P>(&self, namespace: impl Into<String>, hints: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let namespace = namespace.into();
        let hints: Vec<PathBuf> = hints.into_iter().map(Into::into).collect();
        debug!(namespace = %namespace, hints = hints.len(), "namespace hints appended");
        self.hints
            .borrow_mut()
            .entry(namespace)
            .or_default()
            .extend(hints);
    }

    /// Replaces a namespace's hint directories wholesale.
    pub fn replace_namespace<I, P>(&self, namespace: impl Into<String>, hints: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let namespace = namespace.into();
        // Cached resolutions under this namespace would pin the old hints.
        let prefix = format!("{namespace}{HINT_PATH_DELIMITER}");
        self.views
            .borrow_mut()
            .retain(|view, _| !view.starts_with(&prefix));
        self.hints
            .borrow_mut()
            .insert(namespace, hints.into_iter().map(Into::into).collect());
    }

    /// Returns true if `namespace` has registered hints.
    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.hints.borrow().contains_key(namespace)
    }

    /// Registers an extension at highest priority.
    pub fn add_extension(&self, extension: impl Into<String>) {
        let extension = extension.into();
        let mut extensions = self.extensions.borrow_mut();
        extensions.retain(|existing| existing != &extension);
        extensions.insert(0, extension);
    }

    /// The recognized extensions, highest priority first.
    pub fn extensions(&self) -> Vec<String> {
        self.extensions.borrow().clone()
    }

    /// The global search paths.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Enumerates every identifier currently resolvable by this finder:
    /// dot notation for global views, `namespace::name` for hinted ones.
    /// Sorted and deduplicated.
    pub fn available(&self) -> Vec<String> {
        let mut names = Vec::new();
        for dir in &self.paths {
            self.collect(dir, dir, None, &mut names);
        }
        for (namespace, dirs) in self.hints.borrow().iter() {
            for dir in dirs {
                self.collect(dir, dir, Some(namespace), &mut names);
            }
        }
        names.sort();
        names.dedup();
        names
    }

    fn collect(&self, root: &Path, current: &Path, namespace: Option<&str>, names: &mut Vec<String>) {
        let Ok(entries) = self.files.read_dir(current) else {
            return;
        };
        for entry in entries {
            if self.files.is_dir(&entry) {
                self.collect(root, &entry, namespace, names);
                continue;
            }
            let Some(name) = self.identifier_for(root, &entry) else {
                continue;
            };
            match namespace {
                Some(ns) => names.push(format!("{ns}{HINT_PATH_DELIMITER}{name}")),
                None => names.push(name),
            }
        }
    }

    fn identifier_for(&self, root: &Path, file: &Path) -> Option<String> {
        let relative = file.strip_prefix(root).ok()?;
        let relative = relative.to_string_lossy();
        for extension in self.extensions.borrow().iter() {
            if let Some(base) = relative.strip_suffix(&format!(".{extension}")) {
                return Some(base.replace(['/', '\\'], "."));
            }
        }
        None
    }
}
