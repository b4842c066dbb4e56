//! Engine resolution by name.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use super::Engine;
use crate::error::Error;

/// A lazy engine constructor.
pub type EngineFactory = Rc<dyn Fn() -> Rc<dyn Engine>>;

/// Lazily constructs and memoizes rendering engines by name.
///
/// Same once-only semantics as the container, scoped to engine names:
/// `resolve` builds an engine on first use and hands out the same instance
/// afterwards. Unlike container bindings, `register` may overwrite — doing
/// so discards any instance memoized from the previous factory.
pub struct EngineResolver {
    factories: RefCell<HashMap<String, EngineFactory>>,
    resolved: RefCell<HashMap<String, Rc<dyn Engine>>>,
}

impl EngineResolver {
    /// Creates a resolver with no registered engines.
    pub fn new() -> Self {
        Self {
            factories: RefCell::new(HashMap::new()),
            resolved: RefCell::new(HashMap::new()),
        }
    }

    /// Registers a lazy engine factory under `name`.
    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Rc<dyn Engine> + 'static,
    {
        let name = name.into();
        self.resolved.borrow_mut().remove(&name);
        self.factories.borrow_mut().insert(name, Rc::new(factory));
    }

    /// Returns true if an engine is registered under `name`.
    pub fn has(&self, name: &str) -> bool {
        self.factories.borrow().contains_key(name)
    }

    /// Resolves the engine registered under `name`, constructing it on
    /// first use.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::EngineNotFound`] for unregistered names.
    pub fn resolve(&self, name: &str) -> Result<Rc<dyn Engine>, Error> {
        if let Some(engine) = self.resolved.borrow().get(name) {
            return Ok(engine.clone());
        }

        let factory = self
            .factories
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::EngineNotFound(name.to_string()))?;

        let engine = factory();
        debug!(engine = name, "engine constructed");
        self.resolved
            .borrow_mut()
            .insert(name.to_string(), engine.clone());
        Ok(engine)
    }
}

impl Default for EngineResolver {
    fn default() -> Self {
        Self::new()
    }
}
