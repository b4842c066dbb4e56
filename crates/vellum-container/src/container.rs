//! The binding registry and its resolution rules.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;
use tracing::trace;

/// Error type a binding factory may fail with.
///
/// Factories are ordinary closures that typically resolve other bindings and
/// construct a service from them; any error they hit is boxed and carried up
/// through [`ContainerError::Factory`].
pub type FactoryError = Box<dyn std::error::Error + Send + Sync + 'static>;

type BindingFactory = Rc<dyn Fn(&Container) -> Result<Rc<dyn Any>, FactoryError>>;

/// Error type for container operations.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// No factory was ever registered under the requested key.
    #[error("no binding registered for key \"{0}\"")]
    BindingNotFound(String),

    /// The binding resolved, but to a different type than requested.
    #[error("binding \"{key}\" does not hold a value of type {expected}")]
    TypeMismatch {
        /// The key that was requested
        key: String,
        /// The type the caller asked for
        expected: &'static str,
    },

    /// The binding's factory returned an error during first resolution.
    #[error("factory for binding \"{key}\" failed")]
    Factory {
        /// The key being resolved
        key: String,
        /// The underlying factory error
        #[source]
        source: FactoryError,
    },
}

/// A registry of named lazy bindings.
///
/// Each binding pairs a key with a factory closure. The factory runs at most
/// once per container; the produced value is memoized as `Rc<dyn Any>` and
/// downcast on access.
///
/// # Trait-object services
///
/// The container stores concrete types. To bind a service behind a trait,
/// bind the `Rc<dyn Trait>` handle itself as the value and fetch it with
/// [`Container::get_owned`]:
///
/// ```rust,ignore
/// container.bind_if("files", |_| Ok(Rc::new(OsFilesystem) as Rc<dyn Filesystem>));
/// let files = container.get_owned::<Rc<dyn Filesystem>>("files")?;
/// ```
///
/// # Thread Safety
///
/// The container is single-threaded (`Rc`/`RefCell`). Each facade instance
/// owns its own container, so nothing is shared across threads; hosts that
/// want concurrent first-resolution must add their own synchronization.
pub struct Container {
    bindings: RefCell<HashMap<String, BindingFactory>>,
    resolved: RefCell<HashMap<String, Rc<dyn Any>>>,
}

impl Container {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self {
            bindings: RefCell::new(HashMap::new()),
            resolved: RefCell::new(HashMap::new()),
        }
    }

    /// Registers `factory` under `key` unless a binding already exists.
    ///
    /// Returns `true` if the factory was registered, `false` if the key was
    /// already bound (in which case `factory` is dropped unused).
    ///
    /// The factory receives the container so it can resolve services bound
    /// before it; resolution order is the caller's responsibility.
    pub fn bind_if<T, F>(&self, key: impl Into<String>, factory: F) -> bool
    where
        T: Any,
        F: Fn(&Container) -> Result<T, FactoryError> + 'static,
    {
        let key = key.into();
        let mut bindings = self.bindings.borrow_mut();
        if bindings.contains_key(&key) {
            trace!(key = %key, "binding already registered, keeping existing");
            return false;
        }
        trace!(key = %key, "binding registered");
        bindings.insert(
            key,
            Rc::new(move |container| Ok(Rc::new(factory(container)?) as Rc<dyn Any>)),
        );
        true
    }

    /// Returns true if a factory is registered under `key`.
    pub fn has(&self, key: &str) -> bool {
        self.bindings.borrow().contains_key(key)
    }

    /// Returns true if `key` has been resolved to an instance.
    pub fn is_resolved(&self, key: &str) -> bool {
        self.resolved.borrow().contains_key(key)
    }

    /// Resolves the binding under `key`, constructing it on first access.
    ///
    /// Every call after the first returns the identical memoized instance;
    /// the factory is never invoked again.
    ///
    /// # Errors
    ///
    /// - [`ContainerError::BindingNotFound`] if `key` was never bound
    /// - [`ContainerError::TypeMismatch`] if the bound value is not a `T`
    /// - [`ContainerError::Factory`] if the factory fails
    pub fn get<T: Any>(&self, key: &str) -> Result<Rc<T>, ContainerError> {
        if let Some(value) = self.resolved.borrow().get(key) {
            return downcast::<T>(key, value.clone());
        }

        let factory = self
            .bindings
            .borrow()
            .get(key)
            .cloned()
            .ok_or_else(|| ContainerError::BindingNotFound(key.to_string()))?;

        // The bindings borrow is released before the factory runs so the
        // factory can resolve other keys through the same container.
        let value = factory(self).map_err(|source| ContainerError::Factory {
            key: key.to_string(),
            source,
        })?;
        trace!(key, "binding resolved");

        let value = self
            .resolved
            .borrow_mut()
            .entry(key.to_string())
            .or_insert(value)
            .clone();
        downcast::<T>(key, value)
    }

    /// Resolves `key` and returns a clone of the value.
    ///
    /// This is the accessor for bindings whose value is itself a cheap
    /// handle, such as an `Rc<dyn Trait>`.
    pub fn get_owned<T: Any + Clone>(&self, key: &str) -> Result<T, ContainerError> {
        Ok(self.get::<T>(key)?.as_ref().clone())
    }

    /// Returns the keys of all registered bindings, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.bindings.borrow().keys().cloned().collect()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

fn downcast<T: Any>(key: &str, value: Rc<dyn Any>) -> Result<Rc<T>, ContainerError> {
    value
        .downcast::<T>()
        .map_err(|_| ContainerError::TypeMismatch {
            key: key.to_string(),
            expected: std::any::type_name::<T>(),
        })
}
