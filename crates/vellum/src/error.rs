//! Error type for the rendering pipeline.
//!
//! Lower-layer errors ([`ContainerError`], [`CompileError`]) pass through
//! transparently; everything the pipeline itself can fail with gets its own
//! variant. No layer swallows errors: the finder, engines and factory all
//! surface failures to the `render`/`make` caller. The single exception is
//! `exists`, which converts a missing view into `false`.

use std::path::PathBuf;

use thiserror::Error;
use vellum_compile::CompileError;
use vellum_container::ContainerError;

/// Error type for view resolution, compilation and rendering.
#[derive(Debug, Error)]
pub enum Error {
    /// Container wiring or resolution failure.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// A configuration key was never defined.
    #[error("config key \"{0}\" is not defined")]
    ConfigKeyNotFound(String),

    /// A configuration key holds the wrong shape of value.
    #[error("config key \"{key}\" does not hold {expected}")]
    ConfigType {
        /// The dotted key that was read
        key: String,
        /// What the caller needed it to be
        expected: &'static str,
    },

    /// No search path or namespace hint produced an existing file.
    #[error("view \"{0}\" not found")]
    ViewNotFound(String),

    /// No engine is registered under the requested name.
    #[error("no engine registered for \"{0}\"")]
    EngineNotFound(String),

    /// The view file's extension maps to no known engine.
    #[error("unrecognized extension for view file {}", .0.display())]
    UnrecognizedExtension(PathBuf),

    /// Template compilation failure.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Template evaluation failure (syntax, unknown filter, ...).
    #[error("template error: {0}")]
    Template(String),

    /// View data could not be serialized into a context object.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Filesystem failure outside the compiler.
    #[error("I/O error for {}", .path.display())]
    Io {
        /// The path being accessed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl From<minijinja::Error> for Error {
    fn from(err: minijinja::Error) -> Self {
        match err.kind() {
            minijinja::ErrorKind::BadSerialization => Error::Serialization(err.to_string()),
            _ => Error::Template(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_not_found_display() {
        let err = Error::ViewNotFound("admin::dashboard".into());
        assert_eq!(err.to_string(), "view \"admin::dashboard\" not found");
    }

    #[test]
    fn test_minijinja_error_maps_to_template() {
        let source = minijinja::Error::new(minijinja::ErrorKind::SyntaxError, "unexpected end");
        let err: Error = source.into();
        assert!(matches!(err, Error::Template(_)));
    }

    #[test]
    fn test_container_error_passes_through() {
        let err: Error = ContainerError::BindingNotFound("view".into()).into();
        assert!(err.to_string().contains("view"));
    }
}
