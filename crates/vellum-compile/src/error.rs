//! Error type for compilation.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for template compilation and cache maintenance.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Reading the source or writing the cache artifact failed.
    #[error("filesystem error for {}", .path.display())]
    Io {
        /// The path being read or written
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A directive was registered under a name the scanner cannot match.
    #[error("directive name \"{0}\" may only contain letters, numbers and underscores")]
    InvalidDirectiveName(String),

    /// A registered directive's argument list never closed.
    #[error("unbalanced parentheses for directive @{directive} on line {line}")]
    UnbalancedDirective {
        /// The directive whose arguments were malformed
        directive: String,
        /// 1-based source line of the opening parenthesis
        line: usize,
    },
}

impl CompileError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        CompileError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
