//! Filesystem abstraction.
//!
//! The compiler and the view finder touch the filesystem only through
//! [`Filesystem`], which keeps them injectable: a host can bind an in-memory
//! implementation before the pipeline wires itself and every stage will use
//! it. [`OsFilesystem`] is the std-backed default.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Minimal filesystem surface the rendering pipeline needs.
pub trait Filesystem {
    /// Returns true if `path` exists.
    fn exists(&self, path: &Path) -> bool;

    /// Returns true if `path` is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Lists the entries of a directory, sorted for determinism.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Reads a file to a string.
    fn get(&self, path: &Path) -> io::Result<String>;

    /// Writes `contents` to `path`, replacing any existing file.
    fn put(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Renames `from` to `to`.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Creates `path` and any missing parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Returns the last-modified time of `path`.
    fn last_modified(&self, path: &Path) -> io::Result<SystemTime>;
}

/// [`Filesystem`] backed by `std::fs`.
pub struct OsFilesystem;

impl Filesystem for OsFilesystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            entries.push(entry?.path());
        }
        entries.sort();
        Ok(entries)
    }

    fn get(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn put(&self, path: &Path, contents: &str) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn last_modified(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }
}
