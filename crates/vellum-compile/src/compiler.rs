//! The template compiler and its artifact cache.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::directives::{condition_slot, expand, validate_name};
use crate::error::CompileError;
use crate::fs::Filesystem;

/// A compile-time directive handler: raw argument string in, generated
/// template code out.
pub type DirectiveHandler = Rc<dyn Fn(&str) -> String>;

/// A conditional-directive predicate, evaluated on every render.
pub type IfPredicate = Rc<dyn Fn() -> bool>;

/// Compilation seam between the engine layer and a concrete compiler.
pub trait Compiler {
    /// Deterministic artifact location for a source template. The same
    /// source path always maps to the same artifact path.
    fn compiled_path(&self, path: &Path) -> PathBuf;

    /// Whether the cached artifact is missing or older than its source.
    fn is_expired(&self, path: &Path) -> Result<bool, CompileError>;

    /// Compiles `path` if its artifact is stale, returning the artifact
    /// location either way.
    fn compile(&self, path: &Path) -> Result<PathBuf, CompileError>;

    /// Values the engine must inject into every render of a compiled
    /// artifact. Conditional directives surface their live predicate
    /// results here; the default is none.
    fn render_context(&self) -> Vec<(String, bool)> {
        Vec::new()
    }
}

/// Compiles vellum templates into minijinja artifacts under a cache
/// directory.
///
/// The compiler hosts the directive registries. Registration is
/// last-one-wins, unlike container bindings: re-registering a name replaces
/// the previous handler or predicate.
///
/// # Example
///
/// ```rust,ignore
/// let compiler = TemplateCompiler::new(files, "/tmp/cache");
/// compiler.directive("datetime", |args| format!("{{{{ {args} | datetimeformat }}}}"))?;
/// compiler.if_directive("debug", || cfg!(debug_assertions))?;
/// let artifact = compiler.compile(Path::new("views/home.vellum"))?;
/// ```
pub struct TemplateCompiler {
    files: Rc<dyn Filesystem>,
    cache_path: PathBuf,
    directives: RefCell<HashMap<String, DirectiveHandler>>,
    // Registration order, kept so render_context is deterministic.
    conditions: RefCell<Vec<(String, IfPredicate)>>,
}

impl TemplateCompiler {
    /// Creates a compiler writing artifacts under `cache_path`.
    ///
    /// The directory is created on first compile, not here.
    pub fn new(files: Rc<dyn Filesystem>, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            files,
            cache_path: cache_path.into(),
            directives: RefCell::new(HashMap::new()),
            conditions: RefCell::new(Vec::new()),
        }
    }

    /// The configured artifact cache directory.
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Registers a compile-time directive. Last registration wins.
    ///
    /// # Errors
    ///
    /// Fails with [`CompileError::InvalidDirectiveName`] if `name` contains
    /// anything but letters, numbers and underscores.
    pub fn directive<F>(&self, name: impl Into<String>, handler: F) -> Result<(), CompileError>
    where
        F: Fn(&str) -> String + 'static,
    {
        let name = name.into();
        validate_name(&name)?;
        self.directives.borrow_mut().insert(name, Rc::new(handler));
        Ok(())
    }

    /// Registers a conditional directive.
    ///
    /// Makes the trio `@name`, `@elsename` and `@endname` available to
    /// templates. The open form expands to a branch on a reserved context
    /// variable; `predicate` is evaluated on every render (via
    /// [`Compiler::render_context`]), so flipping it changes output without
    /// recompilation.
    pub fn if_directive<F>(&self, name: impl Into<String>, predicate: F) -> Result<(), CompileError>
    where
        F: Fn() -> bool + 'static,
    {
        let name = name.into();
        validate_name(&name)?;

        let slot = condition_slot(&name);
        self.directive(name.clone(), move |_| format!("{{% if {slot} %}}"))?;
        self.directive(format!("else{name}"), |_| String::from("{% else %}"))?;
        self.directive(format!("end{name}"), |_| String::from("{% endif %}"))?;

        let mut conditions = self.conditions.borrow_mut();
        if let Some(entry) = conditions.iter_mut().find(|(existing, _)| existing == &name) {
            entry.1 = Rc::new(predicate);
        } else {
            conditions.push((name, Rc::new(predicate)));
        }
        Ok(())
    }

    /// Returns true if a directive (of either kind) is registered under
    /// `name`.
    pub fn has_directive(&self, name: &str) -> bool {
        self.directives.borrow().contains_key(name)
    }
}

impl Compiler for TemplateCompiler {
    fn compiled_path(&self, path: &Path) -> PathBuf {
        let digest = Sha256::digest(path.to_string_lossy().as_bytes());
        self.cache_path.join(format!("{}.jinja", hex::encode(digest)))
    }

    fn is_expired(&self, path: &Path) -> Result<bool, CompileError> {
        let compiled = self.compiled_path(path);
        if !self.files.exists(&compiled) {
            return Ok(true);
        }

        let source_mtime = self
            .files
            .last_modified(path)
            .map_err(|e| CompileError::io(path, e))?;
        let compiled_mtime = self
            .files
            .last_modified(&compiled)
            .map_err(|e| CompileError::io(&compiled, e))?;

        Ok(compiled_mtime < source_mtime)
    }

    fn compile(&self, path: &Path) -> Result<PathBuf, CompileError> {
        let compiled = self.compiled_path(path);
        if !self.is_expired(path)? {
            debug!(source = %path.display(), "artifact fresh, skipping compilation");
            return Ok(compiled);
        }

        let contents = self
            .files
            .get(path)
            .map_err(|e| CompileError::io(path, e))?;
        let expanded = expand(&contents, &self.directives.borrow())?;

        self.files
            .create_dir_all(&self.cache_path)
            .map_err(|e| CompileError::io(&self.cache_path, e))?;

        // Stage and rename so concurrent readers never observe a partial
        // artifact. The staging name carries the pid so two processes
        // compiling the same source do not clobber each other's staging file.
        let staging = compiled.with_extension(format!("{}.tmp", std::process::id()));
        self.files
            .put(&staging, &expanded)
            .map_err(|e| CompileError::io(&staging, e))?;
        self.files
            .rename(&staging, &compiled)
            .map_err(|e| CompileError::io(&compiled, e))?;

        debug!(
            source = %path.display(),
            artifact = %compiled.display(),
            "template compiled"
        );
        Ok(compiled)
    }

    fn render_context(&self) -> Vec<(String, bool)> {
        self.conditions
            .borrow()
            .iter()
            .map(|(name, predicate)| (condition_slot(name), predicate()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::OsFilesystem;
    use std::fs::File;
    use std::time::{Duration, SystemTime};

    fn compiler(cache: &Path) -> TemplateCompiler {
        TemplateCompiler::new(Rc::new(OsFilesystem), cache)
    }

    fn write(path: &Path, contents: &str) {
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_compiled_path_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = compiler(dir.path());

        let first = compiler.compiled_path(Path::new("/views/home.vellum"));
        let second = compiler.compiled_path(Path::new("/views/home.vellum"));
        let other = compiler.compiled_path(Path::new("/views/about.vellum"));

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert!(first.starts_with(dir.path()));
        assert_eq!(first.extension().unwrap(), "jinja");
    }

    #[test]
    fn test_compile_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("home.vellum");
        write(&source, "Hello {{ name }}");

        let cache = dir.path().join("cache");
        let compiler = compiler(&cache);

        let artifact = compiler.compile(&source).unwrap();
        assert_eq!(std::fs::read_to_string(&artifact).unwrap(), "Hello {{ name }}");
    }

    #[test]
    fn test_fresh_artifact_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("home.vellum");
        write(&source, "original");

        let compiler = compiler(dir.path());
        let artifact = compiler.compile(&source).unwrap();

        // Plant a sentinel; a second compile of a fresh source must not
        // touch the artifact.
        write(&artifact, "sentinel");
        let again = compiler.compile(&source).unwrap();
        assert_eq!(again, artifact);
        assert_eq!(std::fs::read_to_string(&artifact).unwrap(), "sentinel");
    }

    #[test]
    fn test_stale_artifact_is_recompiled() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("home.vellum");
        write(&source, "first");

        let compiler = compiler(dir.path());
        let artifact = compiler.compile(&source).unwrap();
        assert_eq!(std::fs::read_to_string(&artifact).unwrap(), "first");

        // Newer source than artifact: backdate the artifact instead of
        // sleeping across a filesystem timestamp boundary.
        write(&source, "second");
        let handle = File::options().append(true).open(&artifact).unwrap();
        handle
            .set_modified(SystemTime::now() - Duration::from_secs(300))
            .unwrap();

        assert!(compiler.is_expired(&source).unwrap());
        let artifact = compiler.compile(&source).unwrap();
        assert_eq!(std::fs::read_to_string(&artifact).unwrap(), "second");
        assert!(!compiler.is_expired(&source).unwrap());
    }

    #[test]
    fn test_missing_artifact_is_expired() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("home.vellum");
        write(&source, "anything");

        let compiler = compiler(dir.path().join("cache").as_path());
        assert!(compiler.is_expired(&source).unwrap());
    }

    #[test]
    fn test_missing_source_fails_with_io() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = compiler(dir.path());

        let err = compiler.compile(&dir.path().join("ghost.vellum")).unwrap_err();
        assert!(matches!(err, CompileError::Io { .. }));
    }

    #[test]
    fn test_directives_expand_during_compile() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("page.vellum");
        write(&source, "@shout(title)");

        let compiler = compiler(dir.path());
        compiler
            .directive("shout", |args| format!("{{{{ {args} | upper }}}}"))
            .unwrap();

        let artifact = compiler.compile(&source).unwrap();
        assert_eq!(
            std::fs::read_to_string(&artifact).unwrap(),
            "{{ title | upper }}"
        );
    }

    #[test]
    fn test_if_directive_expands_to_branch() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("page.vellum");
        write(&source, "@auth in @elseauth out @endauth");

        let compiler = compiler(dir.path());
        compiler.if_directive("auth", || true).unwrap();

        let artifact = compiler.compile(&source).unwrap();
        assert_eq!(
            std::fs::read_to_string(&artifact).unwrap(),
            "{% if __vellum_if_auth %} in {% else %} out {% endif %}"
        );
    }

    #[test]
    fn test_render_context_tracks_live_predicate() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = compiler(dir.path());

        compiler.if_directive("auth", || true).unwrap();
        assert_eq!(
            compiler.render_context(),
            vec![(String::from("__vellum_if_auth"), true)]
        );

        // Re-registration replaces the predicate in place.
        compiler.if_directive("auth", || false).unwrap();
        assert_eq!(
            compiler.render_context(),
            vec![(String::from("__vellum_if_auth"), false)]
        );
    }

    #[test]
    fn test_directive_last_registration_wins() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("page.vellum");
        write(&source, "@tag");

        let compiler = compiler(dir.path());
        compiler.directive("tag", |_| String::from("first")).unwrap();
        compiler.directive("tag", |_| String::from("second")).unwrap();

        let artifact = compiler.compile(&source).unwrap();
        assert_eq!(std::fs::read_to_string(&artifact).unwrap(), "second");
    }

    #[test]
    fn test_invalid_directive_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = compiler(dir.path());

        let err = compiler.directive("not valid", |_| String::new()).unwrap_err();
        assert!(matches!(err, CompileError::InvalidDirectiveName(_)));

        let err = compiler.if_directive("also-bad", || true).unwrap_err();
        assert!(matches!(err, CompileError::InvalidDirectiveName(_)));
    }

    #[test]
    fn test_no_staging_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("home.vellum");
        write(&source, "contents");

        let cache = dir.path().join("cache");
        let compiler = compiler(&cache);
        compiler.compile(&source).unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(&cache)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
