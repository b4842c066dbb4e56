//! Container wiring behavior: pre-bound stages replace the defaults, and a
//! whole pipeline can run against an in-memory filesystem.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;

use serde_json::json;
use vellum::{Container, Dispatcher, Filesystem, Vellum};

/// In-memory [`Filesystem`] for exercising the pipeline without disk.
struct MemoryFilesystem {
    files: RefCell<HashMap<PathBuf, (String, SystemTime)>>,
}

impl MemoryFilesystem {
    fn new() -> Self {
        Self {
            files: RefCell::new(HashMap::new()),
        }
    }

    fn seed(&self, path: &str, contents: &str) {
        self.files.borrow_mut().insert(
            PathBuf::from(path),
            (contents.to_string(), SystemTime::now()),
        );
    }

    fn contains(&self, path: &Path) -> bool {
        self.files.borrow().contains_key(path)
    }

    fn paths(&self) -> Vec<PathBuf> {
        self.files.borrow().keys().cloned().collect()
    }
}

impl Filesystem for MemoryFilesystem {
    fn exists(&self, path: &Path) -> bool {
        self.files.borrow().contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        let files = self.files.borrow();
        !files.contains_key(path) && files.keys().any(|key| key.starts_with(path))
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let files = self.files.borrow();
        let mut entries: Vec<PathBuf> = files
            .keys()
            .filter_map(|key| {
                let rest = key.strip_prefix(path).ok()?;
                let first = rest.components().next()?;
                Some(path.join(first.as_os_str()))
            })
            .collect();
        entries.sort();
        entries.dedup();
        Ok(entries)
    }

    fn get(&self, path: &Path) -> io::Result<String> {
        self.files
            .borrow()
            .get(path)
            .map(|(contents, _)| contents.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    fn put(&self, path: &Path, contents: &str) -> io::Result<()> {
        self.files.borrow_mut().insert(
            path.to_path_buf(),
            (contents.to_string(), SystemTime::now()),
        );
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let entry = self
            .files
            .borrow_mut()
            .remove(from)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))?;
        self.files.borrow_mut().insert(to.to_path_buf(), entry);
        Ok(())
    }

    fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    fn last_modified(&self, path: &Path) -> io::Result<SystemTime> {
        self.files
            .borrow()
            .get(path)
            .map(|(_, modified)| *modified)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }
}

fn memory_pipeline() -> (Rc<MemoryFilesystem>, Vellum) {
    let memory = Rc::new(MemoryFilesystem::new());
    memory.seed("/views/home.vellum", "Hi {{ who }}");
    memory.seed("/views/pages/about.vellum", "About {{ app }}");

    let container = Rc::new(Container::new());
    let files = memory.clone();
    container.bind_if("files", move |_| Ok(files.clone() as Rc<dyn Filesystem>));

    let vellum = Vellum::with_container("/views", "/cache", container).unwrap();
    (memory, vellum)
}

#[test]
fn pipeline_runs_entirely_in_memory() {
    let (memory, vellum) = memory_pipeline();

    assert_eq!(
        vellum.render("home", json!({"who": "memory"})).unwrap(),
        "Hi memory"
    );

    // The compiled artifact landed in the in-memory cache directory, not
    // on disk.
    let artifact = memory
        .paths()
        .into_iter()
        .find(|path| path.starts_with("/cache"))
        .expect("artifact written to the memory cache");
    assert!(memory.contains(&artifact));
    assert!(!artifact.to_string_lossy().ends_with(".tmp"));
}

#[test]
fn nested_views_and_enumeration_work_against_memory() {
    let (_memory, vellum) = memory_pipeline();

    assert_eq!(
        vellum.render("pages.about", json!({"app": "demo"})).unwrap(),
        "About demo"
    );

    let matched = vellum.composer("*", |_| {});
    assert_eq!(
        matched,
        vec!["home".to_string(), "pages.about".to_string()]
    );
}

#[test]
fn pre_bound_event_bus_receives_hooks() {
    let memory = Rc::new(MemoryFilesystem::new());
    memory.seed("/views/home.vellum", "{{ marker }}");

    let container = Rc::new(Container::new());
    let files = memory.clone();
    container.bind_if("files", move |_| Ok(files.clone() as Rc<dyn Filesystem>));

    // Pre-bind an event bus with a listener already attached; the factory
    // must dispatch through it.
    container.bind_if("events", |_| {
        let events = Dispatcher::new();
        events.listen(
            "composing: home",
            Rc::new(|view: &mut vellum::View| {
                view.with("marker", "from pre-bound bus");
            }),
        );
        Ok(events)
    });

    let vellum = Vellum::with_container("/views", "/cache", container).unwrap();
    assert_eq!(
        vellum.render("home", json!({})).unwrap(),
        "from pre-bound bus"
    );
}

#[test]
fn container_is_shared_and_inspectable() {
    let (_memory, vellum) = memory_pipeline();
    let container = vellum.container();

    assert!(container.has("view"));
    assert!(container.has("template.compiler"));
    assert!(container.has("view.engine.resolver"));

    // Nothing resolved twice: the factory handle is the memoized instance.
    let factory = container.get::<vellum::ViewFactory>("view").unwrap();
    assert!(Rc::ptr_eq(&factory, vellum.factory()));
}
