use crate::app::error::RunError;
use crate::app::models::LastInvocation;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const RECENT_FILE: &str = "recent_files.json";
const LAST_FILE: &str = "last_invocation.json";

/// Persistent "recent files" and "last invocation" records.
///
/// Loads never fail: missing or corrupt storage reads as empty state.
/// Mutations rewrite the whole record.
pub trait StateStore {
    fn load_recent(&self) -> Vec<String>;
    fn record_recent(&self, path: &Path) -> Result<(), RunError>;
    fn load_last(&self) -> Option<LastInvocation>;
    fn record_last(&self, last: &LastInvocation) -> Result<(), RunError>;
}

/// Moves `entry` to the front, dropping duplicates and anything past `limit`.
pub fn push_recent(files: &mut Vec<String>, entry: String, limit: usize) {
    files.retain(|f| f != &entry);
    files.insert(0, entry);
    files.truncate(limit);
}

/// JSON documents under the state directory.
pub struct FileStateStore {
    dir: PathBuf,
    recent_limit: usize,
}

impl FileStateStore {
    pub fn new(dir: PathBuf, recent_limit: usize) -> Self {
        Self { dir, recent_limit }
    }

    fn recent_path(&self) -> PathBuf {
        self.dir.join(RECENT_FILE)
    }

    fn last_path(&self) -> PathBuf {
        self.dir.join(LAST_FILE)
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), RunError> {
        let to_write_error = |source| RunError::OutputWrite {
            path: path.to_path_buf(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(to_write_error)?;
        let body = serde_json::to_string_pretty(value)
            .map_err(|e| to_write_error(std::io::Error::other(e)))?;
        fs::write(path, body).map_err(to_write_error)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, RunError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(RunError::PersistenceCorrupt {
                path: path.to_path_buf(),
                message: err.to_string(),
            })
        }
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|err| RunError::PersistenceCorrupt {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
}

fn recover<T>(loaded: Result<Option<T>, RunError>) -> Option<T> {
    loaded.unwrap_or_else(|err| {
        log::warn!("{}; treating as empty", err);
        None
    })
}

impl StateStore for FileStateStore {
    fn load_recent(&self) -> Vec<String> {
        recover(read_json(&self.recent_path())).unwrap_or_default()
    }

    fn record_recent(&self, path: &Path) -> Result<(), RunError> {
        let mut files = self.load_recent();
        push_recent(&mut files, path.display().to_string(), self.recent_limit);
        self.write_json(&self.recent_path(), &files)
    }

    fn load_last(&self) -> Option<LastInvocation> {
        recover(read_json(&self.last_path()))
    }

    fn record_last(&self, last: &LastInvocation) -> Result<(), RunError> {
        self.write_json(&self.last_path(), last)
    }
}

#[cfg(test)]
pub use memory::MemoryStateStore;

#[cfg(test)]
mod memory {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Shared in-memory store; clones observe the same state.
    #[derive(Clone)]
    pub struct MemoryStateStore {
        recent: Rc<RefCell<Vec<String>>>,
        last: Rc<RefCell<Option<LastInvocation>>>,
        limit: usize,
    }

    impl MemoryStateStore {
        pub fn new(limit: usize) -> Self {
            Self {
                recent: Rc::default(),
                last: Rc::default(),
                limit,
            }
        }
    }

    impl StateStore for MemoryStateStore {
        fn load_recent(&self) -> Vec<String> {
            self.recent.borrow().clone()
        }

        fn record_recent(&self, path: &Path) -> Result<(), RunError> {
            push_recent(
                &mut self.recent.borrow_mut(),
                path.display().to_string(),
                self.limit,
            );
            Ok(())
        }

        fn load_last(&self) -> Option<LastInvocation> {
            self.last.borrow().clone()
        }

        fn record_last(&self, last: &LastInvocation) -> Result<(), RunError> {
            *self.last.borrow_mut() = Some(last.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::PromptSpec;
    use tempfile::TempDir;

    fn store(limit: usize) -> (TempDir, FileStateStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStateStore::new(dir.path().join("state"), limit);
        (dir, store)
    }

    #[test]
    fn recording_same_path_twice_keeps_it_first_once() {
        let (_dir, store) = store(10);
        store.record_recent(Path::new("/src/a.py")).unwrap();
        store.record_recent(Path::new("/src/b.py")).unwrap();
        store.record_recent(Path::new("/src/a.py")).unwrap();

        assert_eq!(store.load_recent(), vec!["/src/a.py", "/src/b.py"]);
    }

    #[test]
    fn recent_list_is_truncated_to_limit() {
        let (_dir, store) = store(3);
        for name in ["a", "b", "c", "d", "e"] {
            store.record_recent(&PathBuf::from(format!("/src/{name}"))).unwrap();
        }

        assert_eq!(store.load_recent(), vec!["/src/e", "/src/d", "/src/c"]);
    }

    #[test]
    fn last_invocation_round_trips() {
        let (_dir, store) = store(10);
        assert!(store.load_last().is_none());

        let last = LastInvocation {
            prompt: PromptSpec::File(PathBuf::from("/prompts/refactor.md")),
            source_path: PathBuf::from("/src/main.py"),
        };
        store.record_last(&last).unwrap();

        assert_eq!(store.load_last(), Some(last));
    }

    #[test]
    fn corrupt_state_reads_as_empty() {
        let (_dir, store) = store(10);
        fs::create_dir_all(&store.dir).unwrap();
        fs::write(store.recent_path(), "{not json").unwrap();
        fs::write(store.last_path(), "[]").unwrap();

        assert!(store.load_recent().is_empty());
        assert!(store.load_last().is_none());

        store.record_recent(Path::new("/src/a.py")).unwrap();
        assert_eq!(store.load_recent(), vec!["/src/a.py"]);
    }

    #[test]
    fn corrupt_file_is_reported_before_recovery() {
        let (_dir, store) = store(10);
        fs::create_dir_all(&store.dir).unwrap();
        fs::write(store.last_path(), "garbage").unwrap();

        let err = read_json::<LastInvocation>(&store.last_path()).unwrap_err();
        assert!(matches!(err, RunError::PersistenceCorrupt { .. }));
    }
}
