//! File synchronization between the orchestrator and its backends.
//!
//! Backends receive a snapshot of the project files with every `runFile`
//! request and hand back the files the program created or modified. The
//! write-back side is a trait so the hosting application decides where
//! files actually live; [`FileStore`] is the in-memory implementation used
//! by the CLI and the tests.

use crate::output::FileMap;
use std::sync::{Arc, Mutex};

/// Receives files a backend reports as created or modified.
pub trait FileSink: Send + Sync {
    fn apply_updates(&self, updates: FileMap);
}

/// In-memory project file store.
#[derive(Debug, Default, Clone)]
pub struct FileStore {
    files: Arc<Mutex<FileMap>>,
}

impl FileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace or insert one file.
    pub fn write(&self, name: impl Into<String>, content: impl Into<String>) {
        self.files
            .lock()
            .expect("file store poisoned")
            .insert(name.into(), content.into());
    }

    pub fn read(&self, name: &str) -> Option<String> {
        self.files
            .lock()
            .expect("file store poisoned")
            .get(name)
            .cloned()
    }

    /// Snapshot of every file, for shipping with a `runFile` request.
    pub fn snapshot(&self) -> FileMap {
        self.files.lock().expect("file store poisoned").clone()
    }

    pub fn remove(&self, name: &str) -> Option<String> {
        self.files.lock().expect("file store poisoned").remove(name)
    }

    pub fn len(&self) -> usize {
        self.files.lock().expect("file store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FileSink for FileStore {
    fn apply_updates(&self, updates: FileMap) {
        let mut files = self.files.lock().expect("file store poisoned");
        for (name, content) in updates {
            files.insert(name, content);
        }
    }
}
