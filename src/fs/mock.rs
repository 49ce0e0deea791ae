// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    /// Yields the given bytes, then fails the next read.
    FailingFile(Vec<u8>),
    Dir,
}

/// In-memory filesystem keyed by exact path.
///
/// Also counts open handles so tests can check every handle gets released.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
    open_handles: Arc<Mutex<usize>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut files = self.files.lock().unwrap();
        files.insert(path.as_ref().to_path_buf(), MockEntry::File(content.into()));
    }

    pub fn add_failing_file(&self, path: impl AsRef<Path>, prefix: impl Into<Vec<u8>>) {
        let mut files = self.files.lock().unwrap();
        files.insert(
            path.as_ref().to_path_buf(),
            MockEntry::FailingFile(prefix.into()),
        );
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut files = self.files.lock().unwrap();
        files.insert(path.as_ref().to_path_buf(), MockEntry::Dir);
    }

    /// Number of readers handed out and not yet dropped.
    pub fn open_handles(&self) -> usize {
        *self.open_handles.lock().unwrap()
    }

    fn track<R: Read + Send + 'static>(&self, inner: R) -> Box<dyn Read + Send> {
        *self.open_handles.lock().unwrap() += 1;
        Box::new(TrackedReader {
            inner,
            open_handles: Arc::clone(&self.open_handles),
        })
    }
}

impl FileSystem for MockFileSystem {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let entry = self.files.lock().unwrap().get(path).cloned();
        match entry {
            Some(MockEntry::File(content)) => Ok(self.track(Cursor::new(content))),
            Some(MockEntry::FailingFile(prefix)) => {
                Ok(self.track(Cursor::new(prefix).chain(FailingReader)))
            }
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }
}

struct FailingReader;

impl Read for FailingReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::other("simulated read failure"))
    }
}

struct TrackedReader<R> {
    inner: R,
    open_handles: Arc<Mutex<usize>>,
}

impl<R: Read> Read for TrackedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R> Drop for TrackedReader<R> {
    fn drop(&mut self) {
        let mut open = self.open_handles.lock().unwrap();
        *open = open.saturating_sub(1);
    }
}
