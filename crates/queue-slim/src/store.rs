//! File access seam for the compactors.
//!
//! Compactors never touch `std::fs` directly. Production runs use
//! [`FsStore`]; tests inject content and capture writes with [`MemoryStore`].

use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Reads and writes whole documents.
pub trait Store {
    /// Read a file, returning `Ok(None)` when it does not exist.
    fn read(&self, path: &Path) -> io::Result<Option<String>>;

    /// Create a new file. Fails if `path` already exists.
    fn create_new(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Replace the contents of an existing file.
    fn overwrite(&self, path: &Path, content: &str) -> io::Result<()>;
}

/// Source of the archive timestamp.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

/// Wall clock in local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

/// Archive timestamp with second resolution, e.g. `20260131235959`.
pub fn archive_stamp(clock: &dyn Clock) -> String {
    clock.now().format("%Y%m%d%H%M%S").to_string()
}

/// Real file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

impl Store for FsStore {
    fn read(&self, path: &Path) -> io::Result<Option<String>> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn create_new(&self, path: &Path, content: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()
    }

    /// Write to a sibling temp file, then rename over the target.
    fn overwrite(&self, path: &Path, content: &str) -> io::Result<()> {
        let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
        temp_name.push(".tmp");
        let temp_path = path.with_file_name(temp_name);

        std::fs::write(&temp_path, content)?;
        if let Err(e) = std::fs::rename(&temp_path, path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e);
        }
        Ok(())
    }
}

/// In-memory store for tests.
///
/// Paths listed with [`MemoryStore::fail_writes_to`] reject writes with
/// `PermissionDenied`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<BTreeMap<PathBuf, String>>,
    failing: Mutex<Vec<PathBuf>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file.
    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(path.into(), content.into());
        self
    }

    /// Make every write to `path` fail.
    pub fn fail_writes_to(self, path: impl Into<PathBuf>) -> Self {
        self.failing
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(path.into());
        self
    }

    /// Current content of a file.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(path.as_ref())
            .cloned()
    }

    /// All stored paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    fn check_writable(&self, path: &Path) -> io::Result<()> {
        let failing = self.failing.lock().unwrap_or_else(|p| p.into_inner());
        if failing.iter().any(|p| p == path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("write to {} rejected", path.display()),
            ));
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn read(&self, path: &Path) -> io::Result<Option<String>> {
        Ok(self.get(path))
    }

    fn create_new(&self, path: &Path, content: &str) -> io::Result<()> {
        self.check_writable(path)?;
        let mut files = self.files.lock().unwrap_or_else(|p| p.into_inner());
        if files.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            ));
        }
        files.insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn overwrite(&self, path: &Path, content: &str) -> io::Result<()> {
        self.check_writable(path)?;
        self.files
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }
}
