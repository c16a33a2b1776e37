//! Filesystem abstraction over the kernel status interface.
//!
//! Status documents are virtual read-only text files, so two operations
//! cover everything the profiler does: read a document, list a directory.
//! Production uses [`RealFs`]; tests use [`super::MockFs`].

use std::io;
use std::path::{Path, PathBuf};

/// Read-only access to status documents.
pub trait FileSystem: Send + Sync {
    /// Reads an entire status document as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Lists entries of a directory (used to enumerate process identifiers).
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Real filesystem, delegating to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(path)? {
            paths.push(entry?.path());
        }
        Ok(paths)
    }
}
