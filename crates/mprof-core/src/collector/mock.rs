//! In-memory filesystem for testing the collection path without `/proc`.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use super::traits::FileSystem;

/// Meminfo document used by [`MockFs::sample_system`]: 16 GiB total,
/// half free, 4 GiB swap untouched.
pub const SAMPLE_MEMINFO: &str = "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:            0 kB
SwapTotal:       4096000 kB
SwapFree:        4096000 kB
";

/// In-memory filesystem keyed by path.
///
/// Parent directories are created implicitly, so fixtures stay short.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    files: HashMap<PathBuf, String>,
    directories: HashSet<PathBuf>,
}

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small but complete system: hostname, meminfo, and one running
    /// process (pid 4321, `/usr/bin/worker --batch`) with memory counters.
    pub fn sample_system() -> Self {
        let mut fs = Self::new();
        fs.add_file("/proc/sys/kernel/hostname", "testhost\n");
        fs.add_file("/proc/meminfo", SAMPLE_MEMINFO);
        fs.add_target(
            4321,
            "/usr/bin/worker\0--batch\0",
            "Name:\tworker\n\
             Pid:\t4321\n\
             VmPeak:\t   30000 kB\n\
             VmSize:\t   25000 kB\n\
             VmLck:\t        0 kB\n\
             VmHWM:\t    9000 kB\n\
             VmRSS:\t    8000 kB\n\
             VmData:\t    2000 kB\n\
             VmStk:\t     136 kB\n\
             VmExe:\t     500 kB\n\
             VmLib:\t    3000 kB\n\
             VmPTE:\t      60 kB\n\
             VmSwap:\t       0 kB\n\
             Threads:\t4\n",
        );
        fs
    }

    /// Adds a file, creating parent directories along the way.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Adds a process entry under `/proc/<pid>/` with its command-line
    /// record and memory-status document.
    pub fn add_target(&mut self, pid: u32, cmdline: &str, status: &str) {
        let base = PathBuf::from(format!("/proc/{}", pid));
        self.add_dir(&base);
        self.add_file(base.join("cmdline"), cmdline);
        self.add_file(base.join("status"), status);
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("file not found: {:?}", path))
        })
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {:?}", path),
            ));
        }

        let mut entries = HashSet::new();
        for file_path in self.files.keys() {
            if file_path.parent().is_some_and(|parent| parent == path) {
                entries.insert(file_path.clone());
            }
        }
        for dir_path in &self.directories {
            if dir_path.parent().is_some_and(|parent| parent == path) && dir_path != path {
                entries.insert(dir_path.clone());
            }
        }

        Ok(entries.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_file_creates_parents() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/1234/status", "VmRSS:\t100 kB\n");

        assert!(fs.read_to_string(Path::new("/proc/1234/status")).is_ok());
        assert_eq!(fs.read_dir(Path::new("/proc")).unwrap().len(), 1);
    }

    #[test]
    fn read_dir_lists_direct_children_only() {
        let mut fs = MockFs::new();
        fs.add_target(1, "init\0", "VmRSS:\t1 kB\n");
        fs.add_target(2, "kthreadd\0", "VmRSS:\t1 kB\n");

        let entries = fs.read_dir(Path::new("/proc")).unwrap();
        assert_eq!(entries.len(), 2);

        let pid_entries = fs.read_dir(Path::new("/proc/1")).unwrap();
        assert_eq!(pid_entries.len(), 2); // cmdline and status
    }

    #[test]
    fn missing_paths_report_not_found() {
        let fs = MockFs::new();
        let err = fs.read_to_string(Path::new("/nope")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(fs.read_dir(Path::new("/nope")).is_err());
    }
}
