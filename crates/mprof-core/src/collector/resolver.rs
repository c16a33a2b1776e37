//! Resolves the target process from an explicit pid or a name pattern.
//!
//! Resolution happens exactly once, before the sampling loop starts. The
//! result is a [`ProcessHandle`] that stays fixed for the whole run.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::ProfileError;
use crate::model::ProcessHandle;

use super::traits::FileSystem;

pub struct ProcessResolver<F: FileSystem> {
    fs: F,
    proc_path: String,
    /// Excluded from pattern search so the profiler never profiles itself.
    self_pid: u32,
}

impl<F: FileSystem> ProcessResolver<F> {
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            self_pid: std::process::id(),
        }
    }

    /// Overrides the pid excluded from pattern search (the resolver's own
    /// process by default). Tests use this to stage self-exclusion.
    pub fn with_self_pid(mut self, pid: u32) -> Self {
        self.self_pid = pid;
        self
    }

    /// Produces exactly one handle. An explicit pid wins over the pattern;
    /// with neither, resolution fails up front.
    pub fn resolve(
        &self,
        pid: Option<u32>,
        pattern: Option<&str>,
    ) -> Result<ProcessHandle, ProfileError> {
        match (pid, pattern) {
            (Some(pid), _) => self.resolve_pid(pid),
            (None, Some(pattern)) => self.resolve_pattern(pattern),
            (None, None) => Err(ProfileError::NotFound(
                "no pid or process pattern given".to_string(),
            )),
        }
    }

    /// Uses the identifier directly; only the display name is looked up.
    fn resolve_pid(&self, pid: u32) -> Result<ProcessHandle, ProfileError> {
        let name = self
            .display_name(pid)
            .ok_or_else(|| ProfileError::NotFound(format!("process {}", pid)))?;
        Ok(ProcessHandle { pid, name })
    }

    /// Enumerates running pids and tests the pattern against each one's
    /// command-line record. Processes that exit between enumeration and
    /// inspection are skipped.
    fn resolve_pattern(&self, pattern: &str) -> Result<ProcessHandle, ProfileError> {
        let re = Regex::new(pattern).map_err(ProfileError::InvalidPattern)?;

        let mut matches: Vec<u32> = Vec::new();
        for entry in self.fs.read_dir(Path::new(&self.proc_path))? {
            let Some(pid) = entry
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.parse::<u32>().ok())
            else {
                continue;
            };
            if pid == self.self_pid {
                continue;
            }
            let Ok(cmdline) = self.fs.read_to_string(&entry.join("cmdline")) else {
                continue;
            };
            if re.is_match(&cmdline.replace('\0', " ")) {
                matches.push(pid);
            }
        }
        matches.sort_unstable();

        match matches.as_slice() {
            [] => Err(ProfileError::NotFound(format!("pattern \"{}\"", pattern))),
            [pid] => self.resolve_pid(*pid),
            _ => Err(ProfileError::AmbiguousMatch(matches)),
        }
    }

    /// Display name from the command-line record: argv[0]'s basename, with
    /// `comm` as the fallback for kernel threads whose cmdline is empty.
    fn display_name(&self, pid: u32) -> Option<String> {
        let base = PathBuf::from(format!("{}/{}", self.proc_path, pid));
        let cmdline = self.fs.read_to_string(&base.join("cmdline")).ok()?;

        let name = cmdline
            .replace('\0', " ")
            .split_whitespace()
            .next()
            .map(|argv0| argv0.rsplit('/').next().unwrap_or(argv0).to_string())
            .unwrap_or_default();
        if !name.is_empty() {
            return Some(name);
        }

        self.fs
            .read_to_string(&base.join("comm"))
            .ok()
            .map(|comm| comm.trim().to_string())
            .filter(|comm| !comm.is_empty())
    }
}
