//! Assembles one sampling round from the kernel status documents.

use std::path::PathBuf;

use crate::error::ProfileError;
use crate::model::{ProcessHandle, Sample, SampleSet};

use super::status::{self, PROCESS_FIELDS, SYSTEM_FIELDS};
use super::traits::FileSystem;

/// Collects one [`SampleSet`] per tick for a fixed target.
///
/// Every set carries three segments in declaration order: identity
/// (pid, process name, host name), system-wide memory counters, and the
/// target's memory counters.
pub struct SampleCollector<F: FileSystem> {
    fs: F,
    proc_path: String,
    target: ProcessHandle,
    /// Read once at construction; identity values are never empty.
    hostname: String,
}

impl<F: FileSystem> SampleCollector<F> {
    pub fn new(fs: F, proc_path: impl Into<String>, target: ProcessHandle) -> Self {
        let proc_path = proc_path.into();
        let hostname_path = PathBuf::from(format!("{}/sys/kernel/hostname", proc_path));
        let hostname = fs
            .read_to_string(&hostname_path)
            .ok()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            fs,
            proc_path,
            target,
            hostname,
        }
    }

    pub fn target(&self) -> &ProcessHandle {
        &self.target
    }

    /// Runs one sampling round at `timestamp`.
    ///
    /// An unreadable system document is an I/O failure; an unreadable
    /// process document means the target is gone. Neither is retried here;
    /// the sampling loop decides what a failed round means.
    pub fn collect(&self, timestamp: i64) -> Result<SampleSet, ProfileError> {
        let mut samples = Vec::new();

        samples.push(Sample::integer(timestamp, "PID", u64::from(self.target.pid)));
        samples.push(Sample::text(timestamp, "ProcName", self.target.name.clone()));
        samples.push(Sample::text(timestamp, "Hostname", self.hostname.clone()));

        let meminfo_path = PathBuf::from(format!("{}/meminfo", self.proc_path));
        let meminfo = self.fs.read_to_string(&meminfo_path)?;
        samples.extend(status::collect_fields(&meminfo, timestamp, SYSTEM_FIELDS));

        let status_path =
            PathBuf::from(format!("{}/{}/status", self.proc_path, self.target.pid));
        let process_status = self
            .fs
            .read_to_string(&status_path)
            .map_err(|e| ProfileError::ProcessGone(self.target.pid, e))?;
        samples.extend(status::collect_fields(&process_status, timestamp, PROCESS_FIELDS));

        Ok(SampleSet { timestamp, samples })
    }
}
