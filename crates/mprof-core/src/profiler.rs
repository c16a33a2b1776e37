//! The sampling loop: collect → history → sink, once per interval.
//!
//! The loop runs on its own named thread and owns its [`BoundedHistory`]
//! outright, so the window needs no locking. Shutdown is cooperative: the
//! driver sets the shared stop flag, the loop finishes the round already in
//! flight, and exits at the next tick boundary. A collection or output
//! error ends the loop immediately and surfaces through the handle; there
//! is no automatic re-resolution of the target.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{Level, debug, enabled, info};

use crate::collector::{FileSystem, SampleCollector};
use crate::error::ProfileError;
use crate::history::{self, BoundedHistory};
use crate::sink::Sink;

/// How often the interval sleep re-checks the stop flag.
const STOP_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct ProfilerConfig {
    /// Time between sampling rounds.
    pub interval: Duration,
    /// Rounds retained in memory.
    pub history_capacity: usize,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            history_capacity: history::DEFAULT_CAPACITY,
        }
    }
}

/// One sampling run, ready to be spawned onto its own thread.
pub struct Profiler<F: FileSystem> {
    collector: SampleCollector<F>,
    sink: Sink,
    config: ProfilerConfig,
    stop: Arc<AtomicBool>,
}

impl<F: FileSystem + Send + 'static> Profiler<F> {
    pub fn new(
        collector: SampleCollector<F>,
        sink: Sink,
        config: ProfilerConfig,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            collector,
            sink,
            config,
            stop,
        }
    }

    /// Starts the sampling thread.
    pub fn spawn(self) -> Result<ProfilerHandle, ProfileError> {
        let thread = thread::Builder::new()
            .name("mprof-sampler".to_string())
            .spawn(move || self.run())?;
        Ok(ProfilerHandle { thread })
    }

    fn run(self) -> Result<(), ProfileError> {
        let target = self.collector.target();
        debug!(
            "sampling \"{}\" (pid {}) every {:?}, keeping {} rounds",
            target.name, target.pid, self.config.interval, self.config.history_capacity
        );

        let mut history = BoundedHistory::new(self.config.history_capacity);
        let mut rounds: u64 = 0;

        while !self.stop.load(Ordering::SeqCst) {
            let timestamp = unix_now();
            let set = self.collector.collect(timestamp)?;
            history.push(set);
            if let Some(last) = history.last() {
                self.sink.emit(last)?;
            }

            rounds += 1;
            if enabled!(Level::DEBUG) {
                debug!("round {}:\n{}", rounds, history.format());
            }

            self.sleep_interval();
        }

        info!("sampling stopped after {} rounds", rounds);
        Ok(())
    }

    /// Waits out the configured interval in short slices so a stop request
    /// is observed within [`STOP_POLL`].
    fn sleep_interval(&self) {
        let mut remaining = self.config.interval;
        while remaining > Duration::ZERO && !self.stop.load(Ordering::SeqCst) {
            let step = remaining.min(STOP_POLL);
            thread::sleep(step);
            remaining = remaining.saturating_sub(step);
        }
    }
}

/// Handle to a running sampling thread.
pub struct ProfilerHandle {
    thread: JoinHandle<Result<(), ProfileError>>,
}

impl ProfilerHandle {
    /// Whether the sampling thread has exited (cleanly or not).
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the sampling thread with a bounded poll instead of an
    /// unbounded block, then joins and returns the loop's outcome. The
    /// caller stays free to observe its own signals between polls.
    pub fn wait(self, poll: Duration) -> Result<(), ProfileError> {
        while !self.thread.is_finished() {
            thread::sleep(poll);
        }
        match self.thread.join() {
            Ok(outcome) => outcome,
            Err(_) => Err(ProfileError::Io(io::Error::other("sampling thread panicked"))),
        }
    }
}

/// Seconds since the unix epoch.
fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
