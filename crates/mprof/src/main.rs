//! mprof — memory usage profiler for a single target process.
//!
//! Resolves the target once, then samples its memory counters (plus a few
//! system-wide ones) every interval, appending each round to a CSV file
//! with a console mirror. With `--remote`, deploys itself to another host
//! and runs there instead.

mod remote;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Local;
use clap::{Parser, ValueEnum};
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use mprof_core::collector::{ProcessResolver, RealFs, SampleCollector};
use mprof_core::profiler::{Profiler, ProfilerConfig};
use mprof_core::sink::{OutputFormat, Sink, SinkConfig};

/// Memory usage profiler for a single target process.
#[derive(Parser)]
#[command(name = "mprof", about = "Per-process memory usage profiler", version)]
pub struct Args {
    /// Process name pattern (regular expression) to locate the target.
    #[arg(short = 'p', long)]
    pub procname: Option<String>,

    /// Explicit process id; skips the pattern search.
    #[arg(short = 'P', long)]
    pub pid: Option<u32>,

    /// Directory for CSV output files.
    #[arg(short = 'd', long, default_value = "mprof_data")]
    pub data_dir: PathBuf,

    /// Output file name; derived from the process name and start time
    /// when omitted.
    #[arg(long)]
    pub output_file: Option<String>,

    /// Sampling interval in seconds.
    #[arg(short, long, default_value = "1")]
    pub interval: u64,

    /// Output destinations.
    #[arg(long, value_enum, default_value_t = FormatArg::Both)]
    pub format: FormatArg,

    /// Number of recent rounds kept in memory.
    #[arg(long, default_value = "10")]
    pub history: usize,

    /// Path to the proc filesystem (for testing).
    #[arg(long, default_value = "/proc")]
    pub proc_path: String,

    /// Deploy to a remote host and run there.
    #[arg(short = 'r', long, requires = "remote_host")]
    pub remote: bool,

    /// Remote host to deploy to.
    #[arg(long)]
    pub remote_host: Option<String>,

    /// User for the remote connection.
    #[arg(long)]
    pub remote_user: Option<String>,

    /// Identity file (private key) for the remote connection; without it,
    /// the ssh configuration decides.
    #[arg(long)]
    pub remote_identity: Option<PathBuf>,

    /// Directory on the remote host for the deployed binary and its data.
    #[arg(long, default_value = "~/mprof")]
    pub remote_dir: String,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Both,
    Console,
    Csv,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Both => OutputFormat::Both,
            FormatArg::Console => OutputFormat::Console,
            FormatArg::Csv => OutputFormat::Csv,
        }
    }
}

/// Initializes the tracing subscriber. Default level is INFO; `-q` limits
/// output to errors.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("mprof={}", level).parse().unwrap())
        .add_directive(format!("mprof_core={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if args.remote {
        return match remote::run(&args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("remote run failed: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    run_local(&args)
}

fn run_local(args: &Args) -> ExitCode {
    let fs = RealFs::new();

    let resolver = ProcessResolver::new(fs, &args.proc_path);
    let target = match resolver.resolve(args.pid, args.procname.as_deref()) {
        Ok(target) => target,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(2);
        }
    };
    info!("profiling \"{}\" (pid {})", target.name, target.pid);

    let sink_config = SinkConfig {
        data_dir: args.data_dir.clone(),
        file_name: args.output_file.clone(),
        format: args.format.into(),
    };
    let sink = match Sink::new(&sink_config, &target.name, Local::now()) {
        Ok(sink) => sink,
        Err(e) => {
            error!("cannot set up output: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(path) = sink.path() {
        info!("writing samples to {}", path.display());
    }

    // Cooperative shutdown: Ctrl-C flips the flag, the loop finishes its
    // in-flight round and exits at the next tick boundary.
    let stop = Arc::new(AtomicBool::new(false));
    let stop_signal = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        stop_signal.store(true, Ordering::SeqCst);
    }) {
        error!("failed to set Ctrl-C handler: {}", e);
        return ExitCode::FAILURE;
    }

    let collector = SampleCollector::new(fs, &args.proc_path, target);
    let config = ProfilerConfig {
        interval: Duration::from_secs(args.interval.max(1)),
        history_capacity: args.history,
    };

    let handle = match Profiler::new(collector, sink, config, stop).spawn() {
        Ok(handle) => handle,
        Err(e) => {
            error!("failed to start sampling thread: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match handle.wait(Duration::from_secs(1)) {
        Ok(()) => {
            info!("shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("sampling loop failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
