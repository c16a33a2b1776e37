//! Remote deployment: ship the binary, run the same CLI over ssh, pull the
//! produced data back.
//!
//! This is glue around `rsync` and `ssh`; the sampling engine is never
//! involved. The remote side runs with the same arguments, minus the remote
//! flags and with the data directory rewritten under the remote directory.

use std::io;
use std::process::Command;

use tracing::info;

use crate::{Args, FormatArg};

/// Where the remote run writes its CSV files, relative to `--remote-dir`.
const REMOTE_DATA_DIR: &str = "mprof_data";

pub fn run(args: &Args) -> io::Result<()> {
    // clap guarantees the host when --remote is set
    let host = args
        .remote_host
        .as_deref()
        .ok_or_else(|| io::Error::other("--remote-host is required with --remote"))?;
    let destination = destination(args.remote_user.as_deref(), host);

    let exe = std::env::current_exe()?;
    let exe_name = exe
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| io::Error::other("cannot determine executable name"))?;

    info!("deploying {} to {}:{}", exe_name, destination, args.remote_dir);
    run_checked(
        ssh(args)
            .arg(&destination)
            .arg(format!("mkdir -p {}", args.remote_dir)),
        "ssh mkdir",
    )?;
    run_checked(
        rsync(args)
            .arg(&exe)
            .arg(format!("{}:{}/", destination, args.remote_dir)),
        "rsync deploy",
    )?;

    let remote_cmd = remote_command(args, exe_name);
    info!("running on {}: {}", destination, remote_cmd);
    // blocks until the remote run ends (Ctrl-C propagates through ssh -t)
    run_checked(
        ssh(args).arg("-t").arg(&destination).arg(&remote_cmd),
        "ssh run",
    )?;

    // console-only runs leave nothing behind to retrieve
    if args.format != FormatArg::Console {
        info!("retrieving {} into {}", REMOTE_DATA_DIR, args.data_dir.display());
        std::fs::create_dir_all(&args.data_dir)?;
        run_checked(
            rsync(args)
                .arg(format!(
                    "{}:{}/{}/",
                    destination, args.remote_dir, REMOTE_DATA_DIR
                ))
                .arg(&args.data_dir),
            "rsync retrieve",
        )?;
    }

    info!("remote run done");
    Ok(())
}

/// `ssh`, with the identity file when one was given.
fn ssh(args: &Args) -> Command {
    let mut command = Command::new("ssh");
    if let Some(identity) = &args.remote_identity {
        command.arg("-i").arg(identity);
    }
    command
}

/// `rsync -az`, tunneled through the same ssh settings.
fn rsync(args: &Args) -> Command {
    let mut command = Command::new("rsync");
    command.arg("-az");
    if let Some(identity) = &args.remote_identity {
        command.arg("-e").arg(format!("ssh -i {}", identity.display()));
    }
    command
}

/// `user@host`, or just `host` when no user is given (ssh config decides).
fn destination(user: Option<&str>, host: &str) -> String {
    match user {
        Some(user) => format!("{}@{}", user, host),
        None => host.to_string(),
    }
}

/// The command line executed on the remote host: same CLI, remote flags
/// stripped, data directory under the remote directory.
fn remote_command(args: &Args, exe_name: &str) -> String {
    let mut cmd = format!(
        "{}/{} -d {}/{} -i {}",
        args.remote_dir, exe_name, args.remote_dir, REMOTE_DATA_DIR, args.interval
    );
    if let Some(pattern) = &args.procname {
        cmd.push_str(&format!(" -p '{}'", pattern));
    }
    if let Some(pid) = args.pid {
        cmd.push_str(&format!(" -P {}", pid));
    }
    if let Some(file) = &args.output_file {
        cmd.push_str(&format!(" --output-file '{}'", file));
    }
    cmd.push_str(&format!(" --history {}", args.history));
    if args.format != FormatArg::Both {
        cmd.push_str(&format!(" --format {}", format_name(args.format)));
    }
    cmd
}

fn format_name(format: FormatArg) -> &'static str {
    match format {
        FormatArg::Both => "both",
        FormatArg::Console => "console",
        FormatArg::Csv => "csv",
    }
}

fn run_checked(command: &mut Command, what: &str) -> io::Result<()> {
    let status = command.status()?;
    if !status.success() {
        return Err(io::Error::other(format!("{} exited with {}", what, status)));
    }
    Ok(())
}
