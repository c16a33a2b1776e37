//! Error taxonomy for the sampling engine.

use std::io;

/// Errors surfaced by resolution, parsing, collection, and output.
///
/// Resolution failures (`NotFound`, `AmbiguousMatch`, `InvalidPattern`) are
/// fatal at startup. `MalformedLine` is reported per line and never aborts a
/// document scan. `ProcessGone` and `Io` during the running loop terminate it.
#[derive(Debug)]
pub enum ProfileError {
    /// No process matched the pattern, or the explicit pid has no record.
    NotFound(String),
    /// Two or more processes matched the pattern; carries their pids.
    AmbiguousMatch(Vec<u32>),
    /// The name pattern is not a valid regular expression.
    InvalidPattern(regex::Error),
    /// A status line does not have the `Label: value [kB]` shape.
    MalformedLine(String),
    /// The target's status document vanished between rounds.
    ProcessGone(u32, io::Error),
    /// Output destination or system status document inaccessible.
    Io(io::Error),
}

impl std::fmt::Display for ProfileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileError::NotFound(what) => write!(f, "no process found for {}", what),
            ProfileError::AmbiguousMatch(pids) => {
                let pids: Vec<String> = pids.iter().map(|p| p.to_string()).collect();
                write!(f, "pattern matches more than one process: {}", pids.join(" "))
            }
            ProfileError::InvalidPattern(e) => write!(f, "invalid process pattern: {}", e),
            ProfileError::MalformedLine(line) => {
                write!(f, "malformed status line: \"{}\"", line)
            }
            ProfileError::ProcessGone(pid, e) => {
                write!(f, "process {} disappeared: {}", pid, e)
            }
            ProfileError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ProfileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProfileError::ProcessGone(_, e) | ProfileError::Io(e) => Some(e),
            ProfileError::InvalidPattern(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ProfileError {
    fn from(e: io::Error) -> Self {
        ProfileError::Io(e)
    }
}
