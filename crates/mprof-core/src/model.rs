//! Sample data types shared by the collector, history, and sinks.

use serde::{Deserialize, Serialize};

/// Identity of the profiled process, resolved once at startup and immutable
/// for the lifetime of the run. Liveness is not re-validated; later kernel
/// read failures surface per round as collection errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessHandle {
    pub pid: u32,
    /// Display name taken from the process's command-line record.
    pub name: String,
}

/// Value of one sample.
///
/// Memory counters are normalized to bytes; identity fields (process name,
/// host name) are text. Rendering is exhaustive per variant: integers print
/// bare, text prints double-quoted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleValue {
    Integer(u64),
    Text(String),
}

impl std::fmt::Display for SampleValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleValue::Integer(v) => write!(f, "{}", v),
            SampleValue::Text(v) => write!(f, "\"{}\"", v),
        }
    }
}

/// One observation: (timestamp, label, value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Unix timestamp (seconds since epoch) of the round this belongs to.
    pub timestamp: i64,
    pub label: String,
    pub value: SampleValue,
}

impl Sample {
    pub fn integer(timestamp: i64, label: impl Into<String>, value: u64) -> Self {
        Self {
            timestamp,
            label: label.into(),
            value: SampleValue::Integer(value),
        }
    }

    pub fn text(timestamp: i64, label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            timestamp,
            label: label.into(),
            value: SampleValue::Text(value.into()),
        }
    }
}

/// All samples collected in one round, sharing one timestamp.
///
/// Segment order is fixed at collection time (identity, then system-wide,
/// then process-specific) and never re-sorted. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSet {
    pub timestamp: i64,
    pub samples: Vec<Sample>,
}
