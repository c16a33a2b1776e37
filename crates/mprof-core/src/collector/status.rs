//! Parser for `label: value [kB]` status documents.
//!
//! These are pure functions over document text, so they are testable with
//! plain string fixtures. Kilobyte counters are normalized to bytes here;
//! nothing downstream deals in units.

use tracing::warn;

use crate::error::ProfileError;
use crate::model::{Sample, SampleValue};

/// System-wide counters extracted from the memory-status document.
pub const SYSTEM_FIELDS: &[&str] =
    &["MemTotal", "MemFree", "MemAvailable", "SwapTotal", "SwapFree"];

/// Per-process counters extracted from the target's status document.
pub const PROCESS_FIELDS: &[&str] = &[
    "VmPeak", "VmSize", "VmLck", "VmPin", "VmHWM", "VmRSS", "VmData", "VmStk", "VmExe", "VmLib",
    "VmPTE", "VmSwap",
];

/// Unit marker the kernel appends to kilobyte counters.
const KILOBYTE_SUFFIX: &str = "kB";

/// Parses one status line into a [`Sample`] taken at `timestamp`.
///
/// All whitespace is stripped, the line splits at the first colon, and a
/// trailing `kB` marks a kilobyte counter (multiplied out to bytes).
/// A unit-less value parses as a plain integer.
///
/// `VmRSS:   1024 kB` → `Sample { label: "VmRSS", value: 1048576 }`
pub fn parse_status_line(line: &str, timestamp: i64) -> Result<Sample, ProfileError> {
    let malformed = || ProfileError::MalformedLine(line.trim().to_string());

    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    let (label, token) = compact.split_once(':').ok_or_else(malformed)?;
    if label.is_empty() || token.is_empty() {
        return Err(malformed());
    }

    let value = match token.strip_suffix(KILOBYTE_SUFFIX) {
        Some(kilobytes) => {
            let kilobytes: u64 = kilobytes.parse().map_err(|_| malformed())?;
            kilobytes * 1024
        }
        None => token.parse().map_err(|_| malformed())?,
    };

    Ok(Sample {
        timestamp,
        label: label.to_string(),
        value: SampleValue::Integer(value),
    })
}

/// Scans a whole status document and extracts every recognized field.
///
/// Lines are processed in document order; a line counts when its prefix
/// matches any name in `fields`. A recognized line that fails to parse is
/// skipped with a warning rather than aborting the scan, so one odd line
/// never costs a round its remaining fields.
pub fn collect_fields(document: &str, timestamp: i64, fields: &[&str]) -> Vec<Sample> {
    let mut samples = Vec::new();

    for line in document.lines() {
        if !fields.iter().any(|field| line.starts_with(field)) {
            continue;
        }
        match parse_status_line(line, timestamp) {
            Ok(sample) => samples.push(sample),
            Err(e) => warn!("skipping status line: {}", e),
        }
    }

    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_of(sample: &Sample) -> u64 {
        match sample.value {
            SampleValue::Integer(v) => v,
            SampleValue::Text(_) => panic!("expected integer sample"),
        }
    }

    #[test]
    fn kilobyte_lines_normalize_to_bytes() {
        let sample = parse_status_line("VmRSS:   1024 kB", 1700000000).unwrap();
        assert_eq!(sample.label, "VmRSS");
        assert_eq!(value_of(&sample), 1048576);
        assert_eq!(sample.timestamp, 1700000000);
    }

    #[test]
    fn unitless_lines_parse_directly() {
        let sample = parse_status_line("Threads:\t12", 0).unwrap();
        assert_eq!(sample.label, "Threads");
        assert_eq!(value_of(&sample), 12);
    }

    #[test]
    fn tabs_and_spaces_are_stripped() {
        let sample = parse_status_line("VmPeak:\t  30000 kB ", 0).unwrap();
        assert_eq!(value_of(&sample), 30000 * 1024);
    }

    #[test]
    fn line_without_colon_is_malformed() {
        let err = parse_status_line("no colon here", 0).unwrap_err();
        assert!(matches!(err, ProfileError::MalformedLine(_)));
    }

    #[test]
    fn non_numeric_value_is_malformed() {
        assert!(parse_status_line("State:\tS (sleeping)", 0).is_err());
        assert!(parse_status_line("VmRSS:", 0).is_err());
    }

    #[test]
    fn collect_fields_follows_line_order() {
        let doc = "MemTotal: 100 kB\nIgnored: 5\nSwapFree: 50 kB\nMemFree: 25 kB\n";
        let samples = collect_fields(doc, 7, SYSTEM_FIELDS);

        let labels: Vec<&str> = samples.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["MemTotal", "SwapFree", "MemFree"]);
        assert!(samples.iter().all(|s| s.timestamp == 7));
    }

    #[test]
    fn collect_fields_skips_malformed_recognized_line() {
        let doc = "MemTotal: garbage\nMemFree: 25 kB\n";
        let samples = collect_fields(doc, 0, SYSTEM_FIELDS);

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].label, "MemFree");
        assert_eq!(value_of(&samples[0]), 25 * 1024);
    }

    #[test]
    fn collect_fields_ignores_unrecognized_labels() {
        let doc = "Buffers: 512 kB\nCached: 2048 kB\n";
        assert!(collect_fields(doc, 0, SYSTEM_FIELDS).is_empty());
    }

    #[test]
    fn process_fields_cover_the_vm_counters() {
        let doc = "VmPeak:\t30000 kB\nVmSize:\t25000 kB\nVmSwap:\t0 kB\n";
        let samples = collect_fields(doc, 0, PROCESS_FIELDS);
        assert_eq!(samples.len(), 3);
        assert_eq!(value_of(&samples[2]), 0);
    }
}
