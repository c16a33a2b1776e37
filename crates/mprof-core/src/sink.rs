//! Output sink: CSV rows to disk plus a console mirror.
//!
//! A [`Sink`] is a cheap handle; clones share one writer behind a mutex.
//! One lock scope covers a whole round for both destinations, so rounds
//! emitted from concurrent sampling threads never interleave their lines.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local};

use crate::error::ProfileError;
use crate::model::{Sample, SampleSet, SampleValue};

/// Destinations written each round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Console mirror and the CSV file.
    #[default]
    Both,
    /// Console mirror only.
    Console,
    /// CSV file only.
    Csv,
}

/// Where and how a sink writes.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Directory for CSV files, created if absent.
    pub data_dir: PathBuf,
    /// Explicit file name; derived from the process name and the run start
    /// time when `None`, so repeated runs never collide.
    pub file_name: Option<String>,
    pub format: OutputFormat,
}

impl SinkConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            file_name: None,
            format: OutputFormat::default(),
        }
    }
}

/// Formats one sample as a CSV row: `timestamp,label,value`, text values
/// double-quoted.
pub fn csv_row(sample: &Sample) -> String {
    format!("{},{},{}", sample.timestamp, sample.label, sample.value)
}

/// Parses a row produced by [`csv_row`] back into a sample.
pub fn parse_csv_row(row: &str) -> Option<Sample> {
    let (timestamp, rest) = row.split_once(',')?;
    let (label, value) = rest.split_once(',')?;

    let timestamp = timestamp.parse().ok()?;
    let value = match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(text) => SampleValue::Text(text.to_string()),
        None => SampleValue::Integer(value.parse().ok()?),
    };

    Some(Sample {
        timestamp,
        label: label.to_string(),
        value,
    })
}

struct CsvFile {
    path: PathBuf,
    /// Opened in append mode on first emit.
    writer: Option<BufWriter<File>>,
}

impl CsvFile {
    fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        match &mut self.writer {
            Some(writer) => Ok(writer),
            writer => {
                let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
                Ok(writer.insert(BufWriter::new(file)))
            }
        }
    }
}

struct SinkInner {
    console: Option<Box<dyn Write + Send>>,
    file: Option<CsvFile>,
}

impl SinkInner {
    fn write_round(&mut self, set: &SampleSet) -> Result<(), ProfileError> {
        if let Some(console) = self.console.as_mut() {
            for sample in &set.samples {
                writeln!(console, "{} {} {}", sample.timestamp, sample.label, sample.value)?;
            }
            // blank line separates rounds
            writeln!(console)?;
        }

        if let Some(file) = self.file.as_mut() {
            let writer = file.writer()?;
            for sample in &set.samples {
                writeln!(writer, "{}", csv_row(sample))?;
            }
            // a killed run loses at most the in-flight round
            writer.flush()?;
        }

        Ok(())
    }
}

/// Shared-handle sink over one console writer and one CSV file.
#[derive(Clone)]
pub struct Sink {
    inner: Arc<Mutex<SinkInner>>,
}

impl Sink {
    /// Creates a sink writing to stdout and a CSV file under
    /// `config.data_dir`. The directory is created here; the file itself is
    /// opened lazily on the first emitted round.
    pub fn new(
        config: &SinkConfig,
        process_name: &str,
        started: DateTime<Local>,
    ) -> Result<Self, ProfileError> {
        Self::build(config, process_name, started, Box::new(io::stdout()))
    }

    /// Same as [`Sink::new`] but with a caller-supplied console writer.
    /// Tests use this to capture the console mirror.
    pub fn with_console(
        config: &SinkConfig,
        process_name: &str,
        started: DateTime<Local>,
        console: Box<dyn Write + Send>,
    ) -> Result<Self, ProfileError> {
        Self::build(config, process_name, started, console)
    }

    fn build(
        config: &SinkConfig,
        process_name: &str,
        started: DateTime<Local>,
        console: Box<dyn Write + Send>,
    ) -> Result<Self, ProfileError> {
        let console = match config.format {
            OutputFormat::Csv => None,
            _ => Some(console),
        };

        let file = match config.format {
            OutputFormat::Console => None,
            _ => {
                std::fs::create_dir_all(&config.data_dir)?;
                let name = config
                    .file_name
                    .clone()
                    .unwrap_or_else(|| derive_file_name(process_name, started));
                Some(CsvFile {
                    path: config.data_dir.join(name),
                    writer: None,
                })
            }
        };

        Ok(Self {
            inner: Arc::new(Mutex::new(SinkInner { console, file })),
        })
    }

    /// Writes one round to both destinations under a single lock scope and
    /// flushes the file.
    pub fn emit(&self, set: &SampleSet) -> Result<(), ProfileError> {
        let mut inner = self.inner.lock().unwrap();
        inner.write_round(set)
    }

    /// Path of the CSV file, if this sink writes one.
    pub fn path(&self) -> Option<PathBuf> {
        let inner = self.inner.lock().unwrap();
        inner.file.as_ref().map(|f| f.path.clone())
    }
}

/// `mprof_<name>_<YYYYmmdd-HHMMSS>.csv`, with the name reduced to
/// filesystem-safe characters.
fn derive_file_name(process_name: &str, started: DateTime<Local>) -> String {
    let safe: String = process_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("mprof_{}_{}.csv", safe, started.format("%Y%m%d-%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sample;
    use chrono::TimeZone;
    use std::thread;

    /// Console writer backed by a shared buffer, for capturing the mirror.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn start_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap()
    }

    fn round(timestamp: i64, label_prefix: &str) -> SampleSet {
        SampleSet {
            timestamp,
            samples: vec![
                Sample::integer(timestamp, format!("{}Rss", label_prefix), 1024),
                Sample::integer(timestamp, format!("{}Swap", label_prefix), 0),
                Sample::text(timestamp, format!("{}Name", label_prefix), "worker"),
            ],
        }
    }

    #[test]
    fn csv_row_round_trips_both_value_kinds() {
        let integer = Sample::integer(1700000000, "VmRSS", 1048576);
        let text = Sample::text(1700000000, "ProcName", "worker");

        assert_eq!(csv_row(&integer), "1700000000,VmRSS,1048576");
        assert_eq!(csv_row(&text), "1700000000,ProcName,\"worker\"");

        assert_eq!(parse_csv_row(&csv_row(&integer)).unwrap(), integer);
        assert_eq!(parse_csv_row(&csv_row(&text)).unwrap(), text);
        assert!(parse_csv_row("not a row").is_none());
    }

    #[test]
    fn emitted_rounds_read_back_in_field_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = SinkConfig::new(dir.path());
        let sink =
            Sink::with_console(&config, "worker", start_time(), Box::<SharedBuf>::default())
                .unwrap();

        let set = round(1700000000, "Vm");
        sink.emit(&set).unwrap();

        let content = std::fs::read_to_string(sink.path().unwrap()).unwrap();
        let rows: Vec<Sample> = content.lines().map(|l| parse_csv_row(l).unwrap()).collect();
        assert_eq!(rows, set.samples);
    }

    #[test]
    fn file_name_derives_from_name_and_start_time() {
        let dir = tempfile::tempdir().unwrap();
        let config = SinkConfig::new(dir.path());
        let sink =
            Sink::with_console(&config, "my worker", start_time(), Box::<SharedBuf>::default())
                .unwrap();

        let path = sink.path().unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "mprof_my_worker_20240301-123045.csv"
        );
    }

    #[test]
    fn explicit_file_name_is_used_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SinkConfig::new(dir.path());
        config.file_name = Some("run.csv".to_string());
        let sink =
            Sink::with_console(&config, "worker", start_time(), Box::<SharedBuf>::default())
                .unwrap();

        assert_eq!(sink.path().unwrap(), dir.path().join("run.csv"));
    }

    #[test]
    fn console_mirror_quotes_text_and_separates_rounds() {
        let dir = tempfile::tempdir().unwrap();
        let config = SinkConfig::new(dir.path());
        let console = SharedBuf::default();
        let sink =
            Sink::with_console(&config, "worker", start_time(), Box::new(console.clone()))
                .unwrap();

        sink.emit(&round(1, "Vm")).unwrap();
        sink.emit(&round(2, "Vm")).unwrap();

        let mirror = console.contents();
        assert_eq!(
            mirror,
            "1 VmRss 1024\n1 VmSwap 0\n1 VmName \"worker\"\n\n\
             2 VmRss 1024\n2 VmSwap 0\n2 VmName \"worker\"\n\n"
        );
    }

    #[test]
    fn console_only_format_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SinkConfig::new(dir.path().join("sub"));
        config.format = OutputFormat::Console;
        let sink =
            Sink::with_console(&config, "worker", start_time(), Box::<SharedBuf>::default())
                .unwrap();

        sink.emit(&round(1, "Vm")).unwrap();
        assert!(sink.path().is_none());
        // console-only sinks never create the data directory either
        assert!(!dir.path().join("sub").exists());
    }

    #[test]
    fn file_creation_is_lazy() {
        let dir = tempfile::tempdir().unwrap();
        let config = SinkConfig::new(dir.path());
        let sink =
            Sink::with_console(&config, "worker", start_time(), Box::<SharedBuf>::default())
                .unwrap();

        let path = sink.path().unwrap();
        assert!(!path.exists());

        sink.emit(&round(1, "Vm")).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn concurrent_rounds_stay_contiguous_in_both_destinations() {
        let dir = tempfile::tempdir().unwrap();
        let config = SinkConfig::new(dir.path());
        let console = SharedBuf::default();
        let sink =
            Sink::with_console(&config, "worker", start_time(), Box::new(console.clone()))
                .unwrap();

        const ROUNDS: usize = 50;
        let mut workers = Vec::new();
        for prefix in ["A", "B"] {
            let sink = sink.clone();
            workers.push(thread::spawn(move || {
                for t in 0..ROUNDS {
                    sink.emit(&round(t as i64, prefix)).unwrap();
                }
            }));
        }
        for worker in workers {
            worker.join().unwrap();
        }

        // console: every blank-line-separated block is one homogeneous round
        let mirror = console.contents();
        let blocks: Vec<&str> = mirror.split("\n\n").filter(|b| !b.is_empty()).collect();
        assert_eq!(blocks.len(), 2 * ROUNDS);
        for block in &blocks {
            let lines: Vec<&str> = block.lines().collect();
            assert_eq!(lines.len(), 3);
            let prefix = &lines[0].split_whitespace().nth(1).unwrap()[..1];
            assert!(lines.iter().all(|l| {
                l.split_whitespace().nth(1).unwrap().starts_with(prefix)
            }));
        }

        // file: rows group into whole rounds as well
        let content = std::fs::read_to_string(sink.path().unwrap()).unwrap();
        let rows: Vec<&str> = content.lines().collect();
        assert_eq!(rows.len(), 3 * 2 * ROUNDS);
        for chunk in rows.chunks(3) {
            let sample = parse_csv_row(chunk[0]).unwrap();
            let prefix = &sample.label[..1];
            assert!(chunk.iter().all(|row| {
                let sample = parse_csv_row(row).unwrap();
                sample.label.starts_with(prefix) && sample.timestamp == chunk_timestamp(chunk)
            }));
        }
    }

    fn chunk_timestamp(chunk: &[&str]) -> i64 {
        parse_csv_row(chunk[0]).unwrap().timestamp
    }
}
