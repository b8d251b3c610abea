//! Log Setup
//!
//! Events go to stdout and to one plain-text file per calendar day
//! (`<dir>/log-YYYY-MM-DD.txt`). Files older than the retention window are
//! deleted at startup and whenever the day rolls over.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Days, Local, NaiveDate};
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt};

const FILE_PREFIX: &str = "log-";
const FILE_SUFFIX: &str = ".txt";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Install the global subscriber: stdout plus dated log files
pub fn init(log_files: DailyFileWriter) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(log_files),
        )
        .init();
}

/// Appends to today's log file, switching files when the date changes
pub struct DailyFileWriter {
    dir: PathBuf,
    retention_days: u32,
    current: Mutex<Option<DayFile>>,
}

struct DayFile {
    date: NaiveDate,
    file: File,
}

impl DailyFileWriter {
    /// Create the log directory if needed and prune expired files
    pub fn new(dir: impl Into<PathBuf>, retention_days: u32) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let writer = Self {
            dir,
            retention_days,
            current: Mutex::new(None),
        };
        writer.prune(Local::now().date_naive())?;

        Ok(writer)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(date: NaiveDate) -> String {
        format!("{FILE_PREFIX}{}{FILE_SUFFIX}", date.format(DATE_FORMAT))
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(Self::file_name(date))
    }

    /// Date encoded in a log file name, `None` for any other file
    fn date_of(file_name: &str) -> Option<NaiveDate> {
        let date = file_name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
        NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
    }

    /// Delete log files that are `retention_days` or more days old.
    ///
    /// Returns how many files were removed. Files that do not follow the log
    /// naming scheme are left alone. A retention of 0 keeps everything.
    pub fn prune(&self, today: NaiveDate) -> io::Result<usize> {
        if self.retention_days == 0 {
            return Ok(0);
        }
        let Some(cutoff) = today.checked_sub_days(Days::new(u64::from(self.retention_days))) else {
            return Ok(0);
        };

        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(date) = name.to_str().and_then(Self::date_of) else {
                continue;
            };

            if date <= cutoff && entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }

        Ok(removed)
    }

    fn write_on(&self, date: NaiveDate, buf: &[u8]) -> io::Result<usize> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;

        let day = match current.take() {
            Some(day) if day.date == date => day,
            previous => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(self.path_for(date))?;
                if previous.is_some() {
                    // Day rolled over. A failed prune must not drop the log line.
                    let _ = self.prune(date);
                }
                DayFile { date, file }
            }
        };

        current.insert(day).file.write(buf)
    }

    fn flush_current(&self) -> io::Result<()> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;

        match current.as_mut() {
            Some(day) => day.file.flush(),
            None => Ok(()),
        }
    }
}

/// Per-event handle handed out to the `fmt` layer
pub struct DailyFileHandle<'a> {
    writer: &'a DailyFileWriter,
}

impl Write for DailyFileHandle<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write_on(Local::now().date_naive(), buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush_current()
    }
}

impl<'a> MakeWriter<'a> for DailyFileWriter {
    type Writer = DailyFileHandle<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        DailyFileHandle { writer: self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn test_file_name() {
        assert_eq!(DailyFileWriter::file_name(date(2026, 3, 7)), "log-2026-03-07.txt");
        assert_eq!(DailyFileWriter::date_of("log-2026-03-07.txt"), Some(date(2026, 3, 7)));
        assert_eq!(DailyFileWriter::date_of("log-latest.txt"), None);
        assert_eq!(DailyFileWriter::date_of("notes.txt"), None);
    }

    #[test]
    fn test_new_creates_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("logs");

        let writer = DailyFileWriter::new(&dir, 30).unwrap();
        assert!(writer.dir().is_dir());
    }

    #[test]
    fn test_writes_append_to_dated_file() {
        let root = tempfile::tempdir().unwrap();
        let writer = DailyFileWriter::new(root.path(), 30).unwrap();

        writer.write_on(date(2026, 3, 7), b"first\n").unwrap();
        writer.write_on(date(2026, 3, 7), b"second\n").unwrap();
        writer.flush_current().unwrap();

        let content = fs::read_to_string(writer.path_for(date(2026, 3, 7))).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn test_rolls_over_to_new_day() {
        let root = tempfile::tempdir().unwrap();
        let writer = DailyFileWriter::new(root.path(), 30).unwrap();

        writer.write_on(date(2026, 3, 7), b"before midnight\n").unwrap();
        writer.write_on(date(2026, 3, 8), b"after midnight\n").unwrap();

        let day_one = fs::read_to_string(writer.path_for(date(2026, 3, 7))).unwrap();
        let day_two = fs::read_to_string(writer.path_for(date(2026, 3, 8))).unwrap();
        assert_eq!(day_one, "before midnight\n");
        assert_eq!(day_two, "after midnight\n");
    }

    #[test]
    fn test_prune_removes_only_expired_logs() {
        let root = tempfile::tempdir().unwrap();
        let writer = DailyFileWriter::new(root.path(), 7).unwrap();

        touch(root.path(), "log-2026-02-01.txt");
        touch(root.path(), "log-2026-02-28.txt");
        touch(root.path(), "log-2026-03-06.txt");
        touch(root.path(), "notes.txt");

        let removed = writer.prune(date(2026, 3, 7)).unwrap();

        assert_eq!(removed, 2);
        assert!(!root.path().join("log-2026-02-01.txt").exists());
        assert!(!root.path().join("log-2026-02-28.txt").exists());
        assert!(root.path().join("log-2026-03-06.txt").exists());
        assert!(root.path().join("notes.txt").exists());
    }

    #[test]
    fn test_rollover_prunes() {
        let root = tempfile::tempdir().unwrap();
        let writer = DailyFileWriter::new(root.path(), 1).unwrap();

        writer.write_on(date(2026, 3, 1), b"old\n").unwrap();
        writer.write_on(date(2026, 3, 7), b"new\n").unwrap();

        assert!(!writer.path_for(date(2026, 3, 1)).exists());
        assert!(writer.path_for(date(2026, 3, 7)).exists());
    }
}
