//! The JSON operation log written during execution.
//!
//! While a run is in progress every event is appended to a JSON Lines
//! journal next to the log. An entry is journaled before its move with
//! `committed: false` and a commit record follows once the move finished,
//! so an interrupted run still leaves a record of the move that was in
//! flight. When the run ends the journal is folded into the final JSON
//! document and removed. Both files load as an [`OperationLog`].

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use shelfwise_core::paths::unique_path;

use crate::error::ExecuteError;

/// Format version written into operation logs.
pub const LOG_VERSION: &str = "1.0";

const LOG_FILE_PREFIX: &str = "operations_";
const LOG_FILE_EXTENSION: &str = "json";
const JOURNAL_EXTENSION: &str = "jsonl";

/// What a log entry moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[default]
    File,
    Directory,
}

/// One recorded move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub source: PathBuf,
    pub destination: PathBuf,
    #[serde(default)]
    pub kind: EntryKind,
    /// False while the move is in flight.
    #[serde(default = "committed_default")]
    pub committed: bool,
}

fn committed_default() -> bool {
    true
}

/// Everything one run moved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationLog {
    pub version: String,
    /// Run start, `YYYYmmdd_HHMMSS`.
    pub timestamp: String,
    pub root_dir: PathBuf,
    pub operations: Vec<LogEntry>,
    /// Directories the run created, in creation order.
    #[serde(default)]
    pub directories_created: Vec<PathBuf>,
}

impl OperationLog {
    /// Start an empty log for `root_dir`.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            version: LOG_VERSION.to_string(),
            timestamp: Local::now().format("%Y%m%d_%H%M%S").to_string(),
            root_dir: root_dir.into(),
            operations: Vec::new(),
            directories_created: Vec::new(),
        }
    }

    /// Read a finished log, or the journal an interrupted run left behind.
    pub fn load(path: &Path) -> Result<Self, ExecuteError> {
        let text = fs::read_to_string(path).map_err(|source| ExecuteError::ReadLog {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed = if path.extension().and_then(|e| e.to_str()) == Some(JOURNAL_EXTENSION) {
            Self::from_journal(&text)
        } else {
            serde_json::from_str(&text)
        };
        parsed.map_err(|source| ExecuteError::InvalidLog {
            path: path.to_path_buf(),
            source,
        })
    }

    fn from_journal(text: &str) -> Result<Self, serde_json::Error> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty()).peekable();
        let mut log = match lines.next().map(serde_json::from_str::<Record>).transpose()? {
            Some(Record::Header {
                version,
                timestamp,
                root_dir,
            }) => Self {
                version,
                timestamp,
                root_dir,
                operations: Vec::new(),
                directories_created: Vec::new(),
            },
            Some(_) => return Err(serde_json::Error::custom("journal does not start with a header")),
            None => return Err(serde_json::Error::custom("journal is empty")),
        };

        while let Some(line) = lines.next() {
            match serde_json::from_str(line) {
                Ok(record) => log.apply(record),
                // an interrupted write can cut the last line short
                Err(err) if lines.peek().is_none() => {
                    warn!(error = %err, "ignoring truncated journal record");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(log)
    }

    fn apply(&mut self, record: Record) {
        match record {
            Record::Header { .. } => {}
            Record::Move(entry) => self.operations.push(entry),
            Record::Commit { index } => {
                if let Some(entry) = self.operations.get_mut(index) {
                    entry.committed = true;
                }
            }
            Record::Abort { index } => {
                if index < self.operations.len() {
                    self.operations.remove(index);
                }
            }
            Record::Directory { path } => self.directories_created.push(path),
        }
    }

    /// Write the log through a temporary file and a rename.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        write_atomic(path, json.as_bytes())
    }

    /// Entries whose move completed.
    pub fn committed(&self) -> impl Iterator<Item = &LogEntry> {
        self.operations.iter().filter(|entry| entry.committed)
    }

    /// Directory holding the logs for `root`.
    pub fn directory(root: &Path, log_directory: &str) -> PathBuf {
        root.join(log_directory)
    }

    /// The most recent log under `root`, if any.
    pub fn latest(root: &Path, log_directory: &str) -> Option<PathBuf> {
        let entries = fs::read_dir(Self::directory(root, log_directory)).ok()?;
        entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| is_log_file(path))
            .max_by(|a, b| {
                let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
                modified(a)
                    .cmp(&modified(b))
                    .then_with(|| a.file_name().cmp(&b.file_name()))
            })
    }
}

fn is_log_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.starts_with(LOG_FILE_PREFIX)
        && matches!(
            path.extension().and_then(|e| e.to_str()),
            Some(LOG_FILE_EXTENSION | JOURNAL_EXTENSION)
        )
}

/// One journal line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum Record {
    Header {
        version: String,
        timestamp: String,
        root_dir: PathBuf,
    },
    Move(LogEntry),
    Commit { index: usize },
    Abort { index: usize },
    Directory { path: PathBuf },
}

pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

/// Journals a run's moves as the executor works.
///
/// Nothing is written until the first entry, so a run that moves nothing
/// leaves no log behind. Created directories are held back until the next
/// entry is journaled.
#[derive(Debug)]
pub(crate) struct LogWriter {
    path: PathBuf,
    journal_path: PathBuf,
    log: OperationLog,
    journal: Option<File>,
    pending_directories: Vec<PathBuf>,
}

impl LogWriter {
    pub(crate) fn new(root: &Path, log_directory: &str) -> Self {
        let log = OperationLog::new(root);
        let path = OperationLog::directory(root, log_directory).join(format!(
            "{LOG_FILE_PREFIX}{}.{LOG_FILE_EXTENSION}",
            log.timestamp
        ));
        let taken = |p: &Path| p.exists() || p.with_extension(JOURNAL_EXTENSION).exists();
        let path = if taken(&path) {
            unique_path(&path, taken)
        } else {
            path
        };
        let journal_path = path.with_extension(JOURNAL_EXTENSION);
        debug!(path = %path.display(), "operation log prepared");

        Self {
            path,
            journal_path,
            log,
            journal: None,
            pending_directories: Vec::new(),
        }
    }

    /// Record a move about to happen. Returns the entry index.
    pub(crate) fn begin(
        &mut self,
        source: &Path,
        destination: &Path,
        kind: EntryKind,
    ) -> Result<usize, ExecuteError> {
        let mut records: Vec<Record> = self
            .pending_directories
            .iter()
            .map(|path| Record::Directory { path: path.clone() })
            .collect();
        records.push(Record::Move(LogEntry {
            timestamp: Local::now(),
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            kind,
            committed: false,
        }));
        self.append(&records)?;

        self.pending_directories.clear();
        for record in records {
            self.log.apply(record);
        }
        Ok(self.log.operations.len() - 1)
    }

    pub(crate) fn commit(&mut self, index: usize) -> Result<(), ExecuteError> {
        self.record(Record::Commit { index })
    }

    /// Forget an entry whose move did not happen.
    pub(crate) fn abort(&mut self, index: usize) -> Result<(), ExecuteError> {
        self.record(Record::Abort { index })
    }

    pub(crate) fn record_directory(&mut self, path: &Path) {
        self.pending_directories.push(path.to_path_buf());
    }

    /// Write the final log and drop the journal. Returns the log path if
    /// anything was journaled.
    pub(crate) fn finish(mut self) -> Result<Option<PathBuf>, ExecuteError> {
        if self.journal.take().is_none() {
            return Ok(None);
        }
        self.log
            .directories_created
            .extend(self.pending_directories.drain(..));
        self.log.save(&self.path).map_err(|source| ExecuteError::Log {
            path: self.path.clone(),
            source,
        })?;
        if let Err(err) = fs::remove_file(&self.journal_path) {
            warn!(path = %self.journal_path.display(), error = %err, "could not remove journal");
        }
        Ok(Some(self.path))
    }

    /// Journal a record, and apply it in memory even if the write failed.
    fn record(&mut self, record: Record) -> Result<(), ExecuteError> {
        let written = self.append(std::slice::from_ref(&record));
        self.log.apply(record);
        written
    }

    fn append(&mut self, records: &[Record]) -> Result<(), ExecuteError> {
        let journal_path = self.journal_path.clone();
        let log_error = |source: io::Error| ExecuteError::Log {
            path: journal_path.clone(),
            source,
        };

        let mut lines = String::new();
        if self.journal.is_none() {
            let header = Record::Header {
                version: self.log.version.clone(),
                timestamp: self.log.timestamp.clone(),
                root_dir: self.log.root_dir.clone(),
            };
            push_line(&mut lines, &header).map_err(log_error)?;
        }
        for record in records {
            push_line(&mut lines, record).map_err(log_error)?;
        }

        if self.journal.is_none() {
            if let Some(parent) = self.journal_path.parent() {
                fs::create_dir_all(parent).map_err(log_error)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.journal_path)
                .map_err(log_error)?;
            self.journal = Some(file);
        }
        match self.journal.as_mut() {
            Some(file) => file.write_all(lines.as_bytes()).map_err(log_error),
            None => Ok(()),
        }
    }
}

fn push_line(out: &mut String, record: &Record) -> io::Result<()> {
    out.push_str(&serde_json::to_string(record).map_err(io::Error::other)?);
    out.push('\n');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_committed_flag_defaults_to_true() {
        let json = r#"{
            "version": "1.0",
            "timestamp": "20240101_120000",
            "root_dir": "/r",
            "operations": [
                {"timestamp": "2024-01-01T12:00:00+00:00", "source": "/r/a.txt", "destination": "/r/all_Docs/Text/a.txt"}
            ]
        }"#;
        let log: OperationLog = serde_json::from_str(json).unwrap();
        assert_eq!(log.operations.len(), 1);
        assert!(log.operations[0].committed);
        assert_eq!(log.operations[0].kind, EntryKind::File);
        assert!(log.directories_created.is_empty());
    }

    #[test]
    fn test_writer_is_lazy() {
        let dir = TempDir::new().unwrap();
        let writer = LogWriter::new(dir.path(), ".shelfwise");
        assert_eq!(writer.finish().unwrap(), None);
        assert_eq!(OperationLog::latest(dir.path(), ".shelfwise"), None);
        assert!(!dir.path().join(".shelfwise").exists());
    }

    #[test]
    fn test_begin_commit_abort() {
        let dir = TempDir::new().unwrap();
        let mut writer = LogWriter::new(dir.path(), ".shelfwise");

        let first = writer
            .begin(Path::new("/r/a"), Path::new("/r/b"), EntryKind::File)
            .unwrap();
        writer.commit(first).unwrap();
        let second = writer
            .begin(Path::new("/r/c"), Path::new("/r/d"), EntryKind::File)
            .unwrap();
        writer.abort(second).unwrap();

        let path = writer.finish().unwrap().unwrap();
        assert_eq!(OperationLog::latest(dir.path(), ".shelfwise"), Some(path.clone()));

        let log = OperationLog::load(&path).unwrap();
        assert_eq!(log.version, LOG_VERSION);
        assert_eq!(log.operations.len(), 1);
        assert!(log.operations[0].committed);
        // no temp file left behind
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_corrupt_log_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("operations_bad.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            OperationLog::load(&path),
            Err(ExecuteError::InvalidLog { .. })
        ));
    }

    #[test]
    fn test_interrupted_run_leaves_loadable_journal() {
        let dir = TempDir::new().unwrap();
        let mut writer = LogWriter::new(dir.path(), ".shelfwise");
        writer.record_directory(Path::new("/r/all_Docs"));
        let first = writer
            .begin(Path::new("/r/a"), Path::new("/r/all_Docs/a"), EntryKind::File)
            .unwrap();
        writer.commit(first).unwrap();
        writer
            .begin(Path::new("/r/b"), Path::new("/r/all_Docs/b"), EntryKind::File)
            .unwrap();
        // the process dies here
        drop(writer);

        let journal = OperationLog::latest(dir.path(), ".shelfwise").unwrap();
        assert_eq!(journal.extension().unwrap(), "jsonl");
        let mut file = OpenOptions::new().append(true).open(&journal).unwrap();
        file.write_all(br#"{"record":"comm"#).unwrap();

        let log = OperationLog::load(&journal).unwrap();
        assert_eq!(log.root_dir, dir.path());
        assert_eq!(log.directories_created, vec![PathBuf::from("/r/all_Docs")]);
        let committed: Vec<_> = log.operations.iter().map(|e| e.committed).collect();
        assert_eq!(committed, vec![true, false]);
    }

    #[test]
    fn test_journal_must_start_with_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("operations_x.jsonl");
        fs::write(&path, "{\"record\":\"commit\",\"index\":0}\n").unwrap();
        assert!(matches!(
            OperationLog::load(&path),
            Err(ExecuteError::InvalidLog { .. })
        ));
    }
}
