//! Summary sinks.
//!
//! Each destination file sits behind its own writer lock and every row is emitted with a
//! single `write_all`, so concurrent subject workers never interleave partial lines.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::constants::summary::FILE_EXTENSION;
use crate::errors::RelevanceError;
use crate::summary::{RelevanceSummary, version_header};

/// Destination for computed summaries.
pub trait SummarySink: Send + Sync {
    /// Persist one summary.
    fn write(&self, summary: &RelevanceSummary) -> Result<(), RelevanceError>;
    /// Flush everything written so far for `subject_key`.
    fn flush_subject(&self, subject_key: &str) -> Result<(), RelevanceError>;
}

/// Writes one summary file per subject under a directory, appending across runs.
///
/// Open files are tracked by path, so subject keys that sanitize to the same file stem
/// share one handle and one version header.
pub struct SummaryDirectoryWriter {
    root: PathBuf,
    files: Mutex<HashMap<PathBuf, Arc<Mutex<SubjectFile>>>>,
}

struct SubjectFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl SummaryDirectoryWriter {
    /// Create a writer rooted at `root`, creating the directory when needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, RelevanceError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| RelevanceError::Persistence {
            path: root.clone(),
            source,
        })?;
        Ok(Self {
            root,
            files: Mutex::new(HashMap::new()),
        })
    }

    /// Output directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File that summaries for `subject_key` are appended to.
    pub fn subject_path(&self, subject_key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{FILE_EXTENSION}", sanitize_file_stem(subject_key)))
    }

    fn subject_file(&self, subject_key: &str) -> Result<Arc<Mutex<SubjectFile>>, RelevanceError> {
        let path = self.subject_path(subject_key);
        let mut files = self.files.lock().map_err(|_| self.poisoned(subject_key))?;
        if let Some(file) = files.get(&path) {
            return Ok(file.clone());
        }
        let persist_err = |source: std::io::Error| RelevanceError::Persistence {
            path: path.clone(),
            source,
        };
        let is_new = !path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(persist_err)?;
        let mut writer = BufWriter::new(file);
        if is_new {
            writeln!(writer, "{}", version_header()).map_err(persist_err)?;
        }
        let handle = Arc::new(Mutex::new(SubjectFile {
            path: path.clone(),
            writer,
        }));
        files.insert(path, handle.clone());
        Ok(handle)
    }

    fn poisoned(&self, subject_key: &str) -> RelevanceError {
        RelevanceError::Persistence {
            path: self.subject_path(subject_key),
            source: std::io::Error::other("summary writer lock poisoned"),
        }
    }
}

impl SummarySink for SummaryDirectoryWriter {
    fn write(&self, summary: &RelevanceSummary) -> Result<(), RelevanceError> {
        let handle = self.subject_file(&summary.subject_key)?;
        let mut file = handle
            .lock()
            .map_err(|_| self.poisoned(&summary.subject_key))?;
        let row = format!("{summary}\n");
        let SubjectFile { path, writer } = &mut *file;
        writer
            .write_all(row.as_bytes())
            .map_err(|source| RelevanceError::Persistence {
                path: path.clone(),
                source,
            })
    }

    fn flush_subject(&self, subject_key: &str) -> Result<(), RelevanceError> {
        let handle = {
            let files = self.files.lock().map_err(|_| self.poisoned(subject_key))?;
            match files.get(&self.subject_path(subject_key)) {
                Some(handle) => handle.clone(),
                None => return Ok(()),
            }
        };
        let mut file = handle.lock().map_err(|_| self.poisoned(subject_key))?;
        let SubjectFile { path, writer } = &mut *file;
        writer.flush().map_err(|source| RelevanceError::Persistence {
            path: path.clone(),
            source,
        })
    }
}

/// Collects summaries in memory.
#[derive(Default)]
pub struct MemorySink {
    summaries: Mutex<Vec<RelevanceSummary>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything collected so far.
    pub fn take(&self) -> Vec<RelevanceSummary> {
        std::mem::take(&mut *self.summaries.lock().expect("memory sink poisoned"))
    }
}

impl SummarySink for MemorySink {
    fn write(&self, summary: &RelevanceSummary) -> Result<(), RelevanceError> {
        self.summaries
            .lock()
            .expect("memory sink poisoned")
            .push(summary.clone());
        Ok(())
    }

    fn flush_subject(&self, _subject_key: &str) -> Result<(), RelevanceError> {
        Ok(())
    }
}

/// Map a subject key to a portable file stem.
pub fn sanitize_file_stem(key: &str) -> String {
    let stem: String = key
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_start_matches('.');
    if stem.is_empty() {
        "_".to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::read_summary_file;
    use tempfile::tempdir;

    #[test]
    fn sanitize_replaces_path_characters() {
        assert_eq!(sanitize_file_stem("covid/long term"), "covid_long_term");
        assert_eq!(sanitize_file_stem("../etc"), "_etc");
        assert_eq!(sanitize_file_stem(""), "_");
    }

    #[test]
    fn directory_writer_appends_with_single_header() {
        let temp = tempdir().unwrap();
        let first = RelevanceSummary::new("1", "statin", [1, 0, 0, 0, 0, 0]);
        let second = RelevanceSummary::new("2", "statin", [0, 2, 0, 0, 0, 0]);
        {
            let writer = SummaryDirectoryWriter::new(temp.path()).unwrap();
            writer.write(&first).unwrap();
            writer.flush_subject("statin").unwrap();
        }
        let writer = SummaryDirectoryWriter::new(temp.path()).unwrap();
        writer.write(&second).unwrap();
        writer.flush_subject("statin").unwrap();

        let path = writer.subject_path("statin");
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("#relevance_summary").count(), 1);
        assert_eq!(read_summary_file(&path).unwrap(), vec![first, second]);
    }

    #[test]
    fn colliding_subject_keys_share_one_file_and_header() {
        let temp = tempdir().unwrap();
        let writer = SummaryDirectoryWriter::new(temp.path()).unwrap();
        assert_eq!(writer.subject_path("a/b"), writer.subject_path("a_b"));
        let slash = RelevanceSummary::new("1", "a/b", [1, 0, 0, 0, 0, 0]);
        let underscore = RelevanceSummary::new("2", "a_b", [0, 1, 0, 0, 0, 0]);
        std::thread::scope(|scope| {
            scope.spawn(|| writer.write(&slash).unwrap());
            scope.spawn(|| writer.write(&underscore).unwrap());
        });
        writer.flush_subject("a/b").unwrap();

        let path = writer.subject_path("a_b");
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("#relevance_summary").count(), 1);
        let mut rows = read_summary_file(&path).unwrap();
        rows.sort_by(|left, right| left.article_id.cmp(&right.article_id));
        assert_eq!(rows, vec![slash, underscore]);
    }

    #[test]
    fn memory_sink_collects_in_order() {
        let sink = MemorySink::new();
        sink.write(&RelevanceSummary::new("1", "s", [0; 6])).unwrap();
        sink.write(&RelevanceSummary::new("2", "s", [0; 6])).unwrap();
        let ids: Vec<String> = sink.take().into_iter().map(|s| s.article_id).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert!(sink.take().is_empty());
    }
}
