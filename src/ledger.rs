//! Append-only record of which (batch, subject) pairs have been persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

use crate::constants::ledger::{DEFAULT_LEDGER_FILENAME, SKIP_MALFORMED_ENTRY_MSG};
use crate::errors::RelevanceError;
use crate::types::{BatchId, SubjectKey};

/// One ledger line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionEntry {
    /// Batch the subject was scored against.
    pub batch_id: BatchId,
    /// Subject whose summaries were persisted.
    pub subject_key: SubjectKey,
    /// When the contribution was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// JSON-lines ledger guarding against persisting the same subject twice for one batch.
pub struct ContributionLedger {
    path: PathBuf,
    state: Mutex<LedgerState>,
}

struct LedgerState {
    recorded: HashSet<(BatchId, SubjectKey)>,
    file: File,
}

impl fmt::Debug for ContributionLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContributionLedger")
            .field("path", &self.path)
            .field("entries", &self.len())
            .finish()
    }
}

impl ContributionLedger {
    /// Open (or create) the ledger at `path`. A directory path resolves to the default
    /// ledger filename inside it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RelevanceError> {
        let path = coerce_ledger_path(path.into());
        ensure_parent_dir(&path)?;
        let recorded = read_entries(&path)?
            .into_iter()
            .map(|entry| (entry.batch_id, entry.subject_key))
            .collect();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| RelevanceError::Persistence {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            path,
            state: Mutex::new(LedgerState { recorded, file }),
        })
    }

    /// Ledger file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when `subject_key` was already recorded for `batch_id`.
    pub fn is_recorded(&self, batch_id: &str, subject_key: &str) -> bool {
        let state = self.state.lock().expect("ledger state poisoned");
        state
            .recorded
            .contains(&(batch_id.to_string(), subject_key.to_string()))
    }

    /// Append an entry and flush it. Returns false when the pair was already recorded.
    pub fn record(&self, batch_id: &str, subject_key: &str) -> Result<bool, RelevanceError> {
        let mut state = self.state.lock().expect("ledger state poisoned");
        let key = (batch_id.to_string(), subject_key.to_string());
        if state.recorded.contains(&key) {
            return Ok(false);
        }
        let entry = ContributionEntry {
            batch_id: key.0.clone(),
            subject_key: key.1.clone(),
            recorded_at: Utc::now(),
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        let persist_err = |source: io::Error| RelevanceError::Persistence {
            path: self.path.clone(),
            source,
        };
        state.file.write_all(line.as_bytes()).map_err(persist_err)?;
        state.file.flush().map_err(persist_err)?;
        state.recorded.insert(key);
        Ok(true)
    }

    /// Number of recorded pairs.
    pub fn len(&self) -> usize {
        self.state.lock().expect("ledger state poisoned").recorded.len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Re-read every entry from disk in file order.
    pub fn entries(&self) -> Result<Vec<ContributionEntry>, RelevanceError> {
        read_entries(&self.path)
    }
}

fn read_entries(path: &Path) -> Result<Vec<ContributionEntry>, RelevanceError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    let mut entries = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ContributionEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(err) => warn!(
                path = %path.display(),
                line = idx + 1,
                error = %err,
                SKIP_MALFORMED_ENTRY_MSG
            ),
        }
    }
    Ok(entries)
}

fn coerce_ledger_path(path: PathBuf) -> PathBuf {
    if path.is_dir() {
        return path.join(DEFAULT_LEDGER_FILENAME);
    }
    path
}

fn ensure_parent_dir(path: &Path) -> Result<(), RelevanceError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn record_is_idempotent_and_survives_reopen() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("ledger.jsonl");
        {
            let ledger = ContributionLedger::open(&path).unwrap();
            assert!(ledger.is_empty());
            assert!(ledger.record("b1", "statin").unwrap());
            assert!(!ledger.record("b1", "statin").unwrap());
            assert!(ledger.record("b2", "statin").unwrap());
        }
        let ledger = ContributionLedger::open(&path).unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.is_recorded("b1", "statin"));
        assert!(!ledger.is_recorded("b1", "covid"));
        let entries = ledger.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].batch_id, "b2");
    }

    #[test]
    fn directory_path_uses_default_filename() {
        let temp = tempdir().unwrap();
        let ledger = ContributionLedger::open(temp.path()).unwrap();
        assert_eq!(ledger.path(), temp.path().join(DEFAULT_LEDGER_FILENAME));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("ledger.jsonl");
        fs::write(
            &path,
            "not json\n{\"batch_id\":\"b1\",\"subject_key\":\"s\",\"recorded_at\":\"2024-01-01T00:00:00Z\"}\n",
        )
        .unwrap();
        let ledger = ContributionLedger::open(&path).unwrap();
        assert_eq!(ledger.len(), 1);
        assert!(ledger.is_recorded("b1", "s"));
    }
}
