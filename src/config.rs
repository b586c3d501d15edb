use std::num::NonZeroUsize;
use std::path::PathBuf;

use crate::constants::ledger::DEFAULT_LEDGER_FILENAME;
use crate::errors::RelevanceError;

/// Controls a scoring run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoringConfig {
    /// Worker threads in the bounded scoring pool.
    pub worker_threads: usize,
    /// Drop summaries with no strictly positive signal before they reach a sink.
    pub keep_only_relevant: bool,
    /// Directory receiving one summary file per subject.
    pub output_dir: PathBuf,
    /// Contribution ledger location; `None` disables duplicate-contribution tracking.
    pub ledger_path: Option<PathBuf>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            worker_threads: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            keep_only_relevant: true,
            output_dir: PathBuf::from("relevance_summaries"),
            ledger_path: None,
        }
    }
}

impl ScoringConfig {
    /// Override the pool size.
    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }

    /// Toggle the keep filter.
    pub fn with_keep_only_relevant(mut self, keep_only_relevant: bool) -> Self {
        self.keep_only_relevant = keep_only_relevant;
        self
    }

    /// Override the summary output directory.
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Enable the contribution ledger at `ledger_path`.
    pub fn with_ledger_path(mut self, ledger_path: impl Into<PathBuf>) -> Self {
        self.ledger_path = Some(ledger_path.into());
        self
    }

    /// Ledger inside the output directory using the default filename.
    pub fn default_ledger_path(&self) -> PathBuf {
        self.output_dir.join(DEFAULT_LEDGER_FILENAME)
    }

    /// Reject settings that cannot drive a run.
    pub fn validate(&self) -> Result<(), RelevanceError> {
        if self.worker_threads == 0 {
            return Err(RelevanceError::Configuration(
                "worker_threads must be greater than zero".to_string(),
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(RelevanceError::Configuration(
                "output_dir must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
