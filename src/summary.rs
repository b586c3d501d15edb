//! Per-(article, subject) summary records and their persisted row layout.
//!
//! A summary file starts with the version marker line followed by one row per summary:
//!
//! ```text
//! #relevance_summary	v1
//! articleID	subjectKey	title	abstract	taxonomyBranch	heading	keyword	chemical
//! ```
//!
//! Column order and count are a stable contract; any change bumps the version marker.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::warn;

use crate::constants::flat_file::SKIP_MALFORMED_MSG;
use crate::constants::summary::{FIELD_COUNT, FIELD_DELIMITER, FORMAT_VERSION, VERSION_MARKER};
use crate::errors::RelevanceError;
use crate::scoring::Signal;
use crate::types::{ArticleId, SubjectKey};

/// Six signal scores for one article against one subject.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelevanceSummary {
    /// Scored article.
    pub article_id: ArticleId,
    /// Subject scored against.
    pub subject_key: SubjectKey,
    /// Scores indexed by [`Signal::index`].
    pub scores: [i32; Signal::COUNT],
}

impl RelevanceSummary {
    /// Build a summary from scores in [`Signal::ALL`] order.
    pub fn new(
        article_id: impl Into<ArticleId>,
        subject_key: impl Into<SubjectKey>,
        scores: [i32; Signal::COUNT],
    ) -> Self {
        Self {
            article_id: article_id.into(),
            subject_key: subject_key.into(),
            scores,
        }
    }

    /// Score of one signal.
    pub fn score(&self, signal: Signal) -> i32 {
        self.scores[signal.index()]
    }

    /// True when at least one signal is strictly positive.
    pub fn keep(&self) -> bool {
        keep(self)
    }

    /// Render as one delimited row, without a line terminator.
    pub fn to_row(&self) -> String {
        self.to_string()
    }

    /// Parse one delimited row.
    pub fn from_row(row: &str) -> Result<Self, RelevanceError> {
        let malformed = |reason: String| RelevanceError::MalformedRecord {
            kind: "summary",
            location: row.to_string(),
            reason,
        };
        let fields: Vec<&str> = row.split(FIELD_DELIMITER).collect();
        if fields.len() != FIELD_COUNT {
            return Err(malformed(format!(
                "expected {FIELD_COUNT} fields, found {}",
                fields.len()
            )));
        }
        if fields[0].is_empty() || fields[1].is_empty() {
            return Err(malformed("empty article id or subject key".to_string()));
        }
        let mut scores = [0; Signal::COUNT];
        for (slot, raw) in scores.iter_mut().zip(&fields[2..]) {
            *slot = raw
                .parse()
                .map_err(|_| malformed(format!("score '{raw}' is not an integer")))?;
        }
        Ok(Self::new(fields[0], fields[1], scores))
    }
}

impl fmt::Display for RelevanceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{FIELD_DELIMITER}{}", self.article_id, self.subject_key)?;
        for score in &self.scores {
            write!(f, "{FIELD_DELIMITER}{score}")?;
        }
        Ok(())
    }
}

/// Keep predicate: at least one strictly positive signal.
pub fn keep(summary: &RelevanceSummary) -> bool {
    summary.scores.iter().any(|score| *score > 0)
}

/// The version marker line, without a line terminator.
pub fn version_header() -> String {
    format!("{VERSION_MARKER}{FIELD_DELIMITER}{FORMAT_VERSION}")
}

/// Check a version marker line.
pub fn check_version_header(line: &str) -> Result<(), RelevanceError> {
    match line.split_once(FIELD_DELIMITER) {
        Some((VERSION_MARKER, FORMAT_VERSION)) => Ok(()),
        Some((VERSION_MARKER, other)) => {
            Err(RelevanceError::UnsupportedSummaryVersion(other.to_string()))
        }
        _ => Err(RelevanceError::UnsupportedSummaryVersion(line.to_string())),
    }
}

/// Read every summary in a persisted file. The version marker is required; malformed
/// rows are logged and skipped.
pub fn read_summary_file(path: &Path) -> Result<Vec<RelevanceSummary>, RelevanceError> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();
    let header = lines.next().transpose()?.unwrap_or_default();
    check_version_header(header.trim_end_matches('\r'))?;
    let mut summaries = Vec::new();
    for (idx, line) in lines.enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        match RelevanceSummary::from_row(line) {
            Ok(summary) => summaries.push(summary),
            Err(err) => warn!(
                path = %path.display(),
                line = idx + 2,
                error = %err,
                SKIP_MALFORMED_MSG
            ),
        }
    }
    Ok(summaries)
}

/// Re-apply [`keep`] to a persisted file, writing survivors to `output`. Returns
/// `(kept, discarded)`.
pub fn filter_summary_file(input: &Path, output: &Path) -> Result<(usize, usize), RelevanceError> {
    let summaries = read_summary_file(input)?;
    let persist_err = |source: std::io::Error| RelevanceError::Persistence {
        path: output.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(output).map_err(persist_err)?);
    writeln!(writer, "{}", version_header()).map_err(persist_err)?;
    let mut kept = 0;
    for summary in summaries.iter().filter(|summary| summary.keep()) {
        writeln!(writer, "{summary}").map_err(persist_err)?;
        kept += 1;
    }
    writer.flush().map_err(persist_err)?;
    Ok((kept, summaries.len() - kept))
}
