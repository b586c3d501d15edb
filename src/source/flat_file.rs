use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

use crate::constants::flat_file::{
    ABSTRACTS_FILE, ARTICLES_FILE, CHEMICALS_FILE, COMMENT_PREFIX, DELETED_FILE, FIELD_DELIMITER,
    HEADINGS_FILE, KEYWORDS_FILE, OCCURRENCE_SEPARATOR, SKIP_MALFORMED_MSG, TITLES_FILE,
};
use crate::data::{ChemicalRecord, HeadingRecord, KeywordRecord, LemmaRecord, Occurrence};
use crate::errors::RelevanceError;
use crate::lemma::LemmaSequence;
use crate::lemmatizer::{BasicLemmatizer, Lemmatizer};
use crate::source::ArticleBatch;
use crate::types::{ArticleId, BatchId};

/// Batch backed by a directory of tab-delimited attribute files.
///
/// Every file is optional. Blank lines and lines starting with `#` are ignored.
/// Malformed rows are logged and skipped; an unreadable file fails the batch.
///
/// The article column of an attribute file is `<id>` for the article's first appearance
/// in `articles.tsv`, or `<id>#<n>` for its `n`th appearance.
pub struct FlatFileBatch {
    id: BatchId,
    root: PathBuf,
    lemmatizer: Arc<dyn Lemmatizer>,
}

impl FlatFileBatch {
    /// Open the batch rooted at `root`; the batch id defaults to the directory name.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let id = root
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("batch")
            .to_string();
        Self {
            id,
            root,
            lemmatizer: Arc::new(BasicLemmatizer),
        }
    }

    /// Override the batch id.
    pub fn with_batch_id(mut self, id: impl Into<BatchId>) -> Self {
        self.id = id.into();
        self
    }

    /// Lemmatizer used for keyword rows that carry no lemma column.
    pub fn with_lemmatizer(mut self, lemmatizer: Arc<dyn Lemmatizer>) -> Self {
        self.lemmatizer = lemmatizer;
        self
    }

    /// Batch directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read `file`, returning `(line_number, line)` pairs for data lines. A missing file
    /// yields no rows.
    fn data_lines(&self, file: &str) -> Result<Vec<(usize, String)>, RelevanceError> {
        let path = self.root.join(file);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(RelevanceError::BatchUnavailable {
                    batch_id: self.id.clone(),
                    reason: format!("{}: {err}", path.display()),
                });
            }
        };
        Ok(text
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
            .filter(|(_, line)| !line.trim().is_empty() && !line.starts_with(COMMENT_PREFIX))
            .map(|(idx, line)| (idx, line.to_string()))
            .collect())
    }

    fn parse_rows<T>(
        &self,
        file: &'static str,
        parse: impl Fn(&[&str]) -> Result<T, String>,
    ) -> Result<Vec<T>, RelevanceError> {
        let mut rows = Vec::new();
        for (line_no, line) in self.data_lines(file)? {
            let fields: Vec<&str> = line.split(FIELD_DELIMITER).map(str::trim).collect();
            match parse(&fields) {
                Ok(row) => rows.push(row),
                Err(reason) => {
                    let err = RelevanceError::MalformedRecord {
                        kind: file,
                        location: format!("{}:{line_no}", self.root.join(file).display()),
                        reason,
                    };
                    warn!(batch_id = %self.id, error = %err, SKIP_MALFORMED_MSG);
                }
            }
        }
        Ok(rows)
    }

    fn id_list(&self, file: &'static str) -> Result<Vec<ArticleId>, RelevanceError> {
        self.parse_rows(file, |fields| match fields {
            [article] if !article.is_empty() => Ok(article.to_string()),
            _ => Err("expected a single article id".to_string()),
        })
    }

    fn lemma_rows(
        &self,
        file: &'static str,
    ) -> Result<Vec<Occurrence<LemmaRecord>>, RelevanceError> {
        self.parse_rows(file, |fields| match fields {
            [article, lemmas] => {
                let (article, ordinal) = parse_article_field(article)?;
                let lemmas = LemmaSequence::parse(lemmas).map_err(|err| err.to_string())?;
                Ok(Occurrence::new(ordinal, LemmaRecord::new(article, lemmas)))
            }
            _ => Err("expected article id and lemma tokens".to_string()),
        })
    }
}

/// Split `<id>` or `<id>#<n>` into the article id and its appearance ordinal.
fn parse_article_field(field: &str) -> Result<(&str, u32), String> {
    let (article, ordinal) = match field.split_once(OCCURRENCE_SEPARATOR) {
        None => (field, 1),
        Some((article, ordinal)) => {
            let ordinal = ordinal
                .parse::<u32>()
                .ok()
                .filter(|ordinal| *ordinal > 0)
                .ok_or_else(|| format!("invalid occurrence ordinal `{ordinal}`"))?;
            (article, ordinal)
        }
    };
    if article.is_empty() {
        return Err("empty article id".to_string());
    }
    Ok((article, ordinal))
}

impl ArticleBatch for FlatFileBatch {
    fn batch_id(&self) -> &str {
        &self.id
    }

    fn article_ids(&self) -> Result<Vec<ArticleId>, RelevanceError> {
        if self.root.join(ARTICLES_FILE).is_file() {
            return self.id_list(ARTICLES_FILE);
        }
        // without an article list, every article mentioned by an attribute file is in scope
        let mut ids: Vec<ArticleId> = Vec::new();
        ids.extend(self.title_lemmas()?.into_iter().map(|found| found.row.article));
        ids.extend(self.abstract_lemmas()?.into_iter().map(|found| found.row.article));
        ids.extend(self.headings()?.into_iter().map(|found| found.row.article));
        ids.extend(self.keywords()?.into_iter().map(|found| found.row.article));
        ids.extend(self.chemicals()?.into_iter().map(|found| found.row.article));
        let mut seen = std::collections::HashSet::new();
        ids.retain(|id| seen.insert(id.clone()));
        Ok(ids)
    }

    fn deleted_article_ids(&self) -> Result<Vec<ArticleId>, RelevanceError> {
        self.id_list(DELETED_FILE)
    }

    fn title_lemmas(&self) -> Result<Vec<Occurrence<LemmaRecord>>, RelevanceError> {
        self.lemma_rows(TITLES_FILE)
    }

    fn abstract_lemmas(&self) -> Result<Vec<Occurrence<LemmaRecord>>, RelevanceError> {
        self.lemma_rows(ABSTRACTS_FILE)
    }

    fn headings(&self) -> Result<Vec<Occurrence<HeadingRecord>>, RelevanceError> {
        self.parse_rows(HEADINGS_FILE, |fields| {
            let (article, descriptor, qualifier) = match fields {
                [article, descriptor] => (*article, *descriptor, None),
                [article, descriptor, qualifier] => {
                    (*article, *descriptor, (!qualifier.is_empty()).then_some(*qualifier))
                }
                _ => return Err("expected article id, descriptor, and optional qualifier".into()),
            };
            if descriptor.is_empty() {
                return Err("empty descriptor".to_string());
            }
            let (article, ordinal) = parse_article_field(article)?;
            let qualifier = qualifier.map(str::to_string);
            Ok(Occurrence::new(ordinal, HeadingRecord::new(article, descriptor, qualifier)))
        })
    }

    fn keywords(&self) -> Result<Vec<Occurrence<KeywordRecord>>, RelevanceError> {
        self.parse_rows(KEYWORDS_FILE, |fields| {
            let (article, keyword, lemmas) = match fields {
                [article, keyword] if !keyword.is_empty() => {
                    (*article, *keyword, self.lemmatizer.lemmatize(keyword))
                }
                [article, keyword, lemmas] if !keyword.is_empty() => {
                    let lemmas = LemmaSequence::parse(lemmas).map_err(|err| err.to_string())?;
                    (*article, *keyword, lemmas)
                }
                _ => return Err("expected article id, keyword, and optional lemma tokens".into()),
            };
            let (article, ordinal) = parse_article_field(article)?;
            Ok(Occurrence::new(ordinal, KeywordRecord::new(article, keyword, lemmas)))
        })
    }

    fn chemicals(&self) -> Result<Vec<Occurrence<ChemicalRecord>>, RelevanceError> {
        self.parse_rows(CHEMICALS_FILE, |fields| match fields {
            [article, chemical] if !chemical.is_empty() => {
                let (article, ordinal) = parse_article_field(article)?;
                Ok(Occurrence::new(ordinal, ChemicalRecord::new(article, *chemical)))
            }
            _ => Err("expected article id and chemical key".to_string()),
        })
    }
}
