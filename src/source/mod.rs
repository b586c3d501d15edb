//! Article batch interfaces and built-in batch providers.
//!
//! Ownership model:
//! - `ArticleBatch` is the scoring-facing interface that yields one batch of per-article
//!   attribute rows.
//! - Every attribute row is tagged with the appearance (occurrence ordinal) of its article
//!   it belongs to; the article's last appearance supersedes all earlier ones.
//! - Deleted IDs are reported separately and removed before scoring.

use std::collections::HashMap;

use crate::data::{
    ArticleRow, ChemicalRecord, HeadingRecord, KeywordRecord, LemmaRecord, Occurrence,
};
use crate::errors::RelevanceError;
use crate::lemma::LemmaSequence;
use crate::types::{ArticleId, BatchId, ChemicalKey, DescriptorKey, Keyword, QualifierKey};

/// Source implementation modules.
pub mod flat_file;

pub use flat_file::FlatFileBatch;

/// One batch of article attribute data.
///
/// Every attribute list is optional: returning an empty list means the articles carry no
/// such attribute. An `Err` abandons the whole batch.
pub trait ArticleBatch: Send + Sync {
    /// Stable batch identifier used in logs and the contribution ledger.
    fn batch_id(&self) -> &str;
    /// Articles in the batch, in batch order. A repeated id is a later appearance of the
    /// same article.
    fn article_ids(&self) -> Result<Vec<ArticleId>, RelevanceError>;
    /// Articles deleted or revised away since they were last scored.
    fn deleted_article_ids(&self) -> Result<Vec<ArticleId>, RelevanceError>;
    /// Lemmatized titles.
    fn title_lemmas(&self) -> Result<Vec<Occurrence<LemmaRecord>>, RelevanceError>;
    /// Lemmatized abstracts.
    fn abstract_lemmas(&self) -> Result<Vec<Occurrence<LemmaRecord>>, RelevanceError>;
    /// Heading memberships.
    fn headings(&self) -> Result<Vec<Occurrence<HeadingRecord>>, RelevanceError>;
    /// Free-text keyword memberships.
    fn keywords(&self) -> Result<Vec<Occurrence<KeywordRecord>>, RelevanceError>;
    /// Chemical memberships.
    fn chemicals(&self) -> Result<Vec<Occurrence<ChemicalRecord>>, RelevanceError>;
}

/// In-memory batch assembled with builder calls.
///
/// Attribute rows attach to the article's latest `with_article` appearance at the time
/// they are added; rows for an article not yet appended belong to its first appearance.
#[derive(Clone, Debug, Default)]
pub struct InMemoryBatch {
    id: BatchId,
    articles: Vec<ArticleId>,
    appearances: HashMap<ArticleId, u32>,
    deleted: Vec<ArticleId>,
    titles: Vec<Occurrence<LemmaRecord>>,
    abstracts: Vec<Occurrence<LemmaRecord>>,
    headings: Vec<Occurrence<HeadingRecord>>,
    keywords: Vec<Occurrence<KeywordRecord>>,
    chemicals: Vec<Occurrence<ChemicalRecord>>,
}

impl InMemoryBatch {
    /// Create an empty batch.
    pub fn new(id: impl Into<BatchId>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Append an article to the batch order. Appending an id again starts a new
    /// appearance that supersedes the earlier one.
    pub fn with_article(mut self, article: impl Into<ArticleId>) -> Self {
        let article = article.into();
        *self.appearances.entry(article.clone()).or_insert(0) += 1;
        self.articles.push(article);
        self
    }

    fn tag<R: ArticleRow>(&self, row: R) -> Occurrence<R> {
        let ordinal = self.appearances.get(row.article()).copied().unwrap_or(1);
        Occurrence::new(ordinal, row)
    }

    /// Mark an article as deleted.
    pub fn with_deleted(mut self, article: impl Into<ArticleId>) -> Self {
        self.deleted.push(article.into());
        self
    }

    /// Set an article's title lemmas.
    pub fn with_title(mut self, article: impl Into<ArticleId>, lemmas: LemmaSequence) -> Self {
        let row = self.tag(LemmaRecord::new(article, lemmas));
        self.titles.push(row);
        self
    }

    /// Set an article's abstract lemmas.
    pub fn with_abstract(mut self, article: impl Into<ArticleId>, lemmas: LemmaSequence) -> Self {
        let row = self.tag(LemmaRecord::new(article, lemmas));
        self.abstracts.push(row);
        self
    }

    /// Add a heading.
    pub fn with_heading(
        mut self,
        article: impl Into<ArticleId>,
        descriptor: impl Into<DescriptorKey>,
        qualifier: Option<QualifierKey>,
    ) -> Self {
        let row = self.tag(HeadingRecord::new(article, descriptor, qualifier));
        self.headings.push(row);
        self
    }

    /// Add a keyword.
    pub fn with_keyword(
        mut self,
        article: impl Into<ArticleId>,
        keyword: impl Into<Keyword>,
        lemmas: LemmaSequence,
    ) -> Self {
        let row = self.tag(KeywordRecord::new(article, keyword, lemmas));
        self.keywords.push(row);
        self
    }

    /// Add a chemical.
    pub fn with_chemical(
        mut self,
        article: impl Into<ArticleId>,
        chemical: impl Into<ChemicalKey>,
    ) -> Self {
        let row = self.tag(ChemicalRecord::new(article, chemical));
        self.chemicals.push(row);
        self
    }
}

impl ArticleBatch for InMemoryBatch {
    fn batch_id(&self) -> &str {
        &self.id
    }

    fn article_ids(&self) -> Result<Vec<ArticleId>, RelevanceError> {
        Ok(self.articles.clone())
    }

    fn deleted_article_ids(&self) -> Result<Vec<ArticleId>, RelevanceError> {
        Ok(self.deleted.clone())
    }

    fn title_lemmas(&self) -> Result<Vec<Occurrence<LemmaRecord>>, RelevanceError> {
        Ok(self.titles.clone())
    }

    fn abstract_lemmas(&self) -> Result<Vec<Occurrence<LemmaRecord>>, RelevanceError> {
        Ok(self.abstracts.clone())
    }

    fn headings(&self) -> Result<Vec<Occurrence<HeadingRecord>>, RelevanceError> {
        Ok(self.headings.clone())
    }

    fn keywords(&self) -> Result<Vec<Occurrence<KeywordRecord>>, RelevanceError> {
        Ok(self.keywords.clone())
    }

    fn chemicals(&self) -> Result<Vec<Occurrence<ChemicalRecord>>, RelevanceError> {
        Ok(self.chemicals.clone())
    }
}
