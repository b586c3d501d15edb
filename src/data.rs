use serde::{Deserialize, Serialize};

use crate::join_table::{IndexedJoinTable, JoinKeys};
use crate::lemma::LemmaSequence;
use crate::lemmatizer::normalize_keyword;

pub use crate::types::{ArticleId, ChemicalKey, DescriptorKey, Keyword, QualifierKey};

/// Lemmatized title or abstract text of one article.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LemmaRecord {
    /// Owning article.
    pub article: ArticleId,
    /// Lemmatized text.
    pub lemmas: LemmaSequence,
}

impl LemmaRecord {
    /// Build a lemma record.
    pub fn new(article: impl Into<ArticleId>, lemmas: LemmaSequence) -> Self {
        Self {
            article: article.into(),
            lemmas,
        }
    }
}

/// Assignment of a taxonomy descriptor (optionally qualified) to an article.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeadingRecord {
    /// Owning article.
    pub article: ArticleId,
    /// Assigned descriptor.
    pub descriptor: DescriptorKey,
    /// Optional qualifier narrowing the assignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<QualifierKey>,
}

impl HeadingRecord {
    /// Build a heading record.
    pub fn new(
        article: impl Into<ArticleId>,
        descriptor: impl Into<DescriptorKey>,
        qualifier: Option<QualifierKey>,
    ) -> Self {
        Self {
            article: article.into(),
            descriptor: descriptor.into(),
            qualifier,
        }
    }
}

impl JoinKeys<ArticleId, DescriptorKey> for HeadingRecord {
    fn primary_key(&self) -> &ArticleId {
        &self.article
    }

    fn foreign_key(&self) -> &DescriptorKey {
        &self.descriptor
    }
}

/// Free-text keyword attached to an article by its authors or indexers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeywordRecord {
    /// Owning article.
    pub article: ArticleId,
    /// Keyword as supplied.
    pub keyword: Keyword,
    /// Case- and whitespace-normalized keyword; the foreign key.
    pub normalized: Keyword,
    /// Lemmatized keyword.
    pub lemmas: LemmaSequence,
}

impl KeywordRecord {
    /// Build a keyword record; the normalized form is derived from `keyword`.
    pub fn new(
        article: impl Into<ArticleId>,
        keyword: impl Into<Keyword>,
        lemmas: LemmaSequence,
    ) -> Self {
        let keyword = keyword.into();
        Self {
            article: article.into(),
            normalized: normalize_keyword(&keyword),
            keyword,
            lemmas,
        }
    }
}

impl JoinKeys<ArticleId, Keyword> for KeywordRecord {
    fn primary_key(&self) -> &ArticleId {
        &self.article
    }

    fn foreign_key(&self) -> &Keyword {
        &self.normalized
    }
}

/// Chemical substance listed for an article.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChemicalRecord {
    /// Owning article.
    pub article: ArticleId,
    /// Substance key.
    pub chemical: ChemicalKey,
}

impl ChemicalRecord {
    /// Build a chemical record.
    pub fn new(article: impl Into<ArticleId>, chemical: impl Into<ChemicalKey>) -> Self {
        Self {
            article: article.into(),
            chemical: chemical.into(),
        }
    }
}

impl JoinKeys<ArticleId, ChemicalKey> for ChemicalRecord {
    fn primary_key(&self) -> &ArticleId {
        &self.article
    }

    fn foreign_key(&self) -> &ChemicalKey {
        &self.chemical
    }
}

/// Heading memberships keyed by article and descriptor.
pub type HeadingTable = IndexedJoinTable<ArticleId, DescriptorKey, HeadingRecord>;
/// Keyword memberships keyed by article and normalized keyword.
pub type KeywordTable = IndexedJoinTable<ArticleId, Keyword, KeywordRecord>;
/// Chemical memberships keyed by article and chemical key.
pub type ChemicalTable = IndexedJoinTable<ArticleId, ChemicalKey, ChemicalRecord>;

/// An attribute row tagged with the appearance of its article it was read from.
///
/// An article may appear more than once in one batch (for example a corrected revision
/// following the original). Ordinals start at 1 and count appearances in batch order;
/// only rows carrying an article's highest ordinal survive table construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Occurrence<R> {
    /// Which appearance of the article this row belongs to.
    pub ordinal: u32,
    /// The attribute row.
    pub row: R,
}

impl<R> Occurrence<R> {
    /// Tag `row` with `ordinal`.
    pub fn new(ordinal: u32, row: R) -> Self {
        Self { ordinal, row }
    }

    /// Tag `row` as belonging to its article's first appearance.
    pub fn first(row: R) -> Self {
        Self::new(1, row)
    }
}

/// Every attribute row names its owning article.
pub(crate) trait ArticleRow {
    fn article(&self) -> &str;
}

impl ArticleRow for LemmaRecord {
    fn article(&self) -> &str {
        &self.article
    }
}

impl ArticleRow for HeadingRecord {
    fn article(&self) -> &str {
        &self.article
    }
}

impl ArticleRow for KeywordRecord {
    fn article(&self) -> &str {
        &self.article
    }
}

impl ArticleRow for ChemicalRecord {
    fn article(&self) -> &str {
        &self.article
    }
}
