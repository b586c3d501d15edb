//! Per-batch table construction.
//!
//! Tables are filled once, on one thread, before any scoring starts. Afterwards
//! [`SignalTables`] is only read, so scoring workers share it by reference.

use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::constants::ingestion::SUPERSEDED_OCCURRENCE_MSG;
use crate::data::{ArticleRow, ChemicalTable, HeadingTable, KeywordTable, Occurrence};
use crate::errors::RelevanceError;
use crate::join_table::LemmaTable;
use crate::source::ArticleBatch;
use crate::taxonomy::DescriptorTreeIndex;
use crate::types::{ArticleId, BatchId};

/// Read-only per-batch attribute tables consulted by the signal scorers.
pub struct SignalTables {
    pub(crate) batch_id: BatchId,
    pub(crate) articles: IndexSet<ArticleId>,
    pub(crate) titles: LemmaTable,
    pub(crate) abstracts: LemmaTable,
    pub(crate) headings: HeadingTable,
    pub(crate) keywords: KeywordTable,
    pub(crate) chemicals: ChemicalTable,
    pub(crate) descriptors: Arc<DescriptorTreeIndex>,
}

impl SignalTables {
    /// Load every attribute list of `batch`, apply the deletion feed, and index the rest.
    ///
    /// When an article appears more than once, only the rows of its last appearance are
    /// kept, in every table. An attribute the last appearance lacks stays absent even if
    /// an earlier appearance carried it.
    ///
    /// Any provider error abandons the batch; partially built tables are dropped.
    pub fn build(
        batch: &dyn ArticleBatch,
        descriptors: Arc<DescriptorTreeIndex>,
    ) -> Result<Self, RelevanceError> {
        let batch_id = batch.batch_id().to_string();
        let article_list = batch.article_ids()?;
        let titles = batch.title_lemmas()?;
        let abstracts = batch.abstract_lemmas()?;
        let headings = batch.headings()?;
        let keywords = batch.keywords()?;
        let chemicals = batch.chemicals()?;

        let mut appearances = Appearances::default();
        for article in &article_list {
            appearances.count_listed(article);
        }
        appearances.observe(&titles);
        appearances.observe(&abstracts);
        appearances.observe(&headings);
        appearances.observe(&keywords);
        appearances.observe(&chemicals);

        let mut tables = Self {
            batch_id: batch_id.clone(),
            articles: IndexSet::new(),
            titles: LemmaTable::new(),
            abstracts: LemmaTable::new(),
            headings: HeadingTable::new(),
            keywords: KeywordTable::new(),
            chemicals: ChemicalTable::new(),
            descriptors,
        };
        for row in appearances.keep_last(titles) {
            tables.titles.insert(row.article, row.lemmas);
        }
        for row in appearances.keep_last(abstracts) {
            tables.abstracts.insert(row.article, row.lemmas);
        }
        for row in appearances.keep_last(headings) {
            tables.headings.insert(row);
        }
        for row in appearances.keep_last(keywords) {
            tables.keywords.insert(row);
        }
        for row in appearances.keep_last(chemicals) {
            tables.chemicals.insert(row);
        }
        appearances.log_superseded(&batch_id);

        let deleted: HashSet<ArticleId> = batch.deleted_article_ids()?.into_iter().collect();
        for article in &deleted {
            tables.remove_article(article);
        }
        tables.articles = article_list
            .into_iter()
            .filter(|article| !deleted.contains(article))
            .collect();

        debug!(
            batch_id = %tables.batch_id,
            articles = tables.articles.len(),
            deleted = deleted.len(),
            titles = tables.titles.len(),
            abstracts = tables.abstracts.len(),
            headings = tables.headings.len(),
            keywords = tables.keywords.len(),
            chemicals = tables.chemicals.len(),
            "built signal tables"
        );
        Ok(tables)
    }

    /// Batch these tables were built from.
    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    /// Articles to score, de-duplicated, in first-seen order, deletions excluded.
    pub fn article_ids(&self) -> impl ExactSizeIterator<Item = &ArticleId> {
        self.articles.iter()
    }

    /// Title lemma table.
    pub fn titles(&self) -> &LemmaTable {
        &self.titles
    }

    /// Abstract lemma table.
    pub fn abstracts(&self) -> &LemmaTable {
        &self.abstracts
    }

    /// Heading membership table.
    pub fn headings(&self) -> &HeadingTable {
        &self.headings
    }

    /// Keyword membership table.
    pub fn keywords(&self) -> &KeywordTable {
        &self.keywords
    }

    /// Chemical membership table.
    pub fn chemicals(&self) -> &ChemicalTable {
        &self.chemicals
    }

    /// Descriptor → tree-number index used for branch scoring.
    pub fn descriptors(&self) -> &DescriptorTreeIndex {
        &self.descriptors
    }

    fn remove_article(&mut self, article: &ArticleId) {
        self.titles.remove_by_primary(article);
        self.abstracts.remove_by_primary(article);
        self.headings.remove_by_primary(article);
        self.keywords.remove_by_primary(article);
        self.chemicals.remove_by_primary(article);
    }
}

/// Last appearance ordinal per article plus how many superseded rows were dropped.
#[derive(Default)]
struct Appearances {
    last: IndexMap<ArticleId, AppearanceState>,
}

#[derive(Default)]
struct AppearanceState {
    last: u32,
    dropped_rows: usize,
}

impl Appearances {
    fn count_listed(&mut self, article: &str) {
        match self.last.get_mut(article) {
            Some(state) => state.last += 1,
            None => {
                self.last.insert(
                    article.to_string(),
                    AppearanceState {
                        last: 1,
                        dropped_rows: 0,
                    },
                );
            }
        }
    }

    fn observe<R: ArticleRow>(&mut self, rows: &[Occurrence<R>]) {
        for found in rows {
            match self.last.get_mut(found.row.article()) {
                Some(state) => state.last = state.last.max(found.ordinal),
                None => {
                    self.last.insert(
                        found.row.article().to_string(),
                        AppearanceState {
                            last: found.ordinal,
                            dropped_rows: 0,
                        },
                    );
                }
            }
        }
    }

    /// Rows belonging to their article's last appearance, in provider order.
    fn keep_last<R: ArticleRow>(&mut self, rows: Vec<Occurrence<R>>) -> Vec<R> {
        let mut kept = Vec::with_capacity(rows.len());
        for found in rows {
            match self.last.get_mut(found.row.article()) {
                Some(state) if found.ordinal < state.last => state.dropped_rows += 1,
                _ => kept.push(found.row),
            }
        }
        kept
    }

    fn log_superseded(&self, batch_id: &str) {
        for (article, state) in &self.last {
            if state.last > 1 {
                warn!(
                    batch_id = %batch_id,
                    article = %article,
                    appearance = state.last,
                    removed = state.dropped_rows,
                    SUPERSEDED_OCCURRENCE_MSG
                );
            }
        }
    }
}
