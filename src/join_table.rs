//! Build-once, read-many multi-key tables.
//!
//! Records are stored once (behind `Arc`) and indexed both by the article they belong
//! to and by the attribute key they carry. Mutation requires `&mut self`, so tables are
//! filled during single-threaded batch construction and then shared read-only with the
//! scoring workers.

use indexmap::IndexSet;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use crate::lemma::LemmaSequence;
use crate::types::ArticleId;

/// Exposes the primary (article) and foreign (attribute) key of a joined record.
pub trait JoinKeys<K1, K2> {
    /// Primary key, the owning article.
    fn primary_key(&self) -> &K1;
    /// Foreign key, the attribute the record links to.
    fn foreign_key(&self) -> &K2;
}

/// In-memory table indexed by primary and foreign key.
///
/// Uniqueness is on the full record: two heading records that share a descriptor but
/// differ in qualifier are both kept, while an identical record inserted twice is
/// stored once.
///
/// Selections by primary key follow insertion order. Selections by foreign key have no
/// guaranteed order once records were removed: removal swaps the last record into the
/// vacated slot so it stays O(1) however many articles share the key.
pub struct IndexedJoinTable<K1, K2, R> {
    by_primary: HashMap<K1, PrimaryEntry<K2, R>>,
    by_foreign: HashMap<K2, IndexSet<Arc<R>>>,
    len: usize,
}

/// Records of one primary key plus a per-foreign-key count for O(1) pair probes.
struct PrimaryEntry<K2, R> {
    records: IndexSet<Arc<R>>,
    foreign: HashMap<K2, usize>,
}

impl<K2, R> Default for PrimaryEntry<K2, R> {
    fn default() -> Self {
        Self {
            records: IndexSet::new(),
            foreign: HashMap::new(),
        }
    }
}

impl<K1, K2, R> Default for IndexedJoinTable<K1, K2, R> {
    fn default() -> Self {
        Self {
            by_primary: HashMap::new(),
            by_foreign: HashMap::new(),
            len: 0,
        }
    }
}

impl<K1, K2, R> IndexedJoinTable<K1, K2, R>
where
    K1: Clone + Eq + Hash,
    K2: Clone + Eq + Hash,
    R: JoinKeys<K1, K2> + Eq + Hash,
{
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record` into both indices. Returns `false` when an identical record was
    /// already stored.
    pub fn insert(&mut self, record: R) -> bool {
        let record = Arc::new(record);
        let entry = self
            .by_primary
            .entry(record.primary_key().clone())
            .or_default();
        if !entry.records.insert(record.clone()) {
            return false;
        }
        let foreign = record.foreign_key().clone();
        *entry.foreign.entry(foreign.clone()).or_insert(0) += 1;
        self.by_foreign.entry(foreign).or_default().insert(record);
        self.len += 1;
        true
    }

    /// Remove every record under `key` from all indices. Returns how many were removed.
    pub fn remove_by_primary<Q>(&mut self, key: &Q) -> usize
    where
        K1: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(entry) = self.by_primary.remove(key) else {
            return 0;
        };
        for record in &entry.records {
            let foreign = record.foreign_key();
            if let Some(set) = self.by_foreign.get_mut(foreign) {
                set.swap_remove(record);
                if set.is_empty() {
                    self.by_foreign.remove(foreign);
                }
            }
        }
        self.len -= entry.records.len();
        entry.records.len()
    }

    /// Records for `key` in insertion order; empty when absent.
    pub fn select_by_primary<Q>(&self, key: &Q) -> Selection<'_, R>
    where
        K1: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        Selection::new(self.by_primary.get(key).map(|entry| &entry.records))
    }

    /// Records carrying foreign key `key`; empty when absent. Order is unspecified.
    pub fn select_by_foreign<Q>(&self, key: &Q) -> Selection<'_, R>
    where
        K2: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        Selection::new(self.by_foreign.get(key))
    }

    /// True when at least one record links `primary` to `foreign`.
    pub fn contains_pair<P, F>(&self, primary: &P, foreign: &F) -> bool
    where
        K1: Borrow<P>,
        K2: Borrow<F>,
        P: Hash + Eq + ?Sized,
        F: Hash + Eq + ?Sized,
    {
        self.by_primary
            .get(primary)
            .is_some_and(|entry| entry.foreign.contains_key(foreign))
    }

    /// True when any record is stored under `key`.
    pub fn contains_primary<Q>(&self, key: &Q) -> bool
    where
        K1: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.by_primary.contains_key(key)
    }

    /// Distinct primary keys currently stored.
    pub fn primary_keys(&self) -> impl Iterator<Item = &K1> {
        self.by_primary.keys()
    }

    /// Total stored records.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when no records are stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Borrowing iterator over the records matched by a table lookup.
pub struct Selection<'a, R> {
    inner: Option<indexmap::set::Iter<'a, Arc<R>>>,
}

impl<'a, R> Selection<'a, R> {
    fn new(set: Option<&'a IndexSet<Arc<R>>>) -> Self {
        Self {
            inner: set.map(|set| set.iter()),
        }
    }
}

impl<'a, R> Iterator for Selection<'a, R> {
    type Item = &'a R;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.as_mut()?.next().map(|record| record.as_ref())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner
            .as_ref()
            .map(|iter| iter.size_hint())
            .unwrap_or((0, Some(0)))
    }
}

impl<R> ExactSizeIterator for Selection<'_, R> {}

/// Primary-key-only table holding one lemma sequence per article. Re-inserting for an
/// article replaces its previous sequence.
#[derive(Default)]
pub struct LemmaTable {
    entries: HashMap<ArticleId, LemmaSequence>,
}

impl LemmaTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `lemmas` for `article`, returning the sequence it replaced.
    pub fn insert(&mut self, article: ArticleId, lemmas: LemmaSequence) -> Option<LemmaSequence> {
        self.entries.insert(article, lemmas)
    }

    /// Drop the entry for `article`.
    pub fn remove_by_primary(&mut self, article: &str) -> bool {
        self.entries.remove(article).is_some()
    }

    /// Lemma sequence for `article`, if any.
    pub fn get(&self, article: &str) -> Option<&LemmaSequence> {
        self.entries.get(article)
    }

    /// Number of articles with an entry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no article has an entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type RowTable = IndexedJoinTable<String, String, Row>;

    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    struct Row {
        article: String,
        key: String,
        note: u8,
    }

    impl JoinKeys<String, String> for Row {
        fn primary_key(&self) -> &String {
            &self.article
        }
        fn foreign_key(&self) -> &String {
            &self.key
        }
    }

    fn row(article: &str, key: &str, note: u8) -> Row {
        Row {
            article: article.to_string(),
            key: key.to_string(),
            note,
        }
    }

    #[test]
    fn identical_records_are_stored_once() {
        let mut table = RowTable::new();
        assert!(table.insert(row("a1", "k1", 0)));
        assert!(!table.insert(row("a1", "k1", 0)));
        assert!(table.insert(row("a1", "k1", 1)));
        assert_eq!(table.len(), 2);
        assert_eq!(table.select_by_primary("a1").len(), 2);
        assert_eq!(table.select_by_foreign("k1").count(), 2);
    }

    #[test]
    fn remove_by_primary_clears_both_indices() {
        let mut table = RowTable::new();
        table.insert(row("a1", "k1", 0));
        table.insert(row("a1", "k2", 0));
        table.insert(row("a2", "k1", 0));
        assert_eq!(table.remove_by_primary("a1"), 2);
        assert_eq!(table.select_by_primary("a1").count(), 0);
        let remaining: Vec<&Row> = table.select_by_foreign("k1").collect();
        assert_eq!(remaining, vec![&row("a2", "k1", 0)]);
        assert_eq!(table.select_by_foreign("k2").count(), 0);
        assert!(!table.contains_pair("a1", "k1"));
        assert!(table.contains_pair("a2", "k1"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn removing_many_holders_of_a_shared_key_keeps_the_rest() {
        let mut table = RowTable::new();
        for idx in 0..40_000 {
            table.insert(row(&idx.to_string(), "D006801", 0));
        }
        for idx in (0..40_000).step_by(2) {
            assert_eq!(table.remove_by_primary(idx.to_string().as_str()), 1);
        }
        assert_eq!(table.len(), 20_000);
        let mut remaining: Vec<usize> = table
            .select_by_foreign("D006801")
            .map(|found| found.article.parse().unwrap())
            .collect();
        remaining.sort_unstable();
        let expected: Vec<usize> = (1..40_000).step_by(2).collect();
        assert_eq!(remaining, expected);
        assert!(table.contains_pair("1", "D006801"));
        assert!(!table.contains_pair("0", "D006801"));
    }

    #[test]
    fn missing_keys_yield_empty_results() {
        let mut table = RowTable::new();
        assert_eq!(table.select_by_primary("nope").count(), 0);
        assert_eq!(table.remove_by_primary("nope"), 0);
        assert!(!table.contains_pair("nope", "k"));
        assert!(table.is_empty());
    }

    #[test]
    fn pair_survives_partial_qualifier_set() {
        let mut table = RowTable::new();
        table.insert(row("a1", "k1", 0));
        table.insert(row("a1", "k1", 1));
        assert!(table.contains_pair("a1", "k1"));
        table.remove_by_primary("a1");
        assert!(!table.contains_pair("a1", "k1"));
    }

    #[test]
    fn lemma_table_replaces_on_reinsert() {
        let mut table = LemmaTable::new();
        table.insert("a1".to_string(), LemmaSequence::from_tokens(["old"]));
        let previous = table.insert("a1".to_string(), LemmaSequence::from_tokens(["new"]));
        assert_eq!(previous, Some(LemmaSequence::from_tokens(["old"])));
        assert_eq!(table.get("a1").map(ToString::to_string).as_deref(), Some("new"));
        assert!(table.remove_by_primary("a1"));
        assert!(table.get("a1").is_none());
    }
}
