//! The six relevance signals.
//!
//! Every signal is a pure function of `(tables, article, subject)`. Membership signals
//! use a three-valued convention: `+1` the signal applies and confirms, `-1` it applies
//! and disconfirms, `0` it cannot apply (missing article attribute or subject identity).
//! Text signals count keyword occurrences and are never negative.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ingestion::SignalTables;
use crate::lemma::LemmaSequence;
use crate::subject::Subject;
use crate::types::ArticleId;

/// Score reported when a signal applies and confirms relevance.
pub const CONFIRMED: i32 = 1;
/// Score reported when a signal applies and contradicts relevance.
pub const DISCONFIRMED: i32 = -1;
/// Score reported when a signal cannot apply.
pub const NOT_APPLICABLE: i32 = 0;

/// Closed set of relevance signals, in persisted column order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Signal {
    /// Keyword occurrences in the title.
    Title,
    /// Keyword occurrences in the abstract.
    Abstract,
    /// Any heading at or below the subject's tree positions.
    TaxonomyBranch,
    /// Heading list contains the subject's descriptor.
    Heading,
    /// Article keyword list matches a subject keyword.
    Keyword,
    /// Chemical list contains the subject's chemical.
    Chemical,
}

type ScoreFn = fn(&SignalTables, &str, &Subject) -> i32;

/// Dispatch table, index-aligned with [`Signal::ALL`].
const SCORERS: [ScoreFn; Signal::COUNT] = [
    title_score,
    abstract_score,
    taxonomy_branch_score,
    heading_score,
    keyword_score,
    chemical_score,
];

impl Signal {
    /// Number of signals.
    pub const COUNT: usize = 6;

    /// All signals in persisted column order.
    pub const ALL: [Signal; Signal::COUNT] = [
        Signal::Title,
        Signal::Abstract,
        Signal::TaxonomyBranch,
        Signal::Heading,
        Signal::Keyword,
        Signal::Chemical,
    ];

    /// Column position of this signal.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Stable lowercase name used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            Signal::Title => "title",
            Signal::Abstract => "abstract",
            Signal::TaxonomyBranch => "taxonomy_branch",
            Signal::Heading => "heading",
            Signal::Keyword => "keyword",
            Signal::Chemical => "chemical",
        }
    }

    /// Score `article` against `subject` for this signal.
    pub fn score(self, tables: &SignalTables, article: &str, subject: &Subject) -> i32 {
        SCORERS[self.index()](tables, article, subject)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn title_score(tables: &SignalTables, article: &str, subject: &Subject) -> i32 {
    keyword_occurrences(tables.titles().get(article), subject)
}

fn abstract_score(tables: &SignalTables, article: &str, subject: &Subject) -> i32 {
    keyword_occurrences(tables.abstracts().get(article), subject)
}

fn keyword_occurrences(text: Option<&LemmaSequence>, subject: &Subject) -> i32 {
    let Some(text) = text else {
        return NOT_APPLICABLE;
    };
    let total: usize = subject
        .keyword_lemma_sequences()
        .iter()
        .filter(|lemmas| !lemmas.is_empty())
        .map(|lemmas| text.count_occurrences(lemmas))
        .sum();
    i32::try_from(total).unwrap_or(i32::MAX)
}

fn taxonomy_branch_score(tables: &SignalTables, article: &str, subject: &Subject) -> i32 {
    let roots = subject.tree_numbers();
    if roots.is_empty() {
        return NOT_APPLICABLE;
    }
    let mut headings = tables.headings().select_by_primary(article).peekable();
    if headings.peek().is_none() {
        return NOT_APPLICABLE;
    }
    let descriptors = tables.descriptors();
    let within_branch = headings.any(|heading| {
        descriptors
            .tree_numbers(&heading.descriptor)
            .iter()
            .any(|position| roots.iter().any(|root| position.is_descendant_of(root)))
    });
    membership(within_branch)
}

fn heading_score(tables: &SignalTables, article: &str, subject: &Subject) -> i32 {
    let Some(descriptor) = subject.taxonomy_key() else {
        return NOT_APPLICABLE;
    };
    let headings = tables.headings();
    if !headings.contains_primary(article) {
        return NOT_APPLICABLE;
    }
    membership(headings.contains_pair(article, descriptor))
}

fn keyword_score(tables: &SignalTables, article: &str, subject: &Subject) -> i32 {
    let mut keywords = tables.keywords().select_by_primary(article).peekable();
    if keywords.peek().is_none() {
        return NOT_APPLICABLE;
    }
    let raw = subject.normalized_keywords();
    let lemmatized = subject.keyword_lemma_sequences();
    let matched = keywords.any(|keyword| {
        raw.contains(&keyword.normalized)
            || (!keyword.lemmas.is_empty() && lemmatized.contains(&keyword.lemmas))
    });
    membership(matched)
}

fn chemical_score(tables: &SignalTables, article: &str, subject: &Subject) -> i32 {
    let Some(chemical) = subject.chemical_key() else {
        return NOT_APPLICABLE;
    };
    let chemicals = tables.chemicals();
    if !chemicals.contains_primary(article) {
        return NOT_APPLICABLE;
    }
    membership(chemicals.contains_pair(article, chemical))
}

fn membership(found: bool) -> i32 {
    if found { CONFIRMED } else { DISCONFIRMED }
}

impl SignalTables {
    /// Articles reachable from the subject's descriptor, chemical, or keywords through
    /// the foreign-key indices, in batch order. Text signals are not consulted.
    pub fn candidate_articles(&self, subject: &Subject) -> IndexSet<ArticleId> {
        let mut found = IndexSet::new();
        if let Some(descriptor) = subject.taxonomy_key() {
            found.extend(
                self.headings()
                    .select_by_foreign(descriptor)
                    .map(|row| row.article.clone()),
            );
        }
        if let Some(chemical) = subject.chemical_key() {
            found.extend(
                self.chemicals()
                    .select_by_foreign(chemical)
                    .map(|row| row.article.clone()),
            );
        }
        for keyword in subject.normalized_keywords() {
            found.extend(
                self.keywords()
                    .select_by_foreign(keyword.as_str())
                    .map(|row| row.article.clone()),
            );
        }
        found.retain(|article| self.articles.contains(article));
        found.sort_unstable_by(|left, right| {
            self.articles
                .get_index_of(left)
                .cmp(&self.articles.get_index_of(right))
        });
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryBatch;
    use crate::taxonomy::{DescriptorTreeIndex, TreeNumberRegistry};
    use std::sync::Arc;

    fn lemmas(text: &str) -> LemmaSequence {
        LemmaSequence::parse(text).unwrap()
    }

    fn statin_fixture() -> (SignalTables, Subject) {
        let mut registry = TreeNumberRegistry::new();
        let mut descriptors = DescriptorTreeIndex::new();
        descriptors.insert(&mut registry, "D_STATIN", ["D27.505"]).unwrap();
        descriptors.insert(&mut registry, "D_ATORVA", ["D27.505.100"]).unwrap();
        descriptors.insert(&mut registry, "D_OTHER", ["D27.5051"]).unwrap();
        let subject = Subject::builder("statins")
            .with_taxonomy_key("D_STATIN")
            .with_tree_number(registry.intern("D27.505").unwrap())
            .with_keyword("statin", lemmas("statin"))
            .build()
            .unwrap();
        let batch = InMemoryBatch::new("b")
            .with_article("narrower")
            .with_article("sibling")
            .with_article("bare")
            .with_heading("narrower", "D_ATORVA", None)
            .with_heading("sibling", "D_OTHER", None)
            .with_heading("sibling", "D_UNKNOWN", None);
        let tables = SignalTables::build(&batch, Arc::new(descriptors)).unwrap();
        (tables, subject)
    }

    #[test]
    fn signal_order_matches_dispatch_table() {
        for (idx, signal) in Signal::ALL.iter().enumerate() {
            assert_eq!(signal.index(), idx);
        }
        assert_eq!(Signal::TaxonomyBranch.to_string(), "taxonomy_branch");
    }

    #[test]
    fn branch_score_accepts_narrower_headings() {
        let (tables, subject) = statin_fixture();
        assert_eq!(Signal::TaxonomyBranch.score(&tables, "narrower", &subject), CONFIRMED);
    }

    #[test]
    fn branch_score_rejects_string_prefix_siblings() {
        let (tables, subject) = statin_fixture();
        assert_eq!(Signal::TaxonomyBranch.score(&tables, "sibling", &subject), DISCONFIRMED);
    }

    #[test]
    fn missing_headings_are_not_applicable() {
        let (tables, subject) = statin_fixture();
        assert_eq!(Signal::TaxonomyBranch.score(&tables, "bare", &subject), NOT_APPLICABLE);
        assert_eq!(Signal::Heading.score(&tables, "bare", &subject), NOT_APPLICABLE);
    }

    #[test]
    fn heading_score_requires_exact_descriptor() {
        let (tables, subject) = statin_fixture();
        assert_eq!(Signal::Heading.score(&tables, "narrower", &subject), DISCONFIRMED);
    }

    #[test]
    fn text_scores_are_zero_without_text() {
        let (tables, subject) = statin_fixture();
        assert_eq!(Signal::Title.score(&tables, "bare", &subject), 0);
        assert_eq!(Signal::Abstract.score(&tables, "bare", &subject), 0);
    }

    #[test]
    fn keyword_score_matches_raw_or_lemma_forms() {
        let subject = Subject::builder("covid")
            .with_keyword("Long COVID", lemmas("long covid"))
            .with_keyword("post-acute sequelae", lemmas("post-acute sequela"))
            .build()
            .unwrap();
        let batch = InMemoryBatch::new("b")
            .with_article("raw")
            .with_article("lemma")
            .with_article("miss")
            .with_keyword("raw", "long  covid", LemmaSequence::empty())
            .with_keyword("lemma", "Post-acute sequelae (PASC)", lemmas("post-acute sequela"))
            .with_keyword("miss", "influenza", lemmas("influenza"));
        let tables = SignalTables::build(&batch, Arc::new(DescriptorTreeIndex::new())).unwrap();
        assert_eq!(Signal::Keyword.score(&tables, "raw", &subject), CONFIRMED);
        assert_eq!(Signal::Keyword.score(&tables, "lemma", &subject), CONFIRMED);
        assert_eq!(Signal::Keyword.score(&tables, "miss", &subject), DISCONFIRMED);
        assert_eq!(Signal::Keyword.score(&tables, "absent", &subject), NOT_APPLICABLE);
    }

    #[test]
    fn empty_lemma_keywords_do_not_match_each_other() {
        let subject = Subject::builder("punct")
            .with_keyword("!!", LemmaSequence::empty())
            .build()
            .unwrap();
        let batch = InMemoryBatch::new("b")
            .with_article("a")
            .with_keyword("a", "??", LemmaSequence::empty())
            .with_title("a", lemmas("some title"));
        let tables = SignalTables::build(&batch, Arc::new(DescriptorTreeIndex::new())).unwrap();
        assert_eq!(Signal::Keyword.score(&tables, "a", &subject), DISCONFIRMED);
        assert_eq!(Signal::Title.score(&tables, "a", &subject), 0);
    }

    #[test]
    fn chemical_score_needs_subject_identity() {
        let with_chemical = Subject::builder("x").with_chemical_key("C1").build().unwrap();
        let without = Subject::builder("y").build().unwrap();
        let batch = InMemoryBatch::new("b")
            .with_article("a")
            .with_chemical("a", "C2");
        let tables = SignalTables::build(&batch, Arc::new(DescriptorTreeIndex::new())).unwrap();
        assert_eq!(Signal::Chemical.score(&tables, "a", &with_chemical), DISCONFIRMED);
        assert_eq!(Signal::Chemical.score(&tables, "a", &without), NOT_APPLICABLE);
    }

    #[test]
    fn candidate_articles_use_foreign_indices() {
        let subject = Subject::builder("x")
            .with_taxonomy_key("D1")
            .with_chemical_key("C1")
            .with_keyword("Aspirin", lemmas("aspirin"))
            .build()
            .unwrap();
        let batch = InMemoryBatch::new("b")
            .with_article("c")
            .with_article("h")
            .with_article("k")
            .with_article("none")
            .with_heading("h", "D1", None)
            .with_chemical("c", "C1")
            .with_keyword("k", "ASPIRIN", lemmas("aspirin"))
            .with_heading("gone", "D1", None)
            .with_deleted("gone");
        let tables = SignalTables::build(&batch, Arc::new(DescriptorTreeIndex::new())).unwrap();
        let found: Vec<String> = tables.candidate_articles(&subject).into_iter().collect();
        assert_eq!(found, vec!["c", "h", "k"]);
    }
}
