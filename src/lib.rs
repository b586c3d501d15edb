#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Per-batch relevance aggregation and pooled scoring runs.
pub mod aggregator;
/// Reusable command-line runners shared by the bundled binaries.
pub mod apps;
/// Scoring run configuration.
pub mod config;
/// Centralized constants for file layouts and log messages.
pub mod constants;
/// Per-article attribute records and their join tables.
pub mod data;
mod hash;
/// Per-batch signal table construction.
pub mod ingestion;
/// Generic bidirectional occurrence tables.
pub mod join_table;
/// Contribution ledger guarding against duplicate persistence.
pub mod ledger;
/// Lemma sequences and contiguous sub-sequence matching.
pub mod lemma;
/// Lemmatizer seam and text normalization helpers.
pub mod lemmatizer;
/// Scoring run tallies.
pub mod metrics;
/// Summary sinks.
pub mod persistence;
/// The six relevance signals.
pub mod scoring;
/// Article batch traits and built-in providers.
pub mod source;
/// Curated subjects and subject catalogs.
pub mod subject;
/// Relevance summaries and their persisted row format.
pub mod summary;
/// Taxonomy tree numbers and descriptor indexes.
pub mod taxonomy;
/// Input transports used to locate batches (filesystem today).
pub mod transport;
/// Shared type aliases.
pub mod types;

mod errors;

pub use aggregator::RelevanceAggregator;
pub use config::ScoringConfig;
pub use data::{ChemicalRecord, HeadingRecord, KeywordRecord, LemmaRecord, Occurrence};
pub use errors::RelevanceError;
pub use ingestion::SignalTables;
pub use join_table::{IndexedJoinTable, JoinKeys, LemmaTable};
pub use ledger::{ContributionEntry, ContributionLedger};
pub use lemma::LemmaSequence;
pub use lemmatizer::{BasicLemmatizer, Lemmatizer};
pub use metrics::{SignalOutcomes, SignalTally};
pub use persistence::{MemorySink, SummaryDirectoryWriter, SummarySink};
pub use scoring::Signal;
pub use source::{ArticleBatch, FlatFileBatch, InMemoryBatch};
pub use subject::{Subject, SubjectBuilder, SubjectCatalog, SubjectSpec};
pub use summary::{RelevanceSummary, filter_summary_file, keep, read_summary_file};
pub use taxonomy::{DescriptorTreeIndex, TreeNumber, TreeNumberRegistry};
pub use types::{
    ArticleId, BatchId, ChemicalKey, DescriptorKey, Keyword, Lemma, QualifierKey, SubjectKey,
};
