/// Constants used by the lemma-sequence text representation.
pub mod lemma {
    /// Separator between tokens when a lemma sequence is rendered or parsed.
    pub const TOKEN_SEPARATOR: char = ' ';
}

/// Constants used by taxonomy tree numbers and descriptor files.
pub mod taxonomy {
    /// Separator between segments of a tree number (for example `D12.776.157`).
    pub const TREE_SEGMENT_DELIMITER: char = '.';
    /// Separator between tree numbers inside one descriptor-file field.
    pub const TREE_LIST_DELIMITER: char = ';';
}

/// Constants used by flat-file batch directories.
pub mod flat_file {
    /// Column delimiter for every flat-file row.
    pub const FIELD_DELIMITER: char = '\t';
    /// Prefix marking comment and header lines.
    pub const COMMENT_PREFIX: char = '#';
    /// Separates an article id from its appearance ordinal (`31000001#2`).
    pub const OCCURRENCE_SEPARATOR: char = '#';
    /// Article list file.
    pub const ARTICLES_FILE: &str = "articles.tsv";
    /// Deleted/revised article feed.
    pub const DELETED_FILE: &str = "deleted.tsv";
    /// Title lemma file.
    pub const TITLES_FILE: &str = "titles.tsv";
    /// Abstract lemma file.
    pub const ABSTRACTS_FILE: &str = "abstracts.tsv";
    /// Heading membership file.
    pub const HEADINGS_FILE: &str = "headings.tsv";
    /// Free-text keyword file.
    pub const KEYWORDS_FILE: &str = "keywords.tsv";
    /// Chemical membership file.
    pub const CHEMICALS_FILE: &str = "chemicals.tsv";
    /// Files whose presence marks a directory as an article batch.
    pub const BATCH_MARKER_FILES: [&str; 2] = [ARTICLES_FILE, TITLES_FILE];
    /// Log message used when a malformed row is skipped.
    pub const SKIP_MALFORMED_MSG: &str = "skipping malformed flat-file row";
}

/// Constants used during per-batch table construction.
pub mod ingestion {
    /// Log message used when a later article occurrence replaces an earlier one.
    pub const SUPERSEDED_OCCURRENCE_MSG: &str = "superseding earlier article occurrence";
}

/// Constants used by relevance summary persistence.
pub mod summary {
    /// Column delimiter for persisted summary rows.
    pub const FIELD_DELIMITER: char = '\t';
    /// Leading token of the version marker line.
    pub const VERSION_MARKER: &str = "#relevance_summary";
    /// Current persisted row layout version.
    pub const FORMAT_VERSION: &str = "v1";
    /// Number of fields in one persisted row.
    pub const FIELD_COUNT: usize = 8;
    /// File extension used for per-subject summary files.
    pub const FILE_EXTENSION: &str = "tsv";
}

/// Constants used by the contribution ledger.
pub mod ledger {
    /// Default ledger filename inside the output directory.
    pub const DEFAULT_LEDGER_FILENAME: &str = "contributions.jsonl";
    /// Log message used when an unreadable ledger line is skipped.
    pub const SKIP_MALFORMED_ENTRY_MSG: &str = "skipping malformed contribution ledger entry";
}

/// Constants used by the relevance aggregator.
pub mod aggregation {
    /// Log message used when a (batch, subject) pair was already persisted.
    pub const ALREADY_CONTRIBUTED_MSG: &str = "subject already contributed for batch; skipping";
    /// Log message used when a scoring run starts.
    pub const RUN_STARTED_MSG: &str = "scoring batch";
    /// Log message used when a scoring run finishes.
    pub const RUN_FINISHED_MSG: &str = "scored batch";
}
