/// Bibliographic article identifier (stable across batches).
/// Example: `31415926`
pub type ArticleId = String;
/// Unique key of a curated subject.
/// Examples: `atorvastatin`, `long_covid`
pub type SubjectKey = String;
/// Taxonomy descriptor key (the identity a heading assigns to an article).
/// Example: `D000069059`
pub type DescriptorKey = String;
/// Optional qualifier attached to a heading.
/// Examples: `Q000627`, `Q000009`
pub type QualifierKey = String;
/// Chemical-substance registry key.
/// Example: `D000069059`
pub type ChemicalKey = String;
/// Identifier for one article batch (usually the batch directory name).
/// Example: `pubmed24n0042`
pub type BatchId = String;
/// A single lemma token.
/// Examples: `statin`, `myocardial`
pub type Lemma = String;
/// Raw free-text keyword as supplied by an article or subject.
/// Example: `Atorvastatin Calcium`
pub type Keyword = String;
