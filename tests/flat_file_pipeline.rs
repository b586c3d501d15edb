use std::fs;
use std::path::Path;
use std::sync::Arc;

use subject_relevance::apps::score_batch_root;
use subject_relevance::{
    ArticleBatch, BasicLemmatizer, DescriptorTreeIndex, FlatFileBatch, RelevanceAggregator,
    RelevanceSummary, ScoringConfig, Signal, SubjectCatalog, SummaryDirectoryWriter,
    TreeNumberRegistry, read_summary_file,
};
use tempfile::tempdir;

const DESCRIPTORS: &str = "\
# descriptor\ttree numbers
D000069059\tD02.455.426.559.389.657.410.595.500;D03.383.129.308.500
D019161\tD27.505.519.186.500
D006801\tB01.050.150.900.649.313.988.400.112.400.400
Dbroken\tD02..455
";

const SUBJECTS: &str = r#"[
  {"key": "atorvastatin", "descriptor": "D000069059", "chemical": "D000069059",
   "keywords": ["atorvastatin", "Lipitor"]},
  {"key": "long_covid", "keywords": ["long COVID", "post-acute sequelae"]}
]"#;

fn write(dir: &Path, file: &str, body: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(file), body).unwrap();
}

fn write_batch_one(dir: &Path) {
    write(dir, "articles.tsv", "100\n101\n102\n");
    write(
        dir,
        "titles.tsv",
        "100\tatorvastatin reduce ldl\n101\tlong covid in adult\n102\tunrelated title\n",
    );
    write(
        dir,
        "abstracts.tsv",
        "100\tatorvastatin atorvastatin atorvastatin\nbroken row without tab\n",
    );
    write(
        dir,
        "headings.tsv",
        "100\tD000069059\tQ000627\n101\tD006801\n102\tD006801\n",
    );
    write(dir, "keywords.tsv", "101\tLong COVID\n");
    write(dir, "chemicals.tsv", "100\tD000069059\n");
}

fn load_fixture(root: &Path) -> (SubjectCatalog, Arc<DescriptorTreeIndex>) {
    fs::write(root.join("descriptors.tsv"), DESCRIPTORS).unwrap();
    fs::write(root.join("subjects.json"), SUBJECTS).unwrap();
    let mut registry = TreeNumberRegistry::new();
    let descriptors =
        DescriptorTreeIndex::load(&root.join("descriptors.tsv"), &mut registry).unwrap();
    let catalog = SubjectCatalog::load(
        &root.join("subjects.json"),
        &BasicLemmatizer,
        &mut registry,
        &descriptors,
    )
    .unwrap();
    (catalog, Arc::new(descriptors))
}

#[test]
fn descriptor_file_skips_malformed_rows() {
    let temp = tempdir().unwrap();
    let (_, descriptors) = load_fixture(temp.path());
    assert_eq!(descriptors.len(), 3);
    assert_eq!(descriptors.tree_numbers("D000069059").len(), 2);
    assert!(descriptors.tree_numbers("Dbroken").is_empty());
}

#[test]
fn flat_file_batch_scores_like_in_memory() {
    let temp = tempdir().unwrap();
    let (catalog, descriptors) = load_fixture(temp.path());
    let batch_dir = temp.path().join("batches").join("b001");
    write_batch_one(&batch_dir);

    let batch = FlatFileBatch::new(&batch_dir);
    assert_eq!(batch.batch_id(), "b001");
    let aggregator = RelevanceAggregator::from_batch(&batch, descriptors).unwrap();

    let statin = catalog.get("atorvastatin").unwrap();
    assert_eq!(aggregator.summarize("100", statin).scores, [1, 3, 1, 1, 0, 1]);

    let covid = catalog.get("long_covid").unwrap();
    let summary = aggregator.summarize("101", covid);
    assert_eq!(summary.score(Signal::Title), 1);
    assert_eq!(summary.score(Signal::TaxonomyBranch), 0);
    assert_eq!(summary.score(Signal::Heading), 0);
    assert_eq!(summary.score(Signal::Keyword), 1);
    assert_eq!(summary.score(Signal::Chemical), 0);
}

#[test]
fn superseded_and_deleted_articles_follow_last_occurrence() {
    let temp = tempdir().unwrap();
    let (catalog, descriptors) = load_fixture(temp.path());
    let dir = temp.path().join("b002");
    write(&dir, "articles.tsv", "200\n201\n200\n");
    write(&dir, "deleted.tsv", "201\n");
    write(
        &dir,
        "headings.tsv",
        "200\tD000069059\n201\tD000069059\n200#2\tD006801\n",
    );
    write(&dir, "abstracts.tsv", "200\tatorvastatin lower ldl\n");
    write(&dir, "chemicals.tsv", "201\tD000069059\n200\tD000069059\n");

    let aggregator =
        RelevanceAggregator::from_batch(&FlatFileBatch::new(&dir), descriptors).unwrap();
    let statin = catalog.get("atorvastatin").unwrap();
    let ids: Vec<&String> = aggregator.tables().article_ids().collect();
    assert_eq!(ids, vec!["200"]);
    // the second appearance of 200 only carries D006801 and has no abstract or chemicals
    let revised = aggregator.summarize("200", statin);
    assert_eq!(revised.score(Signal::Heading), -1);
    assert_eq!(revised.score(Signal::Abstract), 0);
    assert_eq!(revised.score(Signal::Chemical), 0);
    assert!(aggregator.tables().chemicals().select_by_foreign("D000069059").next().is_none());
}

#[test]
fn batch_root_run_persists_once_per_subject_and_batch() {
    let temp = tempdir().unwrap();
    let (catalog, descriptors) = load_fixture(temp.path());
    let root = temp.path().join("batches");
    write_batch_one(&root.join("b001"));
    write(&root.join("b002"), "titles.tsv", "300\tlipitor and atorvastatin\n");
    let out = temp.path().join("out");
    let config = ScoringConfig::default()
        .with_output_dir(&out)
        .with_worker_threads(2)
        .with_ledger_path(out.join("ledger.jsonl"));

    let subjects = catalog.to_vec();
    let first = score_batch_root(&config, &subjects, descriptors.clone(), &root).unwrap();
    assert_eq!(first.batches_scored, 2);
    assert_eq!(first.tally.skipped_subjects, 0);

    let writer = SummaryDirectoryWriter::new(&out).unwrap();
    let statin_rows = read_summary_file(&writer.subject_path("atorvastatin")).unwrap();
    let mut statin_articles: Vec<&str> = statin_rows
        .iter()
        .map(|summary| summary.article_id.as_str())
        .collect();
    statin_articles.sort_unstable();
    assert_eq!(statin_articles, vec!["100", "300"]);
    assert!(statin_rows.iter().all(RelevanceSummary::keep));
    let lipitor = statin_rows
        .iter()
        .find(|summary| summary.article_id == "300")
        .unwrap();
    assert_eq!(lipitor.score(Signal::Title), 2);

    let covid_rows = read_summary_file(&writer.subject_path("long_covid")).unwrap();
    assert_eq!(covid_rows.len(), 1);
    assert_eq!(covid_rows[0].article_id, "101");

    let second = score_batch_root(&config, &subjects, descriptors, &root).unwrap();
    assert_eq!(second.tally.skipped_subjects, 4);
    assert_eq!(second.tally.scored(), 0);
    assert_eq!(
        read_summary_file(&writer.subject_path("atorvastatin")).unwrap(),
        statin_rows
    );
}

#[test]
fn keep_all_persists_discarded_pairs_too() {
    let temp = tempdir().unwrap();
    let (catalog, descriptors) = load_fixture(temp.path());
    let root = temp.path().join("batches");
    write_batch_one(&root.join("b001"));
    let out = temp.path().join("out");
    let config = ScoringConfig::default()
        .with_output_dir(&out)
        .with_worker_threads(1)
        .with_keep_only_relevant(false);

    let report = score_batch_root(&config, &catalog.to_vec(), descriptors, &root).unwrap();
    assert_eq!(report.tally.kept, 6);
    assert_eq!(report.tally.discarded, 0);
    let writer = SummaryDirectoryWriter::new(&out).unwrap();
    assert_eq!(
        read_summary_file(&writer.subject_path("atorvastatin")).unwrap().len(),
        3
    );
}

#[test]
fn unreadable_batch_is_abandoned_without_stopping_the_run() {
    let temp = tempdir().unwrap();
    let (catalog, descriptors) = load_fixture(temp.path());
    let root = temp.path().join("batches");
    write_batch_one(&root.join("b001"));
    let bad = root.join("b000");
    write(&bad, "articles.tsv", "1\n");
    // a directory where a file is expected cannot be read
    fs::create_dir_all(bad.join("headings.tsv")).unwrap();

    let config = ScoringConfig::default()
        .with_output_dir(temp.path().join("out"))
        .with_worker_threads(1);
    let report = score_batch_root(&config, &catalog.to_vec(), descriptors, &root).unwrap();
    assert_eq!(report.batches_abandoned, 1);
    assert_eq!(report.batches_scored, 1);
}
