use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, error::ErrorKind};
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::aggregator::RelevanceAggregator;
use crate::config::ScoringConfig;
use crate::errors::RelevanceError;
use crate::ledger::ContributionLedger;
use crate::lemmatizer::BasicLemmatizer;
use crate::metrics::SignalTally;
use crate::persistence::SummaryDirectoryWriter;
use crate::scoring::Signal;
use crate::source::FlatFileBatch;
use crate::subject::{Subject, SubjectCatalog};
use crate::summary::filter_summary_file;
use crate::taxonomy::{DescriptorTreeIndex, TreeNumberRegistry};
use crate::transport::fs::BatchDirectories;

#[derive(Debug, Parser)]
#[command(
    name = "score_batches",
    disable_help_subcommand = true,
    about = "Score article batches against curated subjects",
    long_about = "Build signal tables for every flat-file batch under a root, score each article against every subject, and append relevant summaries to one file per subject.",
    after_help = "Subjects already recorded in the contribution ledger for a batch are skipped, so re-running over the same batches never duplicates output."
)]
struct ScoreBatchesCli {
    #[arg(long, value_name = "JSON", help = "JSON array of subject definitions")]
    subjects: PathBuf,
    #[arg(
        long,
        value_name = "TSV",
        help = "Descriptor file mapping descriptor keys to ';'-separated tree numbers"
    )]
    descriptors: PathBuf,
    #[arg(
        long = "batch-root",
        value_name = "DIR",
        help = "Directory searched recursively for batch directories"
    )]
    batch_root: PathBuf,
    #[arg(
        long = "output-dir",
        value_name = "DIR",
        help = "Directory receiving one summary file per subject"
    )]
    output_dir: PathBuf,
    #[arg(
        long,
        value_name = "PATH",
        help = "Contribution ledger path (defaults to contributions.jsonl inside the output directory)"
    )]
    ledger: Option<PathBuf>,
    #[arg(
        long,
        value_parser = parse_positive_usize,
        help = "Worker threads used for scoring (defaults to available parallelism)"
    )]
    threads: Option<usize>,
    #[arg(
        long = "keep-all",
        help = "Persist every summary, including ones with no positive signal"
    )]
    keep_all: bool,
}

#[derive(Debug, Parser)]
#[command(
    name = "filter_summaries",
    disable_help_subcommand = true,
    about = "Re-apply the relevance keep filter to a summary file"
)]
struct FilterSummariesCli {
    #[arg(long, value_name = "FILE", help = "Persisted summary file to read")]
    input: PathBuf,
    #[arg(long, value_name = "FILE", help = "Destination for kept summaries")]
    output: PathBuf,
}

/// Run the `score_batches` binary with the given arguments (program name excluded).
pub fn run_score_batches<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    init_tracing();
    let Some(cli) = parse_cli::<ScoreBatchesCli, _>(
        std::iter::once("score_batches".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let mut config = ScoringConfig::default()
        .with_output_dir(&cli.output_dir)
        .with_keep_only_relevant(!cli.keep_all);
    if let Some(threads) = cli.threads {
        config = config.with_worker_threads(threads);
    }
    let ledger_path = cli
        .ledger
        .clone()
        .unwrap_or_else(|| config.default_ledger_path());
    config = config.with_ledger_path(ledger_path);

    let mut registry = TreeNumberRegistry::new();
    let descriptors = Arc::new(DescriptorTreeIndex::load(&cli.descriptors, &mut registry)?);
    let catalog =
        SubjectCatalog::load(&cli.subjects, &BasicLemmatizer, &mut registry, &descriptors)?;

    let report = score_batch_root(&config, &catalog.to_vec(), descriptors, &cli.batch_root)?;

    println!("=== relevance scoring ===");
    println!("subjects: {}", catalog.len());
    println!("tree numbers interned: {}", registry.len());
    println!(
        "batches: {} scored, {} abandoned",
        report.batches_scored, report.batches_abandoned
    );
    println!("summaries kept: {}", report.tally.kept);
    println!("summaries discarded: {}", report.tally.discarded);
    println!(
        "subjects skipped (already contributed): {}",
        report.tally.skipped_subjects
    );
    for signal in Signal::ALL {
        let outcomes = report.tally.outcomes(signal);
        println!(
            "  {:<16} +{:<8} -{:<8} 0:{}",
            signal.name(),
            outcomes.positive,
            outcomes.negative,
            outcomes.neutral
        );
    }
    println!("output: {}", config.output_dir.display());
    Ok(())
}

/// Run the `filter_summaries` binary with the given arguments (program name excluded).
pub fn run_filter_summaries<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    init_tracing();
    let Some(cli) = parse_cli::<FilterSummariesCli, _>(
        std::iter::once("filter_summaries".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };
    let (kept, discarded) = filter_summary_file(&cli.input, &cli.output)?;
    println!(
        "kept {kept}, discarded {discarded} -> {}",
        cli.output.display()
    );
    Ok(())
}

/// Totals for a multi-batch run.
#[derive(Clone, Debug, Default)]
pub struct BatchRunReport {
    /// Batches whose subjects were scored.
    pub batches_scored: usize,
    /// Batches abandoned because their files could not be read.
    pub batches_abandoned: usize,
    /// Signal tallies summed over every scored batch.
    pub tally: SignalTally,
}

/// Score every batch directory under `batch_root` against `subjects`, persisting into
/// `config.output_dir`.
///
/// A batch that cannot be read is logged and abandoned; the remaining batches still
/// run. Persistence failures stop the whole run.
pub fn score_batch_root(
    config: &ScoringConfig,
    subjects: &[Arc<Subject>],
    descriptors: Arc<DescriptorTreeIndex>,
    batch_root: &Path,
) -> Result<BatchRunReport, RelevanceError> {
    config.validate()?;
    let sink = SummaryDirectoryWriter::new(&config.output_dir)?;
    let ledger = config
        .ledger_path
        .as_ref()
        .map(ContributionLedger::open)
        .transpose()?;

    let mut report = BatchRunReport::default();
    for dir in BatchDirectories::new(batch_root).discover()? {
        let batch = FlatFileBatch::new(&dir);
        let aggregator = match RelevanceAggregator::from_batch(&batch, descriptors.clone()) {
            Ok(aggregator) => aggregator.with_keep_only_relevant(config.keep_only_relevant),
            Err(err @ RelevanceError::BatchUnavailable { .. }) => {
                error!(path = %dir.display(), error = %err, "abandoning unreadable batch");
                report.batches_abandoned += 1;
                continue;
            }
            Err(err) => return Err(err),
        };
        let tally =
            aggregator.run_parallel(subjects, config.worker_threads, &sink, ledger.as_ref())?;
        report.tally += &tally;
        report.batches_scored += 1;
    }
    Ok(report)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("Could not parse '{raw}' as a positive integer"))?;
    if parsed == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
