//! Per-batch relevance aggregation.
//!
//! [`RelevanceAggregator`] owns the read-only [`SignalTables`] for one batch and turns
//! every (article, subject) pair into a [`RelevanceSummary`]. Streaming callers use
//! [`RelevanceAggregator::aggregate`]; batch jobs use [`RelevanceAggregator::run_parallel`],
//! which fans subjects out over a bounded worker pool and joins before returning.

use rayon::prelude::*;
use std::borrow::Borrow;
use std::sync::Arc;
use tracing::{debug, info};

use crate::constants::aggregation::{ALREADY_CONTRIBUTED_MSG, RUN_FINISHED_MSG, RUN_STARTED_MSG};
use crate::errors::RelevanceError;
use crate::ingestion::SignalTables;
use crate::ledger::ContributionLedger;
use crate::metrics::SignalTally;
use crate::persistence::SummarySink;
use crate::scoring::Signal;
use crate::source::ArticleBatch;
use crate::subject::Subject;
use crate::summary::RelevanceSummary;
use crate::taxonomy::DescriptorTreeIndex;

/// Scores one batch against any number of subjects.
pub struct RelevanceAggregator {
    tables: SignalTables,
    keep_only_relevant: bool,
}

impl RelevanceAggregator {
    /// Wrap already built tables. The keep filter is on.
    pub fn new(tables: SignalTables) -> Self {
        Self {
            tables,
            keep_only_relevant: true,
        }
    }

    /// Build tables for `batch` and wrap them.
    pub fn from_batch(
        batch: &dyn ArticleBatch,
        descriptors: Arc<DescriptorTreeIndex>,
    ) -> Result<Self, RelevanceError> {
        Ok(Self::new(SignalTables::build(batch, descriptors)?))
    }

    /// Toggle the keep filter applied by [`Self::summaries`], [`Self::aggregate`], and
    /// [`Self::run_parallel`].
    pub fn with_keep_only_relevant(mut self, keep_only_relevant: bool) -> Self {
        self.keep_only_relevant = keep_only_relevant;
        self
    }

    /// Underlying tables.
    pub fn tables(&self) -> &SignalTables {
        &self.tables
    }

    /// Batch being scored.
    pub fn batch_id(&self) -> &str {
        self.tables.batch_id()
    }

    /// Evaluate all six signals for one pair, in [`Signal::ALL`] order.
    pub fn summarize(&self, article: &str, subject: &Subject) -> RelevanceSummary {
        let scores = Signal::ALL.map(|signal| signal.score(&self.tables, article, subject));
        RelevanceSummary::new(article, subject.key(), scores)
    }

    /// Lazily score every article of the batch against `subject`.
    pub fn summaries<'a>(
        &'a self,
        subject: &'a Subject,
    ) -> impl Iterator<Item = RelevanceSummary> + 'a {
        let keep_only_relevant = self.keep_only_relevant;
        self.tables
            .article_ids()
            .map(move |article| self.summarize(article, subject))
            .filter(move |summary| !keep_only_relevant || summary.keep())
    }

    /// Lazily score every article against every subject, subject-major.
    pub fn aggregate<'a, S>(
        &'a self,
        subjects: &'a [S],
    ) -> impl Iterator<Item = RelevanceSummary> + 'a
    where
        S: Borrow<Subject>,
    {
        subjects
            .iter()
            .flat_map(move |subject| self.summaries(<S as Borrow<Subject>>::borrow(subject)))
    }

    /// Score `subjects` on a pool of `worker_threads` workers, writing surviving summaries
    /// to `sink`.
    ///
    /// With a ledger, subjects already recorded for this batch are skipped, and each
    /// subject is recorded once its rows have been flushed. Any sink or ledger error
    /// aborts the run.
    pub fn run_parallel<S>(
        &self,
        subjects: &[S],
        worker_threads: usize,
        sink: &dyn SummarySink,
        ledger: Option<&ContributionLedger>,
    ) -> Result<SignalTally, RelevanceError>
    where
        S: Borrow<Subject> + Sync,
    {
        if worker_threads == 0 {
            return Err(RelevanceError::Configuration(
                "worker_threads must be greater than zero".to_string(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_threads)
            .thread_name(|idx| format!("relevance-worker-{idx}"))
            .build()
            .map_err(|err| RelevanceError::Configuration(err.to_string()))?;

        info!(
            batch_id = %self.batch_id(),
            articles = self.tables.article_ids().len(),
            subjects = subjects.len(),
            worker_threads,
            RUN_STARTED_MSG
        );

        let partials = pool.install(|| {
            subjects
                .par_iter()
                .map(|subject| {
                    self.score_subject(<S as Borrow<Subject>>::borrow(subject), sink, ledger)
                })
                .collect::<Result<Vec<SignalTally>, RelevanceError>>()
        })?;

        let mut tally = SignalTally::new();
        for partial in &partials {
            tally += partial;
        }
        info!(
            batch_id = %self.batch_id(),
            kept = tally.kept,
            discarded = tally.discarded,
            skipped_subjects = tally.skipped_subjects,
            signals = %tally,
            RUN_FINISHED_MSG
        );
        Ok(tally)
    }

    fn score_subject(
        &self,
        subject: &Subject,
        sink: &dyn SummarySink,
        ledger: Option<&ContributionLedger>,
    ) -> Result<SignalTally, RelevanceError> {
        let mut tally = SignalTally::new();
        let batch_id = self.batch_id();
        if let Some(ledger) = ledger
            && ledger.is_recorded(batch_id, subject.key())
        {
            debug!(batch_id = %batch_id, subject = %subject.key(), ALREADY_CONTRIBUTED_MSG);
            tally.skipped_subjects += 1;
            return Ok(tally);
        }
        for article in self.tables.article_ids() {
            let summary = self.summarize(article, subject);
            let kept = !self.keep_only_relevant || summary.keep();
            tally.observe(&summary, kept);
            if kept {
                sink.write(&summary)?;
            }
        }
        sink.flush_subject(subject.key())?;
        if let Some(ledger) = ledger {
            ledger.record(batch_id, subject.key())?;
        }
        Ok(tally)
    }
}
