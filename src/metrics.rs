use std::fmt;
use std::ops::AddAssign;

use crate::scoring::Signal;
use crate::summary::RelevanceSummary;

/// Outcome counts for one signal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SignalOutcomes {
    /// Scores above zero.
    pub positive: usize,
    /// Scores below zero.
    pub negative: usize,
    /// Zero scores, including not-applicable ones.
    pub neutral: usize,
}

impl SignalOutcomes {
    fn observe(&mut self, score: i32) {
        match score {
            s if s > 0 => self.positive += 1,
            s if s < 0 => self.negative += 1,
            _ => self.neutral += 1,
        }
    }

    /// Total observations.
    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }
}

/// Per-signal outcome counts plus keep/discard totals for a scoring run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignalTally {
    /// Outcomes indexed by [`Signal::index`].
    pub per_signal: [SignalOutcomes; Signal::COUNT],
    /// Summaries handed to the sink.
    pub kept: usize,
    /// Summaries dropped by the keep filter.
    pub discarded: usize,
    /// Subjects skipped because the ledger already recorded them for the batch.
    pub skipped_subjects: usize,
}

impl SignalTally {
    /// Empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one summary and whether it survived the keep filter.
    pub fn observe(&mut self, summary: &RelevanceSummary, kept: bool) {
        for signal in Signal::ALL {
            self.per_signal[signal.index()].observe(summary.score(signal));
        }
        if kept {
            self.kept += 1;
        } else {
            self.discarded += 1;
        }
    }

    /// Counts for one signal.
    pub fn outcomes(&self, signal: Signal) -> SignalOutcomes {
        self.per_signal[signal.index()]
    }

    /// Summaries scored, kept or not.
    pub fn scored(&self) -> usize {
        self.kept + self.discarded
    }
}

impl AddAssign<&SignalTally> for SignalTally {
    fn add_assign(&mut self, other: &SignalTally) {
        for (mine, theirs) in self.per_signal.iter_mut().zip(&other.per_signal) {
            mine.positive += theirs.positive;
            mine.negative += theirs.negative;
            mine.neutral += theirs.neutral;
        }
        self.kept += other.kept;
        self.discarded += other.discarded;
        self.skipped_subjects += other.skipped_subjects;
    }
}

impl fmt::Display for SignalTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kept={} discarded={}", self.kept, self.discarded)?;
        for signal in Signal::ALL {
            let outcomes = self.outcomes(signal);
            write!(
                f,
                " {}={}/{}/{}",
                signal.name(),
                outcomes.positive,
                outcomes.negative,
                outcomes.neutral
            )?;
        }
        Ok(())
    }
}
