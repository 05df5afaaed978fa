use crate::merge::merge_arguments;
use crate::outcome::Outcome;

/// Counters and per-row outcomes of one bounded-parallelism batch.
///
/// Outcomes are kept by row position and folded in that order, so the merged
/// arguments do not depend on the order in which responses arrive.
#[derive(Debug)]
pub(crate) struct BatchState {
    completed: usize,
    errored: usize,
    in_flight: usize,
    peak_in_flight: usize,
    paused: bool,
    outcomes: Vec<Option<Outcome>>,
}

/// Aggregate handed to the terminal callbacks.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct MergedOutcomes {
    pub(crate) success: Vec<serde_json::Value>,
    pub(crate) error: Vec<serde_json::Value>,
}

impl BatchState {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            completed: 0,
            errored: 0,
            in_flight: 0,
            peak_in_flight: 0,
            paused: false,
            outcomes: (0..total).map(|_| None).collect(),
        }
    }

    pub(crate) fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub(crate) fn completed(&self) -> usize {
        self.completed
    }

    pub(crate) fn errored(&self) -> usize {
        self.errored
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.completed == self.total()
    }

    /// Some rows failed and some did not.
    pub(crate) fn is_mixed(&self) -> bool {
        self.errored > 0 && self.errored < self.completed
    }

    pub(crate) fn rows_left(&self) -> usize {
        self.total() - self.completed
    }

    /// Records a dispatch and pauses once `max_in_flight` is reached while
    /// rows are still waiting.
    pub(crate) fn dispatched(&mut self, max_in_flight: usize, rows_waiting: bool) {
        self.in_flight += 1;
        self.peak_in_flight = self.peak_in_flight.max(self.in_flight);
        if rows_waiting && self.in_flight >= max_in_flight {
            self.paused = true;
        }
    }

    /// Stores the outcome for `slot`. Returns true when this completion
    /// resumed a paused dispatch loop.
    pub(crate) fn complete(&mut self, slot: usize, outcome: Outcome) -> bool {
        let Some(entry) = self.outcomes.get_mut(slot) else {
            tracing::warn!(slot, "Completion for unknown row ignored");
            return false;
        };
        if entry.is_some() {
            tracing::warn!(slot, "Duplicate completion ignored");
            return false;
        }
        if !outcome.is_success() {
            self.errored += 1;
        }
        *entry = Some(outcome);
        self.completed += 1;
        self.in_flight = self.in_flight.saturating_sub(1);

        let resumed = self.paused && !self.is_finished();
        self.paused = false;
        resumed
    }

    pub(crate) fn merged(&self) -> MergedOutcomes {
        let mut merged = MergedOutcomes::default();
        for outcome in self.outcomes.iter().flatten() {
            match outcome {
                Outcome::Succeeded(args) => merge_arguments(&mut merged.success, args.clone()),
                Outcome::Failed { args, .. } => merge_arguments(&mut merged.error, args.clone()),
            }
        }
        merged
    }
}
