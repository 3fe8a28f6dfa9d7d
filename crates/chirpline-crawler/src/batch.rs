//! Pure pagination-state transitions applied after each fetch
//!
//! The transition table is the heart of the scheduler: it decides when a
//! key's backward sweep is finished, when its floor is set, and when a
//! forward catch-up has closed its gap. Downstream correctness (no
//! re-fetching, no permanent gaps) depends on these branches, so they are
//! pure functions with no I/O - the orchestrator logs what [`Applied`]
//! reports.

use crate::normalize::FetchOutcome;
use crate::progress::{KeyProgress, Phase};

/// What a transition did, surfaced for logging by the orchestrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Applied {
    /// The key has never yielded a single record (stays in new mode).
    pub empty_key: bool,
    /// The backward sweep finished and the floor was set.
    pub sweep_done: bool,
    /// A forward catch-up completed and the floor advanced.
    pub floor_advanced: bool,
}

/// Apply one fetch outcome to a key's progress.
///
/// Returns the updated progress and what happened; the input is untouched.
pub fn apply(prev: &KeyProgress, outcome: &FetchOutcome) -> (KeyProgress, Applied) {
    let mut next = prev.clone();
    let mut applied = Applied::default();

    match prev.phase() {
        Phase::Sweep => apply_sweep(&mut next, outcome, &mut applied),
        Phase::SteadyState => apply_steady(&mut next, outcome, &mut applied),
    }

    next.last_updated_at = Some(outcome.fetched_at);
    next.total_fetched += outcome.count as u64;
    (next, applied)
}

/// Sweep phase: the floor is unset, pages walk backward through history.
fn apply_sweep(next: &mut KeyProgress, outcome: &FetchOutcome, applied: &mut Applied) {
    if outcome.count > 0 {
        if next.max_id.is_none() && next.min_id.is_none() {
            // first page ever: the batch ceiling becomes the key ceiling
            next.max_id = outcome.batch_max_id;
            next.max_time = outcome.batch_max_time.clone();
        }
        // walking backward only ever tightens the lower bound
        next.min_id = outcome.batch_min_id;
        next.min_time = outcome.batch_min_time.clone();
        next.recent_min = outcome.batch_min_id;
    } else if let Some(max_id) = next.max_id {
        // nothing older left: the ceiling becomes the floor, the key moves
        // to steady state
        next.since_id = Some(max_id);
        applied.sweep_done = true;
    } else {
        applied.empty_key = true;
    }
}

/// Steady state: the floor is set, pages walk forward from it.
fn apply_steady(next: &mut KeyProgress, outcome: &FetchOutcome, applied: &mut Applied) {
    if outcome.count == 0 {
        return;
    }
    if next.max_id == next.since_id {
        // first page of a catch-up: the batch ceiling is the new key ceiling
        next.max_id = outcome.batch_max_id;
        next.max_time = outcome.batch_max_time.clone();
    }
    next.recent_min = outcome.batch_min_id;
    if next.recent_min == next.since_id {
        // caught up to the floor: advance it to the new ceiling
        next.since_id = next.max_id;
        applied.floor_advanced = true;
    }
}
