//! Credential selection over a rate-window snapshot

use crate::ratelimit::RateWindow;

/// Extra seconds slept past a credential's reset time before trusting it.
pub const RESET_SLACK: u64 = 2;

/// Outcome of credential selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// A credential with budget left; use it immediately.
    Ready { account: usize },
    /// Every credential is exhausted: wait `wait_secs` (+ slack) for the
    /// earliest reset, refresh that credential's window, then use it.
    Exhausted { account: usize, wait_secs: u64 },
}

/// Pick the next credential from a snapshot of rate windows.
///
/// The credential with the most remaining calls wins; when every budget is
/// spent, the one whose window resets first. Ties break toward configuration
/// order, which keeps runs reproducible.
pub fn pick(windows: &[RateWindow], now: i64) -> Selection {
    let mut best = 0;
    for (i, w) in windows.iter().enumerate() {
        if w.remaining > windows[best].remaining {
            best = i;
        }
    }
    if windows[best].remaining > 0 {
        return Selection::Ready { account: best };
    }

    let mut soonest = 0;
    for (i, w) in windows.iter().enumerate() {
        if w.reset_at < windows[soonest].reset_at {
            soonest = i;
        }
    }
    let wait_secs = (windows[soonest].reset_at - now).max(0) as u64;
    Selection::Exhausted {
        account: soonest,
        wait_secs,
    }
}
