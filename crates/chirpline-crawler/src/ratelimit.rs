//! Rate-window tracking per credential and search mode

use crate::mode::SearchMode;

/// One credential's remaining call budget and reset time for one search mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub remaining: u32,
    /// Epoch seconds when the budget refills
    pub reset_at: i64,
}

impl RateWindow {
    /// Window for a credential that has never been queried.
    ///
    /// Zero remaining with an already-past reset: the selector will not
    /// prefer it over credentials with a known budget, and once everything
    /// else is exhausted the forced status query resolves the real window.
    pub fn unknown() -> Self {
        Self {
            remaining: 0,
            reset_at: 0,
        }
    }
}

/// Both mode windows of one credential, as a status query reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeWindows {
    pub keyword: RateWindow,
    pub user: RateWindow,
}

impl ModeWindows {
    pub fn get(&self, mode: SearchMode) -> RateWindow {
        match mode {
            SearchMode::Keyword => self.keyword,
            SearchMode::User => self.user,
        }
    }
}

/// Rate windows for every credential, indexed in configuration order.
///
/// Mutated only from fetch-response metadata and explicit status queries;
/// the account selector reads snapshots.
#[derive(Debug)]
pub struct RateLimitTracker {
    windows: Vec<ModeWindows>,
}

impl RateLimitTracker {
    /// All credentials start unknown (treated as exhausted until queried).
    pub fn new(accounts: usize) -> Self {
        Self {
            windows: vec![
                ModeWindows {
                    keyword: RateWindow::unknown(),
                    user: RateWindow::unknown(),
                };
                accounts
            ],
        }
    }

    /// Overwrite one credential/mode window from response metadata.
    pub fn record(&mut self, account: usize, mode: SearchMode, window: RateWindow) {
        match mode {
            SearchMode::Keyword => self.windows[account].keyword = window,
            SearchMode::User => self.windows[account].user = window,
        }
    }

    /// Overwrite both windows from a status query.
    pub fn record_both(&mut self, account: usize, status: ModeWindows) {
        self.windows[account] = status;
    }

    pub fn query(&self, account: usize, mode: SearchMode) -> RateWindow {
        self.windows[account].get(mode)
    }

    /// One call was spent but the response carried no rate metadata:
    /// debit the last known window so rotation still converges.
    pub fn debit(&mut self, account: usize, mode: SearchMode) {
        let mut window = self.query(account, mode);
        window.remaining = window.remaining.saturating_sub(1);
        self.record(account, mode, window);
    }

    /// Current windows for `mode` across all credentials, in config order.
    pub fn snapshot(&self, mode: SearchMode) -> Vec<RateWindow> {
        self.windows.iter().map(|w| w.get(mode)).collect()
    }
}
