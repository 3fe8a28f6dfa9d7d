//! Search-key selection - sweep-first, then widest gap, then least recent

use crate::mode::FetchMode;
use crate::progress::ProgressStore;

/// Choose the next key to crawl and how to fetch it.
///
/// Keys still in their initial sweep always win, in configuration order, so
/// every key finishes its historical walk before any key is polled forward.
/// Once all keys are past the sweep, the key with the widest remaining gap
/// between its recent page and its floor is paged; with no gaps left, the
/// least recently updated key is polled. All ties break toward configuration
/// order.
///
/// Returns `None` only for an empty key list.
pub fn select<'k>(keys: &'k [String], store: &ProgressStore) -> Option<(&'k str, FetchMode)> {
    for key in keys {
        let p = store.progress(key);
        if p.in_initial_sweep() {
            let mode = if p.recent_min.is_none() {
                FetchMode::New
            } else {
                FetchMode::Paging
            };
            return Some((key, mode));
        }
    }

    // Steady state: gap between the latest page floor and the sweep floor.
    // Positive while a forward catch-up still has pages to walk.
    let mut widest: Option<(usize, i64)> = None;
    for (i, key) in keys.iter().enumerate() {
        let p = store.progress(key);
        let (Some(recent_min), Some(since_id)) = (p.recent_min, p.since_id) else {
            continue;
        };
        let diff = recent_min as i64 - since_id as i64;
        if widest.is_none_or(|(_, best)| diff > best) {
            widest = Some((i, diff));
        }
    }
    let (index, max_diff) = widest?;
    if max_diff > 0 {
        return Some((&keys[index], FetchMode::Paging));
    }

    let mut oldest = 0;
    for (i, key) in keys.iter().enumerate() {
        let stamp = store.progress(key).last_updated_at.unwrap_or(i64::MAX);
        if stamp < store.progress(&keys[oldest]).last_updated_at.unwrap_or(i64::MAX) {
            oldest = i;
        }
    }
    Some((&keys[oldest], FetchMode::Update))
}
