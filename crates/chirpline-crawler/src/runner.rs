//! Crawl orchestrator - the account/key scheduling loop
//!
//! One sequential control flow: pick a credential, pick a key and fetch
//! mode, fetch, apply the pagination transition, buffer records, and flush
//! output plus checkpoint on a fixed cadence. Transient failures sleep a
//! fixed delay and re-enter the loop; only the time budget, a shutdown
//! signal, or a startup configuration error ends a run.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::ProgressBar;

use chirpline_core::{
    is_shutdown_requested, next_unit_number, retry_indefinitely, sleep_interruptible, unit_path,
    CsvSink,
};

use crate::account::{self, Selection, RESET_SLACK};
use crate::batch;
use crate::config::CrawlConfig;
use crate::keysel;
use crate::normalize::trim_floor_overlap;
use crate::progress::ProgressStore;
use crate::ratelimit::RateLimitTracker;
use crate::timefmt;
use crate::transport::{page_bounds, Transport};

/// Totals reported when a run ends.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrawlSummary {
    pub crawls: u64,
    pub records: u64,
    pub units: u64,
    pub elapsed: Duration,
}

/// Run the crawl loop until the budget elapses or shutdown is requested.
pub fn run<T: Transport>(
    config: &CrawlConfig,
    transport: &T,
    status: &ProgressBar,
) -> Result<CrawlSummary> {
    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Cannot create output directory {}",
            config.output_dir.display()
        )
    })?;

    let mut store = ProgressStore::load(&config.checkpoint)?;
    store.ensure_keys(&config.keys);
    log::info!(
        "crawl starting: mode {}, {} keys, {} accounts, budget {}m, flush every {}s",
        config.mode,
        config.keys.len(),
        config.accounts.len(),
        config.budget.as_secs() / 60,
        config.flush_interval.as_secs()
    );

    let mut tracker = RateLimitTracker::new(config.accounts.len());
    prime_tracker(&mut tracker, transport, config);

    let start = Instant::now();
    let mut lap_start = Instant::now();
    let mut unit = next_unit_number(&config.output_dir)?;
    let mut buffer: Vec<Vec<String>> = Vec::new();
    let mut summary = CrawlSummary::default();

    while start.elapsed() < config.budget && !is_shutdown_requested() {
        let Some(account) = select_account(&mut tracker, transport, config) else {
            break; // shutdown during the reset wait
        };
        let Some((key, mode)) = keysel::select(&config.keys, &store) else {
            anyhow::bail!("no search keys configured");
        };
        let key = key.to_string();

        summary.crawls += 1;
        log::info!(
            "crawl #{}: key '{}', account '{}', mode {}",
            summary.crawls,
            key,
            config.accounts[account].name,
            mode
        );
        status.set_message(format!(
            "crawl #{} | '{}' [{}] | {} records",
            summary.crawls, key, mode, summary.records
        ));

        let prev = store.progress(&key);
        let bounds = page_bounds(mode, &prev);
        let (mut outcome, window) =
            match transport.search(&config.accounts[account], config.mode, &key, bounds) {
                Ok(result) => result,
                Err(e) => {
                    log::warn!(
                        "fetch for '{}' via '{}' failed: {e}, retrying in {}s",
                        key,
                        config.accounts[account].name,
                        config.retry_delay.as_secs()
                    );
                    if !sleep_interruptible(config.retry_delay) {
                        break;
                    }
                    continue;
                }
            };

        match window {
            Some(window) => tracker.record(account, config.mode, window),
            None => tracker.debit(account, config.mode),
        }

        let (next, applied) = batch::apply(&prev, &outcome);
        if applied.empty_key {
            log::warn!("no posts found for '{key}' - consider removing this key");
        }
        if applied.sweep_done {
            log::info!(
                "'{key}': backward sweep complete, floor at {:?}",
                next.since_id
            );
        }
        if applied.floor_advanced {
            log::debug!("'{key}': caught up, floor advanced to {:?}", next.since_id);
        }

        trim_floor_overlap(&mut outcome, prev.since_id);
        summary.records += outcome.records.len() as u64;
        for record in &outcome.records {
            buffer.push(record.to_row(&key));
        }
        if outcome.count > 0 {
            log::info!(
                "'{key}': {} posts ({} - {}), total {}",
                outcome.count,
                outcome.batch_min_time.as_deref().unwrap_or("?"),
                outcome.batch_max_time.as_deref().unwrap_or("?"),
                next.total_fetched
            );
        }
        store.insert(key, next);

        if lap_start.elapsed() >= config.flush_interval {
            if flush_unit(&mut buffer, &config.output_dir, &mut unit)? {
                summary.units += 1;
            }
            store.save(&config.checkpoint)?;
            lap_start = Instant::now();
        }
    }

    if flush_unit(&mut buffer, &config.output_dir, &mut unit)? {
        summary.units += 1;
    }
    store.save(&config.checkpoint)?;
    summary.elapsed = start.elapsed();
    log::info!(
        "crawl finished: {} crawls, {} records, {} output units in {:.0}s",
        summary.crawls,
        summary.records,
        summary.units,
        summary.elapsed.as_secs_f64()
    );
    Ok(summary)
}

/// Startup status queries: every credential gets a real window before the
/// first selection, so an unqueried credential cannot shadow a known-good
/// one. Retries forever on transient failure; only shutdown abandons it.
fn prime_tracker<T: Transport>(
    tracker: &mut RateLimitTracker,
    transport: &T,
    config: &CrawlConfig,
) {
    for (index, account) in config.accounts.iter().enumerate() {
        if is_shutdown_requested() {
            return;
        }
        let label = format!("rate-limit status for '{}'", account.name);
        match retry_indefinitely(&label, config.retry_delay, || {
            transport.rate_limit_status(account)
        }) {
            Ok(windows) => {
                log::debug!(
                    "'{}': keyword {} left (reset {}), timeline {} left (reset {})",
                    account.name,
                    windows.keyword.remaining,
                    timefmt::epoch_to_export(windows.keyword.reset_at),
                    windows.user.remaining,
                    timefmt::epoch_to_export(windows.user.reset_at)
                );
                tracker.record_both(index, windows);
            }
            Err(e) => {
                // only reachable when shutdown interrupted the retry sleep
                log::warn!("{label} abandoned: {e}");
                return;
            }
        }
    }
}

/// Pick a credential for this iteration.
///
/// When every credential is exhausted, wait out the earliest reset (plus
/// slack), refresh that credential's windows with a forced status query,
/// then hand it back. Returns `None` only when shutdown interrupts a wait.
fn select_account<T: Transport>(
    tracker: &mut RateLimitTracker,
    transport: &T,
    config: &CrawlConfig,
) -> Option<usize> {
    match account::pick(&tracker.snapshot(config.mode), Utc::now().timestamp()) {
        Selection::Ready { account } => Some(account),
        Selection::Exhausted { account, wait_secs } => {
            let name = &config.accounts[account].name;
            let reset_at = tracker.query(account, config.mode).reset_at;
            log::info!(
                "all accounts exhausted; waiting {}s for '{name}' (resumes at {})",
                wait_secs + RESET_SLACK,
                timefmt::epoch_to_export(reset_at + RESET_SLACK as i64)
            );
            if !sleep_interruptible(Duration::from_secs(wait_secs + RESET_SLACK)) {
                return None;
            }
            match retry_indefinitely(
                &format!("rate-limit status for '{name}'"),
                config.retry_delay,
                || transport.rate_limit_status(&config.accounts[account]),
            ) {
                Ok(windows) => tracker.record_both(account, windows),
                Err(_) => return None, // shutdown mid-retry
            }
            Some(account)
        }
    }
}

/// Drain the buffer into a fresh output unit. An empty buffer writes nothing.
fn flush_unit(buffer: &mut Vec<Vec<String>>, dir: &Path, unit: &mut usize) -> Result<bool> {
    if buffer.is_empty() {
        return Ok(false);
    }
    let path = unit_path(dir, *unit);
    let mut sink = CsvSink::open(&path)
        .with_context(|| format!("Cannot open output unit {}", path.display()))?;
    for row in buffer.drain(..) {
        sink.append(&row)
            .with_context(|| format!("Cannot write {}", path.display()))?;
    }
    let rows = sink.finalize()?;
    log::info!("wrote {rows} rows to {}", path.display());
    *unit += 1;
    Ok(true)
}
