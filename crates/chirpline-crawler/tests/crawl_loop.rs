//! End-to-end crawl loop tests against a scripted transport

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::ProgressBar;
use tempfile::TempDir;

use chirpline_crawler::config::{Account, CrawlConfig, SearchConfig};
use chirpline_crawler::mode::SearchMode;
use chirpline_crawler::normalize::{FetchOutcome, PostRecord};
use chirpline_crawler::progress::ProgressStore;
use chirpline_crawler::ratelimit::{ModeWindows, RateWindow};
use chirpline_crawler::runner;
use chirpline_crawler::transport::{PageBounds, Transport, TransportError};

/// Reset time far enough out that no window expires during a test.
const FAR_RESET: i64 = 4_000_000_000;

/// Transport that replays a scripted sequence of outcomes, recording the
/// bounds each fetch was parameterized with. Once the script runs dry every
/// search fails, and the runner spins on its (zero-delay) retry until the
/// budget ends the run.
struct ScriptedTransport {
    script: Mutex<VecDeque<FetchOutcome>>,
    bounds_seen: Mutex<Vec<PageBounds>>,
}

impl ScriptedTransport {
    fn new(outcomes: Vec<FetchOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            bounds_seen: Mutex::new(Vec::new()),
        }
    }

    fn bounds(&self) -> Vec<PageBounds> {
        self.bounds_seen.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn search(
        &self,
        _account: &Account,
        _mode: SearchMode,
        _key: &str,
        bounds: PageBounds,
    ) -> Result<(FetchOutcome, Option<RateWindow>), TransportError> {
        self.bounds_seen.lock().unwrap().push(bounds);
        match self.script.lock().unwrap().pop_front() {
            Some(outcome) => Ok((
                outcome,
                Some(RateWindow {
                    remaining: 400,
                    reset_at: FAR_RESET,
                }),
            )),
            None => Err(TransportError::Network("script exhausted".to_string())),
        }
    }

    fn rate_limit_status(&self, _account: &Account) -> Result<ModeWindows, TransportError> {
        let window = RateWindow {
            remaining: 450,
            reset_at: FAR_RESET,
        };
        Ok(ModeWindows {
            keyword: window,
            user: window,
        })
    }
}

fn record(id: u64) -> PostRecord {
    PostRecord {
        id,
        time: format!("2019-01-21 10:00:{:02}", id % 60),
        text: Some(format!("post {id}")),
        ..Default::default()
    }
}

fn outcome(ids: &[u64], fetched_at: i64) -> FetchOutcome {
    let records: Vec<PostRecord> = ids.iter().map(|&id| record(id)).collect();
    let mut result = FetchOutcome {
        count: records.len(),
        fetched_at,
        ..Default::default()
    };
    if let Some(&max) = ids.iter().max() {
        result.batch_max_id = Some(max);
        result.batch_max_time = Some(record(max).time);
    }
    if let Some(&min) = ids.iter().min() {
        result.batch_min_id = Some(min);
        result.batch_min_time = Some(record(min).time);
    }
    result.records = records;
    result
}

fn config(dir: &TempDir, budget: Duration) -> CrawlConfig {
    CrawlConfig {
        mode: SearchMode::Keyword,
        keys: vec!["rust".to_string()],
        accounts: vec![Account {
            name: "alpha".to_string(),
            bearer_token: "token".to_string(),
        }],
        api_base: "http://localhost:1".to_string(),
        search: SearchConfig {
            lang: None,
            ..Default::default()
        },
        output_dir: dir.path().join("results"),
        checkpoint: dir.path().join("state.json"),
        budget,
        flush_interval: Duration::from_secs(3600),
        retry_delay: Duration::ZERO,
    }
}

#[test]
fn sweep_update_catchup_lifecycle() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, Duration::from_millis(150));

    let transport = ScriptedTransport::new(vec![
        // initial sweep: two pages back, then exhaustion sets the floor
        outcome(&[150, 120, 100], 1),
        outcome(&[99, 70, 50], 2),
        outcome(&[], 3),
        // forward update finds two new posts, gap still open
        outcome(&[170, 160], 4),
        // catch-up page reaches the floor: overlap trimmed, floor advances
        outcome(&[155, 150], 5),
        // steady-state poll with nothing new
        outcome(&[], 6),
    ]);

    let summary = runner::run(&cfg, &transport, &ProgressBar::hidden()).unwrap();

    let bounds = transport.bounds();
    assert!(bounds.len() >= 6);
    // new: unbounded
    assert_eq!(bounds[0], PageBounds::default());
    // paging below each recent page, no floor yet
    assert_eq!(bounds[1].max_id, Some(99));
    assert_eq!(bounds[1].since_id, None);
    assert_eq!(bounds[2].max_id, Some(49));
    // first update above the ceiling set by the sweep
    assert_eq!(bounds[3], PageBounds { max_id: None, since_id: Some(150) });
    // catch-up paging keeps the floor post in range
    assert_eq!(bounds[4], PageBounds { max_id: Some(159), since_id: Some(149) });
    // floor advanced: next poll is above the new ceiling
    assert_eq!(bounds[5], PageBounds { max_id: None, since_id: Some(170) });

    // 150 re-fetched on the catch-up page is trimmed from export
    assert_eq!(summary.records, 9);
    assert_eq!(summary.units, 1);

    let store = ProgressStore::load(&cfg.checkpoint).unwrap();
    let progress = store.progress("rust");
    assert!(!progress.in_initial_sweep());
    assert_eq!(progress.max_id, Some(170));
    assert_eq!(progress.min_id, Some(50));
    assert_eq!(progress.recent_min, Some(150));
    assert_eq!(progress.since_id, Some(170));
    assert_eq!(progress.total_fetched, 10);
    assert_eq!(progress.last_updated_at, Some(6));

    let csv = std::fs::read_to_string(dir.path().join("results/posts_0000.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 10); // header + 9 records
    assert!(lines[0].starts_with("\"key\",\"id\","));
    assert!(lines[1].starts_with("\"rust\",\"150\","));
    // the trimmed boundary post appears exactly once
    let boundary_rows = lines
        .iter()
        .filter(|l| l.starts_with("\"rust\",\"150\","))
        .count();
    assert_eq!(boundary_rows, 1);
}

#[test]
fn resume_continues_in_steady_state() {
    let dir = TempDir::new().unwrap();

    // first run: full sweep plus one update cycle
    let cfg = config(&dir, Duration::from_millis(120));
    let transport = ScriptedTransport::new(vec![
        outcome(&[150, 100], 1),
        outcome(&[], 2),
        outcome(&[170, 160], 3),
        outcome(&[165, 150], 4),
    ]);
    runner::run(&cfg, &transport, &ProgressBar::hidden()).unwrap();

    let before = ProgressStore::load(&cfg.checkpoint).unwrap().progress("rust");
    assert_eq!(before.since_id, Some(170));

    // second run resumes from the checkpoint: first fetch must be a forward
    // poll above the stored ceiling, not a fresh sweep
    let cfg = config(&dir, Duration::from_millis(120));
    let transport = ScriptedTransport::new(vec![outcome(&[180, 175], 10)]);
    runner::run(&cfg, &transport, &ProgressBar::hidden()).unwrap();

    let bounds = transport.bounds();
    assert_eq!(
        bounds[0],
        PageBounds {
            max_id: None,
            since_id: Some(170)
        }
    );

    let progress = ProgressStore::load(&cfg.checkpoint).unwrap().progress("rust");
    assert_eq!(progress.max_id, Some(180));
    assert_eq!(progress.recent_min, Some(175));
    assert_eq!(progress.since_id, Some(170));
    assert_eq!(progress.total_fetched, 8);

    // output numbering continued instead of clobbering the first unit
    assert!(dir.path().join("results/posts_0000.csv").exists());
    assert!(dir.path().join("results/posts_0001.csv").exists());
}

#[test]
fn barren_key_stays_selectable() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, Duration::from_millis(80));

    // the key never yields anything: every fetch is an unbounded new search
    let transport = ScriptedTransport::new(vec![
        outcome(&[], 1),
        outcome(&[], 2),
        outcome(&[], 3),
    ]);
    let summary = runner::run(&cfg, &transport, &ProgressBar::hidden()).unwrap();

    let bounds = transport.bounds();
    assert!(bounds[..3].iter().all(|b| *b == PageBounds::default()));
    assert_eq!(summary.records, 0);
    // no output unit for an empty run
    assert!(!dir.path().join("results/posts_0000.csv").exists());

    let progress = ProgressStore::load(&cfg.checkpoint).unwrap().progress("rust");
    assert!(progress.in_initial_sweep());
    assert_eq!(progress.total_fetched, 0);
}
