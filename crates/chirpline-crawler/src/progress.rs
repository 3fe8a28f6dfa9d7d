//! Per-key pagination progress and the checkpoint it persists to

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Crawl phase of a key, derived from floor nullability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Initial backward sweep toward the oldest reachable post
    Sweep,
    /// Post-sweep: forward polling for new posts only
    SteadyState,
}

/// Pagination/progress record for one search key.
///
/// `max_id`/`min_id` bound everything ever seen for the key; `recent_min` is
/// the oldest id of the most recent page and drives backward pagination;
/// `since_id` is the floor below which pagination never goes again, set once
/// the initial sweep exhausts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyProgress {
    pub max_id: Option<u64>,
    pub max_time: Option<String>,
    pub min_id: Option<u64>,
    pub min_time: Option<String>,
    pub recent_min: Option<u64>,
    pub since_id: Option<u64>,
    /// Epoch seconds of the last successful fetch
    pub last_updated_at: Option<i64>,
    pub total_fetched: u64,
}

impl KeyProgress {
    /// A key is sweeping until its recent page, floor, and update stamp all
    /// exist.
    pub fn in_initial_sweep(&self) -> bool {
        self.recent_min.is_none() || self.since_id.is_none() || self.last_updated_at.is_none()
    }

    pub fn phase(&self) -> Phase {
        if self.since_id.is_none() {
            Phase::Sweep
        } else {
            Phase::SteadyState
        }
    }
}

/// Checkpointed progress for every search key.
///
/// The in-memory map is the single source of truth during a run; `save`
/// persists it atomically (tmp → rename) and `load` restores it, so a run
/// resumes exactly where the previous one stopped.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProgressStore {
    keys: BTreeMap<String, KeyProgress>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a checkpoint file; a missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read checkpoint {}", path.display()))?;
        let keys: BTreeMap<String, KeyProgress> = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse checkpoint {}", path.display()))?;
        Ok(Self { keys })
    }

    /// Persist atomically: write to `<path>.tmp`, then rename over `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(&self.keys).context("failed to serialize checkpoint")?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("failed to rename {} into place", tmp.display()))?;
        Ok(())
    }

    /// Ensure every configured key has an entry; keys already checkpointed
    /// keep their progress, keys no longer configured are retained but never
    /// selected.
    pub fn ensure_keys<S: AsRef<str>>(&mut self, keys: &[S]) {
        for key in keys {
            self.keys.entry(key.as_ref().to_string()).or_default();
        }
    }

    /// Progress for `key`; unseen keys read as a fresh record.
    pub fn progress(&self, key: &str) -> KeyProgress {
        self.keys.get(key).cloned().unwrap_or_default()
    }

    pub fn insert(&mut self, key: String, progress: KeyProgress) {
        self.keys.insert(key, progress);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &KeyProgress)> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
