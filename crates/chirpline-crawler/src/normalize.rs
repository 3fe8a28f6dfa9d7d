//! Response normalization - raw post JSON to the fixed export record
//!
//! The scheduler itself only needs record ids, author ids, timestamps, and
//! batch boundaries; the full 20-field record exists for CSV export. Field
//! extraction is an explicit enumerated list - a field missing from the
//! source object becomes `None`, never an error.

use chirpline_core::sink::strip_newlines;
use serde_json::Value;

use crate::timefmt;

/// One normalized post, one CSV row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostRecord {
    pub id: u64,
    /// Post creation time, export format
    pub time: String,
    pub author_id: Option<u64>,
    pub author_handle: Option<String>,
    pub author_name: Option<String>,
    pub author_created_at: Option<String>,
    pub author_followers_count: Option<u64>,
    pub author_following_count: Option<u64>,
    pub author_favorites_count: Option<u64>,
    pub author_post_count: Option<u64>,
    pub author_bio: Option<String>,
    pub author_banner_url: Option<String>,
    pub author_avatar_url: Option<String>,
    pub in_reply_to_post_id: Option<String>,
    pub in_reply_to_author_id: Option<String>,
    pub text: Option<String>,
    pub repost_count: Option<u64>,
    pub like_count: Option<u64>,
    pub source: Option<String>,
}

fn opt_str(obj: &Value, field: &str) -> Option<String> {
    obj.get(field).and_then(Value::as_str).map(String::from)
}

fn opt_u64(obj: &Value, field: &str) -> Option<u64> {
    obj.get(field).and_then(Value::as_u64)
}

fn col_str(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn col_num(value: Option<u64>) -> String {
    value.map(|n| n.to_string()).unwrap_or_default()
}

impl PostRecord {
    /// Render as a CSV row in the fixed column order.
    ///
    /// Free-text fields are newline-stripped here so every sink writes one
    /// physical line per record.
    pub fn to_row(&self, key: &str) -> Vec<String> {
        vec![
            key.to_string(),
            self.id.to_string(),
            self.time.clone(),
            col_num(self.author_id),
            col_str(&self.author_handle),
            col_str(&self.author_name),
            col_str(&self.author_created_at),
            col_num(self.author_followers_count),
            col_num(self.author_following_count),
            col_num(self.author_favorites_count),
            col_num(self.author_post_count),
            strip_newlines(&col_str(&self.author_bio)),
            col_str(&self.author_banner_url),
            col_str(&self.author_avatar_url),
            col_str(&self.in_reply_to_post_id),
            col_str(&self.in_reply_to_author_id),
            strip_newlines(&col_str(&self.text)),
            col_num(self.repost_count),
            col_num(self.like_count),
            col_str(&self.source),
        ]
    }
}

/// Normalize one raw post object.
///
/// Returns `None` for a record without a numeric id - nothing downstream can
/// use it, so it is dropped (the caller debug-logs the skip).
pub fn normalize_post(raw: &Value) -> Option<PostRecord> {
    let id = opt_u64(raw, "id")?;
    let author = raw.get("user").unwrap_or(&Value::Null);

    Some(PostRecord {
        id,
        time: opt_str(raw, "created_at")
            .and_then(|s| timefmt::created_at_to_export(&s))
            .unwrap_or_default(),
        author_id: opt_u64(author, "id"),
        author_handle: opt_str(author, "screen_name"),
        author_name: opt_str(author, "name"),
        author_created_at: opt_str(author, "created_at")
            .and_then(|s| timefmt::created_at_to_export(&s)),
        author_followers_count: opt_u64(author, "followers_count"),
        author_following_count: opt_u64(author, "friends_count"),
        author_favorites_count: opt_u64(author, "favourites_count"),
        author_post_count: opt_u64(author, "statuses_count"),
        author_bio: opt_str(author, "description"),
        author_banner_url: opt_str(author, "profile_banner_url"),
        author_avatar_url: opt_str(author, "profile_image_url"),
        in_reply_to_post_id: opt_str(raw, "in_reply_to_status_id_str"),
        in_reply_to_author_id: opt_str(raw, "in_reply_to_user_id_str"),
        text: opt_str(raw, "text"),
        repost_count: opt_u64(raw, "retweet_count"),
        like_count: opt_u64(raw, "favorite_count"),
        source: opt_str(raw, "source"),
    })
}

/// Outcome of one fetch: normalized records plus batch boundary statistics.
///
/// `count` and the batch bounds cover everything the fetch returned;
/// `records` is the export list and may be one shorter after the
/// floor-overlap trim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    pub records: Vec<PostRecord>,
    pub count: usize,
    pub batch_max_id: Option<u64>,
    pub batch_max_time: Option<String>,
    pub batch_min_id: Option<u64>,
    pub batch_min_time: Option<String>,
    /// Epoch seconds when the fetch completed
    pub fetched_at: i64,
}

/// Build a `FetchOutcome` from a batch of raw posts.
pub fn build_outcome(raw_posts: &[Value], fetched_at: i64) -> FetchOutcome {
    let mut records = Vec::with_capacity(raw_posts.len());
    for raw in raw_posts {
        match normalize_post(raw) {
            Some(record) => records.push(record),
            None => log::debug!("skipping post without numeric id"),
        }
    }

    let mut outcome = FetchOutcome {
        count: records.len(),
        fetched_at,
        ..Default::default()
    };
    if let Some(max) = records.iter().max_by_key(|r| r.id) {
        outcome.batch_max_id = Some(max.id);
        outcome.batch_max_time = Some(max.time.clone());
    }
    if let Some(min) = records.iter().min_by_key(|r| r.id) {
        outcome.batch_min_id = Some(min.id);
        outcome.batch_min_time = Some(min.time.clone());
    }
    outcome.records = records;
    outcome
}

/// Drop the floor-boundary record from the export list.
///
/// A paging fetch parameterized with `since_id = floor - 1` re-fetches the
/// post sitting exactly on the floor; it was already exported by the run
/// that set the floor. Batch statistics keep counting it - only the export
/// list shrinks.
pub fn trim_floor_overlap(outcome: &mut FetchOutcome, floor: Option<u64>) {
    if let (Some(floor), Some(batch_min)) = (floor, outcome.batch_min_id) {
        if floor == batch_min {
            outcome.records.retain(|r| r.id != floor);
        }
    }
}
