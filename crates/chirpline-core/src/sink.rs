//! CSV output sink - one unit per flush, header only when newly created

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Fixed export column order. `key` is the search key a post was found by.
pub const OUTPUT_COLUMNS: [&str; 20] = [
    "key",
    "id",
    "time",
    "author_id",
    "author_handle",
    "author_name",
    "author_created_at",
    "author_followers_count",
    "author_following_count",
    "author_favorites_count",
    "author_post_count",
    "author_bio",
    "author_banner_url",
    "author_avatar_url",
    "in_reply_to_post_id",
    "in_reply_to_author_id",
    "text",
    "repost_count",
    "like_count",
    "source",
];

/// Filename prefix for output units
const UNIT_PREFIX: &str = "posts_";

/// Path of output unit `unit` inside `dir`
pub fn unit_path(dir: &Path, unit: usize) -> PathBuf {
    dir.join(format!("{UNIT_PREFIX}{unit:04}.csv"))
}

/// Next output unit index: one past the highest existing `posts_NNNN.csv`.
///
/// Lets a resumed run keep numbering where the previous run stopped.
pub fn next_unit_number(dir: &Path) -> io::Result<usize> {
    let mut next = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(idx) = name
            .strip_prefix(UNIT_PREFIX)
            .and_then(|rest| rest.strip_suffix(".csv"))
            .and_then(|num| num.parse::<usize>().ok())
        else {
            continue;
        };
        next = next.max(idx + 1);
    }
    Ok(next)
}

/// Strip line breaks from free-text fields before export.
pub fn strip_newlines(s: &str) -> String {
    s.replace("\r\n", "").replace(['\n', '\r'], "")
}

/// Append-mode CSV writer for one output unit.
///
/// The header row is written only when the sink created the file, so
/// appending to an existing unit after a resume never duplicates it.
/// Fields are quote-all, matching downstream loaders that expect every
/// cell quoted.
pub struct CsvSink {
    writer: csv::Writer<File>,
    path: PathBuf,
    row_count: usize,
}

impl std::fmt::Debug for CsvSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvSink")
            .field("path", &self.path)
            .field("row_count", &self.row_count)
            .finish_non_exhaustive()
    }
}

impl CsvSink {
    /// Open (or create) the unit at `path`.
    pub fn open(path: &Path) -> io::Result<Self> {
        let existed = path.exists();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .from_writer(file);
        if !existed {
            writer.write_record(OUTPUT_COLUMNS).map_err(io::Error::other)?;
        }
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            row_count: 0,
        })
    }

    /// Write one pre-rendered row (must match [`OUTPUT_COLUMNS`] in length).
    pub fn append(&mut self, row: &[String]) -> io::Result<()> {
        self.row_count += 1;
        self.writer.write_record(row).map_err(io::Error::other)
    }

    /// Flush and return the number of rows written through this sink.
    pub fn finalize(mut self) -> io::Result<usize> {
        self.writer.flush()?;
        Ok(self.row_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn blank_row() -> Vec<String> {
        vec![String::new(); OUTPUT_COLUMNS.len()]
    }

    #[test]
    fn header_written_once_per_unit() {
        let dir = TempDir::new().unwrap();
        let path = unit_path(dir.path(), 0);

        let mut sink = CsvSink::open(&path).unwrap();
        sink.append(&blank_row()).unwrap();
        assert_eq!(sink.finalize().unwrap(), 1);

        // Reopen the same unit: appended rows, no second header
        let mut sink = CsvSink::open(&path).unwrap();
        sink.append(&blank_row()).unwrap();
        sink.finalize().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let headers = content.lines().filter(|l| l.contains("\"key\"")).count();
        assert_eq!(headers, 1);
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn rows_are_quote_all() {
        let dir = TempDir::new().unwrap();
        let path = unit_path(dir.path(), 0);

        let mut sink = CsvSink::open(&path).unwrap();
        let mut row = blank_row();
        row[0] = "rust".to_string();
        row[1] = "42".to_string();
        sink.append(&row).unwrap();
        sink.finalize().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let data_line = content.lines().nth(1).unwrap();
        assert!(data_line.starts_with("\"rust\",\"42\","));
    }

    #[test]
    fn strip_newlines_removes_all_breaks() {
        assert_eq!(strip_newlines("a\r\nb\nc\rd"), "abcd");
        assert_eq!(strip_newlines("plain"), "plain");
    }

    #[test]
    fn unit_numbering_continues() {
        let dir = TempDir::new().unwrap();
        assert_eq!(next_unit_number(dir.path()).unwrap(), 0);

        std::fs::write(unit_path(dir.path(), 0), b"x").unwrap();
        std::fs::write(unit_path(dir.path(), 3), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        assert_eq!(next_unit_number(dir.path()).unwrap(), 4);
    }
}
