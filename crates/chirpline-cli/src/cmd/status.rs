//! Status subcommand - per-key progress from the checkpoint

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};

use chirpline_crawler::{timefmt, FileConfig, ProgressStore};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Checkpoint file (default from config)
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,
}

pub fn run(args: StatusArgs, file: &FileConfig) -> Result<()> {
    let path = args
        .checkpoint
        .unwrap_or_else(|| file.output.checkpoint.clone());
    let store = ProgressStore::load(&path)?;
    anyhow::ensure!(
        !store.is_empty(),
        "no progress recorded in {}",
        path.display()
    );

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(
            ["Key", "Phase", "Newest", "Oldest", "Floor", "Last update", "Fetched"]
                .map(|h| Cell::new(h).fg(Color::Cyan))
                .to_vec(),
        );

    for (key, progress) in store.iter() {
        let phase = if progress.in_initial_sweep() {
            "sweep"
        } else {
            "steady"
        };
        table.add_row(vec![
            key.clone(),
            phase.to_string(),
            fmt_opt(progress.max_id),
            fmt_opt(progress.min_id),
            fmt_opt(progress.since_id),
            progress
                .last_updated_at
                .map(timefmt::epoch_to_export)
                .unwrap_or_else(|| "never".to_string()),
            progress.total_fetched.to_string(),
        ]);
    }
    eprintln!("\n{table}");
    Ok(())
}

fn fmt_opt(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
