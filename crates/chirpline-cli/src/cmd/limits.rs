//! Limits subcommand - live rate-limit status for every account

use anyhow::Result;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};

use chirpline_crawler::{timefmt, FileConfig, HttpTransport, Transport};

pub fn run(file: &FileConfig) -> Result<()> {
    let accounts = file.resolve_accounts()?;
    let transport = HttpTransport::new(&file.api.base_url, &file.search);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(
            ["Account", "Keyword", "Resets", "Timeline", "Resets"]
                .map(|h| Cell::new(h).fg(Color::Cyan))
                .to_vec(),
        );

    // one attempt per account: this is a diagnostic, not the crawl loop
    for account in &accounts {
        match transport.rate_limit_status(account) {
            Ok(windows) => {
                table.add_row(vec![
                    account.name.clone(),
                    windows.keyword.remaining.to_string(),
                    timefmt::epoch_to_export(windows.keyword.reset_at),
                    windows.user.remaining.to_string(),
                    timefmt::epoch_to_export(windows.user.reset_at),
                ]);
            }
            Err(e) => {
                log::warn!("status query for '{}' failed: {e}", account.name);
                table.add_row(vec![
                    account.name.clone(),
                    "unavailable".to_string(),
                    "-".to_string(),
                    "unavailable".to_string(),
                    "-".to_string(),
                ]);
            }
        }
    }
    eprintln!("\n{table}");
    Ok(())
}
