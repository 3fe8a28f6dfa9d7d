//! chirpline - continuous post harvesting across rate-limited accounts
//!
//! Rotates a pool of API credentials over a list of search keys, walking
//! each key backward through its history once and then polling it forward,
//! with checkpointed state so interrupted runs resume cleanly.

use std::io::IsTerminal;

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::MultiProgress;

use chirpline_crawler::FileConfig;

mod cmd;

#[derive(Parser)]
#[command(name = "chirpline")]
#[command(about = "Continuously harvest posts for a set of search keys")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Suppress info logs (only warnings and errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./chirpline.toml or ~/.config/chirpline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the crawl loop
    Crawl(cmd::crawl::CrawlArgs),
    /// Show per-key crawl progress from a checkpoint
    Status(cmd::status::StatusArgs),
    /// Query every account's rate-limit status
    Limits,
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // TTY: route logs through MultiProgress so the status line survives
    let is_tty = std::io::stderr().is_terminal();
    let multi = MultiProgress::new();
    chirpline_core::init_logging(cli.quiet, cli.debug, is_tty.then_some(&multi));

    let config = match cli.config {
        Some(path) => FileConfig::from_file(&path)?,
        None => FileConfig::load()?,
    };

    match cli.command {
        Command::Crawl(args) => cmd::crawl::run(args, &config, &multi),
        Command::Status(args) => cmd::status::run(args, &config),
        Command::Limits => cmd::limits::run(&config),
        Command::Config => {
            cmd::print_summary(
                "Setting",
                &[
                    ("API base URL", config.api.base_url.clone()),
                    (
                        "Search language",
                        config
                            .search
                            .lang
                            .clone()
                            .unwrap_or_else(|| "unfiltered".to_string()),
                    ),
                    (
                        "Counts",
                        format!(
                            "keyword {}, timeline {}",
                            config.search.keyword_count, config.search.timeline_count
                        ),
                    ),
                    ("Output directory", config.output.dir.display().to_string()),
                    ("Checkpoint", config.output.checkpoint.display().to_string()),
                    (
                        "Accounts",
                        if config.accounts.is_empty() {
                            "none configured".to_string()
                        } else {
                            config
                                .accounts
                                .iter()
                                .map(|a| a.name.as_str())
                                .collect::<Vec<_>>()
                                .join(", ")
                        },
                    ),
                ],
            );
            Ok(())
        }
    }
}
