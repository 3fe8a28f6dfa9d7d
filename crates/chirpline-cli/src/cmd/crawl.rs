//! Crawl subcommand - run the harvesting loop

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, ValueEnum};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use chirpline_crawler::{config, runner, CrawlConfig, FileConfig, HttpTransport, SearchMode};

use super::print_summary;

/// Fixed sleep before retrying a failed fetch or status query
const RETRY_DELAY: Duration = Duration::from_secs(10);

#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// Search mode
    #[arg(long, value_enum, default_value = "keyword")]
    pub mode: ModeArg,

    /// Search-key list file (one key per line, commas accepted)
    #[arg(short, long)]
    pub keys: PathBuf,

    /// Total run-time budget in minutes
    #[arg(short, long, default_value_t = 180)]
    pub budget_mins: u64,

    /// Seconds between output/checkpoint flushes
    #[arg(short, long, default_value_t = 900)]
    pub flush_secs: u64,

    /// Output directory (overrides config)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Checkpoint file (overrides config)
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Posts per request (overrides the per-mode default)
    #[arg(long)]
    pub count: Option<u32>,
}

#[derive(Clone, Copy, ValueEnum, Debug)]
pub enum ModeArg {
    /// Keyword query search
    Keyword,
    /// User timeline search
    User,
}

impl From<ModeArg> for SearchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Keyword => SearchMode::Keyword,
            ModeArg::User => SearchMode::User,
        }
    }
}

pub fn run(args: CrawlArgs, file: &FileConfig, multi: &MultiProgress) -> Result<()> {
    chirpline_core::install_signal_handlers()?;

    let accounts = file.resolve_accounts()?;
    let keys = config::load_keys(&args.keys)?;

    let mut search = file.search.clone();
    if let Some(count) = args.count {
        search.keyword_count = count;
        search.timeline_count = count;
    }

    let crawl_config = CrawlConfig {
        mode: args.mode.into(),
        keys,
        accounts,
        api_base: file.api.base_url.clone(),
        search,
        output_dir: args.output_dir.unwrap_or_else(|| file.output.dir.clone()),
        checkpoint: args
            .checkpoint
            .unwrap_or_else(|| file.output.checkpoint.clone()),
        budget: Duration::from_secs(args.budget_mins * 60),
        flush_interval: Duration::from_secs(args.flush_secs),
        retry_delay: RETRY_DELAY,
    };

    let transport = HttpTransport::new(&crawl_config.api_base, &crawl_config.search);

    let status = multi.add(ProgressBar::new_spinner());
    status.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {wide_msg}")
            .expect("invalid template"),
    );
    status.enable_steady_tick(Duration::from_millis(120));

    let summary = runner::run(&crawl_config, &transport, &status)?;
    status.finish_and_clear();

    print_summary(
        "Crawl",
        &[
            ("Crawls", summary.crawls.to_string()),
            ("Records", summary.records.to_string()),
            ("Output units", summary.units.to_string()),
            ("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())),
        ],
    );
    Ok(())
}
