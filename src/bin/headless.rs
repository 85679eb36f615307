//! Runs a world without a viewer, then saves what it recorded.
//!
//! Logging follows `RUST_LOG`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use creature_story::config::SimConfig;
use creature_story::driver::Driver;
use creature_story::error::HistoryError;
use creature_story::flush::{flush_to_jsonl, save_history};
use creature_story::history::WorldHistory;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "headless",
    version,
    about = "Run a creature world without a viewer and save its history"
)]
struct Cli {
    /// World, history and driver settings (JSON). Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Wall-clock seconds to let the driver run.
    #[arg(long, default_value_t = 2)]
    seconds: u64,

    /// Directory receiving history.json and the JSONL files.
    #[arg(long, default_value = "output")]
    out: PathBuf,
}

fn main() -> Result<(), HistoryError> {
    let cli = Cli::parse();
    init_tracing();
    let config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    let seconds = cli.seconds;
    let output_dir = cli.out;

    let history = Arc::new(WorldHistory::new(
        config.world.clone(),
        config.catalog.clone(),
        config.history.clone(),
    )?);
    let mut driver = Driver::spawn(Arc::clone(&history), config.driver.clone())?;
    driver.run();
    std::thread::sleep(Duration::from_secs(seconds));
    driver.pause();
    info!(
        ticks = driver.ticks_taken(),
        hz = driver.real_tick_frequency(),
        states = history.len(),
        "driver paused"
    );
    if let Some(err) = driver.last_error() {
        tracing::warn!("driver stopped early: {err}");
    }
    driver.shutdown();

    if config.history.record_story {
        // Scrub back to the middle and forward past the end to exercise replay.
        let len = history.len();
        history.scrub_to(len / 2)?;
        history.scrub_to(len + 10)?;
    }

    std::fs::create_dir_all(&output_dir)?;
    save_history(&history, &output_dir.join("history.json"))?;
    flush_to_jsonl(&history, &output_dir)?;
    info!(dir = %output_dir.display(), states = history.len(), "history written");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
