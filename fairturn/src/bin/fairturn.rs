//! Runs a toggling pool until Ctrl+C, then prints how many turns each actor got.
//!
//! Usage: `fairturn [config.json]`
//!
//! `FAIRTURN_LOG=json` switches to JSON log lines, `FAIRTURN_LOG=dev` to
//! debug output with per-turn events.

use std::time::Duration;

use anyhow::Context;
use tracing::info;

use fairturn::{logging, report, PoolBuilder, PoolConfig, PoolHandle};

const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

fn init_logging() {
    match std::env::var("FAIRTURN_LOG").as_deref() {
        Ok("json") => logging::init_production(),
        Ok("dev") => logging::init_development(),
        _ => logging::init_default(),
    }
}

fn load_config() -> anyhow::Result<PoolConfig> {
    match std::env::args().nth(1) {
        Some(path) => PoolConfig::from_json_file(&path)
            .with_context(|| format!("loading configuration from {path}")),
        None => Ok(PoolConfig::default()),
    }
}

/// Wait for Ctrl+C, logging progress in the meantime.
async fn wait_for_interrupt(pool: &PoolHandle) {
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    ticker.tick().await;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Ctrl+C detected, shutting down..."),
                    Err(err) => fairturn::log_error!(err, "Failed to listen for Ctrl+C, shutting down"),
                }
                return;
            }
            _ = ticker.tick() => {
                let counts = pool.counts();
                info!(
                    total_turns = counts.total(),
                    spread = counts.spread(),
                    balanced = pool.is_balanced(),
                    "Progress"
                );
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();
    info!("Starting the application!");

    let mut config = load_config()?;
    if std::env::var("FAIRTURN_LOG").as_deref() == Ok("dev") {
        config.enable_detailed_logging = true;
    }
    let pool = PoolBuilder::new(config).start().context("starting worker pool")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building signal runtime")?;
    runtime.block_on(wait_for_interrupt(&pool));

    pool.stop();
    info!("Releasing resources ...");

    let drained = pool.await_drained().context("draining worker pool")?;
    info!("\n\n{}\n", report::render_table(&drained.counts));
    info!("{}", report::summarize(&drained));
    Ok(())
}
