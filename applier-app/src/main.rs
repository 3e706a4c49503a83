use anyhow::Result;
use applier_common::observability::{init_logging, LogConfig, LogFormat};
use clap::Parser;
use cli::Cli;

mod cli;
mod wiring;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = init_logging(LogConfig {
        emit_stderr: cli.verbose,
        format: if cli.log_json { LogFormat::Json } else { LogFormat::Text },
        ..LogConfig::default()
    })?;

    // 1) Load config (flags > legacy env > APPLIER__ env > file)
    let cfg = cli.loader().load()?.typed()?;
    cfg.validate()?;
    tracing::info!(
        target: "applier.app",
        log = %log_path.display(),
        keywords = %cfg.search.keywords,
        location = %cfg.search.location,
        max_applications = cfg.search.max_applications,
        dry_run = cfg.application.dry_run,
        "starting"
    );

    // 2) Build the pipeline, then connect
    let orchestrator = wiring::orchestrator(&cfg)?;
    let registry = wiring::registry(&cfg)?;
    let browser = wiring::connect(&cfg).await?;
    let session = wiring::session(&cfg, browser, registry);

    // 3) Run; the session is released on every path
    let summary = orchestrator.run(session).await?;
    println!(
        "applied {} of {} attempted ({} failed, {} skipped); stopped: {}",
        summary.counters.applied,
        summary.counters.attempted,
        summary.counters.failed,
        summary.counters.skipped,
        summary.stop_reason
    );
    if summary.stop_reason.is_failure() {
        std::process::exit(1);
    }
    Ok(())
}
