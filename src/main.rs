use anyhow::Context;
use autobuy::app::App;
use autobuy::cli::output::{print_report, print_warn, OutputMode};
use autobuy::cli::Cli;
use autobuy::config::AppConfig;
use autobuy::coordination::{install_signal_handlers, Shutdown};
use autobuy::logging::init_logging;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    let _log_guard = init_logging(&cli.logs, &config.logging);

    let shutdown = Arc::new(Shutdown::new());
    install_signal_handlers(shutdown.clone());

    let dry_run = cli.dry_run || config.broker.dry_run;
    if dry_run {
        print_warn("Dry run: margins are checked but no orders are sent");
    }

    let app = match App::bootstrap(config, dry_run, shutdown.token()).await {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to start: {}", e);
            return Err(e.into());
        }
    };

    if cli.run_now {
        info!("Running order placement immediately");
        match app.run_scheduled_batch().await? {
            Some(report) => print_report(&report, OutputMode::from_json_flag(cli.json))?,
            None => print_warn("Not a trading day; no orders placed"),
        }
        return Ok(());
    }

    app.run_scheduler().await?;
    info!("Autobuy stopped");
    Ok(())
}
