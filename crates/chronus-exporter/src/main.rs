//! chronus exporter
//!
//! - `serve`: `GET /metrics` runs one fresh collection pass per scrape
//! - `once`: one pass against the local host, printed to stdout
//!
//! Logs go to stderr so `once` output stays pure exposition text.

use std::process::ExitCode;

use clap::Parser;
use tokio::time::{sleep, Duration};
use tracing_subscriber::{fmt, EnvFilter};

use chronus_core::error::{ChronusError, Result};
use chronus_exporter::cli::{Cli, Command};
use chronus_exporter::collector::HostTarget;
use chronus_exporter::{app_state, config, router};

/// CPU utilization is measured between two refreshes.
const CPU_WARMUP: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(class = e.class().as_str(), error = %e, "chronus-exporter failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut cfg = config::load_or_default(&cli.config)?;
    cli.apply(&mut cfg)?;

    let target = HostTarget::resolve(&cfg.host);
    let state = app_state::AppState::from_config(cfg, target)?;

    match cli.command() {
        Command::Once => {
            sleep(CPU_WARMUP).await;
            let exposition = state.export().await?;
            print!("{exposition}");
            Ok(())
        }
        Command::Serve => {
            let listen = state.cfg().exporter.listen_addr()?;
            let app = router::build_router(state);

            tracing::info!(%listen, "chronus-exporter starting");
            let listener = tokio::net::TcpListener::bind(listen)
                .await
                .map_err(|e| ChronusError::Config(format!("bind {listen} failed: {e}")))?;
            axum::serve(listener, app)
                .await
                .map_err(|e| ChronusError::Internal(format!("server failed: {e}")))
        }
    }
}
