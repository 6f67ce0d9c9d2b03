//! gymcount entry point.
//!
//! Binary name: `gymcount`
//!
//! Parses CLI arguments, installs tracing, then either prints configuration
//! or runs the server: one shared `WindowedCounter`, the MQTT listener as a
//! background task, and the axum gateway in the foreground.

mod cli;
mod http;
mod state;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use clap_complete::generate;
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Commands};
use gymcount_core::presence::WindowedCounter;
use gymcount_infra::config::load_resolved;
use gymcount_infra::mqtt::MqttListener;
use gymcount_observe::tracing_setup::{
    TracingOptions, init_tracing, shutdown_tracing, verbosity_filter,
};
use state::AppState;

/// How long the listener gets to close its broker session after the HTTP
/// server has stopped.
const LISTENER_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need logging or config
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "gymcount", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing(&TracingOptions {
        default_filter: verbosity_filter(cli.verbose, cli.quiet).to_string(),
        json: cli.log_json,
        otel: cli.otel,
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = match cli.command {
        Commands::Serve {
            config,
            bind,
            static_dir,
        } => serve(&config, bind, static_dir, cli.quiet).await,
        Commands::Config { config } => cli::config::show_config(&config, cli.json).await,
        Commands::Completions { .. } => unreachable!("handled above"),
    };

    shutdown_tracing();
    result
}

async fn serve(
    config_path: &Path,
    bind: Option<String>,
    static_dir: Option<PathBuf>,
    quiet: bool,
) -> anyhow::Result<()> {
    let config = load_resolved(config_path).await;
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let static_dir = static_dir.unwrap_or_else(|| PathBuf::from(&config.server.static_dir));

    // Bind before the listener task starts so a bind failure leaves nothing running.
    let tcp = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;

    let settings = config.presence.to_settings();
    tracing::info!(
        presence_window_secs = settings.presence_window.as_secs(),
        debounce_window_secs = settings.debounce_window.as_secs(),
        "Presence counter configured"
    );
    let counter = Arc::new(WindowedCounter::new(settings));

    let cancel = CancellationToken::new();
    let (listener, bus) = MqttListener::new(config.mqtt.clone(), Arc::clone(&counter));
    let listener_task = tokio::spawn(listener.run(cancel.clone()));

    let api_key = config.server.api_key.clone().map(SecretString::from);
    if api_key.is_none() {
        tracing::warn!("No API key configured, POST /api/entry is open");
    }
    let state = AppState::new(counter, bus, api_key.as_ref());
    let router = http::router::build_router(state, &static_dir);

    if !quiet {
        println!(
            "  {} gymcount listening on {}",
            console::style("⚡").bold(),
            console::style(format!("http://{bind}")).cyan()
        );
        println!("  {}", console::style("Press Ctrl+C to stop").dim());
    }

    let served = axum::serve(tcp, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    cancel.cancel();
    match tokio::time::timeout(LISTENER_SHUTDOWN_GRACE, listener_task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "MQTT listener task failed"),
        Err(_) => tracing::warn!("MQTT listener did not stop in time"),
    }

    served?;
    if !quiet {
        println!("\n  Server stopped.");
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
