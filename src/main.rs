// Open Data Exporter - scheduled analytics report pipelines
// Copyright (c) 2025 Open Data Exporter Contributors
// Licensed under the MIT License

use clap::Parser;
use open_data_exporter::cli::{Cli, Commands};
use open_data_exporter::config::LoggingConfig;
use open_data_exporter::logging::init_logging;
use std::process;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Only the long-running scheduler writes log files; other commands log to the console
    let logging_config = match &cli.command {
        Commands::Run(args) if !args.now => cli
            .load_config()
            .map(|c| c.logging)
            .unwrap_or_default(),
        _ => LoggingConfig::default(),
    };
    let log_level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| logging_config.log_level.clone());
    let logging_guard = match init_logging(&log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(5);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Open Data Exporter"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Some(signal) = shutdown_signal().await {
            tracing::info!(signal, "Shutdown requested, letting running jobs finish");
            println!("\n⚠️  Shutdown signal received, letting running jobs finish...");
            let _ = shutdown_tx.send(true);
        }
    });

    let exit_code = match execute_command(&cli, shutdown_rx).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            5
        }
    };

    drop(logging_guard);
    process::exit(exit_code);
}

/// Execute the CLI command
async fn execute_command(cli: &Cli, shutdown: watch::Receiver<bool>) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Run(args) => args.execute(cli, shutdown).await,
        Commands::ListJobs(args) => args.execute(cli).await,
        Commands::ValidateConfig(args) => args.execute(cli).await,
        Commands::Init(args) => args.execute().await,
        Commands::LoginUrl(args) => args.execute(cli).await,
    }
}

/// Resolves with the signal name once SIGINT or SIGTERM arrives
async fn shutdown_signal() -> Option<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                return tokio::signal::ctrl_c().await.ok().map(|_| "SIGINT");
            }
        };
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.ok().map(|_| "SIGINT"),
            _ = sigterm.recv() => Some("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok().map(|_| "SIGINT")
    }
}
