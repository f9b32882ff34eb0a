//! nvim-harness server: hosts editor sessions for remote test runners.

// CLI-specific lint allowances (CLI binary, not library)
#![allow(missing_docs)]
#![allow(clippy::print_stderr)]

use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result, WrapErr};
use nvim_harness::bootstrap::BootstrapService;
use nvim_harness::config::{load_config_file, HarnessConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Color output mode
#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum ColorMode {
    /// Auto-detect based on terminal and `NO_COLOR` env
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Debug, Parser)]
#[command(
    name = "nvim-harness-server",
    version,
    about = "Serve provisioned Neovim sessions to end-to-end tests"
)]
struct Cli {
    /// Harness configuration file (.yaml, .yml or .json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:5173")]
    listen: SocketAddr,

    /// Editor command, overriding the config file
    #[arg(long)]
    editor: Option<String>,

    /// Scratch directory for provisioned test directories (absolute path)
    #[arg(long)]
    test_environment_dir: Option<PathBuf>,

    /// Control color output
    #[arg(long, value_enum, default_value = "auto")]
    color: ColorMode,
}

fn use_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            std::env::var_os("NO_COLOR").is_none()
                && supports_color::on(supports_color::Stream::Stderr).is_some()
        }
    }
}

fn configure_diagnostics(color: bool) {
    miette::set_hook(Box::new(move |_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .color(color)
                .unicode(color)
                .build(),
        )
    }))
    .ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(color).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<HarnessConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_file(path)?,
        None => HarnessConfig::default(),
    };
    if let Some(editor) = &cli.editor {
        config.editor.command.clone_from(editor);
    }
    if let Some(dir) = &cli.test_environment_dir {
        config.test_environment_dir.clone_from(dir);
    }
    config.validate()?;
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    configure_diagnostics(use_color(cli.color));

    let config = load_config(&cli)?;
    tracing::info!(
        editor = %config.editor.command,
        test_environment_dir = %config.test_environment_dir.display(),
        "starting harness server"
    );
    let service = Arc::new(BootstrapService::new(config)?);

    let listener = tokio::net::TcpListener::bind(cli.listen)
        .await
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to listen on {}", cli.listen))?;
    tracing::info!(address = %cli.listen, "listening");

    axum::serve(listener, nvim_harness_server::router(Arc::clone(&service)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_diagnostic()?;

    if let Err(err) = service.terminate().await {
        eprintln!("failed to stop the running session: {err}");
    }
    Ok(())
}
