#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use structopt::StructOpt;

use lockbridge_relayer::config;
use lockbridge_relayer::context::RelayerContext;
use lockbridge_relayer::service;
use lockbridge_relayer::store::file::FileCheckpointStore;

/// The Lockbridge Relayer Command-line tool
///
/// Start the relayer from a config file:
///
///     $ lockbridge-relayer -vvv -c <CONFIG_FILE_PATH>
#[derive(StructOpt)]
#[structopt(name = "Lockbridge Relayer")]
struct Opts {
    /// A level of verbosity, and can be used multiple times
    #[structopt(short, long, parse(from_occurrences))]
    verbose: i32,
    /// File that contains configration.
    #[structopt(
        short = "c",
        long = "config-filename",
        value_name = "PATH",
        parse(from_os_str)
    )]
    config_filename: PathBuf,
}

#[paw::main]
#[tokio::main]
async fn main(args: Opts) -> anyhow::Result<()> {
    setup_logger(args.verbose)?;
    let config = config::load(&args.config_filename)
        .context("failed to load the config file")?;
    let ctx = RelayerContext::new(config);
    let store =
        Arc::new(FileCheckpointStore::new(ctx.config.checkpoint_path.clone()));

    // flip the cancellation flag on SIGINT or SIGTERM; the relay loop
    // finishes its in-flight event and winds down at the next suspension
    // point.
    let signal_ctx = ctx.clone();
    tokio::spawn(async move {
        if let Err(err) = shutdown_signal().await {
            tracing::error!("Unable to listen for shutdown signals: {}", err);
            // we also shut down in case of error.
        }
        tracing::warn!("Shutting down...");
        signal_ctx.shutdown();
    });

    service::start_bridge_relayer(ctx, store).await?;
    tracing::event!(
        target: lockbridge_relayer::probe::TARGET,
        tracing::Level::DEBUG,
        kind = %lockbridge_relayer::probe::Kind::Lifecycle,
        shutdown = true,
    );
    tracing::info!("Clean Exit ..");
    Ok(())
}

async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res,
            _ = sigterm.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

fn setup_logger(verbosity: i32) -> anyhow::Result<()> {
    use tracing::Level;
    let log_level = match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(
            format!("lockbridge_relayer={}", log_level).parse()?,
        );
    tracing_subscriber::fmt()
        .with_target(true)
        .with_max_level(log_level)
        .with_env_filter(env_filter)
        .init();
    Ok(())
}
