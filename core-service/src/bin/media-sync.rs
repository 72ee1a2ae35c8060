//! media-sync - mirror a Google Drive folder into the media library.
//!
//! One-shot `backfill` and `update-metadata` passes, or a long-running
//! `watch` loop that stops on Ctrl-C. Per-file failures are logged and never
//! change the exit code; only setup failures do.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use core_async::sync::CancellationToken;
use core_async::time::Duration;
use core_runtime::config::{parse_duration, AppConfig};
use core_runtime::logging::{init_logging, LoggingConfig};
use core_service::{MediaService, ServiceError};
use core_sync::{SyncError, SyncOptions};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "media-sync")]
#[command(about = "Sync photos from a Google Drive folder into the media library")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Re-resolve location and date metadata for records already stored
    UpdateMetadata {
        /// Only touch records missing coordinates, place or date
        #[arg(long)]
        only_empty: bool,

        /// Resolve and log without saving anything
        #[arg(long)]
        dry_run: bool,

        /// Download each file from the folder again, replace the stored copy
        /// and re-resolve every field
        #[arg(long)]
        force_refetch: bool,
    },

    /// Sync every file in the configured folder once
    Backfill {
        /// Skip files that already have a record, complete or not
        #[arg(long)]
        skip_existing: bool,

        /// Download and resolve without uploading or saving anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Poll the folder for new files until interrupted
    Watch {
        /// Poll interval, e.g. `90s`, `5m`; defaults to DRIVE_SYNC_INTERVAL
        #[arg(long, value_parser = parse_duration)]
        interval: Option<Duration>,

        /// Run a backfill before the first poll
        #[arg(long)]
        backfill: bool,
    },
}

#[core_async::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = AppConfig::from_env().context("invalid configuration")?;
    init_logging(
        LoggingConfig::default()
            .with_format(config.log_format)
            .with_level(config.log_level),
    )
    .context("failed to initialize logging")?;

    let service = MediaService::from_config(&config)
        .await
        .context("failed to start media service")?;

    match cli.command {
        Command::UpdateMetadata {
            only_empty,
            dry_run,
            force_refetch,
        } => {
            let options = SyncOptions {
                dry_run,
                force_refetch,
                only_incomplete: only_empty,
                ..Default::default()
            };
            let cancel = cancel_on_ctrl_c();
            match service.refresh_metadata(&options, &cancel).await {
                Ok(report) => info!(
                    updated = report.updated,
                    skipped = report.skipped,
                    no_location = report.no_location,
                    errored = report.errored,
                    dry_run,
                    "Metadata refresh finished"
                ),
                Err(e) => report_pass_error("Metadata refresh", e)?,
            }
        }
        Command::Backfill {
            skip_existing,
            dry_run,
        } => {
            let options = SyncOptions {
                dry_run,
                skip_existing,
                ..Default::default()
            };
            let cancel = cancel_on_ctrl_c();
            match service.backfill(&options, &cancel).await {
                Ok(report) => info!(
                    processed = report.processed,
                    skipped = report.skipped,
                    dry_run,
                    "Backfill finished"
                ),
                Err(e) => report_pass_error("Backfill", e)?,
            }
        }
        Command::Watch { interval, backfill } => {
            let interval = interval.unwrap_or(config.drive.sync_interval);
            let backfill = backfill || config.drive.backfill_on_startup;
            let handle = service
                .start_background_sync(interval, backfill)
                .context("cannot start background sync")?;

            core_async::select! {
                result = core_async::signal::ctrl_c() => {
                    if let Err(e) = result {
                        error!(error = %e, "Failed to listen for Ctrl-C");
                    }
                    info!("Shutting down");
                }
                _ = wait_finished(&handle) => warn!("Background sync ended on its own"),
            }
            handle.shutdown().await;
        }
    }

    service.shutdown();
    Ok(())
}

/// Token cancelled by the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    core_async::spawn(async move {
        if core_async::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, finishing current file");
            token.cancel();
        }
    });
    cancel
}

async fn wait_finished(handle: &core_service::SyncHandle) {
    while !handle.is_finished() {
        core_async::time::sleep(Duration::from_secs(1)).await;
    }
}

/// Pass-level failures are logged; only setup problems fail the process.
fn report_pass_error(pass: &str, err: ServiceError) -> Result<()> {
    match err {
        ServiceError::Sync(SyncError::Cancelled) => {
            info!("{} cancelled", pass);
            Ok(())
        }
        ServiceError::Sync(SyncError::Incomplete {
            processed,
            skipped,
            errored,
        }) => {
            warn!(processed, skipped, errored, "{} finished with failed files", pass);
            Ok(())
        }
        other => Err(anyhow::Error::new(other).context(format!("{} failed", pass))),
    }
}
