//! Command-line entry points for one-off operations.

pub mod args;

pub use args::{Cli, CliCommand, ExportArgs};

use anyhow::{anyhow, Result};

use crate::app;
use crate::config::Config;
use crate::delivery::DeliveryService;
use crate::error::MeetingError;
use crate::meeting::RecoveryOutcome;

pub async fn handle_export_command(args: ExportArgs) -> Result<()> {
    let index = usize::try_from(args.index)
        .map_err(|_| anyhow!("Index must be a non-negative integer, got {}", args.index))?;

    let config = Config::load()?;
    let components = app::build_components(&config).await?;

    let path = components.delivery.download_transcript(index, false).await?;
    println!("Transcript saved to {}", path.display());
    Ok(())
}

pub async fn handle_recover_command() -> Result<()> {
    let config = Config::load()?;
    let components = app::build_components(&config).await?;

    match components.controller.recover_last_meeting().await {
        Ok(RecoveryOutcome::Recovered) => {
            println!("Recovered last meeting to the best possible extent");
            Ok(())
        }
        Ok(RecoveryOutcome::NotNeeded) => {
            println!("No recovery needed");
            Ok(())
        }
        Err(MeetingError::NoCaptureState) => {
            println!("No meeting has been captured yet. Maybe attend one?");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
