use std::path::Path;

use bizsync_core::SyncReport;

use crate::client::DeviceClient;
use crate::commands::common::{format_report_lines, load_batch};
use crate::error::CliError;

/// Exit status is success for both outcomes; duplicates are for the user to review.
pub async fn run_push(client: &DeviceClient, file: &Path, as_json: bool) -> Result<(), CliError> {
    let batch = load_batch(file)?;
    tracing::info!(records = batch.len(), "Pushing batch");
    let report = client.sync(batch).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for line in format_report_lines(&report) {
        println!("{line}");
    }
    if matches!(report, SyncReport::DuplicatesFound { .. }) {
        println!("Nothing was written.");
    }
    Ok(())
}
