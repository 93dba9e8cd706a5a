use std::fs;
use std::path::Path;

use bizsync_core::{EntityKind, PeerDevice, SyncBatch, SyncReport};

use crate::error::CliError;

/// Parse a batch file shaped like the `data` object of a sync request
pub fn load_batch(path: &Path) -> Result<SyncBatch, CliError> {
    let contents = fs::read_to_string(path)?;
    let batch: SyncBatch = serde_json::from_str(&contents)?;
    if batch.is_empty() {
        return Err(CliError::EmptyBatch(path.display().to_string()));
    }
    Ok(batch)
}

pub fn format_peer_lines(peers: &[PeerDevice]) -> Vec<String> {
    if peers.is_empty() {
        return vec!["No other devices on this network.".to_string()];
    }

    peers
        .iter()
        .map(|peer| format!("{}  {}", short_id(&peer.device_id), peer.device_name))
        .collect()
}

pub fn format_report_lines(report: &SyncReport) -> Vec<String> {
    match report {
        SyncReport::Synced { results, message } => {
            let mut lines = vec![message.clone()];
            lines.extend(
                EntityKind::ALL
                    .iter()
                    .map(|kind| format!("  {:<8} {}", kind.wire_key(), results.get(*kind).added)),
            );
            lines
        }
        SyncReport::DuplicatesFound {
            duplicates,
            message,
        } => {
            let mut lines = vec![message.clone()];
            lines.extend(duplicates.iter().map(|finding| {
                format!(
                    "  {} {} matches {} on {}",
                    finding.kind.label(),
                    finding.incoming.id,
                    finding.existing.id,
                    finding.field
                )
            }));
            lines
        }
    }
}

fn short_id(id: &str) -> String {
    id.chars().take(13).collect()
}
