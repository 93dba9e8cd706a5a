use bizsync_core::reconcile::SyncCounts;
use bizsync_core::{DuplicateFinding, Entity, EntityKind, PeerDevice, SyncReport};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::json;

use crate::cli::CompletionShell;
use crate::client::{device_sync_endpoint, parse_api_error, DeviceClient};
use crate::commands::common::{format_peer_lines, format_report_lines, load_batch};
use crate::commands::completions::{completion_script, run_completions};
use crate::error::CliError;
use crate::identity::{load_or_create_device_id, DeviceIdentity};

#[test]
fn device_sync_endpoint_appends_path_once() {
    assert_eq!(
        device_sync_endpoint(" http://10.0.0.4:8080/ ").unwrap(),
        "http://10.0.0.4:8080/v1/device-sync"
    );
    assert_eq!(
        device_sync_endpoint("https://sync.shop.test/v1/device-sync").unwrap(),
        "https://sync.shop.test/v1/device-sync"
    );
}

#[test]
fn device_sync_endpoint_rejects_invalid_values() {
    let empty = device_sync_endpoint("  ").unwrap_err();
    assert!(empty.to_string().contains("must not be empty"));

    let missing_scheme = device_sync_endpoint("10.0.0.4:8080").unwrap_err();
    assert!(missing_scheme.to_string().contains("http:// or https://"));
}

#[test]
fn parse_api_error_prefers_error_field() {
    assert_eq!(
        parse_api_error(StatusCode::BAD_REQUEST, r#"{"error":"Unknown action"}"#),
        "Unknown action (400)"
    );
    assert_eq!(
        parse_api_error(StatusCode::BAD_GATEWAY, "  "),
        "HTTP 502"
    );
    assert_eq!(
        parse_api_error(StatusCode::INTERNAL_SERVER_ERROR, "disk full"),
        "disk full (500)"
    );
}

#[test]
fn device_client_keeps_identity() {
    let identity = DeviceIdentity {
        device_id: "tablet-1".to_string(),
        device_name: "Front desk".to_string(),
    };
    let client = DeviceClient::new("http://127.0.0.1:8080", identity.clone()).unwrap();

    assert_eq!(client.identity(), &identity);
    assert_eq!(client.endpoint(), "http://127.0.0.1:8080/v1/device-sync");
}

#[test]
fn explicit_identity_skips_persisted_id() {
    let identity = DeviceIdentity::resolve(
        Some(" tablet-1 ".to_string()),
        Some("Front desk".to_string()),
    )
    .unwrap();

    assert_eq!(identity.device_id, "tablet-1");
    assert_eq!(identity.device_name, "Front desk");
}

#[test]
fn device_id_is_generated_once_and_reused() {
    let dir = tempfile::tempdir().unwrap();
    let config_dir = dir.path().join("bizsync");

    let first = load_or_create_device_id(&config_dir).unwrap();
    let second = load_or_create_device_id(&config_dir).unwrap();

    assert_eq!(first, second);
    assert!(uuid::Uuid::parse_str(&first).is_ok());
}

#[test]
fn blank_device_id_file_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("device-id"), "\n").unwrap();

    let id = load_or_create_device_id(dir.path()).unwrap();
    assert!(!id.is_empty());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("device-id")).unwrap(),
        id
    );
}

#[test]
fn load_batch_reads_data_shaped_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("batch.json");
    std::fs::write(
        &path,
        json!({
            "companies": [{"id": "c-1", "name": "Acme"}],
            "items": [{"id": 7, "partNumber": "PN-7"}],
        })
        .to_string(),
    )
    .unwrap();

    let batch = load_batch(&path).unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch.entities(EntityKind::InventoryItem)[0].id, "7");
}

#[test]
fn load_batch_rejects_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.json");
    std::fs::write(&path, "{}").unwrap();

    assert!(matches!(load_batch(&path), Err(CliError::EmptyBatch(_))));
}

#[test]
fn format_peer_lines_lists_each_peer() {
    let peers = vec![PeerDevice {
        device_id: "0192f0c4-7a1b-7c3d-9e8f-001122334455".to_string(),
        device_name: "Back office".to_string(),
    }];
    assert_eq!(
        format_peer_lines(&peers),
        vec!["0192f0c4-7a1b  Back office".to_string()]
    );
    assert_eq!(
        format_peer_lines(&[]),
        vec!["No other devices on this network.".to_string()]
    );
}

#[test]
fn format_report_lines_for_synced_batch() {
    let report = SyncReport::Synced {
        results: SyncCounts::default(),
        message: "Synced 0 record(s)".to_string(),
    };
    let lines = format_report_lines(&report);

    assert_eq!(lines[0], "Synced 0 record(s)");
    assert_eq!(lines.len(), 1 + EntityKind::ALL.len());
    assert!(lines[1].contains("companies"));
}

#[test]
fn format_report_lines_for_duplicates() {
    let report = SyncReport::DuplicatesFound {
        duplicates: vec![DuplicateFinding {
            kind: EntityKind::Company,
            incoming: Entity::new("B", json!({"name": "ACME"})),
            existing: Entity::new("A", json!({"name": "Acme"})),
            field: "name".to_string(),
        }],
        message: "Found 1 potential duplicate(s). Review them before syncing.".to_string(),
    };
    let lines = format_report_lines(&report);

    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("B matches A on name"));
}

#[test]
fn completion_script_names_binary() {
    for shell in [
        CompletionShell::Bash,
        CompletionShell::Zsh,
        CompletionShell::Fish,
        CompletionShell::PowerShell,
    ] {
        let script = String::from_utf8(completion_script(shell)).unwrap();
        assert!(script.contains("bizsync"), "{shell:?}");
    }
}

#[test]
fn run_completions_writes_bash_script_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bizsync.bash");

    run_completions(CompletionShell::Bash, Some(&path)).unwrap();

    let script = std::fs::read_to_string(path).unwrap();
    assert!(script.contains("bizsync"));
    assert!(script.contains("discover"));
}
