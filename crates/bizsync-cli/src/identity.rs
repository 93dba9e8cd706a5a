//! Stable device identity for this machine.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use bizsync_core::util::normalize_text_option;
use uuid::Uuid;

use crate::error::CliError;

const FALLBACK_DEVICE_NAME: &str = "bizsync-device";
const DEVICE_ID_FILE: &str = "device-id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub device_id: String,
    pub device_name: String,
}

impl DeviceIdentity {
    /// Explicit values win; otherwise the id remembered under the user config dir.
    pub fn resolve(device_id: Option<String>, device_name: Option<String>) -> Result<Self, CliError> {
        let device_id = match normalize_text_option(device_id) {
            Some(id) => id,
            None => load_or_create_device_id(&config_dir()?)?,
        };
        let device_name = normalize_text_option(device_name)
            .or_else(host_name)
            .unwrap_or_else(|| FALLBACK_DEVICE_NAME.to_string());

        Ok(Self {
            device_id,
            device_name,
        })
    }
}

fn config_dir() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join("bizsync"))
        .ok_or_else(|| CliError::Config("could not determine the user config directory".to_string()))
}

fn host_name() -> Option<String> {
    ["HOSTNAME", "COMPUTERNAME"]
        .into_iter()
        .find_map(|name| normalize_text_option(env::var(name).ok()))
}

/// Read the persisted device id from `dir`, generating one on first use
pub fn load_or_create_device_id(dir: &Path) -> Result<String, CliError> {
    let path = dir.join(DEVICE_ID_FILE);
    if path.exists() {
        if let Some(id) = normalize_text_option(Some(fs::read_to_string(&path)?)) {
            return Ok(id);
        }
    }

    fs::create_dir_all(dir)?;
    let id = Uuid::now_v7().to_string();
    fs::write(&path, &id)?;
    tracing::info!(path = %path.display(), "Generated new device id");
    Ok(id)
}
