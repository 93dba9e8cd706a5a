use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

#[derive(Parser)]
#[command(name = "bizsync")]
#[command(about = "Announce this device and sync records with peers on the local network")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Base URL of the bizsync API
    #[arg(long, global = true, env = "BIZSYNC_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Device identifier (generated and remembered when omitted)
    #[arg(long, global = true, env = "BIZSYNC_DEVICE_ID", value_name = "ID")]
    pub device_id: Option<String>,

    /// Display name other devices see
    #[arg(long, global = true, env = "BIZSYNC_DEVICE_NAME", value_name = "NAME")]
    pub device_name: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Announce this device on its network
    Register,
    /// List live peers on the same network
    Discover {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Send a batch of records for duplicate-checked sync
    Push {
        /// JSON file with `companies`, `people`, `items` and `vendors` arrays
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Stop announcing this device
    Unregister,
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}
