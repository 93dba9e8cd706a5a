use crate::client::DeviceClient;
use crate::commands::common::format_peer_lines;
use crate::error::CliError;

pub async fn run_discover(client: &DeviceClient, as_json: bool) -> Result<(), CliError> {
    let peers = client.discover().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&peers)?);
    } else {
        for line in format_peer_lines(&peers) {
            println!("{line}");
        }
    }

    Ok(())
}
