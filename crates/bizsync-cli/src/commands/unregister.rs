use crate::client::DeviceClient;
use crate::error::CliError;

pub async fn run_unregister(client: &DeviceClient) -> Result<(), CliError> {
    client.unregister().await?;
    println!("Unregistered {}", client.identity().device_id);
    Ok(())
}
