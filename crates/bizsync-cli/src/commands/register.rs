use crate::client::DeviceClient;
use crate::error::CliError;

pub async fn run_register(client: &DeviceClient) -> Result<(), CliError> {
    client.register().await?;
    let identity = client.identity();
    println!(
        "Registered {} ({}) with {}",
        identity.device_name,
        identity.device_id,
        client.endpoint()
    );
    Ok(())
}
