//! Discover devices on the local network

use std::time::Duration;

use tracing_subscriber::EnvFilter;
use tuyalink::Scanner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("Listening for broadcasts...");

    let devices = Scanner::new()
        .with_timeout(Duration::from_secs(3))
        .scan()
        .await?;

    if devices.is_empty() {
        println!("No devices found");
    }

    for device in devices.values() {
        println!("{}", device);
        if let Some(dps) = &device.dps {
            println!("    dps: {}", dps);
        }
        if let Some(error) = &device.poll_error {
            println!("    {}", error);
        }
    }

    Ok(())
}
