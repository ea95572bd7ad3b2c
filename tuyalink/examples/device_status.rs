//! Query a device and toggle its first switch

use std::time::Duration;

use anyhow::Context;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;
use tuyalink::{Device, ProtocolVersion};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let id = std::env::var("DEVICE_ID").context("DEVICE_ID is not set")?;
    let ip = std::env::var("DEVICE_IP").unwrap_or_else(|_| "192.168.1.50".to_string());
    let key = std::env::var("DEVICE_KEY").context("DEVICE_KEY is not set")?;
    let version: ProtocolVersion = std::env::var("DEVICE_VERSION")
        .unwrap_or_else(|_| "3.3".to_string())
        .parse()?;

    let mut device = Device::new(id, ip, key).with_version(version);

    let status = device.query_status().await?;
    println!("Status: {:?}", status.dps());

    let on = status
        .dps()
        .and_then(|dps| dps.get("1"))
        .and_then(|value| value.as_bool())
        .unwrap_or(false);

    println!("Switching {}...", if on { "off" } else { "on" });
    device.set_status(!on, 1).await?;
    sleep(Duration::from_secs(2)).await;

    println!("Switching back...");
    device.set_status(on, 1).await?;

    println!("Done!");

    Ok(())
}
