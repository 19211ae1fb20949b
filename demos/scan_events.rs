use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use printfind::bluez::BlueZStack;
use printfind::{Discovery, Result, ScanConfig};

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    let discovery = Discovery::new(Arc::new(BlueZStack::new()));

    // Print printers as the inquiry finds them
    let mut devices = discovery.device_stream();
    let printer_task = tokio::spawn(async move {
        while let Some(device) = devices.next().await {
            println!("found {:?}", device);
        }
    });

    let config = ScanConfig::default().stop_after_timeout(Duration::from_secs(30));
    let printers = discovery.active_discovery_scan(config).await?;
    println!("{} printer(s) in range", printers.len());

    printer_task.await.ok();

    Ok(())
}
