use std::sync::Arc;

use printfind::bluez::BlueZStack;
use printfind::{Discovery, Result};

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    let discovery = Discovery::new(Arc::new(BlueZStack::new()));

    // The local adapter, as labeled lines
    print!("{}", discovery.describe_local_adapter().await);

    // Paired printers, as a comma-separated listing
    println!("{}", discovery.list_known_printers().await?);

    Ok(())
}
