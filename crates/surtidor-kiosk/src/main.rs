//! Surtidor kiosk standalone binary.

use clap::Parser;
use surtidor_kiosk::{KioskArgs, cli};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = KioskArgs::parse();
    cli::run(args).await
}
