// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::net::SocketAddr;

use clap::Parser;
use log::{debug, LevelFilter};
use tokio::net::TcpListener;

use ota_sim::*;

/// Simulated firmware update device
///
/// Serves the update protocol over TCP with in-memory partitions,
/// for use with `ota-cli` or the `ota-tests` runner.
#[derive(Clone, Debug, PartialEq, Parser)]
pub struct Args {
    /// Listen address
    #[clap(long, env = "OTA_SIM_LISTEN", default_value = DEFAULT_LISTEN)]
    listen: SocketAddr,

    #[clap(flatten)]
    opts: SimOptions,

    /// Log level
    #[clap(long, default_value = "debug")]
    log_level: LevelFilter,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging
    let _ = simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default());

    let listener = TcpListener::bind(args.listen).await?;

    // Serve until exit signal
    tokio::select!(
        r = serve_tcp(listener, args.opts) => r?,
        // Exit on ctrl + c
        _ = tokio::signal::ctrl_c() => {
            debug!("Exit!");
        },
    );

    Ok(())
}
