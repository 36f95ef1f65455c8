// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Command line utility for inspecting, compressing and installing firmware images

use std::path::PathBuf;

use clap::Parser;
use log::{debug, error, info, LevelFilter};

use ota_client::{
    image::{self, DEFAULT_LEVEL},
    proto::{Source, MAX_CHUNK_SIZE},
    transport::TcpOptions,
    Error, GenericHandle, UpdateOptions,
};

/// Firmware update command line utility
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Enable verbose logging
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Clone, PartialEq, Debug, Parser)]
#[non_exhaustive]
enum Actions {
    /// Show firmware image information as JSON
    Inspect {
        /// Uncompressed firmware image
        file: PathBuf,
    },

    /// Compress a firmware image for upload
    Compress {
        /// Uncompressed firmware image
        file: PathBuf,

        /// Output file
        #[clap(long, short)]
        output: PathBuf,

        /// zlib compression level
        #[clap(long, default_value_t = DEFAULT_LEVEL)]
        level: u32,
    },

    /// Install a firmware image on a connected device
    Update {
        /// Uncompressed firmware image
        file: PathBuf,

        #[clap(flatten)]
        tcp: TcpOptions,

        /// Source tag for outgoing frames
        #[clap(long, default_value = "serial")]
        source: Source,

        /// Maximum compressed bytes per chunk
        #[clap(long, env = "OTA_CHUNK_SIZE", default_value_t = MAX_CHUNK_SIZE)]
        chunk_size: usize,

        /// zlib compression level
        #[clap(long, default_value_t = DEFAULT_LEVEL)]
        level: u32,

        /// Timeout for requests awaiting user confirmation (seconds)
        #[clap(long, default_value = "60")]
        user_timeout_s: usize,

        /// Timeout for other requests (seconds)
        #[clap(long, default_value = "5")]
        request_timeout_s: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging
    simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default())?;

    debug!("Executing command: {:?}", args.cmd);

    execute(args.cmd).await
}

/// Execute a command
async fn execute(cmd: Actions) -> anyhow::Result<()> {
    match cmd {
        Actions::Inspect { file } => {
            let b = std::fs::read(&file)?;
            let i = image::inspect(&b)?;

            println!("{}", serde_json::to_string_pretty(&i)?);
        }
        Actions::Compress {
            file,
            output,
            level,
        } => {
            let b = std::fs::read(&file)?;

            // Refuse to compress files the device would reject
            let i = image::inspect(&b)?;
            let c = image::compress(&b, level)?;

            info!(
                "Compressed {} version {}: {} -> {} bytes",
                i.project_name,
                i.version,
                b.len(),
                c.len()
            );

            std::fs::write(&output, c)?;
        }
        Actions::Update {
            file,
            tcp,
            source,
            chunk_size,
            level,
            user_timeout_s,
            request_timeout_s,
        } => {
            let b = std::fs::read(&file)?;

            info!("Connecting to device at {}", tcp.addr);

            let h = GenericHandle::connect_tcp(tcp)
                .await?
                .with_source(source)
                .with_timeouts(request_timeout_s, user_timeout_s);

            let opts = UpdateOptions { chunk_size, level };

            match h.update(&b, &opts).await {
                Ok(r) => {
                    info!(
                        "Installed version {} ({} chunks, {} compressed bytes)",
                        r.image.version, r.chunks, r.compressed_size
                    );
                }
                Err(Error::Update(e)) => {
                    error!("Device reported update failure: {}", e);
                    return Err(Error::Update(e).into());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}
