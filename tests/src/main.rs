// Copyright (c) 2022-2023 The MobileCoin Foundation

use clap::Parser;
use log::{info, LevelFilter};
use strum::Display;

use ota_client::{
    transport::{TcpOptions, TransportTcp},
    GenericHandle,
};
use ota_proto::{OtaError, MAX_CHUNK_SIZE};

use ota_tests::{
    session,
    update::{test_rejected, test_update},
    vectors::VECTORS,
};

/// Test CLI arguments
#[derive(Clone, Debug, Parser)]
pub struct Opts {
    #[clap(subcommand)]
    pub test: Tests,

    #[clap(flatten)]
    pub tcp: TcpOptions,

    /// Log level
    #[clap(long, default_value = "debug", env)]
    pub log_level: LevelFilter,
}

/// Test modes
#[derive(Clone, PartialEq, Debug, Parser, Display)]
pub enum Tests {
    /// Install a test vector image (device must accept)
    Update {
        /// Vector index
        #[clap(long, default_value = "0")]
        vector: usize,

        /// Maximum compressed bytes per chunk
        #[clap(long, default_value_t = MAX_CHUNK_SIZE)]
        chunk_size: usize,
    },
    /// Install a test vector image, expecting the provided failure status
    Rejected {
        /// Vector index
        #[clap(long, default_value = "0")]
        vector: usize,

        /// Expected status (eg. ERROR_USER_DECLINED)
        #[clap(long)]
        status: OtaError,
    },
    /// Start a session with invalid sizes
    BadParameters,
    /// Send completion before data
    PrematureComplete,
    /// Upload an image with an unterminated version string
    InvalidFirmware,
    /// Send data outside a session
    UnknownMethod,
    /// Start a session with an unknown source tag
    UnknownSource,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load options
    let opts = Opts::parse();

    // Setup logging
    let _ = simplelog::SimpleLogger::init(opts.log_level, simplelog::Config::default());

    info!("Running test: {}", opts.test);

    let vector = |i: usize| {
        VECTORS
            .get(i)
            .ok_or_else(|| anyhow::anyhow!("Invalid vector index {} (max {})", i, VECTORS.len() - 1))
    };

    match opts.test {
        Tests::Update { vector: i, chunk_size } => {
            let h = GenericHandle::connect_tcp(opts.tcp).await?;
            let r = test_update(&h, vector(i)?, chunk_size).await?;
            info!("Installed {} in {} chunks", r.image.version, r.chunks);
        }
        Tests::Rejected { vector: i, status } => {
            let h = GenericHandle::connect_tcp(opts.tcp).await?;
            test_rejected(&h, vector(i)?, status).await?;
        }
        Tests::BadParameters => {
            let t = TransportTcp::new(opts.tcp).await?;
            session::test_bad_parameters(&t).await?;
        }
        Tests::PrematureComplete => {
            let t = TransportTcp::new(opts.tcp).await?;
            session::test_premature_complete(&t, &VECTORS[0]).await?;
        }
        Tests::InvalidFirmware => {
            let t = TransportTcp::new(opts.tcp).await?;
            session::test_invalid_firmware(&t, &VECTORS[0]).await?;
        }
        Tests::UnknownMethod => {
            let t = TransportTcp::new(opts.tcp).await?;
            session::test_unknown_method(&t).await?;
        }
        Tests::UnknownSource => {
            let t = TransportTcp::new(opts.tcp).await?;
            session::test_unknown_source(&t).await?;
        }
    }

    info!("Test passed");

    Ok(())
}
