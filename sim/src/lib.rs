// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Simulated firmware update device
//!
//! Runs the [ota_core] engine against in-memory partitions and a headless UI,
//! reachable over TCP (see [serve_tcp]) or in-process via [Loopback]
//! for use from rust tests.

use std::net::SocketAddr;

use clap::ValueEnum;
use log::{debug, info};
use strum::Display;
use tokio::net::TcpListener;

use ota_core::engine::{Interactive, Unattended};

mod driver;
pub use driver::{stub_image, SimDriver, SimError, SimHandle, SimState, Slot, DEFAULT_PARTITION_SIZE};

mod ui;
pub use ui::{Screen, SimUi};

mod channel;
pub use channel::{QueueChannel, StreamChannel};

mod device;
pub use device::{Device, SimConfirm};

mod loopback;
pub use loopback::{Finished, Loopback};

/// Default listen address for the simulator
pub const DEFAULT_LISTEN: &str = "127.0.0.1:9123";

/// Button response for interactive confirmation
#[derive(Copy, Clone, PartialEq, Debug, ValueEnum, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Button {
    Accept,
    Decline,
}

/// Simulated device configuration
#[derive(Clone, PartialEq, Debug, clap::Args)]
pub struct SimOptions {
    /// Version of the initially installed firmware
    #[clap(long, env = "OTA_SIM_VERSION", default_value = "1.0.0")]
    pub version: String,

    /// Secure version of the initially installed firmware
    #[clap(long, env = "OTA_SIM_SECURE_VERSION", default_value = "0")]
    pub secure_version: u32,

    /// Burned anti-rollback counter
    #[clap(long, env = "OTA_SIM_BURNED", default_value = "0")]
    pub burned: u32,

    /// Partition size in bytes
    #[clap(long, env = "OTA_SIM_PARTITION_SIZE", default_value_t = DEFAULT_PARTITION_SIZE)]
    pub partition_size: usize,

    /// Accept updates after this delay (ms) instead of waiting for a button
    #[clap(long, env = "OTA_SIM_UNATTENDED_MS")]
    pub unattended_ms: Option<u32>,

    /// Button response for interactive confirmation
    #[clap(long, value_enum, env = "OTA_SIM_BUTTON", default_value = "accept")]
    pub button: Button,

    /// Sleep on UI delays
    #[clap(long)]
    pub realtime: bool,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            secure_version: 0,
            burned: 0,
            partition_size: DEFAULT_PARTITION_SIZE,
            unattended_ms: None,
            button: Button::Accept,
            realtime: false,
        }
    }
}

impl SimOptions {
    /// Build driver, UI and confirmation policy
    pub fn build(&self) -> anyhow::Result<(SimDriver, SimUi, SimConfirm)> {
        let image = stub_image(&self.version, self.secure_version)
            .map_err(|e| anyhow::anyhow!("Invalid firmware version '{}': {}", self.version, e))?;

        let drv = SimDriver::new(image, self.burned).with_partition_size(self.partition_size);

        let ui = SimUi::new(self.button == Button::Accept).with_realtime(self.realtime);

        let confirm: SimConfirm = match self.unattended_ms {
            Some(ms) => Box::new(Unattended::new(ms)),
            None => Box::new(Interactive),
        };

        Ok((drv, ui, confirm))
    }
}

/// Serve simulated device connections from a TCP listener, one at a time.
///
/// Device state persists across connections.
pub async fn serve_tcp(listener: TcpListener, opts: SimOptions) -> anyhow::Result<()> {
    let mut parts = opts.build()?;

    info!("Listening on {}", listener.local_addr()?);

    loop {
        let (s, addr): (_, SocketAddr) = listener.accept().await?;
        info!("Connection from {}", addr);

        // The engine blocks on the channel, run it on the blocking pool
        let s = s.into_std()?;
        s.set_nonblocking(false)?;
        s.set_nodelay(true)?;

        let (drv, ui, confirm) = parts;

        parts = tokio::task::spawn_blocking(move || {
            let mut d = Device::new(drv, StreamChannel::new(s), ui, confirm);
            d.serve();

            let (drv, _ch, ui, confirm) = d.into_parts();
            (drv, ui, confirm)
        })
        .await?;

        debug!("Connection from {} closed", addr);
        info!("Device state: {}", serde_json::to_string(&parts.0.state())?);
    }
}
