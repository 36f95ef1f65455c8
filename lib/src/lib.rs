// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Firmware update client library (and CLI)
//!
//! Provides image inspection and compression helpers, transports, and a
//! [DeviceHandle] driving the `ota` / `ota_data` / `ota_complete` exchange
//! against a device or simulator.

/// Re-export transports for consumer use
pub mod transport;
pub use transport::Exchange;
use transport::{GenericTransport, TcpOptions, TransportTcp};

/// Re-export `ota-proto` for consumers
pub use ota_proto::{self as proto};

pub mod image;

mod handle;
pub use handle::{DeviceHandle, UpdateOptions, UpdateReport};

mod error;
pub use error::Error;

/// Generic device handle (abstract over transport types)
pub type GenericHandle = DeviceHandle<GenericTransport>;

impl GenericHandle {
    /// Create a new generic device handle
    pub fn new(d: impl Into<GenericTransport>) -> Self {
        Self::from(d.into())
    }

    /// Connect to a device over TCP
    pub async fn connect_tcp(opts: TcpOptions) -> Result<Self, Error> {
        let t = TransportTcp::new(opts).await?;

        Ok(Self::new(t))
    }
}
