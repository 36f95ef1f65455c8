//! Transports for exchanging update frames with devices
//!
//! Stream transports carry each frame with a 4-byte big-endian length prefix:
//!
//! ```text
//! +------------+----------------------------+
//! | LEN (u32)  | FRAME (LEN bytes)          |
//! +------------+----------------------------+
//! ```
//!
// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    time::Duration,
};

use async_trait::async_trait;
use log::{debug, trace};
use strum::Display;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    sync::Mutex,
};

use ota_proto::MAX_FRAME_SIZE;

use crate::Error;

/// Default simulator / device TCP port
pub const DEFAULT_PORT: u16 = 9123;

/// [Exchange] sends a single request frame and returns the matching reply frame
#[async_trait]
pub trait Exchange {
    async fn exchange(&self, frame: &[u8], timeout: Duration) -> Result<Vec<u8>, Error>;
}

/// Forward [Exchange] through references
#[async_trait]
impl<T: Exchange + Send + Sync> Exchange for &T {
    async fn exchange(&self, frame: &[u8], timeout: Duration) -> Result<Vec<u8>, Error> {
        T::exchange(self, frame, timeout).await
    }
}

/// TCP transport options
#[derive(Clone, PartialEq, Debug, clap::Args)]
pub struct TcpOptions {
    /// Device address
    #[clap(long, env = "OTA_DEVICE_ADDR", default_value_t = TcpOptions::default().addr)]
    pub addr: SocketAddr,
}

impl Default for TcpOptions {
    fn default() -> Self {
        Self {
            addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
        }
    }
}

/// TCP transport using length-prefixed frames
pub struct TransportTcp {
    s: Mutex<TcpStream>,
    opts: TcpOptions,
}

impl TransportTcp {
    /// Connect to a device or simulator
    pub async fn new(opts: TcpOptions) -> Result<Self, Error> {
        debug!("Connecting to {}", opts.addr);

        let s = TcpStream::connect(opts.addr).await?;
        s.set_nodelay(true)?;

        Ok(Self {
            s: Mutex::new(s),
            opts,
        })
    }

    /// Fetch connection options
    pub fn options(&self) -> &TcpOptions {
        &self.opts
    }
}

#[async_trait]
impl Exchange for TransportTcp {
    async fn exchange(&self, frame: &[u8], timeout: Duration) -> Result<Vec<u8>, Error> {
        let mut s = self.s.lock().await;

        write_frame(&mut *s, frame).await?;

        let r = tokio::time::timeout(timeout, read_frame(&mut *s)).await??;

        Ok(r)
    }
}

/// Write a length-prefixed frame
pub async fn write_frame<W: AsyncWrite + Unpin>(w: &mut W, frame: &[u8]) -> Result<(), Error> {
    if frame.is_empty() || frame.len() > MAX_FRAME_SIZE {
        return Err(Error::InvalidLength(frame.len()));
    }

    trace!("tx {} bytes: {:02x?}", frame.len(), &frame[..frame.len().min(32)]);

    w.write_u32(frame.len() as u32).await?;
    w.write_all(frame).await?;
    w.flush().await?;

    Ok(())
}

/// Read a length-prefixed frame
pub async fn read_frame<R: AsyncRead + Unpin>(r: &mut R) -> Result<Vec<u8>, Error> {
    let n = match r.read_u32().await {
        Ok(n) => n as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(Error::Closed),
        Err(e) => return Err(e.into()),
    };

    if n == 0 || n > MAX_FRAME_SIZE {
        return Err(Error::InvalidLength(n));
    }

    let mut b = vec![0u8; n];
    r.read_exact(&mut b).await?;

    trace!("rx {} bytes: {:02x?}", n, &b[..n.min(32)]);

    Ok(b)
}

/// Generic device transport (abstract over transport types)
#[derive(Display)]
#[non_exhaustive]
pub enum GenericTransport {
    Tcp(TransportTcp),
}

/// Convert a TCP transport into a generic transport
impl From<TransportTcp> for GenericTransport {
    fn from(t: TransportTcp) -> Self {
        Self::Tcp(t)
    }
}

#[async_trait]
impl Exchange for GenericTransport {
    async fn exchange(&self, frame: &[u8], timeout: Duration) -> Result<Vec<u8>, Error> {
        match self {
            Self::Tcp(t) => t.exchange(frame, timeout).await,
        }
    }
}
