// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Handle for connected update-capable devices
//!
//! This provides the host side of the update protocol
//! and is generic over [Exchange] transports

use std::{str::FromStr, sync::Arc, time::Duration};

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::Mutex;

use ota_proto::{
    ErrorCode, Method, OtaError, OtaParams, Params, Reply, ReplyBody, Request, Source,
    MAX_CHUNK_SIZE, MAX_FRAME_SIZE,
};

use crate::{
    image::{self, ImageInfo, DEFAULT_LEVEL},
    Error, Exchange,
};

/// Update handle for a connected device.
///
/// This is generic over [Exchange] types to support different
/// underlying transports
pub struct DeviceHandle<T: Exchange> {
    /// Transport for communication
    t: Arc<Mutex<T>>,
    /// Source tag attached to outgoing frames
    source: Source,
    /// Timeout for requests that may block on user confirmation
    user_timeout_s: usize,
    /// Timeout for plain requests
    request_timeout_s: usize,
}

/// Create a [DeviceHandle] wrapper from a type implementing [Exchange]
impl<T: Exchange> From<T> for DeviceHandle<T> {
    fn from(t: T) -> Self {
        Self {
            t: Arc::new(Mutex::new(t)),
            source: Source::Serial,
            user_timeout_s: 60,
            request_timeout_s: 5,
        }
    }
}

/// Update options
#[derive(Clone, PartialEq, Debug)]
pub struct UpdateOptions {
    /// Maximum compressed bytes per `ota_data` frame
    pub chunk_size: usize,
    /// zlib compression level
    pub level: u32,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            chunk_size: MAX_CHUNK_SIZE,
            level: DEFAULT_LEVEL,
        }
    }
}

/// Summary of a completed update
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct UpdateReport {
    pub image: ImageInfo,
    pub compressed_size: usize,
    pub chunks: usize,
}

impl<T: Exchange + Send + Sync> DeviceHandle<T> {
    /// Set the source tag for outgoing frames
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    /// Set request and user confirmation timeouts (in seconds)
    pub fn with_timeouts(mut self, request_timeout_s: usize, user_timeout_s: usize) -> Self {
        self.request_timeout_s = request_timeout_s;
        self.user_timeout_s = user_timeout_s;
        self
    }

    /// Helper to fetch user interaction timeout
    fn user_timeout(&self) -> Duration {
        Duration::from_secs(self.user_timeout_s as u64)
    }

    /// Helper to fetch request timeout
    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_s as u64)
    }

    /// Compress and stream a firmware image to the device.
    ///
    /// Any device error ends the update, errors carrying an update status
    /// are returned as [Error::Update].
    pub async fn update(&self, image: &[u8], opts: &UpdateOptions) -> Result<UpdateReport, Error> {
        if opts.chunk_size == 0 || opts.chunk_size > MAX_CHUNK_SIZE {
            return Err(Error::InvalidChunkSize(opts.chunk_size));
        }

        let info = image::inspect(image)?;
        info!(
            "Updating to {} version {} (secure version {}, {} bytes)",
            info.project_name, info.version, info.secure_version, info.size
        );

        let compressed = image::compress(image, opts.level)?;
        if compressed.len() >= image.len() {
            return Err(Error::Incompressible {
                size: image.len(),
                compressed: compressed.len(),
            });
        }

        let params = OtaParams::new(
            u32::try_from(image.len()).map_err(|_| Error::InvalidLength(image.len()))?,
            compressed.len() as u32,
        );

        let chunks = (compressed.len() + opts.chunk_size - 1) / opts.chunk_size;
        info!(
            "Compressed to {} bytes, sending {} chunks of up to {} bytes",
            compressed.len(),
            chunks,
            opts.chunk_size
        );

        // Start session
        self.request("0", Method::Ota, Params::Ota(params), self.request_timeout())
            .await?;

        // Stream chunks, any of which may block on device confirmation
        for (i, c) in compressed.chunks(opts.chunk_size).enumerate() {
            let id = format!("{}", i + 1);

            self.request(&id, Method::OtaData, Params::Bytes(c), self.user_timeout())
                .await?;

            debug!("Chunk {}/{} accepted ({} bytes)", i + 1, chunks, c.len());
        }

        // Collect the final status
        let id = format!("{}", chunks + 1);
        self.request(&id, Method::OtaComplete, Params::None, self.request_timeout())
            .await?;

        info!("Update complete, device rebooting");

        Ok(UpdateReport {
            image: info,
            compressed_size: compressed.len(),
            chunks,
        })
    }

    /// Issue a request and check the reply
    async fn request(
        &self,
        id: &str,
        method: Method,
        params: Params<'_>,
        timeout: Duration,
    ) -> Result<(), Error> {
        let mut buff = vec![0u8; MAX_FRAME_SIZE];

        let req = Request::new(id, method, params);
        let n = req.encode_frame(self.source, &mut buff)?;

        let resp = self.t.lock().await.exchange(&buff[..n], timeout).await?;

        check_reply(id, &resp)
    }
}

/// Check a reply frame matches the outstanding request and succeeded
fn check_reply(id: &str, resp: &[u8]) -> Result<(), Error> {
    let r = Reply::decode(resp)?;

    match r.body {
        ReplyBody::Error {
            code,
            message,
            data,
        } => {
            warn!("Request {} failed: {} '{}'", r.id, code, message);
            Err(reply_error(code, message, data))
        }
        _ if r.id != id => Err(Error::UnexpectedResponse {
            expected: id.to_string(),
            actual: r.id.to_string(),
        }),
        ReplyBody::Result(true) => Ok(()),
        ReplyBody::Result(false) => Err(Error::Device {
            code: ErrorCode::InternalError,
            message: "request failed".to_string(),
        }),
    }
}

/// Map an error reply to [Error], recovering the update status from error data
fn reply_error(code: ErrorCode, message: &str, data: Option<&[u8]>) -> Error {
    let status = data
        .and_then(|d| core::str::from_utf8(d).ok())
        .and_then(|s| OtaError::from_str(s).ok());

    match status {
        Some(e) => Error::Update(e),
        None => Error::Device {
            code,
            message: message.to_string(),
        },
    }
}
