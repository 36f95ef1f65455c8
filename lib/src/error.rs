// Copyright (c) 2022-2023 The MobileCoin Foundation

use ota_proto::{ErrorCode, OtaError, ProtoError};
use tokio::time::error::Elapsed;

/// Firmware update client error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Underlying transport I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Request timeout
    #[error("Timeout waiting for device response")]
    RequestTimeout,

    /// Frame length outside protocol limits
    #[error("Invalid frame length: {0}")]
    InvalidLength(usize),

    /// Request encoding or reply decoding failed
    #[error("Protocol error: {0}")]
    Proto(#[from] ProtoError),

    /// Reply id does not match the outstanding request
    #[error("Unexpected reply (expected id '{expected}', got '{actual}')")]
    UnexpectedResponse { expected: String, actual: String },

    /// Device rejected a request without an update status
    #[error("Device error {code}: {message}")]
    Device { code: ErrorCode, message: String },

    /// Update session failed on the device
    #[error("Update failed: {0}")]
    Update(OtaError),

    /// Image header could not be parsed
    #[error("Invalid firmware image: {0}")]
    InvalidImage(ProtoError),

    /// Compressed image is not smaller than the original
    #[error("Image does not compress ({compressed} >= {size} bytes)")]
    Incompressible { size: usize, compressed: usize },

    /// Chunk size outside the protocol limit
    #[error("Invalid chunk size {0} (max {max})", max = ota_proto::MAX_CHUNK_SIZE)]
    InvalidChunkSize(usize),

    /// Transport closed by the device
    #[error("Connection closed")]
    Closed,
}

impl From<Elapsed> for Error {
    fn from(_: Elapsed) -> Self {
        Error::RequestTimeout
    }
}
