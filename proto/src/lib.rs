// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protocol definitions for firmware update (OTA) communication
//!
//! Requests and replies are CBOR maps in the style of a JSON-RPC envelope,
//! carried as raw binary frames prefixed with a single source tag byte
//! identifying the interface the frame arrived on:
//!
//! ```text
//! +--------+------------------------------------------------------+
//! | SOURCE | CBOR { "id": text, "method": text, "params": any? }  |
//! +--------+------------------------------------------------------+
//! ```
//!
//! Replies carry the correlation id of the request they answer, and either a
//! `result` or an `error` object containing an [ErrorCode], a message and
//! optional data (the OTA status string for update failures).
//!
//! An update consists of:
//!
//! 1. An `ota` request carrying the uncompressed (`fwsize`) and compressed
//!    (`cmpsize`) image sizes, see [OtaParams]
//! 2. A sequence of `ota_data` requests, each carrying up to [MAX_CHUNK_SIZE]
//!    bytes of zlib-compressed image data as a `params` byte string
//! 3. An `ota_complete` request, answered with the overall [OtaStatus]
//!
//! See [image] for the layout of the firmware header inspected by the device
//! prior to installation.

#![cfg_attr(not(feature = "std"), no_std)]

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

mod error;
pub use error::ProtoError;

mod id;
pub use id::MsgId;

mod rpc;
pub use rpc::{ErrorCode, Params, Reply, ReplyBody, Request};

mod ota;
pub use ota::OtaParams;

mod status;
pub use status::{status_str, OtaError, OtaStatus};

pub mod image;

/// Maximum length of a message correlation id
pub const MAXLEN_ID: usize = 16;

/// Maximum size of the compressed payload carried by a single `ota_data` frame
pub const MAX_CHUNK_SIZE: usize = 4096;

/// Upper bound for CBOR envelope overhead around an `ota_data` payload
/// (map header, keys, id and method strings, byte string header)
pub const MAX_ENVELOPE_OVERHEAD: usize = 64;

/// Maximum raw frame size (source tag, envelope and payload)
pub const MAX_FRAME_SIZE: usize = 1 + MAX_ENVELOPE_OVERHEAD + MAX_CHUNK_SIZE;

/// Message source, the first byte of every raw frame
#[derive(
    Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumIter, TryFromPrimitive, IntoPrimitive,
)]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum Source {
    Serial = 0x00,
    Ble = 0x01,
    Qr = 0x02,
}

/// RPC methods used by the update protocol
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Method {
    /// Start an update session
    Ota,
    /// Compressed firmware chunk
    OtaData,
    /// Fetch the final session status
    OtaComplete,
}

impl Method {
    /// Fetch the wire name for a method
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Split a raw frame into source tag and CBOR body
pub fn split_frame(frame: &[u8]) -> Result<(u8, &[u8]), ProtoError> {
    match frame.split_first() {
        Some((source, body)) if !body.is_empty() => Ok((*source, body)),
        _ => Err(ProtoError::InvalidLength),
    }
}
