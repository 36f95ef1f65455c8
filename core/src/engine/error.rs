// Copyright (c) 2022-2023 The MobileCoin Foundation

use ota_proto::{MsgId, OtaError};

/// Chunk receiver errors
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum RecvError {
    /// Channel failed or closed
    #[cfg_attr(feature = "thiserror", error("channel receive failed"))]
    Channel,

    /// Frame could not be decoded, request id unknown
    #[cfg_attr(feature = "thiserror", error("malformed frame"))]
    Malformed,

    /// Request for a method other than `ota_data`
    #[cfg_attr(feature = "thiserror", error("unexpected method (id: {0})"))]
    UnexpectedMethod(MsgId),

    /// Missing, empty or oversized payload, or source mismatch
    #[cfg_attr(feature = "thiserror", error("invalid ota_data (id: {0})"))]
    BadData(MsgId),
}

impl RecvError {
    /// Request id for the offending frame, if known
    pub fn id(&self) -> Option<&MsgId> {
        match self {
            RecvError::UnexpectedMethod(id) | RecvError::BadData(id) => Some(id),
            _ => None,
        }
    }
}

impl From<RecvError> for OtaError {
    fn from(_: RecvError) -> Self {
        OtaError::BadData
    }
}
