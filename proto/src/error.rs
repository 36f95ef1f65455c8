// Copyright (c) 2022-2023 The MobileCoin Foundation

/// Protocol encoding / decoding errors
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum ProtoError {
    /// Buffer or frame too short
    #[cfg_attr(feature = "thiserror", error("invalid length"))]
    InvalidLength,

    /// Malformed CBOR or unexpected data type
    #[cfg_attr(feature = "thiserror", error("invalid encoding"))]
    InvalidEncoding,

    /// Required field absent from a map
    #[cfg_attr(feature = "thiserror", error("missing field '{0}'"))]
    MissingField(&'static str),

    /// Message id exceeds [MAXLEN_ID][crate::MAXLEN_ID]
    #[cfg_attr(feature = "thiserror", error("message id too long"))]
    IdTooLong,

    /// Text field exceeds its bounded container
    #[cfg_attr(feature = "thiserror", error("text too long"))]
    TextTooLong,

    /// Unrecognised error code in reply
    #[cfg_attr(feature = "thiserror", error("unknown error code {0}"))]
    UnknownCode(i32),

    /// Output buffer exhausted while encoding
    #[cfg_attr(feature = "thiserror", error("encode buffer full"))]
    BufferFull,
}

impl From<minicbor::decode::Error> for ProtoError {
    fn from(e: minicbor::decode::Error) -> Self {
        match e.is_end_of_input() {
            true => ProtoError::InvalidLength,
            false => ProtoError::InvalidEncoding,
        }
    }
}

impl<E> From<minicbor::encode::Error<E>> for ProtoError {
    fn from(_e: minicbor::encode::Error<E>) -> Self {
        ProtoError::BufferFull
    }
}
