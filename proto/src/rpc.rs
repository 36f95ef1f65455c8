// Copyright (c) 2022-2023 The MobileCoin Foundation

//! CBOR RPC request / reply envelopes

use minicbor::{
    encode::{write::Cursor, Write},
    Decoder, Encoder,
};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::Display;

use crate::{Method, OtaParams, ProtoError, Source};

/// RPC error codes carried in error replies
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum ErrorCode {
    InvalidRequest = -32600,
    UnknownMethod = -32601,
    BadParameters = -32602,
    InternalError = -32603,
    UserCancelled = -32000,
    ProtocolError = -32001,
}

/// Request parameters
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Params<'a> {
    /// No `params` field
    None,
    /// Undecoded CBOR value, as returned by [Request::decode]
    Raw(&'a [u8]),
    /// Byte string parameters (`ota_data`)
    Bytes(&'a [u8]),
    /// Update session parameters (`ota`)
    Ota(OtaParams),
}

/// RPC request envelope
///
/// ## Encoding
/// ```text
/// {
///   "id": text,
///   "method": text,
///   "params": any (optional)
/// }
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Request<'a> {
    pub id: &'a str,
    pub method: &'a str,
    pub params: Params<'a>,
}

impl<'a> Request<'a> {
    /// Create a new request for a known [Method]
    pub fn new(id: &'a str, method: Method, params: Params<'a>) -> Self {
        Self {
            id,
            method: method.as_str(),
            params,
        }
    }

    /// Check whether this request is for the provided method
    pub fn is_method(&self, method: Method) -> bool {
        self.method == method.as_str()
    }

    /// Decode a request from a CBOR body, `params` are returned undecoded
    pub fn decode(buff: &'a [u8]) -> Result<Self, ProtoError> {
        let mut d = Decoder::new(buff);

        // Only definite length maps are accepted
        let n = d.map()?.ok_or(ProtoError::InvalidEncoding)?;

        let (mut id, mut method, mut params) = (None, None, Params::None);

        for _ in 0..n {
            match d.str()? {
                "id" => id = Some(d.str()?),
                "method" => method = Some(d.str()?),
                "params" => {
                    let start = d.position();
                    d.skip()?;
                    params = Params::Raw(&buff[start..d.position()]);
                }
                _ => d.skip()?,
            }
        }

        Ok(Self {
            id: id.ok_or(ProtoError::MissingField("id"))?,
            method: method.ok_or(ProtoError::MissingField("method"))?,
            params,
        })
    }

    /// Fetch byte string parameters
    pub fn params_bytes(&self) -> Result<&'a [u8], ProtoError> {
        match self.params {
            Params::Bytes(b) => Ok(b),
            Params::Raw(r) => Ok(Decoder::new(r).bytes()?),
            Params::None => Err(ProtoError::MissingField("params")),
            Params::Ota(_) => Err(ProtoError::InvalidEncoding),
        }
    }

    /// Fetch update session parameters
    pub fn ota_params(&self) -> Result<OtaParams, ProtoError> {
        match self.params {
            Params::Ota(p) => Ok(p),
            Params::Raw(r) => OtaParams::decode(r),
            Params::None => Err(ProtoError::MissingField("params")),
            Params::Bytes(_) => Err(ProtoError::InvalidEncoding),
        }
    }

    /// Encode a request to a CBOR body, returning the encoded length
    pub fn encode(&self, buff: &mut [u8]) -> Result<usize, ProtoError> {
        let mut e = Encoder::new(Cursor::new(buff));

        let fields = match self.params {
            Params::None => 2,
            _ => 3,
        };

        e.map(fields)?
            .str("id")?
            .str(self.id)?
            .str("method")?
            .str(self.method)?;

        match self.params {
            Params::None => (),
            Params::Raw(r) => {
                e.str("params")?;
                e.writer_mut()
                    .write_all(r)
                    .map_err(|_| ProtoError::BufferFull)?;
            }
            Params::Bytes(b) => {
                e.str("params")?.bytes(b)?;
            }
            Params::Ota(p) => {
                e.str("params")?;
                p.encode_with(&mut e)?;
            }
        }

        Ok(e.into_writer().position())
    }

    /// Encode a raw frame (source tag followed by the CBOR body)
    pub fn encode_frame(&self, source: Source, buff: &mut [u8]) -> Result<usize, ProtoError> {
        if buff.is_empty() {
            return Err(ProtoError::BufferFull);
        }

        buff[0] = source.into();
        let n = self.encode(&mut buff[1..])?;

        Ok(1 + n)
    }
}

/// Reply payload
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum ReplyBody<'a> {
    /// Boolean result (`ok` replies)
    Result(bool),
    /// Error object
    Error {
        code: ErrorCode,
        message: &'a str,
        data: Option<&'a [u8]>,
    },
}

/// RPC reply envelope
///
/// ## Encoding
/// ```text
/// { "id": text, "result": bool }
/// { "id": text, "error": { "code": int, "message": text, "data": bytes (optional) } }
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Reply<'a> {
    pub id: &'a str,
    pub body: ReplyBody<'a>,
}

impl<'a> Reply<'a> {
    /// Create an `ok` reply for the provided request id
    pub fn ok(id: &'a str) -> Self {
        Self {
            id,
            body: ReplyBody::Result(true),
        }
    }

    /// Create an error reply for the provided request id
    pub fn error(id: &'a str, code: ErrorCode, message: &'a str, data: Option<&'a [u8]>) -> Self {
        Self {
            id,
            body: ReplyBody::Error {
                code,
                message,
                data,
            },
        }
    }

    /// Check whether this is a successful (`result: true`) reply
    pub fn is_ok(&self) -> bool {
        self.body == ReplyBody::Result(true)
    }

    /// Encode a reply to CBOR, returning the encoded length
    pub fn encode(&self, buff: &mut [u8]) -> Result<usize, ProtoError> {
        let mut e = Encoder::new(Cursor::new(buff));

        e.map(2)?.str("id")?.str(self.id)?;

        match self.body {
            ReplyBody::Result(v) => {
                e.str("result")?.bool(v)?;
            }
            ReplyBody::Error {
                code,
                message,
                data,
            } => {
                let fields = if data.is_some() { 3 } else { 2 };

                e.str("error")?
                    .map(fields)?
                    .str("code")?
                    .i32(code.into())?
                    .str("message")?
                    .str(message)?;

                if let Some(d) = data {
                    e.str("data")?.bytes(d)?;
                }
            }
        }

        Ok(e.into_writer().position())
    }

    /// Decode a reply from CBOR
    pub fn decode(buff: &'a [u8]) -> Result<Self, ProtoError> {
        let mut d = Decoder::new(buff);

        let n = d.map()?.ok_or(ProtoError::InvalidEncoding)?;

        let (mut id, mut body) = (None, None);

        for _ in 0..n {
            match d.str()? {
                "id" => id = Some(d.str()?),
                "result" => body = Some(ReplyBody::Result(d.bool()?)),
                "error" => body = Some(decode_error(&mut d)?),
                _ => d.skip()?,
            }
        }

        Ok(Self {
            id: id.ok_or(ProtoError::MissingField("id"))?,
            body: body.ok_or(ProtoError::MissingField("result"))?,
        })
    }
}

fn decode_error<'a>(d: &mut Decoder<'a>) -> Result<ReplyBody<'a>, ProtoError> {
    let n = d.map()?.ok_or(ProtoError::InvalidEncoding)?;

    let (mut code, mut message, mut data) = (None, "", None);

    for _ in 0..n {
        match d.str()? {
            "code" => {
                let c = d.i32()?;
                code = Some(ErrorCode::try_from(c).map_err(|_| ProtoError::UnknownCode(c))?);
            }
            "message" => message = d.str()?,
            "data" => data = Some(d.bytes()?),
            _ => d.skip()?,
        }
    }

    Ok(ReplyBody::Error {
        code: code.ok_or(ProtoError::MissingField("code"))?,
        message,
        data,
    })
}
