// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protocol-level session tests using raw frames
//!
//! These bypass the client [DeviceHandle][ota_client::DeviceHandle] to
//! exercise device behaviour for requests a well-behaved host never sends.

use std::time::Duration;

use log::debug;

use ota_client::{image::compress, Exchange};
use ota_proto::{
    ErrorCode, Method, OtaError, OtaParams, Params, Reply, ReplyBody, Request, Source,
    MAX_CHUNK_SIZE, MAX_FRAME_SIZE,
};

use crate::vectors::Vector;

const TIMEOUT: Duration = Duration::from_secs(10);

/// Owned reply for inspection
#[derive(Clone, PartialEq, Debug)]
pub struct RawReply {
    pub id: String,
    pub error: Option<(ErrorCode, String, Option<String>)>,
}

impl RawReply {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Check this is an error reply with the provided code and message
    pub fn expect_error(&self, code: ErrorCode, message: &str) -> anyhow::Result<()> {
        match &self.error {
            Some((c, m, _)) if *c == code && m == message => Ok(()),
            _ => Err(anyhow::anyhow!(
                "Unexpected reply {:?} (expected {} '{}')",
                self,
                code,
                message
            )),
        }
    }

    /// Fetch the status string carried in error data
    pub fn status(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.2.as_deref())
    }
}

/// Send a raw request and decode the reply
pub async fn request<T: Exchange>(t: &T, req: Request<'_>) -> anyhow::Result<RawReply> {
    let mut buff = vec![0u8; MAX_FRAME_SIZE];
    let n = req.encode_frame(Source::Serial, &mut buff)?;

    let resp = t.exchange(&buff[..n], TIMEOUT).await?;
    let r = Reply::decode(&resp)?;

    debug!("{} {} -> {:?}", req.method, req.id, r);

    let error = match r.body {
        ReplyBody::Result(_) => None,
        ReplyBody::Error {
            code,
            message,
            data,
        } => Some((
            code,
            message.to_string(),
            data.map(|d| String::from_utf8_lossy(d).to_string()),
        )),
    };

    Ok(RawReply {
        id: r.id.to_string(),
        error,
    })
}

/// Start a session with invalid sizes, expecting rejection
pub async fn test_bad_parameters<T: Exchange>(t: &T) -> anyhow::Result<()> {
    // Compressed size must be below the image size
    let r = request(
        t,
        Request::new("0", Method::Ota, Params::Ota(OtaParams::new(4096, 4096))),
    )
    .await?;

    r.expect_error(ErrorCode::BadParameters, "Bad parameters")
}

/// Send `ota_complete` before any data, expecting a protocol error
pub async fn test_premature_complete<T: Exchange>(t: &T, v: &Vector) -> anyhow::Result<()> {
    let image = v.image();
    let compressed = compress(&image, 9)?;

    let params = OtaParams::new(image.len() as u32, compressed.len() as u32);
    let r = request(t, Request::new("0", Method::Ota, Params::Ota(params))).await?;
    anyhow::ensure!(r.is_ok(), "Session start failed: {:?}", r);

    let r = request(t, Request::new("c", Method::OtaComplete, Params::None)).await?;

    r.expect_error(
        ErrorCode::ProtocolError,
        "Unexpected message, expecting 'ota_data'",
    )?;
    anyhow::ensure!(r.id == "c", "Unexpected reply id '{}'", r.id);

    Ok(())
}

/// Upload an image with an unterminated version, expecting `ERROR_INVALIDFW`
/// once the device inspects the header
pub async fn test_invalid_firmware<T: Exchange>(t: &T, v: &Vector) -> anyhow::Result<()> {
    let image = v.corrupt_image();
    let compressed = compress(&image, 9)?;

    let params = OtaParams::new(image.len() as u32, compressed.len() as u32);
    let r = request(t, Request::new("0", Method::Ota, Params::Ota(params))).await?;
    anyhow::ensure!(r.is_ok(), "Session start failed: {:?}", r);

    for (i, c) in compressed.chunks(MAX_CHUNK_SIZE).enumerate() {
        let id = format!("{}", i + 1);
        let r = request(t, Request::new(&id, Method::OtaData, Params::Bytes(c))).await?;

        if r.is_ok() {
            continue;
        }

        r.expect_error(ErrorCode::InternalError, "Error uploading OTA data")?;
        anyhow::ensure!(r.id == id, "Unexpected reply id '{}'", r.id);
        anyhow::ensure!(
            r.status() == Some(OtaError::InvalidFw.as_str()),
            "Unexpected status {:?}",
            r.status()
        );

        return Ok(());
    }

    Err(anyhow::anyhow!("Corrupt image accepted"))
}

/// Send `ota_data` outside a session, expecting `UNKNOWN_METHOD`
pub async fn test_unknown_method<T: Exchange>(t: &T) -> anyhow::Result<()> {
    let r = request(
        t,
        Request::new("x", Method::OtaData, Params::Bytes(&[0u8; 16])),
    )
    .await?;

    r.expect_error(ErrorCode::UnknownMethod, "Unknown method")
}

/// Start a session from an unknown message source, expecting rejection
pub async fn test_unknown_source<T: Exchange>(t: &T) -> anyhow::Result<()> {
    let req = Request::new(
        "s",
        Method::Ota,
        Params::Ota(OtaParams::new(65536, 4096)),
    );

    let mut buff = vec![0u8; MAX_FRAME_SIZE];
    let n = req.encode_frame(Source::Serial, &mut buff)?;
    buff[0] = 0x7f;

    let resp = t.exchange(&buff[..n], TIMEOUT).await?;
    let r = Reply::decode(&resp)?;

    debug!("unknown source -> {:?}", r);

    anyhow::ensure!(r.id == "s", "Unexpected reply id '{}'", r.id);
    match r.body {
        ReplyBody::Error { code, message, .. }
            if code == ErrorCode::InvalidRequest && message == "Invalid request" =>
        {
            Ok(())
        }
        b => Err(anyhow::anyhow!("Unexpected reply {:?}", b)),
    }
}
