// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Chunk receiver, blocks for the next `ota_data` frame and checks its
//! method, source tag and payload bounds

use ota_proto::{split_frame, Method, MsgId, Request, Source, MAXLEN_ID, MAX_CHUNK_SIZE};

use super::{Channel, RecvError};

/// Compressed firmware chunk, borrowed from the frame buffer
#[derive(Clone, PartialEq, Debug)]
pub struct Chunk<'a> {
    /// Request correlation id
    pub id: MsgId,
    /// Source the frame arrived on
    pub source: Source,
    /// Compressed payload
    pub data: &'a [u8],
}

/// Receive the next chunk for a session started on `expected` source
pub fn receive_chunk<'a, CH: Channel>(
    ch: &mut CH,
    expected: Source,
    buff: &'a mut [u8],
) -> Result<Chunk<'a>, RecvError> {
    let n = match ch.recv(buff) {
        Ok(n) => n,
        Err(_e) => {
            #[cfg(feature = "log")]
            log::error!("Channel receive failed: {:?}", _e);
            return Err(RecvError::Channel);
        }
    };

    let frame: &'a [u8] = &buff[..n];

    let (tag, body) = split_frame(frame).map_err(|_| RecvError::Malformed)?;
    let req = Request::decode(body).map_err(|_| RecvError::Malformed)?;
    let id = MsgId::truncated(req.id);

    if !req.is_method(Method::OtaData) {
        #[cfg(feature = "log")]
        log::error!("Unexpected method '{}' (id: {})", req.method, id);
        return Err(RecvError::UnexpectedMethod(id));
    }

    if req.id.len() > MAXLEN_ID {
        #[cfg(feature = "log")]
        log::error!("Message id too long (id: {}..)", id);
        return Err(RecvError::BadData(id));
    }

    match Source::try_from(tag) {
        Ok(s) if s == expected => (),
        _ => {
            #[cfg(feature = "log")]
            log::error!("Source mismatch {} (expected {})", tag, expected);
            return Err(RecvError::BadData(id));
        }
    }

    let data = match req.params_bytes() {
        Ok(d) if !d.is_empty() && d.len() <= MAX_CHUNK_SIZE => d,
        _ => return Err(RecvError::BadData(id)),
    };

    Ok(Chunk {
        id,
        source: expected,
        data,
    })
}
