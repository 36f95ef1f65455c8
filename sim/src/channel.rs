// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Channels carrying frames to and from the engine

use std::{
    io::{self, ErrorKind, Read, Write},
    sync::mpsc,
};

use log::trace;
use tokio::sync::mpsc::UnboundedSender;

use ota_core::engine::Channel;
use ota_proto::{Source, MAX_FRAME_SIZE};

/// [Channel] over a byte stream using 4-byte big-endian length prefixes
pub struct StreamChannel<S: Read + Write> {
    s: S,
}

impl<S: Read + Write> StreamChannel<S> {
    pub fn new(s: S) -> Self {
        Self { s }
    }

    pub fn into_inner(self) -> S {
        self.s
    }
}

impl<S: Read + Write> Channel for StreamChannel<S> {
    type Error = io::Error;

    fn recv(&mut self, buff: &mut [u8]) -> Result<usize, io::Error> {
        let mut l = [0u8; 4];
        self.s.read_exact(&mut l)?;
        let n = u32::from_be_bytes(l) as usize;

        if n > buff.len() {
            // Skip the frame to keep the stream aligned
            io::copy(&mut (&mut self.s).take(n as u64), &mut io::sink())?;

            return Err(io::Error::new(
                ErrorKind::InvalidData,
                format!("frame length {} exceeds buffer", n),
            ));
        }

        self.s.read_exact(&mut buff[..n])?;

        trace!("rx {} bytes", n);

        Ok(n)
    }

    fn send(&mut self, source: Source, data: &[u8]) -> Result<(), io::Error> {
        trace!("tx {} bytes ({})", data.len(), source);

        self.s.write_all(&(data.len() as u32).to_be_bytes())?;
        self.s.write_all(data)?;
        self.s.flush()
    }
}

/// [Channel] over in-process queues, used by the loopback transport
pub struct QueueChannel {
    rx: mpsc::Receiver<Vec<u8>>,
    tx: UnboundedSender<Vec<u8>>,
}

impl QueueChannel {
    pub fn new(rx: mpsc::Receiver<Vec<u8>>, tx: UnboundedSender<Vec<u8>>) -> Self {
        Self { rx, tx }
    }
}

impl Channel for QueueChannel {
    type Error = io::Error;

    fn recv(&mut self, buff: &mut [u8]) -> Result<usize, io::Error> {
        let f = self
            .rx
            .recv()
            .map_err(|_| io::Error::from(ErrorKind::BrokenPipe))?;

        if f.len() > buff.len() || f.len() > MAX_FRAME_SIZE {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                format!("frame length {} exceeds buffer", f.len()),
            ));
        }

        buff[..f.len()].copy_from_slice(&f);

        Ok(f.len())
    }

    fn send(&mut self, _source: Source, data: &[u8]) -> Result<(), io::Error> {
        self.tx
            .send(data.to_vec())
            .map_err(|_| io::Error::from(ErrorKind::BrokenPipe))
    }
}
