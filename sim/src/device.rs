// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Simulated device dispatching requests to the update engine

use log::{debug, info, warn};

use ota_core::engine::{consts::FRAME_BUF_SIZE, Channel, Confirm, Ota};
use ota_proto::{
    split_frame, status_str, ErrorCode, Method, OtaStatus, Reply, Request, Source,
};

use crate::{SimDriver, SimUi};

/// Boxed confirmation policy, selected at startup
pub type SimConfirm = Box<dyn Confirm + Send>;

/// Simulated device serving requests from a [Channel]
pub struct Device<CH: Channel> {
    ota: Ota<SimDriver, CH, SimUi, SimConfirm>,
    sessions: Vec<OtaStatus>,
}

impl<CH: Channel> Device<CH> {
    pub fn new(drv: SimDriver, ch: CH, ui: SimUi, confirm: SimConfirm) -> Self {
        Self {
            ota: Ota::new(drv, ch, ui, confirm),
            sessions: vec![],
        }
    }

    pub fn drv(&self) -> &SimDriver {
        self.ota.drv()
    }

    pub fn ui(&self) -> &SimUi {
        self.ota.ui()
    }

    /// Results of update sessions served so far
    pub fn sessions(&self) -> &[OtaStatus] {
        &self.sessions
    }

    /// Split the device into driver, channel, UI and confirmation policy
    pub fn into_parts(self) -> (SimDriver, CH, SimUi, SimConfirm) {
        self.ota.into_inner()
    }

    /// Serve requests until the channel fails or closes
    pub fn serve(&mut self) {
        let mut frame = vec![0u8; FRAME_BUF_SIZE];

        loop {
            let n = match self.ota.ch().recv(&mut frame) {
                Ok(n) => n,
                Err(e) => {
                    debug!("Channel closed: {:?}", e);
                    return;
                }
            };

            self.handle(&frame[..n]);
        }
    }

    /// Handle a single request frame outside an update session
    pub fn handle(&mut self, frame: &[u8]) {
        let (tag, body) = match split_frame(frame) {
            Ok(v) => v,
            Err(e) => {
                warn!("Invalid frame: {}", e);
                self.reply(
                    Source::Serial,
                    &Reply::error("", ErrorCode::InvalidRequest, "Invalid request", None),
                );
                return;
            }
        };

        let source = match Source::try_from(tag) {
            Ok(s) => s,
            Err(_) => {
                warn!("Unknown message source 0x{:02x}", tag);
                let id = Request::decode(body).map(|r| r.id).unwrap_or("");
                self.reply(
                    Source::Serial,
                    &Reply::error(id, ErrorCode::InvalidRequest, "Invalid request", None),
                );
                return;
            }
        };

        let req = match Request::decode(body) {
            Ok(r) => r,
            Err(e) => {
                warn!("Invalid request: {}", e);
                self.reply(
                    source,
                    &Reply::error("", ErrorCode::InvalidRequest, "Invalid request", None),
                );
                return;
            }
        };

        if !req.is_method(Method::Ota) {
            warn!("Unknown method '{}' (id: {})", req.method, req.id);
            self.reply(
                source,
                &Reply::error(req.id, ErrorCode::UnknownMethod, "Unknown method", None),
            );
            return;
        }

        let status = self.ota.process(source, &req);
        info!("Update session finished: {}", status_str(&status));
        self.sessions.push(status);

        if self.ota.drv().restarted() {
            self.ota.drv_mut().reboot();
        }
    }

    fn reply(&mut self, source: Source, r: &Reply) {
        let mut buff = [0u8; 256];

        let n = match r.encode(&mut buff) {
            Ok(n) => n,
            Err(e) => {
                warn!("Failed to encode reply: {}", e);
                return;
            }
        };

        if let Err(e) = self.ota.ch().send(source, &buff[..n]) {
            warn!("Failed to send reply: {:?}", e);
        }
    }
}
