// Copyright (c) 2022-2023 The MobileCoin Foundation

//! The [Ota] engine runs firmware update sessions.
//!
//! Each session is started by an `ota` request and then runs to completion,
//! receiving `ota_data` chunks via the [Channel], inflating and validating
//! the image, and writing it to the next update partition via the [Driver].
//! Failures at any stage are returned up to a single handler in
//! [Ota::process] that decides on cleanup, see [ota_proto] for protocol
//! messages and the [OtaError] status taxonomy.

use alloc::{boxed::Box, vec};

use miniz_oxide::inflate::TINFLStatus;
use strum::{Display, EnumIter, EnumString};

use ota_proto::{
    split_frame, ErrorCode, Method, OtaError, OtaStatus, Reply, Request, Source,
};

mod driver;
pub use driver::{Channel, Driver, Ui};

mod confirm;
pub use confirm::{Confirm, Interactive, Unattended};

mod error;
pub use error::RecvError;

mod session;
pub use session::UpdateSession;

mod receiver;
pub use receiver::{receive_chunk, Chunk};

mod inflate;
pub use inflate::Inflate;

mod validate;
pub use validate::validate;

mod writer;
pub use writer::{flush, PartitionTarget};

/// Engine configuration constants
pub mod consts {
    use ota_proto::{image::HEADER_LEN, MAX_FRAME_SIZE};
    use static_assertions::const_assert;

    /// Output buffer / decompressor window size
    pub const OUTPUT_BUF_SIZE: usize = 32768;

    // Wrapping output buffers must be a power of two covering the zlib window
    const_assert!(OUTPUT_BUF_SIZE.is_power_of_two());
    const_assert!(OUTPUT_BUF_SIZE >= 32768);
    const_assert!(OUTPUT_BUF_SIZE >= HEADER_LEN);

    /// Inbound frame buffer size
    pub const FRAME_BUF_SIZE: usize = MAX_FRAME_SIZE;

    /// Outbound reply buffer size
    pub const REPLY_BUF_SIZE: usize = 256;

    pub const PREPARE_DELAY_MS: u32 = 200;
    pub const PROGRESS_DELAY_MS: u32 = 50;
    pub const SUCCESS_DELAY_MS: u32 = 2500;

    pub const PREPARE_MSG: &str = "Preparing for firmware update";
    pub const PROGRESS_TITLE: &str = "Firmware Upgrade";
    pub const PROGRESS_LABEL: &str = "Upload Progress:";
    pub const SUCCESS_MSG: &str = "Upgrade successful!";
}

use consts::*;

/// Update session phase, for logging
#[derive(Copy, Clone, PartialEq, Debug, EnumString, Display, EnumIter)]
pub enum Phase {
    /// Parameters rejected, session never started
    Setup,
    /// Receiving and writing chunks
    Upload,
    /// Finalizing and collecting `ota_complete`
    Complete,
}

/// [Ota] runs firmware update sessions using the provided platform [Driver],
/// [Channel] and [Ui], with confirmation via the configured [Confirm] policy
pub struct Ota<DRV: Driver, CH: Channel, UI: Ui, CNF: Confirm> {
    drv: DRV,
    ch: CH,
    ui: UI,
    confirm: CNF,
}

impl<DRV: Driver, CH: Channel, UI: Ui, CNF: Confirm> Ota<DRV, CH, UI, CNF> {
    /// Create a new engine instance
    pub fn new(drv: DRV, ch: CH, ui: UI, confirm: CNF) -> Self {
        Self {
            drv,
            ch,
            ui,
            confirm,
        }
    }

    pub fn drv(&self) -> &DRV {
        &self.drv
    }

    pub fn drv_mut(&mut self) -> &mut DRV {
        &mut self.drv
    }

    pub fn ch(&mut self) -> &mut CH {
        &mut self.ch
    }

    pub fn ui(&self) -> &UI {
        &self.ui
    }

    /// Split the engine into its components
    pub fn into_inner(self) -> (DRV, CH, UI, CNF) {
        (self.drv, self.ch, self.ui, self.confirm)
    }

    /// Run an update session for an `ota` request received on `source`,
    /// returning the final session status.
    ///
    /// On success this restarts the device via [Driver::restart].
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn process(&mut self, source: Source, req: &Request) -> OtaStatus {
        #[cfg(feature = "log")]
        log::info!("Starting update (id: {}, source: {})", req.id, source);

        let params = match req.ota_params() {
            Ok(p) if p.is_valid() => p,
            _r => {
                #[cfg(feature = "log")]
                log::error!("Bad update parameters: {:?}", _r);

                self.reply(
                    source,
                    &Reply::error(req.id, ErrorCode::BadParameters, "Bad parameters", None),
                );

                let mut session = UpdateSession::idle(source);
                return self.conclude(Phase::Setup, &mut session, None, Err(OtaError::OtaSetup));
            }
        };

        self.reply(source, &Reply::ok(req.id));

        self.ui.message(PREPARE_MSG);
        self.ui.delay_ms(PREPARE_DELAY_MS);

        // Session scoped buffers, released on every exit path
        let mut session = UpdateSession::new(source, &params);
        let mut inflate = Inflate::new();
        let mut frame = vec![0u8; FRAME_BUF_SIZE].into_boxed_slice();
        let mut target = None;

        let (phase, status) = match self.upload(&mut session, &mut inflate, &mut frame, &mut target)
        {
            Ok(()) => {
                let s = self.finish(&mut session, &mut target);
                self.complete(source, &mut frame, &s);
                (Phase::Complete, s)
            }
            Err(e) => (Phase::Upload, Err(e)),
        };

        self.conclude(phase, &mut session, target, status)
    }

    /// Receive and process chunks until all compressed bytes are consumed
    fn upload(
        &mut self,
        session: &mut UpdateSession,
        inflate: &mut Inflate,
        frame: &mut Box<[u8]>,
        target: &mut Option<PartitionTarget<DRV>>,
    ) -> Result<(), OtaError> {
        while session.remaining_compressed > 0 {
            let chunk = match receive_chunk(&mut self.ch, session.source, frame) {
                Ok(c) => c,
                Err(e) => {
                    self.reject_frame(session.source, &e);
                    return Err(e.into());
                }
            };

            session.in_flight = Some(chunk.id.clone());

            #[cfg(feature = "log")]
            log::info!(
                "Received ota_data msg {}, payload size {}",
                chunk.id,
                chunk.data.len()
            );

            if chunk.data.len() > session.remaining_compressed {
                #[cfg(feature = "log")]
                log::error!(
                    "Received {} bytes when only {} needed",
                    chunk.data.len(),
                    session.remaining_compressed
                );
                return Err(OtaError::BadData);
            }

            self.inflate_chunk(session, inflate, target, chunk.data)?;

            if session.validated {
                self.ui
                    .progress(session.expected_compressed, session.compressed_received());
            }

            #[cfg(feature = "log")]
            {
                log::debug!(
                    "compressed:   total = {}, current = {}",
                    session.expected_compressed,
                    session.compressed_received()
                );
                log::debug!(
                    "uncompressed: total = {}, current = {}",
                    session.expected_uncompressed,
                    session.uncompressed_written()
                );
            }

            // Stream end must coincide with the end of compressed input
            let done = inflate.is_done();
            if inflate.is_failed()
                || (done && session.remaining_compressed > 0)
                || (!done && session.remaining_compressed == 0)
            {
                #[cfg(feature = "log")]
                log::error!("Data decompression error ({:?})", inflate.status());
                return Err(OtaError::Decompress);
            }

            self.reply(session.source, &Reply::ok(chunk.id.as_str()));
            session.in_flight = None;
        }

        Ok(())
    }

    /// Inflate a chunk, validating and flushing output as it becomes available
    fn inflate_chunk(
        &mut self,
        session: &mut UpdateSession,
        inflate: &mut Inflate,
        target: &mut Option<PartitionTarget<DRV>>,
        mut data: &[u8],
    ) -> Result<(), OtaError> {
        while inflate.is_pending()
            && (!data.is_empty() || inflate.status() == TINFLStatus::HasMoreOutput)
        {
            let more_input = session.remaining_compressed > data.len();

            let n = inflate.step(data, more_input);
            session.remaining_compressed -= n;
            data = &data[n..];

            if !((session.validated && inflate.is_done()) || inflate.is_full()) {
                continue;
            }

            if !session.validated {
                let t = validate(
                    &mut self.drv,
                    &mut self.ui,
                    &mut self.confirm,
                    inflate.output(),
                    session.expected_uncompressed,
                )?;

                *target = Some(t);
                session.validated = true;
                session.write_started = true;
            }

            let t = target.as_mut().ok_or(OtaError::Write)?;
            flush(&mut self.drv, t, session, inflate.output())?;
            inflate.drain();
        }

        Ok(())
    }

    /// Check accounting, finalize the partition write and switch boot partition
    fn finish(
        &mut self,
        session: &mut UpdateSession,
        target: &mut Option<PartitionTarget<DRV>>,
    ) -> OtaStatus {
        if session.remaining_uncompressed != 0 {
            #[cfg(feature = "log")]
            log::error!(
                "Expected uncompressed size: {}, got {}",
                session.expected_uncompressed,
                session.uncompressed_written()
            );
            return Err(OtaError::Decompress);
        }

        let t = target.as_mut().ok_or(OtaError::Finish)?;

        t.finalize(&mut self.drv)?;
        session.write_finalized = true;

        self.drv
            .set_boot_partition(t.partition())
            .map_err(|_e| {
                #[cfg(feature = "log")]
                log::error!("Failed to set boot partition: {:?}", _e);
                OtaError::SetPartition
            })?;

        #[cfg(feature = "log")]
        log::info!("Update written to {:?}", t.partition());

        Ok(())
    }

    /// Await `ota_complete` and reply with the session status
    fn complete(&mut self, source: Source, frame: &mut [u8], status: &OtaStatus) {
        let n = match self.ch.recv(frame) {
            Ok(n) => n,
            Err(_e) => {
                #[cfg(feature = "log")]
                log::error!("Failed to receive ota_complete: {:?}", _e);
                return;
            }
        };

        let req = split_frame(&frame[..n])
            .ok()
            .and_then(|(_, body)| Request::decode(body).ok());

        let reply = match (&req, status) {
            (Some(r), Ok(())) if r.is_method(Method::OtaComplete) => Reply::ok(r.id),
            (Some(r), Err(e)) if r.is_method(Method::OtaComplete) => Reply::error(
                r.id,
                ErrorCode::InternalError,
                "Error completing OTA",
                Some(e.as_str().as_bytes()),
            ),
            (r, _) => Reply::error(
                r.as_ref().map(|r| r.id).unwrap_or(""),
                ErrorCode::ProtocolError,
                "Unexpected message, expecting 'ota_complete'",
                None,
            ),
        };

        self.reply(source, &reply);
    }

    /// Single exit handler, performs cleanup based on the session outcome
    fn conclude(
        &mut self,
        _phase: Phase,
        session: &mut UpdateSession,
        target: Option<PartitionTarget<DRV>>,
        status: OtaStatus,
    ) -> OtaStatus {
        let e = match status {
            Ok(()) => {
                #[cfg(feature = "log")]
                log::warn!("OTA successful - rebooting");

                self.ui.message(SUCCESS_MSG);
                self.ui.delay_ms(SUCCESS_DELAY_MS);
                self.drv.restart();

                return Ok(());
            }
            Err(e) => e,
        };

        #[cfg(feature = "log")]
        log::warn!("OTA error {} during {}", e, _phase);

        // Discard the partition write only if started and not finalized
        if session.needs_abort() {
            if let Some(mut t) = target {
                t.abort(&mut self.drv);
            }
        }

        // Chunk mid-flight gets an error in place of its acknowledgement
        if let Some(id) = session.in_flight.take() {
            self.reply(
                session.source,
                &Reply::error(
                    id.as_str(),
                    ErrorCode::InternalError,
                    "Error uploading OTA data",
                    Some(e.as_str().as_bytes()),
                ),
            );
        }

        if e.shows_error_screen() {
            self.ui.await_error(e.as_str());
        }

        Err(e)
    }

    /// Reply to a frame rejected by the chunk receiver
    fn reject_frame(&mut self, source: Source, e: &RecvError) {
        let reply = match e {
            RecvError::Channel => return,
            RecvError::Malformed => {
                Reply::error("", ErrorCode::ProtocolError, "Invalid ota_data message", None)
            }
            RecvError::UnexpectedMethod(id) => Reply::error(
                id.as_str(),
                ErrorCode::ProtocolError,
                "Unexpected message, expecting 'ota_data'",
                None,
            ),
            RecvError::BadData(id) => Reply::error(
                id.as_str(),
                ErrorCode::BadParameters,
                "Invalid ota_data",
                Some(OtaError::BadData.as_str().as_bytes()),
            ),
        };

        self.reply(source, &reply);
    }

    /// Encode and send a reply
    fn reply(&mut self, source: Source, r: &Reply) {
        let mut buff = [0u8; REPLY_BUF_SIZE];

        let n = match r.encode(&mut buff) {
            Ok(n) => n,
            Err(_e) => {
                #[cfg(feature = "log")]
                log::error!("Failed to encode reply {:?}: {:?}", r, _e);
                return;
            }
        };

        if let Err(_e) = self.ch.send(source, &buff[..n]) {
            #[cfg(feature = "log")]
            log::error!("Failed to send reply: {:?}", _e);
        }
    }
}
