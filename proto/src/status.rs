// Copyright (c) 2022-2023 The MobileCoin Foundation

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Terminal update session failures
///
/// Each failure is detected locally and ends the session, there is no retry.
/// The string forms are reported to the host in completion / upload error
/// replies and shown on the device error screen.
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Debug,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    TryFromPrimitive,
    IntoPrimitive,
)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
#[repr(u8)]
pub enum OtaError {
    /// Session never properly started
    #[strum(serialize = "ERROR_OTA_SETUP")]
    OtaSetup = 1,

    /// Partition write could not be started
    #[strum(serialize = "ERROR_OTA_INIT")]
    OtaInit = 2,

    /// No valid target partition, or running partition unreadable
    #[strum(serialize = "ERROR_BADPARTITION")]
    BadPartition = 3,

    /// Compressed stream or size inconsistency
    #[strum(serialize = "ERROR_DECOMPRESS")]
    Decompress = 4,

    /// Partition write failed
    #[strum(serialize = "ERROR_WRITE")]
    Write = 5,

    /// Partition finalize failed
    #[strum(serialize = "ERROR_FINISH")]
    Finish = 6,

    /// Boot partition switch failed
    #[strum(serialize = "ERROR_SETPARTITION")]
    SetPartition = 7,

    /// Malformed, oversized or misrouted chunk
    #[strum(serialize = "ERROR_BADDATA")]
    BadData = 8,

    /// Anti-rollback violation
    #[strum(serialize = "ERROR_NODOWNGRADE")]
    NoDowngrade = 9,

    /// Unparseable firmware header
    #[strum(serialize = "ERROR_INVALIDFW")]
    InvalidFw = 10,

    /// Update declined on the device
    #[strum(serialize = "ERROR_USER_DECLINED")]
    UserDeclined = 11,
}

impl OtaError {
    /// Fetch the status string for an error
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Whether the device error screen is shown for this failure
    pub fn shows_error_screen(&self) -> bool {
        !matches!(self, OtaError::OtaSetup | OtaError::UserDeclined)
    }
}

/// Overall update session status
pub type OtaStatus = Result<(), OtaError>;

/// Status string for a session outcome
pub const fn status_str(status: &OtaStatus) -> &'static str {
    match status {
        Ok(_) => "OK",
        Err(OtaError::OtaSetup) => "ERROR_OTA_SETUP",
        Err(OtaError::OtaInit) => "ERROR_OTA_INIT",
        Err(OtaError::BadPartition) => "ERROR_BADPARTITION",
        Err(OtaError::Decompress) => "ERROR_DECOMPRESS",
        Err(OtaError::Write) => "ERROR_WRITE",
        Err(OtaError::Finish) => "ERROR_FINISH",
        Err(OtaError::SetPartition) => "ERROR_SETPARTITION",
        Err(OtaError::BadData) => "ERROR_BADDATA",
        Err(OtaError::NoDowngrade) => "ERROR_NODOWNGRADE",
        Err(OtaError::InvalidFw) => "ERROR_INVALIDFW",
        Err(OtaError::UserDeclined) => "ERROR_USER_DECLINED",
    }
}
