// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Firmware validation and partition selection, run once per session when
//! the first output buffer is available

use ota_proto::{image::AppDescriptor, OtaError};

use super::{
    consts::{PROGRESS_DELAY_MS, PROGRESS_LABEL, PROGRESS_TITLE},
    Confirm, Driver, PartitionTarget, Ui,
};

/// Validate the firmware header in `output`, confirm the update and start
/// the partition write
pub fn validate<DRV: Driver, CNF: Confirm + ?Sized>(
    drv: &mut DRV,
    ui: &mut dyn Ui,
    confirm: &mut CNF,
    output: &[u8],
    image_size: usize,
) -> Result<PartitionTarget<DRV>, OtaError> {
    let new = AppDescriptor::from_header(output).map_err(|_e| {
        #[cfg(feature = "log")]
        log::error!("Invalid firmware header: {:?}", _e);
        OtaError::InvalidFw
    })?;

    #[cfg(feature = "log")]
    log::info!(
        "New firmware version: {} (secure version {})",
        new.version,
        new.secure_version
    );

    let burned = drv.secure_version();
    if new.secure_version < burned {
        #[cfg(feature = "log")]
        log::error!(
            "Secure version {} below anti-rollback counter {}",
            new.secure_version,
            burned
        );
        return Err(OtaError::NoDowngrade);
    }

    let running = drv.running_partition();
    let current = drv.partition_description(running).map_err(|_e| {
        #[cfg(feature = "log")]
        log::error!("Failed to read running partition {:?}: {:?}", running, _e);
        OtaError::BadPartition
    })?;

    #[cfg(feature = "log")]
    log::info!("Running firmware version: {}", current.version);

    let next = match drv.next_update_partition() {
        Some(p) if p != running => p,
        _p => {
            #[cfg(feature = "log")]
            log::error!("No update partition available (next: {:?})", _p);
            return Err(OtaError::BadPartition);
        }
    };

    if !confirm.confirm(ui, &current.version, &new.version) {
        #[cfg(feature = "log")]
        log::warn!("User declined firmware version {}", new.version);
        return Err(OtaError::UserDeclined);
    }

    ui.progress_start(PROGRESS_TITLE, PROGRESS_LABEL);
    ui.delay_ms(PROGRESS_DELAY_MS);

    let handle = drv.begin(next, image_size).map_err(|_e| {
        #[cfg(feature = "log")]
        log::error!("Failed to start write to {:?}: {:?}", next, _e);
        OtaError::OtaInit
    })?;

    Ok(PartitionTarget::new(next, handle))
}
