// Copyright (c) 2022-2023 The MobileCoin Foundation

use ota_proto::OtaError;

use super::{Driver, UpdateSession};

/// Selected update partition and its open write handle
///
/// The handle is consumed on finalize or abort, so a partition write is
/// closed at most once.
pub struct PartitionTarget<DRV: Driver> {
    partition: DRV::Partition,
    handle: Option<DRV::Handle>,
}

impl<DRV: Driver> PartitionTarget<DRV> {
    pub fn new(partition: DRV::Partition, handle: DRV::Handle) -> Self {
        Self {
            partition,
            handle: Some(handle),
        }
    }

    pub fn partition(&self) -> DRV::Partition {
        self.partition
    }

    /// Whether the write handle is still open
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Append data to the partition
    pub fn write(&mut self, drv: &mut DRV, data: &[u8]) -> Result<(), OtaError> {
        let h = self.handle.as_mut().ok_or(OtaError::Write)?;

        drv.write(h, data).map_err(|_e| {
            #[cfg(feature = "log")]
            log::error!("Partition write failed: {:?}", _e);
            OtaError::Write
        })
    }

    /// Finalize the partition write
    pub fn finalize(&mut self, drv: &mut DRV) -> Result<(), OtaError> {
        let h = self.handle.take().ok_or(OtaError::Finish)?;

        drv.end(h).map_err(|_e| {
            #[cfg(feature = "log")]
            log::error!("Partition finalize failed: {:?}", _e);
            OtaError::Finish
        })
    }

    /// Discard the partition write if still open
    pub fn abort(&mut self, drv: &mut DRV) {
        if let Some(h) = self.handle.take() {
            drv.abort(h);
        }
    }
}

/// Write pending output to the partition and update the uncompressed budget
pub fn flush<DRV: Driver>(
    drv: &mut DRV,
    target: &mut PartitionTarget<DRV>,
    session: &mut UpdateSession,
    data: &[u8],
) -> Result<(), OtaError> {
    if data.len() > session.remaining_uncompressed {
        #[cfg(feature = "log")]
        log::error!(
            "Image exceeds expected size ({} bytes pending, {} remaining)",
            data.len(),
            session.remaining_uncompressed
        );
        return Err(OtaError::Decompress);
    }

    if !data.is_empty() {
        target.write(drv, data)?;
    }

    session.remaining_uncompressed -= data.len();

    Ok(())
}
