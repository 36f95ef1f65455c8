// Copyright (c) 2022-2023 The MobileCoin Foundation

//! In-memory partition driver

use log::{debug, info, warn};
use serde::Serialize;
use strum::{Display, EnumString};

use ota_core::engine::Driver;
use ota_proto::{
    image::{AppDescriptor, HEADER_LEN, IMAGE_MAGIC},
    ProtoError,
};

/// Default simulated partition size
pub const DEFAULT_PARTITION_SIZE: usize = 2 * 1024 * 1024;

/// Application partition slots
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
pub enum Slot {
    Ota0,
    Ota1,
}

impl Slot {
    /// Fetch the alternate slot
    pub fn other(self) -> Self {
        match self {
            Slot::Ota0 => Slot::Ota1,
            Slot::Ota1 => Slot::Ota0,
        }
    }

    fn index(self) -> usize {
        match self {
            Slot::Ota0 => 0,
            Slot::Ota1 => 1,
        }
    }
}

/// Simulated platform errors
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
pub enum SimError {
    /// Partition holds no valid application descriptor
    NoDescriptor,
    /// Image exceeds the partition size
    PartitionFull,
    /// Written length differs from the announced image size
    Truncated,
    /// Written image failed verification
    InvalidImage,
    /// Boot partition holds no image
    Empty,
}

/// Open partition write
#[derive(Debug)]
pub struct SimHandle {
    slot: Slot,
    image_size: usize,
}

/// Snapshot of simulated device state
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct SimState {
    pub running: Slot,
    pub boot: Slot,
    pub burned: u32,
    pub versions: [Option<String>; 2],
}

/// Partition driver holding `ota_0` / `ota_1` in memory
#[derive(Clone, Debug)]
pub struct SimDriver {
    partitions: [Vec<u8>; 2],
    partition_size: usize,
    running: Slot,
    boot: Slot,
    burned: u32,
    restarted: bool,
}

impl SimDriver {
    /// Create a driver running `image` from `ota_0`
    pub fn new(image: Vec<u8>, burned: u32) -> Self {
        Self {
            partitions: [image, vec![]],
            partition_size: DEFAULT_PARTITION_SIZE,
            running: Slot::Ota0,
            boot: Slot::Ota0,
            burned,
            restarted: false,
        }
    }

    /// Set the partition size
    pub fn with_partition_size(mut self, partition_size: usize) -> Self {
        self.partition_size = partition_size;
        self
    }

    pub fn running(&self) -> Slot {
        self.running
    }

    pub fn boot(&self) -> Slot {
        self.boot
    }

    pub fn burned(&self) -> u32 {
        self.burned
    }

    /// Fetch the contents of a partition
    pub fn partition(&self, slot: Slot) -> &[u8] {
        &self.partitions[slot.index()]
    }

    /// Check whether a restart was requested since the last boot
    pub fn restarted(&self) -> bool {
        self.restarted
    }

    /// Fetch the descriptor of the running firmware
    pub fn running_descriptor(&self) -> Option<AppDescriptor> {
        AppDescriptor::from_image(self.partition(self.running)).ok()
    }

    /// Boot from the selected boot partition, burning the anti-rollback
    /// counter up to the booted image's secure version
    pub fn reboot(&mut self) {
        self.restarted = false;
        self.running = self.boot;

        if let Some(d) = self.running_descriptor() {
            if d.secure_version > self.burned {
                info!(
                    "Burning anti-rollback counter {} -> {}",
                    self.burned, d.secure_version
                );
                self.burned = d.secure_version;
            }

            info!("Booted {} from {}", d.version, self.running);
        }
    }

    /// Snapshot device state
    pub fn state(&self) -> SimState {
        let version = |s: Slot| {
            AppDescriptor::from_image(self.partition(s))
                .ok()
                .map(|d| d.version.to_string())
        };

        SimState {
            running: self.running,
            boot: self.boot,
            burned: self.burned,
            versions: [version(Slot::Ota0), version(Slot::Ota1)],
        }
    }
}

impl Driver for SimDriver {
    type Partition = Slot;
    type Handle = SimHandle;
    type Error = SimError;

    fn running_partition(&self) -> Slot {
        self.running
    }

    fn partition_description(&self, p: Slot) -> Result<AppDescriptor, SimError> {
        AppDescriptor::from_image(self.partition(p)).map_err(|_| SimError::NoDescriptor)
    }

    fn next_update_partition(&self) -> Option<Slot> {
        Some(self.running.other())
    }

    fn secure_version(&self) -> u32 {
        self.burned
    }

    fn begin(&mut self, p: Slot, image_size: usize) -> Result<SimHandle, SimError> {
        if image_size > self.partition_size {
            return Err(SimError::PartitionFull);
        }

        debug!("Erasing {} for {} byte image", p, image_size);

        let part = &mut self.partitions[p.index()];
        part.clear();
        part.reserve(image_size);

        Ok(SimHandle {
            slot: p,
            image_size,
        })
    }

    fn write(&mut self, h: &mut SimHandle, data: &[u8]) -> Result<(), SimError> {
        let part = &mut self.partitions[h.slot.index()];

        if part.len() + data.len() > self.partition_size {
            return Err(SimError::PartitionFull);
        }

        part.extend_from_slice(data);

        Ok(())
    }

    fn end(&mut self, h: SimHandle) -> Result<(), SimError> {
        let part = &mut self.partitions[h.slot.index()];

        let r = if part.len() != h.image_size {
            Err(SimError::Truncated)
        } else if part.first() != Some(&IMAGE_MAGIC) || check_image(part).is_err() {
            Err(SimError::InvalidImage)
        } else {
            Ok(())
        };

        if let Err(e) = r {
            warn!("Image verification failed for {}: {}", h.slot, e);
            part.clear();
        }

        r
    }

    fn abort(&mut self, h: SimHandle) {
        debug!("Discarding partial write to {}", h.slot);
        self.partitions[h.slot.index()].clear();
    }

    fn set_boot_partition(&mut self, p: Slot) -> Result<(), SimError> {
        if self.partition(p).is_empty() {
            return Err(SimError::Empty);
        }

        self.boot = p;
        Ok(())
    }

    fn restart(&mut self) {
        self.restarted = true;
    }
}

fn check_image(image: &[u8]) -> Result<(), ProtoError> {
    AppDescriptor::from_image(image).map(|_| ())
}

/// Build a minimal installable image carrying only headers
pub fn stub_image(version: &str, secure_version: u32) -> Result<Vec<u8>, ProtoError> {
    let mut d = AppDescriptor {
        secure_version,
        ..Default::default()
    };
    d.version
        .push_str(version)
        .map_err(|_| ProtoError::TextTooLong)?;
    d.project_name
        .push_str("ota-sim")
        .map_err(|_| ProtoError::TextTooLong)?;

    let mut b = vec![0u8; HEADER_LEN];
    d.encode_image_header(&mut b)?;

    Ok(b)
}
