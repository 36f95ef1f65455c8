// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Firmware update core
//!
//! This provides a hardware-independent [Ota][engine::Ota] engine that receives
//! a zlib-compressed firmware image as a sequence of bounded chunks, inflates
//! it incrementally, validates the embedded header exactly once, and writes
//! the image to the next non-running partition before switching the boot target.
//!
//! Platform support is provided via the [Driver][engine::Driver] (partitions,
//! anti-rollback counter), [Channel][engine::Channel] (raw frames) and
//! [Ui][engine::Ui] (screens, buttons, delays) traits, with user confirmation
//! supplied by an injected [Confirm][engine::Confirm] policy.
//! See [ota_proto] for message objects and wire encodings.
//!
//! ## Operations
//!
//! An update session is started by passing an `ota` [Request][ota_proto::Request]
//! to [Ota::process][engine::Ota::process], which then runs to completion:
//!
//! 1. `ota` parameters are checked (`fwsize > cmpsize`) and acknowledged
//! 2. `ota_data` chunks are received and inflated into a fixed 32 KiB output buffer
//! 3. Once the first buffer is full the firmware header is validated, the
//!    user is asked to confirm and the partition write is started
//! 4. Each full buffer (and the final partial buffer) is written to the partition
//! 5. Once all compressed bytes are consumed the write is finalized and the
//!    boot partition switched
//! 6. The host collects the session status via `ota_complete`
//!
//! On success the device reboots into the new image, on failure any started
//! partition write is discarded and an error screen shown.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod engine;
