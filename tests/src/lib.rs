// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Tests for firmware update capable devices.
//!
//! Generic over [ota_client::Exchange] for reuse with the simulator
//! (in-process or via TCP) and real devices.
//!

pub mod vectors;

pub mod update;

pub mod session;
