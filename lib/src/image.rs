// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Host-side firmware image helpers

use std::io::Write;

use flate2::{write::ZlibEncoder, Compression};
use serde::Serialize;

use ota_proto::image::AppDescriptor;

use crate::Error;

/// Default zlib compression level
pub const DEFAULT_LEVEL: u32 = 9;

/// Firmware image summary, parsed from the application descriptor
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct ImageInfo {
    /// Uncompressed image size in bytes
    pub size: usize,
    pub version: String,
    pub secure_version: u32,
    pub project_name: String,
    pub date: String,
    pub time: String,
    pub idf_ver: String,
    /// Hex encoded ELF digest
    pub app_elf_sha256: String,
}

impl From<(usize, &AppDescriptor)> for ImageInfo {
    fn from((size, d): (usize, &AppDescriptor)) -> Self {
        Self {
            size,
            version: d.version.to_string(),
            secure_version: d.secure_version,
            project_name: d.project_name.to_string(),
            date: d.date.to_string(),
            time: d.time.to_string(),
            idf_ver: d.idf_ver.to_string(),
            app_elf_sha256: hex::encode(d.app_elf_sha256),
        }
    }
}

/// Parse the application descriptor of an uncompressed firmware image
pub fn inspect(image: &[u8]) -> Result<ImageInfo, Error> {
    let d = AppDescriptor::from_image(image).map_err(Error::InvalidImage)?;

    Ok(ImageInfo::from((image.len(), &d)))
}

/// Compress a firmware image using zlib at the provided level (0..=9)
pub fn compress(image: &[u8], level: u32) -> Result<Vec<u8>, Error> {
    let mut e = ZlibEncoder::new(Vec::with_capacity(image.len() / 2), Compression::new(level));

    e.write_all(image)?;

    Ok(e.finish()?)
}
