// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Firmware image header layout
//!
//! An uncompressed firmware image starts with a 24-byte image header and an
//! 8-byte header for the first segment, followed by the application
//! descriptor inspected prior to installation.
//!
//! ## Application descriptor encoding (little-endian):
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     MAGIC_WORD (0xABCD5432)                   |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        SECURE_VERSION                         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     RESERVED (8-byte)                         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! /                   VERSION (32-byte, NUL padded)               /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! /                PROJECT_NAME (32-byte, NUL padded)             /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! /                    TIME (16-byte, NUL padded)                 /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! /                    DATE (16-byte, NUL padded)                 /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! /                  IDF_VER (32-byte, NUL padded)                /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! /                   APP_ELF_SHA256 (32-byte)                    /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! /                      RESERVED (80-byte)                       /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use byteorder::{ByteOrder, LittleEndian};
use heapless::String;
use static_assertions::const_assert_eq;

use crate::ProtoError;

/// First byte of every firmware image
pub const IMAGE_MAGIC: u8 = 0xE9;

/// Image header length
pub const IMAGE_HEADER_LEN: usize = 24;

/// First segment header length
pub const SEGMENT_HEADER_LEN: usize = 8;

/// Offset of the application descriptor in an uncompressed image
pub const APP_DESC_OFFSET: usize = IMAGE_HEADER_LEN + SEGMENT_HEADER_LEN;

/// Application descriptor length
pub const APP_DESC_LEN: usize = 256;

/// Minimum number of uncompressed bytes required to parse a descriptor
pub const HEADER_LEN: usize = APP_DESC_OFFSET + APP_DESC_LEN;

/// Application descriptor magic word
pub const APP_DESC_MAGIC: u32 = 0xABCD_5432;

/// Maximum length of the firmware version string
pub const VERSION_STRING_MAX_LENGTH: usize = 32;

// Field offsets within the descriptor
pub const MAGIC: usize = 0;
pub const SECURE_VERSION: usize = 4;
pub const VERSION: usize = 16;
pub const PROJECT_NAME: usize = VERSION + 32;
pub const TIME: usize = PROJECT_NAME + 32;
pub const DATE: usize = TIME + 16;
pub const IDF_VER: usize = DATE + 16;
pub const SHA256: usize = IDF_VER + 32;
const RESERVED: usize = SHA256 + 32;

const_assert_eq!(RESERVED + 80, APP_DESC_LEN);
const_assert_eq!(APP_DESC_OFFSET, 32);

/// Application descriptor embedded in a firmware image
#[derive(Clone, PartialEq, Debug, Default)]
pub struct AppDescriptor {
    /// Anti-rollback counter value required by this image
    pub secure_version: u32,
    /// Firmware version string
    pub version: String<VERSION_STRING_MAX_LENGTH>,
    pub project_name: String<32>,
    pub time: String<16>,
    pub date: String<16>,
    pub idf_ver: String<32>,
    /// SHA256 of the application ELF
    pub app_elf_sha256: [u8; 32],
}

impl AppDescriptor {
    /// Parse the descriptor from the start of a stored or host-side image,
    /// requiring the descriptor magic word
    pub fn from_image(image: &[u8]) -> Result<Self, ProtoError> {
        let desc = image
            .get(APP_DESC_OFFSET..HEADER_LEN)
            .ok_or(ProtoError::InvalidLength)?;

        if LittleEndian::read_u32(&desc[MAGIC..]) != APP_DESC_MAGIC {
            return Err(ProtoError::InvalidEncoding);
        }

        Self::parse(desc)
    }

    /// Parse the descriptor from the first output of an incoming update.
    ///
    /// Only the version bound is enforced here, the magic word is left to
    /// partition finalisation.
    pub fn from_header(output: &[u8]) -> Result<Self, ProtoError> {
        let desc = output
            .get(APP_DESC_OFFSET..HEADER_LEN)
            .ok_or(ProtoError::InvalidLength)?;
        Self::parse(desc)
    }

    /// Parse a raw descriptor.
    ///
    /// The version must be terminated and UTF-8, other text fields are
    /// informational and truncated at the first invalid byte.
    pub fn parse(buff: &[u8]) -> Result<Self, ProtoError> {
        if buff.len() < APP_DESC_LEN {
            return Err(ProtoError::InvalidLength);
        }

        let secure_version = LittleEndian::read_u32(&buff[SECURE_VERSION..]);

        // The version must terminate within one byte past its field
        let v = &buff[VERSION..][..VERSION_STRING_MAX_LENGTH + 1];
        let n = v
            .iter()
            .position(|c| *c == 0)
            .ok_or(ProtoError::TextTooLong)?;

        let mut app_elf_sha256 = [0u8; 32];
        app_elf_sha256.copy_from_slice(&buff[SHA256..][..32]);

        Ok(Self {
            secure_version,
            version: text(&v[..n])?,
            project_name: text_lossy(&buff[PROJECT_NAME..][..32]),
            time: text_lossy(&buff[TIME..][..16]),
            date: text_lossy(&buff[DATE..][..16]),
            idf_ver: text_lossy(&buff[IDF_VER..][..32]),
            app_elf_sha256,
        })
    }

    /// Encode a descriptor, returning the encoded length
    pub fn encode(&self, buff: &mut [u8]) -> Result<usize, ProtoError> {
        if buff.len() < APP_DESC_LEN {
            return Err(ProtoError::InvalidLength);
        }

        let buff = &mut buff[..APP_DESC_LEN];
        buff.fill(0);

        LittleEndian::write_u32(&mut buff[MAGIC..], APP_DESC_MAGIC);
        LittleEndian::write_u32(&mut buff[SECURE_VERSION..], self.secure_version);

        buff[VERSION..][..self.version.len()].copy_from_slice(self.version.as_bytes());
        buff[PROJECT_NAME..][..self.project_name.len()]
            .copy_from_slice(self.project_name.as_bytes());
        buff[TIME..][..self.time.len()].copy_from_slice(self.time.as_bytes());
        buff[DATE..][..self.date.len()].copy_from_slice(self.date.as_bytes());
        buff[IDF_VER..][..self.idf_ver.len()].copy_from_slice(self.idf_ver.as_bytes());
        buff[SHA256..][..32].copy_from_slice(&self.app_elf_sha256);

        Ok(APP_DESC_LEN)
    }

    /// Encode image and segment headers followed by the descriptor,
    /// as found at the start of a firmware image
    pub fn encode_image_header(&self, buff: &mut [u8]) -> Result<usize, ProtoError> {
        if buff.len() < HEADER_LEN {
            return Err(ProtoError::InvalidLength);
        }

        buff[..APP_DESC_OFFSET].fill(0);
        buff[0] = IMAGE_MAGIC;
        // Single segment
        buff[1] = 1;

        self.encode(&mut buff[APP_DESC_OFFSET..])?;

        Ok(HEADER_LEN)
    }
}

/// Convert a NUL padded field to a bounded string
fn text<const N: usize>(b: &[u8]) -> Result<String<N>, ProtoError> {
    let n = b.iter().position(|c| *c == 0).unwrap_or(b.len());
    let s = core::str::from_utf8(&b[..n]).map_err(|_| ProtoError::InvalidEncoding)?;

    let mut v = String::new();
    v.push_str(s).map_err(|_| ProtoError::TextTooLong)?;
    Ok(v)
}

/// Convert a NUL padded field, keeping the valid UTF-8 prefix
fn text_lossy<const N: usize>(b: &[u8]) -> String<N> {
    let n = b.iter().position(|c| *c == 0).unwrap_or(b.len());
    let b = &b[..n.min(N)];
    let s = match core::str::from_utf8(b) {
        Ok(s) => s,
        // Prefix up to `valid_up_to` is always valid
        Err(e) => core::str::from_utf8(&b[..e.valid_up_to()]).unwrap_or_default(),
    };

    let mut v = String::new();
    let _ = v.push_str(s);
    v
}
