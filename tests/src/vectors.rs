// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Firmware image vectors
//!
//! Images are generated from a seed so device and host agree on
//! content without shipping binaries.

use rand::{rngs::StdRng, Rng, SeedableRng};

use ota_proto::image::{AppDescriptor, APP_DESC_OFFSET, VERSION, VERSION_STRING_MAX_LENGTH};

/// Firmware image vector
#[derive(Clone, PartialEq, Debug)]
pub struct Vector {
    pub version: &'static str,
    pub secure_version: u32,
    /// Uncompressed image size
    pub size: usize,
    pub seed: u64,
}

impl Vector {
    /// Generate the uncompressed image
    pub fn image(&self) -> Vec<u8> {
        firmware(self.version, self.secure_version, self.size, self.seed)
    }

    /// Generate the image with an unterminated version string
    pub fn corrupt_image(&self) -> Vec<u8> {
        let mut b = self.image();
        b[APP_DESC_OFFSET + VERSION..][..VERSION_STRING_MAX_LENGTH + 1].fill(b'9');
        b
    }
}

pub const VECTORS: &[Vector] = &[
    // Not a multiple of the output window
    Vector {
        version: "1.0.21",
        secure_version: 1,
        size: 100_000,
        seed: 1,
    },
    // Exactly four output windows
    Vector {
        version: "1.0.22",
        secure_version: 1,
        size: 131_072,
        seed: 2,
    },
    // Just over a single output window
    Vector {
        version: "1.0.23-beta",
        secure_version: 2,
        size: 40_000,
        seed: 3,
    },
    // Large image spanning many chunks
    Vector {
        version: "1.1.0",
        secure_version: 3,
        size: 1_000_000,
        seed: 4,
    },
];

/// Build a firmware image of `size` bytes with a valid header
pub fn firmware(version: &str, secure_version: u32, size: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);

    // Low entropy filler so images compress well
    let mut b: Vec<u8> = (0..size).map(|_| rng.gen_range(0..16u8)).collect();

    let mut d = AppDescriptor {
        secure_version,
        app_elf_sha256: rng.gen(),
        ..Default::default()
    };
    d.version.push_str(version).unwrap();
    d.project_name.push_str("ota-tests").unwrap();
    d.date.push_str("Jan  1 2023").unwrap();
    d.time.push_str("00:00:00").unwrap();

    d.encode_image_header(&mut b).unwrap();

    b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vectors_parse() {
        for v in VECTORS {
            let b = v.image();
            assert_eq!(b.len(), v.size);

            let d = AppDescriptor::from_image(&b).unwrap();
            assert_eq!(d.version.as_str(), v.version);
            assert_eq!(d.secure_version, v.secure_version);

            assert!(AppDescriptor::from_header(&v.corrupt_image()).is_err());
        }
    }

    #[test]
    fn vectors_deterministic() {
        assert_eq!(VECTORS[0].image(), VECTORS[0].image());
        assert_ne!(&VECTORS[0].image()[1000..2000], &VECTORS[1].image()[1000..2000]);
    }
}
