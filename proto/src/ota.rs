// Copyright (c) 2022-2023 The MobileCoin Foundation

use minicbor::{encode::Write, Decoder, Encoder};

use crate::ProtoError;

/// Update session parameters, carried by the `ota` request
///
/// ## Encoding
/// ```text
/// {
///   "fwsize": uint,  // uncompressed image size
///   "cmpsize": uint, // compressed stream size
/// }
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct OtaParams {
    pub fwsize: u32,
    pub cmpsize: u32,
}

impl OtaParams {
    pub fn new(fwsize: u32, cmpsize: u32) -> Self {
        Self { fwsize, cmpsize }
    }

    /// Check parameters are usable for an update session.
    ///
    /// Both sizes must be non-zero and the compressed stream must be
    /// strictly smaller than the image it inflates to.
    pub fn is_valid(&self) -> bool {
        self.fwsize > 0 && self.cmpsize > 0 && self.fwsize > self.cmpsize
    }

    /// Decode parameters from a CBOR map
    pub fn decode(buff: &[u8]) -> Result<Self, ProtoError> {
        let mut d = Decoder::new(buff);

        let n = d.map()?.ok_or(ProtoError::InvalidEncoding)?;

        let (mut fwsize, mut cmpsize) = (None, None);

        for _ in 0..n {
            match d.str()? {
                "fwsize" => fwsize = Some(d.u32()?),
                "cmpsize" => cmpsize = Some(d.u32()?),
                _ => d.skip()?,
            }
        }

        Ok(Self {
            fwsize: fwsize.ok_or(ProtoError::MissingField("fwsize"))?,
            cmpsize: cmpsize.ok_or(ProtoError::MissingField("cmpsize"))?,
        })
    }

    /// Write parameters as a CBOR map using the provided encoder
    pub fn encode_with<W: Write>(
        &self,
        e: &mut Encoder<W>,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.map(2)?
            .str("fwsize")?
            .u32(self.fwsize)?
            .str("cmpsize")?
            .u32(self.cmpsize)?;
        Ok(())
    }
}
