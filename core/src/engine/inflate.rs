// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Streaming zlib decompressor
//!
//! The output buffer doubles as the decompressor history window, so it is
//! used as a wrapping buffer and must be drained each time it fills before
//! decompression can continue.

use alloc::{boxed::Box, vec};

use miniz_oxide::inflate::{
    core::{
        decompress,
        inflate_flags::{TINFL_FLAG_HAS_MORE_INPUT, TINFL_FLAG_PARSE_ZLIB_HEADER},
        DecompressorOxide,
    },
    TINFLStatus,
};

use super::consts::OUTPUT_BUF_SIZE;

/// Decompressor state and output buffer for a single update session
pub struct Inflate {
    decomp: Box<DecompressorOxide>,
    out: Box<[u8]>,
    pos: usize,
    status: TINFLStatus,
}

impl Inflate {
    pub fn new() -> Self {
        Self {
            decomp: Box::default(),
            out: vec![0u8; OUTPUT_BUF_SIZE].into_boxed_slice(),
            pos: 0,
            status: TINFLStatus::NeedsMoreInput,
        }
    }

    /// Run a single decompression step, returning the number of input bytes consumed.
    ///
    /// `more_input` indicates further compressed bytes follow `input`.
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn step(&mut self, input: &[u8], more_input: bool) -> usize {
        let mut flags = TINFL_FLAG_PARSE_ZLIB_HEADER;
        if more_input {
            flags |= TINFL_FLAG_HAS_MORE_INPUT;
        }

        let (status, consumed, written) =
            decompress(&mut self.decomp, input, &mut self.out, self.pos, flags);

        self.pos += written;
        self.status = status;

        consumed
    }

    /// Most recent decompressor status
    pub fn status(&self) -> TINFLStatus {
        self.status
    }

    /// Stream is waiting for input or for output space
    pub fn is_pending(&self) -> bool {
        matches!(
            self.status,
            TINFLStatus::NeedsMoreInput | TINFLStatus::HasMoreOutput
        )
    }

    pub fn is_done(&self) -> bool {
        self.status == TINFLStatus::Done
    }

    /// Decompressor reported an error
    pub fn is_failed(&self) -> bool {
        (self.status as i32) < 0
    }

    /// Output buffer is full and must be drained
    pub fn is_full(&self) -> bool {
        self.pos == self.out.len()
    }

    /// Output pending since the last drain
    pub fn output(&self) -> &[u8] {
        &self.out[..self.pos]
    }

    /// Reset the output cursor once pending output is consumed
    pub fn drain(&mut self) {
        self.pos = 0;
    }
}

impl Default for Inflate {
    fn default() -> Self {
        Self::new()
    }
}
