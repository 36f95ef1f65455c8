// Copyright (c) 2022-2023 The MobileCoin Foundation

use ota_proto::{MsgId, OtaParams, Source};

/// Update session state, one per update attempt
#[derive(Clone, PartialEq, Debug)]
pub struct UpdateSession {
    /// Source the session was started on, chunks must arrive on the same source
    pub source: Source,

    pub expected_compressed: usize,
    pub expected_uncompressed: usize,

    /// Compressed bytes yet to be consumed by the decompressor
    pub remaining_compressed: usize,
    /// Uncompressed bytes yet to be written to the partition
    pub remaining_uncompressed: usize,

    /// Header parsed and update confirmed, set once per session
    pub validated: bool,

    /// Partition write started
    pub write_started: bool,
    /// Partition write finalized
    pub write_finalized: bool,

    /// Chunk accepted for processing and not yet acknowledged
    pub in_flight: Option<MsgId>,
}

impl UpdateSession {
    /// Create a new session from `ota` parameters
    pub fn new(source: Source, params: &OtaParams) -> Self {
        let (compressed, uncompressed) = (params.cmpsize as usize, params.fwsize as usize);

        Self {
            source,
            expected_compressed: compressed,
            expected_uncompressed: uncompressed,
            remaining_compressed: compressed,
            remaining_uncompressed: uncompressed,
            validated: false,
            write_started: false,
            write_finalized: false,
            in_flight: None,
        }
    }

    /// Create a session that never started (rejected parameters)
    pub fn idle(source: Source) -> Self {
        Self::new(source, &OtaParams::new(0, 0))
    }

    /// Compressed bytes consumed so far
    pub fn compressed_received(&self) -> usize {
        self.expected_compressed - self.remaining_compressed
    }

    /// Uncompressed bytes written so far
    pub fn uncompressed_written(&self) -> usize {
        self.expected_uncompressed - self.remaining_uncompressed
    }

    /// Whether a partition write is open and must be discarded on failure
    pub fn needs_abort(&self) -> bool {
        self.write_started && !self.write_finalized
    }
}
