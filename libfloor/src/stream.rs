//! Container for a run of encoded floor packets
//!
//! MessagePack document: magic, version, the setup that produced the
//! packets, the block length in bins and one packet per block.

use serde::{Deserialize, Serialize};

use crate::core::{FloorError, FloorResult};
use crate::setup::FloorSetup;

pub const MAGIC: [u8; 4] = *b"FLR1";
pub const VERSION: u8 = 1;

/// one block's floor packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedBlock {
    /// bits actually used in `data`
    pub bits: u32,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

impl EncodedBlock {
    /// does the packet carry a floor (first bit set)
    pub fn has_floor(&self) -> bool {
        self.data.first().is_some_and(|b| b & 1 == 1)
    }
}

/// packets plus everything needed to decode them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorStream {
    #[serde(with = "serde_bytes")]
    magic: Vec<u8>,
    version: u8,
    pub setup: FloorSetup,
    /// spectrum bins per block
    pub bins: u32,
    pub blocks: Vec<EncodedBlock>,
}

impl FloorStream {
    pub fn new(setup: FloorSetup, bins: u32) -> Self {
        Self {
            magic: MAGIC.to_vec(),
            version: VERSION,
            setup,
            bins,
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, data: Vec<u8>, bits: usize) {
        self.blocks.push(EncodedBlock {
            bits: bits as u32,
            data,
        });
    }

    /// total packet bits across all blocks
    pub fn total_bits(&self) -> u64 {
        self.blocks.iter().map(|b| b.bits as u64).sum()
    }

    pub fn to_bytes(&self) -> FloorResult<Vec<u8>> {
        rmp_serde::to_vec_named(self).map_err(|e| FloorError::Setup(e.to_string()))
    }

    pub fn from_bytes(data: &[u8]) -> FloorResult<Self> {
        let stream: FloorStream =
            rmp_serde::from_slice(data).map_err(|e| FloorError::Setup(e.to_string()))?;
        if stream.magic != MAGIC {
            return Err(FloorError::Setup("not a floor stream (bad magic)".into()));
        }
        if stream.version != VERSION {
            return Err(FloorError::Setup(format!(
                "unsupported stream version {}",
                stream.version
            )));
        }
        Ok(stream)
    }
}
