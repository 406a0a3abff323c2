//! Floor setups: a floor layout, its codebooks and the fit tuning in one document
//!
//! Setups load from JSON (hand-written) or MessagePack (compact, what the
//! stream container embeds).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{BitWriter, Codebook, CodebookConfig, FloorError, FloorResult};
use crate::floor::{ClassSpec, FitParams, FloorDecoder, FloorEncoder, FloorLookup, FloorSpec};

/// serializable floor setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorSetup {
    pub spec: FloorSpec,
    /// books addressed by index from `spec`
    pub books: Vec<CodebookConfig>,
    #[serde(default)]
    pub fit: FitParams,
}

impl FloorSetup {
    pub fn new(spec: FloorSpec, books: Vec<CodebookConfig>) -> Self {
        Self {
            spec,
            books,
            fit: FitParams::default(),
        }
    }

    pub fn with_fit(mut self, fit: FitParams) -> Self {
        self.fit = fit;
        self
    }

    /// 128-bin floor, 14 posts, multiplier 2
    ///
    /// Four partitions of one class: a 3-bit selector picks per post between
    /// "implicit" and a flat 7-bit book that holds any payload.
    pub fn reference() -> Self {
        let spec = FloorSpec {
            partitions: vec![0, 0, 0, 0],
            classes: vec![ClassSpec::new(3, 1, Some(0), vec![None, Some(1)])],
            multiplier: 2,
            range_bits: 7,
            positions: vec![64, 32, 96, 16, 48, 80, 112, 8, 24, 40, 72, 104],
        };
        let books = vec![
            CodebookConfig::new(vec![3; 8]),
            CodebookConfig::new(vec![7; 128]),
        ];
        Self::new(spec, books)
    }

    pub fn from_json(text: &str) -> FloorResult<Self> {
        serde_json::from_str(text).map_err(|e| FloorError::Setup(e.to_string()))
    }

    pub fn to_json(&self) -> FloorResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| FloorError::Setup(e.to_string()))
    }

    pub fn from_msgpack(data: &[u8]) -> FloorResult<Self> {
        rmp_serde::from_slice(data).map_err(|e| FloorError::Setup(e.to_string()))
    }

    pub fn to_msgpack(&self) -> FloorResult<Vec<u8>> {
        rmp_serde::to_vec_named(self).map_err(|e| FloorError::Setup(e.to_string()))
    }

    /// Build the codebooks and the lookup
    pub fn build(&self) -> FloorResult<FloorMode> {
        let books = self
            .books
            .iter()
            .map(CodebookConfig::build)
            .collect::<FloorResult<Vec<_>>>()?;
        let lookup = FloorLookup::new(self.spec.clone(), books.len())?;
        debug!(books = books.len(), posts = lookup.posts(), "floor setup built");

        Ok(FloorMode {
            lookup: Arc::new(lookup),
            books: Arc::new(books),
            fit: self.fit,
        })
    }
}

/// A built setup, cheap to clone and share between encoder and decoder
#[derive(Debug, Clone)]
pub struct FloorMode {
    pub lookup: Arc<FloorLookup>,
    pub books: Arc<Vec<Codebook>>,
    pub fit: FitParams,
}

impl FloorMode {
    pub fn encoder(&self) -> FloorEncoder {
        FloorEncoder::new(self.lookup.clone(), self.books.clone()).with_params(self.fit)
    }

    pub fn decoder(&self) -> FloorDecoder {
        FloorDecoder::new(self.lookup.clone(), self.books.clone())
    }

    /// The floor's setup-header bits, zero padded to a byte
    pub fn header_bytes(&self) -> FloorResult<(Vec<u8>, usize)> {
        let mut bits = BitWriter::new();
        self.lookup.spec().pack_header(&mut bits)?;
        let len = bits.bits_written();
        Ok((bits.into_bytes(), len))
    }
}
