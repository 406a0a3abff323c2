//! floorctl - floor setup and packet tooling
//!
//! File-level helpers behind the `floorctl` binary: load setups, fit and
//! pack blocks of analysis data into a floor stream, and decode streams
//! back to linear floor curves.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use libfloor::{BitReader, BitWriter, FloorSetup, FloorStats, FloorStream};

/// Re-export libfloor so callers only need one dependency
pub use libfloor;

/// One block of encoder analysis, both curves in dB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockInput {
    pub log_mdct: Vec<f32>,
    pub log_mask: Vec<f32>,
}

/// Input document for `encode`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockFile {
    pub blocks: Vec<BlockInput>,
}

/// Output document for `decode`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveFile {
    pub bins: u32,
    /// linear floor gain per bin, all zero for blocks without floor
    pub curves: Vec<Vec<f32>>,
    /// blocks whose packet failed to decode, output as silence
    #[serde(default)]
    pub muted: Vec<usize>,
}

/// Summary of a floor stream
#[derive(Debug, Clone, Serialize)]
pub struct StreamInfo {
    pub blocks: usize,
    pub bins: u32,
    pub silent_blocks: usize,
    pub total_bits: u64,
    pub bytes: usize,
    /// mean packet size of the blocks that carry a floor
    pub bits_per_floor: f64,
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Parse a setup, JSON when `json` is set, MessagePack otherwise
pub fn parse_setup(data: &[u8], json: bool) -> Result<FloorSetup> {
    let setup = if json {
        let text = std::str::from_utf8(data).context("Setup is not valid UTF-8")?;
        FloorSetup::from_json(text)?
    } else {
        FloorSetup::from_msgpack(data)?
    };
    Ok(setup)
}

/// Load a setup file, the extension picks the format
pub fn load_setup(path: &Path) -> Result<FloorSetup> {
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read setup {}", path.display()))?;
    parse_setup(&data, is_json(path))
        .with_context(|| format!("Failed to parse setup {}", path.display()))
}

/// Serialize a setup for `path`, the extension picks the format
pub fn setup_bytes(setup: &FloorSetup, path: &Path) -> Result<Vec<u8>> {
    let bytes = if is_json(path) {
        setup.to_json()?.into_bytes()
    } else {
        setup.to_msgpack()?
    };
    Ok(bytes)
}

/// Parse an encode input document
pub fn parse_blocks(data: &[u8]) -> Result<BlockFile> {
    serde_json::from_slice(data).context("Failed to parse block file")
}

/// Fit and pack every block, returns the stream and the encoder's totals
pub fn encode_blocks(
    setup: &FloorSetup,
    blocks: &[BlockInput],
) -> Result<(FloorStream, FloorStats)> {
    let Some(first) = blocks.first() else {
        bail!("No blocks to encode");
    };
    let bins = first.log_mask.len();

    let mode = setup.build().context("Invalid setup")?;
    if bins < mode.lookup.n() as usize {
        bail!(
            "Blocks have {} bins but the floor covers {}",
            bins,
            mode.lookup.n()
        );
    }

    let mut encoder = mode.encoder();
    let mut stream = FloorStream::new(setup.clone(), bins as u32);

    for (i, block) in blocks.iter().enumerate() {
        if block.log_mask.len() != bins || block.log_mdct.len() != bins {
            bail!(
                "Block {} has {}/{} bins, expected {}",
                i,
                block.log_mdct.len(),
                block.log_mask.len(),
                bins
            );
        }

        let mut bits = BitWriter::new();
        encoder
            .encode(&block.log_mdct, &block.log_mask, &mut bits)
            .with_context(|| format!("Failed to encode block {}", i))?;
        let len = bits.bits_written();
        debug!(block = i, bits = len, "packed block");
        stream.push(bits.into_bytes(), len);
    }

    let stats = *encoder.stats();
    info!(
        blocks = stats.frames,
        silent = stats.silent_frames,
        "encoded floor stream"
    );
    Ok((stream, stats))
}

/// Decode every packet of a stream to its linear curve
///
/// A packet that fails to decode is muted: its curve is all zero and its
/// index is listed in `muted`.
pub fn decode_stream(stream: &FloorStream) -> Result<CurveFile> {
    let mode = stream.setup.build().context("Stream carries an invalid setup")?;
    let decoder = mode.decoder();
    let bins = stream.bins as usize;

    let mut curves = Vec::with_capacity(stream.blocks.len());
    let mut muted = Vec::new();
    for (i, block) in stream.blocks.iter().enumerate() {
        let mut bits = BitReader::new(&block.data);
        let mut curve = vec![1.0f32; bins];
        if let Err(e) = decoder.decode(&mut bits, &mut curve) {
            warn!(block = i, error = %e, "muting undecodable block");
            curve.fill(0.0);
            muted.push(i);
        }
        curves.push(curve);
    }

    Ok(CurveFile {
        bins: stream.bins,
        curves,
        muted,
    })
}

/// Read a stream container
pub fn read_stream(data: &[u8]) -> Result<FloorStream> {
    FloorStream::from_bytes(data).map_err(|e| anyhow!("Invalid floor stream: {}", e))
}

/// Summarize a stream without decoding it
pub fn stream_info(stream: &FloorStream, bytes: usize) -> StreamInfo {
    let silent_blocks = stream.blocks.iter().filter(|b| !b.has_floor()).count();
    let coded = stream.blocks.len() - silent_blocks;
    let coded_bits: u64 = stream
        .blocks
        .iter()
        .filter(|b| b.has_floor())
        .map(|b| b.bits as u64)
        .sum();

    StreamInfo {
        blocks: stream.blocks.len(),
        bins: stream.bins,
        silent_blocks,
        total_bits: stream.total_bits(),
        bytes,
        bits_per_floor: if coded == 0 {
            0.0
        } else {
            coded_bits as f64 / coded as f64
        },
    }
}
