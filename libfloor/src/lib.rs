#![allow(clippy::needless_range_loop)]

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub mod core;
pub mod floor;
pub mod setup;
pub mod stream;

pub use crate::core::{
    db_quant, BitReader, BitWriter, Codebook, CodebookConfig, FloorError, FloorResult, Post,
    FROM_DB,
};
pub use crate::floor::{
    fit_and_pack, interpolate_fit, render, render_point, unpack_posts, ClassSpec, CurveFitter,
    FitParams, FloorDecoder, FloorEncoder, FloorLookup, FloorSpec, FloorStats, PackedFloor,
};
pub use setup::{FloorMode, FloorSetup};
pub use stream::{EncodedBlock, FloorStream};

// setup info for the setup_info() function

/// summary of a floor setup
#[derive(Debug, Clone, Serialize)]
pub struct SetupInfo {
    /// posts including both edges
    pub posts: usize,
    /// X range of the floor
    pub range: u32,
    pub multiplier: u8,
    /// quantized value range
    pub quant_q: u32,
    pub partitions: usize,
    pub classes: usize,
    pub books: usize,
    /// size of the packed setup header
    pub header_bits: usize,
    /// post X values in ascending order
    pub sorted_x: Vec<u32>,
    /// (lo, hi) prediction neighbors per post, edges report (0, 0)
    pub neighbors: Vec<(usize, usize)>,
}

/// describe a setup without encoding anything
pub fn describe_setup(setup: &FloorSetup) -> FloorResult<SetupInfo> {
    let mode = setup.build()?;
    let lookup = &mode.lookup;
    let (_, header_bits) = mode.header_bytes()?;

    let neighbors = (0..lookup.posts())
        .map(|i| {
            if i < 2 {
                (0, 0)
            } else {
                (lookup.lo_neighbor(i), lookup.hi_neighbor(i))
            }
        })
        .collect();

    Ok(SetupInfo {
        posts: lookup.posts(),
        range: lookup.n(),
        multiplier: setup.spec.multiplier,
        quant_q: lookup.quant_q(),
        partitions: setup.spec.partitions.len(),
        classes: setup.spec.classes.len(),
        books: setup.books.len(),
        header_bits,
        sorted_x: (0..lookup.posts()).map(|s| lookup.sorted_x(s)).collect(),
        neighbors,
    })
}

/// encode one block against a built mode, returns packet bytes and bit count
pub fn encode_block(
    mode: &FloorMode,
    log_mdct: &[f32],
    log_mask: &[f32],
) -> FloorResult<(Vec<u8>, usize)> {
    let mut bits = BitWriter::new();
    fit_and_pack(&mode.lookup, &mode.books, &mode.fit, log_mdct, log_mask, &mut bits)?;
    let len = bits.bits_written();
    Ok((bits.into_bytes(), len))
}

/// decode one packet into a linear floor curve of `bins` values
pub fn decode_block(mode: &FloorMode, packet: &[u8], bins: usize) -> FloorResult<Vec<f32>> {
    let mut bits = BitReader::new(packet);
    let posts = unpack_posts(&mode.lookup, &mode.books, &mut bits)?;
    floor::render_curve(&mode.lookup, posts.as_deref(), bins)
}

// result helpers

/// turn an error into js
fn to_js_err(e: FloorError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn mode_from_msgpack(setup: &[u8]) -> Result<FloorMode, JsValue> {
    FloorSetup::from_msgpack(setup)
        .and_then(|s| s.build())
        .map_err(to_js_err)
}

// api functions

/// route rust panics to the browser console
#[wasm_bindgen]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// the built-in reference setup as MessagePack
#[wasm_bindgen]
pub fn reference_setup() -> Result<Vec<u8>, JsValue> {
    FloorSetup::reference().to_msgpack().map_err(to_js_err)
}

/// convert a JSON setup to MessagePack, validating it on the way
#[wasm_bindgen]
pub fn setup_from_json(json: &str) -> Result<Vec<u8>, JsValue> {
    let setup = FloorSetup::from_json(json).map_err(to_js_err)?;
    setup.build().map_err(to_js_err)?;
    setup.to_msgpack().map_err(to_js_err)
}

/// Get information about a setup
///
/// # Arguments
/// * `setup` - MessagePack setup bytes
///
/// # Returns
/// JavaScript object with the fields of `SetupInfo`
#[wasm_bindgen]
pub fn setup_info(setup: &[u8]) -> Result<JsValue, JsValue> {
    let setup = FloorSetup::from_msgpack(setup).map_err(to_js_err)?;
    let info = describe_setup(&setup).map_err(to_js_err)?;
    serde_wasm_bindgen::to_value(&info)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// packed setup header of the floor
#[wasm_bindgen]
pub fn setup_header(setup: &[u8]) -> Result<Vec<u8>, JsValue> {
    let mode = mode_from_msgpack(setup)?;
    mode.header_bytes().map(|(bytes, _)| bytes).map_err(to_js_err)
}

/// fit a floor to one block and pack it
///
/// # Arguments
/// * `setup` - MessagePack setup bytes
/// * `log_mdct` - log magnitude spectrum of the block (dB)
/// * `log_mask` - log masking curve of the block (dB), same length
///
/// # Returns
/// floor packet bytes
#[wasm_bindgen]
pub fn encode_floor(setup: &[u8], log_mdct: &[f32], log_mask: &[f32]) -> Result<Vec<u8>, JsValue> {
    let mode = mode_from_msgpack(setup)?;
    encode_block(&mode, log_mdct, log_mask)
        .map(|(bytes, _)| bytes)
        .map_err(to_js_err)
}

/// decode a floor packet to its linear curve
///
/// # Arguments
/// * `setup` - MessagePack setup bytes
/// * `packet` - bytes from `encode_floor`
/// * `bins` - curve length
///
/// # Returns
/// linear gains, all zero when the packet carries no floor
#[wasm_bindgen]
pub fn decode_floor(setup: &[u8], packet: &[u8], bins: usize) -> Result<Vec<f32>, JsValue> {
    let mode = mode_from_msgpack(setup)?;
    decode_block(&mode, packet, bins).map_err(to_js_err)
}

/// get lib version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
