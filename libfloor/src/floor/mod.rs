//! Floor type 1: a piecewise-linear spectral envelope
//!
//! The encoder fits posts to the masking curve and packs them against a
//! causal linear prediction; the decoder unpacks the posts and multiplies
//! the rendered curve onto the spectrum.

pub mod batch;
pub mod coder;
pub mod decoder;
pub mod encoder;
pub mod fit;
pub mod lookup;
pub mod render;
pub mod spec;

pub use batch::{fit_channels, render_channels, ChannelInput};
pub use coder::{
    dequantize, fold_deviation, pack, pack_quantized, quant_step, quantize, quantize_posts,
    unfold_deviation, unpack_posts, PackedFloor,
};
pub use decoder::FloorDecoder;
pub use encoder::{FloorEncoder, FloorStats};
pub use fit::{
    fit_line, inspect_error, interpolate_fit, tone_alignment, CurveFitter, FitParams,
    LineAccumulator,
};
pub use lookup::FloorLookup;
pub use render::{
    render, render_curve, render_line, render_line0, render_point, render_quantized_curve,
};
pub use spec::{ClassSpec, FloorSpec};

use crate::core::{BitWriter, Codebook, FloorResult};

/// Fit one block and pack it
///
/// Returns `None` (and writes the single no-floor bit) when the block has
/// no aligned energy.
pub fn fit_and_pack(
    lookup: &FloorLookup,
    books: &[Codebook],
    params: &FitParams,
    log_mdct: &[f32],
    log_mask: &[f32],
    bits: &mut BitWriter,
) -> FloorResult<Option<PackedFloor>> {
    let fitted = CurveFitter::new(lookup, *params).fit_spectrum(log_mdct, log_mask)?;
    pack(lookup, books, fitted.as_deref(), bits)
}
