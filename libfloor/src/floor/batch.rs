//! Fan independent channels out over the rayon pool
//!
//! Every channel of a block uses the same lookup; each gets its own fit and
//! render, so channels run in parallel without sharing mutable state.

use rayon::prelude::*;

use super::fit::{CurveFitter, FitParams};
use super::lookup::FloorLookup;
use super::render::render;
use crate::core::{FloorError, FloorResult, Post};

/// One channel's analysis for a block
#[derive(Debug, Clone, Copy)]
pub struct ChannelInput<'a> {
    pub log_mdct: &'a [f32],
    pub log_mask: &'a [f32],
}

impl<'a> ChannelInput<'a> {
    pub fn new(log_mdct: &'a [f32], log_mask: &'a [f32]) -> Self {
        Self { log_mdct, log_mask }
    }
}

/// Fit every channel, results in channel order
pub fn fit_channels(
    lookup: &FloorLookup,
    params: &FitParams,
    channels: &[ChannelInput<'_>],
) -> Vec<FloorResult<Option<Vec<Post>>>> {
    channels
        .par_iter()
        .map(|ch| CurveFitter::new(lookup, *params).fit_spectrum(ch.log_mdct, ch.log_mask))
        .collect()
}

/// Render each channel's posts onto its spectrum in place
pub fn render_channels(
    lookup: &FloorLookup,
    posts: &[Option<Vec<Post>>],
    spectra: &mut [Vec<f32>],
) -> FloorResult<()> {
    if posts.len() != spectra.len() {
        return Err(FloorError::InvalidInput(format!(
            "{} floors for {} channels",
            posts.len(),
            spectra.len()
        )));
    }

    spectra
        .par_iter_mut()
        .zip(posts.par_iter())
        .try_for_each(|(spectrum, floor)| render(lookup, floor.as_deref(), spectrum))
}
