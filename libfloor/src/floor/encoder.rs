use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::coder::{self, PackedFloor};
use super::fit::{CurveFitter, FitParams};
use super::lookup::FloorLookup;
use super::render::render_quantized_curve;
use crate::core::{BitWriter, Codebook, FloorResult, Post};

/// running totals over every block an encoder has packed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorStats {
    /// blocks packed, with or without a floor
    pub frames: u64,
    /// blocks that went out as "no floor"
    pub silent_frames: u64,
    /// edge values and post payloads
    pub post_bits: u64,
    /// class selector symbols
    pub phrase_bits: u64,
}

impl FloorStats {
    /// mean bits per block that carried a floor
    pub fn bits_per_floor(&self) -> f64 {
        let coded = self.frames - self.silent_frames;
        if coded == 0 {
            0.0
        } else {
            (self.post_bits + self.phrase_bits) as f64 / coded as f64
        }
    }
}

/// Fit and pack floors block after block
pub struct FloorEncoder {
    lookup: Arc<FloorLookup>,
    books: Arc<Vec<Codebook>>,
    params: FitParams,
    stats: FloorStats,
}

impl FloorEncoder {
    pub fn new(lookup: Arc<FloorLookup>, books: Arc<Vec<Codebook>>) -> Self {
        FloorEncoder {
            lookup,
            books,
            params: FitParams::default(),
            stats: FloorStats::default(),
        }
    }

    pub fn with_params(mut self, params: FitParams) -> Self {
        self.params = params;
        self
    }

    pub fn stats(&self) -> &FloorStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = FloorStats::default();
    }

    /// fit without packing, values on the 0..=1023 scale
    pub fn fit(&self, log_mdct: &[f32], log_mask: &[f32]) -> FloorResult<Option<Vec<Post>>> {
        CurveFitter::new(&self.lookup, self.params).fit_spectrum(log_mdct, log_mask)
    }

    /// fit one block and pack it, returns the posts the decoder will see
    pub fn encode(
        &mut self,
        log_mdct: &[f32],
        log_mask: &[f32],
        bits: &mut BitWriter,
    ) -> FloorResult<Option<Vec<Post>>> {
        let fitted = self.fit(log_mdct, log_mask)?;
        self.encode_posts(fitted.as_deref(), bits)
    }

    /// pack posts fitted elsewhere (e.g. blended with interpolate_fit)
    pub fn encode_posts(
        &mut self,
        posts: Option<&[Post]>,
        bits: &mut BitWriter,
    ) -> FloorResult<Option<Vec<Post>>> {
        let packed = coder::pack(&self.lookup, &self.books, posts, bits)?;

        self.stats.frames += 1;
        match packed {
            Some(PackedFloor {
                posts,
                post_bits,
                phrase_bits,
            }) => {
                self.stats.post_bits += post_bits as u64;
                self.stats.phrase_bits += phrase_bits as u64;
                debug!(frame = self.stats.frames, post_bits, phrase_bits, "encoded floor");
                Ok(Some(posts))
            }
            None => {
                self.stats.silent_frames += 1;
                debug!(frame = self.stats.frames, "encoded empty floor");
                Ok(None)
            }
        }
    }

    /// table indices of the curve the decoder will rebuild, `len` bins
    pub fn check_curve(&self, posts: Option<&[Post]>, len: usize) -> FloorResult<Vec<i32>> {
        let mut curve = vec![0i32; len];
        render_quantized_curve(&self.lookup, posts, &mut curve)?;
        Ok(curve)
    }
}
