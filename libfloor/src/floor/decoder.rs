use std::sync::Arc;

use tracing::warn;

use super::coder::unpack_posts;
use super::lookup::FloorLookup;
use super::render::render;
use crate::core::{BitReader, Codebook, FloorResult, Post};

/// Unpack floors and multiply them onto the residue spectrum
pub struct FloorDecoder {
    lookup: Arc<FloorLookup>,
    books: Arc<Vec<Codebook>>,
}

impl FloorDecoder {
    pub fn new(lookup: Arc<FloorLookup>, books: Arc<Vec<Codebook>>) -> Self {
        FloorDecoder { lookup, books }
    }

    /// read one block's posts, `None` for a block without floor
    pub fn decode_posts(&self, bits: &mut BitReader<'_>) -> FloorResult<Option<Vec<Post>>> {
        unpack_posts(&self.lookup, &self.books, bits).inspect_err(|e| {
            warn!(error = %e, at_bit = bits.position(), "undecodable floor")
        })
    }

    /// decode a block and apply it to `spectrum` in place
    ///
    /// Returns whether the block had a floor. On error `spectrum` is left
    /// untouched so the caller can mute or skip the block.
    pub fn decode(&self, bits: &mut BitReader<'_>, spectrum: &mut [f32]) -> FloorResult<bool> {
        let posts = self.decode_posts(bits)?;
        render(&self.lookup, posts.as_deref(), spectrum)?;
        Ok(posts.is_some())
    }

    pub fn render(&self, posts: Option<&[Post]>, spectrum: &mut [f32]) -> FloorResult<()> {
        render(&self.lookup, posts, spectrum)
    }
}
