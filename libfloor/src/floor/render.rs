//! Integer curve rendering shared by the encoder and the decoder
//!
//! Everything here is integer arithmetic so both sides of the codec land on
//! the same table indices bit for bit.

use super::lookup::FloorLookup;
use crate::core::{tables::from_db, FloorError, FloorResult, Post};

/// fixed-point start for rising and flat lines
const RISE_BIAS: i32 = 0x200;
/// fixed-point start for falling lines
const FALL_BIAS: i32 = 0x1F_F800;
const FRAC_BITS: u32 = 21;

/// Largest value a post can take after scaling by the multiplier
const MAX_TABLE_INDEX: i32 = 255;

/// Linear prediction of the value at `x` on the line (x0,y0)-(x1,y1)
///
/// Truncates toward `y0`, so the result never leaves `[min(y0,y1), max(y0,y1)]`
/// for `x0 <= x <= x1`.
pub fn render_point(x0: u32, x1: u32, y0: i32, y1: i32, x: u32) -> i32 {
    let dy = y1 - y0;
    let adx = x1 as i64 - x0 as i64;
    if adx == 0 {
        return y0;
    }
    let off = (dy.unsigned_abs() as i64 * (x as i64 - x0 as i64) / adx) as i32;
    if dy < 0 {
        y0 - off
    } else {
        y0 + off
    }
}

fn line_start(y0: i32, y1: i32) -> (i32, i32) {
    let short_len = y1 - y0;
    let bias = if short_len >= 0 { RISE_BIAS } else { FALL_BIAS };
    (bias + (y0 << FRAC_BITS), short_len << FRAC_BITS)
}

/// Multiply `d[x0..x1]` by the dB table along the line from `y0` to `y1`
///
/// `y0`/`y1` are table indices (post value times multiplier). Bins past the
/// end of `d` are skipped.
pub fn render_line(x0: usize, x1: usize, y0: i32, y1: i32, d: &mut [f32]) {
    let end = x1.min(d.len());
    if x0 >= end {
        return;
    }

    if y0 == y1 {
        let gain = from_db(y0 as usize);
        d[x0..end].iter_mut().for_each(|s| *s *= gain);
        return;
    }

    let (mut j, scaled) = line_start(y0, y1);
    let inc = scaled / (x1 - x0) as i32;
    for s in &mut d[x0..end] {
        *s *= from_db((j >> FRAC_BITS) as usize);
        j += inc;
    }
}

/// Same walk as [`render_line`], storing the table indices instead
pub fn render_line0(x0: usize, x1: usize, y0: i32, y1: i32, d: &mut [i32]) {
    let end = x1.min(d.len());
    if x0 >= end {
        return;
    }

    let (mut j, scaled) = line_start(y0, y1);
    let inc = scaled / (x1 - x0) as i32;
    for s in &mut d[x0..end] {
        *s = j >> FRAC_BITS;
        j += inc;
    }
}

fn table_index(post: Post, mult: i32) -> i32 {
    (post.value() as i32 * mult).min(MAX_TABLE_INDEX)
}

fn check_posts(lookup: &FloorLookup, posts: &[Post]) -> FloorResult<()> {
    if posts.len() != lookup.posts() {
        return Err(FloorError::InvalidInput(format!(
            "{} posts given, floor has {}",
            posts.len(),
            lookup.posts()
        )));
    }
    Ok(())
}

/// Walk the explicit posts in X order, calling `line` per segment
///
/// Returns the X and value the last segment ended on.
fn walk_segments<F>(lookup: &FloorLookup, posts: &[Post], mut line: F) -> (usize, i32)
where
    F: FnMut(usize, usize, i32, i32),
{
    let mult = lookup.multiplier() as i32;
    let (mut lx, mut hx) = (0usize, 0usize);
    let mut ly = table_index(posts[0], mult);

    for sorted in 1..lookup.posts() {
        let current = lookup.forward(sorted);
        let post = posts[current];
        if post.is_explicit() {
            let hy = table_index(post, mult);
            hx = lookup.x(current) as usize;
            line(lx, hx, ly, hy);
            lx = hx;
            ly = hy;
        }
    }

    (hx, ly)
}

/// Multiply the decoded floor onto `out` in place
///
/// `posts` are quantized posts as unpacked from a packet; `None` (no floor)
/// zeroes the buffer.
pub fn render(lookup: &FloorLookup, posts: Option<&[Post]>, out: &mut [f32]) -> FloorResult<()> {
    let Some(posts) = posts else {
        out.fill(0.0);
        return Ok(());
    };
    check_posts(lookup, posts)?;

    let (hx, ly) = walk_segments(lookup, posts, |x0, x1, y0, y1| {
        render_line(x0, x1, y0, y1, out)
    });

    // hold the last value to the end of the block
    let gain = from_db(ly as usize);
    out.iter_mut().skip(hx).for_each(|s| *s *= gain);
    Ok(())
}

/// Linear floor curve of `len` bins, the floor rendered onto a flat spectrum
pub fn render_curve(
    lookup: &FloorLookup,
    posts: Option<&[Post]>,
    len: usize,
) -> FloorResult<Vec<f32>> {
    let mut curve = vec![1.0f32; len];
    render(lookup, posts, &mut curve)?;
    Ok(curve)
}

/// Table indices of the floor the decoder will rebuild, the encoder's check curve
pub fn render_quantized_curve(
    lookup: &FloorLookup,
    posts: Option<&[Post]>,
    out: &mut [i32],
) -> FloorResult<()> {
    let Some(posts) = posts else {
        out.fill(0);
        return Ok(());
    };
    check_posts(lookup, posts)?;

    let (hx, ly) = walk_segments(lookup, posts, |x0, x1, y0, y1| {
        render_line0(x0, x1, y0, y1, out)
    });

    out.iter_mut().skip(hx).for_each(|s| *s = ly);
    Ok(())
}
