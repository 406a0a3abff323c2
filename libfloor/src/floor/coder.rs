//! Post quantization and the per-block packet layout
//!
//! Packet: has-floor flag, two raw edge values, then per partition an
//! optional selector symbol followed by each post's folded deviation from
//! its linear prediction.

use tracing::trace;

use super::lookup::FloorLookup;
use super::render::render_point;
use crate::core::{BitReader, BitWriter, Codebook, FloorError, FloorResult, Post, FIT_MAX};

/// Width of one quantization step on the 0..=1023 fit scale
pub fn quant_step(multiplier: u32) -> u32 {
    match multiplier {
        1 => 4,
        2 => 8,
        3 => 12,
        _ => 16,
    }
}

/// Map a fit-scale value (0..=1023) onto `0..quant_q`
pub fn quantize(value: u16, multiplier: u32) -> u16 {
    let v = value.min(FIT_MAX);
    match multiplier {
        1 => v >> 2,
        2 => v >> 3,
        3 => v / 12,
        _ => v >> 4,
    }
}

/// Bottom of the fit-scale bucket a quantized value stands for
pub fn dequantize(value: u16, multiplier: u32) -> u16 {
    value.saturating_mul(quant_step(multiplier) as u16)
}

/// Quantize every post, keeping its flag
pub fn quantize_posts(posts: &[Post], multiplier: u32) -> Vec<Post> {
    posts
        .iter()
        .map(|p| p.with_value(quantize(p.value(), multiplier)))
        .collect()
}

/// Fold a signed deviation into a non-negative payload
///
/// Small deviations interleave (0, -1, 1, -2, ...); once one side runs out
/// of room the remaining side continues linearly.
pub fn fold_deviation(deviation: i32, headroom: i32) -> u32 {
    let folded = if deviation < 0 {
        if deviation < -headroom {
            headroom - deviation - 1
        } else {
            -1 - (deviation << 1)
        }
    } else if deviation >= headroom {
        deviation + headroom
    } else {
        deviation << 1
    };
    folded as u32
}

/// Inverse of [`fold_deviation`] for a prediction inside `0..quant_q`
pub fn unfold_deviation(payload: u32, predicted: i32, quant_q: i32) -> i32 {
    let hiroom = quant_q - predicted;
    let loroom = predicted;
    let room = hiroom.min(loroom) << 1;
    let val = payload as i32;

    if val >= room {
        if hiroom > loroom {
            val - loroom
        } else {
            -1 - (val - hiroom)
        }
    } else if val & 1 != 0 {
        -((val + 1) >> 1)
    } else {
        val >> 1
    }
}

/// What [`pack`] wrote for one block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedFloor {
    /// Quantized posts as the decoder will rebuild them
    pub posts: Vec<Post>,
    /// Bits spent on edge values and post payloads
    pub post_bits: u32,
    /// Bits spent on class selector symbols
    pub phrase_bits: u32,
}

struct PartitionPlan {
    class: usize,
    first_post: usize,
    selector: Option<u32>,
    /// chosen sub-book slot per post
    slots: Vec<usize>,
}

fn book<'b>(books: &'b [Codebook], index: u8) -> FloorResult<&'b Codebook> {
    books.get(index as usize).ok_or_else(|| {
        FloorError::InvalidInput(format!(
            "book {} referenced but only {} books supplied",
            index,
            books.len()
        ))
    })
}

fn check_len(lookup: &FloorLookup, posts: &[Post]) -> FloorResult<()> {
    if posts.len() != lookup.posts() {
        return Err(FloorError::InvalidInput(format!(
            "{} posts given, floor has {}",
            posts.len(),
            lookup.posts()
        )));
    }
    Ok(())
}

/// Predict post `i` from its static neighbors
fn predict(lookup: &FloorLookup, posts: &[Post], i: usize) -> i32 {
    let ln = lookup.lo_neighbor(i);
    let hn = lookup.hi_neighbor(i);
    render_point(
        lookup.x(ln),
        lookup.x(hn),
        posts[ln].value() as i32,
        posts[hn].value() as i32,
        lookup.x(i),
    )
}

/// Quantize fit-scale posts and pack them; `None` writes the no-floor bit
pub fn pack(
    lookup: &FloorLookup,
    books: &[Codebook],
    posts: Option<&[Post]>,
    bits: &mut BitWriter,
) -> FloorResult<Option<PackedFloor>> {
    let Some(posts) = posts else {
        bits.write_bit(0);
        return Ok(None);
    };
    check_len(lookup, posts)?;
    let quantized = quantize_posts(posts, lookup.multiplier());
    pack_quantized(lookup, books, &quantized, bits).map(Some)
}

/// Pack posts already in `0..quant_q`
///
/// Nothing is written unless the whole block is encodable.
pub fn pack_quantized(
    lookup: &FloorLookup,
    books: &[Codebook],
    posts: &[Post],
    bits: &mut BitWriter,
) -> FloorResult<PackedFloor> {
    check_len(lookup, posts)?;
    let quant_q = lookup.quant_q() as i32;
    if let Some((i, p)) = posts
        .iter()
        .enumerate()
        .find(|(_, p)| p.value() as i32 >= quant_q)
    {
        return Err(FloorError::InvalidInput(format!(
            "post {} value {} outside 0..{}",
            i,
            p.value(),
            quant_q
        )));
    }

    let count = posts.len();
    let mut post: Vec<Post> = posts.to_vec();
    post[0] = post[0].to_explicit();
    post[1] = post[1].to_explicit();

    let mut out = vec![0u32; count];
    out[0] = post[0].value() as u32;
    out[1] = post[1].value() as u32;

    for i in 2..count {
        let predicted = predict(lookup, &post, i);
        if post[i].is_implicit() || predicted == post[i].value() as i32 {
            post[i] = Post::Implicit(predicted as u16);
            out[i] = 0;
        } else {
            let headroom = (quant_q - predicted).min(predicted);
            out[i] = fold_deviation(post[i].value() as i32 - predicted, headroom);

            let ln = lookup.lo_neighbor(i);
            let hn = lookup.hi_neighbor(i);
            post[ln] = post[ln].to_explicit();
            post[hn] = post[hn].to_explicit();
        }
    }

    let plans = plan_partitions(lookup, books, &out)?;

    // everything is known to be encodable, write it
    let spec = lookup.spec();
    let edge_bits = lookup.edge_bits();
    bits.write_bit(1);
    bits.write_bits(out[0], edge_bits);
    bits.write_bits(out[1], edge_bits);

    let mut post_bits = edge_bits * 2;
    let mut phrase_bits = 0;
    for plan in &plans {
        let class = &spec.classes[plan.class];
        if let (Some(selector), Some(selector_book)) = (plan.selector, class.book) {
            phrase_bits += book(books, selector_book)?.encode(selector, bits)?;
        }
        for (k, &slot) in plan.slots.iter().enumerate() {
            if let Some(sub) = class.sub_books[slot] {
                post_bits += book(books, sub)?.encode(out[plan.first_post + k], bits)?;
            }
        }
    }

    trace!(post_bits, phrase_bits, "packed floor");
    Ok(PackedFloor {
        posts: post,
        post_bits,
        phrase_bits,
    })
}

/// Pick a sub-book for every payload and build the selector symbols
fn plan_partitions(
    lookup: &FloorLookup,
    books: &[Codebook],
    out: &[u32],
) -> FloorResult<Vec<PartitionPlan>> {
    let spec = lookup.spec();
    let mut plans = Vec::with_capacity(spec.partitions.len());
    let mut j = 2;

    for &class_index in &spec.partitions {
        let class_index = class_index as usize;
        let class = &spec.classes[class_index];
        let dim = class.dim as usize;
        let sub_bits = class.sub_bits as u32;

        // largest payload each slot can hold, an unused slot holds only 0
        let mut max_val = Vec::with_capacity(class.sub_count());
        for sub in &class.sub_books {
            max_val.push(match sub {
                Some(b) => book(books, *b)?.entries(),
                None => 1,
            });
        }

        let mut slots = Vec::with_capacity(dim);
        let mut selector = 0u32;
        for k in 0..dim {
            let value = out[j + k];
            let unencodable = FloorError::Unencodable {
                post: j + k,
                class: class_index,
                value,
            };

            let slot = if sub_bits > 0 {
                max_val
                    .iter()
                    .position(|&max| value < max)
                    .ok_or_else(|| unencodable.clone())?
            } else {
                0
            };

            let codable = match class.sub_books[slot] {
                Some(b) => book(books, b)?.code_length(value).is_some(),
                None => value == 0,
            };
            if !codable {
                return Err(unencodable);
            }

            selector |= (slot as u32) << (k as u32 * sub_bits);
            slots.push(slot);
        }

        let selector = match class.book {
            Some(b) if sub_bits > 0 => {
                if book(books, b)?.code_length(selector).is_none() {
                    return Err(FloorError::InvalidCodebook(format!(
                        "selector book {} has no codeword for {}",
                        b, selector
                    )));
                }
                Some(selector)
            }
            _ => None,
        };

        plans.push(PartitionPlan {
            class: class_index,
            first_post: j,
            selector,
            slots,
        });
        j += dim;
    }

    Ok(plans)
}

/// Read one block's posts; `None` when the block carries no floor
///
/// A truncated or corrupt packet fails the whole block.
pub fn unpack_posts(
    lookup: &FloorLookup,
    books: &[Codebook],
    bits: &mut BitReader<'_>,
) -> FloorResult<Option<Vec<Post>>> {
    if !bits.read_bool()? {
        return Ok(None);
    }

    let spec = lookup.spec();
    let quant_q = lookup.quant_q() as i32;
    let count = lookup.posts();
    let edge_bits = lookup.edge_bits();

    let mut payload = vec![0u32; count];
    payload[0] = bits.read_bits(edge_bits)?;
    payload[1] = bits.read_bits(edge_bits)?;

    let mut j = 2;
    for &class_index in &spec.partitions {
        let class = &spec.classes[class_index as usize];
        let sub_bits = class.sub_bits as u32;
        let mask = (1u32 << sub_bits) - 1;

        let mut selector = match class.book {
            Some(b) if sub_bits > 0 => book(books, b)?.decode(bits)?,
            _ => 0,
        };

        for k in 0..class.dim as usize {
            let slot = (selector & mask) as usize;
            selector >>= sub_bits;
            payload[j + k] = match class.sub_books[slot] {
                Some(b) => book(books, b)?.decode(bits)?,
                None => 0,
            };
        }
        j += class.dim as usize;
    }

    let mut posts = Vec::with_capacity(count);
    for &edge in &payload[..2] {
        if edge as i32 >= quant_q {
            return Err(FloorError::MalformedPacket(format!(
                "edge value {} outside 0..{}",
                edge, quant_q
            )));
        }
        posts.push(Post::Explicit(edge as u16));
    }

    for i in 2..count {
        let predicted = predict(lookup, &posts, i);
        if payload[i] == 0 {
            posts.push(Post::Implicit(predicted as u16));
            continue;
        }

        let value = predicted + unfold_deviation(payload[i], predicted, quant_q);
        if !(0..quant_q).contains(&value) {
            return Err(FloorError::MalformedPacket(format!(
                "post {} decodes to {} outside 0..{}",
                i, value, quant_q
            )));
        }
        posts.push(Post::Explicit(value as u16));

        let ln = lookup.lo_neighbor(i);
        let hn = lookup.hi_neighbor(i);
        posts[ln] = posts[ln].to_explicit();
        posts[hn] = posts[hn].to_explicit();
    }

    trace!(posts = count, "unpacked floor");
    Ok(Some(posts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_unfold() {
        let quant_q = 256;
        for predicted in [0, 1, 5, 128, 250, 255] {
            for value in 0..quant_q {
                let headroom = (quant_q - predicted).min(predicted);
                let folded = fold_deviation(value - predicted, headroom);
                if folded == 0 {
                    assert_eq!(value, predicted);
                    continue;
                }
                assert_eq!(
                    predicted + unfold_deviation(folded, predicted, quant_q),
                    value,
                    "predicted {} value {}",
                    predicted,
                    value
                );
            }
        }
    }
}
