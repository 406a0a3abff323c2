//! Property-based tests for the floor codec.
//!
//! Packing, quantization, rendering and the fit's split test checked over
//! generated posts and curves.

use proptest::prelude::*;
use libfloor::floor::{dequantize, inspect_error, pack_quantized, quant_step, quantize};
use libfloor::{
    db_quant, render, render_point, unpack_posts, BitReader, BitWriter, ClassSpec, Codebook,
    CodebookConfig, FitParams, FloorLookup, FloorSetup, FloorSpec, Post,
};

fn reference() -> (FloorLookup, Vec<Codebook>) {
    reference_with(2)
}

fn reference_with(multiplier: u8) -> (FloorLookup, Vec<Codebook>) {
    let mut setup = FloorSetup::reference();
    setup.spec.multiplier = multiplier;
    build(&setup)
}

/// Two partitions where every post, implicit ones included, goes through a 7-bit book
fn coded_implicit() -> (FloorLookup, Vec<Codebook>) {
    let spec = FloorSpec {
        partitions: vec![0, 0],
        classes: vec![ClassSpec::single(3, Some(0))],
        multiplier: 2,
        range_bits: 6,
        positions: vec![32, 16, 48, 8, 24, 40],
    };
    build(&FloorSetup::new(spec, vec![CodebookConfig::new(vec![7; 128])]))
}

fn build(setup: &FloorSetup) -> (FloorLookup, Vec<Codebook>) {
    let mode = setup.build().unwrap();
    ((*mode.lookup).clone(), (*mode.books).clone())
}

fn assert_round_trip(
    lookup: &FloorLookup,
    books: &[Codebook],
    posts: &[Post],
) -> Result<(), TestCaseError> {
    let mut writer = BitWriter::new();
    let packed = pack_quantized(lookup, books, posts, &mut writer).unwrap();
    let written = writer.bits_written();
    let bytes = writer.into_bytes();

    let mut reader = BitReader::new(&bytes);
    let decoded = unpack_posts(lookup, books, &mut reader).unwrap();
    prop_assert_eq!(decoded, Some(packed.posts.clone()));
    prop_assert_eq!(reader.position(), written);

    // explicit input posts keep their value
    for (i, post) in posts.iter().enumerate() {
        if post.is_explicit() && packed.posts[i].is_explicit() {
            prop_assert_eq!(packed.posts[i].value(), post.value());
        }
    }
    Ok(())
}

fn quant_q(multiplier: u8) -> u16 {
    match multiplier {
        1 => 256,
        2 => 128,
        3 => 86,
        _ => 64,
    }
}

fn post_strategy(quant_q: u16, count: usize) -> impl Strategy<Value = Vec<Post>> {
    prop::collection::vec((any::<bool>(), 0..quant_q), count).prop_map(|posts| {
        posts
            .into_iter()
            .map(|(implicit, v)| if implicit { Post::Implicit(v) } else { Post::Explicit(v) })
            .collect()
    })
}

// =============================================================================
// Packing
// =============================================================================

proptest! {
    /// Whatever pack reports is exactly what unpack rebuilds.
    #[test]
    fn pack_unpack_round_trip(
        (multiplier, posts) in (2u8..=4)
            .prop_flat_map(|m| (Just(m), post_strategy(quant_q(m), 14)))
    ) {
        let (lookup, books) = reference_with(multiplier);
        prop_assert_eq!(lookup.quant_q(), quant_q(multiplier) as u32);
        assert_round_trip(&lookup, &books, &posts)?;
    }

    /// Implicit posts whose payload 0 is coded through a real book.
    #[test]
    fn pack_unpack_coded_implicit(posts in post_strategy(128, 8)) {
        let (lookup, books) = coded_implicit();
        assert_round_trip(&lookup, &books, &posts)?;
    }

    /// Arbitrary bytes never decode to a post outside the quantized range.
    #[test]
    fn unpack_garbage_stays_in_range(bytes in prop::collection::vec(any::<u8>(), 0..40)) {
        let (lookup, books) = reference();
        let mut reader = BitReader::new(&bytes);
        if let Ok(Some(posts)) = unpack_posts(&lookup, &books, &mut reader) {
            prop_assert_eq!(posts.len(), 14);
            prop_assert!(posts.iter().all(|p| (p.value() as u32) < lookup.quant_q()));
        }
    }
}

// =============================================================================
// Quantization and rendering
// =============================================================================

proptest! {
    /// Dequantizing lands within one step below the original value.
    #[test]
    fn quantization_bound(multiplier in 1u32..=4, y in 0u16..=1023) {
        let back = dequantize(quantize(y, multiplier), multiplier);
        prop_assert!(back <= y);
        prop_assert!(((y - back) as u32) < quant_step(multiplier));
    }

    /// Line prediction stays between its endpoints and moves one way.
    #[test]
    fn render_point_monotonic(
        x0 in 0u32..1000,
        len in 1u32..1000,
        y0 in 0i32..1024,
        y1 in 0i32..1024,
    ) {
        let x1 = x0 + len;
        let (lo, hi) = (y0.min(y1), y0.max(y1));
        let mut prev = render_point(x0, x1, y0, y1, x0);
        prop_assert_eq!(prev, y0);

        for x in x0 + 1..=x1 {
            let y = render_point(x0, x1, y0, y1, x);
            prop_assert!(y >= lo && y <= hi);
            if y1 >= y0 {
                prop_assert!(y >= prev);
            } else {
                prop_assert!(y <= prev);
            }
            prev = y;
        }
        prop_assert_eq!(prev, y1);
    }

    /// A block without floor renders as exact silence at any length.
    #[test]
    fn no_floor_is_silent(spectrum in prop::collection::vec(-10.0f32..10.0, 0..300)) {
        let (lookup, _) = reference();
        let mut out = spectrum.clone();
        render(&lookup, None, &mut out).unwrap();
        prop_assert_eq!(out.len(), spectrum.len());
        prop_assert!(out.iter().all(|&v| v == 0.0));
    }
}

// =============================================================================
// Fit error bound
// =============================================================================

proptest! {
    /// A line the fitter keeps honors the over/under band on aligned samples
    /// and the mean squared error limit.
    #[test]
    fn accepted_line_within_bounds(
        mask in prop::collection::vec(-140.0f32..0.0, 64),
        aligned in prop::collection::vec(any::<bool>(), 64),
        x0 in 0u32..32,
        len in 1u32..32,
        y0 in 0i32..1024,
        y1 in 0i32..1024,
    ) {
        let params = FitParams::default();
        let x1 = x0 + len;
        prop_assume!(!inspect_error(x0, x1, y0, y1, &mask, &aligned, &params));

        let mut mse: i64 = 0;
        for x in x0..x1 {
            let y = render_point(x0, x1, y0, y1, x);
            let val = db_quant(mask[x as usize]) as i32;
            mse += ((y - val) as i64).pow(2);
            if aligned[x as usize] && (x == x0 || val != 0) {
                prop_assert!(val as f32 <= y as f32 + params.max_over);
                prop_assert!(val as f32 >= y as f32 - params.max_under);
            }
        }

        let n = len as f32;
        let band_relief = params.max_over * params.max_over / n > params.max_err
            || params.max_under * params.max_under / n > params.max_err;
        prop_assert!(band_relief || (mse / len as i64) as f32 <= params.max_err);
    }
}
