//! Greedy least-squares fitting of the floor curve
//!
//! The fitter starts from one line over the whole range and splits it at
//! posts (in declaration order) wherever the line strays too far from the
//! target curve. All decisions run on the 0..=1023 quantized dB scale.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::lookup::FloorLookup;
use super::render::render_point;
use crate::core::{db_quant, FloorError, FloorResult, Post, FIT_MAX};

/// Fit tuning knobs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitParams {
    /// Largest allowed overshoot of an aligned sample above the line
    pub max_over: f32,
    /// Largest allowed undershoot of an aligned sample below the line
    pub max_under: f32,
    /// Largest allowed mean squared error of a segment
    pub max_err: f32,
    /// Extra weight of aligned samples in the least-squares fit
    pub two_fit_weight: f32,
    /// dB margin under which a spectral line still counts as aligned
    pub two_fit_atten: f32,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            max_over: 60.0,
            max_under: 30.0,
            max_err: 500.0,
            two_fit_weight: 1.0,
            two_fit_atten: 18.0,
        }
    }
}

impl FitParams {
    pub fn with_max_over(mut self, max_over: f32) -> Self {
        self.max_over = max_over;
        self
    }

    pub fn with_max_under(mut self, max_under: f32) -> Self {
        self.max_under = max_under;
        self
    }

    pub fn with_max_err(mut self, max_err: f32) -> Self {
        self.max_err = max_err;
        self
    }

    pub fn with_two_fit_weight(mut self, weight: f32) -> Self {
        self.two_fit_weight = weight;
        self
    }

    pub fn with_two_fit_atten(mut self, atten: f32) -> Self {
        self.two_fit_atten = atten;
        self
    }
}

/// Per-bin "this spectral line sits near the mask" signal
pub fn tone_alignment(log_mdct: &[f32], log_mask: &[f32], two_fit_atten: f32) -> Vec<bool> {
    log_mdct
        .iter()
        .zip(log_mask)
        .map(|(&mdct, &mask)| mdct + two_fit_atten >= mask)
        .collect()
}

/// Weighted least-squares sums over one minimal interval between sorted posts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineAccumulator {
    pub x0: u32,
    pub x1: u32,
    pub xa: i64,
    pub ya: i64,
    pub x2a: i64,
    pub y2a: i64,
    pub xya: i64,
    pub an: i64,
}

#[derive(Default)]
struct Sums {
    x: i64,
    y: i64,
    x2: i64,
    y2: i64,
    xy: i64,
    n: i64,
}

impl Sums {
    fn add(&mut self, x: i64, y: i64) {
        self.x += x;
        self.y += y;
        self.x2 += x * x;
        self.y2 += y * y;
        self.xy += x * y;
        self.n += 1;
    }
}

impl LineAccumulator {
    /// Collect the non-zero samples of `[x0, x1]` (clipped to `n - 1`)
    ///
    /// Aligned samples are weighted toward by `nb * two_fit_weight / (na + 1)`.
    /// Returns the accumulator and the number of aligned non-zero samples.
    pub fn accumulate(
        x0: u32,
        x1: u32,
        n: u32,
        log_mask: &[f32],
        aligned: &[bool],
        two_fit_weight: f32,
    ) -> (Self, i64) {
        let mut a = Sums::default();
        let mut b = Sums::default();

        let last = x1.min(n.saturating_sub(1));
        for i in x0..=last {
            let i = i as usize;
            let quantized = db_quant(log_mask[i]) as i64;
            if quantized == 0 {
                continue;
            }
            if aligned[i] {
                a.add(i as i64, quantized);
            } else {
                b.add(i as i64, quantized);
            }
        }

        // the full bucket covers every sample
        b.x += a.x;
        b.y += a.y;
        b.x2 += a.x2;
        b.y2 += a.y2;
        b.xy += a.xy;
        b.n += a.n;

        let weight = (b.n as f32 * two_fit_weight / (a.n + 1) as f32) as i64;

        let acc = LineAccumulator {
            x0,
            x1,
            xa: a.x * weight + b.x,
            ya: a.y * weight + b.y,
            x2a: a.x2 * weight + b.x2,
            y2a: a.y2 * weight + b.y2,
            xya: a.xy * weight + b.xy,
            an: a.n * weight + b.n,
        };
        (acc, a.n)
    }
}

fn clamp_fit(y: f64) -> i32 {
    // rounded in single precision, half to even
    let y = (y as f32).round_ties_even() as i32;
    y.clamp(0, FIT_MAX as i32)
}

/// Least-squares line over the accumulators, evaluated at both ends
///
/// Known end values are folded in as extra samples. With no samples at all
/// the line is flat at 0.
pub fn fit_line(accs: &[LineAccumulator], y0: Option<i32>, y1: Option<i32>) -> (i32, i32) {
    let (Some(first), Some(last)) = (accs.first(), accs.last()) else {
        return (0, 0);
    };
    let x0 = first.x0 as i64;
    let x1 = last.x1 as i64;

    let mut s = Sums::default();
    for acc in accs {
        s.x += acc.xa;
        s.y += acc.ya;
        s.x2 += acc.x2a;
        s.y2 += acc.y2a;
        s.xy += acc.xya;
        s.n += acc.an;
    }
    if let Some(y0) = y0 {
        s.add(x0, y0 as i64);
    }
    if let Some(y1) = y1 {
        s.add(x1, y1 as i64);
    }

    if s.n == 0 {
        return (0, 0);
    }

    let (fx, fy, fx2, fxy, an) = (s.x as f64, s.y as f64, s.x2 as f64, s.xy as f64, s.n as f64);
    let denom = 1.0 / (an * fx2 - fx * fx);
    let a = (fy * fx2 - fxy * fx) * denom;
    let b = (an * fxy - fx * fy) * denom;

    (clamp_fit(a + b * x0 as f64), clamp_fit(a + b * x1 as f64))
}

/// Walk the line (x0,y0)-(x1,y1) against the target and decide whether to split
///
/// Splits when an aligned non-zero sample leaves the over/under band, or
/// when the mean squared error tops `max_err` (unless the band itself
/// already exceeds it for this length).
pub fn inspect_error(
    x0: u32,
    x1: u32,
    y0: i32,
    y1: i32,
    log_mask: &[f32],
    aligned: &[bool],
    params: &FitParams,
) -> bool {
    let dy = y1 - y0;
    let adx = (x1 - x0) as i32;
    let base = dy / adx;
    let sy = if dy < 0 { base - 1 } else { base + 1 };
    let ady = dy.abs() - (base * adx).abs();

    let out_of_band = |y: i32, val: i32| {
        y as f32 + params.max_over < val as f32 || y as f32 - params.max_under > val as f32
    };

    let mut x = x0 as usize;
    let mut y = y0;
    let mut err = 0;

    let val = db_quant(log_mask[x]) as i32;
    let mut mse = ((y - val) as i64).pow(2);
    let mut n: i64 = 1;
    if aligned[x] && out_of_band(y, val) {
        return true;
    }

    x += 1;
    while x < x1 as usize {
        err += ady;
        if err >= adx {
            err -= adx;
            y += sy;
        } else {
            y += base;
        }

        let val = db_quant(log_mask[x]) as i32;
        mse += ((y - val) as i64).pow(2);
        n += 1;
        if aligned[x] && val != 0 && out_of_band(y, val) {
            return true;
        }
        x += 1;
    }

    if params.max_over * params.max_over / n as f32 > params.max_err {
        return false;
    }
    if params.max_under * params.max_under / n as f32 > params.max_err {
        return false;
    }
    (mse / n) as f32 > params.max_err
}

/// Blend two fits, `del` runs from 0 (all `a`) to 65536 (all `b`)
///
/// A post stays implicit only when it is implicit in both inputs. Either
/// input missing means no floor.
pub fn interpolate_fit(
    a: Option<&[Post]>,
    b: Option<&[Post]>,
    del: u32,
) -> FloorResult<Option<Vec<Post>>> {
    let (Some(a), Some(b)) = (a, b) else {
        return Ok(None);
    };
    if a.len() != b.len() {
        return Err(FloorError::InvalidInput(format!(
            "cannot blend fits of {} and {} posts",
            a.len(),
            b.len()
        )));
    }
    if del > 65536 {
        return Err(FloorError::InvalidInput(format!(
            "blend weight {} exceeds 65536",
            del
        )));
    }

    let del = del as u64;
    let blended = a
        .iter()
        .zip(b)
        .map(|(&pa, &pb)| {
            let v = ((65536 - del) * pa.value() as u64 + del * pb.value() as u64 + 32768) >> 16;
            let v = v as u16;
            if pa.is_implicit() && pb.is_implicit() {
                Post::Implicit(v)
            } else {
                Post::Explicit(v)
            }
        })
        .collect();
    Ok(Some(blended))
}

fn post_y(fit_a: &[Option<i32>], fit_b: &[Option<i32>], pos: usize) -> Option<i32> {
    match (fit_a[pos], fit_b[pos]) {
        (None, b) => b,
        (a, None) => a,
        (Some(a), Some(b)) => Some((a + b) >> 1),
    }
}

/// Fits posts for one block against a shared [`FloorLookup`]
#[derive(Debug, Clone)]
pub struct CurveFitter<'a> {
    lookup: &'a FloorLookup,
    params: FitParams,
}

impl<'a> CurveFitter<'a> {
    pub fn new(lookup: &'a FloorLookup, params: FitParams) -> Self {
        Self { lookup, params }
    }

    /// Fit from the log spectrum and the log masking curve
    pub fn fit_spectrum(
        &self,
        log_mdct: &[f32],
        log_mask: &[f32],
    ) -> FloorResult<Option<Vec<Post>>> {
        if log_mdct.len() != log_mask.len() {
            return Err(FloorError::InvalidInput(format!(
                "spectrum has {} bins, mask has {}",
                log_mdct.len(),
                log_mask.len()
            )));
        }
        let aligned = tone_alignment(log_mdct, log_mask, self.params.two_fit_atten);
        self.fit(log_mask, &aligned)
    }

    /// Fit posts to `log_mask`; `None` means the block needs no floor
    ///
    /// Returned values are on the 0..=1023 scale, not yet quantized.
    pub fn fit(&self, log_mask: &[f32], aligned: &[bool]) -> FloorResult<Option<Vec<Post>>> {
        let lookup = self.lookup;
        let n = lookup.n();
        let posts = lookup.posts();

        if log_mask.len() < n as usize || aligned.len() < n as usize {
            return Err(FloorError::InvalidInput(format!(
                "fit needs {} bins, got mask {} and alignment {}",
                n,
                log_mask.len(),
                aligned.len()
            )));
        }

        let mut fits = Vec::with_capacity(posts - 1);
        let mut nonzero = 0;
        for sorted in 0..posts - 1 {
            let (acc, na) = LineAccumulator::accumulate(
                lookup.sorted_x(sorted),
                lookup.sorted_x(sorted + 1),
                n,
                log_mask,
                aligned,
                self.params.two_fit_weight,
            );
            fits.push(acc);
            nonzero += na;
        }

        if nonzero == 0 {
            debug!("no aligned energy, block has no floor");
            return Ok(None);
        }

        let mut fit_a: Vec<Option<i32>> = vec![None; posts];
        let mut fit_b: Vec<Option<i32>> = vec![None; posts];
        // dynamic neighbors, indexed by sorted position
        let mut lo_nb = vec![0usize; posts];
        let mut hi_nb = vec![1usize; posts];
        let mut inspected: HashSet<(usize, usize)> = HashSet::new();

        let (y0, y1) = fit_line(&fits, None, None);
        fit_a[0] = Some(y0);
        fit_b[0] = Some(y0);
        fit_a[1] = Some(y1);
        fit_b[1] = Some(y1);

        for i in 2..posts {
            let sortpos = lookup.reverse(i);
            let ln = lo_nb[sortpos];
            let hn = hi_nb[sortpos];

            if !inspected.insert((ln, hn)) {
                continue;
            }

            // neighbors always carry a fit by now
            let (Some(ly), Some(hy)) = (post_y(&fit_a, &fit_b, ln), post_y(&fit_a, &fit_b, hn))
            else {
                continue;
            };

            if !inspect_error(lookup.x(ln), lookup.x(hn), ly, hy, log_mask, aligned, &self.params) {
                fit_a[i] = None;
                fit_b[i] = None;
                continue;
            }

            let lsortpos = lookup.reverse(ln);
            let hsortpos = lookup.reverse(hn);
            let (ly0, ly1) = fit_line(&fits[lsortpos..sortpos], None, None);
            let (hy0, hy1) = fit_line(&fits[sortpos..hsortpos], None, None);
            trace!(post = i, ln, hn, ly0, ly1, hy0, hy1, "split");

            fit_b[ln] = Some(ly0);
            if ln == 0 {
                fit_a[ln] = Some(ly0);
            }
            fit_a[i] = Some(ly1);
            fit_b[i] = Some(hy0);
            fit_a[hn] = Some(hy1);
            if hn == 1 {
                fit_b[hn] = Some(hy1);
            }

            for j in (0..sortpos).rev() {
                if hi_nb[j] != hn {
                    break;
                }
                hi_nb[j] = i;
            }
            for j in sortpos + 1..posts {
                if lo_nb[j] != ln {
                    break;
                }
                lo_nb[j] = i;
            }
        }

        let mut output = Vec::with_capacity(posts);
        output.push(Post::Explicit(post_y(&fit_a, &fit_b, 0).unwrap_or(0) as u16));
        output.push(Post::Explicit(post_y(&fit_a, &fit_b, 1).unwrap_or(0) as u16));

        for i in 2..posts {
            let ln = lookup.lo_neighbor(i);
            let hn = lookup.hi_neighbor(i);
            let predicted = render_point(
                lookup.x(ln),
                lookup.x(hn),
                output[ln].value() as i32,
                output[hn].value() as i32,
                lookup.x(i),
            );
            let post = match post_y(&fit_a, &fit_b, i) {
                Some(vx) if vx != predicted => Post::Explicit(vx as u16),
                _ => Post::Implicit(predicted as u16),
            };
            output.push(post);
        }

        debug!(
            posts,
            explicit = output.iter().filter(|p| p.is_explicit()).count(),
            "fitted floor"
        );
        Ok(Some(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_line_through_points() {
        let accs = [LineAccumulator {
            x0: 0,
            x1: 10,
            ..Default::default()
        }];
        assert_eq!(fit_line(&accs, Some(100), Some(200)), (100, 200));
        assert_eq!(fit_line(&accs, None, None), (0, 0));
    }

    #[test]
    fn test_interpolate_fit_flags() {
        let a = [Post::Implicit(100), Post::Explicit(0)];
        let b = [Post::Implicit(200), Post::Implicit(100)];
        let mid = interpolate_fit(Some(&a), Some(&b), 32768).unwrap().unwrap();
        assert_eq!(mid, vec![Post::Implicit(150), Post::Explicit(50)]);
        assert_eq!(interpolate_fit(None, Some(&b), 0).unwrap(), None);
    }
}
