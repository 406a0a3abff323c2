use tracing::debug;

use super::spec::FloorSpec;
use crate::core::{ilog, FloorResult};

/// Tables derived once from a [`FloorSpec`]
///
/// Read-only after construction; share it behind `&` or `Arc` between
/// the encoder, the decoder and worker threads.
#[derive(Debug, Clone)]
pub struct FloorLookup {
    spec: FloorSpec,
    /// post X values in declaration order
    post_list: Vec<u32>,
    /// sorted position -> post
    forward_index: Vec<usize>,
    /// post -> sorted position
    reverse_index: Vec<usize>,
    /// X values in sorted order
    sorted_x: Vec<u32>,
    /// causal neighbors, meaningful from post 2 on
    lo_neighbor: Vec<usize>,
    hi_neighbor: Vec<usize>,
    n: u32,
    quant_q: u32,
}

impl FloorLookup {
    /// Validate `spec` against `num_books` codebooks and build the tables
    pub fn new(spec: FloorSpec, num_books: usize) -> FloorResult<Self> {
        spec.validate(num_books)?;

        let post_list = spec.post_list();
        let posts = post_list.len();
        let n = spec.range();

        let mut forward_index: Vec<usize> = (0..posts).collect();
        forward_index.sort_by_key(|&i| post_list[i]);

        let mut reverse_index = vec![0; posts];
        for (sorted, &post) in forward_index.iter().enumerate() {
            reverse_index[post] = sorted;
        }

        let sorted_x = forward_index.iter().map(|&i| post_list[i]).collect();

        // closest earlier post on each side, defaulting to the edge posts
        let mut lo_neighbor = vec![0; posts];
        let mut hi_neighbor = vec![1; posts];
        for i in 2..posts {
            let current = post_list[i];
            let (mut lx, mut hx) = (0, n);
            for (j, &x) in post_list.iter().enumerate().take(i) {
                if x > lx && x < current {
                    lo_neighbor[i] = j;
                    lx = x;
                }
                if x < hx && x > current {
                    hi_neighbor[i] = j;
                    hx = x;
                }
            }
        }

        let quant_q = spec.quant_q();
        debug!(posts, n, quant_q, "built floor lookup");

        Ok(Self {
            spec,
            post_list,
            forward_index,
            reverse_index,
            sorted_x,
            lo_neighbor,
            hi_neighbor,
            n,
            quant_q,
        })
    }

    pub fn spec(&self) -> &FloorSpec {
        &self.spec
    }

    /// Total posts, edges included
    pub fn posts(&self) -> usize {
        self.post_list.len()
    }

    /// X range, also the X of post 1
    pub fn n(&self) -> u32 {
        self.n
    }

    pub fn quant_q(&self) -> u32 {
        self.quant_q
    }

    pub fn multiplier(&self) -> u32 {
        self.spec.multiplier as u32
    }

    /// X of post `i`
    pub fn x(&self, i: usize) -> u32 {
        self.post_list[i]
    }

    pub fn post_list(&self) -> &[u32] {
        &self.post_list
    }

    /// Post at sorted position `sorted`
    pub fn forward(&self, sorted: usize) -> usize {
        self.forward_index[sorted]
    }

    /// Sorted position of post `post`
    pub fn reverse(&self, post: usize) -> usize {
        self.reverse_index[post]
    }

    /// X at sorted position `sorted`
    pub fn sorted_x(&self, sorted: usize) -> u32 {
        self.sorted_x[sorted]
    }

    pub fn lo_neighbor(&self, post: usize) -> usize {
        self.lo_neighbor[post]
    }

    pub fn hi_neighbor(&self, post: usize) -> usize {
        self.hi_neighbor[post]
    }

    /// Bits used by each of the two raw edge values
    pub fn edge_bits(&self) -> u32 {
        ilog(self.quant_q - 1)
    }
}
