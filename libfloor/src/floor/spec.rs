//! static floor configuration and its setup-header layout

use serde::{Deserialize, Serialize};

use crate::core::{
    BitReader, BitWriter, FloorError, FloorResult, MAX_BOOKS, MAX_CLASSES, MAX_CLASS_DIM,
    MAX_PARTITIONS, MAX_POSTS, MAX_SUB_BITS,
};

/// Entropy-coding layout shared by every partition of one class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSpec {
    /// Posts per partition of this class (1-8)
    pub dim: u8,
    /// Selector bits per post (0-3)
    #[serde(default)]
    pub sub_bits: u8,
    /// Selector book, required when `sub_bits > 0`
    #[serde(default)]
    pub book: Option<u8>,
    /// `2^sub_bits` sub-books, `None` codes only the value 0 and writes nothing
    pub sub_books: Vec<Option<u8>>,
}

impl ClassSpec {
    pub fn new(dim: u8, sub_bits: u8, book: Option<u8>, sub_books: Vec<Option<u8>>) -> Self {
        Self {
            dim,
            sub_bits,
            book,
            sub_books,
        }
    }

    /// Class without a selector, every post goes through `sub_book`
    pub fn single(dim: u8, sub_book: Option<u8>) -> Self {
        Self::new(dim, 0, None, vec![sub_book])
    }

    /// Number of sub-books addressed by the selector
    pub fn sub_count(&self) -> usize {
        1 << self.sub_bits
    }
}

/// Floor configuration, fixed for the life of a mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorSpec {
    /// Class index per partition, in declaration order
    pub partitions: Vec<u8>,
    pub classes: Vec<ClassSpec>,
    /// Amplitude resolution, 1-4
    pub multiplier: u8,
    /// log2 of the X range, the implicit right edge post sits at `2^range_bits`
    pub range_bits: u8,
    /// Declared post X values, partition by partition
    pub positions: Vec<u32>,
}

impl FloorSpec {
    /// Quantized value range for the multiplier (0 when the multiplier is invalid)
    pub fn quant_q(&self) -> u32 {
        match self.multiplier {
            1 => 256,
            2 => 128,
            3 => 86,
            4 => 64,
            _ => 0,
        }
    }

    /// X range covered by the floor
    pub fn range(&self) -> u32 {
        1 << self.range_bits
    }

    /// Total posts including both edge posts
    pub fn post_count(&self) -> usize {
        self.positions.len() + 2
    }

    /// Post X values: `[0, range, positions...]`
    pub fn post_list(&self) -> Vec<u32> {
        let mut list = Vec::with_capacity(self.post_count());
        list.push(0);
        list.push(self.range());
        list.extend_from_slice(&self.positions);
        list
    }

    /// Posts declared by the partitions
    pub fn declared_posts(&self) -> usize {
        self.partitions
            .iter()
            .filter_map(|&c| self.classes.get(c as usize))
            .map(|c| c.dim as usize)
            .sum()
    }

    /// Check the configuration against `num_books` available codebooks
    pub fn validate(&self, num_books: usize) -> FloorResult<()> {
        let bad = |msg: String| Err(FloorError::InvalidConfig(msg));

        if !(1..=4).contains(&self.multiplier) {
            return bad(format!("multiplier {} outside 1-4", self.multiplier));
        }
        if self.range_bits > 15 {
            return bad(format!("range bits {} exceed 15", self.range_bits));
        }
        if self.partitions.len() > MAX_PARTITIONS {
            return bad(format!(
                "{} partitions, at most {} allowed",
                self.partitions.len(),
                MAX_PARTITIONS
            ));
        }
        if self.classes.len() > MAX_CLASSES {
            return bad(format!(
                "{} classes, at most {} allowed",
                self.classes.len(),
                MAX_CLASSES
            ));
        }
        if num_books > MAX_BOOKS {
            return bad(format!("{} books, at most {} addressable", num_books, MAX_BOOKS));
        }

        for (i, &class) in self.partitions.iter().enumerate() {
            if class as usize >= self.classes.len() {
                return bad(format!("partition {} uses undefined class {}", i, class));
            }
        }

        for (c, class) in self.classes.iter().enumerate() {
            if class.dim == 0 || class.dim > MAX_CLASS_DIM {
                return bad(format!("class {} dimension {} outside 1-8", c, class.dim));
            }
            if class.sub_bits > MAX_SUB_BITS {
                return bad(format!("class {} has {} sub bits", c, class.sub_bits));
            }
            if class.sub_books.len() != class.sub_count() {
                return bad(format!(
                    "class {} lists {} sub-books, expected {}",
                    c,
                    class.sub_books.len(),
                    class.sub_count()
                ));
            }
            match class.book {
                Some(book) if book as usize >= num_books => {
                    return bad(format!("class {} selector book {} out of range", c, book));
                }
                None if class.sub_bits > 0 => {
                    return bad(format!("class {} needs a selector book", c));
                }
                _ => {}
            }
            for sub in class.sub_books.iter().flatten() {
                // sub-books travel as book+1 in 8 bits
                if *sub as usize >= num_books || *sub == u8::MAX {
                    return bad(format!("class {} sub-book {} out of range", c, sub));
                }
            }
        }

        let declared = self.declared_posts();
        if declared != self.positions.len() {
            return bad(format!(
                "partitions declare {} posts but {} positions are listed",
                declared,
                self.positions.len()
            ));
        }
        if self.post_count() > MAX_POSTS {
            return bad(format!(
                "{} posts, at most {} allowed",
                self.post_count(),
                MAX_POSTS
            ));
        }

        let range = self.range();
        let mut seen = vec![false; range as usize];
        seen[0] = true;
        for &x in &self.positions {
            if x >= range {
                return bad(format!("position {} outside [0, {})", x, range));
            }
            if seen[x as usize] {
                return bad(format!("position {} listed twice", x));
            }
            seen[x as usize] = true;
        }

        Ok(())
    }

    /// Highest class index used by a partition, the header carries classes up to it
    fn max_class(&self) -> Option<usize> {
        self.partitions.iter().map(|&c| c as usize).max()
    }

    /// Write the setup-header form of this floor
    ///
    /// The floor is validated first, nothing is written for an invalid one.
    pub fn pack_header(&self, bits: &mut BitWriter) -> FloorResult<()> {
        self.validate(MAX_BOOKS)?;

        bits.write_bits(self.partitions.len() as u32, 5);
        for &class in &self.partitions {
            bits.write_bits(class as u32, 4);
        }

        let used = self.max_class().map_or(0, |m| m + 1);
        for (c, class) in self.classes.iter().take(used).enumerate() {
            bits.write_bits(class.dim as u32 - 1, 3);
            bits.write_bits(class.sub_bits as u32, 2);
            if class.sub_bits > 0 {
                let book = class.book.ok_or_else(|| {
                    FloorError::InvalidConfig(format!("class {} needs a selector book", c))
                })?;
                bits.write_bits(book as u32, 8);
            }
            for sub in &class.sub_books {
                bits.write_bits(sub.map_or(0, |b| b as u32 + 1), 8);
            }
        }

        bits.write_bits(self.multiplier as u32 - 1, 2);
        bits.write_bits(self.range_bits as u32, 4);
        for &x in &self.positions {
            bits.write_bits(x, self.range_bits as u32);
        }

        Ok(())
    }

    /// Read a floor back from the setup header and validate it
    pub fn unpack_header(bits: &mut BitReader<'_>, num_books: usize) -> FloorResult<Self> {
        let count = bits.read_bits(5)? as usize;
        let mut partitions = Vec::with_capacity(count);
        for _ in 0..count {
            partitions.push(bits.read_bits(4)? as u8);
        }

        let used = partitions.iter().map(|&c| c as usize + 1).max().unwrap_or(0);
        let mut classes = Vec::with_capacity(used);
        for _ in 0..used {
            let dim = bits.read_bits(3)? as u8 + 1;
            let sub_bits = bits.read_bits(2)? as u8;
            let book = if sub_bits > 0 {
                Some(bits.read_bits(8)? as u8)
            } else {
                None
            };
            let mut sub_books = Vec::with_capacity(1 << sub_bits);
            for _ in 0..(1 << sub_bits) {
                let raw = bits.read_bits(8)?;
                sub_books.push(raw.checked_sub(1).map(|b| b as u8));
            }
            classes.push(ClassSpec::new(dim, sub_bits, book, sub_books));
        }

        let multiplier = bits.read_bits(2)? as u8 + 1;
        let range_bits = bits.read_bits(4)? as u8;

        let declared: usize = partitions
            .iter()
            .map(|&c| classes[c as usize].dim as usize)
            .sum();
        let mut positions = Vec::with_capacity(declared);
        for _ in 0..declared {
            positions.push(bits.read_bits(range_bits as u32)?);
        }

        let spec = FloorSpec {
            partitions,
            classes,
            multiplier,
            range_bits,
            positions,
        };
        spec.validate(num_books)?;
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_post_spec() -> FloorSpec {
        FloorSpec {
            partitions: vec![0],
            classes: vec![ClassSpec::single(2, None)],
            multiplier: 1,
            range_bits: 4,
            positions: vec![4, 12],
        }
    }

    #[test]
    fn test_post_list() {
        let spec = two_post_spec();
        assert_eq!(spec.post_list(), vec![0, 16, 4, 12]);
        assert_eq!(spec.quant_q(), 256);
        assert!(spec.validate(0).is_ok());
    }

    #[test]
    fn test_zero_position_rejected() {
        let mut spec = two_post_spec();
        spec.positions = vec![0, 12];
        assert!(matches!(spec.validate(0), Err(FloorError::InvalidConfig(_))));
    }
}
