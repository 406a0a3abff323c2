//! Huffman codebooks for the floor's scalar symbols
//!
//! Codewords are assigned from the length list the way Vorbis does it:
//! entries in declaration order take the lowest free codeword of their
//! length. Words travel most significant bit first inside the LSB-first
//! bit stream.

use serde::{Deserialize, Serialize};

use super::bitpack::{BitReader, BitWriter};
use super::error::{FloorError, FloorResult};

const MAX_CODEWORD_LEN: u8 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Empty,
    Branch(u32),
    Leaf(u32),
}

/// Scalar codebook
#[derive(Debug, Clone)]
pub struct Codebook {
    /// Dimensions per entry (floors only use scalar books)
    dimensions: u32,
    /// Codeword length per entry, 0 = entry unused
    lengths: Vec<u8>,
    /// Codeword per entry, most significant bit first
    codewords: Vec<u32>,
    /// Decode tree, node 0 is the root
    tree: Vec<[Node; 2]>,
}

/// Serializable codebook description (lengths are the whole book)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodebookConfig {
    #[serde(default = "default_dimensions")]
    pub dimensions: u32,
    pub lengths: Vec<u8>,
}

fn default_dimensions() -> u32 {
    1
}

impl CodebookConfig {
    pub fn new(lengths: Vec<u8>) -> Self {
        Self {
            dimensions: 1,
            lengths,
        }
    }

    pub fn build(&self) -> FloorResult<Codebook> {
        Codebook::with_dimensions(self.dimensions, &self.lengths)
    }
}

impl Codebook {
    /// Build a scalar book from per-entry codeword lengths
    pub fn from_lengths(lengths: &[u8]) -> FloorResult<Self> {
        Self::with_dimensions(1, lengths)
    }

    /// Build a book where every one of `entries` entries has the same length
    pub fn flat(entries: u32) -> FloorResult<Self> {
        if entries == 0 || !entries.is_power_of_two() {
            return Err(FloorError::InvalidCodebook(format!(
                "flat book needs a power-of-two entry count, got {}",
                entries
            )));
        }
        // a lone entry still needs a one-bit word
        let len = entries.trailing_zeros().max(1) as u8;
        Self::from_lengths(&vec![len; entries as usize])
    }

    pub fn with_dimensions(dimensions: u32, lengths: &[u8]) -> FloorResult<Self> {
        if dimensions == 0 {
            return Err(FloorError::InvalidCodebook("zero dimensions".into()));
        }
        if lengths.is_empty() {
            return Err(FloorError::InvalidCodebook("no entries".into()));
        }
        if let Some(&len) = lengths.iter().find(|&&l| l > MAX_CODEWORD_LEN) {
            return Err(FloorError::InvalidCodebook(format!(
                "codeword length {} exceeds {}",
                len, MAX_CODEWORD_LEN
            )));
        }

        let codewords = make_words(lengths)?;
        let tree = build_tree(lengths, &codewords)?;

        Ok(Self {
            dimensions,
            lengths: lengths.to_vec(),
            codewords,
            tree,
        })
    }

    /// Write `entry`, returns the number of bits written
    pub fn encode(&self, entry: u32, bits: &mut BitWriter) -> FloorResult<u32> {
        let len = self.code_length(entry).ok_or_else(|| {
            FloorError::InvalidInput(format!(
                "entry {} is not coded by this book ({} entries)",
                entry,
                self.entries()
            ))
        })?;

        let word = self.codewords[entry as usize];
        for i in (0..len as u32).rev() {
            bits.write_bit((word >> i) & 1);
        }
        Ok(len as u32)
    }

    /// Read one entry number
    pub fn decode(&self, bits: &mut BitReader<'_>) -> FloorResult<u32> {
        let mut node = 0usize;
        for _ in 0..MAX_CODEWORD_LEN {
            let bit = bits.read_bit()? as usize;
            match self.tree[node][bit] {
                Node::Leaf(entry) => return Ok(entry),
                Node::Branch(next) => node = next as usize,
                Node::Empty => {
                    return Err(FloorError::MalformedPacket(
                        "bit pattern matches no codeword".into(),
                    ))
                }
            }
        }
        Err(FloorError::MalformedPacket("codeword too long".into()))
    }

    /// Get codebook dimensions
    pub fn dimensions(&self) -> u32 {
        self.dimensions
    }

    /// Get number of entries (used or not)
    pub fn entries(&self) -> u32 {
        self.lengths.len() as u32
    }

    /// Entries that have a codeword
    pub fn used_entries(&self) -> u32 {
        self.lengths.iter().filter(|&&l| l > 0).count() as u32
    }

    /// Codeword length of `entry`, None when the entry is unused or out of range
    pub fn code_length(&self, entry: u32) -> Option<u8> {
        match self.lengths.get(entry as usize) {
            Some(&len) if len > 0 => Some(len),
            _ => None,
        }
    }
}

/// assign canonical codewords; fails on an overpopulated length list
fn make_words(lengths: &[u8]) -> FloorResult<Vec<u32>> {
    let mut marker = [0u32; 33];
    let mut words = vec![0u32; lengths.len()];

    for (i, &len) in lengths.iter().enumerate() {
        if len == 0 {
            continue;
        }
        let length = len as usize;
        let mut entry = marker[length];

        if length < 32 && (entry >> length) != 0 {
            return Err(FloorError::InvalidCodebook(
                "codeword lengths overpopulate the tree".into(),
            ));
        }
        words[i] = entry;

        // retire this node and every node below it
        for j in (1..=length).rev() {
            if marker[j] & 1 != 0 {
                if j == 1 {
                    marker[1] += 1;
                } else {
                    marker[j] = marker[j - 1] << 1;
                }
                break;
            }
            marker[j] += 1;
        }

        // hang the longer markers off the new free node
        for j in length + 1..33 {
            if (marker[j] >> 1) == entry {
                entry = marker[j];
                marker[j] = marker[j - 1] << 1;
            } else {
                break;
            }
        }
    }

    Ok(words)
}

fn build_tree(lengths: &[u8], codewords: &[u32]) -> FloorResult<Vec<[Node; 2]>> {
    let mut tree = vec![[Node::Empty; 2]];

    for (entry, (&len, &word)) in lengths.iter().zip(codewords.iter()).enumerate() {
        if len == 0 {
            continue;
        }
        let mut node = 0usize;
        for i in (0..len as u32).rev() {
            let bit = ((word >> i) & 1) as usize;
            if i == 0 {
                if tree[node][bit] != Node::Empty {
                    return Err(FloorError::InvalidCodebook(format!(
                        "codeword of entry {} collides with another entry",
                        entry
                    )));
                }
                tree[node][bit] = Node::Leaf(entry as u32);
            } else {
                node = match tree[node][bit] {
                    Node::Branch(next) => next as usize,
                    Node::Empty => {
                        tree.push([Node::Empty; 2]);
                        let next = tree.len() - 1;
                        tree[node][bit] = Node::Branch(next as u32);
                        next
                    }
                    Node::Leaf(_) => {
                        return Err(FloorError::InvalidCodebook(format!(
                            "codeword of entry {} extends a shorter codeword",
                            entry
                        )))
                    }
                };
            }
        }
    }

    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_words() {
        // lengths 2,2,2,3,3 -> 00 01 10 110 111
        let book = Codebook::from_lengths(&[2, 2, 2, 3, 3]).unwrap();
        assert_eq!(book.codewords, vec![0b00, 0b01, 0b10, 0b110, 0b111]);
    }

    #[test]
    fn test_overpopulated_rejected() {
        assert!(Codebook::from_lengths(&[1, 1, 1]).is_err());
    }
}
