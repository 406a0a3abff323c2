//! common types for the floor codec

use serde::{Deserialize, Serialize};

// constants

/// largest value a fitted post can take before quantization
pub const FIT_MAX: u16 = 1023;

/// posts per floor, including the two edge posts
pub const MAX_POSTS: usize = 65;

/// partitions per floor (5-bit field)
pub const MAX_PARTITIONS: usize = 31;

/// distinct partition classes (4-bit field)
pub const MAX_CLASSES: usize = 16;

/// posts contributed by one partition class
pub const MAX_CLASS_DIM: u8 = 8;

/// sub-book selector bits per class
pub const MAX_SUB_BITS: u8 = 3;

/// books addressable from a floor header (8-bit field)
pub const MAX_BOOKS: usize = 256;

/// implicit flag used when a post travels as a plain integer
pub const IMPLICIT_FLAG: u16 = 0x8000;

// types

/// one (x, y) control point of the floor curve, x is implied by its index
///
/// | Variant  | Meaning                                              |
/// |----------|------------------------------------------------------|
/// | Explicit | value is transmitted and anchors the rendered curve |
/// | Implicit | value equals its linear prediction, not transmitted |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Post {
    Explicit(u16),
    Implicit(u16),
}

impl Post {
    /// y value regardless of the flag
    pub fn value(self) -> u16 {
        match self {
            Post::Explicit(v) | Post::Implicit(v) => v,
        }
    }

    pub fn is_implicit(self) -> bool {
        matches!(self, Post::Implicit(_))
    }

    pub fn is_explicit(self) -> bool {
        matches!(self, Post::Explicit(_))
    }

    /// same value, now part of the rendered curve
    pub fn to_explicit(self) -> Post {
        Post::Explicit(self.value())
    }

    /// new value, flag kept
    pub fn with_value(self, value: u16) -> Post {
        match self {
            Post::Explicit(_) => Post::Explicit(value),
            Post::Implicit(_) => Post::Implicit(value),
        }
    }
}

impl From<u16> for Post {
    fn from(v: u16) -> Self {
        if v & IMPLICIT_FLAG != 0 {
            Post::Implicit(v & !IMPLICIT_FLAG)
        } else {
            Post::Explicit(v)
        }
    }
}

impl From<Post> for u16 {
    fn from(p: Post) -> u16 {
        match p {
            Post::Explicit(v) => v,
            Post::Implicit(v) => v | IMPLICIT_FLAG,
        }
    }
}

/// bits needed to represent `v` (0 for 0)
pub fn ilog(v: u32) -> u32 {
    32 - v.leading_zeros()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_wire_flag() {
        let p = Post::from(0x8000 | 37);
        assert_eq!(p, Post::Implicit(37));
        assert_eq!(u16::from(p), 0x8000 | 37);
        assert_eq!(Post::from(12), Post::Explicit(12));
        assert_eq!(p.to_explicit(), Post::Explicit(37));
        assert_eq!(p.with_value(5), Post::Implicit(5));
    }

    #[test]
    fn test_ilog() {
        assert_eq!(ilog(0), 0);
        assert_eq!(ilog(1), 1);
        assert_eq!(ilog(255), 8);
        assert_eq!(ilog(85), 7);
        assert_eq!(ilog(63), 6);
    }
}
