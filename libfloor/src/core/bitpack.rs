// LSB-first bit packing, the layout Vorbis headers and audio packets use

use super::error::{FloorError, FloorResult};

/// Bit-level writer
///
/// Bits fill each byte from the least significant end; a multi-bit value
/// is written least significant bit first.
#[derive(Debug, Clone)]
pub struct BitWriter {
    bytes: Vec<u8>,
    current_byte: u8,
    bit_pos: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        BitWriter {
            bytes: Vec::new(),
            current_byte: 0,
            bit_pos: 0,
        }
    }

    pub fn write_bit(&mut self, bit: u32) {
        if bit != 0 {
            self.current_byte |= 1 << self.bit_pos;
        }

        self.bit_pos += 1;
        if self.bit_pos == 8 {
            self.bytes.push(self.current_byte);
            self.current_byte = 0;
            self.bit_pos = 0;
        }
    }

    /// write the low `num_bits` bits of `value` (at most 32)
    pub fn write_bits(&mut self, value: u32, num_bits: u32) {
        debug_assert!(num_bits <= 32);
        for i in 0..num_bits {
            self.write_bit((value >> i) & 1);
        }
    }

    pub fn write_bool(&mut self, flag: bool) {
        self.write_bit(flag as u32);
    }

    /// total bits written so far
    pub fn bits_written(&self) -> usize {
        self.bytes.len() * 8 + self.bit_pos as usize
    }

    pub fn into_bytes(mut self) -> Vec<u8> {
        if self.bit_pos > 0 {
            self.bytes.push(self.current_byte);
        }
        self.bytes
    }

    pub fn byte_count(&self) -> usize {
        self.bytes.len() + if self.bit_pos > 0 { 1 } else { 0 }
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Bit-level reader, mirror of [`BitWriter`]
///
/// Reads that run past the end fail with [`FloorError::EndOfPacket`] and
/// leave the position untouched.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    byte_pos: usize,
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        BitReader {
            bytes,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    pub fn read_bit(&mut self) -> FloorResult<u32> {
        if self.byte_pos >= self.bytes.len() {
            return Err(FloorError::EndOfPacket);
        }

        let bit = (self.bytes[self.byte_pos] >> self.bit_pos) & 1;

        self.bit_pos += 1;
        if self.bit_pos == 8 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }

        Ok(bit as u32)
    }

    pub fn read_bool(&mut self) -> FloorResult<bool> {
        Ok(self.read_bit()? == 1)
    }

    /// read `num_bits` bits (at most 32), least significant first
    pub fn read_bits(&mut self, num_bits: u32) -> FloorResult<u32> {
        debug_assert!(num_bits <= 32);
        if self.bits_remaining() < num_bits as usize {
            return Err(FloorError::EndOfPacket);
        }

        let mut value = 0u32;
        for i in 0..num_bits {
            value |= self.read_bit()? << i;
        }
        Ok(value)
    }

    /// look at the next `num_bits` bits without consuming them
    pub fn peek_bits(&self, num_bits: u32) -> FloorResult<u32> {
        let mut probe = self.clone();
        probe.read_bits(num_bits)
    }

    pub fn bits_remaining(&self) -> usize {
        if self.byte_pos >= self.bytes.len() {
            0
        } else {
            (self.bytes.len() - self.byte_pos) * 8 - self.bit_pos as usize
        }
    }

    /// bits consumed so far
    pub fn position(&self) -> usize {
        self.byte_pos * 8 + self.bit_pos as usize
    }

    pub fn is_exhausted(&self) -> bool {
        self.byte_pos >= self.bytes.len()
    }
}
