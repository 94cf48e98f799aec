/// MSB-first bit cursor over de-stuffed entropy-coded data.
///
/// Reads never fail loudly: running past the end of the data yields `None` and leaves the
/// cursor where it was, so the caller decides which fault to report.
#[derive(Debug)]
pub struct BitReader<'a> {
    data: &'a [u8],
    next_byte: usize,
    next_bit: u8,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> BitReader<'a> {
        BitReader {
            data,
            next_byte: 0,
            next_bit: 0,
        }
    }

    /// Number of bits left before the end of the data.
    #[inline]
    pub fn remaining(&self) -> usize {
        if self.next_byte >= self.data.len() {
            0
        } else {
            (self.data.len() - self.next_byte) * 8 - self.next_bit as usize
        }
    }

    pub fn read_bit(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.next_byte)?;
        let bit = (byte >> (7 - self.next_bit)) & 1;

        self.next_bit += 1;
        if self.next_bit == 8 {
            self.next_bit = 0;
            self.next_byte += 1;
        }

        Some(bit)
    }

    /// Reads `count` bits (at most 32) into the low bits of the result. Nothing is consumed
    /// when fewer than `count` bits are left.
    pub fn read_bits(&mut self, count: u8) -> Option<u32> {
        debug_assert!(count <= 32);

        if self.remaining() < count as usize {
            return None;
        }

        let value = self.peek_bits(count);
        self.consume(count);
        Some(value)
    }

    /// Returns the next `count` bits (at most 32) without consuming them, padding with zero
    /// bits past the end of the data.
    pub fn peek_bits(&self, count: u8) -> u32 {
        debug_assert!(count <= 32);

        let mut value = 0u64;
        let mut filled = 0u32;
        let mut index = self.next_byte;

        while filled < count as u32 + self.next_bit as u32 {
            let byte = self.data.get(index).copied().unwrap_or(0);
            value = (value << 8) | byte as u64;
            filled += 8;
            index += 1;
        }

        let unwanted_low_bits = filled - self.next_bit as u32 - count as u32;
        let mask = (1u64 << count) - 1;
        ((value >> unwanted_low_bits) & mask) as u32
    }

    /// Advances the cursor by `count` bits. The caller must have checked `remaining`.
    #[inline]
    pub fn consume(&mut self, count: u8) {
        debug_assert!(self.remaining() >= count as usize);

        let position = self.next_bit as usize + count as usize;
        self.next_byte += position / 8;
        self.next_bit = (position % 8) as u8;
    }

    /// Moves to the first bit of the next byte unless already there.
    pub fn align(&mut self) {
        if self.next_byte >= self.data.len() {
            return;
        }

        if self.next_bit != 0 {
            self.next_bit = 0;
            self.next_byte += 1;
        }
    }
}
