use crate::bit_reader::BitReader;
use crate::error::{EntropyError, StructuralError, TableClass};

const LUT_BITS: u8 = 8;

/// Largest symbol alphabet a baseline table can carry (the AC alphabet).
pub const MAX_SYMBOLS: usize = 162;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HuffmanTableClass {
    DC,
    AC,
}

impl From<HuffmanTableClass> for TableClass {
    fn from(class: HuffmanTableClass) -> TableClass {
        match class {
            HuffmanTableClass::DC => TableClass::HuffmanDc,
            HuffmanTableClass::AC => TableClass::HuffmanAc,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HuffmanTable {
    class: HuffmanTableClass,
    values: Vec<u8>,
    // offsets[i] is the index of the first symbol with a code of length i + 1; offsets[16] is
    // the total symbol count.
    offsets: [usize; 17],
    value_offset: [i32; 16],
    maxcode: [i32; 16],
    lut: [(u8, u8); 1 << LUT_BITS],
}

impl HuffmanTable {
    pub fn new(bits: &[u8; 16], values: &[u8], class: HuffmanTableClass) -> Result<HuffmanTable, StructuralError> {
        let total: usize = bits.iter().map(|&count| count as usize).sum();

        if total > MAX_SYMBOLS {
            return Err(StructuralError::TooManyHuffmanSymbols(total));
        }
        debug_assert_eq!(values.len(), total);

        let (codes, sizes) = derive_huffman_codes(bits)?;

        let mut offsets = [0usize; 17];
        for i in 0..16 {
            offsets[i + 1] = offsets[i] + bits[i] as usize;
        }

        // Section F.2.2.3
        // Figure F.15

        // value_offset[i] is set to VALPTR(I) - MINCODE(I).
        let mut value_offset = [0i32; 16];
        let mut maxcode = [-1i32; 16];

        for i in 0..16 {
            if bits[i] != 0 {
                value_offset[i] = offsets[i] as i32 - codes[offsets[i]] as i32;
                maxcode[i] = codes[offsets[i + 1] - 1] as i32;
            }
        }

        let mut lut = [(0u8, 0u8); 1 << LUT_BITS];

        for (i, &value) in values.iter().enumerate().filter(|&(i, _)| sizes[i] <= LUT_BITS) {
            let bits_remaining = LUT_BITS - sizes[i];
            let start = (codes[i] << bits_remaining) as usize;

            for entry in &mut lut[start..start + (1 << bits_remaining)] {
                *entry = (value, sizes[i]);
            }
        }

        Ok(HuffmanTable {
            class,
            values: values.to_vec(),
            offsets,
            value_offset,
            maxcode,
            lut,
        })
    }

    pub fn symbol_count(&self) -> usize {
        self.offsets[16]
    }

    /// Decodes the next symbol. Codes of up to eight bits are resolved with one table lookup,
    /// longer ones bit by bit.
    // Section F.2.2.3
    // Figure F.16
    pub fn decode(&self, reader: &mut BitReader) -> Result<u8, EntropyError> {
        let (value, size) = self.lut[reader.peek_bits(LUT_BITS) as usize];

        if size > 0 {
            // The lookahead pads with zeroes, which may complete a code the data doesn't have.
            if reader.remaining() < size as usize {
                return Err(EntropyError::EndOfData);
            }

            reader.consume(size);
            return Ok(value);
        }

        let mut code = 0i32;

        for i in 0..16 {
            let bit = reader.read_bit().ok_or(EntropyError::EndOfData)?;
            code = (code << 1) | bit as i32;

            if code <= self.maxcode[i] {
                return Ok(self.values[(code + self.value_offset[i]) as usize]);
            }
        }

        Err(EntropyError::InvalidCode { class: self.class.into() })
    }
}

/// Generates the canonical codes for a table from its per-length symbol counts. Returns the
/// code of each symbol and its length in bits, in symbol order.
fn derive_huffman_codes(bits: &[u8; 16]) -> Result<(Vec<u16>, Vec<u8>), StructuralError> {
    // Figure C.1
    let huffsize = bits.iter()
                       .enumerate()
                       .fold(Vec::new(), |mut acc, (i, &value)| {
                           acc.extend(std::iter::repeat((i + 1) as u8).take(value as usize));
                           acc
                       });

    // Figure C.2
    let mut huffcode = vec![0u16; huffsize.len()];
    let mut size = 1u8;
    let mut code = 0u32;

    for (i, &v) in huffsize.iter().enumerate() {
        while size < v {
            code <<= 1;
            size += 1;
        }

        if code >= (1u32 << size) {
            return Err(StructuralError::InvalidHuffmanCodeLengths);
        }

        huffcode[i] = code as u16;
        code += 1;
    }

    Ok((huffcode, huffsize))
}
