//! Uncompressed 24-bit BMP output.
//!
//! The file is a 14 byte file header followed by a 12 byte `BITMAPCOREHEADER`, so dimensions
//! are limited to 16 bits, which matches what a JPEG frame can describe.

use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

const FILE_HEADER_SIZE: u32 = 14;
const CORE_HEADER_SIZE: u32 = 12;
const PIXEL_DATA_OFFSET: u32 = FILE_HEADER_SIZE + CORE_HEADER_SIZE;

/// Size in bytes of one stored row. Rows are padded to a multiple of four bytes.
fn row_size(width: u16) -> usize {
    width as usize * 3 + width as usize % 4
}

/// Writes `rgb`, `height` rows of `width` RGB triples from the top down, as a BMP file.
pub fn write_bmp<W: Write>(mut writer: W, width: u16, height: u16, rgb: &[u8]) -> io::Result<()> {
    let line_size = width as usize * 3;

    if rgb.len() != line_size * height as usize {
        return Err(io::Error::new(io::ErrorKind::InvalidInput,
                                  format!("expected {} bytes of pixel data for {}x{}, got {}",
                                          line_size * height as usize, width, height, rgb.len())));
    }

    let file_size = PIXEL_DATA_OFFSET as u64 + row_size(width) as u64 * height as u64;
    if file_size > u32::MAX as u64 {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "image too large for a BMP file"));
    }

    // BITMAPFILEHEADER
    writer.write_all(b"BM")?;
    writer.write_u32::<LittleEndian>(file_size as u32)?;
    writer.write_u16::<LittleEndian>(0)?;
    writer.write_u16::<LittleEndian>(0)?;
    writer.write_u32::<LittleEndian>(PIXEL_DATA_OFFSET)?;

    // BITMAPCOREHEADER
    writer.write_u32::<LittleEndian>(CORE_HEADER_SIZE)?;
    writer.write_u16::<LittleEndian>(width)?;
    writer.write_u16::<LittleEndian>(height)?;
    writer.write_u16::<LittleEndian>(1)?;
    writer.write_u16::<LittleEndian>(24)?;

    let mut row = vec![0u8; row_size(width)];

    if line_size > 0 {
        // Bottom-up, blue first.
        for line in rgb.chunks_exact(line_size).rev() {
            for (stored, pixel) in row.chunks_exact_mut(3).zip(line.chunks_exact(3)) {
                stored[0] = pixel[2];
                stored[1] = pixel[1];
                stored[2] = pixel[0];
            }

            writer.write_all(&row)?;
        }
    }

    writer.flush()
}
