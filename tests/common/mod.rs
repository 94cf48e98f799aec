#![allow(dead_code)]

//! Helpers for building JPEG streams by hand and encoding fixtures with `image` and `jpeg-encoder`.

use image::codecs::jpeg::JpegEncoder;
use image::ColorType;
use jpeg_encoder::SamplingFactor;

/// Code lengths of a DC table holding categories 0 to 11, all with 4 bit codes. The code of
/// category `s` is `s` itself.
pub const DC_CATEGORY_BITS: [u8; 16] = [0, 0, 0, 12, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
pub const DC_CATEGORY_SYMBOLS: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

/// A table with the single one bit code "0".
pub const SINGLE_CODE_BITS: [u8; 16] = [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];

/// Appends marker segments to a stream that starts with SOI.
pub struct JpegBuilder {
    data: Vec<u8>,
}

impl JpegBuilder {
    pub fn new() -> JpegBuilder {
        JpegBuilder {
            data: vec![0xFF, 0xD8],
        }
    }

    /// A marker segment whose length field is computed from `payload`.
    pub fn segment(mut self, marker: u8, payload: &[u8]) -> JpegBuilder {
        let length = payload.len() as u16 + 2;

        self.data.extend_from_slice(&[0xFF, marker]);
        self.data.extend_from_slice(&length.to_be_bytes());
        self.data.extend_from_slice(payload);
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> JpegBuilder {
        self.data.extend_from_slice(bytes);
        self
    }

    /// An 8-bit quantization table, given in zigzag order.
    pub fn dqt(self, id: u8, table: &[u8; 64]) -> JpegBuilder {
        let mut payload = vec![id];
        payload.extend_from_slice(table);
        self.segment(0xDB, &payload)
    }

    /// `class` is 0 for DC and 1 for AC.
    pub fn dht(self, class: u8, id: u8, bits: &[u8; 16], symbols: &[u8]) -> JpegBuilder {
        let mut payload = vec![(class << 4) | id];
        payload.extend_from_slice(bits);
        payload.extend_from_slice(symbols);
        self.segment(0xC4, &payload)
    }

    /// Components are `(id, sampling factors, quantization table)`, the sampling factors packed
    /// as in the segment.
    pub fn sof0(self, width: u16, height: u16, components: &[(u8, u8, u8)]) -> JpegBuilder {
        let mut payload = vec![8];
        payload.extend_from_slice(&height.to_be_bytes());
        payload.extend_from_slice(&width.to_be_bytes());
        payload.push(components.len() as u8);
        for &(id, sampling, table) in components {
            payload.extend_from_slice(&[id, sampling, table]);
        }
        self.segment(0xC0, &payload)
    }

    pub fn dri(self, interval: u16) -> JpegBuilder {
        self.segment(0xDD, &interval.to_be_bytes())
    }

    /// Components are `(id, tables)`, the DC and AC table ids packed as in the segment.
    pub fn sos(self, components: &[(u8, u8)]) -> JpegBuilder {
        let mut payload = vec![components.len() as u8];
        for &(id, tables) in components {
            payload.extend_from_slice(&[id, tables]);
        }
        payload.extend_from_slice(&[0, 63, 0]);
        self.segment(0xDA, &payload)
    }

    /// Entropy-coded bytes, stuffing a zero after every 0xFF.
    pub fn entropy_coded(mut self, bytes: &[u8]) -> JpegBuilder {
        for &byte in bytes {
            self.data.push(byte);
            if byte == 0xFF {
                self.data.push(0x00);
            }
        }
        self
    }

    pub fn rst(self, n: u8) -> JpegBuilder {
        self.raw(&[0xFF, 0xD0 + n])
    }

    pub fn eoi(self) -> Vec<u8> {
        self.raw(&[0xFF, 0xD9]).data
    }

    pub fn build(self) -> Vec<u8> {
        self.data
    }
}

/// MSB-first bit writer, padding the last byte with one bits.
#[derive(Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    current: u8,
    count: u8,
}

impl BitWriter {
    pub fn new() -> BitWriter {
        BitWriter::default()
    }

    /// Writes the low `count` bits of `value`.
    pub fn write(&mut self, value: u32, count: u8) {
        for i in (0..count).rev() {
            self.current = (self.current << 1) | ((value >> i) & 1) as u8;
            self.count += 1;

            if self.count == 8 {
                self.bytes.push(self.current);
                self.current = 0;
                self.count = 0;
            }
        }
    }

    /// Pads to a byte boundary.
    pub fn align(&mut self) {
        if self.count > 0 {
            let padding = 8 - self.count;
            self.write((1 << padding) - 1, padding);
        }
    }

    /// A block with only a DC difference, coded with the `DC_CATEGORY_*` table and an AC table
    /// whose only code "0" is end of block.
    pub fn dc_only_block(&mut self, difference: i32) {
        let category = dc_category(difference);
        self.write(category as u32, 4);

        if category > 0 {
            let magnitude = if difference < 0 {
                difference + (1 << category) - 1
            } else {
                difference
            };
            self.write(magnitude as u32, category);
        }

        self.write(0, 1);
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.align();
        self.bytes
    }
}

fn dc_category(difference: i32) -> u8 {
    (32 - difference.unsigned_abs().leading_zeros()) as u8
}

/// A smooth pattern with some detail, `channels` interleaved samples per pixel.
pub fn test_pattern(width: u32, height: u32, channels: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * channels);

    for y in 0..height {
        for x in 0..width {
            for c in 0..channels as u32 {
                let gradient = (x * 255 / width.max(1) + y * 127 / height.max(1) + c * 60) % 256;
                let checker = if (x / 4 + y / 4 + c) % 2 == 0 { 0 } else { 40 };
                pixels.push(((gradient + checker) % 256) as u8);
            }
        }
    }

    pixels
}

/// Encodes `pixels` as a baseline JPEG.
pub fn encode(pixels: &[u8], width: u32, height: u32, color_type: ColorType, quality: u8) -> Vec<u8> {
    let mut output = Vec::new();
    JpegEncoder::new_with_quality(&mut output, quality).encode(pixels, width, height, color_type)
                                                      .expect("failed to encode fixture");
    output
}

/// Encodes RGB `pixels` as a baseline JPEG with the chroma subsampled as `sampling` says.
pub fn encode_subsampled(pixels: &[u8], width: u16, height: u16, sampling: SamplingFactor, quality: u8) -> Vec<u8> {
    let mut output = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut output, quality);
    encoder.set_sampling_factor(sampling);
    encoder.encode(pixels, width, height, jpeg_encoder::ColorType::Rgb)
           .expect("failed to encode fixture");
    output
}

pub fn encode_rgb(width: u32, height: u32) -> Vec<u8> {
    encode(&test_pattern(width, height, 3), width, height, ColorType::Rgb8, 90)
}

pub fn encode_grayscale(width: u32, height: u32) -> Vec<u8> {
    encode(&test_pattern(width, height, 1), width, height, ColorType::L8, 90)
}

/// Decodes with `jpeg-decoder`, expanding grayscale to RGB.
pub fn reference_decode(data: &[u8]) -> Vec<u8> {
    let mut decoder = jpeg_decoder::Decoder::new(data);
    let pixels = decoder.decode().expect("reference decoder failed");
    let info = decoder.info().expect("reference decoder has no info");

    match info.pixel_format {
        jpeg_decoder::PixelFormat::L8 => pixels.iter().flat_map(|&luma| [luma, luma, luma]).collect(),
        jpeg_decoder::PixelFormat::RGB24 => pixels,
        other => panic!("unexpected reference pixel format {:?}", other),
    }
}
