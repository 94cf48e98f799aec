use std::cmp;

use baseline_jpeg::{ColorSpace, Decoder};
use image::ColorType;
use jpeg_encoder::SamplingFactor;

use super::common;

#[test]
fn reftest() {
    let cases: &[(u32, u32, ColorType, u8)] = &[
        (16, 16, ColorType::Rgb8, 90),
        (64, 48, ColorType::Rgb8, 75),
        (37, 21, ColorType::Rgb8, 95),
        (1, 1, ColorType::Rgb8, 50),
        (8, 8, ColorType::L8, 90),
        (53, 30, ColorType::L8, 60),
        (128, 96, ColorType::L8, 100),
    ];

    for &(width, height, color_type, quality) in cases {
        let channels = if color_type == ColorType::L8 { 1 } else { 3 };
        let pixels = common::test_pattern(width, height, channels);
        let data = common::encode(&pixels, width, height, color_type, quality);

        reftest_data(&data, &format!("{}x{} {:?} q{}", width, height, color_type, quality), 2);
    }
}

#[test]
fn reftest_subsampled() {
    let cases: &[(u16, u16, SamplingFactor, u8)] = &[
        (16, 16, SamplingFactor::R_4_2_0, 90),
        (33, 17, SamplingFactor::R_4_2_0, 75),
        (37, 21, SamplingFactor::R_4_2_2, 85),
        (9, 30, SamplingFactor::R_4_2_2, 60),
        (1, 1, SamplingFactor::R_4_2_0, 80),
        (33, 17, SamplingFactor::R_4_4_0, 90),
        (37, 21, SamplingFactor::R_4_4_0, 70),
    ];

    for &(width, height, sampling, quality) in cases {
        let pixels = common::test_pattern(width as u32, height as u32, 3);
        let data = common::encode_subsampled(&pixels, width, height, sampling, quality);

        // Chroma is interpolated from two rows or columns before the rounding of the colour
        // conversion, which leaves one more level of difference than full resolution chroma.
        reftest_data(&data, &format!("{}x{} {:?} q{}", width, height, sampling, quality), 3);
    }
}

fn reftest_data(data: &[u8], name: &str, tolerance: i16) {
    let mut decoder = Decoder::new(data);
    let pixels = decoder.decode().unwrap_or_else(|err| panic!("failed to decode {}: {}", name, err));
    let info = decoder.info().unwrap();

    let mut reference = jpeg_decoder::Decoder::new(data);
    let _ = reference.decode().expect("reference decoder failed");
    let reference_info = reference.info().unwrap();

    assert_eq!(info.width, reference_info.width, "{}", name);
    assert_eq!(info.height, reference_info.height, "{}", name);
    match reference_info.pixel_format {
        jpeg_decoder::PixelFormat::L8 => assert_eq!(info.color_space, ColorSpace::Grayscale, "{}", name),
        jpeg_decoder::PixelFormat::RGB24 => assert_eq!(info.color_space, ColorSpace::YCbCr, "{}", name),
        other => panic!("{}: unexpected reference pixel format {:?}", name, other),
    }

    let reference = common::reference_decode(data);
    assert_eq!(pixels.len(), reference.len(), "{}", name);

    let mut max_diff = 0;
    let mut mismatches = 0;
    for (&a, &b) in pixels.iter().zip(reference.iter()) {
        let diff = (a as i16 - b as i16).abs();
        max_diff = cmp::max(diff, max_diff);

        if diff > tolerance {
            mismatches += 1;
        }
    }

    assert_eq!(mismatches, 0, "{}: decoding difference, maximum difference was {}", name, max_diff);
}
