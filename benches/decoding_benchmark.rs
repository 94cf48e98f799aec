use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::codecs::jpeg::JpegEncoder;
use image::ColorType;

use baseline_jpeg::{bmp, Decoder, ImageInfo};

fn encode(width: u32, height: u32, color_type: ColorType) -> Vec<u8> {
    let channels = if color_type == ColorType::L8 { 1 } else { 3 };
    let pixels: Vec<u8> = (0..height).flat_map(|y| (0..width).flat_map(move |x| {
        (0..channels).map(move |c| ((x * 3 + y * 2 + c * 50) ^ (x * y / 16)) as u8)
    })).collect();

    let mut output = Vec::new();
    JpegEncoder::new_with_quality(&mut output, 85).encode(&pixels, width, height, color_type).unwrap();
    output
}

fn read_image(image: &[u8]) -> Vec<u8> {
    Decoder::new(black_box(image)).decode().unwrap()
}

fn read_info(image: &[u8]) -> ImageInfo {
    let mut decoder = Decoder::new(black_box(image));
    decoder.read_info().unwrap();
    decoder.info().unwrap()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let color = encode(512, 512, ColorType::Rgb8);
    let grayscale = encode(512, 512, ColorType::L8);
    let pixels = read_image(&color);

    c.bench_function("decode a 512x512 JPEG", |b| b.iter(|| {
        read_image(&color)
    }));

    c.bench_function("decode a 512x512 grayscale JPEG", |b| b.iter(|| {
        read_image(&grayscale)
    }));

    c.bench_function("extract metadata from an image", |b| b.iter(|| {
        read_info(&color)
    }));

    c.bench_function("write a 512x512 BMP", |b| b.iter(|| {
        let mut output = Vec::with_capacity(pixels.len() + 64);
        bmp::write_bmp(&mut output, 512, 512, black_box(&pixels)).unwrap();
        output
    }));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
