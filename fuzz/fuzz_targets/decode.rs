#![no_main]
use libfuzzer_sys::fuzz_target;

use baseline_jpeg::Decoder;

fn reference(data: &[u8]) -> Option<Vec<u8>> {
    let mut decoder = jpeg_decoder::Decoder::new(data);
    let pixels = decoder.decode().ok()?;

    match decoder.info()?.pixel_format {
        jpeg_decoder::PixelFormat::L8 => Some(pixels.iter().flat_map(|&luma| [luma, luma, luma]).collect()),
        jpeg_decoder::PixelFormat::RGB24 => Some(pixels),
        _ => None,
    }
}

fuzz_target!(|data: &[u8]| {
    let mut decoder = Decoder::new(data);
    decoder.set_max_decoding_buffer_size(1 << 26);

    // Never panics, whatever the input.
    let ours = match decoder.decode() {
        Err(_) => return,
        Ok(ours) => ours,
    };

    // Anything we decode the reference decodes to the same size.
    if let Some(reference) = reference(data) {
        assert_eq!(ours.len(), reference.len());
    }
});
