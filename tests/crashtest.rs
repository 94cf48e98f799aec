use baseline_jpeg::{Decoder, EntropyError, Error};

mod common;

fn fixtures() -> Vec<Vec<u8>> {
    vec![
        common::encode_rgb(24, 16),
        common::encode_grayscale(17, 9),
    ]
}

#[test]
fn truncated_files_fail_cleanly() {
    for data in fixtures() {
        for length in 0..data.len() {
            let mut decoder = Decoder::new(&data[..length]);
            // Dropping only the final EOI marker byte still fails, the scan never ends.
            assert!(decoder.decode().is_err(), "truncated to {} of {} bytes", length, data.len());
        }
    }
}

#[test]
fn corrupted_files_do_not_panic() {
    for data in fixtures() {
        for position in 0..data.len() {
            for &value in &[0x00, 0x01, 0x7F, 0xC2, 0xD9, 0xFF] {
                let mut corrupted = data.clone();
                corrupted[position] = value;

                let mut decoder = Decoder::new(&corrupted[..]);
                let _ = decoder.decode();
            }
        }
    }
}

#[test]
fn truncated_scan_is_structural() {
    let data = common::encode_rgb(16, 16);
    let mut decoder = Decoder::new(&data[..data.len() - 10]);

    let error = decoder.decode().unwrap_err();
    assert!(error.is_structural(), "{:?}", error);
}

#[test]
fn huge_frame_with_little_data_is_rejected() {
    let data = common::JpegBuilder::new()
        .dqt(0, &[1; 64])
        .sof0(65535, 65535, &[(1, 0x11, 0), (2, 0x11, 0), (3, 0x11, 0)])
        .dht(0, 0, &common::SINGLE_CODE_BITS, &[0])
        .dht(1, 0, &common::SINGLE_CODE_BITS, &[0x00])
        .sos(&[(1, 0x00), (2, 0x00), (3, 0x00)])
        .entropy_coded(&[0x00])
        .eoi();

    match Decoder::new(&data[..]).decode() {
        Err(Error::Entropy(EntropyError::EndOfData)) => {},
        other => panic!("expected end of entropy-coded data, got {:?}", other.map(|pixels| pixels.len())),
    }
}

#[test]
fn buffer_limit_applies_before_the_scan_is_read() {
    let data = common::JpegBuilder::new()
        .dqt(0, &[1; 64])
        .sof0(65535, 65535, &[(1, 0x11, 0)])
        .build();

    let mut decoder = Decoder::new(&data[..]);
    decoder.set_max_decoding_buffer_size(1 << 26);
    match decoder.decode() {
        Err(Error::BufferLimit { limit, .. }) => assert_eq!(limit, 1 << 26),
        other => panic!("expected a buffer limit error, got {:?}", other.map(|pixels| pixels.len())),
    }
}
