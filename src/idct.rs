//! Dequantization and the inverse DCT of one 8x8 block.
//!
//! Integer arithmetic after stb_image's `stbi__idct_block`: constants carry 12 fractional bits,
//! the column pass keeps 2 of them and the row pass shifts out the rest. Coefficients are
//! untrusted, so every product and sum wraps.

use std::array;
use std::num::Wrapping;

type Fixed = Wrapping<i32>;

/// Dequantizes `coefficients` (natural order), transforms them and writes 8 lines of 8 level
/// shifted, clamped samples to `output`, `output_linestride` bytes apart.
pub fn dequantize_and_idct_block(coefficients: &[i32; 64], quantization_table: &[u16; 64], output_linestride: usize, output: &mut [u8]) {
    let mut temp = [Wrapping(0i32); 64];

    for column in 0..8 {
        // A column with only a DC term transforms to a constant.
        if (1..8).all(|row| coefficients[column + row * 8] == 0) {
            let dc = dequantize(coefficients, quantization_table, column) << 2;
            for row in 0..8 {
                temp[column + row * 8] = dc;
            }
            continue;
        }

        let input: [Fixed; 8] = array::from_fn(|row| dequantize(coefficients, quantization_table, column + row * 8));
        let samples = idct_1d(&input, Wrapping(1 << 9));
        for row in 0..8 {
            temp[column + row * 8] = samples[row] >> 10;
        }
    }

    for row in 0..8 {
        let input: [Fixed; 8] = array::from_fn(|column| temp[row * 8 + column]);
        // 12 bits from the constants, 2 kept by the column pass and 3 from the two 1/sqrt(8)
        // normalizations. The level shift goes in before rounding.
        let samples = idct_1d(&input, Wrapping((1 << 16) + (128 << 17)));

        let line = &mut output[row * output_linestride..row * output_linestride + 8];
        for (sample, value) in line.iter_mut().zip(samples.iter()) {
            *sample = clamp_to_u8(*value >> 17);
        }
    }
}

/// One 8 point inverse DCT, scaled up by 1 << 12 plus `rounding`.
fn idct_1d(s: &[Fixed; 8], rounding: Fixed) -> [Fixed; 8] {
    // Even part.
    let p1 = (s[2] + s[6]) * fixed(0.5411961);
    let t2 = p1 + s[6] * fixed(-1.847759065);
    let t3 = p1 + s[2] * fixed(0.765366865);
    let t0 = (s[0] + s[4]) << 12;
    let t1 = (s[0] - s[4]) << 12;

    let x0 = t0 + t3 + rounding;
    let x3 = t0 - t3 + rounding;
    let x1 = t1 + t2 + rounding;
    let x2 = t1 - t2 + rounding;

    // Odd part.
    let p3 = s[7] + s[3];
    let p4 = s[5] + s[1];
    let p1 = s[7] + s[1];
    let p2 = s[5] + s[3];
    let p5 = (p3 + p4) * fixed(1.175875602);

    let p1 = p5 + p1 * fixed(-0.899976223);
    let p2 = p5 + p2 * fixed(-2.562915447);
    let p3 = p3 * fixed(-1.961570560);
    let p4 = p4 * fixed(-0.390180644);

    let o0 = s[7] * fixed(0.298631336) + p1 + p3;
    let o1 = s[5] * fixed(2.053119869) + p2 + p4;
    let o2 = s[3] * fixed(3.072711026) + p2 + p3;
    let o3 = s[1] * fixed(1.501321110) + p1 + p4;

    [x0 + o3, x1 + o2, x2 + o1, x3 + o0, x3 - o0, x2 - o1, x1 - o2, x0 - o3]
}

fn dequantize(coefficients: &[i32; 64], quantization_table: &[u16; 64], index: usize) -> Fixed {
    Wrapping(coefficients[index].wrapping_mul(quantization_table[index] as i32))
}

fn clamp_to_u8(x: Fixed) -> u8 {
    x.0.clamp(0, 255) as u8
}

fn fixed(x: f32) -> Fixed {
    Wrapping((x * 4096.0 + 0.5) as i32)
}

#[cfg(test)]
mod tests {
    use super::dequantize_and_idct_block;

    #[test]
    fn matches_known_output_for_a_photo_block() {
        let coefficients: [i32; 8 * 8] = [
            -14, -39, 58, -2, 3, 3, 0, 1,
            11, 27, 4, -3, 3, 0, 1, 0,
            -6, -13, -9, -1, -2, -1, 0, 0,
            -4, 0, -1, -2, 0, 0, 0, 0,
            3, 0, 0, 0, 0, 0, 0, 0,
            -3, -2, 0, 0, 0, 0, 0, 0,
            0, 0, 0, 0, 0, 0, 0, 0,
            0, 0, 0, 0, 0, 0, 0, 0];

        let quantization_table: [u16; 8 * 8] = [
            8, 6, 5, 8, 12, 20, 26, 31,
            6, 6, 7, 10, 13, 29, 30, 28,
            7, 7, 8, 12, 20, 29, 35, 28,
            7, 9, 11, 15, 26, 44, 40, 31,
            9, 11, 19, 28, 34, 55, 52, 39,
            12, 18, 28, 32, 41, 52, 57, 46,
            25, 32, 39, 44, 52, 61, 60, 51,
            36, 46, 48, 49, 56, 50, 52, 50];
        let mut output = [0u8; 8 * 8];
        dequantize_and_idct_block(&coefficients, &quantization_table, 8, &mut output);

        let expected = [
            118, 92, 110, 83, 77, 93, 144, 198,
            172, 116, 114, 87, 78, 93, 146, 191,
            194, 107, 91, 76, 71, 93, 160, 198,
            196, 100, 80, 74, 67, 92, 174, 209,
            182, 104, 88, 81, 68, 89, 178, 206,
            105, 64, 59, 59, 63, 94, 183, 201,
            35, 27, 28, 37, 72, 121, 203, 204,
            37, 45, 41, 47, 98, 154, 223, 208];
        assert_eq!(&output[..], &expected[..]);
    }

    #[test]
    fn zero_block_is_mid_gray() {
        let mut output = [0u8; 8 * 8];
        dequantize_and_idct_block(&[0; 64], &[255; 64], 8, &mut output);
        assert_eq!(&output[..], &[128; 64][..]);
    }

    #[test]
    fn overflowing_coefficients_wrap_instead_of_panicking() {
        let mut output = [0u8; 8 * 8];
        dequantize_and_idct_block(&[i16::MAX as i32; 64], &[u16::MAX; 64], 8, &mut output);
        let expected = [
            0, 0, 0, 255, 255, 0, 0, 255,
            0, 0, 215, 0, 0, 255, 255, 0,
            255, 255, 255, 255, 255, 0, 0, 255,
            0, 0, 255, 0, 255, 0, 255, 255,
            0, 0, 255, 255, 0, 255, 0, 0,
            255, 255, 0, 255, 255, 255, 170, 0,
            0, 255, 0, 0, 0, 0, 0, 255,
            255, 255, 0, 255, 0, 255, 0, 0];
        assert_eq!(&output[..], &expected[..]);
    }

    #[test]
    fn dc_only_block_is_flat() {
        let mut coefficients = [0i32; 64];
        coefficients[0] = 24;
        let mut output = [0u8; 8 * 8];
        dequantize_and_idct_block(&coefficients, &[1; 64], 8, &mut output);
        assert_eq!(&output[..], &[131; 8 * 8][..]);

        coefficients[0] = -8;
        dequantize_and_idct_block(&coefficients, &[1; 64], 8, &mut output);
        assert_eq!(&output[..], &[127; 8 * 8][..]);
    }

    #[test]
    fn writes_with_line_stride() {
        let mut coefficients = [0i32; 64];
        coefficients[0] = -1024;
        let mut output = [7u8; 16 * 8];
        dequantize_and_idct_block(&coefficients, &[1; 64], 16, &mut output);

        for row in output.chunks(16) {
            assert_eq!(&row[..8], &[0; 8]);
            assert_eq!(&row[8..], &[7; 8]);
        }
    }
}
