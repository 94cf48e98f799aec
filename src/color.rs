/// Color space of the decoded components. Output is always converted to RGB.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorSpace {
    /// Monochrome
    Grayscale,
    /// Y/Cb/Cr, also known as YUV.
    YCbCr,
}

impl ColorSpace {
    pub fn num_components(&self) -> usize {
        match *self {
            ColorSpace::Grayscale => 1,
            ColorSpace::YCbCr => 3,
        }
    }

    pub(crate) fn from_component_count(count: u8) -> Option<ColorSpace> {
        match count {
            1 => Some(ColorSpace::Grayscale),
            3 => Some(ColorSpace::YCbCr),
            _ => None,
        }
    }
}

struct Rgb {
    r: u8,
    g: u8,
    b: u8,
}

struct YCbCr {
    y: u8,
    cb: u8,
    cr: u8,
}

// 16.16 fixed point factors, rounded.
const FIXED_POINT_SHIFT: i32 = 16;
const FIXED_POINT_HALF: i32 = 1 << (FIXED_POINT_SHIFT - 1);
const CR_TO_R: i32 = 91_881;  // 1.40200
const CB_TO_G: i32 = 22_554;  // 0.34414
const CR_TO_G: i32 = 46_802;  // 0.71414
const CB_TO_B: i32 = 116_130; // 1.77200

impl From<YCbCr> for Rgb {
    fn from(color: YCbCr) -> Rgb {
        // ITU-R BT.601, full range as JFIF uses it.

        let y  = (color.y as i32) << FIXED_POINT_SHIFT;
        let cb = color.cb as i32 - 128;
        let cr = color.cr as i32 - 128;

        let r = y                                + CR_TO_R * cr;
        let g = y - CB_TO_G * cb - CR_TO_G * cr;
        let b = y + CB_TO_B * cb;

        Rgb {
            r: clamp_fixed(r),
            g: clamp_fixed(g),
            b: clamp_fixed(b),
        }
    }
}

fn clamp_fixed(value: i32) -> u8 {
    ((value + FIXED_POINT_HALF) >> FIXED_POINT_SHIFT).max(0).min(255) as u8
}

/// Converts `length` interleaved YCbCr pixels at the start of `data` to RGB in place.
pub fn color_convert_line_ycbcr(data: &mut [u8], length: usize) {
    for pixel in data.chunks_exact_mut(3).take(length) {
        let rgb = Rgb::from(YCbCr {
            y:  pixel[0],
            cb: pixel[1],
            cr: pixel[2],
        });

        pixel[0] = rgb.r;
        pixel[1] = rgb.g;
        pixel[2] = rgb.b;
    }
}

/// Expands luma samples to gray RGB pixels.
pub fn color_convert_line_grayscale(input: &[u8], output: &mut [u8]) {
    for (&luma, pixel) in input.iter().zip(output.chunks_exact_mut(3)) {
        pixel[0] = luma;
        pixel[1] = luma;
        pixel[2] = luma;
    }
}
