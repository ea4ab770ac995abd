// THEORY:
// The `mask` module holds the per-pixel image operations the motion extractor is
// built from: absolute difference, binary threshold and a normalized box blur.
// Each one is a pure function from one 8-bit single-channel image to another of
// the same dimensions, so the extractor reads as a short chain of calls.
//
// Threshold -> blur -> threshold is the noise-suppression idiom used on the
// difference image. The first threshold makes the image binary, the blur spreads
// every foreground pixel over its K x K neighbourhood (isolated specks fall below
// the level, nearby fragments merge), and the second threshold collapses the gray
// fringe so the result is strictly binary again.

use image::GrayImage;

/// Pixel value of the foreground level in a binary mask.
pub const FOREGROUND: u8 = 255;
/// Pixel value of the background level in a binary mask.
pub const BACKGROUND: u8 = 0;

/// Per-pixel `|a - b|`. Both images must share dimensions.
pub fn absolute_difference(current: &GrayImage, previous: &GrayImage) -> GrayImage {
    debug_assert_eq!(current.dimensions(), previous.dimensions());
    let (width, height) = current.dimensions();
    let data = current
        .iter()
        .zip(previous.iter())
        .map(|(a, b)| a.abs_diff(*b))
        .collect();
    GrayImage::from_vec(width, height, data).unwrap_or_else(|| GrayImage::new(width, height))
}

/// Hard binary threshold: values `>= level` become `FOREGROUND`, the rest `BACKGROUND`.
pub fn threshold(image: &GrayImage, level: u8) -> GrayImage {
    let (width, height) = image.dimensions();
    let data = image
        .iter()
        .map(|&value| if value >= level { FOREGROUND } else { BACKGROUND })
        .collect();
    GrayImage::from_vec(width, height, data).unwrap_or_else(|| GrayImage::new(width, height))
}

/// Normalized `size x size` box filter with reflect-101 borders.
///
/// Runs as two separable passes (rows, then columns) over `u32` sums and rounds the
/// mean back to a byte. `size` is expected to be odd; a size of 1 is the identity.
pub fn box_blur(image: &GrayImage, size: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    if size <= 1 || width == 0 || height == 0 {
        return image.clone();
    }

    let w = width as usize;
    let h = height as usize;
    let radius = (size / 2) as isize;
    let area = size * size;

    // --- 1. Horizontal pass ---
    let mut row_sums = vec![0u32; w * h];
    for y in 0..h {
        let row = &image.as_raw()[y * w..(y + 1) * w];
        for x in 0..w {
            let mut sum = 0u32;
            for k in -radius..=radius {
                sum += row[reflect_101(x as isize + k, w)] as u32;
            }
            row_sums[y * w + x] = sum;
        }
    }

    // --- 2. Vertical pass ---
    let mut blurred = GrayImage::new(width, height);
    let out: &mut [u8] = &mut blurred;
    for x in 0..w {
        for y in 0..h {
            let mut sum = 0u32;
            for k in -radius..=radius {
                sum += row_sums[reflect_101(y as isize + k, h) * w + x];
            }
            out[y * w + x] = ((sum + area / 2) / area) as u8;
        }
    }

    blurred
}

/// True when every pixel is exactly `FOREGROUND` or `BACKGROUND`.
pub fn is_binary(mask: &GrayImage) -> bool {
    mask.iter().all(|&v| v == FOREGROUND || v == BACKGROUND)
}

/// Number of non-background pixels.
pub fn foreground_count(mask: &GrayImage) -> usize {
    mask.iter().filter(|&&v| v != BACKGROUND).count()
}

/// Border mapping `gfedcb|abcdefgh|gfedcba`: mirror around the edge pixel without repeating it.
fn reflect_101(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    let mut i = index;
    while i < 0 || i > last {
        i = if i < 0 { -i } else { 2 * last - i };
    }
    i as usize
}
