// THEORY:
// The `luma` module is the entry point of every frame into the motion pipeline.
// Camera frames arrive as 3-channel RGB, but motion is measured on brightness
// alone: a single channel halves the work of every later stage, and a moving
// object almost always changes brightness even when its hue stays put.
//
// Luminance here is the Rec. 601 luma approximation, a weighted sum of the three
// channels on the raw 0..255 scale. The result is rounded back to a byte so the
// luma frame is a plain 8-bit image like the masks derived from it.

pub mod luma {
    use image::{GrayImage, RgbImage};

    pub type Luminance = f64;

    const RED_WEIGHT: Luminance = 0.299;
    const GREEN_WEIGHT: Luminance = 0.587;
    const BLUE_WEIGHT: Luminance = 0.114;

    /// Luminance estimate (Rec. 601 luma) of a single RGB triple, on the 0..255 scale.
    pub fn luminance(red: u8, green: u8, blue: u8) -> Luminance {
        RED_WEIGHT * red as Luminance
            + GREEN_WEIGHT * green as Luminance
            + BLUE_WEIGHT * blue as Luminance
    }

    /// Converts a color frame to a single-channel luma frame of the same dimensions.
    pub fn to_luma(frame: &RgbImage) -> GrayImage {
        let (width, height) = frame.dimensions();
        let mut luma = GrayImage::new(width, height);
        for (dst, src) in luma.pixels_mut().zip(frame.pixels()) {
            let [red, green, blue] = src.0;
            // `as u8` saturates, so float drift above 255.0 is harmless.
            dst.0[0] = luminance(red, green, blue).round() as u8;
        }
        luma
    }
}

#[cfg(test)]
mod tests {
    use super::luma::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn grays_map_to_themselves() {
        for level in [0u8, 1, 35, 128, 254, 255] {
            assert_eq!(luminance(level, level, level).round() as u8, level);
        }
    }

    #[test]
    fn green_dominates_the_weighting() {
        let red = luminance(255, 0, 0);
        let green = luminance(0, 255, 0);
        let blue = luminance(0, 0, 255);
        assert!(green > red && red > blue);
    }

    #[test]
    fn to_luma_keeps_dimensions_and_layout() {
        let mut frame = RgbImage::new(4, 3);
        frame.put_pixel(2, 1, Rgb([255, 255, 255]));
        frame.put_pixel(3, 2, Rgb([255, 0, 0]));

        let luma = to_luma(&frame);

        assert_eq!(luma.dimensions(), (4, 3));
        assert_eq!(luma.get_pixel(2, 1).0[0], 255);
        assert_eq!(luma.get_pixel(3, 2).0[0], 76);
        assert_eq!(luma.get_pixel(0, 0).0[0], 0);
    }
}
