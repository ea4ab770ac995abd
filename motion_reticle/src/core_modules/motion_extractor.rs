// THEORY:
// The `MotionExtractor` is the temporal stage of the pipeline. Its entire model of
// the background is the luma frame from the previous cycle: anything that changed
// brightness by at least the threshold level since then counts as motion.
//
// Per frame, in fixed order:
// 1.  color -> luma
// 2.  |luma - previous luma|
// 3.  threshold at T
// 4.  K x K box blur
// 5.  threshold at T again (strictly binary mask for the blob selector)
// 6.  the current luma becomes the previous luma
//
// Step 6 happens on every frame, whether or not anyone looks at the mask, so the
// background model is always exactly one frame behind.

use crate::core_modules::luma::luma::to_luma;
use crate::core_modules::mask::{absolute_difference, box_blur, threshold};
use crate::error::{Result, TrackerError};
use crate::pipeline::PipelineConfig;
use image::{GrayImage, RgbImage};

/// Everything one extraction step produces for a frame.
#[derive(Debug, Clone)]
pub struct MotionFrames {
    /// Luma of the current frame.
    pub luma: GrayImage,
    /// Raw absolute difference against the previous luma.
    pub difference: GrayImage,
    /// Binary motion mask after threshold -> blur -> threshold.
    pub mask: GrayImage,
}

pub struct MotionExtractor {
    width: u32,
    height: u32,
    threshold_level: u8,
    blur_size: u32,
    previous_luma: Option<GrayImage>,
}

impl MotionExtractor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            width: config.image_width,
            height: config.image_height,
            threshold_level: config.threshold_level,
            blur_size: config.blur_size,
            previous_luma: None,
        }
    }

    /// Seeds the background model without producing a mask.
    pub fn prime(&mut self, frame: &RgbImage) -> Result<()> {
        self.check_geometry(frame)?;
        self.previous_luma = Some(to_luma(frame));
        Ok(())
    }

    /// Runs one extraction step. An unprimed extractor treats the frame as its own
    /// predecessor, so the first mask is all background.
    pub fn extract(&mut self, frame: &RgbImage) -> Result<MotionFrames> {
        self.check_geometry(frame)?;

        let luma = to_luma(frame);
        let previous = self.previous_luma.take().unwrap_or_else(|| luma.clone());

        let difference = absolute_difference(&luma, &previous);
        let binary = threshold(&difference, self.threshold_level);
        let blurred = box_blur(&binary, self.blur_size);
        let mask = threshold(&blurred, self.threshold_level);

        self.previous_luma = Some(luma.clone());

        Ok(MotionFrames {
            luma,
            difference,
            mask,
        })
    }

    pub fn previous_luma(&self) -> Option<&GrayImage> {
        self.previous_luma.as_ref()
    }

    fn check_geometry(&self, frame: &RgbImage) -> Result<()> {
        let (width, height) = frame.dimensions();
        if (width, height) != (self.width, self.height) {
            return Err(TrackerError::FrameGeometry {
                expected_width: self.width,
                expected_height: self.height,
                width,
                height,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::mask::{foreground_count, is_binary};
    use image::Rgb;

    fn config(width: u32, height: u32) -> PipelineConfig {
        PipelineConfig {
            image_width: width,
            image_height: height,
            ..PipelineConfig::default()
        }
    }

    fn textured(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn identical_frames_produce_empty_mask() {
        let frame = textured(64, 48);
        let mut extractor = MotionExtractor::new(&config(64, 48));

        extractor.prime(&frame).unwrap();
        let frames = extractor.extract(&frame).unwrap();

        assert_eq!(foreground_count(&frames.difference), 0);
        assert_eq!(foreground_count(&frames.mask), 0);
    }

    #[test]
    fn first_unprimed_frame_is_all_background() {
        let mut extractor = MotionExtractor::new(&config(32, 32));
        let frames = extractor.extract(&textured(32, 32)).unwrap();
        assert_eq!(foreground_count(&frames.mask), 0);
        assert!(extractor.previous_luma().is_some());
    }

    #[test]
    fn small_speck_is_suppressed() {
        let mut extractor = MotionExtractor::new(&config(64, 64));
        extractor.prime(&RgbImage::new(64, 64)).unwrap();

        let mut next = RgbImage::new(64, 64);
        for y in 30..33 {
            for x in 30..33 {
                next.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let frames = extractor.extract(&next).unwrap();

        assert_eq!(foreground_count(&frames.difference), 9);
        assert_eq!(foreground_count(&frames.mask), 0);
    }

    #[test]
    fn large_square_survives_and_mask_is_binary() {
        let mut extractor = MotionExtractor::new(&config(200, 200));
        extractor.prime(&RgbImage::new(200, 200)).unwrap();

        let mut next = RgbImage::new(200, 200);
        for y in 80..120 {
            for x in 80..120 {
                next.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let frames = extractor.extract(&next).unwrap();

        assert!(is_binary(&frames.mask));
        assert_eq!(frames.mask.get_pixel(100, 100).0[0], 255);
        assert_eq!(frames.mask.get_pixel(10, 10).0[0], 0);
    }

    #[test]
    fn previous_luma_advances_every_frame() {
        let mut extractor = MotionExtractor::new(&config(16, 16));
        let white = RgbImage::from_pixel(16, 16, Rgb([255, 255, 255]));

        extractor.prime(&RgbImage::new(16, 16)).unwrap();
        let moving = extractor.extract(&white).unwrap();
        let settled = extractor.extract(&white).unwrap();

        assert_eq!(foreground_count(&moving.mask), 16 * 16);
        assert_eq!(foreground_count(&settled.mask), 0);
        assert_eq!(extractor.previous_luma().unwrap().get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn mismatched_frame_is_rejected() {
        let mut extractor = MotionExtractor::new(&config(16, 16));
        let err = extractor.extract(&RgbImage::new(8, 8)).unwrap_err();
        assert!(matches!(
            err,
            TrackerError::FrameGeometry {
                width: 8,
                height: 8,
                ..
            }
        ));
    }
}
