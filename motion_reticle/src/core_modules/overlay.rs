// THEORY:
// The `overlay` module draws the tracking reticle straight into the color frame:
// a ring around the target plus four arms pointing out from its center. All
// drawing clips against the frame, so a target near the edge just loses part of
// its reticle. Text is left to the display sink; this module only provides the
// caption string.

use crate::core_modules::tracker::TargetPosition;
use image::{Rgb, RgbImage};

/// Geometry and color of the reticle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReticleStyle {
    pub radius: i32,
    pub arm_length: i32,
    pub thickness: i32,
    pub color: Rgb<u8>,
}

impl Default for ReticleStyle {
    fn default() -> Self {
        Self {
            radius: 20,
            arm_length: 25,
            thickness: 2,
            color: Rgb([0, 255, 0]),
        }
    }
}

/// Draws the ring and the four arms centered on `target`.
pub fn draw_reticle(frame: &mut RgbImage, target: TargetPosition, style: &ReticleStyle) {
    draw_ring(frame, target, style);

    let half = style.thickness / 2;
    let band = -half..style.thickness - half;
    let arm = -style.arm_length..=style.arm_length;

    for offset in arm {
        for across in band.clone() {
            put_clipped(frame, target.x + offset, target.y + across, style.color);
            put_clipped(frame, target.x + across, target.y + offset, style.color);
        }
    }
}

/// Text shown next to the reticle.
pub fn caption(target: TargetPosition) -> String {
    format!("Target pos: {}:{}", target.x, target.y)
}

fn draw_ring(frame: &mut RgbImage, target: TargetPosition, style: &ReticleStyle) {
    let half = style.thickness as f64 / 2.0;
    let inner = style.radius as f64 - half;
    let outer = style.radius as f64 + half;
    let reach = style.radius + style.thickness;

    for dy in -reach..=reach {
        for dx in -reach..=reach {
            let distance = ((dx * dx + dy * dy) as f64).sqrt();
            if distance >= inner && distance < outer {
                put_clipped(frame, target.x + dx, target.y + dy, style.color);
            }
        }
    }
}

fn put_clipped(frame: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    if x < frame.width() && y < frame.height() {
        frame.put_pixel(x, y, color);
    }
}
