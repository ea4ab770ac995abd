// THEORY:
// The `region` module defines the spatial data the blob selector produces. A
// `Region` is one external, 8-connected group of foreground pixels in a motion
// mask at a single moment in time. Like every data container in this crate it is
// "dumb": it summarizes a detection and has no memory of earlier frames.
//
// Only the bounding box travels further down the pipeline (the tracker turns it
// into a target position); the area is kept so alternative selection rules can
// rank regions by size.

/// A pixel coordinate in a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// Smallest axis-aligned rectangle enclosing a region, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Builds the box spanning two inclusive corners.
    pub fn from_corners(top_left: Point, bottom_right: Point) -> Self {
        Self {
            x: top_left.x,
            y: top_left.y,
            width: bottom_right.x - top_left.x + 1,
            height: bottom_right.y - top_left.y + 1,
        }
    }
}

/// A single external connected foreground region found in a motion mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Position of this region in extraction order for the current frame. Not persistent.
    pub id: usize,
    /// The first pixel of the region met in raster order (top-most, then left-most).
    pub seed: Point,
    pub bounding_box: BoundingBox,
    /// Foreground pixel count.
    pub area: usize,
}
