// THEORY:
// The `tracker` module is the memory of the pipeline, and deliberately a short one.
// It holds a single target position: the center of the newest detected bounding
// box. There is no data association, no velocity and no occlusion timeout.
//
// When a frame yields no detection the tracker "coasts": the last known position is
// reported again, unchanged, for as long as nothing new is found. Before the first
// detection ever happens the position is the origin.

use crate::core_modules::region::BoundingBox;

/// Integer pixel position of the tracked target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TargetPosition {
    pub x: i32,
    pub y: i32,
}

impl TargetPosition {
    /// Center of a bounding box, with truncating division.
    pub fn from_bounding_box(bounding_box: &BoundingBox) -> Self {
        Self {
            x: bounding_box.x as i32 + bounding_box.width as i32 / 2,
            y: bounding_box.y as i32 + bounding_box.height as i32 / 2,
        }
    }
}

/// Single-target tracking state.
#[derive(Debug, Clone, Default)]
pub struct Tracker {
    position: TargetPosition,
    /// Total number of frames that produced a detection.
    detections: u64,
    /// Consecutive frames since the last detection.
    frames_since_seen: u32,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one frame's detection result into the state and returns the position to report.
    pub fn update(&mut self, detection: Option<&BoundingBox>) -> TargetPosition {
        match detection {
            Some(bounding_box) => {
                self.position = TargetPosition::from_bounding_box(bounding_box);
                self.detections += 1;
                self.frames_since_seen = 0;
            }
            None => {
                self.frames_since_seen = self.frames_since_seen.saturating_add(1);
            }
        }
        self.position
    }

    pub fn position(&self) -> TargetPosition {
        self.position
    }

    /// True once at least one region has been located.
    pub fn has_lock(&self) -> bool {
        self.detections > 0
    }

    pub fn detections(&self) -> u64 {
        self.detections
    }

    pub fn frames_since_seen(&self) -> u32 {
        self.frames_since_seen
    }
}
