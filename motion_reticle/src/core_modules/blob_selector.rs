// THEORY:
// The `BlobSelector` is the spatial grouping stage. It turns the binary motion
// mask into at most one bounding box: the target the reticle follows.
//
// Algorithm steps:
// 1.  **Outside Background**: Background pixels are flood-filled (4-connected) from
//     the image border. Whatever background this fill cannot reach sits inside a
//     hole of some foreground region.
// 2.  **Region Labelling**: Foreground pixels are grouped into 8-connected regions,
//     seeded in raster order. Each new region goes to the front of the list, so
//     regions come out newest-seeded first, the same order a contour tracer that
//     links each new outer contour at the head of its list reports them. A region is *external* when it touches the image
//     border or the outside background. Regions sitting inside another region's
//     hole are dropped, so a ring is tracked as one solid blob and whatever moves
//     inside it is ignored.
// 3.  **Selection**: Exactly one external region is picked by a `SelectionRule`.
//     The default, `LastFound`, takes the last region in extraction order, which
//     is the first one seeded: the top-most (then left-most) region. It is a
//     positional rule, not a size ranking; `LargestArea` is available when the
//     biggest mover should win instead.
// 4.  **Stateless Utility**: Nothing is remembered between frames. An empty mask
//     simply yields no detection.

use crate::core_modules::region::{BoundingBox, Point, Region};

/// How one region is chosen when a mask contains several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionRule {
    /// The last region in extraction order: the first one seeded in the raster scan.
    #[default]
    LastFound,
    /// The region with the most foreground pixels; ties go to the later region in
    /// extraction order, which is the earlier seeded one.
    LargestArea,
}

pub mod blob_selector {
    use super::*; // Make structs from parent module available.
    use image::GrayImage;

    /// 8-connectivity for foreground regions.
    const NEIGHBOURS_8: [(isize, isize); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (-1, 0),
        (1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];

    /// 4-connectivity for background, the dual of 8-connected foreground.
    const NEIGHBOURS_4: [(isize, isize); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];

    /// Finds every external foreground region, newest seed first (reverse raster order).
    pub fn find_external_regions(mask: &GrayImage) -> Vec<Region> {
        let (width, height) = mask.dimensions();
        let grid = Grid {
            data: mask.as_raw(),
            width: width as usize,
            height: height as usize,
        };
        if grid.data.is_empty() {
            return Vec::new();
        }

        let outside = grid.outside_background();
        let mut visited = vec![false; grid.data.len()];
        let mut regions = Vec::new();

        for index in 0..grid.data.len() {
            if !grid.is_foreground(index) || visited[index] {
                continue;
            }
            if let Some((bounding_box, area)) = grid.grow_region(index, &outside, &mut visited) {
                regions.push(Region {
                    id: 0,
                    seed: grid.point(index),
                    bounding_box,
                    area,
                });
            }
        }

        regions.reverse();
        for (id, region) in regions.iter_mut().enumerate() {
            region.id = id;
        }
        regions
    }

    /// Picks one region according to `rule`, or `None` when there is nothing to pick.
    pub fn select_region(regions: &[Region], rule: SelectionRule) -> Option<&Region> {
        match rule {
            SelectionRule::LastFound => regions.last(),
            // `max_by_key` keeps the last of equal maxima.
            SelectionRule::LargestArea => regions.iter().max_by_key(|region| region.area),
        }
    }

    /// Mask in, target box out: the whole selector in one call.
    pub fn detect(mask: &GrayImage, rule: SelectionRule) -> Option<BoundingBox> {
        let regions = find_external_regions(mask);
        select_region(&regions, rule).map(|region| region.bounding_box)
    }

    struct Grid<'a> {
        data: &'a [u8],
        width: usize,
        height: usize,
    }

    impl Grid<'_> {
        fn is_foreground(&self, index: usize) -> bool {
            self.data[index] != 0
        }

        fn point(&self, index: usize) -> Point {
            Point {
                x: (index % self.width) as u32,
                y: (index / self.width) as u32,
            }
        }

        fn is_on_border(&self, index: usize) -> bool {
            let x = index % self.width;
            let y = index / self.width;
            x == 0 || y == 0 || x + 1 == self.width || y + 1 == self.height
        }

        fn neighbour(&self, index: usize, (dx, dy): (isize, isize)) -> Option<usize> {
            let x = (index % self.width) as isize + dx;
            let y = (index / self.width) as isize + dy;
            if x < 0 || y < 0 || x >= self.width as isize || y >= self.height as isize {
                return None;
            }
            Some(y as usize * self.width + x as usize)
        }

        /// Marks background reachable from the border through 4-connected background.
        fn outside_background(&self) -> Vec<bool> {
            let mut outside = vec![false; self.data.len()];
            let mut stack: Vec<usize> = Vec::new();

            for index in 0..self.data.len() {
                if self.is_on_border(index) && !self.is_foreground(index) {
                    outside[index] = true;
                    stack.push(index);
                }
            }

            while let Some(current) = stack.pop() {
                for offset in NEIGHBOURS_4 {
                    if let Some(next) = self.neighbour(current, offset) {
                        if !outside[next] && !self.is_foreground(next) {
                            outside[next] = true;
                            stack.push(next);
                        }
                    }
                }
            }

            outside
        }

        /// Depth-first fill of one 8-connected region starting at `seed`.
        /// Returns its bounding box and area when the region is external.
        fn grow_region(
            &self,
            seed: usize,
            outside: &[bool],
            visited: &mut [bool],
        ) -> Option<(BoundingBox, usize)> {
            let mut stack = vec![seed];
            visited[seed] = true;

            let seed_point = self.point(seed);
            let mut top_left = seed_point;
            let mut bottom_right = seed_point;
            let mut area = 0usize;
            let mut external = false;

            while let Some(current) = stack.pop() {
                area += 1;
                let p = self.point(current);
                top_left.x = top_left.x.min(p.x);
                top_left.y = top_left.y.min(p.y);
                bottom_right.x = bottom_right.x.max(p.x);
                bottom_right.y = bottom_right.y.max(p.y);

                if !external {
                    external = self.is_on_border(current)
                        || NEIGHBOURS_4.iter().any(|&offset| {
                            self.neighbour(current, offset)
                                .is_some_and(|next| outside[next])
                        });
                }

                for offset in NEIGHBOURS_8 {
                    if let Some(next) = self.neighbour(current, offset) {
                        if !visited[next] && self.is_foreground(next) {
                            visited[next] = true;
                            stack.push(next);
                        }
                    }
                }
            }

            external.then(|| (BoundingBox::from_corners(top_left, bottom_right), area))
        }
    }
}
