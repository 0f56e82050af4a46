// Lattice geometry: how a requested particle count maps onto texture
// dimensions, and which cells change when those dimensions do.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatticeSize {
    pub width: u32,
    pub height: u32,
}

// A rectangle of lattice cells, [x, x + width) x [y, y + height).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

impl LatticeSize {
    pub fn new(width: u32, height: u32) -> Self {
        LatticeSize { width, height }
    }

    // width = floor(sqrt(n)), height = n / width. The realized count is
    // usually a little below the request and is never topped up.
    pub fn from_count(approx_particles: usize) -> Self {
        LatticeSize::from_count_limited(approx_particles, u32::MAX)
    }

    // Same rule, with each dimension capped at `max_dimension` (the device's
    // largest 2-D texture side).
    pub fn from_count_limited(approx_particles: usize, max_dimension: u32) -> Self {
        let approx_particles = approx_particles.max(1);
        let width = ((approx_particles as f64).sqrt() as usize).max(1);
        let height = approx_particles / width;
        let max_dimension = max_dimension.max(1) as usize;
        if width > max_dimension || height > max_dimension {
            log::warn!(
                "{} particles need a {}x{} lattice, clamping to {} per side",
                approx_particles,
                width,
                height,
                max_dimension
            );
        }
        LatticeSize {
            width: width.min(max_dimension) as u32,
            height: height.min(max_dimension) as u32,
        }
    }

    pub fn count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn full_region(&self) -> Region {
        Region {
            x: 0,
            y: 0,
            width: self.width,
            height: self.height,
        }
    }

    // Cells whose state survives a move from `self` to `new`.
    pub fn overlap(&self, new: &LatticeSize) -> Region {
        Region {
            x: 0,
            y: 0,
            width: self.width.min(new.width),
            height: self.height.min(new.height),
        }
    }

    // Cells of `new` that have no counterpart in `self`: the added column band
    // (limited to the shared rows) followed by the added row band spanning the
    // full new width.
    pub fn added_regions(&self, new: &LatticeSize) -> Vec<Region> {
        let mut regions = vec![];
        if new.width > self.width {
            regions.push(Region {
                x: self.width,
                y: 0,
                width: new.width - self.width,
                height: self.height.min(new.height),
            });
        }
        if new.height > self.height {
            regions.push(Region {
                x: 0,
                y: self.height,
                width: new.width,
                height: new.height - self.height,
            });
        }
        regions.retain(|region| !region.is_empty());
        regions
    }
}
