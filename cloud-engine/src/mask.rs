//! Canvas occupancy with per-row counts for rectangle queries.

/// Axis-aligned pixel rectangle, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn intersects(&self, other: &Region) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width && self.bottom() <= height
    }
}

/// Occupied cells plus a running count along each row.
///
/// `row_counts[y * (width + 1) + x]` is the number of occupied cells in row
/// `y` left of column `x`. Occupying a region only rewrites the rows it covers.
#[derive(Debug, Clone)]
pub struct OccupancyMask {
    width: u32,
    height: u32,
    cells: Vec<bool>,
    row_counts: Vec<u32>,
    occupied: u32,
}

impl OccupancyMask {
    pub fn new(width: u32, height: u32) -> Self {
        let cells = vec![false; width as usize * height as usize];
        let row_counts = vec![0; (width as usize + 1) * height as usize];
        Self {
            width,
            height,
            cells,
            row_counts,
            occupied: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn count_before(&self, x: u32, y: u32) -> u32 {
        self.row_counts[y as usize * (self.width as usize + 1) + x as usize]
    }

    /// True when `region` lies inside the canvas and overlaps nothing occupied.
    pub fn is_free(&self, region: Region) -> bool {
        region.width > 0
            && region.height > 0
            && region.fits_within(self.width, self.height)
            && (region.y..region.bottom())
                .all(|y| self.count_before(region.right(), y) == self.count_before(region.x, y))
    }

    /// Mark `region` occupied. The part outside the canvas is ignored.
    pub fn occupy(&mut self, region: Region) {
        let right = region.right().min(self.width);
        let bottom = region.bottom().min(self.height);
        if region.x >= right || region.y >= bottom {
            return;
        }

        let w = self.width as usize;
        let stride = w + 1;
        for y in region.y as usize..bottom as usize {
            let row = y * w;
            for x in region.x as usize..right as usize {
                if !self.cells[row + x] {
                    self.cells[row + x] = true;
                    self.occupied += 1;
                }
            }

            // Counts left of the region are unchanged.
            let counts = &mut self.row_counts[y * stride..(y + 1) * stride];
            let mut running = counts[region.x as usize];
            for x in region.x as usize..w {
                running += u32::from(self.cells[row + x]);
                counts[x + 1] = running;
            }
        }
    }

    pub fn occupied_cells(&self) -> u32 {
        self.occupied
    }
}
