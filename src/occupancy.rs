// occupancy.rs — Spatial grid for minimum-distance feature selection.
//
// The image is divided into square cells of side `min_distance`. Each
// accepted feature is filed under its cell, so checking whether a new
// candidate is too close only needs the 3×3 block of cells around it
// instead of every accepted feature.

use crate::points::Point2;

/// Grid of accepted feature positions.
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    cells: Vec<Vec<Point2>>,
    cols: usize,
    rows: usize,
    cell_size: f32,
    min_dist_sq: f32,
}

impl OccupancyGrid {
    /// Grid for an image of `img_w × img_h` enforcing `min_distance`.
    ///
    /// A non-positive `min_distance` disables the check; every
    /// candidate is then accepted.
    pub fn new(img_w: usize, img_h: usize, min_distance: f32) -> Self {
        let cell_size = min_distance.max(1.0);
        let cols = ((img_w as f32 / cell_size).ceil() as usize).max(1);
        let rows = ((img_h as f32 / cell_size).ceil() as usize).max(1);
        OccupancyGrid {
            cells: vec![Vec::new(); cols * rows],
            cols,
            rows,
            cell_size,
            min_dist_sq: if min_distance > 0.0 { min_distance * min_distance } else { 0.0 },
        }
    }

    /// True when no accepted point lies strictly closer than `min_distance`.
    pub fn is_free(&self, p: Point2) -> bool {
        if self.min_dist_sq <= 0.0 {
            return true;
        }
        let (col, row) = self.cell_of(p);
        let c0 = col.saturating_sub(1);
        let r0 = row.saturating_sub(1);
        let c1 = (col + 1).min(self.cols - 1);
        let r1 = (row + 1).min(self.rows - 1);

        for r in r0..=r1 {
            for c in c0..=c1 {
                for q in &self.cells[r * self.cols + c] {
                    let dx = q.x - p.x;
                    let dy = q.y - p.y;
                    if dx * dx + dy * dy < self.min_dist_sq {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Record an accepted point.
    pub fn insert(&mut self, p: Point2) {
        let (col, row) = self.cell_of(p);
        self.cells[row * self.cols + col].push(p);
    }

    /// Accept `p` if it is free, returning whether it was inserted.
    pub fn try_insert(&mut self, p: Point2) -> bool {
        if self.is_free(p) {
            self.insert(p);
            true
        } else {
            false
        }
    }

    /// Number of accepted points.
    pub fn len(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Vec::is_empty)
    }

    /// Grid dimensions (cols, rows).
    pub fn dims(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    // Out-of-image positions clamp to the border cells.
    fn cell_of(&self, p: Point2) -> (usize, usize) {
        let col = ((p.x.max(0.0) / self.cell_size) as usize).min(self.cols - 1);
        let row = ((p.y.max(0.0) / self.cell_size) as usize).min(self.rows - 1);
        (col, row)
    }
}
