// canvas.rs — Edge map accumulator.
//
// A fixed square byte grid. Every write goes through `paste_max`, an
// element-wise maximum over the patch/canvas intersection, so pixel
// values never decrease and out-of-range patches are clipped rather
// than wrapped.

use crate::image::Image;
use crate::motion::Translation;

/// Persistent map canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    grid: Image<u8>,
}

impl Canvas {
    /// Zeroed `size × size` canvas.
    pub fn new(size: usize) -> Self {
        Canvas {
            grid: Image::new(size, size),
        }
    }

    pub fn size(&self) -> usize {
        self.grid.width()
    }

    /// Max-blend `patch` with its top-left corner at (`top`, `left`).
    ///
    /// Coordinates may be negative or beyond the canvas; only the
    /// overlapping region is touched.
    pub fn paste_max(&mut self, patch: &Image<u8>, top: isize, left: isize) {
        let size = self.size() as isize;
        let (pw, ph) = (patch.width() as isize, patch.height() as isize);

        let y0 = top.max(0);
        let x0 = left.max(0);
        let y1 = top.saturating_add(ph).min(size);
        let x1 = left.saturating_add(pw).min(size);
        if y0 >= y1 || x0 >= x1 {
            return;
        }

        let px0 = (x0 - left) as usize;
        let span = (x1 - x0) as usize;
        for y in y0..y1 {
            let src = &patch.row((y - top) as usize)[px0..px0 + span];
            let dst = &mut self.grid.row_mut(y as usize)[x0 as usize..x0 as usize + span];
            for (d, &s) in dst.iter_mut().zip(src) {
                *d = (*d).max(s);
            }
        }
    }

    /// Center `mask` on `cursor` and max-blend it.
    ///
    /// Top-left is `(cy - h/2, cx - w/2)` with floor division.
    pub fn stamp(&mut self, mask: &Image<u8>, cursor: Cursor) {
        let top = cursor.y - (mask.height() / 2) as isize;
        let left = cursor.x - (mask.width() / 2) as isize;
        self.paste_max(mask, top, left);
    }

    pub fn as_image(&self) -> &Image<u8> {
        &self.grid
    }

    pub fn into_image(self) -> Image<u8> {
        self.grid
    }
}

/// Integer canvas position where the next edge mask is centered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub x: isize,
    pub y: isize,
}

impl Cursor {
    /// `(size/2, size/2)`.
    pub fn centered(size: usize) -> Self {
        let c = (size / 2) as isize;
        Cursor { x: c, y: c }
    }

    /// Move opposite to the scene translation and clamp to the canvas.
    ///
    /// Step per axis is `round(-d * pixels_per_step / 10)`, rounding half
    /// away from zero. The result always lies in `[0, size - 1]`.
    pub fn advance(self, t: Translation, pixels_per_step: f64, size: usize) -> Self {
        let max = size.saturating_sub(1) as isize;
        let step = |d: f64| -> isize {
            // `as` saturates at the isize range and maps NaN to 0.
            (-d * pixels_per_step / 10.0).round() as isize
        };
        Cursor {
            x: self.x.saturating_add(step(t.dx)).clamp(0, max),
            y: self.y.saturating_add(step(t.dy)).clamp(0, max),
        }
    }

    pub fn in_bounds(&self, size: usize) -> bool {
        let size = size as isize;
        (0..size).contains(&self.x) && (0..size).contains(&self.y)
    }
}
