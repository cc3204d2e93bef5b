// corners.rs — Shi-Tomasi "good features to track".
//
// Algorithm:
//   1. Sobel gradients Ix, Iy (replicate border)
//   2. Products Ix², Iy², Ix·Iy, box-filtered over a block_size window
//   3. Response = smallest eigenvalue of the 2×2 structure tensor
//   4. Candidates: 3×3 local maxima strictly above quality_level × max
//   5. Sort by response, descending and stable (ties keep raster order)
//   6. Greedy minimum-distance selection on an occupancy grid, up to
//      max_corners (0 = unlimited)
//
// The output is deterministic for a given image and parameters.

use crate::config::Config;
use crate::convolution::{box_kernel_1d, convolve_separable};
use crate::gradient::Gradients;
use crate::image::{Image, Pixel};
use crate::occupancy::OccupancyGrid;
use crate::points::{Point2, PointSet};

/// Shi-Tomasi corner detector.
#[derive(Debug, Clone)]
pub struct GoodFeaturesDetector {
    /// Upper bound on returned corners. 0 means no limit.
    pub max_corners: usize,
    /// Fraction of the strongest response a corner must exceed.
    pub quality_level: f32,
    /// Minimum Euclidean distance between returned corners, in pixels.
    pub min_distance: f32,
    /// Side of the structure tensor averaging window. Must be odd.
    pub block_size: usize,
}

impl GoodFeaturesDetector {
    pub fn new(max_corners: usize, quality_level: f32, min_distance: f32, block_size: usize) -> Self {
        GoodFeaturesDetector {
            max_corners,
            quality_level,
            min_distance,
            block_size,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.max_corners,
            config.quality_level,
            config.min_distance,
            config.block_size,
        )
    }

    /// Minimum-eigenvalue response at every pixel.
    pub fn corner_response<T: Pixel>(&self, image: &Image<T>) -> Image<f32> {
        let (w, h) = image.dimensions();
        let g = Gradients::sobel(image);

        let mut ix2 = Image::<f32>::new(w, h);
        let mut iy2 = Image::<f32>::new(w, h);
        let mut ixiy = Image::<f32>::new(w, h);
        for y in 0..h {
            let (gx, gy) = (g.gx.row(y), g.gy.row(y));
            let (a, b, c) = (ix2.row_mut(y), iy2.row_mut(y), ixiy.row_mut(y));
            for x in 0..w {
                a[x] = gx[x] * gx[x];
                b[x] = gy[x] * gy[x];
                c[x] = gx[x] * gy[x];
            }
        }

        let kernel = box_kernel_1d(self.block_size);
        let sxx = convolve_separable(&ix2, &kernel, &kernel);
        let syy = convolve_separable(&iy2, &kernel, &kernel);
        let sxy = convolve_separable(&ixiy, &kernel, &kernel);

        // λmin = det / λmax, which is exactly zero on ideal straight edges.
        let data = sxx
            .as_slice()
            .iter()
            .zip(syy.as_slice())
            .zip(sxy.as_slice())
            .map(|((&a, &c), &b)| {
                let half_diff = 0.5 * (a - c);
                let max_eig = 0.5 * (a + c) + (half_diff * half_diff + b * b).sqrt();
                if max_eig > 0.0 {
                    (a * c - b * b) / max_eig
                } else {
                    0.0
                }
            })
            .collect();
        Image::from_vec(w, h, data)
    }

    /// Detect corners in a grayscale frame.
    pub fn detect(&self, image: &Image<u8>) -> PointSet {
        let (w, h) = image.dimensions();
        if w < 3 || h < 3 {
            return PointSet::new();
        }

        let response = self.corner_response(image);
        let max_response = response
            .as_slice()
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        if !(max_response > 0.0) {
            return PointSet::new();
        }
        let threshold = self.quality_level * max_response;

        // The 1-pixel frame has no complete 3×3 neighbourhood.
        let mut candidates: Vec<(Point2, f32)> = Vec::new();
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let r = response.get(x, y);
                if r > threshold && is_local_max(&response, x, y) {
                    candidates.push((Point2::new(x as f32, y as f32), r));
                }
            }
        }
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

        let cap = if self.max_corners == 0 {
            usize::MAX
        } else {
            self.max_corners
        };
        let mut grid = OccupancyGrid::new(w, h, self.min_distance);
        let mut corners = PointSet::new();
        for (p, _) in candidates {
            if corners.len() >= cap {
                break;
            }
            if grid.try_insert(p) {
                corners.push(p);
            }
        }
        corners
    }
}

/// True when no 8-neighbour is larger than the center.
fn is_local_max(response: &Image<f32>, x: usize, y: usize) -> bool {
    let v = response.get(x, y);
    for ny in y - 1..=y + 1 {
        for nx in x - 1..=x + 1 {
            if response.get(nx, ny) > v {
                return false;
            }
        }
    }
    true
}
