// klt.rs — Pyramidal Lucas-Kanade optical flow.
//
// Two formulations of the per-level solver share one coarse-to-fine
// driver:
//
// 1. INVERSE COMPOSITIONAL (Baker & Matthews, 2004), the default:
//    gradients are taken once on the template in the previous frame, so
//    the 2×2 Hessian and its inverse are constant across iterations. For
//    pure translation the update is the same additive step as below.
//
// 2. FORWARD ADDITIVE: gradients at the warped position in the current
//    frame, Hessian rebuilt every iteration. More work per iteration,
//    kept for comparison.
//
// Reliability: a point is Lost when the smallest eigenvalue of its
// Hessian, divided by the number of window pixels, falls below
// `min_eig_threshold` (gradients in raw intensity units), or when the
// Hessian is singular. A point that converges outside the image is
// OutOfBounds. Only Tracked points count as found.

use crate::config::Config;
use crate::image::{interpolate_bilinear, Image};
use crate::points::Point2;
use crate::pyramid::Pyramid;

/// Default threshold on `λmin(H) / N`.
pub const DEFAULT_MIN_EIG_THRESHOLD: f32 = 1e-4;

/// Outcome for one point after a frame-to-frame tracking pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStatus {
    Tracked,
    /// Weak structure or singular Hessian at some pyramid level.
    Lost,
    /// The tracked position fell outside the image.
    OutOfBounds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LkMethod {
    ForwardAdditive,
    InverseCompositional,
}

/// A point with its tracked position and status.
///
/// When `status != Tracked` the position is the best estimate reached
/// before giving up and should not be trusted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedPoint {
    pub point: Point2,
    pub status: TrackStatus,
}

impl TrackedPoint {
    pub fn is_found(&self) -> bool {
        self.status == TrackStatus::Tracked
    }
}

/// Pyramidal KLT tracker.
#[derive(Debug, Clone)]
pub struct KltTracker {
    /// Patch half-size; the patch is `(2 * window_size + 1)²`.
    pub window_size: usize,
    /// Maximum Gauss-Newton iterations per pyramid level.
    pub max_iterations: usize,
    /// Convergence threshold in pixels: stop when `|delta| < epsilon`.
    pub epsilon: f32,
    /// Pyramid levels to use, capped by the pyramids actually passed in.
    pub max_levels: usize,
    pub min_eig_threshold: f32,
    pub method: LkMethod,
}

impl KltTracker {
    pub fn new(window_size: usize, max_iterations: usize, epsilon: f32, max_levels: usize) -> Self {
        Self::with_method(
            window_size,
            max_iterations,
            epsilon,
            max_levels,
            LkMethod::InverseCompositional,
        )
    }

    pub fn with_method(
        window_size: usize,
        max_iterations: usize,
        epsilon: f32,
        max_levels: usize,
        method: LkMethod,
    ) -> Self {
        KltTracker {
            window_size,
            max_iterations,
            epsilon,
            max_levels,
            min_eig_threshold: DEFAULT_MIN_EIG_THRESHOLD,
            method,
        }
    }

    /// Tracker matching the configured window and pyramid depth.
    ///
    /// `lk_win_size` is the full window width (21 → half-size 10) and
    /// `lk_max_level` is the index of the coarsest level (3 → 4 levels).
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.lk_win_size / 2,
            config.lk_max_iterations,
            config.lk_epsilon,
            config.lk_max_level + 1,
        )
    }

    /// Track `points` from the previous frame's pyramid into the current
    /// frame's. Returns one result per input point, in order.
    pub fn track(&self, prev: &Pyramid, curr: &Pyramid, points: &[Point2]) -> Vec<TrackedPoint> {
        let num_levels = self
            .max_levels
            .max(1)
            .min(prev.num_levels())
            .min(curr.num_levels());

        points
            .iter()
            .map(|p| self.track_single(prev, curr, *p, num_levels))
            .collect()
    }

    fn track_single(
        &self,
        prev_pyr: &Pyramid,
        curr_pyr: &Pyramid,
        point: Point2,
        num_levels: usize,
    ) -> TrackedPoint {
        let mut dx = 0.0f32;
        let mut dy = 0.0f32;

        for level in (0..num_levels).rev() {
            let prev_img = prev_pyr.level(level);
            let curr_img = curr_pyr.level(level);

            let scale = 1.0 / (1u32 << level) as f32;
            let px = point.x * scale;
            let py = point.y * scale;

            let result = match self.method {
                LkMethod::ForwardAdditive => {
                    self.lk_forward_additive(prev_img, curr_img, px, py, dx, dy)
                }
                LkMethod::InverseCompositional => {
                    self.lk_inverse_compositional(prev_img, curr_img, px, py, dx, dy)
                }
            };

            match result {
                LkResult::Converged(ndx, ndy) | LkResult::MaxIter(ndx, ndy) => {
                    dx = ndx;
                    dy = ndy;
                }
                LkResult::Lost => {
                    return TrackedPoint {
                        point: Point2::new(point.x + dx / scale, point.y + dy / scale),
                        status: TrackStatus::Lost,
                    };
                }
            }

            // Next finer level: d *= 2.
            if level > 0 {
                dx *= 2.0;
                dy *= 2.0;
            }
        }

        let moved = Point2::new(point.x + dx, point.y + dy);
        let (w, h) = curr_pyr.level(0).dimensions();
        let inside = moved.x >= 0.0 && moved.x < w as f32 && moved.y >= 0.0 && moved.y < h as f32;
        TrackedPoint {
            point: moved,
            status: if inside {
                TrackStatus::Tracked
            } else {
                TrackStatus::OutOfBounds
            },
        }
    }

    fn window_pixels(&self) -> f32 {
        let side = 2 * self.window_size + 1;
        (side * side) as f32
    }

    /// Reject weak structure: `λmin(H) / N < threshold` or `det(H) ≈ 0`.
    fn is_degenerate(&self, h00: f32, h01: f32, h11: f32) -> bool {
        let n = self.window_pixels();
        let (a, b, c) = (h00 / n, h01 / n, h11 / n);
        let min_eig = 0.5 * (a + c - ((a - c) * (a - c) + 4.0 * b * b).sqrt());
        let det = h00 * h11 - h01 * h01;
        min_eig < self.min_eig_threshold || det.abs() < f32::EPSILON
    }

    fn lk_forward_additive(
        &self,
        prev_img: &Image<f32>,
        curr_img: &Image<f32>,
        px: f32,
        py: f32,
        mut dx: f32,
        mut dy: f32,
    ) -> LkResult {
        let half = self.window_size as isize;
        let eps_sq = self.epsilon * self.epsilon;

        for _ in 0..self.max_iterations {
            let (mut h00, mut h01, mut h11) = (0.0f32, 0.0f32, 0.0f32);
            let (mut b0, mut b1) = (0.0f32, 0.0f32);

            for oy in -half..=half {
                for ox in -half..=half {
                    let (ox, oy) = (ox as f32, oy as f32);
                    let t = interpolate_bilinear(prev_img, px + ox, py + oy);

                    let wx = px + dx + ox;
                    let wy = py + dy + oy;
                    let e = t - interpolate_bilinear(curr_img, wx, wy);

                    let gx = 0.5
                        * (interpolate_bilinear(curr_img, wx + 1.0, wy)
                            - interpolate_bilinear(curr_img, wx - 1.0, wy));
                    let gy = 0.5
                        * (interpolate_bilinear(curr_img, wx, wy + 1.0)
                            - interpolate_bilinear(curr_img, wx, wy - 1.0));

                    h00 += gx * gx;
                    h01 += gx * gy;
                    h11 += gy * gy;
                    b0 += gx * e;
                    b1 += gy * e;
                }
            }

            if self.is_degenerate(h00, h01, h11) {
                return LkResult::Lost;
            }
            let inv_det = 1.0 / (h00 * h11 - h01 * h01);
            let step_x = inv_det * (h11 * b0 - h01 * b1);
            let step_y = inv_det * (h00 * b1 - h01 * b0);

            dx += step_x;
            dy += step_y;
            if step_x * step_x + step_y * step_y < eps_sq {
                return LkResult::Converged(dx, dy);
            }
        }

        LkResult::MaxIter(dx, dy)
    }

    fn lk_inverse_compositional(
        &self,
        prev_img: &Image<f32>,
        curr_img: &Image<f32>,
        px: f32,
        py: f32,
        mut dx: f32,
        mut dy: f32,
    ) -> LkResult {
        let half = self.window_size as isize;
        let eps_sq = self.epsilon * self.epsilon;

        // Template intensities and gradients, fixed for all iterations.
        let n = self.window_pixels() as usize;
        let mut template = Vec::with_capacity(n);
        let mut grads = Vec::with_capacity(n);
        let (mut h00, mut h01, mut h11) = (0.0f32, 0.0f32, 0.0f32);

        for oy in -half..=half {
            for ox in -half..=half {
                let tx = px + ox as f32;
                let ty = py + oy as f32;
                let gx = 0.5
                    * (interpolate_bilinear(prev_img, tx + 1.0, ty)
                        - interpolate_bilinear(prev_img, tx - 1.0, ty));
                let gy = 0.5
                    * (interpolate_bilinear(prev_img, tx, ty + 1.0)
                        - interpolate_bilinear(prev_img, tx, ty - 1.0));

                template.push(interpolate_bilinear(prev_img, tx, ty));
                grads.push((gx, gy));
                h00 += gx * gx;
                h01 += gx * gy;
                h11 += gy * gy;
            }
        }

        if self.is_degenerate(h00, h01, h11) {
            return LkResult::Lost;
        }
        let inv_det = 1.0 / (h00 * h11 - h01 * h01);
        let (ih00, ih01, ih11) = (inv_det * h11, -inv_det * h01, inv_det * h00);

        for _ in 0..self.max_iterations {
            let (mut b0, mut b1) = (0.0f32, 0.0f32);
            let mut idx = 0;
            for oy in -half..=half {
                for ox in -half..=half {
                    let i = interpolate_bilinear(
                        curr_img,
                        px + dx + ox as f32,
                        py + dy + oy as f32,
                    );
                    let e = template[idx] - i;
                    let (gx, gy) = grads[idx];
                    b0 += gx * e;
                    b1 += gy * e;
                    idx += 1;
                }
            }

            let step_x = ih00 * b0 + ih01 * b1;
            let step_y = ih01 * b0 + ih11 * b1;

            dx += step_x;
            dy += step_y;
            if step_x * step_x + step_y * step_y < eps_sq {
                return LkResult::Converged(dx, dy);
            }
        }

        LkResult::MaxIter(dx, dy)
    }
}

/// Result of the iterative solver at one pyramid level.
enum LkResult {
    Converged(f32, f32),
    MaxIter(f32, f32),
    Lost,
}
