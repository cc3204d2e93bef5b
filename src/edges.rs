// edges.rs — Canny edge detector with fixed hysteresis thresholds.
//
// Algorithm:
//   1. 3×3 Sobel gradients (replicate border), L1 magnitude |gx| + |gy|
//   2. Non-maximum suppression along the gradient direction, quantized
//      to 0°, 45°, 90° or 135° using tan(22.5°)
//   3. Pixels with magnitude > high are strong; > low are weak
//   4. Hysteresis: weak pixels 8-connected to a strong pixel survive
//
// Output is a same-size mask with 255 on edges and 0 elsewhere.

use crate::config::Config;
use crate::gradient::Gradients;
use crate::image::Image;

const TAN_22_5: f32 = 0.414_213_57;
const TAN_67_5: f32 = 2.414_213_6;

pub const EDGE: u8 = 255;

#[derive(Debug, Clone)]
pub struct CannyDetector {
    pub low: f32,
    pub high: f32,
}

impl CannyDetector {
    pub fn new(low: f32, high: f32) -> Self {
        CannyDetector { low, high }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.canny_low, config.canny_high)
    }

    /// Edge mask of a grayscale frame.
    pub fn detect(&self, image: &Image<u8>) -> Image<u8> {
        let (w, h) = image.dimensions();
        let mut mask = Image::new(w, h);
        if image.is_empty() {
            return mask;
        }

        let grads = Gradients::sobel(image);
        let mag = grads.l1_magnitude();
        let class = self.suppress(&grads, &mag);

        // Hysteresis: flood from strong pixels through weak ones.
        let mut stack: Vec<(usize, usize)> = Vec::new();
        for (x, y, c) in class.pixels() {
            if c == Class::Strong as u8 {
                mask.set(x, y, EDGE);
                stack.push((x, y));
            }
        }
        while let Some((x, y)) = stack.pop() {
            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    if mask.get(nx, ny) == 0 && class.get(nx, ny) == Class::Weak as u8 {
                        mask.set(nx, ny, EDGE);
                        stack.push((nx, ny));
                    }
                }
            }
        }

        mask
    }

    /// Non-maximum suppression plus double threshold, one class per pixel.
    fn suppress(&self, grads: &Gradients, mag: &Image<f32>) -> Image<u8> {
        let (w, h) = mag.dimensions();
        // Neighbours outside the image read as zero magnitude.
        let at = |x: isize, y: isize| -> f32 {
            if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
                0.0
            } else {
                mag.get(x as usize, y as usize)
            }
        };

        let mut class = Image::<u8>::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let m = mag.get(x, y);
                if m <= self.low {
                    continue;
                }
                let gx = grads.gx.get(x, y);
                let gy = grads.gy.get(x, y);
                let (ax, ay) = (gx.abs(), gy.abs());
                let (xi, yi) = (x as isize, y as isize);

                // `a` is the neighbour before the pixel along the gradient,
                // `b` the one after; ties go to the later pixel.
                let (a, b) = if ay <= ax * TAN_22_5 {
                    (at(xi - 1, yi), at(xi + 1, yi))
                } else if ay >= ax * TAN_67_5 {
                    (at(xi, yi - 1), at(xi, yi + 1))
                } else {
                    let s = if (gx < 0.0) != (gy < 0.0) { -1 } else { 1 };
                    (at(xi - s, yi - 1), at(xi + s, yi + 1))
                };

                if m > a && m >= b {
                    let c = if m > self.high { Class::Strong } else { Class::Weak };
                    class.set(x, y, c as u8);
                }
            }
        }
        class
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Class {
    Weak = 1,
    Strong = 2,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> CannyDetector {
        CannyDetector::from_config(&Config::default())
    }

    #[test]
    fn test_flat_image_has_no_edges() {
        let img = Image::filled(32, 32, 77u8);
        let mask = detector().detect(&img);
        assert!(mask.as_slice().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_vertical_step_gives_thin_line() {
        let mut img = Image::filled(40, 20, 20u8);
        for y in 0..20 {
            for x in 20..40 {
                img.set(x, y, 220);
            }
        }
        let mask = detector().detect(&img);
        for y in 0..20 {
            let on: Vec<usize> = (0..40).filter(|&x| mask.get(x, y) == EDGE).collect();
            assert_eq!(on.len(), 1, "row {y}: expected one edge pixel, got {on:?}");
            assert!(on[0] == 19 || on[0] == 20, "row {y}: edge at {}", on[0]);
        }
    }

    #[test]
    fn test_mask_is_binary() {
        let mut img = Image::filled(30, 30, 0u8);
        for y in 8..22 {
            for x in 8..22 {
                img.set(x, y, 255);
            }
        }
        let mask = detector().detect(&img);
        assert!(mask.as_slice().iter().all(|&v| v == 0 || v == EDGE));
        assert!(mask.as_slice().iter().any(|&v| v == EDGE));
    }

    #[test]
    fn test_weak_step_below_high_is_dropped() {
        // A 10-level step: Sobel L1 magnitude 40 < low threshold.
        let mut img = Image::filled(20, 20, 100u8);
        for y in 0..20 {
            for x in 10..20 {
                img.set(x, y, 110);
            }
        }
        assert!(detector().detect(&img).as_slice().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_hysteresis_keeps_connected_weak_pixels() {
        // Vertical step whose contrast drops halfway down: the strong top
        // half (magnitude 200) drags the weak bottom half (magnitude 100).
        let mut img = Image::filled(20, 40, 0u8);
        for y in 0..40 {
            let v = if y < 20 { 50 } else { 25 };
            for x in 10..20 {
                img.set(x, y, v);
            }
        }
        let mask = detector().detect(&img);
        assert!((0..20).any(|x| mask.get(x, 35) == EDGE), "weak segment should survive");

        // The same weak step on its own is dropped.
        let mut weak = Image::filled(20, 40, 0u8);
        for y in 0..40 {
            for x in 10..20 {
                weak.set(x, y, 25);
            }
        }
        assert!(detector().detect(&weak).as_slice().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_empty_image() {
        let img: Image<u8> = Image::new(0, 0);
        assert!(detector().detect(&img).is_empty());
    }
}
