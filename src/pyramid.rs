// pyramid.rs — Gaussian image pyramid for coarse-to-fine tracking.
//
// At each level: Gaussian blur (separable, replicate border), then 2×
// decimation by taking every other pixel. Level 0 is the input converted
// to f32 without blurring.
//
// Building stops early when the next level would have a zero dimension,
// so tiny frames simply get fewer levels than requested.

use crate::convolution::{convolve_separable, gaussian_kernel_1d};
use crate::image::{Image, Pixel};

/// Blur used between levels.
pub const DEFAULT_SIGMA: f32 = 1.0;

/// A Gaussian image pyramid.
///
/// `levels[0]` is the original resolution; `levels[n]` is approximately
/// `(width / 2^n, height / 2^n)`.
#[derive(Debug, Clone)]
pub struct Pyramid {
    pub levels: Vec<Image<f32>>,
}

impl Pyramid {
    /// Build up to `num_levels` levels from `src`.
    ///
    /// # Panics
    /// Panics if `num_levels` is zero.
    pub fn build<T: Pixel>(src: &Image<T>, num_levels: usize, sigma: f32) -> Self {
        assert!(num_levels >= 1, "pyramid must have at least 1 level");

        let half_size = (3.0 * sigma).ceil().max(1.0) as usize;
        let kernel = gaussian_kernel_1d(half_size, sigma);

        let mut levels = Vec::with_capacity(num_levels);
        levels.push(crate::convert::convert_image::<T, f32>(src));

        while levels.len() < num_levels {
            let prev = &levels[levels.len() - 1];
            if prev.width() < 2 || prev.height() < 2 {
                break;
            }
            let blurred = convolve_separable(prev, &kernel, &kernel);
            levels.push(downsample_2x(&blurred));
        }

        Pyramid { levels }
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, level: usize) -> &Image<f32> {
        &self.levels[level]
    }
}

/// `dst(x, y) = src(2x, 2y)`; odd dimensions drop the last row/column.
fn downsample_2x(src: &Image<f32>) -> Image<f32> {
    let new_w = src.width() / 2;
    let new_h = src.height() / 2;
    let mut dst = Image::new(new_w, new_h);

    for y in 0..new_h {
        let row = src.row(y * 2);
        for (x, out) in dst.row_mut(y).iter_mut().enumerate() {
            *out = row[x * 2];
        }
    }
    dst
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downsample_odd_dimensions() {
        let img = Image::<f32>::new(7, 5);
        let down = downsample_2x(&img);
        assert_eq!(down.dimensions(), (3, 2));
    }

    #[test]
    fn test_downsample_preserves_values() {
        let mut img = Image::<f32>::new(4, 4);
        img.set(0, 0, 1.0);
        img.set(2, 0, 2.0);
        img.set(0, 2, 3.0);
        img.set(2, 2, 4.0);

        let down = downsample_2x(&img);
        assert_eq!(down.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_single_level_is_raw_copy() {
        let img = Image::from_vec(2, 2, vec![10u8, 20, 30, 40]);
        let pyr = Pyramid::build(&img, 1, DEFAULT_SIGMA);
        assert_eq!(pyr.num_levels(), 1);
        assert_eq!(pyr.level(0).as_slice(), &[10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_stops_before_zero_dimension() {
        // 5 → 2 → 1, then no further level.
        let img: Image<u8> = Image::new(5, 40);
        let pyr = Pyramid::build(&img, 6, DEFAULT_SIGMA);
        assert_eq!(pyr.num_levels(), 3);
        assert_eq!(pyr.level(2).dimensions(), (1, 10));
    }

    #[test]
    #[should_panic(expected = "at least 1")]
    fn test_zero_levels_panics() {
        let img: Image<u8> = Image::new(10, 10);
        Pyramid::build(&img, 0, DEFAULT_SIGMA);
    }
}
