// gradient.rs — Image gradients via the 3×3 Sobel operator.
//
// Sobel kernels are separable:
//   Sobel_x: row [-1, 0, 1] (derivative along x), col [1, 2, 1] (smoothing)
//   Sobel_y: row [ 1, 2, 1] (smoothing),          col [-1, 0, 1] (derivative)
//
// Border handling (replicate) is inherited from convolve_separable. The
// corner detector and the Canny operator both start from these gradients.

use crate::convolution::convolve_separable;
use crate::image::{Image, Pixel};

const SOBEL_DERIV: [f32; 3] = [-1.0, 0.0, 1.0];
const SOBEL_SMOOTH: [f32; 3] = [1.0, 2.0, 1.0];

/// Horizontal gradient Ix. Positive when intensity increases to the right.
///
/// Unnormalized: roughly [-1020, 1020] for u8 input.
pub fn sobel_x<T: Pixel>(src: &Image<T>) -> Image<f32> {
    convolve_separable(src, &SOBEL_DERIV, &SOBEL_SMOOTH)
}

/// Vertical gradient Iy. Positive when intensity increases downward.
pub fn sobel_y<T: Pixel>(src: &Image<T>) -> Image<f32> {
    convolve_separable(src, &SOBEL_SMOOTH, &SOBEL_DERIV)
}

/// Both Sobel gradients of one image.
#[derive(Debug, Clone)]
pub struct Gradients {
    pub gx: Image<f32>,
    pub gy: Image<f32>,
}

impl Gradients {
    pub fn sobel<T: Pixel>(src: &Image<T>) -> Self {
        Gradients {
            gx: sobel_x(src),
            gy: sobel_y(src),
        }
    }

    pub fn width(&self) -> usize {
        self.gx.width()
    }

    pub fn height(&self) -> usize {
        self.gx.height()
    }

    /// L1 gradient magnitude `|gx| + |gy|`.
    pub fn l1_magnitude(&self) -> Image<f32> {
        let data = self
            .gx
            .as_slice()
            .iter()
            .zip(self.gy.as_slice())
            .map(|(&x, &y)| x.abs() + y.abs())
            .collect();
        Image::from_vec(self.width(), self.height(), data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_gradient() {
        // Vertical step edge: left half = 0, right half = 100.
        let mut img = Image::<u8>::new(20, 10);
        for y in 0..10 {
            for x in 10..20 {
                img.set(x, y, 100);
            }
        }

        let ix = sobel_x(&img);

        let edge_response = ix.get(10, 5);
        assert!(
            edge_response > 50.0,
            "expected strong positive Ix at edge, got {edge_response}"
        );
        let flat_response = ix.get(5, 5);
        assert!(
            flat_response.abs() < 1.0,
            "expected near-zero Ix in flat region, got {flat_response}"
        );
    }

    #[test]
    fn test_vertical_gradient() {
        let mut img = Image::<u8>::new(10, 20);
        for y in 10..20 {
            for x in 0..10 {
                img.set(x, y, 100);
            }
        }

        let iy = sobel_y(&img);
        assert!(iy.get(5, 10) > 50.0, "expected strong positive Iy at edge");
        assert!(iy.get(5, 5).abs() < 1.0, "expected near-zero Iy in flat region");
    }

    #[test]
    fn test_linear_ramp() {
        // f(x) = x: row pass gives 2, column pass multiplies by 1+2+1.
        let img = Image::from_vec(20, 10, (0..200).map(|i| (i % 20) as f32).collect());
        let g = Gradients::sobel(&img);
        for y in 2..8 {
            for x in 2..18 {
                let v = g.gx.get(x, y);
                assert!((v - 8.0).abs() < 1e-3, "Ix at ({x},{y}) = {v}, expected 8.0");
                assert!(g.gy.get(x, y).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn test_l1_magnitude() {
        let g = Gradients {
            gx: Image::from_vec(2, 1, vec![-3.0, 1.0]),
            gy: Image::from_vec(2, 1, vec![4.0, -2.0]),
        };
        assert_eq!(g.l1_magnitude().as_slice(), &[7.0, 3.0]);
    }

    #[test]
    fn test_constant_image_zero_gradient() {
        let img = Image::from_vec(10, 10, vec![128u8; 100]);
        let g = Gradients::sobel(&img);
        assert!(g.l1_magnitude().as_slice().iter().all(|v| v.abs() < 1e-6));
    }
}
