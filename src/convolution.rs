// convolution.rs — Separable 1D convolution for Image<T>.
//
// A 2D convolution with a separable kernel K = k_col * k_row^T runs as a
// horizontal pass followed by a vertical pass, O(2k) per pixel instead
// of O(k²). Used for the pyramid blur, the Sobel operator and the box
// window of the corner response.
//
// BORDER HANDLING: replicate. Kernel taps that fall outside the image
// read the nearest edge pixel.

use crate::image::{Image, Pixel};

/// Convolve each row of `src` with a centered 1D kernel (horizontal pass).
///
/// For a kernel of length K the center tap is `kernel[K / 2]`, so
/// `[-1, 0, 1]` computes `src(x+1) - src(x-1)`.
///
/// # Panics
/// Panics if the kernel is empty or has even length.
pub fn convolve_rows<T: Pixel>(src: &Image<T>, kernel: &[f32]) -> Image<f32> {
    check_kernel(kernel);

    let (w, h) = src.dimensions();
    let half = kernel.len() / 2;
    let mut dst = Image::<f32>::new(w, h);
    if src.is_empty() {
        return dst;
    }

    for y in 0..h {
        let row = src.row(y);
        let out = dst.row_mut(y);
        for x in 0..w {
            let mut acc = 0.0f32;
            if x >= half && x + half < w {
                // Interior: every tap is in range.
                for (ki, &kv) in kernel.iter().enumerate() {
                    acc += row[x + ki - half].to_f32() * kv;
                }
            } else {
                for (ki, &kv) in kernel.iter().enumerate() {
                    let sx = (x + ki).saturating_sub(half).min(w - 1);
                    acc += row[sx].to_f32() * kv;
                }
            }
            out[x] = acc;
        }
    }
    dst
}

/// Convolve each column of `src` with a centered 1D kernel (vertical pass).
///
/// # Panics
/// Panics if the kernel is empty or has even length.
pub fn convolve_cols(src: &Image<f32>, kernel: &[f32]) -> Image<f32> {
    check_kernel(kernel);

    let (w, h) = src.dimensions();
    let half = kernel.len() / 2;
    let mut dst = Image::<f32>::new(w, h);
    if src.is_empty() {
        return dst;
    }

    for y in 0..h {
        let out = dst.row_mut(y);
        for (ki, &kv) in kernel.iter().enumerate() {
            let sy = (y + ki).saturating_sub(half).min(h - 1);
            let row = src.row(sy);
            for (o, &s) in out.iter_mut().zip(row) {
                *o += s * kv;
            }
        }
    }
    dst
}

/// Full separable 2D convolution: horizontal pass then vertical pass.
///
/// Always returns `Image<f32>`; accumulation happens in f32 whatever the
/// input pixel type.
pub fn convolve_separable<T: Pixel>(
    src: &Image<T>,
    kernel_row: &[f32],
    kernel_col: &[f32],
) -> Image<f32> {
    let intermediate = convolve_rows(src, kernel_row);
    convolve_cols(&intermediate, kernel_col)
}

/// Generate a normalized 1D Gaussian kernel of length `2 * half_size + 1`.
///
/// # Examples
/// ```
/// let k = trailmap::convolution::gaussian_kernel_1d(2, 1.0);
/// assert_eq!(k.len(), 5);
/// assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-6);
/// ```
pub fn gaussian_kernel_1d(half_size: usize, sigma: f32) -> Vec<f32> {
    assert!(sigma > 0.0, "sigma must be positive");
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..2 * half_size + 1)
        .map(|i| {
            let x = i as f32 - half_size as f32;
            (-x * x / two_sigma_sq).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}

/// Normalized box (moving average) kernel of odd length `size`.
///
/// # Panics
/// Panics if `size` is zero or even.
pub fn box_kernel_1d(size: usize) -> Vec<f32> {
    assert!(size % 2 == 1, "box kernel size must be odd (got {size})");
    vec![1.0 / size as f32; size]
}

fn check_kernel(kernel: &[f32]) {
    assert!(!kernel.is_empty(), "kernel must not be empty");
    assert!(kernel.len() % 2 == 1, "kernel length must be odd (got {})", kernel.len());
}
