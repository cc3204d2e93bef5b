// convert.rs — Conversions at the decode/encode boundary.
//
// Frames arrive as `image::RgbImage`; everything downstream works on
// `Image<u8>` grayscale. The canvas leaves as `image::GrayImage`.
//
// Grayscale uses ITU-R BT.601 luma weights, rounded to the nearest
// integer:
//   Y = 0.299 R + 0.587 G + 0.114 B

use image::{GrayImage, RgbImage};

use crate::image::{Image, Pixel};

const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// Convert an RGB frame to an 8-bit grayscale image.
pub fn rgb_to_gray(src: &RgbImage) -> Image<u8> {
    let (w, h) = (src.width() as usize, src.height() as usize);
    let data = src
        .pixels()
        .map(|p| {
            let [r, g, b] = p.0;
            u8::from_f32(LUMA_R * r as f32 + LUMA_G * g as f32 + LUMA_B * b as f32)
        })
        .collect();
    Image::from_vec(w, h, data)
}

/// Wrap an `image::GrayImage` as an `Image<u8>` (copies the buffer).
pub fn from_gray_image(src: &GrayImage) -> Image<u8> {
    Image::from_vec(
        src.width() as usize,
        src.height() as usize,
        src.as_raw().clone(),
    )
}

/// Convert an `Image<u8>` into an `image::GrayImage` ready for encoding.
pub fn to_gray_image(src: &Image<u8>) -> GrayImage {
    GrayImage::from_fn(src.width() as u32, src.height() as u32, |x, y| {
        image::Luma([src.get(x as usize, y as usize)])
    })
}

/// Raw conversion between pixel types via f32 (u8 42 → f32 42.0).
pub fn convert_image<S: Pixel, D: Pixel>(src: &Image<S>) -> Image<D> {
    let data = src.as_slice().iter().map(|&v| D::from_f32(v.to_f32())).collect();
    Image::from_vec(src.width(), src.height(), data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_primary_colors() {
        let mut rgb = RgbImage::new(3, 1);
        rgb.put_pixel(0, 0, Rgb([255, 0, 0]));
        rgb.put_pixel(1, 0, Rgb([0, 255, 0]));
        rgb.put_pixel(2, 0, Rgb([0, 0, 255]));
        let gray = rgb_to_gray(&rgb);
        // 0.299*255 = 76.2, 0.587*255 = 149.7, 0.114*255 = 29.1
        assert_eq!(gray.row(0), &[76, 150, 29]);
    }

    #[test]
    fn test_gray_is_preserved() {
        let rgb = RgbImage::from_pixel(4, 2, Rgb([123, 123, 123]));
        let gray = rgb_to_gray(&rgb);
        assert_eq!(gray.dimensions(), (4, 2));
        assert!(gray.as_slice().iter().all(|&v| v == 123));
    }

    #[test]
    fn test_gray_image_bridge() {
        let img = Image::from_vec(3, 2, vec![0u8, 10, 20, 30, 40, 50]);
        let g = to_gray_image(&img);
        assert_eq!(g.get_pixel(2, 1).0, [50]);
        assert_eq!(from_gray_image(&g), img);
    }

    #[test]
    fn test_convert_u8_f32_raw() {
        let img = Image::from_vec(2, 1, vec![42u8, 255]);
        let f: Image<f32> = convert_image(&img);
        assert_eq!(f.as_slice(), &[42.0, 255.0]);
        let back: Image<u8> = convert_image(&f);
        assert_eq!(back, img);
    }
}
