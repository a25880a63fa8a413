pub mod lab;
pub mod nl_means;

use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};
use tracing::debug;

use crate::error::{DeGrainError, Result};
use crate::job::{DenoiseParams, SEARCH_WINDOW, TEMPLATE_WINDOW};
use crate::pixels::{self, PixelDepth};
use nl_means::Windows;

const WINDOWS: Windows = Windows {
    template: TEMPLATE_WINDOW,
    search: SEARCH_WINDOW,
};

/// Denoises one image or frame. Dimensions, channel count and storage type
/// are preserved.
///
/// Images that are not 8 bits per channel are scaled into 0..=255 by their own
/// maximum, filtered, and cast back by value. The result is therefore still
/// in 0..=255 inside the wider type; the original range is not restored.
pub fn denoise(image: &DynamicImage, params: DenoiseParams) -> Result<DynamicImage> {
    let depth = pixels::pixel_depth(image)?;
    if depth == PixelDepth::U8 {
        return denoise_8bit(image, params);
    }

    let max = pixels::max_sample(image)?;
    let scale = if max > 0.0 { 255.0 / max } else { 1.0 };
    debug!("Scaling {:?} image into 8-bit range (max {}, scale {})", depth, max, scale);

    let eight = pixels::to_u8(image, |v| pixels::saturate_u8((v * scale).abs()))?;
    let denoised = denoise_8bit(&eight, params)?;
    pixels::cast_from_u8(denoised, depth)
}

fn denoise_8bit(image: &DynamicImage, params: DenoiseParams) -> Result<DynamicImage> {
    let (width, height) = (image.width(), image.height());
    let (w, h) = (width as usize, height as usize);
    let h_luma = params.h as f32;
    let h_color = params.h_color as f32;

    let mismatch = || DeGrainError::UnsupportedPixelFormat(format!("{:?} buffer size", image.color()));

    let denoised = match image {
        DynamicImage::ImageLuma8(buffer) => {
            let out = nl_means::denoise_gray(buffer.as_raw(), w, h, h_luma, WINDOWS);
            DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, out).ok_or_else(mismatch)?)
        }
        DynamicImage::ImageLumaA8(buffer) => {
            let luma: Vec<u8> = buffer.pixels().map(|p| p.0[0]).collect();
            let out = nl_means::denoise_gray(&luma, w, h, h_luma, WINDOWS);
            let samples = out
                .iter()
                .zip(buffer.pixels())
                .flat_map(|(&l, p)| [l, p.0[1]])
                .collect();
            DynamicImage::ImageLumaA8(GrayAlphaImage::from_raw(width, height, samples).ok_or_else(mismatch)?)
        }
        DynamicImage::ImageRgb8(buffer) => {
            let rgb: Vec<[u8; 3]> = buffer.pixels().map(|p| p.0).collect();
            let out = nl_means::denoise_rgb(&rgb, w, h, h_luma, h_color, WINDOWS);
            let samples = out.into_iter().flatten().collect();
            DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, samples).ok_or_else(mismatch)?)
        }
        DynamicImage::ImageRgba8(buffer) => {
            let rgb: Vec<[u8; 3]> = buffer.pixels().map(|p| [p.0[0], p.0[1], p.0[2]]).collect();
            let out = nl_means::denoise_rgb(&rgb, w, h, h_luma, h_color, WINDOWS);
            let samples = out
                .iter()
                .zip(buffer.pixels())
                .flat_map(|(c, p)| [c[0], c[1], c[2], p.0[3]])
                .collect();
            DynamicImage::ImageRgba8(RgbaImage::from_raw(width, height, samples).ok_or_else(mismatch)?)
        }
        other => {
            return Err(DeGrainError::UnsupportedPixelFormat(format!("{:?}", other.color())));
        }
    };
    Ok(denoised)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, LumaA, Rgb, Rgb32FImage, Rgba};

    fn noisy_rgb(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let n = ((x * 31 + y * 17) % 13) as u8;
            Rgb([100 + n, 60 + n / 2, 30 + n])
        })
    }

    #[test]
    fn test_8bit_layouts_keep_shape() {
        let params = DenoiseParams::default();
        let images = [
            DynamicImage::ImageLuma8(GrayImage::from_pixel(9, 7, Luma([50]))),
            DynamicImage::ImageLumaA8(GrayAlphaImage::from_pixel(9, 7, LumaA([50, 200]))),
            DynamicImage::ImageRgb8(noisy_rgb(9, 7)),
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(9, 7, Rgba([10, 20, 30, 40]))),
        ];
        for image in images {
            let out = denoise(&image, params).unwrap();
            assert_eq!((out.width(), out.height()), (9, 7));
            assert_eq!(out.color(), image.color());
        }
    }

    #[test]
    fn test_alpha_is_preserved() {
        let img = RgbaImage::from_fn(8, 8, |x, y| Rgba([120, 80, 60, (x * 30 + y) as u8]));
        let out = denoise(&DynamicImage::ImageRgba8(img.clone()), DenoiseParams::default()).unwrap();
        let out = out.as_rgba8().unwrap();
        for (a, b) in img.pixels().zip(out.pixels()) {
            assert_eq!(a.0[3], b.0[3]);
        }
    }

    #[test]
    fn test_all_zero_16bit_does_not_divide_by_zero() {
        let img = ImageBuffer::<Rgb<u16>, Vec<u16>>::new(6, 5);
        let out = denoise(&DynamicImage::ImageRgb16(img), DenoiseParams::default()).unwrap();

        assert_eq!(pixels::pixel_depth(&out).unwrap(), PixelDepth::U16);
        assert_eq!((out.width(), out.height()), (6, 5));
        assert!(out.as_rgb16().unwrap().as_raw().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_all_zero_float_keeps_type() {
        let img = Rgb32FImage::new(4, 4);
        let out = denoise(&DynamicImage::ImageRgb32F(img), DenoiseParams::default()).unwrap();
        assert_eq!(pixels::pixel_depth(&out).unwrap(), PixelDepth::F32);
        assert!(out.as_rgb32f().unwrap().as_raw().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_16bit_result_stays_in_8bit_range() {
        let img = ImageBuffer::<Rgb<u16>, Vec<u16>>::from_pixel(6, 6, Rgb([1000, 1000, 1000]));
        let out = denoise(&DynamicImage::ImageRgb16(img), DenoiseParams::default()).unwrap();
        let raw = out.as_rgb16().unwrap().as_raw();
        // Scaled to 255, filtered, then cast back without restoring the range.
        assert!(raw.iter().all(|&v| (245..=255).contains(&v)));
    }

    #[test]
    fn test_float_cast_back() {
        let img = Rgb32FImage::from_pixel(5, 5, Rgb([0.5, 0.5, 0.5]));
        let out = denoise(&DynamicImage::ImageRgb32F(img), DenoiseParams::default()).unwrap();
        let raw = out.as_rgb32f().unwrap().as_raw();
        assert!(raw.iter().all(|&v| v > 1.0 && v <= 255.0 && v.fract() == 0.0));
    }

    #[test]
    fn test_16bit_luma_alpha() {
        let img = ImageBuffer::<LumaA<u16>, Vec<u16>>::from_pixel(5, 4, LumaA([200, 600]));
        let out = denoise(&DynamicImage::ImageLumaA16(img), DenoiseParams::default()).unwrap();
        assert_eq!(out.color(), image::ColorType::La16);
        // 600 is the maximum, so alpha lands on 255 and luma on 85.
        let px = out.as_luma_alpha16().unwrap().get_pixel(0, 0);
        assert_eq!(px.0, [85, 255]);
    }
}
