use image::{DynamicImage, ImageBuffer, Pixel};

use crate::error::{DeGrainError, Result};

/// Storage type of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelDepth {
    U8,
    U16,
    F32,
}

pub fn pixel_depth(image: &DynamicImage) -> Result<PixelDepth> {
    match image {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_) => Ok(PixelDepth::U8),
        DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_)
        | DynamicImage::ImageRgb16(_)
        | DynamicImage::ImageRgba16(_) => Ok(PixelDepth::U16),
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => Ok(PixelDepth::F32),
        other => Err(unsupported(other)),
    }
}

fn unsupported(image: &DynamicImage) -> DeGrainError {
    DeGrainError::UnsupportedPixelFormat(format!("{:?}", image.color()))
}

/// Maps every sample of `buffer` into a buffer of another pixel type with the
/// same channel count.
fn remap<P, Q, F>(buffer: &ImageBuffer<P, Vec<P::Subpixel>>, f: F) -> Result<ImageBuffer<Q, Vec<Q::Subpixel>>>
where
    P: Pixel,
    Q: Pixel,
    F: Fn(P::Subpixel) -> Q::Subpixel,
{
    let (width, height) = buffer.dimensions();
    let samples = buffer.as_raw().iter().map(|&v| f(v)).collect();
    ImageBuffer::from_raw(width, height, samples).ok_or_else(|| {
        DeGrainError::UnsupportedPixelFormat(format!(
            "{}->{} channel remap",
            P::CHANNEL_COUNT,
            Q::CHANNEL_COUNT
        ))
    })
}

/// Converts `image` to its 8-bit counterpart, passing every sample through
/// `f`. Channel layout is kept; float sources become 8-bit RGB(A).
pub fn to_u8<F>(image: &DynamicImage, f: F) -> Result<DynamicImage>
where
    F: Fn(f32) -> u8,
{
    let converted = match image {
        DynamicImage::ImageLuma8(b) => DynamicImage::ImageLuma8(remap(b, |v: u8| f(v as f32))?),
        DynamicImage::ImageLumaA8(b) => DynamicImage::ImageLumaA8(remap(b, |v: u8| f(v as f32))?),
        DynamicImage::ImageRgb8(b) => DynamicImage::ImageRgb8(remap(b, |v: u8| f(v as f32))?),
        DynamicImage::ImageRgba8(b) => DynamicImage::ImageRgba8(remap(b, |v: u8| f(v as f32))?),
        DynamicImage::ImageLuma16(b) => DynamicImage::ImageLuma8(remap(b, |v: u16| f(v as f32))?),
        DynamicImage::ImageLumaA16(b) => DynamicImage::ImageLumaA8(remap(b, |v: u16| f(v as f32))?),
        DynamicImage::ImageRgb16(b) => DynamicImage::ImageRgb8(remap(b, |v: u16| f(v as f32))?),
        DynamicImage::ImageRgba16(b) => DynamicImage::ImageRgba8(remap(b, |v: u16| f(v as f32))?),
        DynamicImage::ImageRgb32F(b) => DynamicImage::ImageRgb8(remap(b, |v: f32| f(v))?),
        DynamicImage::ImageRgba32F(b) => DynamicImage::ImageRgba8(remap(b, |v: f32| f(v))?),
        other => return Err(unsupported(other)),
    };
    Ok(converted)
}

/// Widens an 8-bit image to `depth` by value: 200u8 becomes 200u16 or 200.0.
pub fn cast_from_u8(image: DynamicImage, depth: PixelDepth) -> Result<DynamicImage> {
    let cast = match (depth, &image) {
        (PixelDepth::U8, _) => return Ok(image),
        (PixelDepth::U16, DynamicImage::ImageLuma8(b)) => DynamicImage::ImageLuma16(remap(b, u16::from)?),
        (PixelDepth::U16, DynamicImage::ImageLumaA8(b)) => DynamicImage::ImageLumaA16(remap(b, u16::from)?),
        (PixelDepth::U16, DynamicImage::ImageRgb8(b)) => DynamicImage::ImageRgb16(remap(b, u16::from)?),
        (PixelDepth::U16, DynamicImage::ImageRgba8(b)) => DynamicImage::ImageRgba16(remap(b, u16::from)?),
        (PixelDepth::F32, DynamicImage::ImageRgb8(b)) => DynamicImage::ImageRgb32F(remap(b, f32::from)?),
        (PixelDepth::F32, DynamicImage::ImageRgba8(b)) => DynamicImage::ImageRgba32F(remap(b, f32::from)?),
        (_, other) => return Err(unsupported(other)),
    };
    Ok(cast)
}

/// Largest sample value over every channel.
pub fn max_sample(image: &DynamicImage) -> Result<f32> {
    fn fold<T: Copy + Into<f32>>(samples: &[T]) -> f32 {
        samples.iter().fold(f32::MIN, |acc, &v| acc.max(v.into()))
    }
    let max = match image {
        DynamicImage::ImageLuma8(b) => fold(b.as_raw()),
        DynamicImage::ImageLumaA8(b) => fold(b.as_raw()),
        DynamicImage::ImageRgb8(b) => fold(b.as_raw()),
        DynamicImage::ImageRgba8(b) => fold(b.as_raw()),
        DynamicImage::ImageLuma16(b) => fold(b.as_raw()),
        DynamicImage::ImageLumaA16(b) => fold(b.as_raw()),
        DynamicImage::ImageRgb16(b) => fold(b.as_raw()),
        DynamicImage::ImageRgba16(b) => fold(b.as_raw()),
        DynamicImage::ImageRgb32F(b) => fold(b.as_raw()),
        DynamicImage::ImageRgba32F(b) => fold(b.as_raw()),
        other => return Err(unsupported(other)),
    };
    Ok(max)
}

/// Saturating cast to u8 with round-to-nearest.
pub fn saturate_u8(v: f32) -> u8 {
    if v.is_nan() {
        0
    } else {
        v.round().clamp(0.0, 255.0) as u8
    }
}
