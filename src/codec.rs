use std::borrow::Cow;
use std::fs::File;
use std::path::Path;

use exr::prelude::f16;
use image::{DynamicImage, ImageError, ImageFormat};
use memmap2::Mmap;
use tracing::debug;

use crate::error::{DeGrainError, Result};
use crate::pixels::{self, PixelDepth};

// Size threshold for using memory mapping (32MB)
const MMAP_THRESHOLD: u64 = 32 * 1024 * 1024;

/// Process-level codec settings, applied once before any decode or encode.
#[derive(Debug, Clone, Copy)]
pub struct CodecConfig {
    pub openexr: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self { openexr: true }
    }
}

/// Reads and writes image files, keeping bit depth and alpha.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec {
    config: CodecConfig,
}

impl ImageCodec {
    pub fn new(config: CodecConfig) -> Self {
        debug!("Image codec initialised (OpenEXR: {})", config.openexr);
        Self { config }
    }

    pub fn load(&self, path: &Path) -> Result<DynamicImage> {
        let decode_error = |source: ImageError| DeGrainError::Decode {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(|e| decode_error(ImageError::IoError(e)))?;
        let metadata = file.metadata()?;

        // Use memory mapping for large files
        if metadata.len() > MMAP_THRESHOLD {
            debug!("Using memory mapping for large image: {} bytes", metadata.len());
            let mmap = unsafe { Mmap::map(&file)? };
            let format = image::guess_format(&mmap).map_err(decode_error)?;
            self.check_exr(format, path)?;
            image::load_from_memory_with_format(&mmap, format).map_err(decode_error)
        } else {
            drop(file);
            let reader = image::io::Reader::open(path)
                .and_then(|r| r.with_guessed_format())
                .map_err(|e| decode_error(ImageError::IoError(e)))?;
            if let Some(format) = reader.format() {
                self.check_exr(format, path)?;
            }
            reader.decode().map_err(decode_error)
        }
    }

    /// Writes `image` with the encoder implied by the extension of `path`.
    /// `half_float` only matters for EXR destinations.
    pub fn save(&self, image: &DynamicImage, path: &Path, half_float: bool) -> Result<()> {
        let encode_error = |reason: String| DeGrainError::Encode {
            path: path.to_path_buf(),
            reason,
        };
        let format = ImageFormat::from_path(path).map_err(|e| encode_error(e.to_string()))?;

        if format == ImageFormat::OpenExr {
            self.check_exr(format, path)?;
            let float = if image.color().has_alpha() {
                DynamicImage::ImageRgba32F(image.to_rgba32f())
            } else {
                DynamicImage::ImageRgb32F(image.to_rgb32f())
            };
            return if half_float {
                write_half_exr(&float, path).map_err(|e| encode_error(e.to_string()))
            } else {
                float
                    .save_with_format(path, format)
                    .map_err(|e| encode_error(e.to_string()))
            };
        }

        let narrowed = narrow_for(format, image)?;
        debug!("Encoding {:?} as {:?} to {}", narrowed.color(), format, path.display());
        narrowed
            .save_with_format(path, format)
            .map_err(|e| encode_error(e.to_string()))
    }

    fn check_exr(&self, format: ImageFormat, path: &Path) -> Result<()> {
        if format == ImageFormat::OpenExr && !self.config.openexr {
            return Err(DeGrainError::ExrDisabled(path.to_path_buf()));
        }
        Ok(())
    }
}

/// Casts samples down to what the encoder accepts. Values are saturated, not
/// rescaled.
fn narrow_for(format: ImageFormat, image: &DynamicImage) -> Result<Cow<'_, DynamicImage>> {
    let depth = pixels::pixel_depth(image)?;
    let narrowed = match format {
        ImageFormat::Png | ImageFormat::Tiff if depth != PixelDepth::F32 => Cow::Borrowed(image),
        ImageFormat::Jpeg => {
            let eight = pixels::to_u8(image, pixels::saturate_u8)?;
            if eight.color().has_color() {
                Cow::Owned(DynamicImage::ImageRgb8(eight.to_rgb8()))
            } else {
                Cow::Owned(DynamicImage::ImageLuma8(eight.to_luma8()))
            }
        }
        _ if depth == PixelDepth::U8 => Cow::Borrowed(image),
        _ => Cow::Owned(pixels::to_u8(image, pixels::saturate_u8)?),
    };
    Ok(narrowed)
}

fn write_half_exr(image: &DynamicImage, path: &Path) -> exr::error::UnitResult {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let half = |v: f32| f16::from_f32(v);

    if image.color().has_alpha() {
        let rgba = image.to_rgba32f();
        exr::prelude::write_rgba_file(path, width, height, |x, y| {
            let [r, g, b, a] = rgba.get_pixel(x as u32, y as u32).0;
            (half(r), half(g), half(b), half(a))
        })
    } else {
        let rgb = image.to_rgb32f();
        exr::prelude::write_rgb_file(path, width, height, |x, y| {
            let [r, g, b] = rgb.get_pixel(x as u32, y as u32).0;
            (half(r), half(g), half(b))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exr::meta::attribute::SampleType;
    use exr::meta::MetaData;
    use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage, Rgba};
    use tempfile::tempdir;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x * 20) as u8, (y * 20) as u8, 128]))
    }

    #[test]
    fn test_png_round_trip_keeps_16_bit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deep.png");
        let img = ImageBuffer::<Rgba<u16>, Vec<u16>>::from_pixel(4, 3, Rgba([40000, 12, 0, 65535]));
        let codec = ImageCodec::default();

        codec.save(&DynamicImage::ImageRgba16(img), &path, false).unwrap();
        let loaded = codec.load(&path).unwrap();

        assert_eq!(pixels::pixel_depth(&loaded).unwrap(), PixelDepth::U16);
        assert_eq!(loaded.as_rgba16().unwrap().get_pixel(2, 1), &Rgba([40000, 12, 0, 65535]));
    }

    #[test]
    fn test_content_sniffing_ignores_extension() {
        let dir = tempdir().unwrap();
        let png = dir.path().join("frame.png");
        let disguised = dir.path().join("frame.dat");
        let codec = ImageCodec::default();
        codec.save(&DynamicImage::ImageRgb8(gradient(5, 5)), &png, false).unwrap();
        std::fs::copy(&png, &disguised).unwrap();

        let loaded = codec.load(&disguised).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (5, 5));
    }

    #[test]
    fn test_non_image_fails_to_decode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "not pixels").unwrap();

        let result = ImageCodec::default().load(&path);
        assert!(matches!(result, Err(DeGrainError::Decode { .. })));
    }

    #[test]
    fn test_jpeg_drops_alpha_and_depth() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        let img = ImageBuffer::<Rgba<u16>, Vec<u16>>::from_pixel(8, 8, Rgba([100, 100, 100, 65535]));
        let codec = ImageCodec::default();

        codec.save(&DynamicImage::ImageRgba16(img), &path, false).unwrap();
        let loaded = codec.load(&path).unwrap();
        assert_eq!(loaded.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn test_half_float_exr() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.exr");
        let codec = ImageCodec::default();

        codec.save(&DynamicImage::ImageRgb8(gradient(6, 4)), &path, true).unwrap();

        let meta = MetaData::read_from_file(&path, false).unwrap();
        let channels = &meta.headers[0].channels.list;
        assert_eq!(channels.len(), 3);
        assert!(channels.iter().all(|c| c.sample_type == SampleType::F16));

        let loaded = codec.load(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (6, 4));
    }

    #[test]
    fn test_full_float_exr_without_half_flag() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.exr");
        let gray = GrayImage::from_pixel(3, 3, Luma([255]));

        ImageCodec::default()
            .save(&DynamicImage::ImageLuma8(gray), &path, false)
            .unwrap();

        let meta = MetaData::read_from_file(&path, false).unwrap();
        assert!(meta.headers[0].channels.list.iter().all(|c| c.sample_type == SampleType::F32));
    }

    #[test]
    fn test_exr_disabled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.exr");
        let codec = ImageCodec::new(CodecConfig { openexr: false });

        let result = codec.save(&DynamicImage::ImageRgb8(gradient(2, 2)), &path, true);
        assert!(matches!(result, Err(DeGrainError::ExrDisabled(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_unknown_extension_is_an_encode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.unknown");
        let result = ImageCodec::default().save(&DynamicImage::ImageRgb8(gradient(2, 2)), &path, false);
        assert!(matches!(result, Err(DeGrainError::Encode { .. })));
    }
}
