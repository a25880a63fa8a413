use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use image::{DynamicImage, RgbaImage};
use tracing::{debug, error};

use crate::codec::ImageCodec;
use crate::denoise;
use crate::job::{DenoiseParams, Job};
use crate::processors::{self, batch, classify::InputKind};
use crate::video::{self, FfmpegSource, FrameSource};

/// Longest side of the before/after thumbnails.
pub const PREVIEW_SIZE: u32 = 256;

#[derive(Debug, Clone)]
pub struct Preview {
    pub before: RgbaImage,
    pub after: RgbaImage,
}

/// Runs `job` on the blocking pool so the UI thread keeps drawing.
/// The error side carries the text shown to the user.
pub async fn run_job(job: Job, codec: ImageCodec) -> Result<String, String> {
    let handle = tokio::task::spawn_blocking(move || processors::run(&job, codec));
    match handle.await {
        Ok(Ok(report)) => Ok(report.summary()),
        Ok(Err(e)) => {
            error!("Processing failed: {}", e);
            Err(e.to_string())
        }
        Err(e) => {
            error!("Processing worker stopped: {}", e);
            Err(format!("Processing stopped unexpectedly: {}", e))
        }
    }
}

/// Picks the image to preview: the first readable file of a folder, the first
/// frame of a video, or the image itself.
fn preview_source(input: &Path, codec: ImageCodec) -> anyhow::Result<DynamicImage> {
    match processors::classify::classify(input) {
        InputKind::Directory => {
            let files = batch::list_candidates(input)?;
            files
                .iter()
                .find_map(|path| codec.load(path).ok())
                .with_context(|| format!("No readable image in {}", input.display()))
        }
        InputKind::VideoFile => {
            let info = video::probe(input)?;
            let mut source = FfmpegSource::open(input, &info)?;
            let frame = source
                .next_frame()
                .with_context(|| format!("No frame could be read from {}", input.display()))?;
            Ok(DynamicImage::ImageRgb8(frame))
        }
        InputKind::ImageFile => codec
            .load(input)
            .with_context(|| format!("Could not read {}", input.display())),
        InputKind::Invalid => bail!("{} does not exist", input.display()),
    }
}

/// Denoises a thumbnail of the input with the current strengths.
pub fn preview(input: &Path, params: DenoiseParams, codec: ImageCodec) -> anyhow::Result<Preview> {
    let source = preview_source(input, codec)?;
    let thumb = DynamicImage::ImageRgba8(source.thumbnail(PREVIEW_SIZE, PREVIEW_SIZE).to_rgba8());
    debug!("Previewing {}x{} thumbnail of {}", thumb.width(), thumb.height(), input.display());
    let denoised = denoise::denoise(&thumb, params).context("Denoising the preview failed")?;

    Ok(Preview {
        before: thumb.to_rgba8(),
        after: denoised.to_rgba8(),
    })
}

pub async fn run_preview(input: PathBuf, params: DenoiseParams, codec: ImageCodec) -> Result<Preview, String> {
    let handle = tokio::task::spawn_blocking(move || preview(&input, params, codec));
    match handle.await {
        Ok(result) => result.map_err(|e| format!("{:#}", e)),
        Err(e) => Err(format!("Preview stopped unexpectedly: {}", e)),
    }
}
