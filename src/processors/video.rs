use image::DynamicImage;
use tracing::{error, info};

use super::Processor;
use crate::denoise;
use crate::error::Result;
use crate::job::{DenoiseParams, Job, JobReport, VideoReport};
use crate::video::{self, FfmpegSink, FfmpegSource, FrameSink, FrameSource};

/// Denoises a video frame by frame into an MPEG-4 part 2 stream with the
/// source's size and rate.
#[derive(Debug, Default)]
pub struct VideoProcessor;

impl VideoProcessor {
    pub fn new() -> Self {
        VideoProcessor
    }
}

/// Reads every frame of `source`, denoises it and hands it to `sink`, in order.
/// Returns the number of frames written.
pub fn denoise_stream<S, K>(source: &mut S, sink: &mut K, params: DenoiseParams, total: Option<u64>) -> Result<u64>
where
    S: FrameSource + ?Sized,
    K: FrameSink + ?Sized,
{
    let total = total.map_or_else(|| "?".to_string(), |t| t.to_string());
    let mut written = 0u64;

    while let Some(frame) = source.next_frame() {
        let denoised = match denoise::denoise(&DynamicImage::ImageRgb8(frame), params)? {
            DynamicImage::ImageRgb8(rgb) => rgb,
            other => other.to_rgb8(),
        };
        sink.write_frame(&denoised)?;
        written += 1;
        info!("Processed frame {}/{}", written, total);
    }

    sink.finish()?;
    Ok(written)
}

impl Processor for VideoProcessor {
    fn process(&self, job: &Job) -> Result<JobReport> {
        let unopened = || Ok(JobReport::Video(VideoReport { frames: 0, output: None }));

        let info = match video::probe(&job.input) {
            Ok(info) => info,
            Err(e) => {
                error!("{}", e);
                return unopened();
            }
        };
        info!(
            "Input: {}x{} @ {:.3} fps, {} frames",
            info.width,
            info.height,
            info.fps,
            info.frame_count.map_or_else(|| "unknown".to_string(), |n| n.to_string())
        );

        let mut source = match FfmpegSource::open(&job.input, &info) {
            Ok(source) => source,
            Err(e) => {
                error!("{}", e);
                return unopened();
            }
        };
        let mut sink = FfmpegSink::create(&job.output, &info)?;

        let frames = denoise_stream(&mut source, &mut sink, job.params, info.frame_count)?;
        info!("Processed video saved to {}", job.output.display());

        Ok(JobReport::Video(VideoReport {
            frames,
            output: Some(job.output.clone()),
        }))
    }
}
