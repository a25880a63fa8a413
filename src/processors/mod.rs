pub mod batch;
pub mod classify;
pub mod single;
pub mod video;

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::codec::ImageCodec;
use crate::error::{DeGrainError, Result};
use crate::job::{Job, JobReport};
use classify::InputKind;

/// One processing mode.
pub trait Processor {
    fn process(&self, job: &Job) -> Result<JobReport>;
}

/// Factory for the processor matching a classified input.
pub fn get_processor(kind: InputKind, codec: ImageCodec) -> Option<Box<dyn Processor>> {
    match kind {
        InputKind::Directory => Some(Box::new(batch::DirectoryProcessor::new(codec))),
        InputKind::VideoFile => Some(Box::new(video::VideoProcessor::new())),
        InputKind::ImageFile => Some(Box::new(single::SingleImageProcessor::new(codec))),
        InputKind::Invalid => None,
    }
}

/// Classifies the job's input and runs the matching processor.
pub fn run(job: &Job, codec: ImageCodec) -> Result<JobReport> {
    let kind = classify::classify(&job.input);
    match kind {
        InputKind::Directory => info!("Processing image sequence in {}", job.input.display()),
        InputKind::VideoFile => info!("Processing video file {}", job.input.display()),
        InputKind::ImageFile => info!("Processing image {}", job.input.display()),
        InputKind::Invalid => {}
    }

    match get_processor(kind, codec) {
        Some(processor) => processor.process(job),
        None => {
            error!("Input must be a video file, a folder of images, or a single image file.");
            Err(DeGrainError::InvalidInput(job.input.clone()))
        }
    }
}

/// `<dir>/<input stem>.<extension>`
pub fn output_path_in(dir: &Path, input: &Path, extension: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or(input.as_os_str());
    let mut name = stem.to_os_string();
    name.push(".");
    name.push(extension);
    dir.join(name)
}
