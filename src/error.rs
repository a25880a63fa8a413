use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeGrainError {
    #[error("Input must be a video file, a folder of images, or a single image file: {0}")]
    InvalidInput(PathBuf),

    #[error("Failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode image {path}: {reason}")]
    Encode { path: PathBuf, reason: String },

    #[error("OpenEXR support is disabled: {0}")]
    ExrDisabled(PathBuf),

    #[error("Unsupported pixel layout: {0}")]
    UnsupportedPixelFormat(String),

    #[error("Unknown output format '{0}' (expected one of jpg, png, exr)")]
    UnknownFormat(String),

    #[error("Failed to probe video {path}: {reason}")]
    VideoProbe { path: PathBuf, reason: String },

    #[error("Failed to open video {path}: {reason}")]
    VideoOpen { path: PathBuf, reason: String },

    #[error("Failed to start ffmpeg: {0}")]
    EncoderStart(#[source] std::io::Error),

    #[error("Video encoder failed: {0}")]
    Encoder(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DeGrainError>;
