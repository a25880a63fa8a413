use std::path::Path;

use tracing::debug;

/// Containers handled as video, matched case-insensitively.
pub const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "avi", "mov", "mkv", "webm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Directory,
    VideoFile,
    ImageFile,
    Invalid,
}

pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Decides how `path` will be processed. Image files are not decoded here.
pub fn classify(path: &Path) -> InputKind {
    let kind = if path.is_dir() {
        InputKind::Directory
    } else if is_video_file(path) {
        InputKind::VideoFile
    } else if path.is_file() {
        InputKind::ImageFile
    } else {
        InputKind::Invalid
    };
    debug!("Classified {} as {:?}", path.display(), kind);
    kind
}
