//! ffmpeg-backed frame reader and writer.
//!
//! Frames travel as packed `rgb24` over the child processes' stdio pipes.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Stdio};

use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use ffmpeg_sidecar::iter::FfmpegIterator;
use ffprobe::{ffprobe, FfProbeError};
use image::RgbImage;
use tracing::{debug, warn};

use crate::error::{DeGrainError, Result};

/// Four-character code written into the output container.
pub const FOURCC: &str = "mp4v";
const FALLBACK_FRAME_RATE: &str = "25/1";

#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Rate as reported by the container, e.g. `30000/1001`.
    pub frame_rate: String,
    pub fps: f64,
    /// Not every container records a frame count.
    pub frame_count: Option<u64>,
}

pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let fps = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

pub fn probe(path: &Path) -> Result<VideoInfo> {
    debug!("Running ffprobe on {}", path.display());
    let probe_error = |reason: String| DeGrainError::VideoProbe {
        path: path.to_path_buf(),
        reason,
    };

    let metadata = ffprobe(path).map_err(|err| {
        probe_error(match err {
            FfProbeError::Io(e) => format!("could not run ffprobe: {}", e),
            FfProbeError::Status(output) => String::from_utf8_lossy(&output.stderr).trim().to_string(),
            other => format!("{:?}", other),
        })
    })?;

    let stream = metadata
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| probe_error("no video stream".to_string()))?;

    let width = stream.width.filter(|w| *w > 0);
    let height = stream.height.filter(|h| *h > 0);
    let (width, height) = match (width, height) {
        (Some(w), Some(h)) => (w as u32, h as u32),
        _ => return Err(probe_error("video stream has no dimensions".to_string())),
    };

    let (frame_rate, fps) = [stream.r_frame_rate.as_str(), stream.avg_frame_rate.as_str()]
        .into_iter()
        .find_map(|rate| parse_frame_rate(rate).map(|fps| (rate.to_string(), fps)))
        .unwrap_or_else(|| {
            warn!("No usable frame rate in {}, assuming {}", path.display(), FALLBACK_FRAME_RATE);
            (FALLBACK_FRAME_RATE.to_string(), 25.0)
        });

    let frame_count = stream.nb_frames.as_deref().and_then(|n| n.parse::<u64>().ok());

    Ok(VideoInfo {
        width,
        height,
        frame_rate,
        fps,
        frame_count,
    })
}

/// Sequential frame reader. A decode or read failure ends the stream.
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<RgbImage>;
}

/// Sequential frame writer.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// Flushes and closes the output.
    fn finish(&mut self) -> Result<()>;
}

/// Reaps a child that may still be running.
fn release(child: &mut Child, what: &str) {
    if let Ok(None) = child.try_wait() {
        debug!("Stopping ffmpeg {}", what);
        let _ = child.kill();
    }
    let _ = child.wait();
}

/// Decodes the first video stream of a file into `rgb24` frames.
pub struct FfmpegSource {
    child: FfmpegChild,
    events: FfmpegIterator,
    path: PathBuf,
}

impl FfmpegSource {
    pub fn open(path: &Path, info: &VideoInfo) -> Result<Self> {
        let open_error = |reason: String| DeGrainError::VideoOpen {
            path: path.to_path_buf(),
            reason,
        };

        let mut child = FfmpegCommand::new()
            .args(["-hide_banner", "-nostdin", "-noautorotate", "-i"])
            .arg(path)
            .args(["-map", "0:v:0"])
            .rawvideo()
            .spawn()
            .map_err(|e| open_error(e.to_string()))?;

        let events = match child.iter() {
            Ok(events) => events,
            Err(e) => {
                release(child.as_inner_mut(), "decoder");
                return Err(open_error(e.to_string()));
            }
        };
        debug!("Decoding {}x{} frames from {}", info.width, info.height, path.display());

        Ok(Self {
            child,
            events,
            path: path.to_path_buf(),
        })
    }

    #[cfg(test)]
    fn pid(&mut self) -> u32 {
        self.child.as_inner_mut().id()
    }
}

impl FrameSource for FfmpegSource {
    fn next_frame(&mut self) -> Option<RgbImage> {
        for event in self.events.by_ref() {
            match event {
                FfmpegEvent::OutputFrame(frame) => {
                    return RgbImage::from_raw(frame.width, frame.height, frame.data);
                }
                FfmpegEvent::Error(e) => warn!("Decoder error on {}: {}", self.path.display(), e),
                FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, line) => {
                    warn!("Decoder error on {}: {}", self.path.display(), line)
                }
                _ => {}
            }
        }
        None
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        release(self.child.as_inner_mut(), "decoder");
    }
}

/// Encodes `rgb24` frames written to ffmpeg's stdin as MPEG-4 part 2.
pub struct FfmpegSink {
    child: FfmpegChild,
    stdin: Option<BufWriter<ChildStdin>>,
}

impl FfmpegSink {
    pub fn create(path: &Path, info: &VideoInfo) -> Result<Self> {
        let size = format!("{}x{}", info.width, info.height);
        let mut command = FfmpegCommand::new();
        command
            .args(["-hide_banner", "-v", "error", "-nostdin", "-y"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-s", size.as_str(), "-r", info.frame_rate.as_str()])
            .args(["-i", "pipe:0", "-c:v", "mpeg4", "-tag:v", FOURCC])
            .arg(path);
        // Nothing reads the encoder's output streams.
        command.as_inner_mut().stdout(Stdio::null()).stderr(Stdio::inherit());
        let mut child = command.spawn().map_err(DeGrainError::EncoderStart)?;

        let Some(stdin) = child.take_stdin() else {
            release(child.as_inner_mut(), "encoder");
            return Err(DeGrainError::Encoder("encoder has no stdin".to_string()));
        };

        Ok(Self {
            child,
            stdin: Some(BufWriter::new(stdin)),
        })
    }

    #[cfg(test)]
    fn pid(&mut self) -> u32 {
        self.child.as_inner_mut().id()
    }
}

impl FrameSink for FfmpegSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| DeGrainError::Encoder("encoder already closed".to_string()))?;
        stdin
            .write_all(frame.as_raw())
            .map_err(|e| DeGrainError::Encoder(e.to_string()))
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin.flush().map_err(|e| DeGrainError::Encoder(e.to_string()))?;
        }
        let status = self.child.wait()?;
        if status.success() {
            Ok(())
        } else {
            Err(DeGrainError::Encoder(format!("ffmpeg exited with {}", status)))
        }
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        // Closing stdin lets ffmpeg finalise whatever was written so far.
        drop(self.stdin.take());
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::tempdir;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25/1"), Some(25.0));
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("24"), Some(24.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
        assert_eq!(parse_frame_rate(""), None);
    }

    #[test]
    fn test_probe_missing_file() {
        let result = probe(Path::new("/does/not/exist.mp4"));
        assert!(matches!(result, Err(DeGrainError::VideoProbe { .. })));
    }

    fn ffmpeg_available() -> bool {
        ["ffmpeg", "ffprobe"].iter().all(|tool| {
            Command::new(tool)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false)
        })
    }

    fn test_clip(dir: &Path) -> PathBuf {
        let clip = dir.join("clip.mp4");
        let status = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin", "-y", "-f", "lavfi", "-i", "testsrc=size=32x24:rate=10"])
            .args(["-frames:v", "3", "-c:v", "mpeg4"])
            .arg(&clip)
            .status()
            .unwrap();
        assert!(status.success());
        clip
    }

    #[cfg(target_os = "linux")]
    fn is_reaped(pid: u32) -> bool {
        !Path::new(&format!("/proc/{}", pid)).exists()
    }

    #[test]
    fn test_release_stops_running_child() {
        let Ok(mut child) = Command::new("sleep").arg("30").spawn() else {
            eprintln!("sleep not found, skipping");
            return;
        };

        release(&mut child, "sleeper");

        assert!(child.try_wait().unwrap().is_some());
    }

    #[test]
    fn test_source_reads_every_frame() {
        if !ffmpeg_available() {
            eprintln!("ffmpeg not found, skipping");
            return;
        }
        let dir = tempdir().unwrap();
        let clip = test_clip(dir.path());
        let info = probe(&clip).unwrap();

        let mut source = FfmpegSource::open(&clip, &info).unwrap();
        let mut frames = 0;
        while let Some(frame) = source.next_frame() {
            assert_eq!(frame.dimensions(), (32, 24));
            frames += 1;
        }

        assert_eq!(frames, 3);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_source_dropped_mid_stream_reaps_decoder() {
        if !ffmpeg_available() {
            eprintln!("ffmpeg not found, skipping");
            return;
        }
        let dir = tempdir().unwrap();
        let clip = test_clip(dir.path());
        let info = probe(&clip).unwrap();

        let mut source = FfmpegSource::open(&clip, &info).unwrap();
        assert!(source.next_frame().is_some());
        let pid = source.pid();
        drop(source);

        assert!(is_reaped(pid), "decoder {} left behind", pid);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_sink_dropped_without_finish_reaps_encoder() {
        if !ffmpeg_available() {
            eprintln!("ffmpeg not found, skipping");
            return;
        }
        let dir = tempdir().unwrap();
        let output = dir.path().join("partial.mp4");
        let info = VideoInfo {
            width: 32,
            height: 24,
            frame_rate: "10/1".to_string(),
            fps: 10.0,
            frame_count: None,
        };

        let mut sink = FfmpegSink::create(&output, &info).unwrap();
        sink.write_frame(&RgbImage::from_pixel(32, 24, image::Rgb([90, 120, 30])))
            .unwrap();
        let pid = sink.pid();
        drop(sink);

        assert!(is_reaped(pid), "encoder {} left behind", pid);
        assert!(output.exists());
    }
}
