use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::DeGrainError;

/// Bounds of the strength sliders in the front-end.
pub const STRENGTH_RANGE: RangeInclusive<u32> = 1..=30;

/// Patch size compared by the denoiser.
pub const TEMPLATE_WINDOW: usize = 7;
/// Neighbourhood searched for similar patches.
pub const SEARCH_WINDOW: usize = 21;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Jpg,
    #[default]
    Png,
    Exr,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Jpg, OutputFormat::Png, OutputFormat::Exr];

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Exr => "exr",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = DeGrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutputFormat::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(s))
            .ok_or_else(|| DeGrainError::UnknownFormat(s.to_string()))
    }
}

/// Luminance and colour filter strengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DenoiseParams {
    pub h: u32,
    pub h_color: u32,
}

impl DenoiseParams {
    pub fn new(h: u32, h_color: u32) -> Self {
        Self { h, h_color }
    }
}

impl Default for DenoiseParams {
    fn default() -> Self {
        Self { h: 10, h_color: 10 }
    }
}

/// Parameters of one processing run, captured before the work starts.
#[derive(Debug, Clone)]
pub struct Job {
    pub input: PathBuf,
    pub output: PathBuf,
    pub params: DenoiseParams,
    pub format: OutputFormat,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct VideoReport {
    pub frames: u64,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SingleReport {
    pub output: Option<PathBuf>,
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq)]
pub enum JobReport {
    Images(BatchReport),
    Video(VideoReport),
    Single(SingleReport),
}

impl JobReport {
    pub fn summary(&self) -> String {
        match self {
            JobReport::Images(report) => format!(
                "{} image(s) written, {} skipped",
                report.written.len(),
                report.skipped.len()
            ),
            JobReport::Video(VideoReport { frames, output: Some(path) }) => {
                format!("{} frame(s) written to {}", frames, path.display())
            }
            JobReport::Video(VideoReport { output: None, .. }) => {
                "Video could not be opened, nothing written".to_string()
            }
            JobReport::Single(SingleReport { output: Some(path) }) => {
                format!("Image written to {}", path.display())
            }
            JobReport::Single(SingleReport { output: None }) => {
                "Input is not a readable image, nothing written".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("png".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert_eq!("JPG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpg);
        assert_eq!("Exr".parse::<OutputFormat>().unwrap(), OutputFormat::Exr);
        assert!(matches!(
            "tiff".parse::<OutputFormat>(),
            Err(DeGrainError::UnknownFormat(s)) if s == "tiff"
        ));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(DenoiseParams::default(), DenoiseParams::new(10, 10));
        assert_eq!(OutputFormat::default(), OutputFormat::Png);
        assert!(STRENGTH_RANGE.contains(&DenoiseParams::default().h));
    }

    #[test]
    fn test_report_summary() {
        let report = JobReport::Images(BatchReport {
            written: vec![PathBuf::from("a.png"), PathBuf::from("c.png")],
            skipped: vec![PathBuf::from("b.txt")],
        });
        assert_eq!(report.summary(), "2 image(s) written, 1 skipped");
    }
}
