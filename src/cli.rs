use std::path::PathBuf;

use clap::Parser;

use crate::job::{DenoiseParams, Job, OutputFormat};

#[derive(Parser, Debug)]
#[command(
    name = "degrain",
    version,
    about = "DeGrain - non-local-means denoising for images, image folders and video",
    long_about = "Denoises a video file, every image of a folder, or a single image. \
                 Run without arguments to open the graphical front-end."
)]
pub struct Args {
    /// Input video, image folder or image file
    #[arg(long, value_name = "PATH")]
    pub input: PathBuf,

    /// Output video, folder or image file
    #[arg(long, value_name = "PATH")]
    pub output: PathBuf,

    /// Luminance filter strength
    #[arg(long = "h", default_value_t = 10)]
    pub h: u32,

    /// Colour filter strength
    #[arg(long = "hColor", default_value_t = 10)]
    pub h_color: u32,

    /// Output format for image folders (jpg, png or exr)
    #[arg(long, default_value_t = OutputFormat::Png)]
    pub format: OutputFormat,

    #[arg(short, long, help = "Enable detailed logging output")]
    pub verbose: bool,
}

impl Args {
    pub fn to_job(&self) -> Job {
        Job {
            input: self.input.clone(),
            output: self.output.clone(),
            params: DenoiseParams::new(self.h, self.h_color),
            format: self.format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["degrain", "--input", "in.mp4", "--output", "out.mp4"]).unwrap();
        let job = args.to_job();

        assert_eq!(job.input, PathBuf::from("in.mp4"));
        assert_eq!(job.output, PathBuf::from("out.mp4"));
        assert_eq!(job.params, DenoiseParams::new(10, 10));
        assert_eq!(job.format, OutputFormat::Png);
        assert!(!args.verbose);
    }

    #[test]
    fn test_strengths_and_format() {
        let args = Args::try_parse_from([
            "degrain", "--input", "frames", "--output", "clean", "--h", "4", "--hColor", "25", "--format", "EXR", "-v",
        ])
        .unwrap();

        assert_eq!(args.to_job().params, DenoiseParams::new(4, 25));
        assert_eq!(args.format, OutputFormat::Exr);
        assert!(args.verbose);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Args::try_parse_from(["degrain", "--input", "a", "--output", "b", "--format", "gif"]).is_err());
        assert!(Args::try_parse_from(["degrain", "--input", "a", "--output", "b", "--h", "-3"]).is_err());
        assert!(Args::try_parse_from(["degrain", "--input", "a"]).is_err());
    }
}
