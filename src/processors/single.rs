use tracing::{debug, info, warn};

use super::{output_path_in, Processor};
use crate::codec::ImageCodec;
use crate::denoise;
use crate::error::Result;
use crate::job::{Job, JobReport, OutputFormat, SingleReport};

/// Denoises one image file.
///
/// When the output names an existing directory the result is written there as
/// `<stem>.<format>`. Otherwise the output path is used as-is and its own
/// extension picks the encoder; the requested format then only decides
/// whether an EXR destination is written at half precision.
pub struct SingleImageProcessor {
    codec: ImageCodec,
}

impl SingleImageProcessor {
    pub fn new(codec: ImageCodec) -> Self {
        Self { codec }
    }
}

impl Processor for SingleImageProcessor {
    fn process(&self, job: &Job) -> Result<JobReport> {
        let image = match self.codec.load(&job.input) {
            Ok(image) => image,
            Err(e) => {
                warn!("Skipping {}, not an image.", job.input.display());
                debug!("{}", e);
                return Ok(JobReport::Single(SingleReport { output: None }));
            }
        };

        let denoised = denoise::denoise(&image, job.params)?;

        let out_path = if job.output.is_dir() {
            output_path_in(&job.output, &job.input, job.format.extension())
        } else {
            job.output.clone()
        };
        self.codec
            .save(&denoised, &out_path, job.format == OutputFormat::Exr)?;
        info!("Processed {} -> {}", job.input.display(), out_path.display());

        Ok(JobReport::Single(SingleReport {
            output: Some(out_path),
        }))
    }
}
