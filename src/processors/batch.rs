use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{output_path_in, Processor};
use crate::codec::ImageCodec;
use crate::denoise;
use crate::error::{DeGrainError, Result};
use crate::job::{BatchReport, Job, JobReport, OutputFormat};

/// Denoises every image of a folder into an output folder.
pub struct DirectoryProcessor {
    codec: ImageCodec,
}

impl DirectoryProcessor {
    pub fn new(codec: ImageCodec) -> Self {
        Self { codec }
    }
}

/// Files of `dir` whose name has an extension, sorted by name. Hidden files
/// and subdirectories are left out. Entries that cannot be inspected, such as
/// dangling links, are still listed so the caller can skip them by name.
pub fn list_candidates(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();
    for entry in walker {
        let path = match entry {
            Ok(entry) if entry.file_type().is_file() => entry.into_path(),
            Ok(_) => continue,
            Err(e) if e.depth() > 0 => match e.path() {
                Some(path) => {
                    debug!("Cannot inspect {}: {}", path.display(), e);
                    path.to_path_buf()
                }
                None => continue,
            },
            Err(e) => return Err(DeGrainError::Io(e.into())),
        };
        let hidden = path
            .file_name()
            .map_or(true, |name| name.to_string_lossy().starts_with('.'));
        if !hidden && path.extension().is_some() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

impl Processor for DirectoryProcessor {
    fn process(&self, job: &Job) -> Result<JobReport> {
        fs::create_dir_all(&job.output)?;

        let files = list_candidates(&job.input)?;
        debug!("Found {} candidate file(s) in {}", files.len(), job.input.display());

        let mut report = BatchReport::default();
        for path in files {
            let image = match self.codec.load(&path) {
                Ok(image) => image,
                Err(e) => {
                    warn!("Skipping {}, not an image.", path.display());
                    debug!("{}", e);
                    report.skipped.push(path);
                    continue;
                }
            };

            let denoised = denoise::denoise(&image, job.params)?;
            let out_path = output_path_in(&job.output, &path, job.format.extension());
            self.codec
                .save(&denoised, &out_path, job.format == OutputFormat::Exr)?;
            info!("Processed {} -> {}", path.display(), out_path.display());
            report.written.push(out_path);
        }

        Ok(JobReport::Images(report))
    }
}
