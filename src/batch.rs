//! Batch directory conversion.
//!
//! Files are discovered with `walkdir`, visited in file-name order, and
//! converted strictly one at a time. A failing file is recorded and the
//! run continues; only a missing or non-directory input fails the whole
//! batch. The relative directory structure of the input is mirrored
//! under the output directory in recursive mode.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::convert::{convert, ConversionRequest};
use crate::error::ConvertError;
use crate::format;
use crate::options::Quality;

/// Knobs for one batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Target extension without the dot (e.g. "webp"); `None` keeps
    /// each file's own format and re-encodes in place.
    pub output_format: Option<String>,
    pub recursive: bool,
    /// Leave already-present destinations untouched, recording them as
    /// skips rather than re-converting.
    pub skip_existing: bool,
    pub quality: Quality,
    pub dpi: Option<f32>,
    pub preserve_metadata: bool,
    pub preserve_timestamps: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            output_format: None,
            recursive: false,
            skip_existing: false,
            quality: Quality::default(),
            dpi: None,
            preserve_metadata: true,
            preserve_timestamps: true,
        }
    }
}

/// What happened to one file in a batch.
#[derive(Debug, Clone)]
pub enum Outcome {
    Converted(PathBuf),
    /// Destination already existed and `skip_existing` was set; carries
    /// the existing destination path.
    Skipped(PathBuf),
    Failed { kind: &'static str, reason: String },
}

/// Per-file outcomes in visit order, plus summary accessors.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub entries: Vec<(PathBuf, Outcome)>,
}

impl BatchReport {
    /// Destination paths of everything that ended up present: fresh
    /// conversions and skips alike, so back-to-back runs report the
    /// same set.
    pub fn outputs(&self) -> Vec<&Path> {
        self.entries
            .iter()
            .filter_map(|(_, outcome)| match outcome {
                Outcome::Converted(p) | Outcome::Skipped(p) => Some(p.as_path()),
                Outcome::Failed { .. } => None,
            })
            .collect()
    }

    pub fn converted_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, o)| matches!(o, Outcome::Converted(_)))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, o)| matches!(o, Outcome::Skipped(_)))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, o)| matches!(o, Outcome::Failed { .. }))
            .count()
    }
}

/// Convert every supported file under `input_dir` into `output_dir`.
pub fn batch_convert(
    input_dir: &Path,
    output_dir: &Path,
    options: &BatchOptions,
) -> Result<BatchReport, ConvertError> {
    if !input_dir.exists() {
        return Err(ConvertError::NotFound(input_dir.to_path_buf()));
    }
    if !input_dir.is_dir() {
        return Err(ConvertError::UnsupportedFormat(format!(
            "{} is not a directory",
            input_dir.display()
        )));
    }

    // an unknown target format fails the whole run before any file is
    // touched; per-file impossibilities are recorded below instead
    let target = match &options.output_format {
        Some(ext) => Some(format::resolve(Path::new(&format!("x.{ext}")))?),
        None => None,
    };

    let max_depth = if options.recursive { usize::MAX } else { 1 };
    let mut report = BatchReport::default();

    for entry in WalkDir::new(input_dir)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let source = entry.path();
        let name = source.file_name().map(|n| n.to_string_lossy());
        if !name.as_deref().is_some_and(format::is_supported_format) {
            continue;
        }

        let dest = match destination_for(source, input_dir, output_dir, target) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("batch: {}: {e}", source.display());
                report.entries.push((
                    source.to_path_buf(),
                    Outcome::Failed {
                        kind: e.kind(),
                        reason: e.to_string(),
                    },
                ));
                continue;
            }
        };

        if options.skip_existing && dest.exists() {
            log::debug!("skipping {}, destination exists", source.display());
            report
                .entries
                .push((source.to_path_buf(), Outcome::Skipped(dest)));
            continue;
        }

        let request = ConversionRequest {
            source: source.to_path_buf(),
            dest,
            quality: options.quality,
            dpi: options.dpi,
            preserve_metadata: options.preserve_metadata,
            preserve_timestamps: options.preserve_timestamps,
        };
        match convert(&request) {
            Ok(out) => report
                .entries
                .push((source.to_path_buf(), Outcome::Converted(out))),
            Err(e) => {
                log::warn!("batch: {} failed: {e}", source.display());
                report.entries.push((
                    source.to_path_buf(),
                    Outcome::Failed {
                        kind: e.kind(),
                        reason: e.to_string(),
                    },
                ));
            }
        }
    }

    log::info!(
        "batch finished: {} converted, {} skipped, {} failed",
        report.converted_count(),
        report.skipped_count(),
        report.failed_count()
    );
    Ok(report)
}

/// Mirror the source's relative location under the output directory and
/// apply the requested format's canonical extension. An impossible pair
/// (e.g. raster to SVG) is an error the caller records against the file.
fn destination_for(
    source: &Path,
    input_dir: &Path,
    output_dir: &Path,
    target: Option<&'static format::FormatDescriptor>,
) -> Result<PathBuf, ConvertError> {
    let relative = source
        .strip_prefix(input_dir)
        .map_err(|_| ConvertError::NotFound(source.to_path_buf()))?;
    let mut dest = output_dir.join(relative);

    if let Some(target) = target {
        let source_desc = format::resolve(source)?;
        if !format::is_convertible_pair(source_desc, target) {
            return Err(ConvertError::UnsupportedPair {
                from: source_desc.name.to_string(),
                to: target.name.to_string(),
            });
        }
        dest.set_extension(target.extensions[0]);
    }

    Ok(dest)
}
