//! Single-file conversion: the request type, the orchestrator, and
//! source inspection.
//!
//! [`convert`] is the one entry point every pair of formats goes
//! through. It routes PDF endpoints through the PDF bridge and
//! everything else through the pixel pipeline, then runs the metadata
//! and timestamp carry-over against the freshly written destination.

use std::path::{Path, PathBuf};

use crate::error::ConvertError;
use crate::exif::{self, MetadataRecord};
use crate::format::{self, ImageFormat};
use crate::options::{vector_raster_dpi, Quality, DEFAULTS};
use crate::pdf::{self, FitMethod, PageSize};
use crate::pixels;
use crate::timestamps;

/// Everything needed to convert one file.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub quality: Quality,
    /// Overrides the source's declared resolution when set; also the
    /// rasterization resolution for vector and PDF sources.
    pub dpi: Option<f32>,
    pub preserve_metadata: bool,
    pub preserve_timestamps: bool,
}

impl ConversionRequest {
    pub fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
            quality: Quality::default(),
            dpi: None,
            preserve_metadata: true,
            preserve_timestamps: true,
        }
    }
}

/// Convert one file. Returns the destination path on success.
pub fn convert(request: &ConversionRequest) -> Result<PathBuf, ConvertError> {
    if !request.source.exists() {
        return Err(ConvertError::NotFound(request.source.clone()));
    }

    let source_desc = format::resolve(&request.source)?;
    let target_desc = format::resolve(&request.dest)?;
    if !format::is_convertible_pair(source_desc, target_desc) {
        return Err(ConvertError::UnsupportedPair {
            from: source_desc.name.to_string(),
            to: target_desc.name.to_string(),
        });
    }

    if let Some(parent) = request.dest.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    log::info!(
        "converting {} ({}) to {} ({})",
        request.source.display(),
        source_desc.name,
        request.dest.display(),
        target_desc.name
    );

    match (source_desc.is_document, target_desc.is_document) {
        (true, true) => pdf::copy_pdf(&request.source, &request.dest)?,
        (true, false) => convert_from_pdf(request, target_desc)?,
        (false, true) => pdf::images_to_pdf(
            &[request.source.clone()],
            &request.dest,
            PageSize::Letter,
            FitMethod::Contain,
            request.quality,
            None,
        )?,
        (false, false) => convert_pixels(request, source_desc, target_desc)?,
    }

    if request.preserve_timestamps {
        timestamps::copy_timestamps(&request.source, &request.dest)?;
    }

    Ok(request.dest.clone())
}

/// First page of a PDF source, rasterized into the target format.
fn convert_from_pdf(
    request: &ConversionRequest,
    target: &'static format::FormatDescriptor,
) -> Result<(), ConvertError> {
    let dpi = request.dpi.unwrap_or(DEFAULTS.pdf_render_dpi);
    let img = pdf::render_page(&request.source, 0, dpi)?;
    let prepared = pixels::prepare_for_target(img, target);
    pixels::encode(&prepared, &request.dest, target, request.quality)
}

/// The raster/vector path: decode, adapt, encode, carry metadata.
fn convert_pixels(
    request: &ConversionRequest,
    source: &'static format::FormatDescriptor,
    target: &'static format::FormatDescriptor,
) -> Result<(), ConvertError> {
    let summary = if request.preserve_metadata && source.supports_exif {
        exif::read_summary(&request.source)
    } else {
        exif::ExifSummary::default()
    };

    let raster_dpi = vector_raster_dpi(request.dpi);
    let img = pixels::decode(&request.source, source, raster_dpi)?;
    let prepared = pixels::prepare_for_target(img, target);
    pixels::encode(&prepared, &request.dest, target, request.quality)?;

    if request.preserve_metadata {
        let effective_dpi = effective_dpi(request.dpi, summary.dpi);
        exif::writer::write_metadata(
            &request.source,
            &request.dest,
            target,
            &summary,
            Some(effective_dpi),
        )?;
    }

    Ok(())
}

/// Request DPI wins over the source's declared resolution; 72 DPI is
/// the substitute when neither exists.
fn effective_dpi(requested: Option<f32>, source_dpi: Option<(f32, f32)>) -> (f32, f32) {
    match (requested, source_dpi) {
        (Some(d), _) => (d, d),
        (None, Some(pair)) => pair,
        (None, None) => (DEFAULTS.dpi, DEFAULTS.dpi),
    }
}

/// Inspect a source file without converting it.
///
/// `include_exif` gates the camera/GPS/raw-tag blocks; identity,
/// geometry and format facts are always reported.
pub fn get_image_info(path: &Path, include_exif: bool) -> Result<MetadataRecord, ConvertError> {
    if !path.exists() {
        return Err(ConvertError::NotFound(path.to_path_buf()));
    }
    let desc = format::resolve(path)?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if desc.format == ImageFormat::Pdf {
        let doc_info = pdf::pdf_info(path)?;
        let (width, height) = pdf::first_page_size(path)?
            .map(|(w, h)| (w.round() as u32, h.round() as u32))
            .unwrap_or((0, 0));
        return Ok(MetadataRecord {
            filename,
            path: path.to_path_buf(),
            width,
            height,
            format: desc.name.to_string(),
            mode: exif::ColorMode::Rgb,
            dpi: None,
            camera: None,
            gps: None,
            raw_exif: Default::default(),
            pdf_info: Some(doc_info),
        });
    }

    let img = pixels::decode(path, desc, DEFAULTS.vector_dpi_floor)?;
    let summary = if include_exif && desc.supports_exif {
        exif::read_summary(path)
    } else {
        exif::ExifSummary::default()
    };

    Ok(MetadataRecord {
        filename,
        path: path.to_path_buf(),
        width: img.width(),
        height: img.height(),
        format: desc.name.to_string(),
        mode: pixels::mode_of(&img),
        dpi: summary.dpi,
        camera: summary.camera,
        gps: summary.gps,
        raw_exif: summary.raw,
        pdf_info: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn write_png(dir: &tempfile::TempDir, name: &str, w: u32, h: u32) -> PathBuf {
        let path = dir.path().join(name);
        RgbImage::from_pixel(w, h, Rgb([12, 34, 56])).save(&path).unwrap();
        path
    }

    #[test]
    fn missing_source_is_not_found() {
        let request = ConversionRequest::new("/nonexistent/a.png", "/tmp/b.jpg");
        let err = convert(&request).unwrap_err();
        assert!(matches!(err, ConvertError::NotFound(_)));
    }

    #[test]
    fn unknown_target_extension_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_png(&dir, "a.png", 4, 4);
        let request = ConversionRequest::new(source, dir.path().join("b.xyz"));
        let err = convert(&request).unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedFormat(_)));
    }

    #[test]
    fn raster_to_svg_is_an_unsupported_pair() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_png(&dir, "a.png", 4, 4);
        let request = ConversionRequest::new(source, dir.path().join("b.svg"));
        let err = convert(&request).unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedPair { .. }));
    }

    #[test]
    fn png_to_jpeg_preserves_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_png(&dir, "a.png", 32, 16);
        let dest = dir.path().join("a.jpg");
        let out = convert(&ConversionRequest::new(&source, &dest)).unwrap();
        assert_eq!(out, dest);

        let info = get_image_info(&dest, true).unwrap();
        assert_eq!((info.width, info.height), (32, 16));
        assert_eq!(info.format, "JPEG");
    }

    #[test]
    fn transparency_flattens_to_white_for_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.png");
        RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0]))
            .save(&source)
            .unwrap();
        let dest = dir.path().join("a.jpg");
        convert(&ConversionRequest::new(&source, &dest)).unwrap();

        let img = image::open(&dest).unwrap().to_rgb8();
        let px = img.get_pixel(4, 4);
        // lossy encode, so allow a small wobble around pure white
        assert!(px.0.iter().all(|&c| c > 250), "expected white, got {:?}", px);
    }

    #[test]
    fn destination_parent_directories_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_png(&dir, "a.png", 4, 4);
        let dest = dir.path().join("nested/deep/a.bmp");
        convert(&ConversionRequest::new(source, &dest)).unwrap();
        assert!(dest.exists());
    }

    #[test]
    fn timestamps_follow_the_source() {
        use std::fs::{FileTimes, OpenOptions};
        use std::time::{Duration, SystemTime};

        let dir = tempfile::tempdir().unwrap();
        let source = write_png(&dir, "a.png", 4, 4);
        let old = SystemTime::now() - Duration::from_secs(7200);
        let f = OpenOptions::new().write(true).open(&source).unwrap();
        f.set_times(FileTimes::new().set_accessed(old).set_modified(old))
            .unwrap();
        drop(f);

        let dest = dir.path().join("a.jpg");
        convert(&ConversionRequest::new(&source, &dest)).unwrap();

        let src_mtime = std::fs::metadata(&source).unwrap().modified().unwrap();
        let dst_mtime = std::fs::metadata(&dest).unwrap().modified().unwrap();
        let delta = src_mtime
            .duration_since(dst_mtime)
            .unwrap_or_else(|e| e.duration());
        assert!(delta < Duration::from_secs(1));
    }

    #[test]
    fn effective_dpi_precedence() {
        assert_eq!(effective_dpi(Some(300.0), Some((72.0, 72.0))), (300.0, 300.0));
        assert_eq!(effective_dpi(None, Some((150.0, 150.0))), (150.0, 150.0));
        assert_eq!(effective_dpi(None, None), (72.0, 72.0));
    }

    #[test]
    fn info_reports_mode_and_format() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.png");
        RgbaImage::from_pixel(5, 7, Rgba([1, 2, 3, 200]))
            .save(&source)
            .unwrap();
        let info = get_image_info(&source, true).unwrap();
        assert_eq!(info.format, "PNG");
        assert_eq!(info.mode, exif::ColorMode::Rgba);
        assert_eq!((info.width, info.height), (5, 7));
        assert!(info.pdf_info.is_none());
    }

    #[test]
    fn info_can_suppress_exif_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let plain = write_png(&dir, "plain.png", 4, 4);
        let tagged = dir.path().join("tagged.jpg");
        convert(&ConversionRequest::new(&plain, &tagged)).unwrap();

        let gps = exif::GpsInfo {
            latitude: 59.3293,
            longitude: 18.0686,
            altitude: None,
        };
        let summary = exif::ExifSummary {
            gps: Some(gps),
            ..Default::default()
        };
        let jpeg = format::resolve(&tagged).unwrap();
        exif::writer::write_metadata(&plain, &tagged, jpeg, &summary, None).unwrap();

        let with_exif = get_image_info(&tagged, true).unwrap();
        assert!(with_exif.gps.is_some());
        assert!(!with_exif.raw_exif.is_empty());

        let without = get_image_info(&tagged, false).unwrap();
        assert!(without.gps.is_none());
        assert!(without.camera.is_none());
        assert!(without.raw_exif.is_empty());
        // geometry still reported
        assert_eq!((without.width, without.height), (4, 4));
    }

    #[test]
    fn info_on_composed_pdf_reports_pages() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_png(&dir, "a.png", 16, 16);
        let pdf_path = dir.path().join("a.pdf");
        convert(&ConversionRequest::new(source, &pdf_path)).unwrap();

        let info = get_image_info(&pdf_path, true).unwrap();
        let doc = info.pdf_info.unwrap();
        assert_eq!(doc.page_count, 1);
        // letter page
        assert_eq!((info.width, info.height), (612, 792));
    }
}
