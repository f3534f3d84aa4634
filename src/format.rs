//! Format registry: extension → descriptor resolution and pair rules.
//!
//! The registry is the single source of truth for which formats exist
//! and what each one can hold. All per-format branching in the pipeline
//! dispatches on [`ImageFormat`] obtained here — extension strings are
//! never compared anywhere else.
//!
//! Matching is purely suffix-based and case-insensitive; there is no
//! content sniffing.

use crate::error::ConvertError;
use std::path::Path;

/// Closed set of supported formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Bmp,
    Tiff,
    WebP,
    Gif,
    Avif,
    Heif,
    Svg,
    Pdf,
}

/// Static capability record, one per supported format.
#[derive(Debug, Clone, Copy)]
pub struct FormatDescriptor {
    pub format: ImageFormat,
    /// Canonical display name.
    pub name: &'static str,
    /// Accepted extensions, lowercase, without the dot. The first entry
    /// is the canonical one.
    pub extensions: &'static [&'static str],
    /// Whether the encoded form can carry an alpha channel.
    pub supports_alpha: bool,
    /// Whether the encoded form can carry more than one frame/page.
    pub supports_multi_frame: bool,
    /// Whether an EXIF container can be embedded.
    pub supports_exif: bool,
    /// Resolution-independent vector content (requires rasterization).
    pub is_vector: bool,
    /// Multi-page document; participates only through the PDF bridge.
    pub is_document: bool,
    /// Whether quality applies at encode time (lossy target).
    pub is_lossy: bool,
}

static FORMATS: &[FormatDescriptor] = &[
    FormatDescriptor {
        format: ImageFormat::Jpeg,
        name: "JPEG",
        extensions: &["jpg", "jpeg", "jfif"],
        supports_alpha: false,
        supports_multi_frame: false,
        supports_exif: true,
        is_vector: false,
        is_document: false,
        is_lossy: true,
    },
    FormatDescriptor {
        format: ImageFormat::Png,
        name: "PNG",
        extensions: &["png"],
        supports_alpha: true,
        supports_multi_frame: false,
        supports_exif: true,
        is_vector: false,
        is_document: false,
        is_lossy: false,
    },
    FormatDescriptor {
        format: ImageFormat::Bmp,
        name: "BMP",
        extensions: &["bmp"],
        supports_alpha: false,
        supports_multi_frame: false,
        supports_exif: false,
        is_vector: false,
        is_document: false,
        is_lossy: false,
    },
    FormatDescriptor {
        format: ImageFormat::Tiff,
        name: "TIFF",
        extensions: &["tiff", "tif"],
        supports_alpha: true,
        supports_multi_frame: true,
        supports_exif: true,
        is_vector: false,
        is_document: false,
        is_lossy: false,
    },
    FormatDescriptor {
        format: ImageFormat::WebP,
        name: "WebP",
        extensions: &["webp"],
        supports_alpha: true,
        supports_multi_frame: true,
        supports_exif: true,
        is_vector: false,
        is_document: false,
        is_lossy: true,
    },
    FormatDescriptor {
        format: ImageFormat::Gif,
        name: "GIF",
        extensions: &["gif"],
        supports_alpha: true,
        supports_multi_frame: true,
        supports_exif: false,
        is_vector: false,
        is_document: false,
        is_lossy: false,
    },
    FormatDescriptor {
        format: ImageFormat::Avif,
        name: "AVIF",
        extensions: &["avif"],
        supports_alpha: true,
        supports_multi_frame: false,
        supports_exif: false,
        is_vector: false,
        is_document: false,
        is_lossy: true,
    },
    FormatDescriptor {
        format: ImageFormat::Heif,
        name: "HEIF",
        extensions: &["heif", "heic"],
        supports_alpha: true,
        supports_multi_frame: false,
        supports_exif: false,
        is_vector: false,
        is_document: false,
        is_lossy: true,
    },
    FormatDescriptor {
        format: ImageFormat::Svg,
        name: "SVG",
        extensions: &["svg"],
        supports_alpha: true,
        supports_multi_frame: false,
        supports_exif: false,
        is_vector: true,
        is_document: false,
        is_lossy: false,
    },
    FormatDescriptor {
        format: ImageFormat::Pdf,
        name: "PDF",
        extensions: &["pdf"],
        supports_alpha: false,
        supports_multi_frame: true,
        supports_exif: false,
        is_vector: false,
        is_document: true,
        is_lossy: false,
    },
];

/// The file extension of `filename`, lowercased, including the dot.
///
/// Pure string inspection; does not touch the filesystem. Returns an
/// empty string when there is no extension.
pub fn get_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

fn descriptor_for_ext(ext: &str) -> Option<&'static FormatDescriptor> {
    let ext = ext.trim_start_matches('.');
    FORMATS
        .iter()
        .find(|d| d.extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

/// Resolve a path to its format descriptor by extension.
pub fn resolve(path: &Path) -> Result<&'static FormatDescriptor, ConvertError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    if ext.is_empty() {
        return Err(ConvertError::UnsupportedFormat(format!(
            "{} has no file extension",
            path.display()
        )));
    }
    descriptor_for_ext(ext)
        .ok_or_else(|| ConvertError::UnsupportedFormat(format!(".{}", ext.to_ascii_lowercase())))
}

/// Whether the filename's extension belongs to a supported format.
pub fn is_supported_format(filename: &str) -> bool {
    let ext = get_extension(filename);
    !ext.is_empty() && descriptor_for_ext(&ext).is_some()
}

/// Format-pair rules for the single-file pipeline.
///
/// - Raster → vector is never invertible and is rejected outright.
/// - Vector sources are fine: they are rasterized before the pixel path.
/// - Documents (PDF) convert to and from anything, but only through the
///   PDF bridge — `convert` routes them there.
pub fn is_convertible_pair(_source: &FormatDescriptor, target: &FormatDescriptor) -> bool {
    if target.is_vector {
        // svg → svg would be a byte copy, not a conversion; everything
        // else would require vectorization we do not do.
        return false;
    }
    true
}

/// All descriptors, for capability listings.
pub fn all_formats() -> &'static [FormatDescriptor] {
    FORMATS
}
