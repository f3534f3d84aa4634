//! The canonical, format-independent metadata record.
//!
//! Everything the `info` operation reports is collected here, so
//! callers never see parser-specific types. All fields are optional
//! except identity and geometry; absence always means "the source did
//! not carry it", never "extraction failed" (failures are logged and
//! degrade to absence).

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Pixel layout of a decoded image, reduced to the classes that matter
/// for conversion decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColorMode {
    Rgb,
    Rgba,
    /// Single-channel grayscale.
    L,
    /// Grayscale with alpha.
    La,
}

impl ColorMode {
    pub fn has_alpha(self) -> bool {
        matches!(self, ColorMode::Rgba | ColorMode::La)
    }
}

/// Camera block extracted from EXIF. Every field is independent; a
/// malformed tag drops only that field.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CameraInfo {
    pub make: Option<String>,
    pub model: Option<String>,
    /// Display form, e.g. "1/250".
    pub exposure_time: Option<String>,
    pub f_number: Option<f64>,
    pub iso: Option<u32>,
    /// Focal length in millimeters.
    pub focal_length: Option<f64>,
}

impl CameraInfo {
    pub fn is_empty(&self) -> bool {
        self.make.is_none()
            && self.model.is_none()
            && self.exposure_time.is_none()
            && self.f_number.is_none()
            && self.iso.is_none()
            && self.focal_length.is_none()
    }
}

/// Decimal-degree GPS position. Constructed only when both latitude and
/// longitude parsed cleanly; altitude rides along when present.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GpsInfo {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
}

/// Document-level facts for PDF sources; also the shape callers fill
/// in to stamp a composed PDF's Info dictionary.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
}

/// Everything known about one source file.
#[derive(Debug, Clone, Serialize)]
pub struct MetadataRecord {
    pub filename: String,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Canonical format name from the registry, e.g. "JPEG".
    pub format: String,
    pub mode: ColorMode,
    /// (horizontal, vertical) dots per inch, when the source declares it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dpi: Option<(f32, f32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps: Option<GpsInfo>,
    /// All primary-IFD tags in display form, keyed by tag name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub raw_exif: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_info: Option<DocumentInfo>,
}
