//! EXIF extraction via `kamadak-exif`.
//!
//! Extraction never fails a conversion: a file with no EXIF container,
//! or with a corrupt one, yields an empty [`ExifSummary`]. Individual
//! tags are parsed independently, so one malformed rational cannot take
//! the camera block (or anything else) down with it.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::exif::record::{CameraInfo, GpsInfo};

/// What the reader could recover from one file's EXIF container.
#[derive(Debug, Clone, Default)]
pub struct ExifSummary {
    pub dpi: Option<(f32, f32)>,
    pub camera: Option<CameraInfo>,
    pub gps: Option<GpsInfo>,
    pub raw: BTreeMap<String, String>,
}

/// Read and summarize the EXIF container of `path`.
///
/// Returns the empty summary when the file has no container or the
/// container cannot be parsed.
pub fn read_summary(path: &Path) -> ExifSummary {
    let Ok(file) = File::open(path) else {
        return ExifSummary::default();
    };
    let mut reader = BufReader::new(file);
    let exif_data = match exif::Reader::new().read_from_container(&mut reader) {
        Ok(data) => data,
        Err(e) => {
            log::debug!("no usable EXIF in {}: {e}", path.display());
            return ExifSummary::default();
        }
    };
    summarize(&exif_data)
}

fn summarize(exif_data: &exif::Exif) -> ExifSummary {
    let get_str = |tag: exif::Tag| -> Option<String> {
        exif_data
            .get_field(tag, exif::In::PRIMARY)
            .map(|f| f.display_value().to_string().trim_matches('"').to_string())
    };

    let get_rational = |tag: exif::Tag| -> Option<f64> {
        exif_data
            .get_field(tag, exif::In::PRIMARY)
            .and_then(|f| match f.value {
                exif::Value::Rational(ref v) if !v.is_empty() => Some(v[0].to_f64()),
                _ => None,
            })
    };

    let get_u32 = |tag: exif::Tag| -> Option<u32> {
        exif_data
            .get_field(tag, exif::In::PRIMARY)
            .and_then(|f| match f.value {
                exif::Value::Short(ref v) if !v.is_empty() => Some(v[0] as u32),
                exif::Value::Long(ref v) if !v.is_empty() => Some(v[0]),
                _ => None,
            })
    };

    let camera = CameraInfo {
        make: get_str(exif::Tag::Make),
        model: get_str(exif::Tag::Model),
        exposure_time: get_str(exif::Tag::ExposureTime),
        f_number: get_rational(exif::Tag::FNumber),
        iso: get_u32(exif::Tag::PhotographicSensitivity),
        focal_length: get_rational(exif::Tag::FocalLength),
    };

    ExifSummary {
        dpi: parse_dpi(&get_rational, &get_u32),
        camera: (!camera.is_empty()).then_some(camera),
        gps: parse_gps(exif_data),
        raw: raw_table(exif_data),
    }
}

/// XResolution/YResolution in the unit named by ResolutionUnit
/// (2 = inch, 3 = centimeter; absent defaults to inch). Vertical falls
/// back to horizontal when only one axis is declared.
fn parse_dpi(
    get_rational: &dyn Fn(exif::Tag) -> Option<f64>,
    get_u32: &dyn Fn(exif::Tag) -> Option<u32>,
) -> Option<(f32, f32)> {
    let x = get_rational(exif::Tag::XResolution)?;
    let y = get_rational(exif::Tag::YResolution).unwrap_or(x);
    let per_inch = match get_u32(exif::Tag::ResolutionUnit) {
        Some(3) => 2.54,
        _ => 1.0,
    };
    Some(((x * per_inch) as f32, (y * per_inch) as f32))
}

/// GPS is all-or-nothing: both coordinates must parse as DMS rational
/// triplets or no position is reported. Altitude is carried when
/// present but never required.
fn parse_gps(exif_data: &exif::Exif) -> Option<GpsInfo> {
    let lat_field = exif_data.get_field(exif::Tag::GPSLatitude, exif::In::PRIMARY)?;
    let lon_field = exif_data.get_field(exif::Tag::GPSLongitude, exif::In::PRIMARY)?;

    let parse_dms = |field: &exif::Field| -> Option<f64> {
        match &field.value {
            exif::Value::Rational(v) if v.len() >= 3 => {
                Some(v[0].to_f64() + v[1].to_f64() / 60.0 + v[2].to_f64() / 3600.0)
            }
            _ => None,
        }
    };

    let mut latitude = parse_dms(lat_field)?;
    let mut longitude = parse_dms(lon_field)?;

    if let Some(r) = exif_data.get_field(exif::Tag::GPSLatitudeRef, exif::In::PRIMARY) {
        if r.display_value().to_string().contains('S') {
            latitude = -latitude;
        }
    }
    if let Some(r) = exif_data.get_field(exif::Tag::GPSLongitudeRef, exif::In::PRIMARY) {
        if r.display_value().to_string().contains('W') {
            longitude = -longitude;
        }
    }

    let altitude = exif_data
        .get_field(exif::Tag::GPSAltitude, exif::In::PRIMARY)
        .and_then(|f| match &f.value {
            exif::Value::Rational(v) if !v.is_empty() => Some(v[0].to_f64()),
            _ => None,
        });

    Some(GpsInfo {
        latitude,
        longitude,
        altitude,
    })
}

/// Primary-IFD tags in display form. MakerNote is skipped: it is an
/// opaque vendor blob that only bloats the table.
fn raw_table(exif_data: &exif::Exif) -> BTreeMap<String, String> {
    exif_data
        .fields()
        .filter(|f| f.ifd_num == exif::In::PRIMARY && f.tag != exif::Tag::MakerNote)
        .map(|f| {
            (
                f.tag.to_string(),
                f.display_value().with_unit(exif_data).to_string(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_empty_summary() {
        let summary = read_summary(Path::new("/nonexistent/photo.jpg"));
        assert!(summary.camera.is_none());
        assert!(summary.gps.is_none());
        assert!(summary.raw.is_empty());
    }

    #[test]
    fn plain_image_without_exif_yields_empty_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.png");
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30]));
        img.save(&path).unwrap();

        let summary = read_summary(&path);
        assert!(summary.camera.is_none());
        assert!(summary.dpi.is_none());
        assert!(summary.gps.is_none());
    }
}
