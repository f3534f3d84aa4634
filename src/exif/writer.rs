//! EXIF write-back via `little_exif`.
//!
//! The strategy is carry-over first: the destination gets the source
//! container's tags wholesale when `little_exif` can parse it, so tags
//! this crate does not model still survive the conversion. On top of
//! the carried container we project the fields we do model — GPS and
//! the effective resolution — and, when nothing could be carried, the
//! basic camera identity from the read-side summary.
//!
//! Tag-level failures are logged and dropped. Only a failure to write
//! the destination container itself is an error.

use std::path::Path;

use little_exif::endian::Endian;
use little_exif::exif_tag::ExifTag;
use little_exif::exif_tag_format::ExifTagFormat;
use little_exif::ifd::ExifTagGroup;
use little_exif::metadata::Metadata;

use crate::error::ConvertError;
use crate::exif::reader::ExifSummary;
use crate::exif::record::GpsInfo;
use crate::format::FormatDescriptor;

const TAG_GPS_LATITUDE_REF: u16 = 0x0001;
const TAG_GPS_LATITUDE: u16 = 0x0002;
const TAG_GPS_LONGITUDE_REF: u16 = 0x0003;
const TAG_GPS_LONGITUDE: u16 = 0x0004;
const TAG_GPS_ALTITUDE_REF: u16 = 0x0005;
const TAG_GPS_ALTITUDE: u16 = 0x0006;
const TAG_X_RESOLUTION: u16 = 0x011A;
const TAG_Y_RESOLUTION: u16 = 0x011B;
const TAG_RESOLUTION_UNIT: u16 = 0x0128;

/// Write metadata into the already-encoded file at `dest`.
///
/// No-op when the target format has no EXIF container. `effective_dpi`
/// is what the pixel pipeline actually used, which may differ from the
/// source's declared resolution.
pub fn write_metadata(
    source: &Path,
    dest: &Path,
    target: &FormatDescriptor,
    summary: &ExifSummary,
    effective_dpi: Option<(f32, f32)>,
) -> Result<(), ConvertError> {
    if !target.supports_exif {
        log::debug!(
            "{} has no EXIF container, dropping metadata for {}",
            target.name,
            dest.display()
        );
        return Ok(());
    }

    let carried = load_source_metadata(source);
    let fresh = carried.is_none();
    let mut metadata = carried.unwrap_or_else(Metadata::new);

    // Camera identity only needs projecting when nothing was carried;
    // a parsed container already holds it.
    if fresh {
        if let Some(camera) = &summary.camera {
            if let Some(make) = &camera.make {
                metadata.set_tag(ExifTag::Make(make.clone()));
            }
            if let Some(model) = &camera.model {
                metadata.set_tag(ExifTag::Model(model.clone()));
            }
        }
    }

    if let Some(gps) = &summary.gps {
        for tag in gps_tags(gps) {
            metadata.set_tag(tag);
        }
    }

    if let Some((x, y)) = effective_dpi {
        for tag in resolution_tags(x, y) {
            metadata.set_tag(tag);
        }
    }

    metadata
        .write_to_file(dest)
        .map_err(|e| ConvertError::MetadataWrite {
            path: dest.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Parse the source container with `little_exif`, shielding against its
/// panics on malformed input. `None` means "nothing carried", which
/// degrades to projection-only, never to an error.
fn load_source_metadata(path: &Path) -> Option<Metadata> {
    let path_owned = path.to_path_buf();
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(|_| {}));
    let result = std::panic::catch_unwind(move || Metadata::new_from_path(&path_owned));
    std::panic::set_hook(prev_hook);

    match result {
        Ok(Ok(m)) => {
            let tag_count: usize = m.get_ifds().iter().map(|ifd| ifd.get_tags().len()).sum();
            if tag_count == 0 {
                None
            } else {
                log::debug!(
                    "carrying {} EXIF tags from {}",
                    tag_count,
                    path.display()
                );
                Some(m)
            }
        }
        Ok(Err(e)) => {
            log::debug!("source EXIF not parseable for carry-over: {e}");
            None
        }
        Err(_) => {
            log::debug!("EXIF parser panicked on {}", path.display());
            None
        }
    }
}

/// One unsigned rational (numerator, denominator), 8 bytes little-endian.
fn encode_rational(num: u32, den: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8);
    bytes.extend_from_slice(&num.to_le_bytes());
    bytes.extend_from_slice(&den.to_le_bytes());
    bytes
}

/// A DMS triplet (3 rationals, 24 bytes little-endian). Seconds carry a
/// 1/10000 denominator for sub-meter precision.
fn encode_dms(value: f64) -> Vec<u8> {
    let abs = value.abs();
    let deg = abs.floor() as u32;
    let min = ((abs - deg as f64) * 60.0).floor() as u32;
    let sec = ((abs - deg as f64 - min as f64 / 60.0) * 3600.0 * 10000.0).round() as u32;

    let mut bytes = Vec::with_capacity(24);
    bytes.extend_from_slice(&encode_rational(deg, 1));
    bytes.extend_from_slice(&encode_rational(min, 1));
    bytes.extend_from_slice(&encode_rational(sec, 10000));
    bytes
}

fn gps_tag(tag_id: u16, format: &ExifTagFormat, data: &[u8]) -> Option<ExifTag> {
    match ExifTag::from_u16_with_data(
        tag_id,
        format,
        &data.to_vec(),
        &Endian::Little,
        &ExifTagGroup::GPS,
    ) {
        Ok(tag) => Some(tag),
        Err(e) => {
            log::debug!("dropping GPS tag {tag_id:#06x}: {e}");
            None
        }
    }
}

fn gps_tags(gps: &GpsInfo) -> Vec<ExifTag> {
    let lat_ref = if gps.latitude >= 0.0 { "N" } else { "S" };
    let lon_ref = if gps.longitude >= 0.0 { "E" } else { "W" };

    let mut tags = Vec::with_capacity(6);
    tags.extend(gps_tag(
        TAG_GPS_LATITUDE_REF,
        &ExifTagFormat::STRING,
        format!("{lat_ref}\0").as_bytes(),
    ));
    tags.extend(gps_tag(
        TAG_GPS_LATITUDE,
        &ExifTagFormat::RATIONAL64U,
        &encode_dms(gps.latitude),
    ));
    tags.extend(gps_tag(
        TAG_GPS_LONGITUDE_REF,
        &ExifTagFormat::STRING,
        format!("{lon_ref}\0").as_bytes(),
    ));
    tags.extend(gps_tag(
        TAG_GPS_LONGITUDE,
        &ExifTagFormat::RATIONAL64U,
        &encode_dms(gps.longitude),
    ));

    if let Some(alt) = gps.altitude {
        tags.extend(gps_tag(
            TAG_GPS_ALTITUDE_REF,
            &ExifTagFormat::INT8U,
            &[u8::from(alt < 0.0)],
        ));
        tags.extend(gps_tag(
            TAG_GPS_ALTITUDE,
            &ExifTagFormat::RATIONAL64U,
            &encode_rational((alt.abs() * 100.0).round() as u32, 100),
        ));
    }

    tags
}

fn ifd0_tag(tag_id: u16, format: &ExifTagFormat, data: &[u8]) -> Option<ExifTag> {
    match ExifTag::from_u16_with_data(
        tag_id,
        format,
        &data.to_vec(),
        &Endian::Little,
        &ExifTagGroup::GENERIC,
    ) {
        Ok(tag) => Some(tag),
        Err(e) => {
            log::debug!("dropping resolution tag {tag_id:#06x}: {e}");
            None
        }
    }
}

/// XResolution / YResolution / ResolutionUnit(inch), the only place the
/// effective DPI can live once the pixels are encoded.
fn resolution_tags(x: f32, y: f32) -> Vec<ExifTag> {
    let mut tags = Vec::with_capacity(3);
    tags.extend(ifd0_tag(
        TAG_X_RESOLUTION,
        &ExifTagFormat::RATIONAL64U,
        &encode_rational((x * 100.0).round() as u32, 100),
    ));
    tags.extend(ifd0_tag(
        TAG_Y_RESOLUTION,
        &ExifTagFormat::RATIONAL64U,
        &encode_rational((y * 100.0).round() as u32, 100),
    ));
    tags.extend(ifd0_tag(
        TAG_RESOLUTION_UNIT,
        &ExifTagFormat::INT16U,
        &2u16.to_le_bytes(),
    ));
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dms_roundtrip_precision() {
        let bytes = encode_dms(48.858844);
        assert_eq!(bytes.len(), 24);
        let deg = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let min = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        let sec_num = u32::from_le_bytes(bytes[16..20].try_into().unwrap());
        let sec_den = u32::from_le_bytes(bytes[20..24].try_into().unwrap());
        let back = deg as f64 + min as f64 / 60.0 + sec_num as f64 / sec_den as f64 / 3600.0;
        assert!((back - 48.858844).abs() < 1e-4);
    }

    #[test]
    fn gps_tags_include_hemisphere_refs() {
        let gps = GpsInfo {
            latitude: -33.8568,
            longitude: 151.2153,
            altitude: Some(3.0),
        };
        let tags = gps_tags(&gps);
        // 4 coordinate tags + 2 altitude tags
        assert_eq!(tags.len(), 6);
    }

    #[test]
    fn resolution_tags_cover_both_axes_and_unit() {
        assert_eq!(resolution_tags(300.0, 300.0).len(), 3);
    }

    #[test]
    fn written_gps_reads_back_in_decimal_degrees() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("geo.jpg");
        image::RgbImage::from_pixel(8, 8, image::Rgb([9, 9, 9]))
            .save(&dest)
            .unwrap();

        let summary = ExifSummary {
            gps: Some(GpsInfo {
                latitude: -33.8568,
                longitude: 151.2153,
                altitude: Some(58.0),
            }),
            ..Default::default()
        };
        let jpeg = crate::format::resolve(&dest).unwrap();
        write_metadata(Path::new("/nonexistent.png"), &dest, jpeg, &summary, None).unwrap();

        let back = crate::exif::read_summary(&dest);
        let gps = back.gps.expect("gps block should survive the write");
        assert!((gps.latitude + 33.8568).abs() < 1e-3, "{}", gps.latitude);
        assert!((gps.longitude - 151.2153).abs() < 1e-3, "{}", gps.longitude);
        assert!((gps.altitude.expect("altitude") - 58.0).abs() < 0.01);
    }

    #[test]
    fn latitude_alone_never_yields_a_position() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("half.jpg");
        image::RgbImage::from_pixel(8, 8, image::Rgb([9, 9, 9]))
            .save(&dest)
            .unwrap();

        // a container with latitude but no longitude
        let mut metadata = Metadata::new();
        metadata.set_tag(gps_tag(TAG_GPS_LATITUDE_REF, &ExifTagFormat::STRING, b"S\0").unwrap());
        metadata.set_tag(
            gps_tag(
                TAG_GPS_LATITUDE,
                &ExifTagFormat::RATIONAL64U,
                &encode_dms(-33.8568),
            )
            .unwrap(),
        );
        metadata.write_to_file(&dest).unwrap();

        let back = crate::exif::read_summary(&dest);
        assert!(back.gps.is_none(), "partial coordinates must report nothing");
    }

    #[test]
    fn no_exif_target_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.bmp");
        let bmp = crate::format::resolve(Path::new("out.bmp")).unwrap();
        let summary = ExifSummary::default();
        // dest does not even exist; the no-op must not touch it
        write_metadata(Path::new("/nonexistent.jpg"), &dest, bmp, &summary, None).unwrap();
        assert!(!dest.exists());
    }
}
