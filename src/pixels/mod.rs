//! The pixel pipeline: decode, color adaptation, encode.
//!
//! Decoding always produces a [`DynamicImage`]; multi-frame sources
//! (animated GIF/WebP, multi-page TIFF) are reduced to their first
//! frame. Encoding adapts the pixel layout to what the target can hold:
//! alpha is flattened onto a white background for alpha-less targets,
//! and quality is applied only where the codec is lossy.

pub mod svg;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::{DynamicImage, RgbImage};

use crate::error::ConvertError;
use crate::exif::record::ColorMode;
use crate::format::{FormatDescriptor, ImageFormat};
use crate::options::Quality;

/// Decode a source file into pixels.
///
/// Vector sources are rasterized at `raster_dpi`; raster sources ignore
/// it. AVIF/HEIF decoding needs a codec the pipeline does not bundle
/// and surfaces [`ConvertError::DependencyMissing`].
pub fn decode(
    path: &Path,
    desc: &FormatDescriptor,
    raster_dpi: f32,
) -> Result<DynamicImage, ConvertError> {
    match desc.format {
        ImageFormat::Svg => svg::rasterize(path, raster_dpi),
        ImageFormat::Avif => Err(ConvertError::DependencyMissing {
            format: "AVIF".into(),
            backend: "a dav1d-based decoder".into(),
        }),
        ImageFormat::Heif => Err(ConvertError::DependencyMissing {
            format: "HEIF".into(),
            backend: "libheif".into(),
        }),
        ImageFormat::Pdf => Err(ConvertError::UnsupportedFormat(
            "PDF sources go through the PDF pipeline".into(),
        )),
        // content sniffing, so extension aliases like .jfif decode fine
        _ => image::ImageReader::open(path)
            .map_err(ConvertError::Io)?
            .with_guessed_format()
            .map_err(ConvertError::Io)?
            .decode()
            .map_err(|e| ConvertError::Decode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }),
    }
}

/// Classify the decoded pixel layout.
pub fn mode_of(img: &DynamicImage) -> ColorMode {
    use image::ColorType::*;
    match img.color() {
        L8 | L16 => ColorMode::L,
        La8 | La16 => ColorMode::La,
        Rgb8 | Rgb16 | Rgb32F => ColorMode::Rgb,
        _ => ColorMode::Rgba,
    }
}

/// Composite onto a pure white background, discarding alpha.
///
/// Straight (non-premultiplied) source-over blend.
pub fn flatten_alpha(img: &DynamicImage) -> DynamicImage {
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    let mut rgb = RgbImage::new(w, h);
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let a = a as u32;
        let blend = |c: u8| -> u8 { ((c as u32 * a + 255 * (255 - a)) / 255) as u8 };
        rgb.put_pixel(x, y, image::Rgb([blend(r), blend(g), blend(b)]));
    }
    DynamicImage::ImageRgb8(rgb)
}

/// Adapt pixels to the target format's capabilities.
pub fn prepare_for_target(img: DynamicImage, target: &FormatDescriptor) -> DynamicImage {
    if !target.supports_alpha && mode_of(&img).has_alpha() {
        flatten_alpha(&img)
    } else {
        img
    }
}

/// Encode to `dest` in the target format.
///
/// Quality applies to JPEG, WebP and AVIF; lossless targets ignore it
/// silently. The caller is responsible for having run
/// [`prepare_for_target`] first.
pub fn encode(
    img: &DynamicImage,
    dest: &Path,
    target: &FormatDescriptor,
    quality: Quality,
) -> Result<(), ConvertError> {
    let encode_err = |e: image::ImageError| ConvertError::Encode {
        path: dest.to_path_buf(),
        reason: e.to_string(),
    };

    match target.format {
        ImageFormat::Jpeg => {
            let writer = BufWriter::new(File::create(dest)?);
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(writer, quality.value());
            // JPEG cannot hold alpha; prepare_for_target flattened it
            img.write_with_encoder(encoder).map_err(encode_err)
        }
        ImageFormat::WebP => encode_webp(img, dest, quality),
        ImageFormat::Avif => {
            let writer = BufWriter::new(File::create(dest)?);
            let encoder =
                image::codecs::avif::AvifEncoder::new_with_speed_quality(writer, 6, quality.value());
            img.write_with_encoder(encoder).map_err(encode_err)
        }
        ImageFormat::Heif => Err(ConvertError::DependencyMissing {
            format: "HEIF".into(),
            backend: "libheif".into(),
        }),
        ImageFormat::Png => write_plain(img, dest, image::ImageFormat::Png),
        ImageFormat::Bmp => write_plain(img, dest, image::ImageFormat::Bmp),
        ImageFormat::Tiff => write_plain(img, dest, image::ImageFormat::Tiff),
        ImageFormat::Gif => {
            // the GIF encoder only takes 8-bit RGBA
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            write_plain(&rgba, dest, image::ImageFormat::Gif)
        }
        ImageFormat::Svg | ImageFormat::Pdf => Err(ConvertError::UnsupportedFormat(
            format!("{} is not a raster encode target", target.name),
        )),
    }
}

fn write_plain(
    img: &DynamicImage,
    dest: &Path,
    format: image::ImageFormat,
) -> Result<(), ConvertError> {
    let mut writer = BufWriter::new(File::create(dest)?);
    img.write_to(&mut writer, format)
        .map_err(|e| ConvertError::Encode {
            path: dest.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Lossy WebP through libwebp; the `image` crate only ships the
/// lossless encoder.
fn encode_webp(img: &DynamicImage, dest: &Path, quality: Quality) -> Result<(), ConvertError> {
    let memory = match mode_of(img) {
        ColorMode::Rgba | ColorMode::La => {
            let rgba = img.to_rgba8();
            webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
                .encode(quality.value() as f32)
        }
        _ => {
            let rgb = img.to_rgb8();
            webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height())
                .encode(quality.value() as f32)
        }
    };
    std::fs::write(dest, &*memory)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn half_transparent_red(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([255, 0, 0, 128])))
    }

    #[test]
    fn flatten_blends_onto_white() {
        let flat = flatten_alpha(&half_transparent_red(2, 2)).to_rgb8();
        let px = flat.get_pixel(0, 0);
        // 50% red over white: red stays high, green/blue land near 127
        assert_eq!(px.0[0], 255);
        assert!((px.0[1] as i32 - 127).abs() <= 1);
        assert!((px.0[2] as i32 - 127).abs() <= 1);
    }

    #[test]
    fn fully_transparent_flattens_to_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0])));
        let flat = flatten_alpha(&img).to_rgb8();
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn prepare_flattens_only_for_alphaless_targets() {
        let img = half_transparent_red(2, 2);
        let jpeg = crate::format::resolve(Path::new("x.jpg")).unwrap();
        let png = crate::format::resolve(Path::new("x.png")).unwrap();

        let for_jpeg = prepare_for_target(img.clone(), jpeg);
        assert!(!mode_of(&for_jpeg).has_alpha());

        let for_png = prepare_for_target(img, png);
        assert!(mode_of(&for_png).has_alpha());
    }

    #[test]
    fn jpeg_roundtrip_preserves_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.jpg");
        let jpeg = crate::format::resolve(&dest).unwrap();
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            20,
            10,
            image::Rgb([40, 90, 160]),
        ));
        encode(&img, &dest, jpeg, Quality::new(90)).unwrap();

        let back = decode(&dest, jpeg, 96.0).unwrap();
        assert_eq!((back.width(), back.height()), (20, 10));
    }

    #[test]
    fn png_roundtrip_preserves_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.png");
        let png = crate::format::resolve(&dest).unwrap();
        encode(&half_transparent_red(8, 8), &dest, png, Quality::default()).unwrap();

        let back = decode(&dest, png, 96.0).unwrap();
        assert!(mode_of(&back).has_alpha());
        assert_eq!(back.to_rgba8().get_pixel(3, 3).0[3], 128);
    }

    #[test]
    fn avif_decode_reports_missing_backend() {
        let err = decode(Path::new("x.avif"), crate::format::resolve(Path::new("x.avif")).unwrap(), 96.0)
            .unwrap_err();
        assert!(matches!(err, ConvertError::DependencyMissing { .. }));
    }

    #[test]
    fn heif_encode_reports_missing_backend() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.heic");
        let heif = crate::format::resolve(&dest).unwrap();
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(2, 2));
        let err = encode(&img, &dest, heif, Quality::default()).unwrap_err();
        assert!(matches!(err, ConvertError::DependencyMissing { .. }));
    }
}
