//! SVG rasterization via resvg/tiny-skia.
//!
//! SVG user units are interpreted at the CSS 96 units-per-inch, so the
//! effective scale for a requested DPI is `dpi / 96`.

use std::path::Path;

use image::{DynamicImage, RgbaImage};

use crate::error::ConvertError;

const SVG_UNITS_PER_INCH: f32 = 96.0;

/// Rasterize an SVG file at the given resolution.
pub fn rasterize(path: &Path, dpi: f32) -> Result<DynamicImage, ConvertError> {
    let data = std::fs::read(path)?;
    let options = resvg::usvg::Options::default();
    let tree = resvg::usvg::Tree::from_data(&data, &options).map_err(|e| ConvertError::Decode {
        path: path.to_path_buf(),
        reason: format!("invalid SVG: {e}"),
    })?;

    let svg_size = tree.size();
    let scale = dpi / SVG_UNITS_PER_INCH;
    let target_w = ((svg_size.width() * scale).round() as u32).max(1);
    let target_h = ((svg_size.height() * scale).round() as u32).max(1);

    let mut pixmap =
        tiny_skia::Pixmap::new(target_w, target_h).ok_or_else(|| ConvertError::Decode {
            path: path.to_path_buf(),
            reason: format!("cannot allocate {target_w}x{target_h} pixmap"),
        })?;

    let transform = tiny_skia::Transform::from_scale(
        target_w as f32 / svg_size.width(),
        target_h as f32 / svg_size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    Ok(DynamicImage::ImageRgba8(pixmap_to_rgba(&pixmap)))
}

/// tiny-skia stores premultiplied RGBA; un-premultiply for the standard
/// straight-alpha layout the rest of the pipeline expects.
fn pixmap_to_rgba(pixmap: &tiny_skia::Pixmap) -> RgbaImage {
    let w = pixmap.width();
    let h = pixmap.height();
    let data = pixmap.data();
    let mut rgba = Vec::with_capacity((w * h * 4) as usize);
    for chunk in data.chunks(4) {
        let (r, g, b, a) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        if a == 0 {
            rgba.extend_from_slice(&[0, 0, 0, 0]);
        } else {
            rgba.push(((r as u32 * 255 + a as u32 / 2) / a as u32).min(255) as u8);
            rgba.push(((g as u32 * 255 + a as u32 / 2) / a as u32).min(255) as u8);
            rgba.push(((b as u32 * 255 + a as u32 / 2) / a as u32).min(255) as u8);
            rgba.push(a);
        }
    }
    RgbaImage::from_raw(w, h, rgba).unwrap_or_else(|| RgbaImage::new(w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED_SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="96" height="48">
  <rect width="96" height="48" fill="#ff0000"/>
</svg>"##;

    fn write_svg(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("shape.svg");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn rasterizes_at_native_size_for_96_dpi() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_svg(&dir, RED_SQUARE);
        let img = rasterize(&path, 96.0).unwrap();
        assert_eq!(img.width(), 96);
        assert_eq!(img.height(), 48);
    }

    #[test]
    fn doubles_dimensions_at_192_dpi() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_svg(&dir, RED_SQUARE);
        let img = rasterize(&path, 192.0).unwrap();
        assert_eq!(img.width(), 192);
        assert_eq!(img.height(), 96);
    }

    #[test]
    fn rendered_fill_is_opaque_red() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_svg(&dir, RED_SQUARE);
        let img = rasterize(&path, 96.0).unwrap().to_rgba8();
        let px = img.get_pixel(10, 10);
        assert_eq!(px.0, [255, 0, 0, 255]);
    }

    #[test]
    fn invalid_svg_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.svg");
        std::fs::write(&path, "not an svg at all").unwrap();
        let err = rasterize(&path, 96.0).unwrap_err();
        assert!(matches!(err, ConvertError::Decode { .. }));
    }
}
