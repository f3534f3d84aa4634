//! The PDF bridge: rendering pages out, composing pages in.
//!
//! Two backends split the work. Page rendering goes through the system
//! pdfium library via `pdfium-render`; when that library is absent the
//! caller gets [`ConvertError::DependencyMissing`] naming it. Document
//! composition and inspection use `lopdf` directly and have no system
//! dependency: images are embedded as DCTDecode (JPEG) XObjects, one
//! per page, and document facts come from the trailer's Info
//! dictionary.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdfium_render::prelude::*;

use crate::error::ConvertError;
use crate::exif::record::DocumentInfo;
use crate::format::FormatDescriptor;
use crate::options::{Quality, DEFAULTS};
use crate::pixels;

const POINTS_PER_INCH: f32 = 72.0;

/// Page dimensions in PDF points. Unknown names fall back to A4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    A4,
    Letter,
    Legal,
    A3,
    A5,
}

impl PageSize {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "letter" => PageSize::Letter,
            "legal" => PageSize::Legal,
            "a3" => PageSize::A3,
            "a5" => PageSize::A5,
            _ => PageSize::A4,
        }
    }

    /// (width, height) in points.
    pub fn dimensions(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.0, 842.0),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::A3 => (842.0, 1191.0),
            PageSize::A5 => (420.0, 595.0),
        }
    }
}

/// How an image is placed on its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitMethod {
    /// Scale to fit entirely inside the page, centered (default).
    #[default]
    Contain,
    /// Scale to fill the page, centered; overflow is clipped by the
    /// page's MediaBox.
    Cover,
    /// Fill the page exactly, ignoring aspect ratio.
    Stretch,
}

impl std::str::FromStr for FitMethod {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "contain" => Ok(FitMethod::Contain),
            "cover" => Ok(FitMethod::Cover),
            "stretch" => Ok(FitMethod::Stretch),
            other => Err(ConvertError::UnsupportedFormat(format!(
                "unknown fit method: {other}"
            ))),
        }
    }
}

/// Placement rectangle (x, y, width, height) in page coordinates for an
/// image of `img_w` x `img_h` on a `page_w` x `page_h` page.
pub fn fit_rect(
    img_w: f32,
    img_h: f32,
    page_w: f32,
    page_h: f32,
    fit: FitMethod,
) -> (f32, f32, f32, f32) {
    match fit {
        FitMethod::Stretch => (0.0, 0.0, page_w, page_h),
        FitMethod::Contain | FitMethod::Cover => {
            let sx = page_w / img_w;
            let sy = page_h / img_h;
            let scale = if fit == FitMethod::Contain {
                sx.min(sy)
            } else {
                sx.max(sy)
            };
            let w = img_w * scale;
            let h = img_h * scale;
            ((page_w - w) / 2.0, (page_h - h) / 2.0, w, h)
        }
    }
}

fn pdfium_missing() -> ConvertError {
    ConvertError::DependencyMissing {
        format: "PDF".into(),
        backend: "the pdfium library".into(),
    }
}

fn pdf_err(path: &Path, e: impl std::fmt::Display) -> ConvertError {
    ConvertError::Pdf {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

/// Render one page of a PDF to pixels at the given resolution.
///
/// Page indices are zero-based; an out-of-range index is
/// [`ConvertError::PageIndex`].
pub fn render_page(source: &Path, index: usize, dpi: f32) -> Result<DynamicImage, ConvertError> {
    let bindings = Pdfium::bind_to_system_library().map_err(|_| pdfium_missing())?;
    let pdfium = Pdfium::new(bindings);
    let document = pdfium
        .load_pdf_from_file(source, None)
        .map_err(|e| pdf_err(source, e))?;

    let page_count = document.pages().len() as usize;
    if index >= page_count {
        return Err(ConvertError::PageIndex { index, page_count });
    }

    let page = document
        .pages()
        .get(index as u16)
        .map_err(|e| pdf_err(source, e))?;

    let target_width = (page.width().value / POINTS_PER_INCH * dpi).round().max(1.0) as i32;
    let config = PdfRenderConfig::new().set_target_width(target_width);
    let rendered = page
        .render_with_config(&config)
        .map_err(|e| pdf_err(source, e))?;
    Ok(rendered.as_image())
}

/// Render every page (or a chosen subset) into `out_dir` as
/// `page_{index}{ext}` files.
///
/// Pages render in order; an out-of-range index in `pages` fails the
/// call at that point, leaving the pages already rendered on disk.
pub fn pdf_to_images(
    source: &Path,
    out_dir: &Path,
    target: &FormatDescriptor,
    pages: Option<&[usize]>,
    dpi: Option<f32>,
    quality: Quality,
) -> Result<Vec<PathBuf>, ConvertError> {
    if !source.exists() {
        return Err(ConvertError::NotFound(source.to_path_buf()));
    }
    let dpi = dpi.unwrap_or(DEFAULTS.pdf_render_dpi);

    let bindings = Pdfium::bind_to_system_library().map_err(|_| pdfium_missing())?;
    let pdfium = Pdfium::new(bindings);
    let document = pdfium
        .load_pdf_from_file(source, None)
        .map_err(|e| pdf_err(source, e))?;
    let page_count = document.pages().len() as usize;

    std::fs::create_dir_all(out_dir)?;

    let all_pages: Vec<usize>;
    let selected = match pages {
        Some(subset) => subset,
        None => {
            all_pages = (0..page_count).collect();
            &all_pages
        }
    };

    let ext = format!(".{}", target.extensions[0]);
    let mut outputs = Vec::with_capacity(selected.len());
    for &index in selected {
        if index >= page_count {
            return Err(ConvertError::PageIndex { index, page_count });
        }
        let page = document
            .pages()
            .get(index as u16)
            .map_err(|e| pdf_err(source, e))?;
        let target_width = (page.width().value / POINTS_PER_INCH * dpi).round().max(1.0) as i32;
        let config = PdfRenderConfig::new().set_target_width(target_width);
        let img = page
            .render_with_config(&config)
            .map_err(|e| pdf_err(source, e))?
            .as_image();

        let dest = out_dir.join(format!("page_{index}{ext}"));
        let prepared = pixels::prepare_for_target(img, target);
        pixels::encode(&prepared, &dest, target, quality)?;
        log::debug!("rendered page {index} of {} to {}", source.display(), dest.display());
        outputs.push(dest);
    }

    Ok(outputs)
}

/// Compose one PDF from a sequence of images, one page each.
///
/// Each image is flattened, re-encoded as JPEG at `quality`, and
/// embedded as a DCTDecode XObject placed per `fit` on `page_size`
/// pages. `doc_info` fields (title/author/subject), when given, land in
/// the trailer's Info dictionary; its `page_count` is ignored.
pub fn images_to_pdf(
    sources: &[PathBuf],
    dest: &Path,
    page_size: PageSize,
    fit: FitMethod,
    quality: Quality,
    doc_info: Option<&DocumentInfo>,
) -> Result<(), ConvertError> {
    if sources.is_empty() {
        return Err(ConvertError::Pdf {
            path: dest.to_path_buf(),
            reason: "no input images".into(),
        });
    }

    let (page_w, page_h) = page_size.dimensions();
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(sources.len());

    for source in sources {
        if !source.exists() {
            return Err(ConvertError::NotFound(source.clone()));
        }
        let desc = crate::format::resolve(source)?;
        let img = pixels::decode(source, desc, DEFAULTS.vector_dpi_floor)?;
        let page_id = append_image_page(&mut doc, pages_id, &img, page_w, page_h, fit, quality)
            .map_err(|e| pdf_err(dest, e))?;
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if let Some(info) = doc_info {
        let mut dict = lopdf::Dictionary::new();
        if let Some(title) = &info.title {
            dict.set("Title", Object::string_literal(title.as_str()));
        }
        if let Some(author) = &info.author {
            dict.set("Author", Object::string_literal(author.as_str()));
        }
        if let Some(subject) = &info.subject {
            dict.set("Subject", Object::string_literal(subject.as_str()));
        }
        if !dict.is_empty() {
            let info_id = doc.add_object(Object::Dictionary(dict));
            doc.trailer.set("Info", info_id);
        }
    }

    doc.save(dest).map_err(|e| pdf_err(dest, e))?;
    Ok(())
}

/// Build one page object holding `img` as a JPEG XObject; returns the
/// page's object id.
fn append_image_page(
    doc: &mut Document,
    pages_id: lopdf::ObjectId,
    img: &DynamicImage,
    page_w: f32,
    page_h: f32,
    fit: FitMethod,
    quality: Quality,
) -> Result<lopdf::ObjectId, ConvertError> {
    // JPEG has no alpha channel, so the embedded form is always RGB
    let rgb = pixels::flatten_alpha(img).to_rgb8();
    let (img_w, img_h) = rgb.dimensions();

    let mut jpeg_bytes = Vec::new();
    let encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(Cursor::new(&mut jpeg_bytes), quality.value());
    DynamicImage::ImageRgb8(rgb)
        .write_with_encoder(encoder)
        .map_err(|e| ConvertError::Encode {
            path: PathBuf::from("<pdf page>"),
            reason: e.to_string(),
        })?;

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => img_w as i64,
            "Height" => img_h as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg_bytes,
    ));

    let (x, y, w, h) = fit_rect(img_w as f32, img_h as f32, page_w, page_h, fit);
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(w),
                    Object::Real(0.0),
                    Object::Real(0.0),
                    Object::Real(h),
                    Object::Real(x),
                    Object::Real(y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_bytes = content.encode().map_err(|e| ConvertError::Pdf {
        path: PathBuf::from("<pdf page>"),
        reason: e.to_string(),
    })?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content_bytes));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Real(0.0),
            Object::Real(0.0),
            Object::Real(page_w),
            Object::Real(page_h),
        ],
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
        "Contents" => content_id,
    }))
}

/// PDF to PDF is a structural copy, not a raster round-trip: load,
/// recompress streams, save.
pub fn copy_pdf(source: &Path, dest: &Path) -> Result<(), ConvertError> {
    let mut doc = Document::load(source).map_err(|e| pdf_err(source, e))?;
    doc.compress();
    doc.save(dest).map_err(|e| pdf_err(dest, e))?;
    Ok(())
}

/// Page count plus Title/Author from the trailer's Info dictionary.
pub fn pdf_info(path: &Path) -> Result<DocumentInfo, ConvertError> {
    let doc = Document::load(path).map_err(|e| pdf_err(path, e))?;
    let page_count = doc.get_pages().len();

    let mut info = DocumentInfo {
        page_count,
        ..Default::default()
    };

    if let Ok(info_obj) = doc.trailer.get(b"Info") {
        let info_dict = match info_obj {
            Object::Reference(id) => doc
                .get_object(*id)
                .ok()
                .and_then(|o| o.as_dict().ok()),
            Object::Dictionary(d) => Some(d),
            _ => None,
        };
        if let Some(dict) = info_dict {
            info.title = info_string(dict, b"Title");
            info.author = info_string(dict, b"Author");
            info.subject = info_string(dict, b"Subject");
        }
    }

    Ok(info)
}

/// MediaBox of the first page in points, read structurally so plain
/// inspection never needs the rendering backend.
pub fn first_page_size(path: &Path) -> Result<Option<(f32, f32)>, ConvertError> {
    let doc = Document::load(path).map_err(|e| pdf_err(path, e))?;
    let Some(&page_id) = doc.get_pages().values().next() else {
        return Ok(None);
    };
    let Ok(page_dict) = doc.get_object(page_id).and_then(|o| o.as_dict()) else {
        return Ok(None);
    };
    let media_box = match page_dict.get(b"MediaBox") {
        Ok(Object::Array(arr)) => arr.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(arr)) => arr.clone(),
            _ => return Ok(None),
        },
        _ => return Ok(None),
    };
    let nums: Vec<f32> = media_box
        .iter()
        .filter_map(|o| match o {
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r),
            _ => None,
        })
        .collect();
    if nums.len() == 4 {
        Ok(Some((nums[2] - nums[0], nums[3] - nums[1])))
    } else {
        Ok(None)
    }
}

fn info_string(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key) {
        Ok(Object::String(bytes, _)) => {
            let s = String::from_utf8_lossy(bytes).trim().to_string();
            (!s.is_empty()).then_some(s)
        }
        _ => None,
    }
}
