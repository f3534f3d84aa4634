//! # imageconvert
//!
//! Convert images between formats while keeping what matters: EXIF
//! metadata (camera, GPS, resolution) and file timestamps ride along
//! with the pixels wherever the target format can hold them.
//!
//! # Architecture: One Pipeline, Two Bridges
//!
//! Every conversion flows through a single orchestrator:
//!
//! ```text
//! resolve formats → decode → adapt pixels → encode → carry metadata → carry timestamps
//! ```
//!
//! Two bridges feed that pipeline for the non-raster endpoints:
//!
//! - **Vector**: SVG sources are rasterized (resvg) before entering the
//!   pixel path. Rasterizing is one-way; no raster format converts *to*
//!   SVG.
//! - **PDF**: documents render out through the system pdfium library
//!   and compose in through `lopdf` (images embedded as JPEG XObjects).
//!   PDF → PDF is a structural copy, never a raster round-trip.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`format`] | Static registry of formats, capabilities, and pair rules — all extension matching lives here |
//! | [`convert`] | The orchestrator: `ConversionRequest`, `convert`, `get_image_info` |
//! | [`pixels`] | Decode/encode dispatch, alpha flattening, SVG rasterization |
//! | [`exif`] | Metadata record, EXIF read (`kamadak-exif`) and write (`little_exif`) |
//! | [`timestamps`] | Access/modification time carry-over (creation time where the platform allows) |
//! | [`pdf`] | PDF bridge: page rendering, composition, page fitting, document info |
//! | [`batch`] | Sequential directory conversion with per-file failure isolation |
//! | [`options`] | Process-wide immutable defaults and the clamped quality parameter |
//! | [`error`] | The shared `ConvertError` taxonomy |
//!
//! # Design Decisions
//!
//! ## Closed Format Set
//!
//! Formats are a closed enum dispatched through a static descriptor
//! table, not strings compared ad hoc. Adding a format means adding a
//! descriptor and handling its enum variant everywhere the compiler
//! points.
//!
//! ## Metadata Degrades, Conversions Don't
//!
//! A malformed EXIF tag, an unparseable container, or a target with no
//! EXIF support never fails a conversion — the tag (or all of them) is
//! dropped with a debug log. Only failure to write the destination's
//! metadata container is an error.
//!
//! ## Best-Effort System Backends
//!
//! AVIF/HEIF decoding and PDF rendering need codecs this crate does not
//! bundle. Those paths return `DependencyMissing` naming the backend to
//! install instead of failing obscurely, and everything that doesn't
//! need them keeps working.

pub mod batch;
pub mod convert;
pub mod error;
pub mod exif;
pub mod format;
pub mod options;
pub mod pdf;
pub mod pixels;
pub mod timestamps;

pub use batch::{batch_convert, BatchOptions, BatchReport, Outcome};
pub use convert::{convert, get_image_info, ConversionRequest};
pub use error::ConvertError;
pub use exif::MetadataRecord;
pub use format::{is_supported_format, ImageFormat};
pub use options::Quality;
pub use pdf::{images_to_pdf, pdf_to_images, FitMethod, PageSize};
