//! EXIF handling: a canonical metadata record, a read side and a write
//! side backed by two different parsers.
//!
//! Reading uses `kamadak-exif`, which is strict and pure-Rust; writing
//! uses `little_exif`, which can carry a source container's tags over
//! to a new file byte-for-byte. The two never share state: the reader
//! produces a [`record::MetadataRecord`] for inspection, the writer
//! re-reads the source container itself so unmodeled tags survive.

pub mod reader;
pub mod record;
pub mod writer;

pub use reader::{read_summary, ExifSummary};
pub use record::{CameraInfo, ColorMode, DocumentInfo, GpsInfo, MetadataRecord};
