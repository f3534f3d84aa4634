//! Process-wide defaults and the clamped quality parameter.
//!
//! All tunable constants live in one immutable [`PipelineDefaults`]
//! structure, initialized once and never mutated. The rest of the
//! pipeline reads from [`DEFAULTS`] instead of scattering magic numbers.

/// Quality setting for lossy image encoding (1-100).
///
/// Clamped on construction; lossless targets ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(DEFAULTS.quality)
    }
}

/// Immutable pipeline defaults, shared by every conversion in the process.
#[derive(Debug, Clone, Copy)]
pub struct PipelineDefaults {
    /// Quality for lossy targets when the caller does not specify one.
    pub quality: u8,
    /// DPI substituted when neither the request nor the source carries one.
    pub dpi: f32,
    /// Vector sources are rasterized at no less than this resolution.
    pub vector_dpi_floor: f32,
    /// Default rendering resolution for PDF pages.
    pub pdf_render_dpi: f32,
}

pub static DEFAULTS: PipelineDefaults = PipelineDefaults {
    quality: 95,
    dpi: 72.0,
    vector_dpi_floor: 96.0,
    pdf_render_dpi: 300.0,
};

/// Effective rasterization DPI for a vector source: the requested value,
/// floored at `vector_dpi_floor`.
pub fn vector_raster_dpi(requested: Option<f32>) -> f32 {
    requested
        .unwrap_or(DEFAULTS.vector_dpi_floor)
        .max(DEFAULTS.vector_dpi_floor)
}
