//! Glyph sources: the boundary between text layout and glyph rasterization.
//!
//! Layout never talks to a rasterizer directly. It asks a [`GlyphSource`] for
//! glyph metrics and atlas coordinates, and the source decides what happens
//! when a codepoint is not available. Two variants exist:
//!
//! - [`BuiltinFont`]: a fixed 8x8 bitmap table that needs no files at all.
//! - Typeface sources created by a [`TypefaceLoader`] (by default
//!   [`FontdueLoader`]), which rasterize a [`Repertoire`] into a
//!   [`GlyphAtlas`] once, when the owning font resource is built.

mod atlas;
mod builtin;
mod fontdue_source;

use std::path::Path;

pub use atlas::{AtlasRegion, GlyphAtlas, MAX_ATLAS_SIZE};
pub use builtin::{BUILTIN_FALLBACK_ADVANCE, BUILTIN_FONT_SIZE, BUILTIN_GLYPH_SIZE, BuiltinFont};
pub use fontdue_source::{FontdueGlyphSource, FontdueLoader};

use crate::error::FontResult;

/// A single glyph placed in an atlas.
///
/// Offsets follow the usual bitmap-font convention: `offset_x` is the
/// distance from the pen to the left edge, `offset_y` the distance from the
/// baseline up to the top edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    /// The character this glyph renders.
    pub codepoint: char,
    /// Horizontal offset from the pen position to the bitmap's left edge.
    pub offset_x: f32,
    /// Vertical offset from the baseline to the bitmap's top edge.
    pub offset_y: f32,
    /// Bitmap width in pixels.
    pub width: f32,
    /// Bitmap height in pixels.
    pub height: f32,
    /// Horizontal pen advance after this glyph.
    pub advance_x: f32,
    /// Top-left UV coordinate in the atlas (normalized).
    pub uv_min: [f32; 2],
    /// Bottom-right UV coordinate in the atlas (normalized).
    pub uv_max: [f32; 2],
}

/// Vertical metrics of a glyph source, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FontMetrics {
    /// Distance from the top of the line to the baseline.
    pub ascender: f32,
    /// Distance between consecutive baselines.
    pub line_height: f32,
}

/// What layout does with a codepoint the source has no glyph for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MissingGlyph {
    /// Emit nothing but move the pen by the given amount.
    Advance(f32),
    /// Emit nothing and leave the pen where it is.
    Skip,
}

/// Read access to a set of glyphs already placed in an atlas.
pub trait GlyphSource: Send + Sync {
    /// Look up the glyph for `codepoint`.
    fn glyph(&self, codepoint: char) -> Option<&Glyph>;

    /// Horizontal kerning adjustment for `glyph` following `previous`.
    fn kerning(&self, glyph: &Glyph, previous: char) -> f32;

    /// Vertical metrics used for the pen origin and line height.
    fn metrics(&self) -> FontMetrics;

    /// Policy for codepoints without a glyph.
    fn missing_glyph(&self) -> MissingGlyph;
}

/// A glyph source backed by a typeface that can rasterize into an atlas.
pub trait TypefaceGlyphSource: GlyphSource {
    /// Rasterize every character of `repertoire` into `atlas`.
    ///
    /// Characters the typeface does not contain, or whose bitmap does not
    /// fit into the atlas, are left out. Returns the number of glyphs now
    /// available.
    fn load_glyphs(&mut self, atlas: &mut GlyphAtlas, repertoire: &str) -> FontResult<usize>;
}

/// Opens typeface files and produces glyph sources for a given point size.
pub trait TypefaceLoader: Send + Sync {
    /// Open `path` for rasterization at `point_size` pixels.
    fn open(&self, path: &Path, point_size: f32) -> FontResult<Box<dyn TypefaceGlyphSource>>;
}

/// The fixed character set rasterized into a typeface atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Repertoire {
    /// Mixed case latin letters, Swedish accented letters, digits and space.
    #[default]
    Full,
    /// Upper case letters, digits and space only.
    UpperCase,
}

impl Repertoire {
    /// The characters of this repertoire, in rasterization order.
    pub fn characters(self) -> &'static str {
        match self {
            Repertoire::Full => {
                "@!ABCDEFGHIJKLMNOPQRSTUVWXYZÅÄÖabcdefghijklmnopqrstuvwxyzåäö0123456789 "
            }
            Repertoire::UpperCase => "@!ABCDEFGHIJKLMNOPQRSTUVWXYZÅÄÖ0123456789 ",
        }
    }
}
