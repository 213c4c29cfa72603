//! The public font handle.

use std::sync::Arc;

use tracing::trace;

use crate::backend::{BufferPairId, RenderTarget, TextDrawCall};
use crate::error::FontResult;
use crate::geometry::{TextGeometry, TextGeometryCache};
use crate::layout::layout;
use crate::resource::FontResource;
use crate::types::{Color, Rect, Size};

/// Counters describing a font's geometry cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FontStats {
    /// Strings laid out so far.
    pub layouts: u64,
    /// Lookups answered from the cache.
    pub cache_hits: u64,
    /// Lookups that required a layout.
    pub cache_misses: u64,
    /// Strings currently cached.
    pub cached_strings: usize,
}

/// A font ready to measure and draw single-line text.
///
/// Fonts are created by a [`FontContext`](crate::FontContext). Handles with
/// the same typeface, atlas size and flags share one [`FontResource`]; each
/// handle keeps its own geometry cache, so repeated strings are laid out and
/// uploaded once per handle.
///
/// Text scale is normalized by the size the handle was requested at: a
/// scale of 1.0 multiplies layout by `base_glyph_size / size`. Handles
/// sharing a resource keep their own size, so a font requested at 12 over an
/// atlas built at 48 draws four times as large as one requested at 48.
pub struct Font {
    resource: Arc<FontResource>,
    cache: TextGeometryCache,
    size: f32,
    base_glyph_size: f32,
    stats: FontStats,
}

impl Font {
    pub(crate) fn new(resource: Arc<FontResource>, size: f32, base_glyph_size: f32) -> Self {
        Self {
            resource,
            cache: TextGeometryCache::new(),
            size,
            base_glyph_size,
            stats: FontStats::default(),
        }
    }

    /// The shared resource behind this handle.
    pub fn resource(&self) -> &Arc<FontResource> {
        &self.resource
    }

    /// Size this handle was requested at.
    ///
    /// May differ from [`FontResource::point_size`] when the resource was
    /// built for an earlier request.
    pub fn size(&self) -> f32 {
        self.size
    }

    /// Size of `text` drawn at `scale`.
    ///
    /// Empty text measures zero without touching the cache.
    pub fn measure(&mut self, text: &str, scale: f32) -> FontResult<Size> {
        let chars: Vec<char> = text.chars().collect();
        self.measure_chars(&chars, scale)
    }

    /// [`measure`](Self::measure) for UTF-16 text. Unpaired surrogates
    /// become U+FFFD.
    pub fn measure_utf16(&mut self, text: &[u16], scale: f32) -> FontResult<Size> {
        let chars = decode_utf16(text);
        self.measure_chars(&chars, scale)
    }

    /// Width of `text` drawn at `scale`.
    pub fn width(&mut self, text: &str, scale: f32) -> FontResult<f32> {
        Ok(self.measure(text, scale)?.width)
    }

    /// Draw `text` with its top-left corner at (`x`, `y`) on `target`.
    ///
    /// Empty text is a no-op.
    pub fn draw(
        &mut self,
        target: &RenderTarget,
        text: &str,
        x: f32,
        y: f32,
        color: Color,
        scale: f32,
    ) -> FontResult<()> {
        let chars: Vec<char> = text.chars().collect();
        self.draw_chars(target, &chars, x, y, color, scale)
    }

    /// [`draw`](Self::draw) for UTF-16 text. Unpaired surrogates become
    /// U+FFFD.
    pub fn draw_utf16(
        &mut self,
        target: &RenderTarget,
        text: &[u16],
        x: f32,
        y: f32,
        color: Color,
        scale: f32,
    ) -> FontResult<()> {
        let chars = decode_utf16(text);
        self.draw_chars(target, &chars, x, y, color, scale)
    }

    /// Cache counters.
    pub fn stats(&self) -> FontStats {
        FontStats {
            cached_strings: self.cache.len(),
            ..self.stats
        }
    }

    /// Drop all cached geometry and release its buffers.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    fn normalized_scale(&self, scale: f32) -> f32 {
        scale * self.base_glyph_size / self.size
    }

    fn measure_chars(&mut self, text: &[char], scale: f32) -> FontResult<Size> {
        if text.is_empty() {
            return Ok(Size::ZERO);
        }
        let scale = self.normalized_scale(scale);
        let bounds = self.geometry(text)?.bounds;
        Ok(bounds.size.scaled(scale))
    }

    fn draw_chars(
        &mut self,
        target: &RenderTarget,
        text: &[char],
        x: f32,
        y: f32,
        color: Color,
        scale: f32,
    ) -> FontResult<()> {
        if text.is_empty() {
            return Ok(());
        }

        let scale = self.normalized_scale(scale);
        let program = self.resource.program();
        let texture = self.resource.texture();

        let geometry = self.geometry(text)?;
        let Some(buffers) = geometry.buffers else {
            return Ok(());
        };
        let call = TextDrawCall {
            program,
            texture,
            buffers,
            index_count: geometry.index_count,
            matrix: target.text_matrix(x, y, scale),
            scale,
            color,
        };

        self.resource.backend().draw_text(target, &call)
    }

    /// Cached geometry for `text`, laid out and uploaded on a miss.
    fn geometry(&mut self, text: &[char]) -> FontResult<CachedText> {
        if let Some(geometry) = self.cache.get(text) {
            self.stats.cache_hits += 1;
            return Ok(CachedText::of(geometry));
        }

        self.stats.cache_misses += 1;
        self.stats.layouts += 1;

        let mesh = layout(text, self.resource.glyphs());
        trace!(
            target: "horizon_lattice_font::font",
            chars = text.len(),
            glyphs = mesh.glyph_count,
            "laid out text"
        );
        let geometry = TextGeometry::upload(&mesh, self.resource.backend())?;
        let cached = CachedText::of(&geometry);
        self.cache.put(text.into(), geometry);
        Ok(cached)
    }
}

/// The parts of a cached geometry needed to measure or draw it.
#[derive(Clone, Copy)]
struct CachedText {
    bounds: Rect,
    buffers: Option<BufferPairId>,
    index_count: u32,
}

impl CachedText {
    fn of(geometry: &TextGeometry) -> Self {
        Self {
            bounds: geometry.bounds(),
            buffers: geometry.buffers(),
            index_count: geometry.index_count(),
        }
    }
}

fn decode_utf16(units: &[u16]) -> Vec<char> {
    char::decode_utf16(units.iter().copied())
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("key", self.resource.key())
            .field("size", &self.size())
            .field("stats", &self.stats())
            .finish()
    }
}
