//! Typeface glyph source backed by `fontdue`.

use std::collections::HashMap;
use std::path::Path;

use fontdue::{Font, FontSettings};
use tracing::debug;

use super::{
    FontMetrics, Glyph, GlyphAtlas, GlyphSource, MissingGlyph, TypefaceGlyphSource,
    TypefaceLoader,
};
use crate::error::{FontError, FontResult};

/// Glyphs of one TrueType/OpenType face rasterized at a fixed pixel size.
pub struct FontdueGlyphSource {
    font: Font,
    point_size: f32,
    glyphs: HashMap<char, Glyph>,
    metrics: FontMetrics,
}

impl FontdueGlyphSource {
    /// Parse `data` as a font file and prepare rasterization at `point_size`.
    pub fn from_bytes(data: &[u8], point_size: f32) -> Result<Self, String> {
        let settings = FontSettings {
            scale: point_size,
            ..FontSettings::default()
        };
        let font = Font::from_bytes(data, settings).map_err(str::to_string)?;

        let metrics = match font.horizontal_line_metrics(point_size) {
            Some(line) => FontMetrics {
                ascender: line.ascent,
                line_height: line.new_line_size,
            },
            None => FontMetrics {
                ascender: point_size,
                line_height: point_size,
            },
        };

        Ok(Self {
            font,
            point_size,
            glyphs: HashMap::new(),
            metrics,
        })
    }

    /// Pixel size glyphs are rasterized at.
    pub fn point_size(&self) -> f32 {
        self.point_size
    }
}

impl GlyphSource for FontdueGlyphSource {
    fn glyph(&self, codepoint: char) -> Option<&Glyph> {
        self.glyphs.get(&codepoint)
    }

    fn kerning(&self, glyph: &Glyph, previous: char) -> f32 {
        self.font
            .horizontal_kern(previous, glyph.codepoint, self.point_size)
            .unwrap_or(0.0)
    }

    fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    fn missing_glyph(&self) -> MissingGlyph {
        MissingGlyph::Skip
    }
}

impl TypefaceGlyphSource for FontdueGlyphSource {
    fn load_glyphs(&mut self, atlas: &mut GlyphAtlas, repertoire: &str) -> FontResult<usize> {
        for codepoint in repertoire.chars() {
            if self.glyphs.contains_key(&codepoint) {
                continue;
            }
            // Index 0 is the .notdef glyph
            if self.font.lookup_glyph_index(codepoint) == 0 {
                debug!(
                    target: "horizon_lattice_font::glyph",
                    ?codepoint,
                    "typeface has no glyph, skipping"
                );
                continue;
            }

            let (metrics, bitmap) = self.font.rasterize(codepoint, self.point_size);
            let width = metrics.width as u32;
            let height = metrics.height as u32;
            let Some(region) = atlas.add_glyph(codepoint, width, height, &bitmap) else {
                continue;
            };

            let (u0, v0, u1, v1) = atlas.uv_rect(region);
            self.glyphs.insert(
                codepoint,
                Glyph {
                    codepoint,
                    offset_x: metrics.xmin as f32,
                    offset_y: (metrics.ymin + metrics.height as i32) as f32,
                    width: width as f32,
                    height: height as f32,
                    advance_x: metrics.advance_width,
                    uv_min: [u0, v0],
                    uv_max: [u1, v1],
                },
            );
        }

        Ok(self.glyphs.len())
    }
}

impl std::fmt::Debug for FontdueGlyphSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontdueGlyphSource")
            .field("point_size", &self.point_size)
            .field("glyphs", &self.glyphs.len())
            .field("metrics", &self.metrics)
            .finish()
    }
}

/// Loads typeface files from disk with `fontdue`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FontdueLoader;

impl TypefaceLoader for FontdueLoader {
    fn open(&self, path: &Path, point_size: f32) -> FontResult<Box<dyn TypefaceGlyphSource>> {
        let data = std::fs::read(path).map_err(|e| FontError::TypefaceLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let source =
            FontdueGlyphSource::from_bytes(&data, point_size).map_err(|reason| {
                FontError::TypefaceLoad {
                    path: path.to_path_buf(),
                    reason,
                }
            })?;

        Ok(Box::new(source))
    }
}
