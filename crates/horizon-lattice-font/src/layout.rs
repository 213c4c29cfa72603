//! Single-line text layout into textured quads.

use bytemuck::{Pod, Zeroable};

use crate::glyph::{GlyphSource, MissingGlyph};
use crate::types::{Point, Rect};

/// Vertices emitted per glyph quad.
pub const VERTICES_PER_GLYPH: usize = 4;

/// Indices emitted per glyph quad (two triangles).
pub const INDICES_PER_GLYPH: usize = 6;

/// Vertex format for text quads.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TextVertex {
    /// Position in text space, origin at the top-left of the line.
    pub position: [f32; 2],
    /// Texture coordinates in the glyph atlas.
    pub uv: [f32; 2],
}

impl TextVertex {
    /// Size of one vertex in bytes.
    pub const STRIDE: usize = std::mem::size_of::<Self>();

    #[inline]
    fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self {
            position: [x, y],
            uv: [u, v],
        }
    }
}

/// The CPU-side result of laying out one string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextMesh {
    /// Four vertices per glyph: top-left, top-right, bottom-left,
    /// bottom-right.
    pub vertices: Vec<TextVertex>,
    /// Six indices per glyph, 32-bit so long strings never wrap.
    pub indices: Vec<u32>,
    /// Extent of the line.
    pub bounds: Rect,
    /// Number of quads emitted.
    pub glyph_count: usize,
}

impl TextMesh {
    /// Returns true if no glyph was emitted.
    pub fn is_empty(&self) -> bool {
        self.glyph_count == 0
    }

    /// Vertex data as raw bytes, ready for upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index data as raw bytes, ready for upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Lay out `text` on a single line.
///
/// The pen starts at the source's ascender. Codepoints without a glyph are
/// handled according to [`GlyphSource::missing_glyph`]. Kerning applies
/// between consecutive placed glyphs.
///
/// The bounds run from the left edge of the first quad to the right edge of
/// the last one, and from 0 to the line height. They are zero when nothing
/// was placed.
pub fn layout(text: &[char], glyphs: &dyn GlyphSource) -> TextMesh {
    let metrics = glyphs.metrics();
    let mut pen = Point::new(0.0, metrics.ascender);
    let mut previous: Option<char> = None;

    let mut vertices = Vec::with_capacity(text.len() * VERTICES_PER_GLYPH);
    let mut indices = Vec::with_capacity(text.len() * INDICES_PER_GLYPH);

    for &codepoint in text {
        let Some(glyph) = glyphs.glyph(codepoint) else {
            if let MissingGlyph::Advance(advance) = glyphs.missing_glyph() {
                pen.x += advance;
            }
            continue;
        };

        if let Some(previous) = previous {
            pen.x += glyphs.kerning(glyph, previous);
        }

        let x0 = pen.x + glyph.offset_x;
        let x1 = x0 + glyph.width;
        let y0 = pen.y - glyph.offset_y;
        let y1 = y0 + glyph.height;
        let [u0, v0] = glyph.uv_min;
        let [u1, v1] = glyph.uv_max;

        let base = vertices.len() as u32;
        vertices.push(TextVertex::new(x0, y0, u0, v0));
        vertices.push(TextVertex::new(x1, y0, u1, v0));
        vertices.push(TextVertex::new(x0, y1, u0, v1));
        vertices.push(TextVertex::new(x1, y1, u1, v1));
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 1, base + 3, base + 2]);

        pen.x += glyph.advance_x;
        previous = Some(codepoint);
    }

    let glyph_count = vertices.len() / VERTICES_PER_GLYPH;
    let bounds = match (vertices.first(), vertices.last()) {
        (Some(first), Some(last)) => Rect::from_corners(
            Point::new(first.position[0], 0.0),
            Point::new(last.position[0], metrics.line_height),
        ),
        _ => Rect::ZERO,
    };

    TextMesh {
        vertices,
        indices,
        bounds,
        glyph_count,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::glyph::{BuiltinFont, FontMetrics, Glyph};

    /// Proportional glyphs with a kerning pair, skipping unknown codepoints.
    struct KernedGlyphs {
        glyphs: HashMap<char, Glyph>,
    }

    impl KernedGlyphs {
        fn new() -> Self {
            let glyph = |codepoint, width: f32| Glyph {
                codepoint,
                offset_x: 1.0,
                offset_y: 10.0,
                width,
                height: 12.0,
                advance_x: width + 2.0,
                uv_min: [0.0, 0.0],
                uv_max: [0.5, 0.5],
            };
            let glyphs = [glyph('A', 8.0), glyph('B', 6.0)]
                .into_iter()
                .map(|g| (g.codepoint, g))
                .collect();
            Self { glyphs }
        }
    }

    impl GlyphSource for KernedGlyphs {
        fn glyph(&self, codepoint: char) -> Option<&Glyph> {
            self.glyphs.get(&codepoint)
        }

        fn kerning(&self, glyph: &Glyph, previous: char) -> f32 {
            if previous == 'A' && glyph.codepoint == 'B' {
                -3.0
            } else {
                0.0
            }
        }

        fn metrics(&self) -> FontMetrics {
            FontMetrics {
                ascender: 11.0,
                line_height: 14.0,
            }
        }

        fn missing_glyph(&self) -> MissingGlyph {
            MissingGlyph::Skip
        }
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_vertex_stride() {
        assert_eq!(TextVertex::STRIDE, 16);
    }

    #[test]
    fn test_empty_text() {
        let mesh = layout(&[], &BuiltinFont::new());
        assert!(mesh.is_empty());
        assert!(mesh.indices.is_empty());
        assert_eq!(mesh.bounds, Rect::ZERO);
    }

    #[test]
    fn test_layout_is_deterministic() {
        let font = BuiltinFont::new();
        let text = chars("Hello, world");
        assert_eq!(layout(&text, &font), layout(&text, &font));
    }

    #[test]
    fn test_quad_vertex_order_and_indices() {
        let font = BuiltinFont::new();
        let mesh = layout(&chars("AB"), &font);
        assert_eq!(mesh.glyph_count, 2);
        assert_eq!(mesh.indices, vec![0, 1, 2, 1, 3, 2, 4, 5, 6, 5, 7, 6]);

        let v = &mesh.vertices;
        // Builtin glyphs sit between y = 0 and y = 8
        assert_eq!(v[0].position, [0.0, 0.0]);
        assert_eq!(v[1].position, [8.0, 0.0]);
        assert_eq!(v[2].position, [0.0, 8.0]);
        assert_eq!(v[3].position, [8.0, 8.0]);
        assert_eq!(v[4].position, [8.0, 0.0]);
        assert_eq!(v[0].uv[1], v[1].uv[1]);
        assert_eq!(v[0].uv[0], v[2].uv[0]);
    }

    #[test]
    fn test_builtin_bounds() {
        let mesh = layout(&chars("abc"), &BuiltinFont::new());
        assert_eq!(mesh.bounds, Rect::new(0.0, 0.0, 24.0, 8.0));
    }

    #[test]
    fn test_kerning_applies_between_glyphs() {
        let source = KernedGlyphs::new();
        let mesh = layout(&chars("AB"), &source);

        // A: pen 0, x0 = 1; advance 10; kerning -3 puts B's pen at 7
        assert_eq!(mesh.vertices[0].position, [1.0, 1.0]);
        assert_eq!(mesh.vertices[4].position[0], 8.0);
        assert_eq!(mesh.vertices[7].position, [14.0, 13.0]);
        assert_eq!(mesh.bounds, Rect::new(1.0, 0.0, 13.0, 14.0));

        let unkerned = layout(&chars("BA"), &source);
        assert_eq!(unkerned.vertices[4].position[0], 9.0);
    }

    #[test]
    fn test_missing_glyph_fallback() {
        // Builtin fonts advance over unknown codepoints
        let builtin = layout(&chars("A\u{263a}B"), &BuiltinFont::new());
        assert_eq!(builtin.glyph_count, 2);
        assert_eq!(builtin.vertices[4].position[0], 16.0);

        // Typeface sources skip them entirely
        let source = KernedGlyphs::new();
        let skipped = layout(&chars("A\u{263a}B"), &source);
        let direct = layout(&chars("AB"), &source);
        assert_eq!(skipped, direct);
    }

    #[test]
    fn test_indices_past_sixteen_bit_range() {
        let font = BuiltinFont::new();
        // 16384 quads use vertices 0..=65535, one more needs 65536
        for count in [16_384u32, 16_385] {
            let text = vec!['A'; count as usize];
            let mesh = layout(&text, &font);
            assert_eq!(mesh.glyph_count, count as usize);
            assert_eq!(mesh.indices.len(), count as usize * INDICES_PER_GLYPH);

            let base = 4 * (count - 1);
            let tail = &mesh.indices[mesh.indices.len() - INDICES_PER_GLYPH..];
            assert_eq!(tail, [base, base + 1, base + 2, base + 1, base + 3, base + 2]);
            assert_eq!(mesh.indices.iter().max(), Some(&(4 * count - 1)));
        }
    }

    #[test]
    fn test_only_missing_glyphs_gives_zero_bounds() {
        let mesh = layout(&chars("\u{263a}\u{263a}"), &BuiltinFont::new());
        assert!(mesh.is_empty());
        assert_eq!(mesh.bounds, Rect::ZERO);
    }
}
