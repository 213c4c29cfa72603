//! Shared fixtures: a synthetic typeface with known metrics.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use horizon_lattice_font::{
    DistanceFieldCacheConfig, FontContext, FontContextConfig, FontError, FontMetrics, FontResult,
    Glyph, GlyphAtlas, GlyphSource, HeadlessBackend, MissingGlyph, TypefaceGlyphSource,
    TypefaceLoader,
};

/// Glyph cell height of the fixture typeface.
pub const GLYPH_HEIGHT: u32 = 10;
/// Advance of every non-space fixture glyph.
pub const ADVANCE: f32 = 8.0;
/// Kerning applied between 'A' and a following 'B'.
pub const AB_KERNING: f32 = -2.0;
/// Ascender and line height of the fixture typeface.
pub const LINE_HEIGHT: f32 = 12.0;

/// File name that the fixture loader refuses to open.
pub const MISSING_TYPEFACE: &str = "missing.ttf";

/// Opens fixture typefaces and counts how often it was asked to.
#[derive(Debug, Clone, Default)]
pub struct FixtureLoader {
    opens: Arc<AtomicUsize>,
}

impl FixtureLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of typefaces opened so far, across clones.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl TypefaceLoader for FixtureLoader {
    fn open(&self, path: &Path, _point_size: f32) -> FontResult<Box<dyn TypefaceGlyphSource>> {
        if path.file_name().is_some_and(|name| name == MISSING_TYPEFACE) {
            return Err(FontError::TypefaceLoad {
                path: path.to_path_buf(),
                reason: "no such file".into(),
            });
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixtureTypeface {
            glyphs: HashMap::new(),
        }))
    }
}

/// Covers printable ASCII only; 6 pixels wide, 'i' is 2.
struct FixtureTypeface {
    glyphs: HashMap<char, Glyph>,
}

impl GlyphSource for FixtureTypeface {
    fn glyph(&self, codepoint: char) -> Option<&Glyph> {
        self.glyphs.get(&codepoint)
    }

    fn kerning(&self, glyph: &Glyph, previous: char) -> f32 {
        if previous == 'A' && glyph.codepoint == 'B' {
            AB_KERNING
        } else {
            0.0
        }
    }

    fn metrics(&self) -> FontMetrics {
        FontMetrics {
            ascender: LINE_HEIGHT,
            line_height: LINE_HEIGHT,
        }
    }

    fn missing_glyph(&self) -> MissingGlyph {
        MissingGlyph::Skip
    }
}

impl TypefaceGlyphSource for FixtureTypeface {
    fn load_glyphs(&mut self, atlas: &mut GlyphAtlas, repertoire: &str) -> FontResult<usize> {
        for codepoint in repertoire.chars().filter(char::is_ascii) {
            let (width, height, advance) = match codepoint {
                ' ' => (0, 0, ADVANCE / 2.0),
                'i' => (2, GLYPH_HEIGHT, ADVANCE),
                _ => (6, GLYPH_HEIGHT, ADVANCE),
            };
            let bitmap = vec![255; (width * height) as usize];
            let Some(region) = atlas.add_glyph(codepoint, width, height, &bitmap) else {
                continue;
            };

            let (u0, v0, u1, v1) = atlas.uv_rect(region);
            self.glyphs.insert(
                codepoint,
                Glyph {
                    codepoint,
                    offset_x: 1.0,
                    offset_y: height as f32,
                    width: width as f32,
                    height: height as f32,
                    advance_x: advance,
                    uv_min: [u0, v0],
                    uv_max: [u1, v1],
                },
            );
        }
        Ok(self.glyphs.len())
    }
}

/// A headless context using the fixture loader, with the distance-field
/// cache in `cache_dir` or disabled.
pub fn fixture_context(
    cache_dir: Option<&Path>,
) -> (Arc<HeadlessBackend>, FixtureLoader, FontContext) {
    let backend = Arc::new(HeadlessBackend::new());
    let loader = FixtureLoader::new();
    let distance_field = match cache_dir {
        Some(dir) => DistanceFieldCacheConfig::default().with_cache_dir(dir),
        None => DistanceFieldCacheConfig::default().with_enabled(false),
    };
    let config = FontContextConfig::default().with_distance_field(distance_field);
    let context = FontContext::with_loader(backend.clone(), config, Box::new(loader.clone()));
    (backend, loader, context)
}

/// Route crate logs to the test harness output.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
