//! Shared font resources: a glyph set, its atlas and the uploaded texture.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::backend::{ProgramKind, RenderBackend, TextureId};
use crate::distance_field::DistanceFieldCache;
use crate::error::FontResult;
use crate::glyph::{
    BUILTIN_GLYPH_SIZE, BuiltinFont, GlyphAtlas, GlyphSource, TypefaceGlyphSource, TypefaceLoader,
};
use crate::options::{FontFlags, FontOptions};

/// Identity of a font resource.
///
/// Point size is deliberately absent: requests that differ only in point
/// size share the resource built for the first of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontKey {
    /// Typeface name as requested. Empty for the built-in font.
    pub typeface: String,
    /// Atlas width in pixels.
    pub atlas_width: u32,
    /// Atlas height in pixels.
    pub atlas_height: u32,
    /// Rendering flags.
    pub flags: FontFlags,
}

impl FontKey {
    /// Key of the built-in bitmap font.
    pub fn builtin() -> Self {
        let atlas = BuiltinFont::atlas_size();
        Self {
            typeface: String::new(),
            atlas_width: atlas.0,
            atlas_height: atlas.1,
            flags: FontFlags::empty(),
        }
    }

    /// Returns true for the built-in font's key.
    pub fn is_builtin(&self) -> bool {
        self.typeface.is_empty()
    }
}

/// A request for a typeface-backed font.
#[derive(Debug, Clone, PartialEq)]
pub struct FontRequest {
    /// Path of the typeface file.
    pub typeface: PathBuf,
    /// Pixel size glyphs are rasterized at.
    pub point_size: f32,
    /// Flags and atlas size.
    pub options: FontOptions,
}

impl FontRequest {
    /// Create a request.
    pub fn new(typeface: impl Into<PathBuf>, point_size: f32, options: FontOptions) -> Self {
        Self {
            typeface: typeface.into(),
            point_size,
            options,
        }
    }

    /// Registry key for this request.
    pub fn key(&self) -> FontKey {
        FontKey {
            typeface: self.typeface.to_string_lossy().into_owned(),
            atlas_width: self.options.atlas_size,
            atlas_height: self.options.atlas_size,
            flags: self.options.flags,
        }
    }
}

enum GlyphSet {
    Builtin(BuiltinFont),
    Typeface {
        source: Box<dyn TypefaceGlyphSource>,
        atlas: GlyphAtlas,
    },
}

/// Glyphs and atlas texture shared by every [`Font`](crate::Font) with the
/// same [`FontKey`].
///
/// The atlas texture is deleted when the last reference is dropped.
pub struct FontResource {
    key: FontKey,
    glyphs: GlyphSet,
    texture: TextureId,
    point_size: f32,
    backend: Arc<dyn RenderBackend>,
}

impl FontResource {
    /// Upload the built-in bitmap font.
    pub fn builtin(backend: Arc<dyn RenderBackend>) -> FontResult<Self> {
        let font = BuiltinFont::new();
        let atlas = font.atlas();
        let texture = backend.create_atlas_texture(atlas.width(), atlas.height(), atlas.data())?;

        info!(
            target: "horizon_lattice_font::registry",
            glyphs = font.glyph_count(),
            "created built-in font resource"
        );

        Ok(Self {
            key: FontKey::builtin(),
            glyphs: GlyphSet::Builtin(font),
            texture,
            point_size: BUILTIN_GLYPH_SIZE as f32,
            backend,
        })
    }

    /// Rasterize a typeface into a new atlas and upload it.
    ///
    /// With [`FontFlags::DISTANCE_FIELD`] the atlas is replaced by its
    /// distance field, taken from `distance_fields` when cached.
    pub fn from_typeface(
        request: &FontRequest,
        loader: &dyn TypefaceLoader,
        distance_fields: &DistanceFieldCache,
        backend: Arc<dyn RenderBackend>,
    ) -> FontResult<Self> {
        let key = request.key();
        let mut atlas = GlyphAtlas::new(key.atlas_width, key.atlas_height, 1)?;
        let mut source = loader.open(&request.typeface, request.point_size)?;
        let glyph_count =
            source.load_glyphs(&mut atlas, request.options.repertoire().characters())?;

        if key.flags.contains(FontFlags::DISTANCE_FIELD) {
            let field = distance_fields.load_or_build(&request.typeface, request.point_size, &atlas);
            atlas.replace_data(field)?;
        }

        let texture = backend.create_atlas_texture(atlas.width(), atlas.height(), atlas.data())?;

        info!(
            target: "horizon_lattice_font::registry",
            typeface = %request.typeface.display(),
            point_size = request.point_size,
            atlas_size = key.atlas_width,
            flags = ?key.flags,
            glyphs = glyph_count,
            usage = atlas.usage(),
            "created font resource"
        );

        Ok(Self {
            key,
            glyphs: GlyphSet::Typeface { source, atlas },
            texture,
            point_size: request.point_size,
            backend,
        })
    }

    /// Identity of this resource.
    pub fn key(&self) -> &FontKey {
        &self.key
    }

    /// Glyph lookup for layout.
    pub fn glyphs(&self) -> &dyn GlyphSource {
        match &self.glyphs {
            GlyphSet::Builtin(font) => font,
            GlyphSet::Typeface { source, .. } => source.as_ref(),
        }
    }

    /// CPU copy of the atlas, as uploaded.
    pub fn atlas(&self) -> &GlyphAtlas {
        match &self.glyphs {
            GlyphSet::Builtin(font) => font.atlas(),
            GlyphSet::Typeface { atlas, .. } => atlas,
        }
    }

    /// Uploaded atlas texture.
    pub fn texture(&self) -> TextureId {
        self.texture
    }

    /// Point size the glyphs were built at.
    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    /// Typeface path, `None` for the built-in font.
    pub fn typeface(&self) -> Option<&Path> {
        (!self.key.is_builtin()).then(|| Path::new(&self.key.typeface))
    }

    /// Program that draws this resource's atlas.
    pub fn program(&self) -> ProgramKind {
        if self.key.flags.contains(FontFlags::DISTANCE_FIELD) {
            ProgramKind::DistanceField
        } else {
            ProgramKind::Textured
        }
    }

    /// Backend owning the texture.
    pub fn backend(&self) -> &Arc<dyn RenderBackend> {
        &self.backend
    }
}

impl Drop for FontResource {
    fn drop(&mut self) {
        debug!(
            target: "horizon_lattice_font::registry",
            typeface = %self.key.typeface,
            "releasing font resource"
        );
        self.backend.delete_texture(self.texture);
    }
}

impl std::fmt::Debug for FontResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontResource")
            .field("key", &self.key)
            .field("point_size", &self.point_size)
            .field("texture", &self.texture)
            .field("atlas", self.atlas())
            .finish()
    }
}
