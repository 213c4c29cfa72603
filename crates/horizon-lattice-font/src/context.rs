//! The font context: owner of shared font state.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::backend::RenderBackend;
use crate::distance_field::DistanceFieldCache;
use crate::error::FontResult;
use crate::font::Font;
use crate::glyph::{BUILTIN_FONT_SIZE, FontdueLoader, TypefaceLoader};
use crate::options::{FontContextConfig, FontOptions};
use crate::registry::FontResourceRegistry;
use crate::resource::{FontKey, FontRequest, FontResource};

/// Creates fonts and shares their resources.
///
/// A context belongs to one graphics backend. Fonts created through it with
/// equal typeface, atlas size and flags share a single atlas texture for as
/// long as any of them is alive.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use horizon_lattice_font::{Color, FontContext, FontContextConfig, FontOptions, HeadlessBackend};
///
/// let backend = Arc::new(HeadlessBackend::new());
/// let context = FontContext::new(backend.clone(), FontContextConfig::default());
///
/// let mut title = context.load_font("fonts/Sans.ttf", 32.0, FontOptions::new().distance_field())?;
/// let target = backend.create_target(640, 480)?;
/// title.draw(&target, "Score 100", 10.0, 10.0, Color::WHITE, 1.0)?;
/// ```
pub struct FontContext {
    backend: Arc<dyn RenderBackend>,
    registry: FontResourceRegistry,
    distance_fields: DistanceFieldCache,
    loader: Box<dyn TypefaceLoader>,
    config: FontContextConfig,
}

impl FontContext {
    /// Create a context that loads typefaces with `fontdue`.
    pub fn new(backend: Arc<dyn RenderBackend>, config: FontContextConfig) -> Self {
        Self::with_loader(backend, config, Box::new(FontdueLoader))
    }

    /// Create a context with a custom typeface loader.
    pub fn with_loader(
        backend: Arc<dyn RenderBackend>,
        config: FontContextConfig,
        loader: Box<dyn TypefaceLoader>,
    ) -> Self {
        debug!(
            target: "horizon_lattice_font::context",
            cache_dir = %config.distance_field.cache_dir.display(),
            distance_field_cache = config.distance_field.enabled,
            "created font context"
        );
        Self {
            backend,
            registry: FontResourceRegistry::new(),
            distance_fields: DistanceFieldCache::new(config.distance_field.clone()),
            loader,
            config,
        }
    }

    /// The built-in 8x8 bitmap font, sized [`BUILTIN_FONT_SIZE`].
    pub fn builtin_font(&self) -> FontResult<Font> {
        let resource = self
            .registry
            .resolve(&FontKey::builtin(), || FontResource::builtin(Arc::clone(&self.backend)))?;
        Ok(Font::new(resource, BUILTIN_FONT_SIZE, self.config.base_glyph_size))
    }

    /// Load `typeface` at `point_size`.
    ///
    /// If a font with the same typeface, atlas size and flags is alive, its
    /// resource is shared. The glyphs then keep the size they were
    /// rasterized at, while the returned font still scales text by
    /// `point_size`. An atlas size of zero selects the configured default.
    pub fn load_font(
        &self,
        typeface: impl AsRef<Path>,
        point_size: f32,
        options: FontOptions,
    ) -> FontResult<Font> {
        let options = if options.atlas_size == 0 {
            options.with_atlas_size(self.config.default_atlas_size)
        } else {
            options
        };
        let request = FontRequest::new(typeface.as_ref(), point_size, options);

        let resource = self.registry.resolve(&request.key(), || {
            FontResource::from_typeface(
                &request,
                self.loader.as_ref(),
                &self.distance_fields,
                Arc::clone(&self.backend),
            )
        })?;
        Ok(Font::new(
            resource,
            request.point_size,
            self.config.base_glyph_size,
        ))
    }

    /// Load a typeface using the packed option word of older callers.
    ///
    /// See [`FontOptions::from_packed`].
    pub fn load_font_packed(
        &self,
        typeface: impl AsRef<Path>,
        point_size: f32,
        packed: u32,
    ) -> FontResult<Font> {
        self.load_font(typeface, point_size, FontOptions::from_packed(packed))
    }

    /// Registry of live font resources.
    pub fn registry(&self) -> &FontResourceRegistry {
        &self.registry
    }

    /// The rendering backend.
    pub fn backend(&self) -> &Arc<dyn RenderBackend> {
        &self.backend
    }

    /// The active configuration.
    pub fn config(&self) -> &FontContextConfig {
        &self.config
    }
}

impl std::fmt::Debug for FontContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontContext")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}
