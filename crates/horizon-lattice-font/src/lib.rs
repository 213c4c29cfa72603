//! Shared glyph atlases and cached text geometry for Horizon Lattice.
//!
//! This crate turns single-line text into textured quads drawn from a glyph
//! atlas. Fonts requesting the same typeface, atlas size and flags share one
//! atlas texture, and every font handle caches the geometry of the strings
//! it has drawn, so a string is laid out and uploaded only once.
//!
//! # Getting Started
//!
//! Everything starts from a [`FontContext`], which owns the rendering
//! backend and the registry of live font resources:
//!
//! ```
//! use std::sync::Arc;
//! use horizon_lattice_font::{
//!     Color, FontContext, FontContextConfig, HeadlessBackend, RenderBackend,
//! };
//!
//! # fn main() -> horizon_lattice_font::FontResult<()> {
//! let backend = Arc::new(HeadlessBackend::new());
//! let context = FontContext::new(backend.clone(), FontContextConfig::default());
//!
//! // The built-in 8x8 font needs no typeface file
//! let mut font = context.builtin_font()?;
//! let size = font.measure("Hello", 1.0)?;
//! assert_eq!(size.width, 40.0);
//!
//! let target = backend.create_target(320, 200)?;
//! font.draw(&target, "Hello", 10.0, 10.0, Color::WHITE, 1.0)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Typefaces and Distance Fields
//!
//! TrueType and OpenType files are rasterized with `fontdue` into an atlas
//! of the requested size. With [`FontFlags::DISTANCE_FIELD`] the atlas is
//! converted to a signed distance field, which is cached on disk so later
//! runs skip the conversion:
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use horizon_lattice_font::{FontContext, FontContextConfig, FontOptions, HeadlessBackend};
//! # fn main() -> horizon_lattice_font::FontResult<()> {
//! # let context = FontContext::new(Arc::new(HeadlessBackend::new()), FontContextConfig::default());
//! let options = FontOptions::new().distance_field().with_atlas_size(256);
//! let title = context.load_font("fonts/Sans.ttf", 48.0, options)?;
//!
//! // Shares the atlas built above: point size is not part of the identity
//! let subtitle = context.load_font("fonts/Sans.ttf", 24.0, options)?;
//! assert!(Arc::ptr_eq(title.resource(), subtitle.resource()));
//! # Ok(())
//! # }
//! ```
//!
//! # Rendering Backends
//!
//! [`WgpuBackend`] draws with wgpu, either on an application's device or on
//! a device of its own. [`HeadlessBackend`] needs no GPU and records draw
//! calls instead, which is enough for measuring text.

mod backend;
mod context;
mod distance_field;
mod error;
mod font;
mod geometry;
mod glyph;
mod layout;
mod options;
mod registry;
mod resource;
mod types;

// Core infrastructure
pub use context::FontContext;
pub use error::{FontError, FontResult};
pub use options::{BASE_GLYPH_SIZE, DEFAULT_ATLAS_SIZE, FontContextConfig, FontFlags, FontOptions};

// Fonts and resources
pub use font::{Font, FontStats};
pub use registry::FontResourceRegistry;
pub use resource::{FontKey, FontRequest, FontResource};

// Layout and geometry
pub use geometry::{GeometryBuffers, TextGeometry, TextGeometryCache};
pub use layout::{INDICES_PER_GLYPH, TextMesh, TextVertex, VERTICES_PER_GLYPH, layout};

// Glyph sources
pub use glyph::{
    AtlasRegion, BUILTIN_FALLBACK_ADVANCE, BUILTIN_FONT_SIZE, BUILTIN_GLYPH_SIZE, BuiltinFont,
    FontMetrics, FontdueGlyphSource, FontdueLoader, Glyph, GlyphAtlas, GlyphSource,
    MAX_ATLAS_SIZE, MissingGlyph, Repertoire, TypefaceGlyphSource, TypefaceLoader,
};

// Distance fields
pub use distance_field::{
    DISTANCE_FIELD_RADIUS, DistanceFieldCache, DistanceFieldCacheConfig, make_distance_map,
};

// Rendering backends
pub use backend::{
    BufferPairId, GraphicsConfig, HeadlessBackend, ProgramKind, RenderBackend, RenderTarget,
    TargetId, TextDrawCall, TextureId, WgpuBackend,
};

// Drawing types
pub use types::{Color, Point, Rect, Size};

// Re-export wgpu types that users commonly need
pub use wgpu;
