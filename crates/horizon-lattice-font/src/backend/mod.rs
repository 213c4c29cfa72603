//! Rendering backends.
//!
//! Fonts never talk to the GPU directly. Everything they need, from atlas
//! textures and geometry buffers to the actual draw call, goes through a
//! [`RenderBackend`]:
//!
//! - [`WgpuBackend`] renders with two wgpu pipelines, one for coverage atlases
//!   and one for distance-field atlases.
//! - [`HeadlessBackend`] keeps track of resources and records draw calls
//!   without a GPU. It is used for measuring text and for tests.

mod gpu;
mod headless;

use glam::{Mat4, Vec3};

pub use self::gpu::{GraphicsConfig, WgpuBackend};
pub use self::headless::HeadlessBackend;

use crate::error::FontResult;
use crate::types::Color;

/// Handle to an atlas texture owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub(crate) u64);

/// Handle to a vertex buffer and index buffer pair owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferPairId(pub(crate) u64);

/// Handle to a render target owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(pub(crate) u64);

/// Shader program used to draw a font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProgramKind {
    /// Samples atlas coverage directly.
    #[default]
    Textured,
    /// Thresholds a signed distance field around its midpoint.
    DistanceField,
}

/// A surface text can be drawn onto.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTarget {
    /// Backend handle.
    pub id: TargetId,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Maps target pixels (origin top-left, y down) to clip space.
    pub view: Mat4,
}

impl RenderTarget {
    /// Describe a target with a pixel-space orthographic view.
    pub fn new(id: TargetId, width: u32, height: u32) -> Self {
        Self {
            id,
            width,
            height,
            view: Mat4::orthographic_rh(0.0, width as f32, height as f32, 0.0, -1.0, 1.0),
        }
    }

    /// Replace the view matrix.
    #[must_use]
    pub fn with_view(mut self, view: Mat4) -> Self {
        self.view = view;
        self
    }

    /// Full transform for text drawn at (`x`, `y`) with normalized `scale`.
    pub fn text_matrix(&self, x: f32, y: f32, scale: f32) -> Mat4 {
        self.view
            * Mat4::from_translation(Vec3::new(x, y, 0.0))
            * Mat4::from_scale(Vec3::new(scale, scale, 1.0))
    }
}

/// Everything needed to draw one cached string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextDrawCall {
    /// Program selected by the font's flags.
    pub program: ProgramKind,
    /// Atlas texture, sampled with linear filtering.
    pub texture: TextureId,
    /// Geometry of the string.
    pub buffers: BufferPairId,
    /// Number of indices to draw, six per glyph.
    pub index_count: u32,
    /// Target view, translation and scale combined.
    pub matrix: Mat4,
    /// Normalized scale, used by the distance-field program for edge width.
    pub scale: f32,
    /// Text color.
    pub color: Color,
}

/// GPU operations needed by fonts.
///
/// Implementations must be usable from whichever thread owns the graphics
/// context; fonts only call them synchronously.
pub trait RenderBackend: Send + Sync {
    /// Upload a single-channel atlas bitmap.
    fn create_atlas_texture(&self, width: u32, height: u32, data: &[u8]) -> FontResult<TextureId>;

    /// Release an atlas texture.
    fn delete_texture(&self, texture: TextureId);

    /// Upload vertex and index data for one string.
    ///
    /// Indices are `u32`.
    fn create_geometry_buffers(&self, vertices: &[u8], indices: &[u8]) -> FontResult<BufferPairId>;

    /// Release a buffer pair.
    fn delete_geometry_buffers(&self, buffers: BufferPairId);

    /// Create an offscreen render target.
    fn create_target(&self, width: u32, height: u32) -> FontResult<RenderTarget>;

    /// Bind `target`, set its viewport and issue an indexed draw.
    fn draw_text(&self, target: &RenderTarget, call: &TextDrawCall) -> FontResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn test_target_view_maps_corners() {
        let target = RenderTarget::new(TargetId(0), 200, 100);
        let top_left = target.view * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let bottom_right = target.view * Vec4::new(200.0, 100.0, 0.0, 1.0);
        assert!((top_left.x + 1.0).abs() < 1e-6 && (top_left.y - 1.0).abs() < 1e-6);
        assert!((bottom_right.x - 1.0).abs() < 1e-6 && (bottom_right.y + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_text_matrix_translates_then_scales() {
        let target = RenderTarget::new(TargetId(0), 100, 100).with_view(Mat4::IDENTITY);
        let m = target.text_matrix(10.0, 20.0, 2.0);
        let p = m * Vec4::new(3.0, 4.0, 0.0, 1.0);
        assert_eq!((p.x, p.y), (16.0, 28.0));
    }
}
