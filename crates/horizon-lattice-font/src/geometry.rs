//! Uploaded text geometry and the per-font geometry cache.

use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::{BufferPairId, RenderBackend};
use crate::error::FontResult;
use crate::layout::{INDICES_PER_GLYPH, TextMesh};
use crate::types::Rect;

/// Owns a vertex/index buffer pair and releases it on drop.
pub struct GeometryBuffers {
    id: BufferPairId,
    backend: Arc<dyn RenderBackend>,
}

impl GeometryBuffers {
    /// Upload `mesh`. The mesh must not be empty.
    pub fn upload(mesh: &TextMesh, backend: &Arc<dyn RenderBackend>) -> FontResult<Self> {
        let id = backend.create_geometry_buffers(mesh.vertex_bytes(), mesh.index_bytes())?;
        Ok(Self {
            id,
            backend: Arc::clone(backend),
        })
    }

    /// Backend handle of the buffer pair.
    pub fn id(&self) -> BufferPairId {
        self.id
    }
}

impl Drop for GeometryBuffers {
    fn drop(&mut self) {
        self.backend.delete_geometry_buffers(self.id);
    }
}

impl std::fmt::Debug for GeometryBuffers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometryBuffers").field("id", &self.id).finish()
    }
}

/// A laid out string ready to draw.
#[derive(Debug)]
pub struct TextGeometry {
    bounds: Rect,
    glyph_count: usize,
    buffers: Option<GeometryBuffers>,
}

impl TextGeometry {
    /// Upload a mesh. Meshes without glyphs allocate no buffers.
    pub fn upload(mesh: &TextMesh, backend: &Arc<dyn RenderBackend>) -> FontResult<Self> {
        let buffers = if mesh.is_empty() {
            None
        } else {
            Some(GeometryBuffers::upload(mesh, backend)?)
        };
        Ok(Self {
            bounds: mesh.bounds,
            glyph_count: mesh.glyph_count,
            buffers,
        })
    }

    /// Extent of the laid out line, unscaled.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Number of glyph quads.
    pub fn glyph_count(&self) -> usize {
        self.glyph_count
    }

    /// Number of indices to draw.
    pub fn index_count(&self) -> u32 {
        (self.glyph_count * INDICES_PER_GLYPH) as u32
    }

    /// Uploaded buffers, `None` when there is nothing to draw.
    pub fn buffers(&self) -> Option<BufferPairId> {
        self.buffers.as_ref().map(GeometryBuffers::id)
    }
}

/// Uploaded geometry keyed by decoded text.
///
/// Keys compare by exact content. The cache is unbounded and lives as long
/// as its font; dropping an entry releases its buffers.
#[derive(Debug, Default)]
pub struct TextGeometryCache {
    entries: HashMap<Box<[char]>, TextGeometry>,
}

impl TextGeometryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached geometry for `text`.
    pub fn get(&self, text: &[char]) -> Option<&TextGeometry> {
        self.entries.get(text)
    }

    /// Insert geometry, returning what it replaced.
    pub fn put(&mut self, text: Box<[char]>, geometry: TextGeometry) -> Option<TextGeometry> {
        self.entries.insert(text, geometry)
    }

    /// Remove and return the geometry for `text`.
    pub fn remove(&mut self, text: &[char]) -> Option<TextGeometry> {
        self.entries.remove(text)
    }

    /// Number of cached strings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry, releasing all buffers.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
