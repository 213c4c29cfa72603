//! A backend without a GPU.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use tracing::trace;

use super::{BufferPairId, RenderBackend, RenderTarget, TargetId, TextDrawCall, TextureId};
use crate::error::{FontError, FontResult};

#[derive(Debug, Default)]
struct HeadlessState {
    next_id: u64,
    textures: HashMap<TextureId, (u32, u32)>,
    buffers: HashSet<BufferPairId>,
    targets: HashSet<TargetId>,
    draws: Vec<TextDrawCall>,
    textures_created: usize,
    buffers_created: usize,
    buffers_deleted: usize,
}

impl HeadlessState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Tracks resources and records draw calls in memory.
///
/// Useful for measuring text without a graphics device and for checking
/// resource lifetimes in tests. Deleting an unknown or already deleted
/// handle panics in debug builds.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    state: Mutex<HeadlessState>,
}

impl HeadlessBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of atlas textures currently alive.
    pub fn live_textures(&self) -> usize {
        self.state.lock().textures.len()
    }

    /// Number of geometry buffer pairs currently alive.
    pub fn live_buffers(&self) -> usize {
        self.state.lock().buffers.len()
    }

    /// Number of atlas textures created so far.
    pub fn textures_created(&self) -> usize {
        self.state.lock().textures_created
    }

    /// Number of geometry buffer pairs created so far.
    pub fn buffers_created(&self) -> usize {
        self.state.lock().buffers_created
    }

    /// Number of geometry buffer pairs deleted so far.
    pub fn buffers_deleted(&self) -> usize {
        self.state.lock().buffers_deleted
    }

    /// Size of a live texture.
    pub fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)> {
        self.state.lock().textures.get(&texture).copied()
    }

    /// Draw calls issued so far, oldest first.
    pub fn draws(&self) -> Vec<TextDrawCall> {
        self.state.lock().draws.clone()
    }

    /// Forget recorded draw calls.
    pub fn clear_draws(&self) {
        self.state.lock().draws.clear();
    }
}

impl RenderBackend for HeadlessBackend {
    fn create_atlas_texture(&self, width: u32, height: u32, data: &[u8]) -> FontResult<TextureId> {
        if (width as usize).checked_mul(height as usize) != Some(data.len()) {
            return Err(FontError::Backend(format!(
                "atlas data is {} bytes, expected {}x{}",
                data.len(),
                width,
                height
            )));
        }

        let mut state = self.state.lock();
        let id = TextureId(state.next_id());
        state.textures.insert(id, (width, height));
        state.textures_created += 1;
        trace!(target: "horizon_lattice_font::headless", ?id, width, height, "created texture");
        Ok(id)
    }

    fn delete_texture(&self, texture: TextureId) {
        let removed = self.state.lock().textures.remove(&texture);
        debug_assert!(removed.is_some(), "texture {texture:?} deleted twice");
    }

    fn create_geometry_buffers(&self, vertices: &[u8], indices: &[u8]) -> FontResult<BufferPairId> {
        if vertices.is_empty() || indices.is_empty() {
            return Err(FontError::Backend("empty geometry upload".into()));
        }

        let mut state = self.state.lock();
        let id = BufferPairId(state.next_id());
        state.buffers.insert(id);
        state.buffers_created += 1;
        Ok(id)
    }

    fn delete_geometry_buffers(&self, buffers: BufferPairId) {
        let mut state = self.state.lock();
        let removed = state.buffers.remove(&buffers);
        debug_assert!(removed, "buffers {buffers:?} deleted twice");
        state.buffers_deleted += 1;
    }

    fn create_target(&self, width: u32, height: u32) -> FontResult<RenderTarget> {
        let mut state = self.state.lock();
        let id = TargetId(state.next_id());
        state.targets.insert(id);
        Ok(RenderTarget::new(id, width, height))
    }

    fn draw_text(&self, target: &RenderTarget, call: &TextDrawCall) -> FontResult<()> {
        let mut state = self.state.lock();
        if !state.targets.contains(&target.id) {
            return Err(FontError::UnknownTarget);
        }
        if !state.textures.contains_key(&call.texture) {
            return Err(FontError::Backend(format!("unknown texture {:?}", call.texture)));
        }
        if !state.buffers.contains(&call.buffers) {
            return Err(FontError::Backend(format!("unknown buffers {:?}", call.buffers)));
        }
        state.draws.push(*call);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::Mat4;

    use super::*;
    use crate::backend::ProgramKind;
    use crate::types::Color;

    #[test]
    fn test_tracks_live_resources() {
        let backend = HeadlessBackend::new();
        let texture = backend.create_atlas_texture(4, 2, &[0; 8]).unwrap();
        let buffers = backend.create_geometry_buffers(&[0; 64], &[0; 12]).unwrap();
        assert_eq!(backend.live_textures(), 1);
        assert_eq!(backend.live_buffers(), 1);
        assert_eq!(backend.texture_size(texture), Some((4, 2)));

        backend.delete_geometry_buffers(buffers);
        backend.delete_texture(texture);
        assert_eq!(backend.live_textures(), 0);
        assert_eq!(backend.live_buffers(), 0);
        assert_eq!(backend.buffers_deleted(), 1);
    }

    #[test]
    fn test_rejects_mismatched_atlas_data() {
        let backend = HeadlessBackend::new();
        assert!(matches!(
            backend.create_atlas_texture(4, 4, &[0; 8]),
            Err(FontError::Backend(_))
        ));
        // The product wraps in 32 bits
        assert!(matches!(
            backend.create_atlas_texture(0x0001_0000, 0x0001_0000, &[]),
            Err(FontError::Backend(_))
        ));
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn test_records_draws_on_known_targets() {
        let backend = HeadlessBackend::new();
        let target = backend.create_target(64, 32).unwrap();
        let call = TextDrawCall {
            program: ProgramKind::Textured,
            texture: backend.create_atlas_texture(1, 1, &[0]).unwrap(),
            buffers: backend.create_geometry_buffers(&[0; 64], &[0; 12]).unwrap(),
            index_count: 6,
            matrix: Mat4::IDENTITY,
            scale: 1.0,
            color: Color::WHITE,
        };

        backend.draw_text(&target, &call).unwrap();
        assert_eq!(backend.draws(), vec![call]);

        let stranger = RenderTarget::new(TargetId(999), 64, 32);
        assert!(matches!(
            backend.draw_text(&stranger, &call),
            Err(FontError::UnknownTarget)
        ));
    }
}
