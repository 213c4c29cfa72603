//! Deduplication of font resources.
//!
//! The registry holds only weak references: it finds a live resource for a
//! key but never keeps one alive. Entries whose resource has been dropped are
//! pruned whenever the registry is accessed.

use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::FontResult;
use crate::resource::{FontKey, FontResource};

static GLOBAL_REGISTRY: OnceLock<FontResourceRegistry> = OnceLock::new();

/// Weak registry of live [`FontResource`]s.
#[derive(Default)]
pub struct FontResourceRegistry {
    entries: Mutex<Vec<(FontKey, Weak<FontResource>)>>,
}

impl FontResourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry, for callers that do not own a
    /// [`FontContext`](crate::FontContext).
    pub fn global() -> &'static FontResourceRegistry {
        GLOBAL_REGISTRY.get_or_init(FontResourceRegistry::new)
    }

    /// Return the live resource for `key`, or build and register one.
    ///
    /// `build` runs with the registry locked, so concurrent requests for the
    /// same key build it once. It must not call back into this registry.
    pub fn resolve<F>(&self, key: &FontKey, build: F) -> FontResult<Arc<FontResource>>
    where
        F: FnOnce() -> FontResult<FontResource>,
    {
        let mut entries = self.entries.lock();
        entries.retain(|(_, weak)| weak.strong_count() > 0);

        let existing = entries
            .iter()
            .filter(|(entry_key, _)| entry_key == key)
            .find_map(|(_, weak)| weak.upgrade());
        if let Some(resource) = existing {
            debug!(
                target: "horizon_lattice_font::registry",
                typeface = %key.typeface,
                atlas_size = key.atlas_width,
                flags = ?key.flags,
                "reusing font resource"
            );
            return Ok(resource);
        }

        let resource = Arc::new(build()?);
        entries.push((key.clone(), Arc::downgrade(&resource)));
        Ok(resource)
    }

    /// Look up a live resource without building one.
    pub fn get(&self, key: &FontKey) -> Option<Arc<FontResource>> {
        self.entries
            .lock()
            .iter()
            .filter(|(entry_key, _)| entry_key == key)
            .find_map(|(_, weak)| weak.upgrade())
    }

    /// Number of resources still alive.
    pub fn live_count(&self) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }

    /// Drop entries whose resource is gone. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(_, weak)| weak.strong_count() > 0);
        before - entries.len()
    }
}

impl std::fmt::Debug for FontResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock().len();
        f.debug_struct("FontResourceRegistry")
            .field("entries", &entries)
            .field("live", &self.live_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{HeadlessBackend, RenderBackend};

    fn builtin(backend: &Arc<HeadlessBackend>) -> FontResult<FontResource> {
        let backend: Arc<dyn RenderBackend> = backend.clone();
        FontResource::builtin(backend)
    }

    #[test]
    fn test_resolve_shares_live_resource() {
        let backend = Arc::new(HeadlessBackend::new());
        let registry = FontResourceRegistry::new();
        let key = FontKey::builtin();

        let a = registry.resolve(&key, || builtin(&backend)).unwrap();
        let b = registry
            .resolve(&key, || panic!("live resource must be reused"))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(backend.textures_created(), 1);
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn test_global_registry_is_shared() {
        let backend = Arc::new(HeadlessBackend::new());
        // Other tests may use the global registry too, so keep the key unique
        let key = FontKey {
            typeface: "global-registry".into(),
            ..FontKey::builtin()
        };

        let a = FontResourceRegistry::global()
            .resolve(&key, || builtin(&backend))
            .unwrap();
        let b = FontResourceRegistry::global()
            .resolve(&key, || panic!("live resource must be reused"))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(std::ptr::eq(
            FontResourceRegistry::global(),
            FontResourceRegistry::global()
        ));
        assert!(FontResourceRegistry::global().live_count() >= 1);

        drop((a, b));
        assert!(FontResourceRegistry::global().get(&key).is_none());
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn test_registry_does_not_extend_lifetime() {
        let backend = Arc::new(HeadlessBackend::new());
        let registry = FontResourceRegistry::new();
        let key = FontKey::builtin();

        let first = registry.resolve(&key, || builtin(&backend)).unwrap();
        drop(first);
        assert_eq!(backend.live_textures(), 0);
        assert_eq!(registry.live_count(), 0);
        assert!(registry.get(&key).is_none());

        let _second = registry.resolve(&key, || builtin(&backend)).unwrap();
        assert_eq!(backend.textures_created(), 2);
        assert_eq!(registry.prune(), 0);
    }

    #[test]
    fn test_prune_removes_dead_entries() {
        let backend = Arc::new(HeadlessBackend::new());
        let registry = FontResourceRegistry::new();
        let resource = registry
            .resolve(&FontKey::builtin(), || builtin(&backend))
            .unwrap();
        drop(resource);
        assert_eq!(registry.prune(), 1);
        assert_eq!(registry.prune(), 0);
    }

    #[test]
    fn test_failed_build_registers_nothing() {
        let registry = FontResourceRegistry::new();
        let result = registry.resolve(&FontKey::builtin(), || {
            Err(crate::error::FontError::Backend("no device".into()))
        });
        assert!(result.is_err());
        assert_eq!(registry.prune(), 0);
    }
}
