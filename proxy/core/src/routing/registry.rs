//! Backend Registry
//!
//! Holds the set of live backends and their health marks. Registration is
//! idempotent by id (re-registering replaces the driver and resets health).
//! Backends are never removed at runtime; an unreachable backend is marked
//! [`Health::Down`] and the router stops dispatching to it.
//!
//! Health marking is fed by a periodic check loop owned by the daemon,
//! which calls each backend's `health_check()` and reports the result via
//! [`BackendRegistry::set_health`].

use std::sync::Arc;

use dashmap::DashMap;

use crate::backend::{Backend, Health};

struct Entry {
    backend: Arc<dyn Backend>,
    health: Health,
}

/// Registry of all backends known to the proxy.
pub struct BackendRegistry {
    backends: DashMap<String, Entry>,
}

impl BackendRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            backends: DashMap::new(),
        }
    }

    /// Register a backend. Idempotent by id; replacing an existing entry
    /// resets its health to `Healthy`.
    pub fn register(&self, backend: Arc<dyn Backend>) {
        let id = backend.id().to_string();
        let replaced = self
            .backends
            .insert(
                id.clone(),
                Entry {
                    backend,
                    health: Health::Healthy,
                },
            )
            .is_some();

        if replaced {
            tracing::info!(backend = %id, "Replaced registered backend");
        } else {
            tracing::info!(backend = %id, "Registered backend");
        }
    }

    /// Look up a backend by id.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Backend>> {
        self.backends.get(id).map(|e| e.backend.clone())
    }

    /// Current health mark for a backend.
    pub fn health(&self, id: &str) -> Option<Health> {
        self.backends.get(id).map(|e| e.health)
    }

    /// Update the health mark for a backend. Transitions are logged;
    /// marking an unknown id is a no-op.
    pub fn set_health(&self, id: &str, health: Health) {
        if let Some(mut entry) = self.backends.get_mut(id) {
            if entry.health != health {
                tracing::info!(
                    backend = %id,
                    from = ?entry.health,
                    to = ?health,
                    "Backend health changed"
                );
                entry.health = health;
            }
        }
    }

    /// All registered backends, sorted by id.
    pub fn list(&self) -> Vec<Arc<dyn Backend>> {
        let mut all: Vec<_> = self.backends.iter().map(|e| e.backend.clone()).collect();
        all.sort_by(|a, b| a.id().cmp(b.id()));
        all
    }

    /// All backends the router may dispatch to (not `Down`), sorted by id.
    pub fn routable(&self) -> Vec<Arc<dyn Backend>> {
        let mut routable: Vec<_> = self
            .backends
            .iter()
            .filter(|e| e.health.routable())
            .map(|e| e.backend.clone())
            .collect();
        routable.sort_by(|a, b| a.id().cmp(b.id()));
        routable
    }

    /// Number of registered backends.
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
