//! Shadow-casters registry
//!
//! Insertion-ordered set of casters that opted into stencil shadows. The
//! registry never keeps a caster alive: it stores `Weak` references and
//! hands out a snapshot of the live ones at draw time.
//!
//! Mutation and reads happen on the frame thread only.

use std::sync::{Arc, Weak};

use crate::caster::{CasterId, ShadowCaster};

/// Registered shadow casters
#[derive(Debug, Default)]
pub struct ShadowCasterRegistry {
    entries: Vec<(CasterId, Weak<ShadowCaster>)>,
}

impl ShadowCasterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a caster; returns false if it was already registered
    ///
    /// Entries of casters dropped without unregistering are pruned first.
    pub fn register(&mut self, caster: &Arc<ShadowCaster>) -> bool {
        self.prune();
        let id = caster.id();
        if self.contains(id) {
            return false;
        }
        self.entries.push((id, Arc::downgrade(caster)));
        log::trace!("Registered shadow caster {}", id);
        true
    }

    /// Remove a caster; returns false if it was not registered
    pub fn unregister(&mut self, id: CasterId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        let removed = self.entries.len() != before;
        if removed {
            log::trace!("Unregistered shadow caster {}", id);
        }
        removed
    }

    /// Check if a caster is registered
    pub fn contains(&self, id: CasterId) -> bool {
        self.entries.iter().any(|(entry, _)| *entry == id)
    }

    /// Number of registered casters, live or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered ids in insertion order
    pub fn ids(&self) -> impl Iterator<Item = CasterId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// Iterate live casters in insertion order
    pub fn iter(&self) -> impl Iterator<Item = Arc<ShadowCaster>> + '_ {
        self.entries.iter().filter_map(|(_, caster)| caster.upgrade())
    }

    /// Live casters in insertion order
    pub fn snapshot(&self) -> Vec<Arc<ShadowCaster>> {
        self.iter().collect()
    }

    /// Drop entries whose caster no longer exists; returns how many
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(_, caster)| caster.strong_count() > 0);
        let pruned = before - self.entries.len();
        if pruned > 0 {
            log::trace!("Pruned {} dropped shadow casters", pruned);
        }
        pruned
    }

    /// Remove every caster
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
