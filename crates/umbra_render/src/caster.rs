//! Shadow casters and the renderers they draw through
//!
//! The scene owns [`MeshRenderer`]s and [`ShadowCaster`]s behind `Arc`s.
//! A caster only holds `Weak` references to its renderers, so a renderer
//! destroyed while its caster is still registered is skipped at draw time.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

static NEXT_CASTER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a host renderer
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RendererId(pub u64);

impl fmt::Display for RendererId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "renderer#{}", self.0)
    }
}

/// A renderable sub-object with an ordered list of material slots
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshRenderer {
    id: RendererId,
    material_slots: u32,
}

impl MeshRenderer {
    /// Create a renderer with `material_slots` shared material slots
    pub fn new(id: RendererId, material_slots: u32) -> Self {
        Self { id, material_slots }
    }

    /// Renderer identity
    pub fn id(&self) -> RendererId {
        self.id
    }

    /// Number of material slots (one submesh each)
    pub fn material_slots(&self) -> u32 {
        self.material_slots
    }
}

/// Identity of a shadow caster
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CasterId(pub u64);

impl CasterId {
    /// Allocate a process-unique caster id
    pub fn next() -> Self {
        Self(NEXT_CASTER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for CasterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "caster#{}", self.0)
    }
}

/// An entity whose renderers contribute shadow volumes
#[derive(Debug)]
pub struct ShadowCaster {
    id: CasterId,
    renderers: RwLock<Vec<Weak<MeshRenderer>>>,
}

impl ShadowCaster {
    /// Create a caster drawing through `renderers`
    pub fn new(renderers: &[Arc<MeshRenderer>]) -> Self {
        Self {
            id: CasterId::next(),
            renderers: RwLock::new(renderers.iter().map(Arc::downgrade).collect()),
        }
    }

    /// Caster identity
    pub fn id(&self) -> CasterId {
        self.id
    }

    /// Replace the renderer list
    pub fn set_renderers(&self, renderers: &[Arc<MeshRenderer>]) {
        *self.renderers.write() = renderers.iter().map(Arc::downgrade).collect();
    }

    /// Number of renderer entries, live or not
    pub fn renderer_count(&self) -> usize {
        self.renderers.read().len()
    }

    /// Snapshot of the renderer list, `None` where a renderer was destroyed
    pub fn renderers(&self) -> Vec<Option<Arc<MeshRenderer>>> {
        self.renderers.read().iter().map(Weak::upgrade).collect()
    }

    /// Total material slots across live renderers
    pub fn slot_count(&self) -> u32 {
        self.renderers()
            .iter()
            .flatten()
            .map(|r| r.material_slots())
            .sum()
    }
}
