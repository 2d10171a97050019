//! Scene-side glue attaching a caster to the shadow volume feature
//!
//! A [`ShadowCasterBinding`] lives on a scene entity. When the entity is
//! enabled it looks the [`ShadowVolumeFeature`] up in the active
//! [`PassRegistry`] and registers its caster; when disabled it
//! unregisters it again.

use std::sync::Arc;

use crate::caster::{MeshRenderer, ShadowCaster};
use crate::error::{Result, ShadowError};
use crate::pass::builtin::ShadowVolumeFeature;
use crate::pass::registry::PassRegistry;

/// Opts one entity into object-mode shadow volumes
#[derive(Debug)]
pub struct ShadowCasterBinding {
    caster: Arc<ShadowCaster>,
    attached: bool,
}

impl ShadowCasterBinding {
    /// Create a detached binding drawing through `renderers`
    pub fn new(renderers: &[Arc<MeshRenderer>]) -> Self {
        Self {
            caster: Arc::new(ShadowCaster::new(renderers)),
            attached: false,
        }
    }

    /// The caster this binding registers
    pub fn caster(&self) -> &Arc<ShadowCaster> {
        &self.caster
    }

    /// Whether the caster is currently registered with a feature
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Re-gather the renderers of the entity's children
    pub fn reset_from_children(&self, renderers: &[Arc<MeshRenderer>]) {
        self.caster.set_renderers(renderers);
        log::trace!(
            "Shadow caster {} reset with {} renderers",
            self.caster.id(),
            renderers.len()
        );
    }

    /// Register the caster with the pipeline's shadow volume feature
    ///
    /// Fails with [`ShadowError::NoPassRegistry`] or
    /// [`ShadowError::FeatureNotFound`]; the binding then stays detached
    /// until enabled again.
    pub fn on_enable(&mut self, registry: Option<&mut PassRegistry>) -> Result<()> {
        let Some(registry) = registry else {
            return Err(report(ShadowError::NoPassRegistry));
        };
        let Some(feature) = registry.find_feature_mut::<ShadowVolumeFeature>() else {
            return Err(report(ShadowError::FeatureNotFound(
                ShadowVolumeFeature::NAME.to_string(),
            )));
        };

        log::info!("Found feature '{}' for {}", ShadowVolumeFeature::NAME, self.caster.id());
        feature.register_object(&self.caster);
        self.attached = true;
        Ok(())
    }

    /// Unregister the caster; a no-op when detached
    ///
    /// Without a registry the caster cannot be reached, so the binding
    /// stays attached and [`ShadowError::NoPassRegistry`] is returned.
    /// A feature that is no longer registered holds no casters, so the
    /// binding simply detaches.
    pub fn on_disable(&mut self, registry: Option<&mut PassRegistry>) -> Result<()> {
        if !self.attached {
            return Ok(());
        }
        let Some(registry) = registry else {
            return Err(report(ShadowError::NoPassRegistry));
        };
        if let Some(feature) = registry.find_feature_mut::<ShadowVolumeFeature>() {
            feature.unregister_object(self.caster.id());
        }
        self.attached = false;
        Ok(())
    }
}

fn report(err: ShadowError) -> ShadowError {
    log::error!("{}", err);
    err
}
