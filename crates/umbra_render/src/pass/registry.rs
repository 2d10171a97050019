//! Pass Registry
//!
//! Holds the render features injected into the pipeline, orders them by
//! frame event and priority, and drives them through each camera.
//!
//! # Example
//!
//! ```ignore
//! use umbra_render::pass::registry::PassRegistry;
//! use umbra_render::pass::builtin::ShadowVolumeFeature;
//!
//! let mut registry = PassRegistry::new();
//! registry.register(ShadowVolumeFeature::new(Some(material)))?;
//!
//! // Per camera
//! registry.execute_camera(&mut context, &frame)?;
//!
//! // Typed lookup
//! let feature = registry.find_feature_mut::<ShadowVolumeFeature>();
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::custom::{
    CustomPassState, CustomRenderPass, PassConfigData, PassError, PassExecuteContext,
    PassSetupContext,
};
use crate::context::RenderContext;

/// Pass registration data
struct PassData {
    /// The pass implementation
    pass: Box<dyn CustomRenderPass>,
    /// Whether the pass is enabled in the registry
    enabled: bool,
    /// Registration order, the last ordering tie-breaker
    sequence: u64,
}

/// Manages custom render passes
pub struct PassRegistry {
    /// Registered passes
    passes: BTreeMap<String, PassData>,

    /// Execution order
    order: Vec<String>,

    /// Disabled passes (due to repeated failures)
    disabled_passes: BTreeSet<String>,

    /// Consecutive failure counts per pass
    failure_counts: BTreeMap<String, u32>,

    /// Target description passed to `setup`
    setup_context: PassSetupContext,

    /// Maximum consecutive failures before disabling a pass
    max_failures: u32,

    next_sequence: u64,
}

impl Default for PassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PassRegistry {
    /// Create a new pass registry
    pub fn new() -> Self {
        Self::with_setup_context(PassSetupContext::default())
    }

    /// Create a registry targeting a specific surface
    pub fn with_setup_context(setup_context: PassSetupContext) -> Self {
        Self {
            passes: BTreeMap::new(),
            order: Vec::new(),
            disabled_passes: BTreeSet::new(),
            failure_counts: BTreeMap::new(),
            setup_context,
            max_failures: 3,
            next_sequence: 0,
        }
    }

    /// Register a custom pass and run its setup
    pub fn register<P: CustomRenderPass>(&mut self, pass: P) -> Result<(), PassError> {
        self.register_boxed(Box::new(pass))
    }

    /// Register a boxed pass and run its setup
    pub fn register_boxed(&mut self, mut pass: Box<dyn CustomRenderPass>) -> Result<(), PassError> {
        let name = pass.name().to_string();
        if self.passes.contains_key(&name) {
            return Err(PassError::Config(format!("Pass already registered: {}", name)));
        }

        pass.setup(&self.setup_context)?;

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.passes.insert(
            name.clone(),
            PassData {
                pass,
                enabled: true,
                sequence,
            },
        );
        self.rebuild_order();

        log::debug!("Registered render pass '{}'", name);
        Ok(())
    }

    /// Unregister a pass, running its cleanup
    pub fn unregister(&mut self, name: &str) -> bool {
        let removed = match self.passes.remove(name) {
            Some(mut data) => {
                data.pass.cleanup();
                self.rebuild_order();
                log::debug!("Unregistered render pass '{}'", name);
                true
            }
            None => false,
        };

        self.disabled_passes.remove(name);
        self.failure_counts.remove(name);
        removed
    }

    /// Order by (event, priority, registration order)
    fn rebuild_order(&mut self) {
        let mut keyed: Vec<_> = self
            .passes
            .iter()
            .map(|(name, data)| {
                (
                    (
                        data.pass.render_pass_event(),
                        data.pass.priority(),
                        data.sequence,
                    ),
                    name.clone(),
                )
            })
            .collect();
        keyed.sort_by_key(|(key, _)| *key);
        self.order = keyed.into_iter().map(|(_, name)| name).collect();
    }

    /// Run every active pass for one camera
    ///
    /// Each active pass goes through `on_camera_setup` and `execute` in
    /// order; once all have executed, each gets `on_camera_cleanup`. A
    /// failing pass does not stop the others. Failures are collected into
    /// [`PassError::PartialFailure`], and a pass failing `max_failures`
    /// frames in a row is disabled until its failure state is reset.
    pub fn execute_camera(
        &mut self,
        context: &mut dyn RenderContext,
        frame: &PassExecuteContext<'_>,
    ) -> Result<(), PassError> {
        let active: Vec<String> = self
            .order
            .iter()
            .filter(|name| self.should_execute(name))
            .cloned()
            .collect();

        let mut failed_passes = Vec::new();

        for name in &active {
            let Some(data) = self.passes.get_mut(name) else {
                continue;
            };
            data.pass.on_camera_setup(frame);

            match data.pass.execute(context, frame) {
                Ok(()) => {
                    self.failure_counts.remove(name);
                }
                Err(e) => {
                    log::warn!("Render pass '{}' failed: {}", name, e);
                    failed_passes.push((name.clone(), e.to_string()));
                    self.handle_pass_failure(name);
                }
            }
        }

        for name in &active {
            if let Some(data) = self.passes.get_mut(name) {
                data.pass.on_camera_cleanup(frame);
            }
        }

        if failed_passes.is_empty() {
            Ok(())
        } else {
            Err(PassError::PartialFailure(failed_passes))
        }
    }

    /// Handle a pass failure
    fn handle_pass_failure(&mut self, pass_name: &str) {
        let count = self
            .failure_counts
            .entry(pass_name.to_string())
            .and_modify(|c| *c += 1)
            .or_insert(1);

        if *count >= self.max_failures && self.disabled_passes.insert(pass_name.to_string()) {
            log::error!(
                "Render pass '{}' disabled after {} consecutive failures",
                pass_name,
                count
            );
        }
    }

    /// Check if pass should execute this frame
    fn should_execute(&self, pass_name: &str) -> bool {
        if self.disabled_passes.contains(pass_name) {
            return false;
        }
        self.passes
            .get(pass_name)
            .map(|d| d.enabled && d.pass.is_enabled())
            .unwrap_or(false)
    }

    /// Check if a pass was disabled by repeated failures
    pub fn is_pass_disabled(&self, pass_name: &str) -> bool {
        self.disabled_passes.contains(pass_name)
    }

    /// Reset failure state for a pass (e.g., after fixing its configuration)
    pub fn reset_failure_state(&mut self, pass_name: &str) {
        self.failure_counts.remove(pass_name);
        self.disabled_passes.remove(pass_name);
    }

    /// Reset all failure states
    pub fn reset_all_failures(&mut self) {
        self.failure_counts.clear();
        self.disabled_passes.clear();
    }

    /// Set maximum consecutive failures before disabling
    pub fn set_max_failures(&mut self, max: u32) {
        self.max_failures = max;
    }

    /// Enable/disable a single pass
    pub fn set_pass_enabled(&mut self, pass_name: &str, enabled: bool) {
        if let Some(data) = self.passes.get_mut(pass_name) {
            data.enabled = enabled;
        }
    }

    /// Check if a pass is enabled
    pub fn is_pass_enabled(&self, pass_name: &str) -> bool {
        self.passes
            .get(pass_name)
            .map(|d| d.enabled)
            .unwrap_or(false)
    }

    /// Get execution order
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Get reference to a pass
    pub fn get_pass(&self, name: &str) -> Option<&dyn CustomRenderPass> {
        self.passes.get(name).map(|data| data.pass.as_ref())
    }

    /// Get mutable reference to a pass
    pub fn get_pass_mut(&mut self, name: &str) -> Option<&mut dyn CustomRenderPass> {
        match self.passes.get_mut(name) {
            Some(data) => Some(data.pass.as_mut()),
            None => None,
        }
    }

    /// Check if a pass is registered
    pub fn has_pass(&self, name: &str) -> bool {
        self.passes.contains_key(name)
    }

    /// Get all pass names
    pub fn pass_names(&self) -> impl Iterator<Item = &str> {
        self.passes.keys().map(|s| s.as_str())
    }

    /// First registered pass of concrete type `T`
    pub fn find_feature<T: CustomRenderPass>(&self) -> Option<&T> {
        self.order
            .iter()
            .filter_map(|name| self.passes.get(name))
            .find_map(|data| data.pass.as_any().downcast_ref::<T>())
    }

    /// First registered pass of concrete type `T`, mutably
    pub fn find_feature_mut<T: CustomRenderPass>(&mut self) -> Option<&mut T> {
        let name = self
            .order
            .iter()
            .find(|name| {
                self.passes
                    .get(name.as_str())
                    .map(|data| data.pass.as_any().is::<T>())
                    .unwrap_or(false)
            })?
            .clone();
        self.passes
            .get_mut(&name)
            .and_then(|data| data.pass.as_any_mut().downcast_mut::<T>())
    }

    /// Apply a configuration to one pass
    pub fn apply_config(&mut self, name: &str, config: &PassConfigData) -> Result<(), PassError> {
        let data = self
            .passes
            .get_mut(name)
            .ok_or_else(|| PassError::Resource(format!("Unknown pass: {}", name)))?;
        data.pass.apply_config(config)?;
        data.enabled = config.enabled;
        self.rebuild_order();
        Ok(())
    }

    /// Restore configurations captured by [`PassRegistry::get_state`]
    pub fn restore_state(&mut self, state: &CustomPassState) -> Result<(), PassError> {
        let mut errors = Vec::new();
        for config in &state.configs {
            if !self.has_pass(&config.name) {
                continue;
            }
            if let Err(e) = self.apply_config(&config.name, config) {
                errors.push((config.name.clone(), e.to_string()));
            }
        }
        for (name, data) in &mut self.passes {
            data.enabled = state.enabled.contains(name);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PassError::PartialFailure(errors))
        }
    }

    /// Get state for serialization
    pub fn get_state(&self) -> CustomPassState {
        let configs: Vec<PassConfigData> = self
            .passes
            .iter()
            .map(|(name, data)| {
                data.pass.get_config().unwrap_or_else(|| PassConfigData {
                    name: name.clone(),
                    enabled: data.enabled,
                    priority: data.pass.priority().0,
                    config: serde_json::Value::Null,
                })
            })
            .collect();

        let enabled: Vec<String> = self
            .passes
            .iter()
            .filter(|(_, d)| d.enabled)
            .map(|(n, _)| n.clone())
            .collect();

        CustomPassState {
            configs,
            enabled,
            order: self.order.clone(),
        }
    }

    /// Re-run setup for every pass against a new target
    pub fn setup_all(&mut self, ctx: &PassSetupContext) -> Result<(), PassError> {
        self.setup_context = ctx.clone();
        let mut errors = Vec::new();

        for (name, data) in &mut self.passes {
            if let Err(e) = data.pass.setup(ctx) {
                errors.push((name.clone(), e.to_string()));
            }
        }
        self.rebuild_order();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PassError::PartialFailure(errors))
        }
    }

    /// Cleanup and drop every pass
    pub fn cleanup_all(&mut self) {
        for data in self.passes.values_mut() {
            data.pass.cleanup();
        }
        self.passes.clear();
        self.order.clear();
        self.reset_all_failures();
    }

    /// Get statistics
    pub fn stats(&self) -> PassRegistryStats {
        PassRegistryStats {
            pass_count: self.passes.len(),
            enabled_count: self.passes.values().filter(|d| d.enabled).count(),
            disabled_count: self.disabled_passes.len(),
        }
    }
}

/// Statistics for the pass registry
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassRegistryStats {
    /// Total number of registered passes
    pub pass_count: usize,
    /// Number of enabled passes
    pub enabled_count: usize,
    /// Number of disabled passes (due to failures)
    pub disabled_count: usize,
}
