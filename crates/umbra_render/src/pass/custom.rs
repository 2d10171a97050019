//! Custom Render Pass Trait
//!
//! Defines the interface for render features that the host pipeline
//! schedules at a fixed point of the frame.
//!
//! # Example
//!
//! ```ignore
//! use umbra_render::pass::custom::*;
//!
//! struct DebugTint;
//!
//! impl CustomRenderPass for DebugTint {
//!     fn name(&self) -> &str { "debug_tint" }
//!
//!     fn render_pass_event(&self) -> RenderPassEvent {
//!         RenderPassEvent::BeforeRenderingPostProcessing
//!     }
//!
//!     fn execute(
//!         &mut self,
//!         context: &mut dyn RenderContext,
//!         frame: &PassExecuteContext<'_>,
//!     ) -> Result<(), PassError> {
//!         context.set_global_color("_DebugTint", [1.0, 0.0, 1.0, 1.0]);
//!         Ok(())
//!     }
//!
//!     fn as_any(&self) -> &dyn Any { self }
//!     fn as_any_mut(&mut self) -> &mut dyn Any { self }
//! }
//! ```

use core::any::Any;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::{RenderContext, RenderingData, TextureFormatHint};
use crate::draw_command::CommandBufferPool;

/// Point of the frame at which a pass is injected
///
/// Values are spaced so hosts can slot their own stages in between.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(i32)]
pub enum RenderPassEvent {
    /// Before any rendering
    BeforeRendering = 0,
    /// Before shadow maps are rendered
    BeforeRenderingShadows = 50,
    /// After shadow maps are rendered
    AfterRenderingShadows = 100,
    /// Before depth/normal prepasses
    BeforeRenderingPrePasses = 150,
    /// After depth/normal prepasses
    AfterRenderingPrePasses = 200,
    /// Before opaque geometry
    BeforeRenderingOpaques = 250,
    /// After opaque geometry
    #[default]
    AfterRenderingOpaques = 300,
    /// Before the skybox
    BeforeRenderingSkybox = 350,
    /// After the skybox
    AfterRenderingSkybox = 400,
    /// Before transparent geometry
    BeforeRenderingTransparents = 450,
    /// After transparent geometry
    AfterRenderingTransparents = 500,
    /// Before post-processing
    BeforeRenderingPostProcessing = 550,
    /// After post-processing
    AfterRenderingPostProcessing = 600,
    /// After everything else
    AfterRendering = 1000,
}

/// Tie-breaker between passes injected at the same event
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PassPriority(pub i32);

impl PassPriority {
    /// Runs before other passes at the same event
    pub const EARLY: Self = Self(-100);
    /// Default priority
    pub const NORMAL: Self = Self(0);
    /// Runs after other passes at the same event
    pub const LATE: Self = Self(100);
}

/// Context for pass setup
#[derive(Clone, Debug)]
pub struct PassSetupContext {
    /// Surface dimensions
    pub surface_size: (u32, u32),
    /// Depth/stencil attachment format of the camera target
    pub depth_stencil_format: TextureFormatHint,
}

impl Default for PassSetupContext {
    fn default() -> Self {
        Self {
            surface_size: (1920, 1080),
            depth_stencil_format: TextureFormatHint::Depth24Stencil8,
        }
    }
}

/// Context for one camera's execution of a pass
#[derive(Clone, Copy)]
pub struct PassExecuteContext<'a> {
    /// Culling results, camera data and light data for the camera
    pub rendering: &'a RenderingData,
    /// Pool that passes borrow scoped command buffers from
    pub command_buffers: &'a CommandBufferPool,
    /// Frame number
    pub frame: u64,
}

impl<'a> PassExecuteContext<'a> {
    /// Create an execute context
    pub fn new(
        rendering: &'a RenderingData,
        command_buffers: &'a CommandBufferPool,
        frame: u64,
    ) -> Self {
        Self {
            rendering,
            command_buffers,
            frame,
        }
    }
}

/// Errors that can occur during pass operations
#[derive(Clone, Debug, Error, Serialize, Deserialize)]
pub enum PassError {
    /// Error during pass setup
    #[error("Setup error: {0}")]
    Setup(String),
    /// Error during pass execution
    #[error("Execute error: {0}")]
    Execute(String),
    /// Resource not found or unavailable
    #[error("Resource error: {0}")]
    Resource(String),
    /// Invalid pass configuration
    #[error("Config error: {0}")]
    Config(String),
    /// Partial failure with list of (pass_name, error)
    #[error("Partial failure: {}", format_failures(.0))]
    PartialFailure(Vec<(String, String)>),
}

fn format_failures(failures: &[(String, String)]) -> String {
    failures
        .iter()
        .map(|(name, err)| format!("[{}: {}]", name, err))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trait for render features injected into the pipeline
///
/// The registry drives each enabled pass through
/// `on_camera_setup` → `execute` → `on_camera_cleanup` once per camera.
pub trait CustomRenderPass: Any + Send + Sync {
    /// Get the unique name of this pass
    fn name(&self) -> &str;

    /// When in the frame this pass runs
    fn render_pass_event(&self) -> RenderPassEvent {
        RenderPassEvent::AfterRenderingOpaques
    }

    /// Ordering among passes sharing an event
    fn priority(&self) -> PassPriority {
        PassPriority::NORMAL
    }

    /// Called once when the pass is registered or rebuilt
    fn setup(&mut self, _context: &PassSetupContext) -> Result<(), PassError> {
        Ok(())
    }

    /// Called before `execute` for every camera
    fn on_camera_setup(&mut self, _frame: &PassExecuteContext<'_>) {}

    /// Called each frame, per camera, to record the pass
    fn execute(
        &mut self,
        context: &mut dyn RenderContext,
        frame: &PassExecuteContext<'_>,
    ) -> Result<(), PassError>;

    /// Called after all passes executed for the camera
    fn on_camera_cleanup(&mut self, _frame: &PassExecuteContext<'_>) {}

    /// Called when the pass is unregistered or the pipeline is torn down
    fn cleanup(&mut self) {}

    /// Check if this pass is currently enabled
    fn is_enabled(&self) -> bool {
        true
    }

    /// Enable or disable this pass
    fn set_enabled(&mut self, _enabled: bool) {}

    /// Get pass configuration for serialization
    fn get_config(&self) -> Option<PassConfigData> {
        None
    }

    /// Apply configuration from deserialization
    fn apply_config(&mut self, _config: &PassConfigData) -> Result<(), PassError> {
        Ok(())
    }

    /// Upcast used by typed feature lookup
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast used by typed feature lookup
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Serializable pass configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PassConfigData {
    /// Pass name
    pub name: String,
    /// Enabled state
    pub enabled: bool,
    /// Priority
    pub priority: i32,
    /// Pass-specific configuration as JSON
    pub config: serde_json::Value,
}

impl Default for PassConfigData {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            priority: 0,
            config: serde_json::Value::Null,
        }
    }
}

/// Registry state for hot-reload serialization
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CustomPassState {
    /// Pass configurations
    pub configs: Vec<PassConfigData>,
    /// Enabled passes
    pub enabled: Vec<String>,
    /// Pass execution order
    pub order: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RecordingContext;

    struct TestPass {
        name: String,
        enabled: bool,
    }

    impl TestPass {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                enabled: true,
            }
        }
    }

    impl CustomRenderPass for TestPass {
        fn name(&self) -> &str {
            &self.name
        }

        fn execute(
            &mut self,
            context: &mut dyn RenderContext,
            _frame: &PassExecuteContext<'_>,
        ) -> Result<(), PassError> {
            context.set_global_vector("_TestVector", [1.0, 2.0, 3.0, 4.0]);
            Ok(())
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn set_enabled(&mut self, enabled: bool) {
            self.enabled = enabled;
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_custom_pass_defaults() {
        let mut pass = TestPass::new("test_pass");
        assert_eq!(pass.name(), "test_pass");
        assert_eq!(pass.render_pass_event(), RenderPassEvent::AfterRenderingOpaques);
        assert_eq!(pass.priority(), PassPriority::NORMAL);
        assert!(pass.get_config().is_none());
        assert!(pass.is_enabled());

        pass.set_enabled(false);
        assert!(!pass.is_enabled());

        let rendering = RenderingData::default();
        let pool = CommandBufferPool::new();
        let frame = PassExecuteContext::new(&rendering, &pool, 0);
        let mut context = RecordingContext::new();
        assert!(pass.execute(&mut context, &frame).is_ok());
        assert_eq!(context.global_vector("_TestVector"), Some([1.0, 2.0, 3.0, 4.0]));
    }

    #[test]
    fn test_render_pass_event_ordering() {
        assert!(RenderPassEvent::BeforeRendering < RenderPassEvent::BeforeRenderingShadows);
        assert!(
            RenderPassEvent::BeforeRenderingOpaques < RenderPassEvent::AfterRenderingOpaques
        );
        assert!(RenderPassEvent::AfterRenderingOpaques < RenderPassEvent::BeforeRenderingSkybox);
        assert!(
            RenderPassEvent::AfterRenderingTransparents
                < RenderPassEvent::BeforeRenderingPostProcessing
        );
        assert_eq!(RenderPassEvent::default(), RenderPassEvent::AfterRenderingOpaques);
        assert_eq!(RenderPassEvent::AfterRenderingOpaques as i32, 300);
    }

    #[test]
    fn test_pass_priority_ordering() {
        assert!(PassPriority::EARLY < PassPriority::NORMAL);
        assert!(PassPriority::NORMAL < PassPriority::LATE);
    }

    #[test]
    fn test_pass_error_display() {
        let err = PassError::Resource("technique material".into());
        assert!(err.to_string().contains("technique material"));

        let err = PassError::PartialFailure(vec![
            ("shadow_volume".into(), "device lost".into()),
            ("outline".into(), "shader error".into()),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("[shadow_volume: device lost]"));
        assert!(msg.contains("outline"));
    }

    #[test]
    fn test_pass_config_serialization() {
        let config = PassConfigData {
            name: "shadow_volume".into(),
            enabled: true,
            priority: 0,
            config: serde_json::json!({
                "mode": "Object",
                "render_pass_event": "AfterRenderingOpaques"
            }),
        };

        let json = serde_json::to_string(&config).unwrap();
        let restored: PassConfigData = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.name, "shadow_volume");
        assert!(restored.enabled);
        assert_eq!(restored.config["mode"], "Object");
    }
}
