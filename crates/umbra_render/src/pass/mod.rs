//! Render Passes
//!
//! The [`CustomRenderPass`] trait features implement, the
//! [`PassRegistry`] that schedules them per camera, and the built-in
//! features.

pub mod builtin;
pub mod custom;
pub mod registry;

pub use custom::{
    CustomPassState, CustomRenderPass, PassConfigData, PassError, PassExecuteContext,
    PassPriority, PassSetupContext, RenderPassEvent,
};
pub use registry::{PassRegistry, PassRegistryStats};

pub use builtin::{
    ShadowMode, ShadowVolumeFeature, ShadowVolumePass, ShadowVolumeSettings, ShadowVolumeStats,
    StencilStep,
};
