//! # umbra_render - Stencil Shadow Volumes
//!
//! A render feature that marks shadowed pixels with stencil shadow
//! volumes and composites the shadow over the opaque image.
//!
//! ## Architecture
//!
//! 1. **Pass registry**: schedules [`CustomRenderPass`] features at a
//!    [`RenderPassEvent`] and drives them through each camera
//! 2. **Shadow volume feature**: owns the technique material, the mode and
//!    the registered casters, and records the three stencil steps
//! 3. **Render context**: the host's submission interface; the headless
//!    [`RecordingContext`] implements it for tools and tests
//!
//! ## Example
//!
//! ```ignore
//! use umbra_render::prelude::*;
//!
//! let mut registry = PassRegistry::new();
//! registry.register(ShadowVolumeFeature::new(Some(material)))?;
//!
//! // Scene entity opting into object-mode shadows
//! let mut binding = ShadowCasterBinding::new(&renderers);
//! binding.on_enable(Some(&mut registry))?;
//!
//! // Each camera
//! let frame = PassExecuteContext::new(&rendering, &pool, frame_number);
//! registry.execute_camera(&mut context, &frame)?;
//! ```

pub mod binding;
pub mod caster;
pub mod caster_registry;
pub mod context;
pub mod draw_command;
pub mod error;
pub mod light_extraction;
pub mod material;
pub mod pass;

pub use binding::ShadowCasterBinding;
pub use caster::{CasterId, MeshRenderer, RendererId, ShadowCaster};
pub use caster_registry::ShadowCasterRegistry;
pub use context::{
    CameraData, CullingResults, DrawingSettings, FilteringSettings, RecordingContext,
    RenderContext, RenderQueueRange, RenderingData, ShaderTagId, SortingCriteria, Submission,
    TextureFormatHint, VisibleRenderer,
};
pub use draw_command::{
    CommandBuffer, CommandBufferPool, CommandBufferPoolStats, DrawCommand, PooledCommandBuffer,
};
pub use error::{Result, ShadowError};
pub use light_extraction::{
    LightData, LightParameters, LightType, ShadowLightUniform, VisibleLight,
    LIGHT_COLOR_GLOBAL, LIGHT_POSITION_GLOBAL,
};
pub use material::{Material, PassIndex};
pub use pass::{
    CustomPassState, CustomRenderPass, PassConfigData, PassError, PassExecuteContext,
    PassPriority, PassRegistry, PassRegistryStats, PassSetupContext, RenderPassEvent,
    ShadowMode, ShadowVolumeFeature, ShadowVolumePass, ShadowVolumeSettings, ShadowVolumeStats,
    StencilStep,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::binding::ShadowCasterBinding;
    pub use crate::caster::{MeshRenderer, RendererId, ShadowCaster};
    pub use crate::context::{RecordingContext, RenderContext, RenderingData};
    pub use crate::draw_command::CommandBufferPool;
    pub use crate::light_extraction::{LightData, VisibleLight};
    pub use crate::material::Material;
    pub use crate::pass::{
        CustomRenderPass, PassExecuteContext, PassRegistry, PassSetupContext, RenderPassEvent,
        ShadowMode, ShadowVolumeFeature,
    };
}
