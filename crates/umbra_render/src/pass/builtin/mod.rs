//! Built-in Render Features
//!
//! - Shadow volume: stencil shadow volumes for directional lights
//!
//! # Example
//!
//! ```ignore
//! use umbra_render::pass::builtin::*;
//! use umbra_render::pass::registry::PassRegistry;
//!
//! let mut registry = PassRegistry::new();
//! registry.register(ShadowVolumeFeature::new(Some(material)))?;
//! ```

mod shadow_volume;

pub use shadow_volume::{
    PassState, ShadowMode, ShadowTechnique, ShadowVolumeFeature, ShadowVolumePass,
    ShadowVolumeSettings, ShadowVolumeStats, StencilStep, BACK_FACES_PASS, COMMAND_BUFFER_NAME,
    FRONT_FACES_PASS, VOLUME_PASS,
};
