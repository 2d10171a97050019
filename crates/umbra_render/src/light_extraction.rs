//! Main Light Extraction
//!
//! Turns the host's visible-light list into the two globals the shadow
//! volume shader reads:
//!
//! - `_WorldSpaceLightPos0`: light direction, `w = 0` for directional lights
//! - `_LightColor0`: the light's final color
//!
//! # Usage
//!
//! ```ignore
//! let params = LightParameters::derive(&rendering.lights);
//! params.publish(context);
//! ```

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::context::RenderContext;

/// Global vector holding the main light direction
pub const LIGHT_POSITION_GLOBAL: &str = "_WorldSpaceLightPos0";

/// Global color holding the main light color
pub const LIGHT_COLOR_GLOBAL: &str = "_LightColor0";

/// Local axis a light shines along
pub const LIGHT_FORWARD_AXIS: Vec3 = Vec3::Z;

/// Kinds of light the host may report
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightType {
    /// Infinitely distant light
    Directional,
    /// Omnidirectional light
    Point,
    /// Cone light
    Spot,
    /// Rectangle/disc light
    Area,
}

/// A light visible to the current camera
#[derive(Clone, Debug, PartialEq)]
pub struct VisibleLight {
    /// Light kind
    pub light_type: LightType,
    /// World-space forward axis
    pub forward: Vec3,
    /// World-space position
    pub position: Vec3,
    /// Color after intensity and temperature folding
    pub final_color: [f32; 4],
}

impl VisibleLight {
    /// Create a visible light from its transform
    pub fn from_transform(
        light_type: LightType,
        rotation: Quat,
        position: Vec3,
        final_color: [f32; 4],
    ) -> Self {
        Self {
            light_type,
            forward: rotation * LIGHT_FORWARD_AXIS,
            position,
            final_color,
        }
    }

    /// Create a directional light shining along `forward`
    pub fn directional(forward: Vec3, final_color: [f32; 4]) -> Self {
        Self {
            light_type: LightType::Directional,
            forward,
            position: Vec3::ZERO,
            final_color,
        }
    }
}

/// Lights visible to the current camera
#[derive(Clone, Debug)]
pub struct LightData {
    /// Index of the main light in `visible_lights`, negative for none
    pub main_light_index: i32,
    /// Visible lights
    pub visible_lights: Vec<VisibleLight>,
}

impl Default for LightData {
    fn default() -> Self {
        Self {
            main_light_index: -1,
            visible_lights: Vec::new(),
        }
    }
}

impl LightData {
    /// Create light data
    pub fn new(main_light_index: i32, visible_lights: Vec<VisibleLight>) -> Self {
        Self {
            main_light_index,
            visible_lights,
        }
    }

    /// The main light, if the index is in range
    pub fn main_light(&self) -> Option<&VisibleLight> {
        usize::try_from(self.main_light_index)
            .ok()
            .and_then(|i| self.visible_lights.get(i))
    }
}

/// Light parameters published for one frame
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LightParameters {
    /// Direction (`w = 0`) of the main light
    pub position: [f32; 4],
    /// Final color of the main light
    pub color: [f32; 4],
}

impl LightParameters {
    /// No shadow contribution: zero direction, black color
    pub const NONE: Self = Self {
        position: [0.0; 4],
        color: [0.0; 4],
    };

    /// Derive the parameters for a frame
    ///
    /// Only a directional main light contributes. A missing main light
    /// and any other light kind yield [`LightParameters::NONE`].
    pub fn derive(lights: &LightData) -> Self {
        match lights.main_light() {
            Some(light) if light.light_type == LightType::Directional => Self {
                position: light.forward.extend(0.0).to_array(),
                color: light.final_color,
            },
            _ => Self::NONE,
        }
    }

    /// Check if this is the no-contribution state
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    /// Write both globals
    pub fn publish(&self, context: &mut dyn RenderContext) {
        context.set_global_vector(LIGHT_POSITION_GLOBAL, self.position);
        context.set_global_color(LIGHT_COLOR_GLOBAL, self.color);
    }

    /// GPU layout for hosts that bind the parameters as a uniform block
    pub fn to_uniform(&self) -> ShadowLightUniform {
        ShadowLightUniform {
            world_space_light_pos: self.position,
            light_color: self.color,
        }
    }
}

impl Default for LightParameters {
    fn default() -> Self {
        Self::NONE
    }
}

/// Uniform block mirroring the two light globals
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadowLightUniform {
    /// `_WorldSpaceLightPos0`
    pub world_space_light_pos: [f32; 4],
    /// `_LightColor0`
    pub light_color: [f32; 4],
}

/// Fold intensity and an optional color temperature into a light color
pub fn resolve_final_color(color: [f32; 3], intensity: f32, temperature: Option<f32>) -> [f32; 4] {
    let tint = temperature.map(color_temperature_to_rgb).unwrap_or([1.0; 3]);
    [
        color[0] * tint[0] * intensity,
        color[1] * tint[1] * intensity,
        color[2] * tint[2] * intensity,
        1.0,
    ]
}

/// Approximate RGB of a black body at `kelvin` (1000K..40000K)
pub fn color_temperature_to_rgb(kelvin: f32) -> [f32; 3] {
    let t = kelvin.clamp(1000.0, 40000.0) / 100.0;

    let r = if t <= 66.0 {
        255.0
    } else {
        329.698_73 * (t - 60.0).powf(-0.133_204_76)
    };
    let g = if t <= 66.0 {
        99.470_8 * t.ln() - 161.119_57
    } else {
        288.122_16 * (t - 60.0).powf(-0.075_514_85)
    };
    let b = if t >= 66.0 {
        255.0
    } else if t <= 19.0 {
        0.0
    } else {
        138.517_73 * (t - 10.0).ln() - 305.044_8
    };

    [
        r.clamp(0.0, 255.0) / 255.0,
        g.clamp(0.0, 255.0) / 255.0,
        b.clamp(0.0, 255.0) / 255.0,
    ]
}
