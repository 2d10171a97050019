//! Host pipeline seam
//!
//! Per-camera data the host hands to passes, the draw settings a pass
//! builds, and the [`RenderContext`] trait through which every submission
//! and global shader write goes.
//!
//! [`RecordingContext`] is a headless implementation that keeps every call
//! in order. It backs the demo and the tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::caster::RendererId;
use crate::draw_command::{CommandBuffer, DrawCommand};
use crate::light_extraction::LightData;
use crate::material::{Material, PassIndex};
use crate::pass::custom::PassError;

/// Render queue values at or below this are opaque
pub const OPAQUE_QUEUE_MAX: i32 = 2500;

/// Render queue value of ordinary opaque geometry
pub const GEOMETRY_QUEUE: i32 = 2000;

/// Render queue value of ordinary transparent geometry
pub const TRANSPARENT_QUEUE: i32 = 3000;

/// Inclusive range of render queue values
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderQueueRange {
    /// Lowest queue value included
    pub lower: i32,
    /// Highest queue value included
    pub upper: i32,
}

impl RenderQueueRange {
    /// Opaque and alpha-tested geometry
    pub const OPAQUE: Self = Self {
        lower: 0,
        upper: OPAQUE_QUEUE_MAX,
    };

    /// Transparent geometry
    pub const TRANSPARENT: Self = Self {
        lower: OPAQUE_QUEUE_MAX + 1,
        upper: 5000,
    };

    /// Every queue
    pub const ALL: Self = Self {
        lower: 0,
        upper: 5000,
    };

    /// Check if a queue value falls in the range
    pub fn contains(&self, queue: i32) -> bool {
        queue >= self.lower && queue <= self.upper
    }
}

/// How visible renderers are ordered within a submission
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortingCriteria {
    /// No sorting
    None,
    /// Front-to-back with state batching, the usual opaque order
    #[default]
    CommonOpaque,
    /// Opaque order without front-to-back sorting (GPUs with HSR)
    OptimizeStateChanges,
    /// Back-to-front
    CommonTransparent,
}

/// Attachment format hints
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TextureFormatHint {
    /// RGBA 8-bit unorm
    #[default]
    Rgba8Unorm,
    /// RGBA 16-bit float
    Rgba16Float,
    /// Depth 32-bit float
    Depth32Float,
    /// Depth 24 + Stencil 8
    Depth24Stencil8,
    /// Depth 32-bit float + Stencil 8
    Depth32FloatStencil8,
}

impl TextureFormatHint {
    /// Check if the format carries a stencil aspect
    pub fn has_stencil(&self) -> bool {
        matches!(self, Self::Depth24Stencil8 | Self::Depth32FloatStencil8)
    }
}

/// Name of a shader pass tag renderers are drawn with
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShaderTagId(pub String);

impl ShaderTagId {
    /// Tag of the pipeline's standard forward pass
    pub const UNIVERSAL_FORWARD: &'static str = "UniversalForward";

    /// Create a tag
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Tag name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A renderer that survived culling for the current camera
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisibleRenderer {
    /// Renderer identity
    pub renderer: RendererId,
    /// Render queue of the renderer's material
    pub render_queue: i32,
}

/// Visible renderers for the current camera
#[derive(Clone, Debug, Default)]
pub struct CullingResults {
    /// Renderers in culling order
    pub visible_renderers: Vec<VisibleRenderer>,
}

impl CullingResults {
    /// Create culling results from visible renderers
    pub fn new(visible_renderers: Vec<VisibleRenderer>) -> Self {
        Self { visible_renderers }
    }

    /// Count renderers that pass a filter
    pub fn count_filtered(&self, filtering: &FilteringSettings) -> usize {
        self.visible_renderers
            .iter()
            .filter(|r| filtering.render_queue_range.contains(r.render_queue))
            .count()
    }
}

/// Per-camera data
#[derive(Clone, Debug)]
pub struct CameraData {
    /// Sort order the pipeline uses for opaque geometry
    pub default_opaque_sort: SortingCriteria,
    /// Color target format
    pub color_format: TextureFormatHint,
    /// Depth/stencil target format
    pub depth_stencil_format: TextureFormatHint,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            default_opaque_sort: SortingCriteria::CommonOpaque,
            color_format: TextureFormatHint::Rgba8Unorm,
            depth_stencil_format: TextureFormatHint::Depth24Stencil8,
        }
    }
}

/// Everything a pass receives about the camera being rendered
#[derive(Clone, Debug, Default)]
pub struct RenderingData {
    /// Culling results
    pub culling: CullingResults,
    /// Camera data
    pub camera: CameraData,
    /// Light data
    pub lights: LightData,
}

/// Which renderers a "draw renderers" submission considers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilteringSettings {
    /// Render queue range
    pub render_queue_range: RenderQueueRange,
}

impl FilteringSettings {
    /// Filter on a render queue range
    pub fn new(render_queue_range: RenderQueueRange) -> Self {
        Self { render_queue_range }
    }
}

/// How a "draw renderers" submission draws
#[derive(Clone, Debug)]
pub struct DrawingSettings {
    /// Shader pass tag renderers are drawn with
    pub shader_tag: ShaderTagId,
    /// Sort order
    pub sorting: SortingCriteria,
    /// Material replacing every renderer's own material
    pub override_material: Option<Arc<Material>>,
    /// Pass of the override material to draw with
    pub override_material_pass_index: PassIndex,
}

impl DrawingSettings {
    /// Create drawing settings without a material override
    pub fn new(shader_tag: ShaderTagId, sorting: SortingCriteria) -> Self {
        Self {
            shader_tag,
            sorting,
            override_material: None,
            override_material_pass_index: PassIndex::NOT_FOUND,
        }
    }
}

/// Submission interface of the host pipeline
pub trait RenderContext {
    /// Draw every visible renderer that passes `filtering`
    fn draw_renderers(
        &mut self,
        culling: &CullingResults,
        drawing: &DrawingSettings,
        filtering: &FilteringSettings,
    ) -> Result<(), PassError>;

    /// Schedule a recorded command buffer
    fn execute_command_buffer(&mut self, cmd: &CommandBuffer) -> Result<(), PassError>;

    /// Set a global 4-component shader vector
    fn set_global_vector(&mut self, name: &str, value: [f32; 4]);

    /// Set a global RGBA shader color
    fn set_global_color(&mut self, name: &str, value: [f32; 4]);
}

/// A call captured by [`RecordingContext`]
#[derive(Clone, Debug)]
pub enum Submission {
    /// `draw_renderers` call
    DrawRenderers {
        /// Shader pass tag
        shader_tag: ShaderTagId,
        /// Name of the override material
        override_material: Option<String>,
        /// Override pass index
        pass_index: PassIndex,
        /// Sort order
        sorting: SortingCriteria,
        /// Filter queue range
        render_queue_range: RenderQueueRange,
        /// Renderers that passed the filter
        renderer_count: usize,
    },
    /// `execute_command_buffer` call
    CommandBuffer {
        /// Buffer name
        name: String,
        /// Recorded commands
        commands: Vec<DrawCommand>,
    },
    /// `set_global_vector` call
    GlobalVector {
        /// Global name
        name: String,
        /// Value
        value: [f32; 4],
    },
    /// `set_global_color` call
    GlobalColor {
        /// Global name
        name: String,
        /// Value
        value: [f32; 4],
    },
}

impl Submission {
    /// Check if this is a draw (not a global write)
    pub fn is_draw(&self) -> bool {
        matches!(self, Self::DrawRenderers { .. } | Self::CommandBuffer { .. })
    }
}

/// Headless render context that records every call
#[derive(Debug, Default)]
pub struct RecordingContext {
    submissions: Vec<Submission>,
    vectors: BTreeMap<String, [f32; 4]>,
    colors: BTreeMap<String, [f32; 4]>,
    fail_after: Option<usize>,
}

impl RecordingContext {
    /// Create an empty recording context
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every draw submission after the first `draws` fail
    pub fn fail_after(mut self, draws: usize) -> Self {
        self.fail_after = Some(draws);
        self
    }

    /// All recorded calls in order
    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    /// Recorded draws in order
    pub fn draws(&self) -> impl Iterator<Item = &Submission> {
        self.submissions.iter().filter(|s| s.is_draw())
    }

    /// Number of recorded draws
    pub fn draw_count(&self) -> usize {
        self.draws().count()
    }

    /// Current value of a global vector
    pub fn global_vector(&self, name: &str) -> Option<[f32; 4]> {
        self.vectors.get(name).copied()
    }

    /// Current value of a global color
    pub fn global_color(&self, name: &str) -> Option<[f32; 4]> {
        self.colors.get(name).copied()
    }

    fn check_failure(&self) -> Result<(), PassError> {
        match self.fail_after {
            Some(limit) if self.draw_count() >= limit => Err(PassError::Execute(format!(
                "submission rejected after {} draws",
                limit
            ))),
            _ => Ok(()),
        }
    }
}

impl RenderContext for RecordingContext {
    fn draw_renderers(
        &mut self,
        culling: &CullingResults,
        drawing: &DrawingSettings,
        filtering: &FilteringSettings,
    ) -> Result<(), PassError> {
        self.check_failure()?;
        self.submissions.push(Submission::DrawRenderers {
            shader_tag: drawing.shader_tag.clone(),
            override_material: drawing.override_material.as_ref().map(|m| m.name().to_string()),
            pass_index: drawing.override_material_pass_index,
            sorting: drawing.sorting,
            render_queue_range: filtering.render_queue_range,
            renderer_count: culling.count_filtered(filtering),
        });
        Ok(())
    }

    fn execute_command_buffer(&mut self, cmd: &CommandBuffer) -> Result<(), PassError> {
        self.check_failure()?;
        self.submissions.push(Submission::CommandBuffer {
            name: cmd.name().to_string(),
            commands: cmd.commands().to_vec(),
        });
        Ok(())
    }

    fn set_global_vector(&mut self, name: &str, value: [f32; 4]) {
        self.vectors.insert(name.to_string(), value);
        self.submissions.push(Submission::GlobalVector {
            name: name.to_string(),
            value,
        });
    }

    fn set_global_color(&mut self, name: &str, value: [f32; 4]) {
        self.colors.insert(name.to_string(), value);
        self.submissions.push(Submission::GlobalColor {
            name: name.to_string(),
            value,
        });
    }
}
