//! Stencil Shadow Volume Pass
//!
//! Marks shadowed pixels in the stencil buffer and composites the shadow
//! over the opaque image.
//!
//! # Algorithm
//!
//! Every frame, per camera:
//!
//! 1. Publish the main directional light to `_WorldSpaceLightPos0` /
//!    `_LightColor0`, which the volume shader extrudes along
//! 2. Draw front faces of the volumes, incrementing stencil
//! 3. Draw back faces of the volumes, decrementing stencil
//! 4. Draw the volume composite where stencil is non-zero
//!
//! Steps 2–4 always run in that order: the composite samples the stencil
//! counts the first two steps accumulate.
//!
//! In [`ShadowMode::Global`] each step is one "draw opaque renderers"
//! submission with the technique material overriding every renderer's
//! own. In [`ShadowMode::Object`] only the casters registered with the
//! feature are drawn, one command per renderer material slot, recorded
//! into a pooled command buffer.
//!
//! # Example
//!
//! ```ignore
//! use umbra_render::pass::builtin::{ShadowVolumeFeature, ShadowMode};
//!
//! let mut feature = ShadowVolumeFeature::new(Some(material));
//! feature.set_mode(ShadowMode::Object);
//! registry.register(feature)?;
//! ```

use core::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::caster::{CasterId, ShadowCaster};
use crate::caster_registry::ShadowCasterRegistry;
use crate::context::{
    DrawingSettings, FilteringSettings, RenderContext, RenderQueueRange, ShaderTagId,
};
use crate::draw_command::CommandBuffer;
use crate::error::ShadowError;
use crate::light_extraction::{LightParameters, LightType};
use crate::material::{Material, PassIndex};
use crate::pass::custom::{
    CustomRenderPass, PassConfigData, PassError, PassExecuteContext, PassPriority,
    PassSetupContext, RenderPassEvent,
};

/// Technique pass that increments stencil on volume front faces
pub const FRONT_FACES_PASS: &str = "ShadowVolumeFrontFaces";

/// Technique pass that decrements stencil on volume back faces
pub const BACK_FACES_PASS: &str = "ShadowVolumeBackFaces";

/// Technique pass that composites the shadow where stencil is set
pub const VOLUME_PASS: &str = "ShadowVolumeShadowPass";

/// Name of the command buffer recorded in object mode
pub const COMMAND_BUFFER_NAME: &str = "ShadowVolumePass";

/// Which geometry casts shadow volumes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShadowMode {
    /// Every opaque renderer visible to the camera
    #[default]
    Global,
    /// Only casters registered with the feature
    Object,
}

/// One of the three ordered technique steps
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StencilStep {
    /// Front-face stencil write
    FrontFaces,
    /// Back-face stencil write
    BackFaces,
    /// Shadow composite
    Volume,
}

impl StencilStep {
    /// Submission order
    pub const ORDER: [StencilStep; 3] = [Self::FrontFaces, Self::BackFaces, Self::Volume];

    /// Name of the technique pass implementing this step
    pub fn pass_name(&self) -> &'static str {
        match self {
            Self::FrontFaces => FRONT_FACES_PASS,
            Self::BackFaces => BACK_FACES_PASS,
            Self::Volume => VOLUME_PASS,
        }
    }
}

/// Serializable feature settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowVolumeSettings {
    /// Which geometry casts shadow volumes
    pub mode: ShadowMode,
    /// When in the frame the pass runs
    pub render_pass_event: RenderPassEvent,
    /// Whether the feature runs at all
    pub enabled: bool,
}

impl Default for ShadowVolumeSettings {
    fn default() -> Self {
        Self {
            mode: ShadowMode::Global,
            render_pass_event: RenderPassEvent::AfterRenderingOpaques,
            enabled: true,
        }
    }
}

/// Lifecycle of a [`ShadowVolumePass`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassState {
    /// Created, sub-passes not resolved yet
    Constructed,
    /// Sub-passes resolved, between cameras
    Configured,
    /// Between `on_camera_setup` and `on_camera_cleanup`
    CameraActive,
    /// Torn down with the pipeline
    Disposed,
}

/// What the last `execute` call did
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ShadowVolumeStats {
    /// Mode the frame was drawn in
    pub mode: ShadowMode,
    /// Light parameters published
    pub light: LightParameters,
    /// Submissions made to the render context
    pub submissions: u32,
    /// Draw commands recorded (object mode)
    pub draw_commands: u32,
    /// Steps skipped because their technique pass is missing
    pub skipped_steps: u32,
    /// Configuration errors reported
    pub configuration_errors: u32,
}

/// Per-frame inputs the feature lends to its pass
#[derive(Clone, Copy)]
pub struct ShadowTechnique<'a> {
    /// Name used in configuration errors
    pub owner: &'a str,
    /// Technique material
    pub material: Option<&'a Arc<Material>>,
    /// Shadow mode
    pub mode: ShadowMode,
    /// Casters drawn in object mode
    pub casters: &'a ShadowCasterRegistry,
}

/// The render stage issuing the three stencil steps
#[derive(Debug)]
pub struct ShadowVolumePass {
    state: PassState,
    render_pass_event: RenderPassEvent,
    shader_tag: ShaderTagId,
    front_pass: PassIndex,
    back_pass: PassIndex,
    volume_pass: PassIndex,
    filtering: FilteringSettings,
    warned_missing_steps: bool,
    last_stats: ShadowVolumeStats,
}

impl ShadowVolumePass {
    /// Create an unconfigured pass injected at `render_pass_event`
    pub fn new(render_pass_event: RenderPassEvent) -> Self {
        Self {
            state: PassState::Constructed,
            render_pass_event,
            shader_tag: ShaderTagId::new(ShaderTagId::UNIVERSAL_FORWARD),
            front_pass: PassIndex::NOT_FOUND,
            back_pass: PassIndex::NOT_FOUND,
            volume_pass: PassIndex::NOT_FOUND,
            filtering: FilteringSettings::new(RenderQueueRange::OPAQUE),
            warned_missing_steps: false,
            last_stats: ShadowVolumeStats::default(),
        }
    }

    /// Resolve the technique's sub-passes by name
    ///
    /// A missing material or pass name resolves to [`PassIndex::NOT_FOUND`];
    /// that is reported when drawing, not here.
    pub fn configure(&mut self, material: Option<&Material>) {
        let find = |name: &str| {
            material
                .map(|m| m.find_pass(name))
                .unwrap_or(PassIndex::NOT_FOUND)
        };
        self.front_pass = find(FRONT_FACES_PASS);
        self.back_pass = find(BACK_FACES_PASS);
        self.volume_pass = find(VOLUME_PASS);
        self.filtering = FilteringSettings::new(RenderQueueRange::OPAQUE);
        self.warned_missing_steps = false;
        self.state = PassState::Configured;

        log::debug!(
            "Shadow volume passes resolved: front={} back={} volume={}",
            self.front_pass.0,
            self.back_pass.0,
            self.volume_pass.0
        );
    }

    /// Current lifecycle state
    pub fn state(&self) -> PassState {
        self.state
    }

    /// When in the frame the pass runs
    pub fn render_pass_event(&self) -> RenderPassEvent {
        self.render_pass_event
    }

    /// Resolved index of a step's technique pass
    pub fn pass_index(&self, step: StencilStep) -> PassIndex {
        match step {
            StencilStep::FrontFaces => self.front_pass,
            StencilStep::BackFaces => self.back_pass,
            StencilStep::Volume => self.volume_pass,
        }
    }

    /// Steps with their pass indices, in submission order
    pub fn steps(&self) -> [(StencilStep, PassIndex); 3] {
        StencilStep::ORDER.map(|step| (step, self.pass_index(step)))
    }

    /// Filter used in global mode
    pub fn filtering(&self) -> &FilteringSettings {
        &self.filtering
    }

    /// Statistics of the last `execute`
    pub fn last_stats(&self) -> &ShadowVolumeStats {
        &self.last_stats
    }

    /// Per-camera setup; nothing to prepare
    pub fn on_camera_setup(&mut self) {
        if self.state == PassState::Configured {
            self.state = PassState::CameraActive;
        }
    }

    /// Record the shadow volume steps for the current camera
    pub fn execute(
        &mut self,
        technique: ShadowTechnique<'_>,
        context: &mut dyn RenderContext,
        frame: &PassExecuteContext<'_>,
    ) -> Result<ShadowVolumeStats, ShadowError> {
        match self.state {
            PassState::Constructed => return Err(ShadowError::InvalidState("not configured")),
            PassState::Disposed => return Err(ShadowError::InvalidState("disposed")),
            PassState::Configured | PassState::CameraActive => {}
        }

        self.last_stats = ShadowVolumeStats {
            mode: technique.mode,
            ..Default::default()
        };

        let Some(material) = technique.material else {
            self.last_stats.configuration_errors = 1;
            return Err(ShadowError::MissingMaterial {
                feature: technique.owner.to_string(),
            });
        };

        let lights = &frame.rendering.lights;
        if let Some(light) = lights.main_light() {
            if light.light_type != LightType::Directional {
                log::debug!(
                    "Main light is {:?}; shadow volumes only follow directional lights",
                    light.light_type
                );
            }
        }
        let light = LightParameters::derive(lights);
        light.publish(context);
        self.last_stats.light = light;

        match technique.mode {
            ShadowMode::Global => self.draw_opaque(material, context, frame)?,
            ShadowMode::Object => self.draw_casters(material, technique.casters, context, frame)?,
        }

        log::trace!(
            "Shadow volumes frame {}: {} submissions, {} draw commands",
            frame.frame,
            self.last_stats.submissions,
            self.last_stats.draw_commands
        );
        Ok(self.last_stats)
    }

    /// Per-camera cleanup; nothing to release
    pub fn on_camera_cleanup(&mut self) {
        if self.state == PassState::CameraActive {
            self.state = PassState::Configured;
        }
    }

    /// Tear the pass down with the pipeline
    pub fn dispose(&mut self) {
        self.state = PassState::Disposed;
    }

    fn draw_opaque(
        &mut self,
        material: &Arc<Material>,
        context: &mut dyn RenderContext,
        frame: &PassExecuteContext<'_>,
    ) -> Result<(), ShadowError> {
        let rendering = frame.rendering;
        let mut drawing =
            DrawingSettings::new(self.shader_tag.clone(), rendering.camera.default_opaque_sort);
        drawing.override_material = Some(Arc::clone(material));

        for (step, pass) in self.steps() {
            if !pass.is_resolved() {
                self.skip_step(step, material);
                continue;
            }
            drawing.override_material_pass_index = pass;
            context.draw_renderers(&rendering.culling, &drawing, &self.filtering)?;
            self.last_stats.submissions += 1;
        }
        Ok(())
    }

    fn draw_casters(
        &mut self,
        material: &Arc<Material>,
        casters: &ShadowCasterRegistry,
        context: &mut dyn RenderContext,
        frame: &PassExecuteContext<'_>,
    ) -> Result<(), ShadowError> {
        let casters = casters.snapshot();
        let mut cmd = frame.command_buffers.get(COMMAND_BUFFER_NAME);

        for (step, pass) in self.steps() {
            if !pass.is_resolved() {
                self.skip_step(step, material);
                continue;
            }
            record_caster_draws(&mut cmd, &casters, material, pass);
        }

        self.last_stats.draw_commands = u32::try_from(cmd.len()).unwrap_or(u32::MAX);
        context.execute_command_buffer(&cmd)?;
        self.last_stats.submissions += 1;
        Ok(())
    }

    fn skip_step(&mut self, step: StencilStep, material: &Material) {
        self.last_stats.skipped_steps += 1;
        if !self.warned_missing_steps {
            log::warn!(
                "Material '{}' has no '{}' pass; skipping that shadow volume step",
                material.name(),
                step.pass_name()
            );
            self.warned_missing_steps = true;
        }
    }
}

/// One command per (renderer, material slot) of every live caster renderer
fn record_caster_draws(
    cmd: &mut CommandBuffer,
    casters: &[Arc<ShadowCaster>],
    material: &Arc<Material>,
    pass: PassIndex,
) {
    for renderer in casters.iter().flat_map(|c| c.renderers()).flatten() {
        for slot in 0..renderer.material_slots() {
            cmd.draw_renderer(renderer.id(), material, slot, pass);
        }
    }
}

/// Render feature owning the technique configuration and caster registry
pub struct ShadowVolumeFeature {
    settings: ShadowVolumeSettings,
    priority: PassPriority,
    material: Option<Arc<Material>>,
    casters: ShadowCasterRegistry,
    pass: ShadowVolumePass,
}

impl ShadowVolumeFeature {
    /// Registry name of the feature
    pub const NAME: &'static str = "shadow_volume";

    /// Create a feature with default settings
    pub fn new(material: Option<Arc<Material>>) -> Self {
        Self::with_settings(material, ShadowVolumeSettings::default())
    }

    /// Create with full settings
    pub fn with_settings(material: Option<Arc<Material>>, settings: ShadowVolumeSettings) -> Self {
        Self {
            pass: ShadowVolumePass::new(settings.render_pass_event),
            settings,
            priority: PassPriority::NORMAL,
            material,
            casters: ShadowCasterRegistry::new(),
        }
    }

    /// Rebuild the pass from the current settings and material
    pub fn create(&mut self) {
        self.pass = ShadowVolumePass::new(self.settings.render_pass_event);
        self.pass.configure(self.material.as_deref());
    }

    /// Technique material
    pub fn material(&self) -> Option<&Arc<Material>> {
        self.material.as_ref()
    }

    /// Assign the technique material, re-resolving its sub-passes
    pub fn set_material(&mut self, material: Option<Arc<Material>>) {
        self.material = material;
        self.create();
    }

    /// Current settings
    pub fn settings(&self) -> &ShadowVolumeSettings {
        &self.settings
    }

    /// Shadow mode
    pub fn mode(&self) -> ShadowMode {
        self.settings.mode
    }

    /// Switch shadow mode
    pub fn set_mode(&mut self, mode: ShadowMode) {
        self.settings.mode = mode;
    }

    /// Move the pass to another point of the frame
    pub fn set_render_pass_event(&mut self, event: RenderPassEvent) {
        self.settings.render_pass_event = event;
        self.create();
    }

    /// Opt a caster into object-mode shadows
    pub fn register_object(&mut self, caster: &Arc<ShadowCaster>) -> bool {
        self.casters.register(caster)
    }

    /// Opt a caster out of object-mode shadows
    pub fn unregister_object(&mut self, id: CasterId) -> bool {
        self.casters.unregister(id)
    }

    /// Registered casters
    pub fn casters(&self) -> &ShadowCasterRegistry {
        &self.casters
    }

    /// The render stage
    pub fn pass(&self) -> &ShadowVolumePass {
        &self.pass
    }
}

impl CustomRenderPass for ShadowVolumeFeature {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn render_pass_event(&self) -> RenderPassEvent {
        self.settings.render_pass_event
    }

    fn priority(&self) -> PassPriority {
        self.priority
    }

    fn setup(&mut self, context: &PassSetupContext) -> Result<(), PassError> {
        if !context.depth_stencil_format.has_stencil() {
            log::warn!(
                "Depth target format {:?} has no stencil; shadow volumes will not mask",
                context.depth_stencil_format
            );
        }
        self.create();
        Ok(())
    }

    fn on_camera_setup(&mut self, _frame: &PassExecuteContext<'_>) {
        self.pass.on_camera_setup();
    }

    fn execute(
        &mut self,
        context: &mut dyn RenderContext,
        frame: &PassExecuteContext<'_>,
    ) -> Result<(), PassError> {
        // casters dropped without unregistering
        self.casters.prune();

        let technique = ShadowTechnique {
            owner: "ShadowVolumeFeature",
            material: self.material.as_ref(),
            mode: self.settings.mode,
            casters: &self.casters,
        };

        match self.pass.execute(technique, context, frame) {
            Ok(_) => Ok(()),
            Err(err @ ShadowError::MissingMaterial { .. }) => {
                // Skip this frame; picked up again once a material is assigned
                log::error!("{}", err);
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn on_camera_cleanup(&mut self, _frame: &PassExecuteContext<'_>) {
        self.pass.on_camera_cleanup();
    }

    fn cleanup(&mut self) {
        self.pass.dispose();
    }

    fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.settings.enabled = enabled;
    }

    fn get_config(&self) -> Option<PassConfigData> {
        Some(PassConfigData {
            name: Self::NAME.to_string(),
            enabled: self.settings.enabled,
            priority: self.priority().0,
            config: serde_json::to_value(&self.settings).unwrap_or_default(),
        })
    }

    fn apply_config(&mut self, config: &PassConfigData) -> Result<(), PassError> {
        let mut settings: ShadowVolumeSettings = if config.config.is_null() {
            self.settings.clone()
        } else {
            serde_json::from_value(config.config.clone())
                .map_err(|e| PassError::Config(format!("{}: {}", Self::NAME, e)))?
        };
        settings.enabled = config.enabled;
        self.priority = PassPriority(config.priority);

        let rebuild = settings.render_pass_event != self.settings.render_pass_event;
        self.settings = settings;
        if rebuild {
            self.create();
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
