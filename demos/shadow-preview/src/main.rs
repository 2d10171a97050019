//! Headless shadow volume preview
//!
//! Builds a small scene, runs one frame in each shadow mode through the
//! recording backend and logs what the feature submitted.
//!
//! Usage: cargo run -p shadow-preview [optional-settings.json]
//!
//! The settings file holds a serialized `ShadowVolumeSettings`, e.g.
//! `{ "mode": "Object", "render_pass_event": "AfterRenderingSkybox" }`.

use std::error::Error;
use std::sync::Arc;

use glam::{Quat, Vec3};

use umbra_render::light_extraction::resolve_final_color;
use umbra_render::pass::builtin::{BACK_FACES_PASS, FRONT_FACES_PASS, VOLUME_PASS};
use umbra_render::prelude::*;
use umbra_render::{
    CullingResults, LightParameters, LightType, ShadowVolumeSettings, Submission, VisibleRenderer,
};

fn load_settings() -> Result<ShadowVolumeSettings, Box<dyn Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading settings from {}", path);
            let text = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(ShadowVolumeSettings::default()),
    }
}

fn build_rendering(renderers: &[Arc<MeshRenderer>]) -> RenderingData {
    // Late afternoon sun, 45 degrees below the horizon
    let sun = VisibleLight::from_transform(
        LightType::Directional,
        Quat::from_rotation_x(core::f32::consts::FRAC_PI_4),
        Vec3::new(0.0, 10.0, 0.0),
        resolve_final_color([1.0, 1.0, 1.0], 1.2, Some(4500.0)),
    );

    RenderingData {
        culling: CullingResults::new(
            renderers
                .iter()
                .map(|r| VisibleRenderer {
                    renderer: r.id(),
                    render_queue: 2000,
                })
                .collect(),
        ),
        lights: LightData::new(0, vec![sun]),
        ..Default::default()
    }
}

fn log_frame(context: &RecordingContext) {
    for submission in context.submissions() {
        match submission {
            Submission::GlobalVector { name, value } | Submission::GlobalColor { name, value } => {
                log::info!("  set {} = {:?}", name, value);
            }
            Submission::DrawRenderers {
                pass_index,
                renderer_count,
                ..
            } => {
                log::info!(
                    "  draw opaque renderers: pass {} over {} renderers",
                    pass_index.0,
                    renderer_count
                );
            }
            Submission::CommandBuffer { name, commands } => {
                log::info!("  command buffer '{}': {} draws", name, commands.len());
                for command in commands {
                    log::debug!(
                        "    {} slot {} pass {}",
                        command.renderer_id(),
                        command.submesh_index(),
                        command.shader_pass().0
                    );
                }
            }
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = load_settings()?;
    let first_mode = settings.mode;

    let material = Arc::new(Material::new(
        "ZPStencilShadow/ShadowVolume",
        vec![
            FRONT_FACES_PASS.to_string(),
            BACK_FACES_PASS.to_string(),
            VOLUME_PASS.to_string(),
        ],
    ));

    let mut registry = PassRegistry::new();
    registry.register(ShadowVolumeFeature::with_settings(Some(material), settings))?;

    // A crate (one slot), a lamp post (two slots) and a tree (trunk + leaves)
    let renderers: Vec<_> = [1u32, 2, 1, 1]
        .iter()
        .enumerate()
        .map(|(i, slots)| Arc::new(MeshRenderer::new(RendererId(i as u64 + 1), *slots)))
        .collect();
    let mut bindings = vec![
        ShadowCasterBinding::new(&renderers[0..1]),
        ShadowCasterBinding::new(&renderers[1..2]),
        ShadowCasterBinding::new(&renderers[2..4]),
    ];
    for binding in &mut bindings {
        binding.on_enable(Some(&mut registry))?;
    }

    let rendering = build_rendering(&renderers);
    let pool = CommandBufferPool::new();

    let second_mode = match first_mode {
        ShadowMode::Global => ShadowMode::Object,
        ShadowMode::Object => ShadowMode::Global,
    };

    log::info!("");
    log::info!("=== Shadow Volume Preview ===");

    for (frame_number, mode) in [first_mode, second_mode].into_iter().enumerate() {
        if let Some(feature) = registry.find_feature_mut::<ShadowVolumeFeature>() {
            feature.set_mode(mode);
        }

        let mut context = RecordingContext::new();
        let frame = PassExecuteContext::new(&rendering, &pool, frame_number as u64);
        registry.execute_camera(&mut context, &frame)?;

        log::info!("Frame {} ({:?} mode):", frame_number, mode);
        log_frame(&context);

        if let Some(feature) = registry.find_feature::<ShadowVolumeFeature>() {
            let stats = feature.pass().last_stats();
            log::info!(
                "  {} submissions, {} draw commands, {} skipped steps",
                stats.submissions,
                stats.draw_commands,
                stats.skipped_steps
            );
        }
    }

    let uniform = LightParameters::derive(&rendering.lights).to_uniform();
    log::info!(
        "Light uniform block: {} bytes",
        bytemuck::bytes_of(&uniform).len()
    );

    let pool_stats = pool.stats();
    log::info!(
        "Command buffers: {} acquired, {} released, {} pooled",
        pool_stats.acquired,
        pool_stats.released,
        pool_stats.pooled
    );

    for binding in &mut bindings {
        binding.on_disable(Some(&mut registry))?;
    }
    registry.cleanup_all();

    Ok(())
}
