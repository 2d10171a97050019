//! Whole frames driven through the pass registry

use std::sync::Arc;

use glam::{Quat, Vec3};
use umbra_render::pass::builtin::{BACK_FACES_PASS, FRONT_FACES_PASS, VOLUME_PASS};
use umbra_render::prelude::*;
use umbra_render::{
    CullingResults, LightType, PassConfigData, PassError, PassPriority, Submission,
    VisibleRenderer, LIGHT_COLOR_GLOBAL, LIGHT_POSITION_GLOBAL,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn technique() -> Arc<Material> {
    Arc::new(Material::new(
        "ZPStencilShadow/ShadowVolume",
        vec![
            FRONT_FACES_PASS.to_string(),
            BACK_FACES_PASS.to_string(),
            VOLUME_PASS.to_string(),
        ],
    ))
}

fn scene(main_light_index: i32) -> RenderingData {
    let sun = VisibleLight::from_transform(
        LightType::Directional,
        Quat::from_rotation_x(core::f32::consts::FRAC_PI_2),
        Vec3::ZERO,
        [1.0, 0.95, 0.9, 1.0],
    );
    RenderingData {
        culling: CullingResults::new(
            (0..4)
                .map(|i| VisibleRenderer {
                    renderer: RendererId(i),
                    render_queue: 2000,
                })
                .collect(),
        ),
        lights: LightData::new(main_light_index, vec![sun]),
        ..Default::default()
    }
}

fn frame(
    registry: &mut PassRegistry,
    rendering: &RenderingData,
    pool: &CommandBufferPool,
    number: u64,
) -> (RecordingContext, Result<(), PassError>) {
    let mut context = RecordingContext::new();
    let execute = PassExecuteContext::new(rendering, pool, number);
    let result = registry.execute_camera(&mut context, &execute);
    (context, result)
}

#[test]
fn global_mode_frame() {
    init_logging();
    let mut registry = PassRegistry::new();
    registry
        .register(ShadowVolumeFeature::new(Some(technique())))
        .unwrap();

    let pool = CommandBufferPool::new();
    let (context, result) = frame(&mut registry, &scene(0), &pool, 1);
    assert!(result.is_ok());
    assert_eq!(context.draw_count(), 3);

    let position = context.global_vector(LIGHT_POSITION_GLOBAL).unwrap();
    assert!((position[1] + 1.0).abs() < 1e-5);
    assert_eq!(position[3], 0.0);
    assert_eq!(context.global_color(LIGHT_COLOR_GLOBAL), Some([1.0, 0.95, 0.9, 1.0]));
}

#[test]
fn object_mode_frame_with_bindings() {
    init_logging();
    let mut registry = PassRegistry::new();
    let mut feature = ShadowVolumeFeature::new(Some(technique()));
    feature.set_mode(ShadowMode::Object);
    registry.register(feature).unwrap();

    let renderers: Vec<_> = (1..=3)
        .map(|i| Arc::new(MeshRenderer::new(RendererId(i), i as u32)))
        .collect();
    let mut rock = ShadowCasterBinding::new(&renderers[..1]);
    let mut tree = ShadowCasterBinding::new(&renderers[1..]);
    rock.on_enable(Some(&mut registry)).unwrap();
    tree.on_enable(Some(&mut registry)).unwrap();

    let pool = CommandBufferPool::new();
    let (context, result) = frame(&mut registry, &scene(0), &pool, 1);
    assert!(result.is_ok());

    let buffers: Vec<_> = context
        .draws()
        .filter_map(|s| match s {
            Submission::CommandBuffer { commands, .. } => Some(commands.len()),
            _ => None,
        })
        .collect();
    // 3 steps x (1 + 2 + 3) slots
    assert_eq!(buffers, vec![18]);

    tree.on_disable(Some(&mut registry)).unwrap();
    let (context, _) = frame(&mut registry, &scene(0), &pool, 2);
    let Some(Submission::CommandBuffer { commands, .. }) = context.draws().next() else {
        panic!("expected a command buffer");
    };
    assert_eq!(commands.len(), 3);

    let stats = pool.stats();
    assert_eq!(stats.acquired, 2);
    assert_eq!(stats.in_use(), 0);
}

#[test]
fn missing_light_still_draws_with_zeroed_globals() {
    init_logging();
    let mut registry = PassRegistry::new();
    registry
        .register(ShadowVolumeFeature::new(Some(technique())))
        .unwrap();

    let pool = CommandBufferPool::new();
    let (context, result) = frame(&mut registry, &scene(-1), &pool, 1);
    assert!(result.is_ok());
    assert_eq!(context.draw_count(), 3);
    assert_eq!(context.global_vector(LIGHT_POSITION_GLOBAL), Some([0.0; 4]));
    assert_eq!(context.global_color(LIGHT_COLOR_GLOBAL), Some([0.0; 4]));
}

#[test]
fn missing_material_never_disables_feature() {
    init_logging();
    let mut registry = PassRegistry::new();
    registry.register(ShadowVolumeFeature::new(None)).unwrap();

    let pool = CommandBufferPool::new();
    for number in 0..5 {
        let (context, result) = frame(&mut registry, &scene(0), &pool, number);
        assert!(result.is_ok());
        assert_eq!(context.draw_count(), 0);
    }
    assert!(!registry.is_pass_disabled(ShadowVolumeFeature::NAME));

    registry
        .find_feature_mut::<ShadowVolumeFeature>()
        .unwrap()
        .set_material(Some(technique()));
    let (context, _) = frame(&mut registry, &scene(0), &pool, 5);
    assert_eq!(context.draw_count(), 3);
}

#[test]
fn failing_backend_disables_feature_after_repeated_failures() {
    init_logging();
    let mut registry = PassRegistry::new();
    let mut feature = ShadowVolumeFeature::new(Some(technique()));
    feature.set_mode(ShadowMode::Object);
    registry.register(feature).unwrap();

    let pool = CommandBufferPool::new();
    let rendering = scene(0);
    for number in 0..3 {
        let mut context = RecordingContext::new().fail_after(0);
        let execute = PassExecuteContext::new(&rendering, &pool, number);
        let result = registry.execute_camera(&mut context, &execute);
        assert!(matches!(result, Err(PassError::PartialFailure(_))));
    }

    assert!(registry.is_pass_disabled(ShadowVolumeFeature::NAME));
    let stats = pool.stats();
    assert_eq!(stats.acquired, 3);
    assert_eq!(stats.released, 3);

    registry.reset_failure_state(ShadowVolumeFeature::NAME);
    let (context, result) = frame(&mut registry, &scene(0), &pool, 3);
    assert!(result.is_ok());
    assert_eq!(context.draw_count(), 1);
}

#[test]
fn hot_reload_switches_mode() {
    init_logging();
    let mut registry = PassRegistry::new();
    registry
        .register(ShadowVolumeFeature::new(Some(technique())))
        .unwrap();

    let config = PassConfigData {
        name: ShadowVolumeFeature::NAME.to_string(),
        enabled: true,
        priority: 0,
        config: serde_json::json!({ "mode": "Object" }),
    };
    registry
        .apply_config(ShadowVolumeFeature::NAME, &config)
        .unwrap();

    let pool = CommandBufferPool::new();
    let (context, _) = frame(&mut registry, &scene(0), &pool, 1);
    assert!(matches!(
        context.draws().next(),
        Some(Submission::CommandBuffer { .. })
    ));

    let state = registry.get_state();
    assert_eq!(state.configs[0].config["mode"], "Object");
}

#[test]
fn configured_priority_survives_state_roundtrip() {
    init_logging();
    let mut registry = PassRegistry::new();
    registry
        .register(ShadowVolumeFeature::new(Some(technique())))
        .unwrap();

    let mut config = registry.get_state().configs[0].clone();
    config.priority = PassPriority::EARLY.0;
    registry
        .apply_config(ShadowVolumeFeature::NAME, &config)
        .unwrap();

    let state = registry.get_state();
    assert_eq!(state.configs[0].priority, -100);

    let mut fresh = PassRegistry::new();
    fresh
        .register(ShadowVolumeFeature::new(Some(technique())))
        .unwrap();
    fresh.restore_state(&state).unwrap();
    let feature = fresh.find_feature::<ShadowVolumeFeature>().unwrap();
    assert_eq!(feature.priority(), PassPriority::EARLY);
}

#[test]
fn dropped_bindings_leave_no_casters_behind() {
    init_logging();
    let mut registry = PassRegistry::new();
    let mut feature = ShadowVolumeFeature::new(Some(technique()));
    feature.set_mode(ShadowMode::Object);
    registry.register(feature).unwrap();

    let renderers: Vec<_> = (1..=2)
        .map(|i| Arc::new(MeshRenderer::new(RendererId(i), 1)))
        .collect();
    for renderer in &renderers {
        // dropped at the end of the iteration without on_disable
        let mut binding = ShadowCasterBinding::new(std::slice::from_ref(renderer));
        binding.on_enable(Some(&mut registry)).unwrap();
    }

    let pool = CommandBufferPool::new();
    let (context, result) = frame(&mut registry, &scene(0), &pool, 1);
    assert!(result.is_ok());
    let Some(Submission::CommandBuffer { commands, .. }) = context.draws().next() else {
        panic!("expected a command buffer");
    };
    assert!(commands.is_empty());

    let feature = registry.find_feature::<ShadowVolumeFeature>().unwrap();
    assert!(feature.casters().is_empty());
}
