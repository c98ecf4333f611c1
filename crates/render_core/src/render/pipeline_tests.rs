//! Frame-level tests of the scene pipeline

use crate::config::{ConfigError, PipelineConfig, SplitSchemeConfig};
use crate::culling::BoundingSphere;
use crate::foundation::math::{Transform, Vec3};
use crate::render::{
    Cascade, CascadePartitioner, DrawList, DrawSubmitter, IterativeSplit, PassKind, PassView, ScenePipeline, ShadowCaster,
};
use crate::scene::{BindHandle, BlendMode, Camera, DirectionalLight, Entity, Model, RenderFlags, Scene, Submesh, Viewport};
use crate::{CascadeError, PipelineError};

fn camera() -> Camera {
    let mut camera = Camera::perspective(Vec3::new(0.0, 5.0, 20.0), 60.0, 1.0, 0.1, 200.0);
    camera.set_target(Vec3::zeros());
    camera.set_max_shadow_distance(50.0);
    camera
}

fn model() -> Model {
    Model::new(
        BoundingSphere::new(Vec3::zeros(), 1.0),
        vec![
            Submesh::opaque(BindHandle(1)),
            Submesh::blended(BlendMode::Additive, BindHandle(2)),
        ],
    )
}

struct Fixture {
    scene: Scene,
    camera: Entity,
}

impl Fixture {
    fn new() -> Self {
        let mut scene = Scene::new();
        scene.set_sunlight(DirectionalLight::default());
        let entity = scene.create_entity(Transform::identity());
        scene.set_camera(entity, camera());
        Self { scene, camera: entity }
    }

    fn spawn(&mut self, position: Vec3, model: Model) -> Entity {
        let e = self.scene.create_entity(Transform::from_position(position));
        self.scene.set_model(e, model);
        e
    }

    fn camera_mut(&mut self) -> &mut Camera {
        self.scene.camera_mut(self.camera).unwrap()
    }
}

fn entities(list: &DrawList) -> Vec<Entity> {
    let mut out: Vec<Entity> = list.items().iter().map(|i| i.entity).collect();
    out.sort();
    out.dedup();
    out
}

fn final_list<'a>(pipeline: &'a ScenePipeline, f: &Fixture) -> &'a DrawList {
    pipeline.draw_list_for(&f.scene, f.camera, PassKind::Final).unwrap()
}

#[test]
fn test_degenerate_entities_never_drawn() {
    let mut f = Fixture::new();
    f.camera_mut().reflection_enabled = true;
    let visible = f.spawn(Vec3::new(0.0, 1.0, 0.0), model());
    let flat = f.scene.create_entity(
        Transform::from_position(Vec3::new(2.0, 1.0, 0.0)).with_scale(Vec3::new(1.0, 1.0, 0.0)),
    );
    f.scene.set_model(flat, model());
    let child = f
        .scene
        .create_child(flat, Transform::from_position(Vec3::new(0.0, 1.0, 0.0)))
        .unwrap();
    f.scene.set_model(child, model());

    let mut pipeline = ScenePipeline::new(PipelineConfig::default()).unwrap();
    pipeline.simulate(&mut f.scene).unwrap();

    let index = f.scene.camera(f.camera).unwrap().draw_list_index().unwrap();
    for kind in [PassKind::Final, PassKind::Reflection] {
        assert_eq!(entities(pipeline.draw_list(index, kind).unwrap()), vec![visible]);
    }
    let cascades = pipeline.cascades(index).len();
    assert_eq!(cascades, 3);
    for cascade in 0..cascades {
        assert!(pipeline
            .casters(index, cascade)
            .iter()
            .all(|c| c.entity != flat && c.entity != child));
    }
}

#[test]
fn test_final_list_order() {
    let mut f = Fixture::new();
    let near = f.spawn(Vec3::new(0.0, 0.0, 10.0), model());
    let far = f.spawn(Vec3::new(0.0, 0.0, -10.0), model());
    let middle = f.spawn(Vec3::new(0.0, 0.0, 0.0), model());

    let mut pipeline = ScenePipeline::new(PipelineConfig::default()).unwrap();
    pipeline.simulate(&mut f.scene).unwrap();

    let order: Vec<(Entity, bool)> = final_list(&pipeline, &f)
        .items()
        .iter()
        .map(|i| (i.entity, i.is_transparent()))
        .collect();
    assert_eq!(
        order,
        vec![
            (near, false),
            (middle, false),
            (far, false),
            (far, true),
            (middle, true),
            (near, true),
        ]
    );
    assert!(final_list(&pipeline, &f)
        .items()
        .windows(2)
        .all(|w| w[0].sort_key <= w[1].sort_key));
}

#[test]
fn test_frustum_culling_toggle() {
    let mut f = Fixture::new();
    let inside = f.spawn(Vec3::zeros(), model());
    let outside = f.spawn(Vec3::new(500.0, 0.0, 0.0), model());

    let mut pipeline = ScenePipeline::new(PipelineConfig::default()).unwrap();
    pipeline.simulate(&mut f.scene).unwrap();
    assert_eq!(entities(final_list(&pipeline, &f)), vec![inside]);

    let mut config = PipelineConfig::default();
    config.culling.enable_frustum_culling = false;
    let mut pipeline = ScenePipeline::new(config).unwrap();
    pipeline.simulate(&mut f.scene).unwrap();

    let mut both = vec![inside, outside];
    both.sort();
    assert_eq!(entities(final_list(&pipeline, &f)), both);
}

#[test]
fn test_render_flags_and_reflection_mask() {
    let mut f = Fixture::new();
    f.camera_mut().reflection_enabled = true;
    f.camera_mut().render_flags = RenderFlags::DEFAULT | RenderFlags::REFLECTION_HIDDEN;

    let rock = f.spawn(Vec3::new(0.0, 1.0, 0.0), model());
    let water = f.spawn(
        Vec3::zeros(),
        model().with_render_flags(RenderFlags::REFLECTION_HIDDEN),
    );
    let overlay = f.spawn(
        Vec3::new(-1.0, 1.0, 0.0),
        model().with_render_flags(RenderFlags::SECONDARY),
    );

    let mut pipeline = ScenePipeline::new(PipelineConfig::default()).unwrap();
    pipeline.simulate(&mut f.scene).unwrap();

    let final_entities = entities(final_list(&pipeline, &f));
    assert!(final_entities.contains(&rock));
    assert!(final_entities.contains(&water));
    assert!(!final_entities.contains(&overlay));

    let reflection = pipeline
        .draw_list_for(&f.scene, f.camera, PassKind::Reflection)
        .unwrap();
    assert_eq!(entities(reflection), vec![rock]);
    assert_eq!(pipeline.stats().reflection_entities, 1);
}

#[test]
fn test_hidden_models_skip_every_pass() {
    let mut f = Fixture::new();
    let shown = f.spawn(Vec3::zeros(), model());
    let hidden = f.spawn(Vec3::new(1.0, 0.0, 0.0), model());
    f.scene.model_mut(hidden).unwrap().set_hidden(true);

    let mut pipeline = ScenePipeline::new(PipelineConfig::default()).unwrap();
    pipeline.simulate(&mut f.scene).unwrap();

    assert_eq!(entities(final_list(&pipeline, &f)), vec![shown]);
    let index = f.scene.camera(f.camera).unwrap().draw_list_index().unwrap();
    for cascade in 0..pipeline.cascades(index).len() {
        assert!(pipeline.casters(index, cascade).iter().all(|c| c.entity != hidden));
    }
}

#[test]
fn test_draw_list_indices_are_stable() {
    let mut f = Fixture::new();
    let second = f.scene.create_entity(Transform::identity());
    f.scene.set_camera(second, camera());

    let mut pipeline = ScenePipeline::new(PipelineConfig::default()).unwrap();
    pipeline.simulate(&mut f.scene).unwrap();

    let first_index = f.scene.camera(f.camera).unwrap().draw_list_index();
    let second_index = f.scene.camera(second).unwrap().draw_list_index();
    assert_eq!(first_index, Some(0));
    assert_eq!(second_index, Some(1));

    f.scene.camera_mut(f.camera).unwrap().active = false;
    pipeline.simulate(&mut f.scene).unwrap();
    f.scene.camera_mut(f.camera).unwrap().active = true;
    pipeline.simulate(&mut f.scene).unwrap();

    assert_eq!(f.scene.camera(f.camera).unwrap().draw_list_index(), first_index);
    assert_eq!(f.scene.camera(second).unwrap().draw_list_index(), second_index);
    assert_eq!(pipeline.camera_slot_count(), 2);
}

#[test]
fn test_cloned_camera_gets_own_slot() {
    let mut f = Fixture::new();
    let mut pipeline = ScenePipeline::new(PipelineConfig::default()).unwrap();
    pipeline.simulate(&mut f.scene).unwrap();

    let copy = f.scene.camera(f.camera).unwrap().clone();
    let twin = f.scene.create_entity(Transform::identity());
    f.scene.set_camera(twin, copy);
    pipeline.simulate(&mut f.scene).unwrap();

    assert_ne!(
        f.scene.camera(f.camera).unwrap().draw_list_index(),
        f.scene.camera(twin).unwrap().draw_list_index()
    );
    assert_eq!(pipeline.camera_slot_count(), 2);
}

#[test]
fn test_cascades_reused_between_recomputes() {
    let mut f = Fixture::new();
    f.spawn(Vec3::zeros(), model());

    let mut config = PipelineConfig::default();
    config.shadows.recompute_interval = 3;
    let mut pipeline = ScenePipeline::new(config).unwrap();

    let mut recomputed = Vec::new();
    for _ in 0..4 {
        pipeline.simulate(&mut f.scene).unwrap();
        recomputed.push(pipeline.stats().cascades_recomputed);
        assert_eq!(pipeline.stats().cascades, 3);
    }
    assert_eq!(recomputed, vec![1, 0, 0, 1]);

    let before = pipeline.cascades(0).to_vec();
    f.camera_mut().set_position(Vec3::new(3.0, 5.0, 20.0));
    pipeline.simulate(&mut f.scene).unwrap();
    assert_eq!(pipeline.stats().cascades_recomputed, 1);
    assert_ne!(pipeline.cascades(0), before.as_slice());
}

#[test]
fn test_shadows_disabled() {
    let mut f = Fixture::new();
    f.spawn(Vec3::zeros(), model());
    f.camera_mut().shadows_enabled = false;

    let mut pipeline = ScenePipeline::new(PipelineConfig::default()).unwrap();
    pipeline.simulate(&mut f.scene).unwrap();
    assert!(pipeline.cascades(0).is_empty());

    f.camera_mut().shadows_enabled = true;
    f.scene.set_sunlight(DirectionalLight {
        cast_shadows: false,
        ..DirectionalLight::default()
    });
    pipeline.simulate(&mut f.scene).unwrap();
    assert!(pipeline.cascades(0).is_empty());
}

#[test]
fn test_invalid_camera_is_rejected() {
    let mut f = Fixture::new();
    f.camera_mut().near = -1.0;

    let mut pipeline = ScenePipeline::new(PipelineConfig::default()).unwrap();
    assert!(matches!(
        pipeline.simulate(&mut f.scene),
        Err(PipelineError::InvalidCamera { .. })
    ));
    assert_eq!(pipeline.frame(), 0);
}

#[test]
fn test_invalid_shadow_config_is_rejected() {
    let mut config = PipelineConfig::default();
    config.shadows.cascade_count = 0;
    assert!(matches!(ScenePipeline::new(config), Err(ConfigError::Invalid(_))));

    let mut config = PipelineConfig::default();
    config.shadows.split_scheme = SplitSchemeConfig::Iterative { ratio: 1.0 };
    assert!(matches!(ScenePipeline::new(config), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_flat_splits_fail_before_any_draw_list() {
    let mut f = Fixture::new();
    f.spawn(Vec3::zeros(), model());

    let mut pipeline = ScenePipeline::new(PipelineConfig::default())
        .unwrap()
        .with_partitioner(CascadePartitioner::new(Box::new(IterativeSplit { ratio: 1.0 }), 2.0, 10.0));
    assert!(matches!(
        pipeline.simulate(&mut f.scene),
        Err(PipelineError::Cascade(CascadeError::NonIncreasingSplit { .. }))
    ));
    assert_eq!(pipeline.frame(), 0);
    assert_eq!(pipeline.camera_slot_count(), 0);
}

#[test]
fn test_cascade_splits_increase() {
    let mut f = Fixture::new();
    f.spawn(Vec3::zeros(), model());

    let mut config = PipelineConfig::default();
    config.shadows.cascade_count = 4;
    let mut pipeline = ScenePipeline::new(config).unwrap();
    pipeline.simulate(&mut f.scene).unwrap();

    let fars: Vec<f32> = pipeline.cascades(0).iter().map(|c| c.split_far).collect();
    assert_eq!(fars.len(), 4);
    assert!(fars.windows(2).all(|w| w[0] < w[1]), "{fars:?}");
}

#[derive(Default)]
struct Recorder {
    events: Vec<String>,
}

impl DrawSubmitter for Recorder {
    fn begin_camera(&mut self, camera_index: usize, _viewport: &Viewport) {
        self.events.push(format!("camera {camera_index}"));
    }

    fn draw_shadow_cascade(&mut self, _scene: &Scene, cascade_index: usize, _cascade: &Cascade, casters: &[ShadowCaster]) {
        self.events.push(format!("shadow {cascade_index}: {}", casters.len()));
    }

    fn draw_pass(&mut self, scene: &Scene, pass: &PassView, list: &DrawList) {
        let handles: Vec<u64> = list
            .iter()
            .flat_map(|(item, submeshes)| {
                let model = scene.model(item.entity);
                submeshes
                    .iter()
                    .filter_map(move |&i| model.map(|m| m.submeshes[i as usize].handle.0))
            })
            .collect();
        self.events.push(format!("{:?} {:?}", pass.kind, handles));
    }
}

#[test]
fn test_render_submission_order() {
    let mut f = Fixture::new();
    f.camera_mut().reflection_enabled = true;
    f.spawn(Vec3::new(0.0, 1.0, 0.0), model());

    let mut config = PipelineConfig::default();
    config.shadows.cascade_count = 2;
    let mut pipeline = ScenePipeline::new(config).unwrap();
    pipeline.simulate(&mut f.scene).unwrap();

    let mut recorder = Recorder::default();
    pipeline.render(&f.scene, &mut recorder);

    assert_eq!(
        recorder.events,
        vec![
            "camera 0".to_string(),
            format!("shadow 0: {}", pipeline.casters(0, 0).len()),
            format!("shadow 1: {}", pipeline.casters(0, 1).len()),
            "Reflection [1, 2]".to_string(),
            "Final [1, 2]".to_string(),
        ]
    );
}
