//! Headless scene pipeline demo
//!
//! Builds a randomized scene, uploads placeholder geometry into a geometry
//! arena and steps frames through the scene pipeline, logging what each pass
//! would draw. A few entities are replaced every 30 frames so the arena's
//! free list gets exercised.
//!
//! Usage: `scene_demo [config.toml|config.ron]`

use std::error::Error;

use bytemuck::{Pod, Zeroable};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use render_core::foundation::logging;
use render_core::prelude::*;
use render_core::render::{PassView, ShadowCaster};
use render_core::scene::{BindHandle, Viewport};

const ENTITY_COUNT: usize = 200;
const FRAME_COUNT: u32 = 120;
const CHURN_INTERVAL: u32 = 30;
const CHURN_COUNT: usize = 12;

/// Interleaved vertex matching the default 32-byte arena stride
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
    uv: [f32; 2],
}

/// Counts draw calls instead of issuing them
#[derive(Debug, Default)]
struct CountingSubmitter {
    submesh_draws: usize,
    shadow_draws: usize,
}

impl DrawSubmitter for CountingSubmitter {
    fn begin_camera(&mut self, camera_index: usize, viewport: &Viewport) {
        log::trace!("Camera {} -> viewport {:?}", camera_index, viewport);
    }

    fn draw_shadow_cascade(&mut self, scene: &Scene, cascade_index: usize, cascade: &Cascade, casters: &[ShadowCaster]) {
        let draws: usize = casters
            .iter()
            .filter_map(|c| scene.model(c.entity))
            .map(|m| m.submeshes.len())
            .sum();
        log::trace!(
            "Cascade {} (to {:.1}): {} casters, {} draws",
            cascade_index,
            cascade.split_far,
            casters.len(),
            draws
        );
        self.shadow_draws += draws;
    }

    fn draw_pass(&mut self, _scene: &Scene, pass: &PassView, list: &DrawList) {
        log::trace!("{:?} pass: {} items, {} draws", pass.kind, list.len(), list.submesh_count());
        self.submesh_draws += list.submesh_count();
    }
}

fn load_config() -> Result<PipelineConfig, Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading pipeline config from {}", path);
            PipelineConfig::load_from_file(&path)?
        }
        None => PipelineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// A flat grid patch standing in for a loaded mesh
fn placeholder_vertices(count: usize) -> Vec<Vertex> {
    let side = (count as f32).sqrt().ceil().max(1.0) as usize;
    (0..count)
        .map(|i| {
            let (x, z) = ((i % side) as f32, (i / side) as f32);
            Vertex {
                position: [x, 0.0, z],
                normal: [0.0, 1.0, 0.0],
                uv: [x / side as f32, z / side as f32],
            }
        })
        .collect()
}

fn spawn_entity<F: FnMut() -> BindHandle>(
    scene: &mut Scene,
    arena: &mut GeometryArena,
    vaos: &mut VaoAllocator<BindHandle, F>,
    rng: &mut StdRng,
) -> Result<Entity, ArenaError> {
    let position = Vec3::new(
        rng.gen_range(-60.0..60.0),
        rng.gen_range(0.0..8.0),
        rng.gen_range(-60.0..60.0),
    );
    let scale = if rng.gen_bool(0.05) {
        // collapsed on one axis, never drawn
        Vec3::new(1.0, 0.0, 1.0)
    } else {
        Vec3::repeat(rng.gen_range(0.5..2.5))
    };
    let entity = scene.create_entity(Transform::from_position(position).with_scale(scale));

    let vertices = placeholder_vertices(rng.gen_range(1..2000));
    // the arena counts vertices in its own stride
    let bytes = std::mem::size_of_val(vertices.as_slice());
    let allocation = arena.allocate(bytes.div_ceil(arena.stride_bytes()))?;
    arena.write(&allocation, &vertices)?;

    let submeshes = (0..rng.gen_range(0..4))
        .map(|_| {
            let blend = if rng.gen_bool(0.2) { BlendMode::Alpha } else { BlendMode::None };
            Submesh::blended(blend, vaos.request())
        })
        .collect();
    let positions: Vec<Vec3> = vertices.iter().map(|v| Vec3::from(v.position)).collect();
    let bounds = BoundingSphere::from_points(&positions);

    let mut model = Model::new(bounds, submeshes)
        .with_geometry(allocation)
        .with_shadows(rng.gen_bool(0.8));
    if rng.gen_bool(0.05) {
        model.render_flags = RenderFlags::SECONDARY;
    }
    model.set_hidden(rng.gen_bool(0.02));
    scene.set_model(entity, model);
    Ok(entity)
}

fn despawn_entity<F: FnMut() -> BindHandle>(
    scene: &mut Scene,
    arena: &mut GeometryArena,
    vaos: &mut VaoAllocator<BindHandle, F>,
    entity: Entity,
) {
    let Some(model) = scene.destroy_entity(entity) else {
        return;
    };
    if let Some(allocation) = &model.geometry {
        arena.free(allocation);
    }
    for submesh in model.submeshes {
        vaos.release(submesh.handle);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = load_config()?;
    let mut rng = StdRng::seed_from_u64(0x5EED);

    let mut arena = GeometryArena::new(HostBuffer::new(), &config.arena)?;
    let mut next_handle = 0;
    let mut vaos = VaoAllocator::new(|| {
        next_handle += 1;
        BindHandle(next_handle)
    });

    let mut scene = Scene::new();
    scene.set_sunlight(DirectionalLight::default());

    let main_camera = scene.create_entity(Transform::identity());
    let mut camera = Camera::default();
    camera.set_position(Vec3::new(0.0, 12.0, 40.0));
    camera.set_target(Vec3::zeros());
    camera.reflection_enabled = true;
    camera.render_flags = RenderFlags::all().difference(RenderFlags::SECONDARY);
    scene.set_camera(main_camera, camera);

    let minimap = scene.create_entity(Transform::identity());
    let mut overhead = Camera::perspective(Vec3::new(0.0, 80.0, 0.1), 60.0, 1.0, 1.0, 200.0);
    overhead.set_target(Vec3::zeros());
    overhead.viewport = Viewport {
        left: 0.75,
        bottom: 0.75,
        width: 0.25,
        height: 0.25,
    };
    overhead.shadows_enabled = false;
    scene.set_camera(minimap, overhead);

    let mut entities = Vec::with_capacity(ENTITY_COUNT);
    for _ in 0..ENTITY_COUNT {
        entities.push(spawn_entity(&mut scene, &mut arena, &mut vaos, &mut rng)?);
    }
    log::info!(
        "Spawned {} entities: {:?}, {} vertex arrays",
        entities.len(),
        arena.stats(),
        vaos.created()
    );

    let mut pipeline = ScenePipeline::new(config)?;
    let mut submitter = CountingSubmitter::default();

    for frame in 1..=FRAME_COUNT {
        let angle = frame as f32 * 0.01;
        if let Some(camera) = scene.camera_mut(main_camera) {
            camera.set_position(Vec3::new(40.0 * angle.sin(), 12.0, 40.0 * angle.cos()));
        }

        if frame % CHURN_INTERVAL == 0 {
            for _ in 0..CHURN_COUNT.min(entities.len()) {
                let victim = entities.swap_remove(rng.gen_range(0..entities.len()));
                despawn_entity(&mut scene, &mut arena, &mut vaos, victim);
            }
            for _ in 0..CHURN_COUNT {
                entities.push(spawn_entity(&mut scene, &mut arena, &mut vaos, &mut rng)?);
            }
            log::info!("Frame {}: churned {} entities, {:?}", frame, CHURN_COUNT, arena.stats());
        }

        pipeline.simulate(&mut scene)?;
        pipeline.render(&scene, &mut submitter);

        let stats = pipeline.stats();
        log::debug!(
            "Frame {}: {} final, {} reflected, {} cascades ({} recomputed), {} casters",
            frame,
            stats.final_entities,
            stats.reflection_entities,
            stats.cascades,
            stats.cascades_recomputed,
            stats.casters
        );
    }

    let used_blocks = arena.block_map().iter().filter(|&&used| used).count();
    log::info!(
        "Done after {} frames: {} submesh draws, {} shadow draws",
        pipeline.frame(),
        submitter.submesh_draws,
        submitter.shadow_draws
    );
    log::info!(
        "Arena: {:?}, {}/{} blocks in use, {} vertex arrays created ({} pooled)",
        arena.stats(),
        used_blocks,
        arena.block_map().len(),
        vaos.created(),
        vaos.available()
    );
    Ok(())
}

fn main() {
    logging::init_with_default("info");
    log::info!("Starting scene pipeline demo");

    if let Err(e) = run() {
        log::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}
