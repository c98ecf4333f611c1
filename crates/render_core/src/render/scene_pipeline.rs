//! # Scene Pipeline
//!
//! Drives every pass of every active camera through the shared stages once
//! per frame and keeps the results for the draw layer.
//!
//! ## Frame
//!
//! ```text
//! simulate(scene)                         render(scene, submitter)
//!   update transforms                       per active camera:
//!   validate cameras                          shadow cascades + casters
//!   per active camera:                        reflection draw list
//!     final:      flags -> cull -> sort       final draw list
//!     reflection: flags -> cull -> sort
//!     shadow:     flags -> cascades -> casters (throttled)
//! ```
//!
//! Each camera owns a slot addressed by its draw-list index, assigned the
//! first time the pipeline sees the camera. Slots are never removed, so the
//! index stays valid for the camera's lifetime.

use crate::config::{ConfigError, PipelineConfig};
use crate::foundation::math::Vec3;
use crate::render::pass::{cull, filter_by_flags, PassKind, PassView};
use crate::render::shadow::{collect_casters, CascadeScheduler, ShadowCaster};
use crate::render::{Cascade, CascadePartitioner, DrawList, DrawListBuilder};
use crate::scene::{Camera, DirectionalLight, Entity, Scene, Viewport};
use crate::PipelineError;

/// Receives the pipeline's output and turns it into draw calls
///
/// Called camera by camera, in slot order: shadow cascades first, then the
/// reflection pass (if the camera has one), then the final pass.
pub trait DrawSubmitter {
    /// Start of a camera's output
    fn begin_camera(&mut self, camera_index: usize, viewport: &Viewport) {
        let _ = (camera_index, viewport);
    }

    /// One cascade and its casters, back-to-front
    fn draw_shadow_cascade(&mut self, scene: &Scene, cascade_index: usize, cascade: &Cascade, casters: &[ShadowCaster]);

    /// A final or reflection draw list
    fn draw_pass(&mut self, scene: &Scene, pass: &PassView, list: &DrawList);
}

/// Counters from the last simulated frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Cameras simulated
    pub cameras: usize,
    /// Entities in final draw lists
    pub final_entities: usize,
    /// Entities in reflection draw lists
    pub reflection_entities: usize,
    /// Cascades held across all cameras
    pub cascades: usize,
    /// Cameras whose cascades were recomputed this frame
    pub cascades_recomputed: usize,
    /// Caster entries across all cascades
    pub casters: usize,
}

#[derive(Debug)]
struct CameraSlot {
    entity: Option<Entity>,
    active: bool,
    viewport: Viewport,
    final_pass: Option<PassView>,
    reflection_pass: Option<PassView>,
    final_list: DrawList,
    reflection_list: DrawList,
    cascades: Vec<Cascade>,
    casters: Vec<Vec<ShadowCaster>>,
    scheduler: CascadeScheduler,
}

impl CameraSlot {
    fn new(recompute_interval: u32) -> Self {
        Self {
            entity: None,
            active: false,
            viewport: Viewport::default(),
            final_pass: None,
            reflection_pass: None,
            final_list: DrawList::new(),
            reflection_list: DrawList::new(),
            cascades: Vec::new(),
            casters: Vec::new(),
            scheduler: CascadeScheduler::new(recompute_interval),
        }
    }

    fn clear_shadows(&mut self) {
        self.cascades.clear();
        self.casters.clear();
        self.scheduler.invalidate();
    }
}

/// Frame-stepped visibility and draw-order pipeline
#[derive(Debug)]
pub struct ScenePipeline {
    config: PipelineConfig,
    partitioner: CascadePartitioner,
    slots: Vec<CameraSlot>,
    stats: FrameStats,
    frame: u64,
}

impl ScenePipeline {
    /// Create a pipeline from validated settings
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let partitioner = CascadePartitioner::from_config(&config.shadows);
        Ok(Self {
            config,
            partitioner,
            slots: Vec::new(),
            stats: FrameStats::default(),
            frame: 0,
        })
    }

    /// Replace the cascade partitioner (for a custom split scheme)
    #[must_use]
    pub fn with_partitioner(mut self, partitioner: CascadePartitioner) -> Self {
        self.partitioner = partitioner;
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Counters from the last call to [`simulate`](Self::simulate)
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Frames simulated so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Number of camera slots ever assigned
    pub fn camera_slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Cull, classify and sort every pass of every active camera
    ///
    /// Fails without touching any draw list if an active camera is malformed
    /// or the shadow settings cannot be partitioned.
    pub fn simulate(&mut self, scene: &mut Scene) -> Result<(), PipelineError> {
        scene.update_transforms();

        let cameras = scene.active_cameras();
        for &entity in &cameras {
            if let Some(camera) = scene.camera(entity) {
                camera.validate().map_err(|reason| PipelineError::InvalidCamera {
                    entity: format!("{entity:?}"),
                    reason,
                })?;
            }
        }
        let casts_shadows = scene.sunlight().is_some_and(|light| light.cast_shadows);
        for camera in cameras.iter().filter_map(|&e| scene.camera(e)) {
            if casts_shadows && camera.shadows_enabled {
                self.partitioner
                    .split_distances(camera, self.config.shadows.cascade_count)?;
            }
        }

        for slot in &mut self.slots {
            slot.active = false;
        }

        let mut stats = FrameStats {
            cameras: cameras.len(),
            ..FrameStats::default()
        };
        for entity in cameras {
            let index = self.claim_slot(scene, entity);
            let Some(camera) = scene.camera(entity) else {
                continue;
            };
            let to_light = scene
                .sunlight()
                .filter(|light| light.cast_shadows)
                .map(DirectionalLight::to_light);

            let slot = &mut self.slots[index];
            slot.active = true;
            slot.viewport = camera.viewport;
            self.simulate_camera(index, scene, camera, to_light.as_ref(), &mut stats)?;
        }

        self.stats = stats;
        self.frame += 1;
        log::trace!("Frame {} simulated: {:?}", self.frame, self.stats);
        Ok(())
    }

    /// Hand every active camera's output to `submitter`
    pub fn render<S: DrawSubmitter>(&self, scene: &Scene, submitter: &mut S) {
        for (index, slot) in self.slots.iter().enumerate().filter(|(_, s)| s.active) {
            submitter.begin_camera(index, &slot.viewport);

            for (cascade_index, (cascade, casters)) in slot.cascades.iter().zip(&slot.casters).enumerate() {
                submitter.draw_shadow_cascade(scene, cascade_index, cascade, casters);
            }
            if let Some(pass) = &slot.reflection_pass {
                submitter.draw_pass(scene, pass, &slot.reflection_list);
            }
            if let Some(pass) = &slot.final_pass {
                submitter.draw_pass(scene, pass, &slot.final_list);
            }
        }
    }

    /// Draw list of a camera slot for the final or reflection pass
    pub fn draw_list(&self, camera_index: usize, kind: PassKind) -> Option<&DrawList> {
        let slot = self.slots.get(camera_index)?;
        match kind {
            PassKind::Final => Some(&slot.final_list),
            PassKind::Reflection => Some(&slot.reflection_list),
            PassKind::Shadow => None,
        }
    }

    /// Draw list of a camera entity for the final or reflection pass
    pub fn draw_list_for(&self, scene: &Scene, camera: Entity, kind: PassKind) -> Option<&DrawList> {
        let index = scene.camera(camera)?.draw_list_index()?;
        self.draw_list(index, kind)
    }

    /// Matrices of a camera slot's final or reflection pass
    pub fn pass_view(&self, camera_index: usize, kind: PassKind) -> Option<&PassView> {
        let slot = self.slots.get(camera_index)?;
        match kind {
            PassKind::Final => slot.final_pass.as_ref(),
            PassKind::Reflection => slot.reflection_pass.as_ref(),
            PassKind::Shadow => None,
        }
    }

    /// Cascades of a camera slot
    pub fn cascades(&self, camera_index: usize) -> &[Cascade] {
        self.slots.get(camera_index).map_or(&[], |s| &s.cascades)
    }

    /// Casters of one cascade of a camera slot
    pub fn casters(&self, camera_index: usize, cascade_index: usize) -> &[ShadowCaster] {
        self.slots
            .get(camera_index)
            .and_then(|s| s.casters.get(cascade_index))
            .map_or(&[], Vec::as_slice)
    }

    /// Slot index for a camera, assigning one if it has none yet
    ///
    /// A camera carrying an index already claimed this frame by another
    /// entity (a cloned camera) is given a fresh slot.
    fn claim_slot(&mut self, scene: &mut Scene, entity: Entity) -> usize {
        let interval = self.config.shadows.recompute_interval;
        let existing = scene
            .camera(entity)
            .and_then(Camera::draw_list_index)
            .filter(|&i| self.slots.get(i).map_or(true, |s| !s.active || s.entity == Some(entity)));

        let index = existing.unwrap_or_else(|| {
            let index = self.slots.len();
            if let Some(camera) = scene.camera_mut(entity) {
                camera.draw_list_index = Some(index);
            }
            log::debug!("Assigned draw list {} to camera {:?}", index, entity);
            index
        });

        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || CameraSlot::new(interval));
        }
        let slot = &mut self.slots[index];
        if slot.entity != Some(entity) {
            slot.entity = Some(entity);
            slot.clear_shadows();
        }
        index
    }

    fn simulate_camera(
        &mut self,
        index: usize,
        scene: &Scene,
        camera: &Camera,
        to_light: Option<&Vec3>,
        stats: &mut FrameStats,
    ) -> Result<(), PipelineError> {
        let culling = &self.config.culling;
        let slot = &mut self.slots[index];

        let final_pass = PassView::final_pass(camera);
        let frustum = culling.enable_frustum_culling.then(|| final_pass.frustum());
        let visible = cull(filter_by_flags(scene.renderables(), final_pass.flags), frustum);
        DrawListBuilder::build(&final_pass.view, visible, &mut slot.final_list);
        stats.final_entities += slot.final_list.entity_count();

        if camera.reflection_enabled {
            let pass = PassView::reflection_pass(camera, culling.reflection_plane_height);
            let frustum = culling.enable_frustum_culling.then(|| pass.frustum());
            let visible = cull(filter_by_flags(scene.renderables(), pass.flags), frustum);
            DrawListBuilder::build(&pass.view, visible, &mut slot.reflection_list);
            stats.reflection_entities += slot.reflection_list.entity_count();
            slot.reflection_pass = Some(pass);
        } else {
            slot.reflection_list.clear();
            slot.reflection_pass = None;
        }

        match to_light {
            Some(to_light) if camera.shadows_enabled => {
                if slot
                    .scheduler
                    .should_recompute(&final_pass.view, &final_pass.projection, to_light)
                {
                    slot.cascades = self
                        .partitioner
                        .partition(camera, to_light, self.config.shadows.cascade_count)?;
                    slot.casters.resize_with(slot.cascades.len(), Vec::new);

                    let flags = camera.render_flags & PassKind::Shadow.mask();
                    for (cascade, casters) in slot.cascades.iter().zip(slot.casters.iter_mut()) {
                        let candidates = cull(filter_by_flags(scene.renderables(), flags), None);
                        collect_casters(cascade, candidates, casters);
                    }
                    stats.cascades_recomputed += 1;
                }
                stats.cascades += slot.cascades.len();
                stats.casters += slot.casters.iter().map(Vec::len).sum::<usize>();
            }
            _ => slot.clear_shadows(),
        }

        slot.final_pass = Some(final_pass);
        Ok(())
    }
}
