//! Shadow caster collection and cascade scheduling

use crate::culling::BoundingSphere;
use crate::foundation::math::{utils, Mat4, Vec3};
use crate::render::pass::Visible;
use crate::render::Cascade;
use crate::scene::Entity;

/// An entity drawn into a cascade
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowCaster {
    /// The casting entity
    pub entity: Entity,
    /// Distance from the light along its direction
    pub depth: f32,
}

/// Fill `casters` with the candidates that touch the cascade
///
/// Each sphere is moved into light space and tested against the cascade's
/// unpadded box. Survivors are ordered back-to-front (furthest from the light
/// first); equal depths keep candidate order.
pub fn collect_casters<'a>(
    cascade: &Cascade,
    candidates: impl IntoIterator<Item = Visible<'a>>,
    casters: &mut Vec<ShadowCaster>,
) {
    casters.clear();

    for Visible { renderable, sphere } in candidates {
        if !renderable.model.casts_shadows {
            continue;
        }
        let centre = utils::transform_point(&cascade.view, &sphere.centre);
        let light_space = BoundingSphere::new(centre, sphere.radius);
        if light_space.intersects_aabb(&cascade.aabb_min, &cascade.aabb_max) {
            casters.push(ShadowCaster {
                entity: renderable.entity,
                depth: -light_space.centre.z,
            });
        }
    }

    casters.sort_by(|a, b| b.depth.total_cmp(&a.depth));
}

/// Decides when a camera's cascades must be recomputed
///
/// Recomputes whenever the camera view, projection or light direction
/// changed, and otherwise every `interval` frames. In between, the previous
/// cascades and caster lists are reused as they are.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeScheduler {
    interval: u32,
    frames_since_recompute: u32,
    last_inputs: Option<(Mat4, Mat4, Vec3)>,
}

impl CascadeScheduler {
    /// Create a scheduler; an interval of 0 behaves as 1
    pub fn new(interval: u32) -> Self {
        Self {
            interval: interval.max(1),
            frames_since_recompute: 0,
            last_inputs: None,
        }
    }

    /// Advance one frame and report whether to recompute
    pub fn should_recompute(&mut self, view: &Mat4, projection: &Mat4, to_light: &Vec3) -> bool {
        self.frames_since_recompute = self.frames_since_recompute.saturating_add(1);
        let inputs = (*view, *projection, *to_light);
        let changed = self.last_inputs.as_ref() != Some(&inputs);

        if changed || self.frames_since_recompute >= self.interval {
            self.last_inputs = Some(inputs);
            self.frames_since_recompute = 0;
            true
        } else {
            false
        }
    }

    /// Forget the last inputs so the next frame recomputes
    pub fn invalidate(&mut self) {
        self.last_inputs = None;
    }
}
