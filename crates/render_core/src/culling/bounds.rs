//! Bounding volumes

use serde::{Deserialize, Serialize};

use crate::foundation::math::{utils, Mat4, Vec3};

/// Bounding sphere
///
/// Meshes carry one in local space; culling works on the world-space version
/// derived each frame from the owning entity's transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
    /// Centre of the sphere
    pub centre: Vec3,
    /// Radius of the sphere
    pub radius: f32,
}

impl Default for BoundingSphere {
    fn default() -> Self {
        Self {
            centre: Vec3::zeros(),
            radius: 0.0,
        }
    }
}

impl BoundingSphere {
    /// Create a new sphere
    pub fn new(centre: Vec3, radius: f32) -> Self {
        Self { centre, radius }
    }

    /// Sphere around the axis-aligned bounds of a point set
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let Some((min, max)) = utils::min_max(points) else {
            return Self::default();
        };
        let centre = (min + max) * 0.5;
        Self::new(centre, (max - centre).norm())
    }

    /// Transform a mesh-local sphere into world space
    ///
    /// The centre goes through the full world matrix. The radius is scaled by
    /// the mean of the absolute world scale axes, which is exact for uniform
    /// scale and an approximation for non-uniform scale.
    ///
    /// Returns `None` when any scale axis is zero: such an entity is
    /// degenerate and never visible.
    pub fn to_world(&self, world: &Mat4, world_scale: &Vec3) -> Option<Self> {
        if is_degenerate_scale(world_scale) {
            return None;
        }

        let mean_scale = (world_scale.x.abs() + world_scale.y.abs() + world_scale.z.abs()) / 3.0;
        Some(Self {
            centre: utils::transform_point(world, &self.centre),
            radius: self.radius * mean_scale,
        })
    }

    /// Whether this sphere overlaps an axis-aligned box
    pub fn intersects_aabb(&self, min: &Vec3, max: &Vec3) -> bool {
        let closest = self.centre.sup(min).inf(max);
        (closest - self.centre).norm_squared() <= self.radius * self.radius
    }
}

/// True when the scale collapses the entity on at least one axis
pub fn is_degenerate_scale(scale: &Vec3) -> bool {
    scale.x * scale.y * scale.z == 0.0
}
