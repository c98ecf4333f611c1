//! # Cascaded Shadow Partitioning
//!
//! Splits the camera's shadow range `[near, max_shadow_distance]` into depth
//! slices and fits an orthographic light projection around each slice.
//!
//! ## Per cascade
//!
//! 1. Take the 8 camera-frustum corners of the slice in world space
//! 2. Place the light one unit from their centroid, towards the light, and
//!    look at the centroid
//! 3. Bound the corners in light space (the unpadded box, used for culling)
//! 4. Pad X/Y by the overlap and Z by the expansion (the projection box)
//! 5. Build an orthographic projection from the padded box
//!
//! Split distances come from a [`SplitScheme`] so the heuristic can be swapped
//! without touching the fitting.

use std::cmp::Ordering;

use crate::config::{ShadowConfig, SplitSchemeConfig};
use crate::foundation::math::{utils, world_up, Mat4, Mat4Ext, Vec3};
use crate::scene::Camera;
use crate::CascadeError;

/// How a depth range is cut into cascades
pub trait SplitScheme: std::fmt::Debug {
    /// Boundaries of `count` consecutive ranges covering `[near, far]`
    ///
    /// Returns `count + 1` strictly increasing distances, the first equal to
    /// `near` and the last to `far`.
    fn compute_split_distances(&self, near: f32, far: f32, count: usize) -> Vec<f32>;
}

/// Shrink the remaining span by `ratio` per step, walking from the far end
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterativeSplit {
    /// Span multiplier per step, in (0, 1)
    pub ratio: f32,
}

impl Default for IterativeSplit {
    fn default() -> Self {
        Self { ratio: 0.5 }
    }
}

impl SplitScheme for IterativeSplit {
    fn compute_split_distances(&self, near: f32, far: f32, count: usize) -> Vec<f32> {
        let mut splits = vec![far; count + 1];
        let mut span = far - near;
        for split in splits.iter_mut().take(count).skip(1).rev() {
            span *= self.ratio;
            *split = near + span;
        }
        splits[0] = near;
        splits
    }
}

/// Blend of logarithmic and uniform splits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PracticalSplit {
    /// 0 = uniform, 1 = logarithmic
    pub lambda: f32,
}

impl SplitScheme for PracticalSplit {
    fn compute_split_distances(&self, near: f32, far: f32, count: usize) -> Vec<f32> {
        let lambda = self.lambda.clamp(0.0, 1.0);
        let mut splits: Vec<f32> = (0..=count)
            .map(|i| {
                let p = i as f32 / count as f32;
                let uniform = near + (far - near) * p;
                let log = near * (far / near).powf(p);
                uniform + (log - uniform) * lambda
            })
            .collect();
        splits[0] = near;
        splits[count] = far;
        splits
    }
}

impl From<SplitSchemeConfig> for Box<dyn SplitScheme> {
    fn from(config: SplitSchemeConfig) -> Self {
        match config {
            SplitSchemeConfig::Iterative { ratio } => Box::new(IterativeSplit { ratio }),
            SplitSchemeConfig::Practical { lambda } => Box::new(PracticalSplit { lambda }),
        }
    }
}

/// One light-space sub-frustum
#[derive(Debug, Clone, PartialEq)]
pub struct Cascade {
    /// World-to-light transform
    pub view: Mat4,
    /// Orthographic projection of the padded box
    pub projection: Mat4,
    /// `projection * view`
    pub view_projection: Mat4,
    /// Camera distance where this cascade starts
    pub split_near: f32,
    /// Camera distance where this cascade ends
    pub split_far: f32,
    /// Light-space minimum of the slice corners
    pub aabb_min: Vec3,
    /// Light-space maximum of the slice corners
    pub aabb_max: Vec3,
    /// Light-space minimum of the projection box
    pub padded_min: Vec3,
    /// Light-space maximum of the projection box
    pub padded_max: Vec3,
}

impl Cascade {
    /// Whether a light-space point lies in the projection box
    pub fn padded_contains(&self, light_space: &Vec3) -> bool {
        (0..3).all(|i| light_space[i] >= self.padded_min[i] && light_space[i] <= self.padded_max[i])
    }
}

/// The 8 world-space corners of the camera frustum between two distances
///
/// Near corners first, each quad ordered (-x,-y), (+x,-y), (+x,+y), (-x,+y).
pub fn frustum_corners(camera: &Camera, near: f32, far: f32) -> [Vec3; 8] {
    let (tan_x, tan_y) = camera.half_fov_tangents();
    let to_world = camera.world_matrix();
    let mut corners = [Vec3::zeros(); 8];

    for (quad, distance) in [near, far].into_iter().enumerate() {
        let (x, y) = (distance * tan_x, distance * tan_y);
        let local = [
            Vec3::new(-x, -y, -distance),
            Vec3::new(x, -y, -distance),
            Vec3::new(x, y, -distance),
            Vec3::new(-x, y, -distance),
        ];
        for (i, corner) in local.iter().enumerate() {
            corners[quad * 4 + i] = utils::transform_point(&to_world, corner);
        }
    }
    corners
}

/// Fits light-space cascades to a camera frustum
#[derive(Debug)]
pub struct CascadePartitioner {
    scheme: Box<dyn SplitScheme>,
    overlap: f32,
    z_expansion: f32,
}

impl Default for CascadePartitioner {
    fn default() -> Self {
        Self::from_config(&ShadowConfig::default())
    }
}

impl CascadePartitioner {
    /// Create a partitioner
    pub fn new(scheme: Box<dyn SplitScheme>, overlap: f32, z_expansion: f32) -> Self {
        Self {
            scheme,
            overlap,
            z_expansion,
        }
    }

    /// Create a partitioner from the shadow settings
    pub fn from_config(config: &ShadowConfig) -> Self {
        Self::new(config.split_scheme.into(), config.overlap, config.z_expansion)
    }

    /// Split distances for a depth range
    pub fn compute_split_distances(&self, near: f32, far: f32, count: usize) -> Vec<f32> {
        self.scheme.compute_split_distances(near, far, count)
    }

    /// The camera's shadow range, with near clamped strictly below far
    pub fn shadow_range(camera: &Camera) -> Result<(f32, f32), CascadeError> {
        let far = camera.max_shadow_distance;
        if !(far > 0.0 && far.is_finite()) {
            return Err(CascadeError::InvalidShadowDistance(far));
        }
        let near = if camera.near < far { camera.near } else { far * 0.5 };
        Ok((near, far))
    }

    /// Split distances over the camera's shadow range
    ///
    /// Rejects a zero count and any boundary that fails to increase, which a
    /// steep ratio or a very high count can produce in `f32`.
    pub fn split_distances(&self, camera: &Camera, count: usize) -> Result<Vec<f32>, CascadeError> {
        if count == 0 {
            return Err(CascadeError::ZeroCascadeCount);
        }
        let (near, far) = Self::shadow_range(camera)?;
        let splits = self.compute_split_distances(near, far, count);
        for (index, pair) in splits.windows(2).enumerate() {
            if pair[1].partial_cmp(&pair[0]) != Some(Ordering::Greater) {
                return Err(CascadeError::NonIncreasingSplit {
                    index: index + 1,
                    distance: pair[1],
                });
            }
        }
        Ok(splits)
    }

    /// Partition the camera's shadow range into `count` cascades
    ///
    /// `to_light` points from the scene towards the light.
    pub fn partition(&self, camera: &Camera, to_light: &Vec3, count: usize) -> Result<Vec<Cascade>, CascadeError> {
        let splits = self.split_distances(camera, count)?;
        let to_light = to_light.normalize();
        let up = if to_light.dot(&world_up()).abs() > 0.95 {
            Vec3::z()
        } else {
            world_up()
        };

        let cascades = splits
            .windows(2)
            .map(|range| self.fit(camera, range[0], range[1], &to_light, &up))
            .collect();

        let (near, far) = (splits[0], splits[splits.len() - 1]);
        log::trace!("Partitioned shadow range [{near}, {far}] at {splits:?}");
        Ok(cascades)
    }

    fn fit(&self, camera: &Camera, split_near: f32, split_far: f32, to_light: &Vec3, up: &Vec3) -> Cascade {
        let corners = frustum_corners(camera, split_near, split_far);
        let centroid = corners.iter().sum::<Vec3>() / corners.len() as f32;
        let view = Mat4::look_at(centroid + to_light, centroid, *up);

        let light_space = corners.map(|c| utils::transform_point(&view, &c));
        let (aabb_min, aabb_max) = utils::min_max(light_space.iter()).unwrap_or((centroid, centroid));

        let padding = Vec3::new(self.overlap, self.overlap, self.z_expansion);
        let padded_min = aabb_min - padding;
        let padded_max = aabb_max + padding;

        // light looks down -Z, so the far bound is the most negative z
        let projection = Mat4::orthographic(
            padded_min.x,
            padded_max.x,
            padded_min.y,
            padded_max.y,
            -padded_max.z,
            -padded_min.z,
        );

        Cascade {
            view,
            projection,
            view_projection: projection * view,
            split_near,
            split_far,
            aabb_min,
            aabb_max,
            padded_min,
            padded_max,
        }
    }
}
