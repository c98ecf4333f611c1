//! # 3D Camera
//!
//! Perspective camera used by the final, reflection and shadow passes.
//!
//! ## Design Principles
//! - **Library-agnostic**: No graphics API types in camera math
//! - **On-demand matrices**: View and projection are derived from the fields
//!   each time they are requested, so a changed field can never leave a stale
//!   matrix behind
//! - **Pass settings live here**: render flags, viewport, shadow distance and
//!   the stable draw-list index travel with the camera

use nalgebra::Isometry3;

use crate::foundation::math::{utils, Mat4, Mat4Ext, Point3, Vec3};
use crate::scene::RenderFlags;

/// Normalized viewport rectangle, (0, 0) bottom-left to (1, 1) top-right
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Left edge
    pub left: f32,
    /// Bottom edge
    pub bottom: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            left: 0.0,
            bottom: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }
}

/// 3D camera with perspective projection
///
/// # Coordinate System
/// Right-handed, Y-up world; the camera looks down its local -Z axis and
/// clip-space depth spans [-1, 1].
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,

    /// Vertical field of view in radians
    pub fov: f32,

    /// Aspect ratio (width / height)
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,

    /// Shadows are only cast within this distance of the camera
    pub max_shadow_distance: f32,

    /// Region of the render target this camera draws to
    pub viewport: Viewport,

    /// Entities must share a bit with these to be drawn by this camera
    pub render_flags: RenderFlags,

    /// Inactive cameras are skipped entirely
    pub active: bool,

    /// Whether cascades are computed for this camera
    pub shadows_enabled: bool,

    /// Whether a reflection draw list is built for this camera
    pub reflection_enabled: bool,

    /// Slot in the pipeline's per-camera storage, assigned on first use
    pub(crate) draw_list_index: Option<usize>,
}

impl Camera {
    /// Create a new perspective camera with standard Y-up orientation
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Aspect ratio (width / height) of the viewport
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    ///
    /// The target defaults to the origin and the maximum shadow distance to
    /// the far plane.
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
            max_shadow_distance: far,
            viewport: Viewport::default(),
            render_flags: RenderFlags::all(),
            active: true,
            shadows_enabled: true,
            reflection_enabled: false,
            draw_list_index: None,
        }
    }

    /// Update camera position in world space
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Update camera target (look-at point)
    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
        log::trace!("Camera target updated to: {:?}", target);
    }

    /// Configure camera to look at a specific point with custom up vector
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.target = target;
        self.up = up;
        log::trace!("Camera look_at updated - target: {:?}, up: {:?}", target, up);
    }

    /// Update camera aspect ratio for viewport changes
    ///
    /// Only logs changes larger than 0.01 to keep window resizes quiet.
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > 0.01 {
            log::info!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
    }

    /// Set how far from the camera shadows are cast
    pub fn set_max_shadow_distance(&mut self, distance: f32) {
        self.max_shadow_distance = distance;
    }

    /// Stable per-camera slot index, once the pipeline has seen this camera
    pub fn draw_list_index(&self) -> Option<usize> {
        self.draw_list_index
    }

    /// World-to-camera transform
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    /// Camera-to-world transform
    pub fn world_matrix(&self) -> Mat4 {
        Isometry3::look_at_rh(&Point3::from(self.position), &Point3::from(self.target), &self.up)
            .inverse()
            .to_homogeneous()
    }

    /// Perspective projection
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective(self.fov, self.aspect, self.near, self.far)
    }

    /// Combined view-projection matrix (`P × V`)
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Unit forward vector in world space
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }

    /// Tangents of the half field of view, (horizontal, vertical)
    pub fn half_fov_tangents(&self) -> (f32, f32) {
        let tan_y = (self.fov * 0.5).tan();
        (tan_y * self.aspect, tan_y)
    }

    /// Check that the camera describes a usable projection
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.near > 0.0 && self.near.is_finite()) {
            return Err(format!("near plane must be positive, got {}", self.near));
        }
        if !(self.far > self.near && self.far.is_finite()) {
            return Err(format!("far plane {} must lie beyond near plane {}", self.far, self.near));
        }
        if !(self.fov > 0.0 && self.fov < std::f32::consts::PI) {
            return Err(format!("field of view must be in (0, pi), got {}", self.fov));
        }
        if !(self.aspect > 0.0 && self.aspect.is_finite()) {
            return Err(format!("aspect ratio must be positive, got {}", self.aspect));
        }
        let forward = self.target - self.position;
        if forward.norm_squared() <= f32::EPSILON {
            return Err("camera position and target coincide".to_string());
        }
        if forward.cross(&self.up).norm_squared() <= f32::EPSILON {
            return Err("up vector is parallel to the view direction".to_string());
        }
        Ok(())
    }
}

impl Default for Camera {
    /// Above and behind the origin looking at it, 45 degree FOV, 16:9,
    /// near 0.1, far 1000, shadows out to 100
    fn default() -> Self {
        let mut camera = Self::perspective(Vec3::new(0.0, 3.0, 3.0), 45.0, 16.0 / 9.0, 0.1, 1000.0);
        camera.max_shadow_distance = 100.0;
        camera
    }
}
