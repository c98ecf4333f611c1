//! Frustum planes and sphere classification
//!
//! Planes are extracted from a view-projection matrix with the Gribb-Hartmann
//! row combinations, so the same code culls perspective cameras, reflected
//! cameras and orthographic light projections.

use crate::culling::BoundingSphere;
use crate::foundation::math::{Mat4, Vec3, Vec4};

/// Plane defined by normal and distance from origin
///
/// Points with a positive signed distance are on the front (inside) of the
/// plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal pointing into the frustum
    pub normal: Vec3,
    /// Distance term of `dot(normal, p) + distance = 0`
    pub distance: f32,
}

impl Default for Plane {
    fn default() -> Self {
        Self {
            normal: Vec3::zeros(),
            distance: 0.0,
        }
    }
}

impl Plane {
    /// Create a plane from a raw `(a, b, c, d)` row, normalizing by the
    /// normal's length
    ///
    /// A zero-length normal is kept as-is; every point then lies on it, so it
    /// never rejects anything.
    pub fn from_coefficients(coefficients: &Vec4) -> Self {
        let normal = coefficients.xyz();
        let length = normal.norm();
        if length > 0.0 {
            Self {
                normal: normal / length,
                distance: coefficients.w / length,
            }
        } else {
            Self {
                normal,
                distance: coefficients.w,
            }
        }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: &Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// Where a sphere lies relative to a plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Entirely on the inner side
    Front,
    /// Entirely on the outer side
    Back,
    /// Straddles the plane
    Intersect,
}

/// Six-plane view volume
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Left plane index
    pub const LEFT: usize = 0;
    /// Right plane index
    pub const RIGHT: usize = 1;
    /// Bottom plane index
    pub const BOTTOM: usize = 2;
    /// Top plane index
    pub const TOP: usize = 3;
    /// Near plane index
    pub const NEAR: usize = 4;
    /// Far plane index
    pub const FAR: usize = 5;

    /// Plane accessor by index constant
    pub fn plane(&self, index: usize) -> &Plane {
        &self.planes[index]
    }
}

/// Stateless frustum culling service shared by every pass
#[derive(Debug, Clone, Copy, Default)]
pub struct FrustumCuller;

impl FrustumCuller {
    /// Extract the six planes of a view-projection matrix
    ///
    /// left = row3 + row0, right = row3 - row0, bottom = row3 + row1,
    /// top = row3 - row1, near = row3 + row2, far = row3 - row2, each
    /// normalized so signed distances are in world units.
    pub fn build_frustum(view_projection: &Mat4) -> Frustum {
        let row = |i: usize| -> Vec4 { view_projection.row(i).transpose() };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        Frustum {
            planes: [
                Plane::from_coefficients(&(r3 + r0)),
                Plane::from_coefficients(&(r3 - r0)),
                Plane::from_coefficients(&(r3 + r1)),
                Plane::from_coefficients(&(r3 - r1)),
                Plane::from_coefficients(&(r3 + r2)),
                Plane::from_coefficients(&(r3 - r2)),
            ],
        }
    }

    /// Classify a sphere against one plane by signed distance vs. radius
    pub fn classify(plane: &Plane, sphere: &BoundingSphere) -> Classification {
        let distance = plane.distance_to_point(&sphere.centre);
        if distance < -sphere.radius {
            Classification::Back
        } else if distance > sphere.radius {
            Classification::Front
        } else {
            Classification::Intersect
        }
    }

    /// True unless the sphere is behind any plane
    ///
    /// Planes are tested in order and the first `Back` result ends the test.
    pub fn is_visible(frustum: &Frustum, sphere: &BoundingSphere) -> bool {
        frustum
            .planes
            .iter()
            .all(|plane| Self::classify(plane, sphere) != Classification::Back)
    }
}
