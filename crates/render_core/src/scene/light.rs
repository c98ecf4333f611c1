//! Directional light (sunlight)

use crate::foundation::math::Vec3;

/// Directional light with parallel rays
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels, normalized
    pub direction: Vec3,
    /// Whether the light casts shadows
    pub cast_shadows: bool,
}

impl DirectionalLight {
    /// Create a shadow-casting directional light travelling along `direction`
    pub fn new(direction: Vec3) -> Self {
        Self {
            direction: direction.normalize(),
            cast_shadows: true,
        }
    }

    /// Unit vector from the scene towards the light
    pub fn to_light(&self) -> Vec3 {
        -self.direction
    }
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self::new(Vec3::new(-0.3, -1.0, -0.2))
    }
}
