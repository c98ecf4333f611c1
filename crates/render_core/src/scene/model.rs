//! Model component
//!
//! Pure description of what an entity draws: a mesh-local bounding sphere and
//! one entry per submesh with its blend mode and an opaque handle the draw
//! layer knows how to bind. Mesh parsing, shaders and textures live elsewhere.

use crate::culling::BoundingSphere;
use crate::memory::Allocation;
use crate::scene::RenderFlags;

/// How a submesh's material blends with the framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Opaque, depth-writing
    #[default]
    None,
    /// Standard alpha blending
    Alpha,
    /// Additive blending
    Additive,
    /// Multiplicative blending
    Multiply,
}

impl BlendMode {
    /// Any blend mode other than `None` goes to the transparent bucket
    pub fn is_transparent(self) -> bool {
        self != Self::None
    }
}

/// Opaque handle to bindable GPU state (material + index range)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BindHandle(pub u64);

/// One drawable part of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Submesh {
    /// Blend mode of the submesh's material
    pub blend_mode: BlendMode,
    /// What the draw layer binds for this submesh
    pub handle: BindHandle,
}

impl Submesh {
    /// Create an opaque submesh
    pub fn opaque(handle: BindHandle) -> Self {
        Self {
            blend_mode: BlendMode::None,
            handle,
        }
    }

    /// Create a submesh with an explicit blend mode
    pub fn blended(blend_mode: BlendMode, handle: BindHandle) -> Self {
        Self { blend_mode, handle }
    }
}

/// Model component
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    /// Mesh-local bounding sphere
    pub bounds: BoundingSphere,
    /// Submeshes, drawn in index order within a bucket
    pub submeshes: Vec<Submesh>,
    /// Cameras must share a bit with these to draw the model
    pub render_flags: RenderFlags,
    /// Hidden models are skipped by every pass
    pub hidden: bool,
    /// Whether the model is drawn into shadow cascades
    pub casts_shadows: bool,
    /// Vertex storage in the geometry arena, if uploaded
    pub geometry: Option<Allocation>,
}

impl Model {
    /// Create a visible, shadow-casting model
    pub fn new(bounds: BoundingSphere, submeshes: Vec<Submesh>) -> Self {
        Self {
            bounds,
            submeshes,
            render_flags: RenderFlags::default(),
            hidden: false,
            casts_shadows: true,
            geometry: None,
        }
    }

    /// Builder pattern: Set render flags
    #[must_use]
    pub fn with_render_flags(mut self, flags: RenderFlags) -> Self {
        self.render_flags = flags;
        self
    }

    /// Builder pattern: Set shadow casting
    #[must_use]
    pub fn with_shadows(mut self, casts_shadows: bool) -> Self {
        self.casts_shadows = casts_shadows;
        self
    }

    /// Builder pattern: Attach arena geometry
    #[must_use]
    pub fn with_geometry(mut self, allocation: Allocation) -> Self {
        self.geometry = Some(allocation);
        self
    }

    /// Set visibility
    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }
}
