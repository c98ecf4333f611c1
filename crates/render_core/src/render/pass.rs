//! Pass description and the stages shared by every pass
//!
//! A pass is flag filter -> cull -> classify -> sort. The first two stages
//! live here as iterator adapters; classify and sort are done by the
//! [`DrawListBuilder`](crate::render::DrawListBuilder) for the final and
//! reflection passes and by caster collection for the shadow pass.

use crate::culling::{BoundingSphere, Frustum, FrustumCuller};
use crate::foundation::math::{Mat4, Mat4Ext};
use crate::scene::{Camera, Renderable, RenderFlags, Viewport};

/// Which pass a draw list is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Main camera view
    Final,
    /// Camera mirrored about the water plane
    Reflection,
    /// Light-space shadow cascades
    Shadow,
}

impl PassKind {
    /// Render flags a pass admits, before the camera's own flags apply
    pub fn mask(self) -> RenderFlags {
        match self {
            Self::Final | Self::Shadow => RenderFlags::all(),
            Self::Reflection => RenderFlags::REFLECTION_MASK,
        }
    }
}

/// Matrices and filters for one camera pass
#[derive(Debug, Clone, PartialEq)]
pub struct PassView {
    /// Pass kind
    pub kind: PassKind,
    /// World-to-view transform
    pub view: Mat4,
    /// Projection
    pub projection: Mat4,
    /// `projection * view`
    pub view_projection: Mat4,
    /// Camera and pass flags combined
    pub flags: RenderFlags,
    /// Target region
    pub viewport: Viewport,
}

impl PassView {
    /// The camera's own view
    pub fn final_pass(camera: &Camera) -> Self {
        Self::new(PassKind::Final, camera, camera.view_matrix())
    }

    /// The camera mirrored about the plane `y = plane_height`
    pub fn reflection_pass(camera: &Camera, plane_height: f32) -> Self {
        let view = camera.view_matrix() * Mat4::reflection_y(plane_height);
        Self::new(PassKind::Reflection, camera, view)
    }

    fn new(kind: PassKind, camera: &Camera, view: Mat4) -> Self {
        let projection = camera.projection_matrix();
        Self {
            kind,
            view,
            projection,
            view_projection: projection * view,
            flags: camera.render_flags & kind.mask(),
            viewport: camera.viewport,
        }
    }

    /// Frustum of this pass's view-projection
    pub fn frustum(&self) -> Frustum {
        FrustumCuller::build_frustum(&self.view_projection)
    }
}

/// A renderable that survived culling, with its world-space bounds
#[derive(Debug, Clone, Copy)]
pub struct Visible<'a> {
    /// The renderable
    pub renderable: Renderable<'a>,
    /// World-space bounding sphere
    pub sphere: BoundingSphere,
}

/// Stage 1: keep visible models whose flags share a bit with `flags`
pub fn filter_by_flags<'a>(
    renderables: impl Iterator<Item = Renderable<'a>>,
    flags: RenderFlags,
) -> impl Iterator<Item = Renderable<'a>> {
    renderables.filter(move |r| !r.model.hidden && r.model.render_flags.intersects(flags))
}

/// Stage 2: drop degenerate entities, then everything outside `frustum`
///
/// With no frustum only the degenerate test applies.
pub fn cull<'a>(
    renderables: impl Iterator<Item = Renderable<'a>>,
    frustum: Option<Frustum>,
) -> impl Iterator<Item = Visible<'a>> {
    renderables.filter_map(move |renderable| {
        let sphere = renderable
            .model
            .bounds
            .to_world(renderable.world, &renderable.world_scale)?;
        if let Some(frustum) = &frustum {
            if !FrustumCuller::is_visible(frustum, &sphere) {
                return None;
            }
        }
        Some(Visible { renderable, sphere })
    })
}
