//! # Draw Lists
//!
//! Ordered output of one camera pass. Every visible entity contributes an
//! opaque item and a transparent item, each listing the submeshes of that
//! blend class (possibly none). Items are stably sorted by [`SortKey`], which
//! puts all opaque geometry front-to-back ahead of all transparent geometry
//! back-to-front.
//!
//! ## Storage
//!
//! Items reference ranges of one shared submesh index buffer. Both vectors
//! are cleared and refilled each frame, so a list reaches its steady-state
//! capacity after the first few frames and stops allocating.

use std::ops::Range;

use crate::foundation::math::{utils, Mat4};
use crate::render::pass::Visible;
use crate::render::SortKey;
use crate::scene::Entity;

/// One entry of a draw list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawItem {
    /// Entity to draw
    pub entity: Entity,
    /// Position in the draw order
    pub sort_key: SortKey,
    /// Range into the list's submesh index buffer
    submeshes: Range<u32>,
}

impl DrawItem {
    /// Whether the item is in the transparent bucket
    pub fn is_transparent(&self) -> bool {
        self.sort_key.is_transparent()
    }
}

/// Ordered draw list for one camera pass
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    items: Vec<DrawItem>,
    submesh_indices: Vec<u32>,
}

impl DrawList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all items, keeping capacity
    pub fn clear(&mut self) {
        self.items.clear();
        self.submesh_indices.clear();
    }

    /// Items in draw order
    pub fn items(&self) -> &[DrawItem] {
        &self.items
    }

    /// Submesh indices of an item, in model order
    ///
    /// Empty for an item that was not built into this list.
    pub fn submeshes(&self, item: &DrawItem) -> &[u32] {
        self.submesh_indices
            .get(item.submeshes.start as usize..item.submeshes.end as usize)
            .unwrap_or(&[])
    }

    /// Items with their submesh indices, in draw order
    pub fn iter(&self) -> impl Iterator<Item = (&DrawItem, &[u32])> + '_ {
        self.items.iter().map(move |item| (item, self.submeshes(item)))
    }

    /// Number of items (two per visible entity)
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when nothing was visible
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Distinct entities in the list
    pub fn entity_count(&self) -> usize {
        self.items.len() / 2
    }

    /// Total submesh draws in the list
    pub fn submesh_count(&self) -> usize {
        self.submesh_indices.len()
    }

    /// Allocated item capacity
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn push(&mut self, entity: Entity, sort_key: SortKey, submeshes: impl Iterator<Item = u32>) {
        let start = self.submesh_indices.len() as u32;
        self.submesh_indices.extend(submeshes);
        let end = self.submesh_indices.len() as u32;
        self.items.push(DrawItem {
            entity,
            sort_key,
            submeshes: start..end,
        });
    }
}

/// Classifies and sorts culled renderables into a [`DrawList`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DrawListBuilder;

impl DrawListBuilder {
    /// Fill `list` from the survivors of the flag and cull stages
    ///
    /// Depth for the sort key is the view-space z of the entity's origin
    /// under `view`. The list is cleared first.
    #[allow(clippy::cast_possible_truncation)]
    pub fn build<'a>(view: &Mat4, visible: impl IntoIterator<Item = Visible<'a>>, list: &mut DrawList) {
        list.clear();

        for Visible { renderable, .. } in visible {
            let view_z = utils::transform_point(view, &renderable.world_position()).z;
            let submeshes = &renderable.model.submeshes;

            let opaque = submeshes
                .iter()
                .enumerate()
                .filter(|(_, s)| !s.blend_mode.is_transparent())
                .map(|(i, _)| i as u32);
            list.push(renderable.entity, SortKey::opaque(view_z), opaque);

            let transparent = submeshes
                .iter()
                .enumerate()
                .filter(|(_, s)| s.blend_mode.is_transparent())
                .map(|(i, _)| i as u32);
            list.push(renderable.entity, SortKey::transparent(view_z), transparent);
        }

        list.items.sort_by_key(|item| item.sort_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::culling::BoundingSphere;
    use crate::foundation::math::{world_up, Mat4Ext, Transform, Vec3};
    use crate::render::pass::cull;
    use crate::scene::{BindHandle, BlendMode, Model, Scene, Submesh};

    fn mixed_model() -> Model {
        Model::new(
            BoundingSphere::new(Vec3::zeros(), 1.0),
            vec![
                Submesh::opaque(BindHandle(0)),
                Submesh::blended(BlendMode::Alpha, BindHandle(1)),
                Submesh::opaque(BindHandle(2)),
            ],
        )
    }

    fn scene_at(depths: &[f32]) -> (Scene, Vec<Entity>) {
        let mut scene = Scene::new();
        let entities = depths
            .iter()
            .map(|&z| {
                let e = scene.create_entity(Transform::from_position(Vec3::new(0.0, 0.0, z)));
                scene.set_model(e, mixed_model());
                e
            })
            .collect();
        scene.update_transforms();
        (scene, entities)
    }

    fn view() -> Mat4 {
        Mat4::look_at(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0), world_up())
    }

    #[test]
    fn test_opaque_front_to_back_then_transparent_back_to_front() {
        let (scene, e) = scene_at(&[-5.0, -1.0, -10.0]);
        let mut list = DrawList::new();
        DrawListBuilder::build(&view(), cull(scene.renderables(), None), &mut list);

        let order: Vec<(Entity, bool)> = list
            .items()
            .iter()
            .map(|i| (i.entity, i.is_transparent()))
            .collect();
        assert_eq!(
            order,
            vec![
                (e[1], false),
                (e[0], false),
                (e[2], false),
                (e[2], true),
                (e[0], true),
                (e[1], true),
            ]
        );
    }

    #[test]
    fn test_submeshes_split_by_blend_mode() {
        let (scene, _) = scene_at(&[-5.0]);
        let mut list = DrawList::new();
        DrawListBuilder::build(&view(), cull(scene.renderables(), None), &mut list);

        let parts: Vec<&[u32]> = list.iter().map(|(_, s)| s).collect();
        assert_eq!(parts, vec![&[0_u32, 2][..], &[1_u32][..]]);
        assert_eq!(list.submesh_count(), 3);
        assert_eq!(list.entity_count(), 1);
    }

    #[test]
    fn test_empty_model_yields_empty_pair() {
        let mut scene = Scene::new();
        let e = scene.create_entity(Transform::from_position(Vec3::new(0.0, 0.0, -3.0)));
        scene.set_model(e, Model::new(BoundingSphere::new(Vec3::zeros(), 1.0), Vec::new()));
        scene.update_transforms();

        let mut list = DrawList::new();
        DrawListBuilder::build(&view(), cull(scene.renderables(), None), &mut list);

        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|(_, s)| s.is_empty()));
    }

    #[test]
    fn test_equal_depths_keep_scene_order() {
        let (scene, e) = scene_at(&[-4.0, -4.0, -4.0]);
        let mut list = DrawList::new();
        DrawListBuilder::build(&view(), cull(scene.renderables(), None), &mut list);

        let opaque: Vec<Entity> = list
            .items()
            .iter()
            .filter(|i| !i.is_transparent())
            .map(|i| i.entity)
            .collect();
        assert_eq!(opaque, e);
    }

    #[test]
    fn test_rebuild_reuses_storage() {
        let (scene, _) = scene_at(&[-1.0, -2.0, -3.0, -4.0]);
        let mut list = DrawList::new();
        DrawListBuilder::build(&view(), cull(scene.renderables(), None), &mut list);
        let capacity = list.capacity();

        for _ in 0..10 {
            DrawListBuilder::build(&view(), cull(scene.renderables(), None), &mut list);
        }
        assert_eq!(list.capacity(), capacity);
        assert_eq!(list.len(), 8);
    }

    #[test]
    fn test_item_from_another_list_has_no_submeshes() {
        let (large_scene, _) = scene_at(&[-1.0, -2.0, -3.0, -4.0]);
        let mut large = DrawList::new();
        DrawListBuilder::build(&view(), cull(large_scene.renderables(), None), &mut large);

        let (small_scene, _) = scene_at(&[-1.0]);
        let mut small = DrawList::new();
        DrawListBuilder::build(&view(), cull(small_scene.renderables(), None), &mut small);

        let last = large
            .items()
            .iter()
            .max_by_key(|i| i.submeshes.end)
            .unwrap();
        assert!(last.submeshes.end as usize > small.submesh_count());
        assert!(small.submeshes(last).is_empty());
    }
}
