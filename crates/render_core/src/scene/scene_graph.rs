//! Scene storage and transform hierarchy
//!
//! Entities live in a slot map. Each may have a parent; world matrices and
//! world scale are resolved down the parent chain by
//! [`Scene::update_transforms`], which the pipeline runs before culling.

use slotmap::{SecondaryMap, SlotMap};

use crate::foundation::math::{Mat4, Transform, Vec3};
use crate::scene::{Camera, DirectionalLight, Entity, Model};

#[derive(Debug, Clone)]
struct Node {
    transform: Transform,
    parent: Option<Entity>,
    world: Mat4,
    world_scale: Vec3,
    model: Option<Model>,
    camera: Option<Camera>,
}

impl Node {
    fn new(transform: Transform, parent: Option<Entity>) -> Self {
        let world = transform.to_matrix();
        let world_scale = transform.scale;
        Self {
            transform,
            parent,
            world,
            world_scale,
            model: None,
            camera: None,
        }
    }
}

/// A renderable entity as seen by the culling stages
#[derive(Debug, Clone, Copy)]
pub struct Renderable<'a> {
    /// The entity
    pub entity: Entity,
    /// Resolved world matrix
    pub world: &'a Mat4,
    /// Resolved world scale (product of the scale chain)
    pub world_scale: Vec3,
    /// The entity's model
    pub model: &'a Model,
}

impl Renderable<'_> {
    /// World-space position of the entity's origin
    pub fn world_position(&self) -> Vec3 {
        self.world.fixed_view::<3, 1>(0, 3).into_owned()
    }
}

/// Scene graph
#[derive(Debug, Default)]
pub struct Scene {
    nodes: SlotMap<Entity, Node>,
    sunlight: Option<DirectionalLight>,
    transforms_dirty: bool,
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a root entity
    pub fn create_entity(&mut self, transform: Transform) -> Entity {
        self.transforms_dirty = true;
        self.nodes.insert(Node::new(transform, None))
    }

    /// Create an entity parented to `parent`
    ///
    /// Returns `None` if the parent does not exist.
    pub fn create_child(&mut self, parent: Entity, transform: Transform) -> Option<Entity> {
        if !self.nodes.contains_key(parent) {
            return None;
        }
        self.transforms_dirty = true;
        Some(self.nodes.insert(Node::new(transform, Some(parent))))
    }

    /// Destroy an entity, re-parenting its children to its own parent
    ///
    /// Returns the entity's model so the caller can release its geometry.
    pub fn destroy_entity(&mut self, entity: Entity) -> Option<Model> {
        let node = self.nodes.remove(entity)?;
        for (_, child) in &mut self.nodes {
            if child.parent == Some(entity) {
                child.parent = node.parent;
            }
        }
        self.transforms_dirty = true;
        log::debug!("Destroyed entity {:?}", entity);
        node.model
    }

    /// Whether the entity exists
    pub fn contains(&self, entity: Entity) -> bool {
        self.nodes.contains_key(entity)
    }

    /// Number of entities
    pub fn entity_count(&self) -> usize {
        self.nodes.len()
    }

    /// Local transform of an entity
    pub fn transform(&self, entity: Entity) -> Option<&Transform> {
        self.nodes.get(entity).map(|n| &n.transform)
    }

    /// Replace an entity's local transform
    pub fn set_transform(&mut self, entity: Entity, transform: Transform) {
        if let Some(node) = self.nodes.get_mut(entity) {
            node.transform = transform;
            self.transforms_dirty = true;
        }
    }

    /// Resolved world matrix (as of the last transform update)
    pub fn world_matrix(&self, entity: Entity) -> Option<&Mat4> {
        self.nodes.get(entity).map(|n| &n.world)
    }

    /// Resolved world scale (as of the last transform update)
    pub fn world_scale(&self, entity: Entity) -> Option<Vec3> {
        self.nodes.get(entity).map(|n| n.world_scale)
    }

    /// Attach or replace an entity's model
    pub fn set_model(&mut self, entity: Entity, model: Model) {
        if let Some(node) = self.nodes.get_mut(entity) {
            node.model = Some(model);
        }
    }

    /// Model of an entity
    pub fn model(&self, entity: Entity) -> Option<&Model> {
        self.nodes.get(entity)?.model.as_ref()
    }

    /// Mutable model of an entity
    pub fn model_mut(&mut self, entity: Entity) -> Option<&mut Model> {
        self.nodes.get_mut(entity)?.model.as_mut()
    }

    /// Attach or replace an entity's camera
    pub fn set_camera(&mut self, entity: Entity, camera: Camera) {
        if let Some(node) = self.nodes.get_mut(entity) {
            node.camera = Some(camera);
        }
    }

    /// Camera of an entity
    pub fn camera(&self, entity: Entity) -> Option<&Camera> {
        self.nodes.get(entity)?.camera.as_ref()
    }

    /// Mutable camera of an entity
    pub fn camera_mut(&mut self, entity: Entity) -> Option<&mut Camera> {
        self.nodes.get_mut(entity)?.camera.as_mut()
    }

    /// Entities carrying an active camera, in storage order
    pub fn active_cameras(&self) -> Vec<Entity> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.camera.as_ref().is_some_and(|c| c.active))
            .map(|(e, _)| e)
            .collect()
    }

    /// Set the scene's sunlight
    pub fn set_sunlight(&mut self, light: DirectionalLight) {
        self.sunlight = Some(light);
    }

    /// The scene's sunlight, if any
    pub fn sunlight(&self) -> Option<&DirectionalLight> {
        self.sunlight.as_ref()
    }

    /// Every entity with a model, with resolved world data
    pub fn renderables(&self) -> impl Iterator<Item = Renderable<'_>> {
        self.nodes.iter().filter_map(|(entity, node)| {
            node.model.as_ref().map(|model| Renderable {
                entity,
                world: &node.world,
                world_scale: node.world_scale,
                model,
            })
        })
    }

    /// Resolve world matrices and scales if any transform changed
    pub fn update_transforms(&mut self) {
        if !self.transforms_dirty {
            return;
        }

        let mut resolved: SecondaryMap<Entity, (Mat4, Vec3)> = SecondaryMap::with_capacity(self.nodes.len());
        let keys: Vec<Entity> = self.nodes.keys().collect();
        let mut chain = Vec::new();

        for entity in keys {
            // walk up to the first resolved ancestor (or the root)
            chain.clear();
            let mut current = Some(entity);
            while let Some(e) = current {
                if resolved.contains_key(e) {
                    break;
                }
                chain.push(e);
                current = self.nodes.get(e).and_then(|n| n.parent);
            }

            let mut parent_world = current.and_then(|e| resolved.get(e).copied());
            for &e in chain.iter().rev() {
                let local = &self.nodes[e].transform;
                let world = match parent_world {
                    Some((matrix, scale)) => (matrix * local.to_matrix(), scale.component_mul(&local.scale)),
                    None => (local.to_matrix(), local.scale),
                };
                resolved.insert(e, world);
                parent_world = Some(world);
            }
        }

        for (entity, (world, scale)) in resolved {
            if let Some(node) = self.nodes.get_mut(entity) {
                node.world = world;
                node.world_scale = scale;
            }
        }

        self.transforms_dirty = false;
    }
}
