//! Scene data consumed by the render core
//!
//! The scene is the transform provider and the mesh/material provider for the
//! pipeline: it owns the entity hierarchy, each entity's model description,
//! the cameras and the sunlight. Rendering never mutates it beyond assigning
//! draw-list indices to cameras.

mod camera;
mod entity;
mod flags;
mod light;
mod model;
mod scene_graph;

pub use camera::{Camera, Viewport};
pub use entity::Entity;
pub use flags::RenderFlags;
pub use light::DirectionalLight;
pub use model::{BindHandle, BlendMode, Model, Submesh};
pub use scene_graph::{Renderable, Scene};
