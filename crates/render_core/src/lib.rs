//! # Render Core
//!
//! The visibility and draw-order core of the engine's scene renderer, plus the
//! block-based arena that sub-allocates vertex storage out of one growable GPU
//! buffer.
//!
//! ## Features
//!
//! - **Frustum Culling**: Plane extraction from a view-projection matrix and
//!   sphere classification, shared by every pass
//! - **Draw Lists**: Cull, classify and sort entities into an ordered list with
//!   opaque geometry front-to-back ahead of transparent geometry back-to-front
//! - **Cascaded Shadows**: Split the camera frustum into light-space
//!   orthographic cascades and collect the casters for each one
//! - **Geometry Arena**: First-fit block allocation with full free-block
//!   coalescing and grow-by-copy of the backing buffer
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use render_core::prelude::*;
//!
//! let config = PipelineConfig::default();
//! let mut scene = Scene::new();
//! scene.set_sunlight(DirectionalLight::new(Vec3::new(-0.3, -1.0, -0.2)));
//!
//! let camera = scene.create_entity(Transform::identity());
//! scene.set_camera(camera, Camera::default());
//!
//! let mut pipeline = ScenePipeline::new(config).expect("invalid config");
//! pipeline.simulate(&mut scene).expect("malformed scene");
//! ```
//!
//! Everything here runs on the thread that owns the scene. A frame is
//! `simulate` (cull, build draw lists, recompute cascades) followed by
//! `render` (hand the lists to a [`render::DrawSubmitter`]).

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod culling;
pub mod foundation;
pub mod memory;
pub mod render;
pub mod scene;

mod error;

pub use error::{ArenaError, CascadeError, PipelineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, PipelineConfig, ArenaConfig, ShadowConfig, CullingConfig},
        culling::{BoundingSphere, Frustum, FrustumCuller, Plane, Classification},
        foundation::math::{Mat4, Mat4Ext, Point3, Quat, Transform, Vec3, Vec4},
        memory::{Allocation, BufferId, GeometryArena, GpuBuffer, HostBuffer, VaoAllocator},
        render::{
            Cascade, CascadePartitioner, DrawItem, DrawList, DrawListBuilder, DrawSubmitter,
            PassKind, ScenePipeline, SortKey,
        },
        scene::{BlendMode, Camera, DirectionalLight, Entity, Model, RenderFlags, Scene, Submesh},
        ArenaError, CascadeError, PipelineError,
    };
}
