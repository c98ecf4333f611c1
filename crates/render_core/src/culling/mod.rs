//! Visibility culling
//!
//! One stateless [`FrustumCuller`] serves every pass: the final and
//! reflection draw lists use it directly and the shadow pass uses the same
//! bounding spheres for its light-space tests.

mod bounds;
mod frustum;

pub use bounds::{is_degenerate_scale, BoundingSphere};
pub use frustum::{Classification, Frustum, FrustumCuller, Plane};
