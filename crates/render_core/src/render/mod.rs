//! Visibility and draw order
//!
//! One parameterized pipeline serves the final, reflection and shadow passes:
//! flag filter, cull, classify, sort. The [`ScenePipeline`] runs it per camera
//! each frame and hands the results to a [`DrawSubmitter`].

mod cascade;
mod draw_list;
mod pass;
mod scene_pipeline;
mod shadow;
mod sort_key;

#[cfg(test)]
mod pipeline_tests;

pub use cascade::{frustum_corners, Cascade, CascadePartitioner, IterativeSplit, PracticalSplit, SplitScheme};
pub use draw_list::{DrawItem, DrawList, DrawListBuilder};
pub use pass::{cull, filter_by_flags, PassKind, PassView, Visible};
pub use scene_pipeline::{DrawSubmitter, FrameStats, ScenePipeline};
pub use shadow::{collect_casters, CascadeScheduler, ShadowCaster};
pub use sort_key::SortKey;
