//! Pipeline configuration
//!
//! Tunables for the geometry arena, the shadow cascades and culling. Every
//! section falls back to its defaults when omitted from a config file.

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};

/// Geometry arena layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Vertices per allocation block
    pub block_size: usize,
    /// Bytes per vertex
    pub stride_bytes: usize,
    /// Minimum number of blocks the backing buffer grows by
    pub growth_blocks: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            block_size: 64,
            stride_bytes: 32,
            growth_blocks: 1024,
        }
    }
}

impl ArenaConfig {
    /// Bytes covered by one block
    pub fn block_size_bytes(&self) -> usize {
        self.block_size * self.stride_bytes
    }
}

/// How the shadow range is divided between cascades
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SplitSchemeConfig {
    /// Walk from the far end shrinking the remaining span by `ratio` per split
    Iterative {
        /// Span multiplier per step, in (0, 1)
        ratio: f32,
    },
    /// Blend of logarithmic and uniform splits
    Practical {
        /// 0 = uniform, 1 = logarithmic
        lambda: f32,
    },
}

impl Default for SplitSchemeConfig {
    fn default() -> Self {
        Self::Iterative { ratio: 0.5 }
    }
}

/// Cascaded shadow map settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Number of cascades per camera
    pub cascade_count: usize,
    /// Split distance scheme
    pub split_scheme: SplitSchemeConfig,
    /// Light-space X/Y padding added to each cascade's projection
    pub overlap: f32,
    /// Light-space Z padding so casters behind the frustum still render
    pub z_expansion: f32,
    /// Frames between forced recomputes of an unchanged camera's cascades
    pub recompute_interval: u32,
}

impl ShadowConfig {
    /// Largest accepted `cascade_count`
    pub const MAX_CASCADES: usize = 16;
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            cascade_count: 3,
            split_scheme: SplitSchemeConfig::default(),
            overlap: 2.0,
            z_expansion: 10.0,
            recompute_interval: 1,
        }
    }
}

/// Culling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CullingConfig {
    /// Disable to send every flagged entity to the classify stage
    pub enable_frustum_culling: bool,
    /// Height of the horizontal plane the reflection pass mirrors about
    pub reflection_plane_height: f32,
}

impl Default for CullingConfig {
    fn default() -> Self {
        Self {
            enable_frustum_culling: true,
            reflection_plane_height: 0.0,
        }
    }
}

/// Top-level configuration for the scene pipeline
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Geometry arena layout
    pub arena: ArenaConfig,
    /// Shadow cascades
    pub shadows: ShadowConfig,
    /// Culling
    pub culling: CullingConfig,
}

impl Config for PipelineConfig {}

impl PipelineConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.arena.block_size == 0 || self.arena.stride_bytes == 0 {
            return invalid("arena block size and stride must be non-zero");
        }
        if self.arena.growth_blocks == 0 {
            return invalid("arena growth must be at least one block");
        }
        if self.shadows.cascade_count == 0 {
            return invalid("at least one shadow cascade is required");
        }
        if self.shadows.cascade_count > ShadowConfig::MAX_CASCADES {
            return invalid("too many shadow cascades");
        }
        match self.shadows.split_scheme {
            SplitSchemeConfig::Iterative { ratio } if !(ratio > 0.0 && ratio < 1.0) => {
                return invalid("iterative split ratio must be in (0, 1)");
            }
            SplitSchemeConfig::Practical { lambda } if !(0.0..=1.0).contains(&lambda) => {
                return invalid("practical split lambda must be in [0, 1]");
            }
            _ => {}
        }
        if self.shadows.overlap < 0.0 || self.shadows.z_expansion < 0.0 {
            return invalid("cascade padding cannot be negative");
        }
        if self.shadows.recompute_interval == 0 {
            return invalid("cascade recompute interval must be at least one frame");
        }

        Ok(())
    }
}
