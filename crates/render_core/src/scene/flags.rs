//! Render flag bitsets
//!
//! Entities and cameras both carry a 64-bit set; an entity is drawn by a
//! camera's pass only when the two sets share at least one bit.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Render flag bitset
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RenderFlags: u64 {
        /// Ordinary scene geometry
        const DEFAULT = 1 << 0;
        /// Geometry that only appears in some cameras (mini-maps, overlays)
        const SECONDARY = 1 << 1;
        /// Set on geometry that must never appear in a reflection, such as
        /// the water plane doing the reflecting
        const REFLECTION_HIDDEN = 1 << 63;
    }
}

impl RenderFlags {
    /// Mask used by the reflection pass: everything but the top bit
    pub const REFLECTION_MASK: Self = Self::from_bits_retain(u64::MAX >> 1);

    /// Whether an entity with these flags passes a camera/pass filter
    pub fn passes(self, camera: Self, pass_mask: Self) -> bool {
        self.intersects(camera & pass_mask)
    }
}

impl Default for RenderFlags {
    fn default() -> Self {
        Self::all()
    }
}
