//! Draw order keys
//!
//! One signed integer orders a whole draw list: every opaque key sorts below
//! every transparent key, opaque keys run front-to-back and transparent keys
//! back-to-front.

/// Orderable draw key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SortKey(pub i64);

impl SortKey {
    /// Offset added to every transparent key
    pub const TRANSPARENT_BIAS: i64 = 0x0FFF_0000_0000_0000;

    /// Fixed-point scale applied to view-space depth
    pub const DEPTH_SCALE: f64 = 1.0e6;

    /// Depth magnitude beyond which keys saturate
    pub const DEPTH_LIMIT: f64 = 1.0e9;

    /// Key for opaque geometry at view-space depth `view_z`
    ///
    /// The camera looks down -Z, so larger distances give larger keys.
    pub fn opaque(view_z: f32) -> Self {
        Self(-Self::scaled_depth(view_z))
    }

    /// Key for blended geometry at view-space depth `view_z`
    pub fn transparent(view_z: f32) -> Self {
        Self(Self::scaled_depth(view_z) + Self::TRANSPARENT_BIAS)
    }

    /// Whether this key belongs to the transparent bucket
    pub fn is_transparent(self) -> bool {
        self.0 >= Self::TRANSPARENT_BIAS / 2
    }

    #[allow(clippy::cast_possible_truncation)]
    fn scaled_depth(view_z: f32) -> i64 {
        if view_z.is_nan() {
            return 0;
        }
        (f64::from(view_z).clamp(-Self::DEPTH_LIMIT, Self::DEPTH_LIMIT) * Self::DEPTH_SCALE) as i64
    }
}
