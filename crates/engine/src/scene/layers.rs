use bitflags::bitflags;

bitflags! {
    /// Render passes an entity's subtree is eligible for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LayerMask: u32 {
        const DEFAULT = 1 << 0;
        const BACKGROUND = 1 << 1;
        const UI = 1 << 2;
        const DEBUG = 1 << 3;
        const ALL = u32::MAX;
    }
}

pub const MAX_LAYERS: u32 = u32::BITS;

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::DEFAULT
    }
}

impl LayerMask {
    /// Single-bit mask for a user-defined layer index.
    pub fn layer(index: u32) -> Self {
        debug_assert!(index < MAX_LAYERS, "layer index {index} out of range");
        LayerMask::from_bits_retain(1u32.checked_shl(index).unwrap_or(0))
    }

    pub fn is_drawn_by(self, filter: LayerMask) -> bool {
        self.intersects(filter)
    }
}
