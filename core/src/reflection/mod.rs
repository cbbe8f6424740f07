//! Reflection and refraction primitives.

mod fresnel;

// Re-export
pub use fresnel::*;

use bitflags::bitflags;

bitflags! {
    /// Capability tags the host dispatch layer inspects on a closure.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct BxdfFlags: u8 {
        const REFLECTION = 1 << 0;
        const TRANSMISSION = 1 << 1;
        const GLOSSY = 1 << 2;
        const TRANSPARENT = 1 << 3;
    }
}
