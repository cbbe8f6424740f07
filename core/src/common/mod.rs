//! Common numeric types and scalar helpers.

mod clamp;
mod scalar;

// Re-export
pub use clamp::*;
pub use scalar::*;
