//! Math foundation for the strand hair scattering library.

#[macro_use]
extern crate hexf;

// Re-export.
pub mod common;
pub mod geometry;
pub mod microfacet;
pub mod reflection;
pub mod rng;
pub mod spectrum;
