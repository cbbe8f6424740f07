//! Physically-based scattering for elliptical hair and fur fibers.
//!
//! The closure models a dielectric fiber with a tilted cuticle and an
//! elliptical cross-section. Light transport through the fiber is split into
//! a direct reflection lobe, single and double internal transmission paths,
//! and an aggregated tail for all deeper bounces. Evaluation combines
//! composite Simpson quadrature over the visible azimuth with stochastic
//! micronormal sampling of the rough interfaces; importance sampling selects
//! one of the four paths with probability proportional to its energy and
//! folds the weight into the returned value so the reported pdf is constant.

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

mod albedo;
mod closure;
mod ellipse;
mod energy;
mod eval;
mod longitudinal;
mod sample;

// Re-export
pub use closure::*;
pub use ellipse::*;
pub use energy::*;
pub use sample::*;
