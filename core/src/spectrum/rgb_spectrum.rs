//! RGB Spectrum.

#![allow(dead_code)]

use crate::common::*;
use std::ops::{Add, AddAssign, Div, Index, Mul, MulAssign, Sub};

/// Number of spectral samples used by `RGBSpectrum`.
pub const RGB_SAMPLES: usize = 3;

/// A spectral power distribution represented by fixed-width red, green and
/// blue samples.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RGBSpectrum {
    /// The sampled spectral values.
    c: [Float; RGB_SAMPLES],
}

impl RGBSpectrum {
    /// A black spectrum.
    pub const ZERO: Self = Self {
        c: [0.0; RGB_SAMPLES],
    };

    /// A unit spectrum.
    pub const ONE: Self = Self {
        c: [1.0; RGB_SAMPLES],
    };

    /// Create a new `RGBSpectrum` with a constant value across all samples.
    ///
    /// * `v` - Constant value.
    pub const fn new(v: Float) -> Self {
        Self {
            c: [v; RGB_SAMPLES],
        }
    }

    /// Create a new `RGBSpectrum` from RGB values.
    ///
    /// * `rgb` - The RGB values.
    pub const fn from_rgb(rgb: [Float; RGB_SAMPLES]) -> Self {
        Self { c: rgb }
    }

    /// Returns the sampled values as RGB.
    pub fn to_rgb(&self) -> [Float; RGB_SAMPLES] {
        self.c
    }

    /// Returns true if all samples are zero.
    pub fn is_black(&self) -> bool {
        self.c.iter().all(|v| *v == 0.0)
    }

    /// Returns true if all samples are finite.
    pub fn is_finite(&self) -> bool {
        self.c.iter().all(|v| v.is_finite())
    }

    /// Takes the square root of all samples.
    pub fn sqrt(&self) -> Self {
        Self {
            c: [self.c[0].sqrt(), self.c[1].sqrt(), self.c[2].sqrt()],
        }
    }

    /// Raises e to the power of each sample.
    pub fn exp(&self) -> Self {
        Self {
            c: [self.c[0].exp(), self.c[1].exp(), self.c[2].exp()],
        }
    }

    /// Clamps all samples between a low and high value.
    ///
    /// * `low`  - The lower bound.
    /// * `high` - The upper bound.
    pub fn clamp(&self, low: Float, high: Float) -> Self {
        Self {
            c: [
                crate::common::clamp(self.c[0], low, high),
                crate::common::clamp(self.c[1], low, high),
                crate::common::clamp(self.c[2], low, high),
            ],
        }
    }

    /// Returns the sum of all samples; used as the scalar energy of a
    /// spectral quantity.
    pub fn channel_sum(&self) -> Float {
        self.c.iter().sum()
    }

    /// Returns the largest sample.
    pub fn max_component_value(&self) -> Float {
        self.c.iter().fold(Float::NEG_INFINITY, |a, b| max(a, *b))
    }

    /// Returns the y-coefficient of XYZ colour.
    pub fn y(&self) -> Float {
        0.212671 * self.c[0] + 0.715160 * self.c[1] + 0.072169 * self.c[2]
    }
}

impl Add for RGBSpectrum {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            c: [
                self.c[0] + other.c[0],
                self.c[1] + other.c[1],
                self.c[2] + other.c[2],
            ],
        }
    }
}

impl AddAssign for RGBSpectrum {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for RGBSpectrum {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            c: [
                self.c[0] - other.c[0],
                self.c[1] - other.c[1],
                self.c[2] - other.c[2],
            ],
        }
    }
}

impl Mul for RGBSpectrum {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        Self {
            c: [
                self.c[0] * other.c[0],
                self.c[1] * other.c[1],
                self.c[2] * other.c[2],
            ],
        }
    }
}

impl MulAssign for RGBSpectrum {
    fn mul_assign(&mut self, other: Self) {
        *self = *self * other;
    }
}

impl Mul<Float> for RGBSpectrum {
    type Output = Self;

    fn mul(self, s: Float) -> Self {
        Self {
            c: [self.c[0] * s, self.c[1] * s, self.c[2] * s],
        }
    }
}

impl Mul<RGBSpectrum> for Float {
    type Output = RGBSpectrum;

    fn mul(self, s: RGBSpectrum) -> RGBSpectrum {
        s * self
    }
}

impl Div for RGBSpectrum {
    type Output = Self;

    fn div(self, other: Self) -> Self {
        Self {
            c: [
                self.c[0] / other.c[0],
                self.c[1] / other.c[1],
                self.c[2] / other.c[2],
            ],
        }
    }
}

impl Div<Float> for RGBSpectrum {
    type Output = Self;

    fn div(self, s: Float) -> Self {
        debug_assert!(s != 0.0);
        let inv = 1.0 / s;
        Self {
            c: [self.c[0] * inv, self.c[1] * inv, self.c[2] * inv],
        }
    }
}

impl Index<usize> for RGBSpectrum {
    type Output = Float;

    fn index(&self, i: usize) -> &Float {
        &self.c[i]
    }
}
