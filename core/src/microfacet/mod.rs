//! Isotropic GGX (Trowbridge-Reitz) microfacet distribution.
//!
//! The distribution functions are expressed over `alpha2` and cosines so
//! they can be evaluated around an arbitrary mean normal, not just the +Z
//! axis of a flat shading frame.

#![allow(dead_code)]

use crate::common::*;
use crate::geometry::*;

/// Differential area of microfacets whose normal makes the given cosine with
/// the mean normal.
///
/// * `alpha2` - Squared roughness parameter.
/// * `cos_nh` - Cosine between mean normal and micronormal.
#[inline]
pub fn ggx_d(alpha2: Float, cos_nh: Float) -> Float {
    if cos_nh <= 0.0 {
        return 0.0;
    }
    let t = cos_nh * cos_nh * (alpha2 - 1.0) + 1.0;
    alpha2 / (PI * t * t)
}

/// Smith masking term for a single direction.
///
/// * `alpha2` - Squared roughness parameter.
/// * `cos_n`  - Cosine between mean normal and the direction.
#[inline]
pub fn ggx_g1(alpha2: Float, cos_n: Float) -> Float {
    if cos_n <= 0.0 {
        return 0.0;
    }
    2.0 * cos_n / (cos_n + (alpha2 + (1.0 - alpha2) * cos_n * cos_n).sqrt())
}

/// Separable Smith shadowing-masking for an incident/outgoing pair.
///
/// * `alpha2` - Squared roughness parameter.
/// * `cos_ni` - Cosine between mean normal and incident direction.
/// * `cos_no` - Cosine between mean normal and outgoing direction.
#[inline]
pub fn ggx_g(alpha2: Float, cos_ni: Float, cos_no: Float) -> Float {
    ggx_g1(alpha2, cos_ni) * ggx_g1(alpha2, cos_no)
}

/// Samples a micronormal from the distribution of visible normals. `w` is
/// given in the frame whose +Z axis is the mean normal.
///
/// * `w`     - Direction the surface is seen from, in the mean-normal frame.
/// * `alpha` - Roughness parameter.
/// * `u1`    - Uniform random value.
/// * `u2`    - Uniform random value.
pub fn ggx_sample_vndf(w: Vector3f, alpha: Float, u1: Float, u2: Float) -> Vector3f {
    let flip = w.z < 0.0;
    let w = if flip { -w } else { w };

    // 1. Stretch.
    let w_stretched = Vector3f::new(alpha * w.x, alpha * w.y, w.z).normalize();

    // 2. Sample the slopes for a unit-roughness surface.
    let (slope_x, slope_y) = ggx_sample_11(w_stretched.z, u1, u2);

    // 3. Rotate into the azimuth of the stretched direction.
    let r = (w_stretched.x * w_stretched.x + w_stretched.y * w_stretched.y).sqrt();
    let (cos_phi, sin_phi) = if r > 0.0 {
        (w_stretched.x / r, w_stretched.y / r)
    } else {
        (1.0, 0.0)
    };
    let rotated_x = cos_phi * slope_x - sin_phi * slope_y;
    let rotated_y = sin_phi * slope_x + cos_phi * slope_y;

    // 4. Unstretch.
    let slope_x = alpha * rotated_x;
    let slope_y = alpha * rotated_y;

    // 5. Compute the normal.
    let wh = Vector3f::new(-slope_x, -slope_y, 1.0).normalize();
    if flip {
        -wh
    } else {
        wh
    }
}

/// Samples the visible micronormal around an arbitrary mean normal `wm`.
///
/// * `alpha` - Roughness parameter.
/// * `w`     - Direction the surface is seen from.
/// * `wm`    - Mean normal.
/// * `u1`    - Uniform random value.
/// * `u2`    - Uniform random value.
pub fn sample_wh(alpha: Float, w: Vector3f, wm: Vector3f, u1: Float, u2: Float) -> Vector3f {
    let (s, t) = coordinate_system(&wm);
    let w_local = Vector3f::new(w.dot(&s), w.dot(&t), w.dot(&wm));
    let wh = ggx_sample_vndf(w_local, alpha, u1, u2);
    s * wh.x + t * wh.y + wm * wh.z
}

/// Samples the slopes of a unit-roughness visible-normal distribution.
///
/// * `cos_theta` - Cosine of the angle between the stretched direction and
///                 the mean normal.
/// * `u1`        - Uniform random value.
/// * `u2`        - Uniform random value.
fn ggx_sample_11(cos_theta: Float, u1: Float, u2: Float) -> (Float, Float) {
    // Special case (normal incidence).
    if cos_theta > 0.9999 {
        let r = (u1 / (1.0 - u1)).sqrt();
        let phi = TWO_PI * u2;
        return (r * phi.cos(), r * phi.sin());
    }

    let sin_theta = safe_sqrt(1.0 - cos_theta * cos_theta);
    let tan_theta = sin_theta / cos_theta;
    let a = 1.0 / tan_theta;
    let g1 = 2.0 / (1.0 + (1.0 + 1.0 / (a * a)).sqrt());

    // Sample slope_x.
    let a = 2.0 * u1 / g1 - 1.0;
    let mut tmp = 1.0 / (a * a - 1.0);
    if tmp > 1e10 {
        tmp = 1e10;
    }

    let b = tan_theta;
    let d = safe_sqrt(b * b * tmp * tmp - (a * a - b * b) * tmp);
    let slope_x_1 = b * tmp - d;
    let slope_x_2 = b * tmp + d;
    let slope_x = if a < 0.0 || slope_x_2 > 1.0 / tan_theta {
        slope_x_1
    } else {
        slope_x_2
    };

    // Sample slope_y.
    let (s, u2) = if u2 > 0.5 {
        (1.0, 2.0 * (u2 - 0.5))
    } else {
        (-1.0, 2.0 * (0.5 - u2))
    };
    let z = (u2 * (u2 * (u2 * 0.27385 - 0.73369) + 0.46341))
        / (u2 * (u2 * (u2 * 0.093073 + 0.309420) - 1.000000) + 0.597999);
    let slope_y = s * z * (1.0 + slope_x * slope_x).sqrt();

    debug_assert!(slope_y.is_finite());

    (slope_x, slope_y)
}
