//! Cross-section geometry of an elliptical fiber.
//!
//! The cross-section lives in the local X-Z plane with the hair tangent
//! along +Y. It is parameterized by `gamma`, the polar angle of the unit
//! circle the ellipse is squashed from; the minor semi-axis (scaled by the
//! aspect ratio `b` ≤ 1) lies along +Z and the major semi-axis along +X.
//! `phi` is the actual azimuthal angle of the outward surface normal at a
//! given `gamma`; the two coincide for circular cross-sections.

use strand_core::common::*;
use strand_core::geometry::*;

/// Sine of the inclination of `w` towards the hair tangent.
#[inline]
pub fn sin_theta(w: &Vector3f) -> Float {
    w.y
}

/// Cosine of the inclination of `w` towards the hair tangent.
#[inline]
pub fn cos_theta(w: &Vector3f) -> Float {
    (w.x * w.x + w.z * w.z).sqrt()
}

/// Tangent of the inclination of `w` towards the hair tangent.
#[inline]
pub fn tan_theta(w: &Vector3f) -> Float {
    sin_theta(w) / cos_theta(w)
}

/// Azimuthal angle of `w` around the fiber, measured from +Z towards +X.
#[inline]
pub fn dir_phi(w: &Vector3f) -> Float {
    w.x.atan2(w.z)
}

/// Azimuth of the outward surface normal at circle parameter `gamma`.
///
/// * `gamma` - Circle parameter.
/// * `b`     - Aspect ratio of the cross-section.
#[inline]
pub fn to_phi(gamma: Float, b: Float) -> Float {
    if b == 1.0 {
        return gamma;
    }
    (b * gamma.sin()).atan2(gamma.cos())
}

/// Circle parameter whose surface normal has azimuth `phi`; inverse of
/// `to_phi`.
///
/// * `phi` - Azimuth of the surface normal.
/// * `b`   - Aspect ratio of the cross-section.
#[inline]
pub fn to_gamma(phi: Float, b: Float) -> Float {
    if b == 1.0 {
        return phi;
    }
    phi.sin().atan2(b * phi.cos())
}

/// Point on the cross-section at circle parameter `gamma`, in the (x, z)
/// plane.
///
/// * `gamma` - Circle parameter.
/// * `b`     - Aspect ratio of the cross-section.
#[inline]
pub fn to_point(gamma: Float, b: Float) -> Point2f {
    Point2f::new(gamma.sin(), b * gamma.cos())
}

/// Unit direction with inclination `theta` towards the tangent whose
/// azimuthal component is the outward surface normal at `gamma`. With a
/// non-zero `theta` this is the mesonormal of a tilted cuticle scale.
///
/// * `theta` - Inclination towards the tangent.
/// * `gamma` - Circle parameter.
/// * `b`     - Aspect ratio of the cross-section.
pub fn sphg_dir(theta: Float, gamma: Float, b: Float) -> Vector3f {
    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_gamma, cos_gamma) = gamma.sin_cos();

    let (sin_phi, cos_phi) = if b == 1.0 {
        (sin_gamma, cos_gamma)
    } else {
        // Normalize the unnormalized normal (b sinγ, cosγ) of the ellipse.
        let inv_len = 1.0 / (sqr(b * sin_gamma) + sqr(cos_gamma)).sqrt();
        (b * sin_gamma * inv_len, cos_gamma * inv_len)
    };
    Vector3f::new(sin_phi * cos_theta, sin_theta, cos_phi * cos_theta)
}

/// Differential arc length of the ellipse at `gamma`, the Jacobian that
/// converts integration over the circle parameter into integration over the
/// elliptical arc.
///
/// * `e2`    - Squared eccentricity of the cross-section.
/// * `gamma` - Circle parameter.
#[inline]
pub fn arc_length(e2: Float, gamma: Float) -> Float {
    if e2 == 0.0 {
        1.0
    } else {
        (1.0 - e2 * sqr(gamma.sin())).sqrt()
    }
}

/// Half-width of the cross-section silhouette seen from azimuth `phi`.
///
/// * `e2`  - Squared eccentricity of the cross-section.
/// * `phi` - Viewing azimuth.
#[inline]
pub fn projected_radius(e2: Float, phi: Float) -> Float {
    (1.0 - e2 * sqr(phi.sin())).sqrt()
}
