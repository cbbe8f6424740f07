//! Fresnel dielectrics and direction helpers.

#![allow(dead_code)]

use crate::common::*;
use crate::geometry::*;

/// Fresnel reflectance for a dielectric interface and unpolarized light,
/// together with the cosine of the refracted direction (zero under total
/// internal reflection).
///
/// * `cos_theta_i` - cos(θi) between the incident direction and the surface
///                   normal; negative values are treated as hitting the
///                   interface from the far side.
/// * `eta`         - Relative index of refraction of the medium being
///                   entered.
pub fn fresnel_dielectric(cos_theta_i: Float, eta: Float) -> (Float, Float) {
    let mut cos_theta_i = clamp(cos_theta_i, -1.0, 1.0);
    let mut eta = eta;
    if cos_theta_i < 0.0 {
        eta = 1.0 / eta;
        cos_theta_i = -cos_theta_i;
    }

    // Compute cos(θt) using Snell's law; handle total internal reflection.
    let sin2_theta_t = (1.0 - cos_theta_i * cos_theta_i) / (eta * eta);
    if sin2_theta_t >= 1.0 {
        return (1.0, 0.0);
    }
    let cos_theta_t = (1.0 - sin2_theta_t).sqrt();

    let r_parl = (eta * cos_theta_i - cos_theta_t) / (eta * cos_theta_i + cos_theta_t);
    let r_perp = (cos_theta_i - eta * cos_theta_t) / (cos_theta_i + eta * cos_theta_t);
    (
        0.5 * (r_parl * r_parl + r_perp * r_perp),
        cos_theta_t,
    )
}

/// Fresnel reflectance for a dielectric interface, discarding the refracted
/// cosine.
///
/// * `cos_theta_i` - cos(θi) between the incident direction and the surface
///                   normal.
/// * `eta`         - Relative index of refraction of the medium being
///                   entered.
#[inline]
pub fn fresnel_dielectric_cos(cos_theta_i: Float, eta: Float) -> Float {
    fresnel_dielectric(cos_theta_i, eta).0
}

/// Reflects a direction about a normal. Both `w` and the result point away
/// from the surface.
///
/// * `w` - Direction to reflect.
/// * `m` - The normal.
#[inline]
pub fn reflect(w: &Vector3f, m: &Vector3f) -> Vector3f {
    *m * (2.0 * w.dot(m)) - *w
}

/// Refracted direction through an interface, returned along the direction of
/// propagation. The caller supplies the refracted cosine from
/// `fresnel_dielectric` so total internal reflection has already been ruled
/// out.
///
/// * `w`           - Incident direction, pointing away from the surface on
///                   the same side as `m`.
/// * `m`           - The normal, on the incident side.
/// * `cos_theta_t` - Cosine of the refracted direction.
/// * `eta_ratio`   - Ratio of the incident to the transmitted index of
///                   refraction.
#[inline]
pub fn refract(w: &Vector3f, m: &Vector3f, cos_theta_t: Float, eta_ratio: Float) -> Vector3f {
    *w * -eta_ratio + *m * (eta_ratio * w.dot(m) - cos_theta_t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn normal_incidence_reflectance() {
        // ((η - 1) / (η + 1))² at normal incidence.
        let (f, cos_t) = fresnel_dielectric(1.0, 1.5);
        assert!(approx_eq!(f32, f, 0.04, epsilon = 1e-4));
        assert!(approx_eq!(f32, cos_t, 1.0, epsilon = 1e-6));
    }

    #[test]
    fn grazing_incidence_reflects_everything() {
        let (f, _) = fresnel_dielectric(1e-6, 1.5);
        assert!(f > 0.99);
    }

    #[test]
    fn total_internal_reflection() {
        // Leaving a dense medium below the critical angle.
        let critical = (1.0f32 / 1.5).asin();
        let (f, cos_t) = fresnel_dielectric((critical - 0.05).sin(), 1.0 / 1.5);
        assert_eq!(f, 1.0);
        assert_eq!(cos_t, 0.0);
    }

    #[test]
    fn reflect_preserves_angle() {
        let m = Vector3f::new(0.0, 0.0, 1.0);
        let w = Vector3f::new(0.5, 0.3, 0.8).normalize();
        let r = reflect(&w, &m);
        assert!(approx_eq!(f32, r.z, w.z, epsilon = 1e-6));
        assert!(approx_eq!(f32, r.x, -w.x, epsilon = 1e-6));
        assert!(approx_eq!(f32, r.length(), 1.0, epsilon = 1e-6));
    }

    #[test]
    fn refract_obeys_snells_law() {
        let m = Vector3f::new(0.0, 0.0, 1.0);
        let w = Vector3f::new(0.4, 0.0, 0.916_515_1).normalize();
        let eta = 1.5;
        let (_, cos_theta_t) = fresnel_dielectric(w.z, eta);
        let wt = refract(&w, &m, cos_theta_t, 1.0 / eta);
        assert!(approx_eq!(f32, wt.length(), 1.0, epsilon = 1e-5));
        // Transmitted ray continues to the far side of the interface.
        assert!(wt.z < 0.0);
        // sin(θt) = sin(θi) / η.
        let sin_i = (w.x * w.x + w.y * w.y).sqrt();
        let sin_t = (wt.x * wt.x + wt.y * wt.y).sqrt();
        assert!(approx_eq!(f32, sin_t, sin_i / eta, epsilon = 1e-5));
    }
}
