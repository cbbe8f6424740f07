//! Longitudinal scattering lobe.
//!
//! Gaussian-like distribution over the outgoing inclination used for the
//! aggregated tail of deep internal bounces. Follows the standard rough
//! fiber formulation with a log-space branch for small variances where the
//! direct expression underflows.

use strand_core::common::*;
use strand_core::rng::ONE_MINUS_EPSILON;

/// Modified Bessel function of the first kind, order zero.
fn bessel_i0(x: Float) -> Float {
    let mut val = 0.0;
    let mut x2i = 1.0;
    let mut ifact = 1.0;
    let mut i4: i64 = 1;
    for i in 0..10 {
        if i > 1 {
            ifact *= i as Float;
        }
        val += x2i / (i4 as Float * sqr(ifact));
        x2i *= x * x;
        i4 *= 4;
    }
    val
}

/// Logarithm of `bessel_i0`, stable for large arguments.
fn log_bessel_i0(x: Float) -> Float {
    if x > 12.0 {
        x + 0.5 * (-(TWO_PI).ln() + (1.0 / x).ln() + 1.0 / (8.0 * x))
    } else {
        bessel_i0(x).ln()
    }
}

/// Longitudinal scattering distribution with variance `v`, evaluated for an
/// incident/outgoing pair of inclinations. Normalized so the integral over
/// the projected outgoing inclination is one.
///
/// * `sin_theta_i` - Sine of the incident inclination.
/// * `cos_theta_i` - Cosine of the incident inclination.
/// * `sin_theta_o` - Sine of the outgoing inclination.
/// * `cos_theta_o` - Cosine of the outgoing inclination.
/// * `v`           - Variance of the lobe.
pub fn longitudinal_scattering(
    sin_theta_i: Float,
    cos_theta_i: Float,
    sin_theta_o: Float,
    cos_theta_o: Float,
    v: Float,
) -> Float {
    let a = cos_theta_i * cos_theta_o / v;
    let b = sin_theta_i * sin_theta_o / v;
    let m = if v <= 0.1 {
        (log_bessel_i0(a) - b - 1.0 / v + 0.6931 + (1.0 / (2.0 * v)).ln()).exp()
    } else {
        (-b).exp() * bessel_i0(a) / ((1.0 / v).sinh() * 2.0 * v)
    };
    debug_assert!(m.is_finite() && m >= 0.0);
    m
}

/// Samples an outgoing inclination from the longitudinal lobe around the
/// incident inclination. Returns (sin, cos) of the sampled angle.
///
/// * `u1`          - Uniform random value.
/// * `u2`          - Uniform random value.
/// * `sin_theta_i` - Sine of the incident inclination.
/// * `cos_theta_i` - Cosine of the incident inclination.
/// * `v`           - Variance of the lobe.
pub fn sample_longitudinal(
    u1: Float,
    u2: Float,
    sin_theta_i: Float,
    cos_theta_i: Float,
    v: Float,
) -> (Float, Float) {
    // Keep the logarithm away from zero.
    let u1 = clamp(u1, 1e-5, ONE_MINUS_EPSILON);
    let cos_theta = 1.0 + v * (u1 + (1.0 - u1) * (-2.0 / v).exp()).ln();
    let sin_theta = safe_sqrt(1.0 - sqr(cos_theta));
    let cos_phi = (TWO_PI * u2).cos();
    let sin_theta_o = -cos_theta * sin_theta_i + sin_theta * cos_phi * cos_theta_i;
    let cos_theta_o = safe_sqrt(1.0 - sqr(sin_theta_o));
    (sin_theta_o, cos_theta_o)
}
