//! Closed-form approximate albedo of the hair closure.

use crate::closure::*;
use crate::ellipse::*;
use strand_core::common::*;
use strand_core::reflection::*;
use strand_core::spectrum::*;

impl MicrofacetHairClosure {
    /// Approximate total reflectance for the stored incident direction,
    /// assuming a circular cross-section and perfectly specular interfaces.
    /// The attenuated transmission/reflection ladder inside the fiber is
    /// summed analytically, so the result is cheap and bounded to [0, 1];
    /// intended for preview and denoising heuristics, not for unbiased
    /// rendering.
    pub fn albedo(&self) -> Spectrum {
        let cos_theta_i = cos_theta(&self.wi);
        let sin_theta_i = sin_theta(&self.wi);
        let cos_gamma = safe_sqrt(1.0 - sqr(self.h));

        // First-surface Fresnel at the actual impact parameter.
        let f = fresnel_dielectric_cos(cos_theta_i * cos_gamma, self.eta);
        if cos_theta_i < 1e-5 {
            return Spectrum::new(f).clamp(0.0, 1.0);
        }

        // Refracted chord through the interior; the azimuthal refraction
        // follows the modified index of the inclined ray.
        let sin_theta_t = sin_theta_i / self.eta;
        let cos_theta_t = safe_sqrt(1.0 - sqr(sin_theta_t));
        let eta_prime = safe_sqrt(sqr(self.eta) - sqr(sin_theta_i)) / cos_theta_i;
        let sin_gamma_t = self.h / eta_prime;
        let cos_gamma_t = safe_sqrt(1.0 - sqr(sin_gamma_t));
        let a = (self.sigma * -(2.0 * cos_gamma_t / max(cos_theta_t, 1e-5))).exp();

        // F + (1 - F)² A (1 + FA + (FA)² + ...) summed in closed form.
        let value = Spectrum::new(f) + a * sqr(1.0 - f) / (Spectrum::ONE - a * f);
        value.clamp(0.0, 1.0)
    }
}
