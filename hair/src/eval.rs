//! Evaluation of the hair closure for a fixed pair of directions.

use crate::closure::*;
use crate::ellipse::*;
use crate::energy::*;
use crate::longitudinal::*;
use strand_core::common::*;
use strand_core::geometry::*;
use strand_core::microfacet::*;
use strand_core::reflection::*;
use strand_core::rng::Rng;
use strand_core::spectrum::*;

/// Azimuthal bounds of the mesonormals visible from the incident direction.
/// Computed per evaluation call and handed to the sub-evaluators by value.
pub(crate) type IntegrationRange = (Float, Float);

impl MicrofacetHairClosure {
    /// Scattered contribution for the incident/outgoing pair. The random
    /// generator drives the stochastic micronormals of the residual
    /// evaluator; with an identical generator state the result is
    /// deterministic. The reported pdf is 1.0 for any geometrically valid
    /// pair, matching the sampler's folded-weight convention.
    ///
    /// * `wi`  - World-space incident direction.
    /// * `wo`  - World-space outgoing direction.
    /// * `rng` - Random number generator.
    pub fn eval(&self, wi: &Vector3f, wo: &Vector3f, rng: &mut Rng) -> (Spectrum, Float) {
        let wi = self.frame.to_local(wi);
        let wo = self.frame.to_local(wo);

        let cos_theta_i = cos_theta(&wi);
        if cos_theta_i < 1e-7 || cos_theta(&wo) < 1e-7 {
            return (Spectrum::ZERO, 0.0);
        }

        // Directions steeper than the cuticle tilt see no mesonormal at all.
        let tan_tilt = self.tilt.tan();
        if tan_tilt * tan_theta(&wi) < -1.0 || tan_tilt * tan_theta(&wo) < -1.0 {
            return (Spectrum::ZERO, 0.0);
        }

        let range = self.integration_range(&wi);
        let value =
            (self.eval_r(&wi, &wo, range) + self.eval_residual(&wi, &wo, range, rng)) / cos_theta_i;
        if !value.is_finite() {
            return (Spectrum::ZERO, 0.0);
        }
        (value, 1.0)
    }

    /// Azimuthal range of mesonormals that can face the incident direction,
    /// inset slightly from the silhouette.
    pub(crate) fn integration_range(&self, wi: &Vector3f) -> IntegrationRange {
        let phi_i = dir_phi(wi);
        let gamma_min = to_gamma(phi_i - PI_OVER_TWO, self.b) + 1e-3;
        let mut gamma_max = to_gamma(phi_i + PI_OVER_TWO, self.b) - 1e-3;
        if gamma_max < gamma_min {
            gamma_max += TWO_PI;
        }
        (gamma_min, gamma_max)
    }

    /// Number of Simpson intervals (even) and the node spacing for the given
    /// span; the resolution adapts to the roughness.
    fn simpson_intervals(&self, span: Float) -> (usize, Float) {
        let res = self.roughness * 0.7;
        let n = 2 * max(1, (span / res * 0.5).ceil() as usize);
        (n, span / n as Float)
    }

    /// Composite Simpson node weight; the total is scaled by 2h/3.
    #[inline]
    fn simpson_weight(i: usize, n: usize) -> Float {
        if i == 0 || i == n {
            0.5
        } else {
            (i % 2 + 1) as Float
        }
    }

    /// Beer-Lambert attenuation along the interior chord between two points
    /// of the cross-section, for a ray with the given azimuth and
    /// inclination cosine.
    pub(crate) fn transmittance(
        &self,
        gamma_in: Float,
        gamma_out: Float,
        phi_dir: Float,
        cos_theta_dir: Float,
    ) -> Spectrum {
        let chord = if self.e2 == 0.0 {
            2.0 * abs((gamma_in - phi_dir).cos())
        } else {
            to_point(gamma_out, self.b).distance(&to_point(gamma_in, self.b))
        };
        (self.sigma * -(chord / cos_theta_dir)).exp()
    }

    /// Direct reflection lobe, integrated over the visible azimuth with
    /// composite Simpson quadrature.
    pub(crate) fn eval_r(&self, wi: &Vector3f, wo: &Vector3f, range: IntegrationRange) -> Spectrum {
        if self.lobes.r <= 0.0 {
            return Spectrum::ZERO;
        }

        let wh = *wi + *wo;
        if wh.length_squared() < 1e-12 {
            return Spectrum::ZERO;
        }
        let wh = wh.normalize();

        let alpha2 = sqr(self.roughness);
        let sqrt_roughness = self.roughness.sqrt();
        let (n, dgamma) = self.simpson_intervals(range.1 - range.0);

        let mut integral = 0.0;
        for i in 0..=n {
            let gamma = range.0 + i as Float * dgamma;
            let wm = sphg_dir(self.tilt, gamma, self.b);

            // Both directions must see the front of the mesonormal and of
            // the half-vector.
            let cos_mi = wm.dot(wi);
            if cos_mi <= 0.0 || wm.dot(wo) <= 0.0 || wi.dot(&wh) <= 0.0 || wo.dot(&wh) <= 0.0 {
                continue;
            }

            let term = ggx_d(alpha2, wm.dot(&wh))
                * ggx_g(alpha2, cos_mi, wm.dot(wo))
                * arc_length(self.e2, gamma)
                * energy_scale(cos_mi, sqrt_roughness, self.eta);
            if term.is_finite() {
                integral += Self::simpson_weight(i, n) * term;
            }
        }
        integral *= 2.0 / 3.0 * dgamma;

        let fresnel = fresnel_dielectric_cos(wi.dot(&wh), self.eta);
        Spectrum::new(self.lobes.r * 0.125 * fresnel * integral / self.projected_radius)
    }

    /// Transmission lobes: one refraction (TT), one internal reflection
    /// (TRT) and the aggregated tail of all deeper bounces (TRRT+). The
    /// outer loop is a deterministic Simpson sweep over the entry azimuth.
    /// At each node one stochastically drawn micronormal models the rough
    /// entry interface (a second one models the internal reflection for
    /// TRT), while the exit micronormal is pinned by the fixed outgoing
    /// direction.
    pub(crate) fn eval_residual(
        &self,
        wi: &Vector3f,
        wo: &Vector3f,
        range: IntegrationRange,
        rng: &mut Rng,
    ) -> Spectrum {
        if self.lobes.tt <= 0.0 && self.lobes.trt <= 0.0 {
            return Spectrum::ZERO;
        }

        let alpha = self.roughness;
        let alpha2 = sqr(alpha);
        let sqrt_roughness = alpha.sqrt();
        let eta = self.eta;
        let inv_eta = 1.0 / eta;
        let m_variance = 4.0 * self.roughness;
        let sin_theta_i = sin_theta(wi);
        let cos_theta_i = cos_theta(wi);
        let sin_theta_o = sin_theta(wo);
        let cos_theta_o = cos_theta(wo);

        let (n, dgamma) = self.simpson_intervals(range.1 - range.0);
        let mut integral = Spectrum::ZERO;

        for i in 0..=n {
            let gamma_mi = range.0 + i as Float * dgamma;
            let wmi = sphg_dir(self.tilt, gamma_mi, self.b);
            let wmi_macro = sphg_dir(0.0, gamma_mi, self.b);
            let cos_mi = wmi.dot(wi);
            let projection = wmi_macro.dot(wi);
            if cos_mi <= 1e-5 || projection <= 1e-5 {
                continue;
            }

            // One stochastic micronormal models the rough entry interface.
            let (u1, u2) = rng.uniform_float_pair();
            let wh1 = sample_wh(alpha, *wi, wmi, u1, u2);
            let cos_hi1 = wi.dot(&wh1);
            if cos_hi1 <= 0.0 {
                continue;
            }
            let (r1, cos_theta_t1) = fresnel_dielectric(cos_hi1, eta);
            let t1 = 1.0 - r1;
            if t1 <= 0.0 {
                continue;
            }

            // Refract into the interior; `wt` points along the propagation
            // direction, and the transmitted beam is shadowed by the entry
            // interface it just crossed.
            let wt = refract(wi, &wh1, cos_theta_t1, inv_eta);
            let cos_theta_t = cos_theta(&wt);
            let g1_entry = ggx_g1(alpha2, -wt.dot(&wmi));
            if cos_theta_t < 1e-5 || g1_entry <= 0.0 {
                continue;
            }

            let phi_t = dir_phi(&wt);
            let gamma_mt = 2.0 * to_phi(phi_t, self.b) - gamma_mi + PI;
            let a_t = self.transmittance(gamma_mi, gamma_mt, phi_t, cos_theta_t);

            let wmt = sphg_dir(-self.tilt, gamma_mt, self.b);
            let wmt_macro = sphg_dir(0.0, gamma_mt, self.b);

            let node_scale = Self::simpson_weight(i, n)
                * arc_length(self.e2, gamma_mi)
                * projection
                * energy_scale(cos_mi, sqrt_roughness, eta);
            let prefix = t1 * g1_entry;

            // TT: straight through the second interface.
            if self.lobes.tt > 0.0 {
                if let Some(exit) = self.exit_density(wo, &wt, &wmt, &wmt_macro, alpha2) {
                    let term = a_t * (self.lobes.tt * prefix * exit * node_scale);
                    if term.is_finite() {
                        integral += term;
                    }
                }
            }

            // TRT and the TRRT+ tail: one more stochastic micronormal models
            // the internal reflection at the second interface.
            if self.lobes.trt > 0.0 {
                let (u3, u4) = rng.uniform_float_pair();
                let wh2 = sample_wh(alpha, -wt, -wmt, u3, u4);
                let cos_hi2 = -wt.dot(&wh2);
                if cos_hi2 <= 0.0 {
                    continue;
                }
                let (r2, _) = fresnel_dielectric(cos_hi2, inv_eta);
                let wtr = reflect(&-wt, &wh2);
                let g1_tr = ggx_g1(alpha2, -wtr.dot(&wmt));
                let cos_theta_tr = cos_theta(&wtr);
                if r2 <= 0.0 || g1_tr <= 0.0 || wtr.dot(&wmt_macro) >= 0.0 || cos_theta_tr < 1e-5 {
                    continue;
                }

                let phi_tr = dir_phi(&wtr);
                let gamma_mtr = 2.0 * to_phi(phi_tr, self.b) - gamma_mt + PI;
                let a_tr = self.transmittance(gamma_mt, gamma_mtr, phi_tr, cos_theta_tr);
                let wmtr = sphg_dir(-self.tilt, gamma_mtr, self.b);
                let wmtr_macro = sphg_dir(0.0, gamma_mtr, self.b);
                let prefix_trt = prefix * r2 * g1_tr;

                if let Some(exit) = self.exit_density(wo, &wtr, &wmtr, &wmtr_macro, alpha2) {
                    let term = a_t * a_tr * (self.lobes.trt * prefix_trt * exit * node_scale);
                    if term.is_finite() {
                        integral += term;
                    }
                }

                // Deeper bounces as a geometric series over the averaged
                // attenuation of the two chords already traced, spread over
                // a wide longitudinal lobe and a uniform azimuth.
                let a_avg = (a_t * a_tr).sqrt();
                let q = (a_avg * r2).clamp(0.0, 0.9999);
                let tail = q * (1.0 - r2) / (Spectrum::ONE - q);
                let m = longitudinal_scattering(
                    sin_theta_i,
                    cos_theta_i,
                    sin_theta_o,
                    cos_theta_o,
                    m_variance,
                );
                let term = a_t
                    * a_tr
                    * tail
                    * (self.lobes.trt * prefix_trt * m * INV_TWO_PI * node_scale);
                if term.is_finite() {
                    integral += term;
                }
            }
        }

        integral * (2.0 / 3.0 * dgamma) / (2.0 * self.projected_radius)
    }

    /// Density of escaping along `wo` through the rough interface at
    /// mesonormal `wm` for an interior ray traveling along `w`. The
    /// micronormal is the generalized half-vector of the refraction pair;
    /// returns `None` when the geometry cannot connect (back-facing
    /// interface, total internal reflection, degenerate half-vector).
    fn exit_density(
        &self,
        wo: &Vector3f,
        w: &Vector3f,
        wm: &Vector3f,
        wm_macro: &Vector3f,
        alpha2: Float,
    ) -> Option<Float> {
        let cos_in = w.dot(wm);
        if cos_in <= 1e-5 || wo.dot(wm) <= 1e-5 || wo.dot(wm_macro) <= 1e-5 {
            return None;
        }

        // Generalized half-vector of the interior/outgoing refraction pair.
        let wh = *w * self.eta - *wo;
        let len2 = wh.length_squared();
        if len2 < 1e-9 {
            return None;
        }
        let mut wh = wh / len2.sqrt();
        if wh.dot(wm) < 0.0 {
            wh = -wh;
        }

        let cos_hi = w.dot(&wh);
        let cos_ho = wo.dot(&wh);
        if cos_hi <= 1e-5 || cos_ho <= 1e-5 {
            return None;
        }

        let (r, _) = fresnel_dielectric(cos_hi, 1.0 / self.eta);
        let t = 1.0 - r;
        if t <= 0.0 {
            return None;
        }

        let density = t
            * ggx_d(alpha2, wh.dot(wm))
            * ggx_g(alpha2, cos_in, wo.dot(wm))
            * (cos_hi / cos_in)
            * (cos_ho / len2);
        if density.is_finite() && density >= 0.0 {
            Some(density)
        } else {
            None
        }
    }
}
