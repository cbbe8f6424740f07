//! Importance sampling of the hair closure.

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

/// Scattering path selected by [`MicrofacetHairClosure::sample`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Lobe {
    /// Direct reflection.
    R,
    /// Single transmission through the fiber.
    TT,
    /// Transmission with one internal reflection.
    TRT,
    /// Aggregated tail of all deeper bounces.
    TRRT,
}

/// Result of importance-sampling the closure. The importance weight is
/// folded into `value`, so `pdf` is always 1.0; combining with light
/// sampling downstream only needs a constant pdf on this side.
#[derive(Copy, Clone, Debug)]
pub struct HairSample {
    /// World-space outgoing direction.
    pub wo: Vector3f,

    /// Spectral contribution with the selection weight folded in.
    pub value: Spectrum,

    /// Always 1.0.
    pub pdf: Float,

    /// Roughness of the sampled path, for filter-glossy heuristics.
    pub roughness: Float,

    /// Which scattering path was selected.
    pub label: Lobe,
}

impl MicrofacetHairClosure {
    /// Stochastically selects a scattering path and an outgoing direction.
    /// Returns `None` when no path carries energy; the host treats that as
    /// the light path terminating here.
    ///
    /// * `wi`   - World-space incident direction.
    /// * `rand` - Three uniform random values from the host sampler.
    /// * `rng`  - Random number generator for the additional interface draws.
    pub fn sample(&self, wi: &Vector3f, rand: [Float; 3], rng: &mut Rng) -> Option<HairSample> {
        let wi = self.frame.to_local(wi);
        let cos_theta_i = cos_theta(&wi);
        if cos_theta_i < 1e-7 {
            return None;
        }

        // Entry azimuth: uniform over the impact parameter of the circle
        // parameterization, mapped through the inverse elliptical
        // parameterization of the incident azimuth.
        let gamma_i = to_gamma(dir_phi(&wi), self.b);
        let gamma_mi = gamma_i + clamp(2.0 * rand[0] - 1.0, -1.0, 1.0).asin();
        let wmi = sphg_dir(self.tilt, gamma_mi, self.b);
        let wmi_macro = sphg_dir(0.0, gamma_mi, self.b);
        let cos_mi = wmi.dot(&wi);
        if cos_mi <= 0.0 || wmi_macro.dot(&wi) <= 0.0 {
            return None;
        }

        let alpha = self.roughness;
        let alpha2 = sqr(alpha);
        let sqrt_roughness = alpha.sqrt();
        let eta = self.eta;
        let inv_eta = 1.0 / eta;
        let scale = energy_scale(cos_mi, sqrt_roughness, eta);

        // Entry micronormal, shared by every path.
        let wh1 = sample_wh(alpha, wi, wmi, rand[1], rand[2]);
        let cos_hi1 = wi.dot(&wh1);
        if cos_hi1 <= 0.0 {
            return None;
        }
        let (r1, cos_theta_t1) = fresnel_dielectric(cos_hi1, eta);

        // Direct reflection candidate.
        let wr = reflect(&wi, &wh1);
        let mut r_value = Spectrum::ZERO;
        if self.lobes.r > 0.0 {
            let g1_r = ggx_g1(alpha2, wr.dot(&wmi));
            if g1_r > 0.0 && wr.dot(&wmi_macro) > 0.0 {
                r_value = Spectrum::new(self.lobes.r * r1 * scale * g1_r);
            }
        }

        let mut tt_value = Spectrum::ZERO;
        let mut tt_dir = Vector3f::ZERO;
        let mut trt_value = Spectrum::ZERO;
        let mut trt_dir = Vector3f::ZERO;
        let mut trrt_value = Spectrum::ZERO;
        let mut trrt_dir = Vector3f::ZERO;

        let t1 = 1.0 - r1;
        if t1 > 0.0 && (self.lobes.tt > 0.0 || self.lobes.trt > 0.0) {
            let wt = refract(&wi, &wh1, cos_theta_t1, inv_eta);
            let cos_theta_t = cos_theta(&wt);
            let g1_entry = ggx_g1(alpha2, -wt.dot(&wmi));
            if cos_theta_t > 1e-5 && g1_entry > 0.0 {
                let prefix = t1 * scale * g1_entry;

                let phi_t = dir_phi(&wt);
                let gamma_mt = 2.0 * to_phi(phi_t, self.b) - gamma_mi + PI;
                let a_t = self.transmittance(gamma_mi, gamma_mt, phi_t, cos_theta_t);
                let wmt = sphg_dir(-self.tilt, gamma_mt, self.b);
                let wmt_macro = sphg_dir(0.0, gamma_mt, self.b);

                // TT candidate: refract out through its own micronormal.
                if self.lobes.tt > 0.0 && wt.dot(&wmt) > 0.0 {
                    let (u1, u2) = rng.uniform_float_pair();
                    let wh2 = sample_wh(alpha, -wt, -wmt, u1, u2);
                    let cos_hi2 = -wt.dot(&wh2);
                    if cos_hi2 > 0.0 {
                        let (r2, cos_theta_t2) = fresnel_dielectric(cos_hi2, inv_eta);
                        let t2 = 1.0 - r2;
                        if t2 > 0.0 {
                            let wtt = refract(&-wt, &wh2, cos_theta_t2, eta);
                            let g1_tt = ggx_g1(alpha2, wtt.dot(&wmt));
                            if g1_tt > 0.0 && wtt.dot(&wmt_macro) > 0.0 {
                                tt_value = a_t * (self.lobes.tt * prefix * t2 * g1_tt);
                                tt_dir = wtt;
                            }
                        }
                    }
                }

                // TRT candidate: reflect internally at a fresh micronormal,
                // cross the fiber again, refract out at a third one.
                if self.lobes.trt > 0.0 && wt.dot(&wmt) > 0.0 {
                    let (u1, u2) = rng.uniform_float_pair();
                    let wh3 = sample_wh(alpha, -wt, -wmt, u1, u2);
                    let cos_hi3 = -wt.dot(&wh3);
                    if cos_hi3 > 0.0 {
                        let (r3, _) = fresnel_dielectric(cos_hi3, inv_eta);
                        let wtr = reflect(&-wt, &wh3);
                        let g1_tr = ggx_g1(alpha2, -wtr.dot(&wmt));
                        let cos_theta_tr = cos_theta(&wtr);
                        if r3 > 0.0
                            && g1_tr > 0.0
                            && wtr.dot(&wmt_macro) < 0.0
                            && cos_theta_tr > 1e-5
                        {
                            let phi_tr = dir_phi(&wtr);
                            let gamma_mtr = 2.0 * to_phi(phi_tr, self.b) - gamma_mt + PI;
                            let a_tr =
                                self.transmittance(gamma_mt, gamma_mtr, phi_tr, cos_theta_tr);
                            let wmtr = sphg_dir(-self.tilt, gamma_mtr, self.b);
                            let wmtr_macro = sphg_dir(0.0, gamma_mtr, self.b);
                            let prefix_trt = prefix * r3 * g1_tr;

                            if wtr.dot(&wmtr) > 0.0 {
                                let (u3, u4) = rng.uniform_float_pair();
                                let wh4 = sample_wh(alpha, -wtr, -wmtr, u3, u4);
                                let cos_hi4 = -wtr.dot(&wh4);
                                if cos_hi4 > 0.0 {
                                    let (r4, cos_theta_t4) = fresnel_dielectric(cos_hi4, inv_eta);
                                    let t4 = 1.0 - r4;
                                    if t4 > 0.0 {
                                        let wtrt = refract(&-wtr, &wh4, cos_theta_t4, eta);
                                        let g1_trt = ggx_g1(alpha2, wtrt.dot(&wmtr));
                                        if g1_trt > 0.0 && wtrt.dot(&wmtr_macro) > 0.0 {
                                            trt_value = a_t
                                                * a_tr
                                                * (self.lobes.trt * prefix_trt * t4 * g1_trt);
                                            trt_dir = wtrt;
                                        }
                                    }
                                }
                            }

                            // TRRT+ candidate: geometric series over the
                            // averaged attenuation, scattered into a wide
                            // longitudinal lobe with uniform azimuth.
                            let a_avg = (a_t * a_tr).sqrt();
                            let q = (a_avg * r3).clamp(0.0, 0.9999);
                            let tail = q * (1.0 - r3) / (Spectrum::ONE - q);
                            let value = a_t * a_tr * tail * (self.lobes.trt * prefix_trt);
                            if !value.is_black() && value.is_finite() {
                                let (u5, u6) = rng.uniform_float_pair();
                                let (sin_theta_o, cos_theta_o) = sample_longitudinal(
                                    u5,
                                    u6,
                                    sin_theta(&wi),
                                    cos_theta_i,
                                    4.0 * self.roughness,
                                );
                                let phi_o = TWO_PI * rng.uniform_float() - PI;
                                trrt_value = value;
                                trrt_dir = Vector3f::new(
                                    phi_o.sin() * cos_theta_o,
                                    sin_theta_o,
                                    phi_o.cos() * cos_theta_o,
                                );
                            }
                        }
                    }
                }
            }
        }

        // Select one candidate with probability proportional to its scalar
        // energy and fold the weight into the returned value.
        let candidates = [
            (r_value, wr, Lobe::R),
            (tt_value, tt_dir, Lobe::TT),
            (trt_value, trt_dir, Lobe::TRT),
            (trrt_value, trrt_dir, Lobe::TRRT),
        ];
        let energies: Vec<Float> = candidates.iter().map(|c| c.0.channel_sum()).collect();
        let total: Float = energies.iter().sum();
        if !(total > 0.0) || !total.is_finite() {
            return None;
        }

        let mut u = rng.uniform_float() * total;
        let mut selected = None;
        for (k, (value, dir, label)) in candidates.iter().enumerate() {
            if energies[k] <= 0.0 {
                continue;
            }
            if u < energies[k] {
                selected = Some((*value, *dir, *label, energies[k]));
                break;
            }
            u -= energies[k];
            // Guard against accumulated rounding on the last candidate.
            selected = Some((*value, *dir, *label, energies[k]));
        }
        let (value, wo, label, energy) = selected?;

        let value = value * (total / energy);
        if !value.is_finite() || wo == Vector3f::ZERO {
            return None;
        }

        Some(HairSample {
            wo: self.frame.from_local(&wo),
            value,
            pdf: 1.0,
            roughness: self.roughness,
            label,
        })
    }
}
