//! Energy compensation for single-scatter microfacet shading.
//!
//! A rough dielectric interface evaluated with a single-scatter microfacet
//! model loses the energy that would bounce between facets before leaving
//! the surface. The loss only depends on the incident cosine, the roughness
//! and the relative index of refraction, so it is pre-tabulated once and the
//! reciprocal is applied as a scale factor wherever a rough interface is
//! crossed.

use strand_core::common::*;
use strand_core::geometry::*;
use strand_core::microfacet::*;
use strand_core::reflection::*;

const TABLE_SIZE: usize = 16;
const IOR_MIN: Float = 1.0;
const IOR_MAX: Float = 3.0;

/// Quadrature points per axis for the table build.
const QUAD_SIZE: usize = 8;

/// Retained single-scatter energy, tabulated over (cosine, √roughness,
/// relative IOR).
struct EnergyTable {
    e: Vec<Float>,
}

lazy_static! {
    static ref ENERGY_TABLE: EnergyTable = EnergyTable::build();
}

impl EnergyTable {
    fn build() -> Self {
        let mut e = vec![0.0; TABLE_SIZE * TABLE_SIZE * TABLE_SIZE];
        for k in 0..TABLE_SIZE {
            let eta = lerp((k as Float + 0.5) / TABLE_SIZE as Float, IOR_MIN, IOR_MAX);
            for j in 0..TABLE_SIZE {
                let sqrt_roughness = (j as Float + 0.5) / TABLE_SIZE as Float;
                let roughness = sqr(sqrt_roughness);
                for i in 0..TABLE_SIZE {
                    let cos_theta = (i as Float + 0.5) / TABLE_SIZE as Float;
                    e[(k * TABLE_SIZE + j) * TABLE_SIZE + i] =
                        single_scatter_energy(cos_theta, roughness, eta);
                }
            }
        }
        Self { e }
    }

    /// Trilinear lookup with the coordinates clamped to the table domain.
    fn lookup(&self, cos_theta: Float, sqrt_roughness: Float, eta: Float) -> Float {
        let tx = clamp(cos_theta, 0.0, 1.0) * TABLE_SIZE as Float - 0.5;
        let ty = clamp(sqrt_roughness, 0.0, 1.0) * TABLE_SIZE as Float - 0.5;
        let tz = (clamp(eta, IOR_MIN, IOR_MAX) - IOR_MIN) / (IOR_MAX - IOR_MIN)
            * TABLE_SIZE as Float
            - 0.5;

        let (i0, i1, fx) = Self::bracket(tx);
        let (j0, j1, fy) = Self::bracket(ty);
        let (k0, k1, fz) = Self::bracket(tz);

        let at = |k: usize, j: usize, i: usize| self.e[(k * TABLE_SIZE + j) * TABLE_SIZE + i];
        let c00 = lerp(fx, at(k0, j0, i0), at(k0, j0, i1));
        let c01 = lerp(fx, at(k0, j1, i0), at(k0, j1, i1));
        let c10 = lerp(fx, at(k1, j0, i0), at(k1, j0, i1));
        let c11 = lerp(fx, at(k1, j1, i0), at(k1, j1, i1));
        lerp(fz, lerp(fy, c00, c01), lerp(fy, c10, c11))
    }

    fn bracket(t: Float) -> (usize, usize, Float) {
        let t = clamp(t, 0.0, (TABLE_SIZE - 1) as Float);
        let lo = t.floor() as usize;
        let hi = min(lo + 1, TABLE_SIZE - 1);
        (lo, hi, t - lo as Float)
    }
}

/// Fraction of the incident energy retained by one single-scatter bounce off
/// a rough dielectric interface, estimated with a deterministic stratified
/// quadrature over the visible-normal distribution.
fn single_scatter_energy(cos_theta: Float, roughness: Float, eta: Float) -> Float {
    let alpha = roughness;
    let alpha2 = sqr(alpha);
    let wi = Vector3f::new(safe_sqrt(1.0 - sqr(cos_theta)), 0.0, cos_theta);

    let mut sum = 0.0;
    for a in 0..QUAD_SIZE {
        for b in 0..QUAD_SIZE {
            let u1 = (a as Float + 0.5) / QUAD_SIZE as Float;
            let u2 = (b as Float + 0.5) / QUAD_SIZE as Float;
            let wh = ggx_sample_vndf(wi, alpha, u1, u2);
            let cos_hi = wi.dot(&wh);
            if cos_hi <= 0.0 {
                continue;
            }
            let (f, cos_theta_t) = fresnel_dielectric(cos_hi, eta);
            let wr = reflect(&wi, &wh);
            let mut retained = f * ggx_g1(alpha2, wr.z);
            if f < 1.0 {
                let wt = refract(&wi, &wh, cos_theta_t, 1.0 / eta);
                retained += (1.0 - f) * ggx_g1(alpha2, -wt.z);
            }
            sum += retained;
        }
    }
    clamp(sum / (QUAD_SIZE * QUAD_SIZE) as Float, 1e-3, 1.0)
}

/// Scale factor compensating the single-scatter energy loss of a rough
/// interface; always ≥ 1.
///
/// * `cos_theta`      - Cosine between the incident direction and the mean
///                      normal of the interface.
/// * `sqrt_roughness` - Square root of the roughness parameter.
/// * `eta`            - Relative index of refraction.
pub fn energy_scale(cos_theta: Float, sqrt_roughness: Float, eta: Float) -> Float {
    let eta = if eta < 1.0 { 1.0 / eta } else { eta };
    max(1.0, 1.0 / ENERGY_TABLE.lookup(cos_theta, sqrt_roughness, eta))
}
