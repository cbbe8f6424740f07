//! Closure state for the microfacet hair model.

use crate::ellipse::*;
use strand_core::common::*;
use strand_core::geometry::*;
use strand_core::reflection::BxdfFlags;
use strand_core::spectrum::*;

/// Per-lobe modulation factors; a factor of zero disables the corresponding
/// bounce order entirely.
#[derive(Copy, Clone, Debug)]
pub struct LobeScales {
    /// Direct reflection.
    pub r: Float,

    /// Single transmission through the fiber.
    pub tt: Float,

    /// Transmission with one internal reflection; also scales the aggregated
    /// deeper bounces.
    pub trt: Float,
}

impl Default for LobeScales {
    fn default() -> Self {
        Self {
            r: 1.0,
            tt: 1.0,
            trt: 1.0,
        }
    }
}

/// Material parameters supplied by the host for one shading point.
#[derive(Clone, Debug)]
pub struct HairParameters {
    /// Absorption coefficient of the fiber interior, per unit fiber radius.
    pub sigma: Spectrum,

    /// Surface roughness.
    pub roughness: Float,

    /// Cuticle tilt angle in radians.
    pub tilt: Float,

    /// Relative index of refraction of the fiber interior.
    pub eta: Float,

    /// Ratio of the minor to the major semi-axis of the cross-section.
    /// Values above one are inverted with the transverse axes swapped.
    pub aspect_ratio: Float,

    /// Azimuthal offset of the ray on the fiber width, in [-1, 1]. Used
    /// directly for ribbon primitives; recomputed from the shading normal
    /// for curve primitives.
    pub h: Float,

    /// Per-lobe modulation.
    pub lobes: LobeScales,
}

/// Geometric context of the shading point.
#[derive(Copy, Clone, Debug)]
pub struct ShadingGeometry {
    /// World-space incident (viewing) direction.
    pub wi: Vector3f,

    /// Curve tangent dp/du.
    pub tangent: Vector3f,

    /// Shading normal.
    pub normal: Vector3f,

    /// True when the primitive is a flat camera-facing ribbon rather than a
    /// true curve.
    pub curve_ribbon: bool,
}

/// Orthonormal shading frame with the hair tangent along the Y axis.
#[derive(Copy, Clone, Debug)]
pub struct LocalFrame {
    pub x: Vector3f,
    pub y: Vector3f,
    pub z: Vector3f,
}

impl LocalFrame {
    /// Expresses a world-space direction in this frame.
    pub fn to_local(&self, w: &Vector3f) -> Vector3f {
        Vector3f::new(w.dot(&self.x), w.dot(&self.y), w.dot(&self.z))
    }

    /// Expresses a frame-local direction in world space.
    pub fn from_local(&self, w: &Vector3f) -> Vector3f {
        self.x * w.x + self.y * w.y + self.z * w.z
    }
}

/// Outcome of closure setup. `Transparent` signals the host to replace this
/// closure with a pass-through one (and to adjust its own closure
/// accounting); the ray missed the fiber silhouette.
#[derive(Debug)]
pub enum SetupResult {
    Closure(Box<MicrofacetHairClosure>),
    Transparent,
}

/// Scattering state for one shading point on a hair fiber. Immutable after
/// setup except for roughness widening through [`MicrofacetHairClosure::blur`].
#[derive(Clone, Debug)]
pub struct MicrofacetHairClosure {
    pub(crate) sigma: Spectrum,
    pub(crate) roughness: Float,
    pub(crate) tilt: Float,
    pub(crate) eta: Float,

    /// Aspect ratio after normalization, in (0, 1].
    pub(crate) b: Float,

    /// Squared eccentricity of the cross-section.
    pub(crate) e2: Float,

    pub(crate) h: Float,
    pub(crate) lobes: LobeScales,
    pub(crate) frame: LocalFrame,

    /// Incident direction in the local frame.
    pub(crate) wi: Vector3f,

    /// Silhouette half-width seen from the incident azimuth.
    pub(crate) projected_radius: Float,

    flags: BxdfFlags,
}

impl MicrofacetHairClosure {
    /// Builds the closure for one shading point, or reports that the ray
    /// missed the fiber silhouette and the host should treat the hit as
    /// transparent.
    ///
    /// * `params`   - Material parameters.
    /// * `geometry` - Geometric context.
    pub fn setup(params: &HairParameters, geometry: &ShadingGeometry) -> SetupResult {
        let roughness = clamp(params.roughness, 0.001, 1.0);

        // Negated so positive host tilts lean the scales towards the root,
        // matching the convention of the evaluator and sampler.
        let tilt = -params.tilt;

        let mut b = params.aspect_ratio;
        let mut swap_axes = false;
        if b > 1.0 {
            b = 1.0 / b;
            swap_axes = true;
        }
        let b = clamp(b, 1e-4, 1.0);
        let e2 = 1.0 - sqr(b);

        let y = if geometry.tangent.length_squared() > 1e-12 && geometry.tangent.is_finite() {
            geometry.tangent.normalize()
        } else {
            warn!("degenerate hair tangent, falling back to +Y");
            Vector3f::new(0.0, 1.0, 0.0)
        };

        let (frame, h) = if e2 == 0.0 || geometry.curve_ribbon {
            // Align X perpendicular to the viewing direction so the incident
            // azimuth is zero.
            let x = y.cross(&geometry.wi);
            let frame = if x.length_squared() > 1e-12 {
                let x = x.normalize();
                LocalFrame {
                    x,
                    y,
                    z: x.cross(&y),
                }
            } else {
                // Viewing straight down the fiber; any transverse frame
                // works as long as it varies smoothly along the strand.
                warn!("incident direction parallel to hair tangent, using fallback frame");
                let (z, x) = coordinate_system(&y);
                LocalFrame { x, y, z }
            };
            let h = if geometry.curve_ribbon {
                params.h
            } else {
                -frame.x.dot(&geometry.normal)
            };
            (frame, h)
        } else {
            // Elliptical fiber on a true curve primitive: the frame follows
            // the cross-section axes, re-orthogonalized against the tangent.
            let n = geometry.normal - y * geometry.normal.dot(&y);
            if n.length_squared() < 1e-12 || !n.is_finite() {
                warn!("degenerate shading normal, using fallback frame");
                let (z, x) = coordinate_system(&y);
                let frame = LocalFrame { x, y, z };
                (frame, params.h)
            } else {
                let n = n.normalize();
                // The geometric normal marks the minor axis; when the host
                // supplied an inverted aspect ratio it marks the major one.
                let z = if swap_axes { y.cross(&n).normalize() } else { n };
                let x = y.cross(&z).normalize();
                let frame = LocalFrame { x, y, z };

                // Recompute `h` as the normal's cross-section position
                // projected perpendicular to the incident azimuth.
                let wi_local = frame.to_local(&geometry.wi);
                let phi_i = dir_phi(&wi_local);
                let n_local = frame.to_local(&n);
                let gamma_n = to_gamma(dir_phi(&n_local), b);
                let p = to_point(gamma_n, b);
                let h = p.x * phi_i.cos() - p.y * phi_i.sin();
                (frame, h)
            }
        };

        let wi = frame.to_local(&geometry.wi);
        let radius = projected_radius(e2, dir_phi(&wi));
        if !h.is_finite() || abs(h) >= radius {
            return SetupResult::Transparent;
        }

        SetupResult::Closure(Box::new(Self {
            sigma: params.sigma.clamp(0.0, Float::INFINITY),
            roughness,
            tilt,
            eta: params.eta,
            b,
            e2,
            h,
            lobes: params.lobes,
            frame,
            wi,
            projected_radius: radius,
            flags: BxdfFlags::REFLECTION | BxdfFlags::TRANSMISSION | BxdfFlags::GLOSSY,
        }))
    }

    /// The closure's capability flags.
    pub fn flags(&self) -> BxdfFlags {
        self.flags
    }

    /// Current surface roughness.
    pub fn roughness(&self) -> Float {
        self.roughness
    }

    /// Widens the roughness to at least `min_roughness`; used when filtering
    /// glossy paths. Idempotent and monotonic.
    ///
    /// * `min_roughness` - Requested minimum roughness.
    pub fn blur(&mut self, min_roughness: Float) {
        self.roughness = max(self.roughness, min_roughness);
    }
}

/// Shared fixtures for the test modules across the crate.
#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;

    pub(crate) fn test_geometry() -> ShadingGeometry {
        ShadingGeometry {
            wi: Vector3f::new(0.4, 0.3, 0.866_025).normalize(),
            tangent: Vector3f::new(0.05, 1.0, 0.02),
            normal: Vector3f::new(0.9, 0.0, 0.3).normalize(),
            curve_ribbon: false,
        }
    }

    pub(crate) fn test_params() -> HairParameters {
        HairParameters {
            sigma: Spectrum::from_rgb([0.2, 0.4, 0.8]),
            roughness: 0.3,
            tilt: 0.05,
            eta: 1.55,
            aspect_ratio: 1.0,
            h: 0.3,
            lobes: LobeScales::default(),
        }
    }

    pub(crate) fn unwrap_closure(result: SetupResult) -> Box<MicrofacetHairClosure> {
        match result {
            SetupResult::Closure(c) => c,
            SetupResult::Transparent => panic!("unexpected transparent fallback"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_fixtures::*;
    use super::*;
    use float_cmp::approx_eq;
    use proptest::prelude::*;

    #[test]
    fn setup_builds_an_orthonormal_frame() {
        let c = unwrap_closure(MicrofacetHairClosure::setup(&test_params(), &test_geometry()));
        let f = &c.frame;
        assert!(approx_eq!(f32, f.x.length(), 1.0, epsilon = 1e-5));
        assert!(approx_eq!(f32, f.y.length(), 1.0, epsilon = 1e-5));
        assert!(approx_eq!(f32, f.z.length(), 1.0, epsilon = 1e-5));
        assert!(approx_eq!(f32, f.x.dot(&f.y), 0.0, epsilon = 1e-5));
        assert!(approx_eq!(f32, f.x.dot(&f.z), 0.0, epsilon = 1e-5));
        assert!(approx_eq!(f32, f.y.dot(&f.z), 0.0, epsilon = 1e-5));
    }

    #[test]
    fn circular_incident_azimuth_is_zero() {
        let c = unwrap_closure(MicrofacetHairClosure::setup(&test_params(), &test_geometry()));
        assert!(approx_eq!(f32, c.wi.x, 0.0, epsilon = 1e-5));
        assert!(c.wi.z > 0.0);
        assert_eq!(c.projected_radius, 1.0);
    }

    #[test]
    fn roughness_is_clamped() {
        let mut params = test_params();
        params.roughness = 0.0;
        let c = unwrap_closure(MicrofacetHairClosure::setup(&params, &test_geometry()));
        assert_eq!(c.roughness, 0.001);
        params.roughness = 5.0;
        let c = unwrap_closure(MicrofacetHairClosure::setup(&params, &test_geometry()));
        assert_eq!(c.roughness, 1.0);
    }

    #[test]
    fn tilt_sign_is_flipped() {
        let c = unwrap_closure(MicrofacetHairClosure::setup(&test_params(), &test_geometry()));
        assert_eq!(c.tilt, -0.05);
    }

    #[test]
    fn ray_outside_the_silhouette_becomes_transparent() {
        let mut params = test_params();
        let mut geometry = test_geometry();
        geometry.curve_ribbon = true;
        params.h = 1.0 + 1e-4;
        assert!(matches!(
            MicrofacetHairClosure::setup(&params, &geometry),
            SetupResult::Transparent
        ));
        params.h = -1.0 - 1e-4;
        assert!(matches!(
            MicrofacetHairClosure::setup(&params, &geometry),
            SetupResult::Transparent
        ));
        params.h = 0.99;
        assert!(matches!(
            MicrofacetHairClosure::setup(&params, &geometry),
            SetupResult::Closure(_)
        ));
    }

    #[test]
    fn inverted_aspect_ratio_is_normalized() {
        let mut params = test_params();
        params.aspect_ratio = 2.0;
        params.h = 0.0;
        let c = unwrap_closure(MicrofacetHairClosure::setup(&params, &test_geometry()));
        assert!(approx_eq!(f32, c.b, 0.5, epsilon = 1e-6));
        assert!(c.e2 > 0.0);
    }

    #[test]
    fn degenerate_tangent_still_yields_a_frame() {
        let mut geometry = test_geometry();
        geometry.tangent = Vector3f::ZERO;
        geometry.curve_ribbon = true;
        let c = unwrap_closure(MicrofacetHairClosure::setup(&test_params(), &geometry));
        assert!(c.frame.y.is_finite());
        assert!(approx_eq!(f32, c.frame.y.length(), 1.0, epsilon = 1e-5));
    }

    proptest! {
        #[test]
        fn blur_is_monotonic_and_idempotent(
            roughness in 0.0f32..1.0,
            request in 0.0f32..1.5,
        ) {
            let mut params = test_params();
            params.roughness = roughness;
            let mut c = unwrap_closure(
                MicrofacetHairClosure::setup(&params, &test_geometry()));
            let before = c.roughness();
            c.blur(request);
            prop_assert!(c.roughness() >= before);
            prop_assert!(c.roughness() >= request);
            let once = c.roughness();
            c.blur(request);
            prop_assert_eq!(c.roughness(), once);
        }
    }
}
