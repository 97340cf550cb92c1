//! Ray-torus intersection (quartic equation).
//!
//! In the local frame the ring lies in the `xy`-plane and the torus is
//! `(|p|² + R² - r²)² = 4R²(x² + y²)`. Substituting the ray gives a quartic
//! in `t`. Solving it far from the torus loses most of the precision, so the
//! ray is first clipped against an enclosing ellipsoid and the quartic is
//! solved in a parameter re-centered at the clipped entry point.

use procray_math::{within_sweep, Vec3};
use procray_primitives::Torus;
use std::f64::consts::SQRT_2;

use super::roots::{polish_quartic_root, solve_quartic};
use super::{Nearest, SurfaceHit};
use crate::{Ray, RayInterval};

/// Newton steps applied to each quartic root.
const POLISH_STEPS: usize = 2;
/// Accepted distance between a root's point and the tube surface, relative
/// to the outer radius.
const SURFACE_PROXIMITY: f64 = 1e-5;

/// Intersect a ray with a torus, optionally limited to an azimuth sweep.
///
/// The normal is the outward gradient of the implicit surface.
pub fn intersect_torus(ray: &Ray, torus: &Torus, interval: &RayInterval) -> Option<SurfaceHit> {
    let frame = torus.frame();
    let big_r = torus.major_radius;
    let small_r = torus.minor_radius;
    let outer = big_r + small_r;

    let o = frame.to_local(&(ray.origin - torus.center));
    let d = frame.to_local(ray.direction.as_ref());

    // Stage 1: clip against the ellipsoid with semi-axes
    // (√2(R+r), √2(R+r), √2·r), which contains the whole torus. Scaling z by
    // (R+r)/r turns it into a sphere of radius √2(R+r).
    let scale_z = outer / small_r;
    let os = Vec3::new(o.x, o.y, o.z * scale_z);
    let ds = Vec3::new(d.x, d.y, d.z * scale_z);
    let radius = SQRT_2 * outer;
    let a = ds.dot(&ds);
    let half_b = os.dot(&ds);
    let c = os.dot(&os) - radius * radius;
    let disc = half_b * half_b - a * c;
    if disc < 0.0 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    let t_enter = (-half_b - sqrt_disc) / a;
    let t_exit = (-half_b + sqrt_disc) / a;
    if t_exit < interval.t_min || t_enter > interval.upper() {
        return None;
    }

    // Stage 2: quartic in s = t - t0 from the re-centered origin.
    let t0 = t_enter.max(interval.t_min);
    let p0 = o + d * t0;
    let r2 = big_r * big_r;
    let od = p0.dot(&d);
    let k = p0.dot(&p0) - r2 - small_r * small_r;
    let coeffs = [
        1.0,
        4.0 * od,
        4.0 * od * od + 2.0 * k + 4.0 * r2 * d.z * d.z,
        4.0 * od * k + 8.0 * r2 * p0.z * d.z,
        k * k - 4.0 * r2 * (small_r * small_r - p0.z * p0.z),
    ];

    // Stages 3 and 4: solve, polish, and keep roots that are on the surface
    // and inside the sweep.
    let mut nearest = Nearest::new(interval);
    for s in solve_quartic(coeffs[0], coeffs[1], coeffs[2], coeffs[3], coeffs[4]) {
        let s = polish_quartic_root(&coeffs, s, POLISH_STEPS);
        let p = p0 + d * s;
        let rho = p.x.hypot(p.y);
        let tube_distance = (rho - big_r).hypot(p.z);
        if (tube_distance - small_r).abs() > SURFACE_PROXIMITY * outer {
            continue;
        }
        if !within_sweep(p.x, p.y, torus.angle_deg) {
            continue;
        }
        let sum = p.dot(&p) - r2 - small_r * small_r;
        let normal = Vec3::new(sum * p.x, sum * p.y, (sum + 2.0 * r2) * p.z);
        nearest.offer(t0 + s, frame.to_world(&normal));
    }
    nearest.finish()
}
