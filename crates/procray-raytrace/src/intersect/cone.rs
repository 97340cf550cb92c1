//! Ray-cone intersection.
//!
//! In the local frame the base circle of radius `r` sits at `z = -h/2` and
//! the apex at `z = +h/2`, so the surface is
//! `x² + y² = k²·(h/2 - z)²` with `k = r / h`. The cone is open: the base
//! disk is not part of it.

use procray_math::Vec3;
use procray_primitives::Cone;

use super::roots::solve_quadratic;
use super::{Nearest, SurfaceHit};
use crate::{Ray, RayInterval};

/// Intersect a ray with a finite open cone.
pub fn intersect_cone(ray: &Ray, cone: &Cone, interval: &RayInterval) -> Option<SurfaceHit> {
    let frame = cone.frame();
    let o = frame.to_local(&(ray.origin - cone.center));
    let d = frame.to_local(ray.direction.as_ref());
    let half = cone.height * 0.5;
    let k = cone.radius / cone.height;
    let k2 = k * k;

    // w(t) = h/2 - z(t) = w0 - t*dz
    let w0 = half - o.z;
    let a = d.x * d.x + d.y * d.y - k2 * d.z * d.z;
    let b = 2.0 * (o.x * d.x + o.y * d.y + k2 * w0 * d.z);
    let c = o.x * o.x + o.y * o.y - k2 * w0 * w0;

    let mut nearest = Nearest::new(interval);
    for t in solve_quadratic(a, b, c) {
        let p = o + d * t;
        // The quadratic also describes the mirrored nappe above the apex.
        if p.z < -half || p.z > half {
            continue;
        }
        let normal = Vec3::new(p.x, p.y, k2 * (half - p.z));
        nearest.offer(t, frame.to_world(&normal));
    }
    nearest.finish()
}
