//! Ray-cylinder intersection.
//!
//! Works in the cylinder's local frame, where the axis is `z`, the lateral
//! surface is `x² + y² = r²` and the caps sit at `z = ±h/2`. Partial
//! cylinders keep the azimuth wedge `[0°, angle]` on both the lateral
//! surface and the caps.

use procray_math::{within_sweep, Vec3};
use procray_primitives::Cylinder;

use super::roots::solve_quadratic;
use super::{Nearest, SurfaceHit};
use crate::{Ray, RayInterval};

const PARALLEL_EPS: f64 = 1e-12;

/// Intersect a ray with a closed, optionally partial, cylinder.
pub fn intersect_cylinder(
    ray: &Ray,
    cylinder: &Cylinder,
    interval: &RayInterval,
) -> Option<SurfaceHit> {
    let frame = cylinder.frame();
    let o = frame.to_local(&(ray.origin - cylinder.center));
    let d = frame.to_local(ray.direction.as_ref());
    let half = cylinder.height * 0.5;
    let r = cylinder.radius;
    let sweep = cylinder.angle_deg;

    let mut nearest = Nearest::new(interval);

    // Lateral surface: (ox + t*dx)^2 + (oy + t*dy)^2 = r^2
    let a = d.x * d.x + d.y * d.y;
    if a > PARALLEL_EPS {
        let b = 2.0 * (o.x * d.x + o.y * d.y);
        let c = o.x * o.x + o.y * o.y - r * r;
        for t in solve_quadratic(a, b, c) {
            let p = o + d * t;
            if p.z.abs() <= half && within_sweep(p.x, p.y, sweep) {
                nearest.offer(t, frame.to_world(&Vec3::new(p.x, p.y, 0.0)));
            }
        }
    }

    // Caps
    if d.z.abs() > PARALLEL_EPS {
        for (z, sign) in [(-half, -1.0), (half, 1.0)] {
            let t = (z - o.z) / d.z;
            let p = o + d * t;
            if p.x * p.x + p.y * p.y <= r * r && within_sweep(p.x, p.y, sweep) {
                nearest.offer(t, frame.z * sign);
            }
        }
    }

    nearest.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use procray_math::Point3;

    fn z_cylinder() -> Cylinder {
        Cylinder::new(Point3::origin(), Vec3::x(), Vec3::y(), 1.0, 4.0)
    }

    #[test]
    fn test_ray_cylinder_side() {
        let ray = Ray::new(Point3::new(-5.0, 0.0, 0.5), Vec3::new(1.0, 0.0, 0.0));
        let hit = intersect_cylinder(&ray, &z_cylinder(), &RayInterval::unbounded()).unwrap();
        assert_relative_eq!(hit.t, 4.0, epsilon = 1e-12);
        assert_relative_eq!(hit.normal.into_inner(), -Vec3::x(), epsilon = 1e-12);
    }

    #[test]
    fn test_ray_cylinder_cap() {
        let ray = Ray::new(Point3::new(0.3, 0.2, 10.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = intersect_cylinder(&ray, &z_cylinder(), &RayInterval::unbounded()).unwrap();
        assert_relative_eq!(hit.t, 8.0, epsilon = 1e-12);
        assert_relative_eq!(hit.normal.into_inner(), Vec3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_ray_cylinder_misses_past_end() {
        let ray = Ray::new(Point3::new(-5.0, 0.0, 2.5), Vec3::new(1.0, 0.0, 0.0));
        assert!(intersect_cylinder(&ray, &z_cylinder(), &RayInterval::unbounded()).is_none());
    }

    #[test]
    fn test_half_cylinder_rejects_back_half() {
        let half = z_cylinder().with_sweep(180.0);
        // Hits the lateral surface at azimuth 270° first, then 90°.
        let ray = Ray::new(Point3::new(0.0, -5.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
        let hit = intersect_cylinder(&ray, &half, &RayInterval::unbounded()).unwrap();
        assert_relative_eq!(hit.t, 6.0, epsilon = 1e-12);
        // Interior side of the far wall; the normal stays outward.
        assert_relative_eq!(hit.normal.into_inner(), Vec3::y(), epsilon = 1e-12);

        let full = intersect_cylinder(&ray, &z_cylinder(), &RayInterval::unbounded()).unwrap();
        assert_relative_eq!(full.t, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_tilted_cylinder() {
        let c = Cylinder::new(Point3::new(1.0, 1.0, 1.0), Vec3::y(), Vec3::z(), 0.5, 2.0);
        // Axis is x; a ray along -x enters through the +x cap.
        let ray = Ray::new(Point3::new(5.0, 1.1, 0.9), Vec3::new(-1.0, 0.0, 0.0));
        let hit = intersect_cylinder(&ray, &c, &RayInterval::unbounded()).unwrap();
        assert_relative_eq!(hit.t, 3.0, epsilon = 1e-12);
        assert_relative_eq!(hit.normal.into_inner(), Vec3::x(), epsilon = 1e-12);
    }
}
