//! Ray-sphere intersection (quadratic equation).

use procray_primitives::Sphere;

use super::{Nearest, SurfaceHit};
use crate::{Ray, RayInterval};

/// Both roots of `|o + t·d - c|² = r²`, ascending, or `None` on a miss.
///
/// Uses the half-coefficient form with the cancellation-free pairing
/// `t₁ = -b - sign(b)·√disc`, `t₂ = c / t₁`.
pub fn sphere_roots(ray: &Ray, sphere: &Sphere) -> Option<(f64, f64)> {
    let oc = ray.origin - sphere.center;
    let d = ray.direction.as_ref();

    let half_b = oc.dot(d);
    let c = oc.dot(&oc) - sphere.radius * sphere.radius;

    let discriminant = half_b * half_b - c;
    if discriminant < 0.0 {
        return None;
    }

    let q = -half_b - half_b.signum() * discriminant.sqrt();
    let (t1, t2) = if q != 0.0 { (q, c / q) } else { (0.0, 0.0) };
    Some(if t1 <= t2 { (t1, t2) } else { (t2, t1) })
}

/// Intersect a ray with a sphere.
///
/// The nearer root is reported if it is accepted, otherwise the farther one
/// (a ray starting inside the sphere hits it from within). The normal points
/// outward.
pub fn intersect_sphere(ray: &Ray, sphere: &Sphere, interval: &RayInterval) -> Option<SurfaceHit> {
    let (t1, t2) = sphere_roots(ray, sphere)?;
    let mut nearest = Nearest::new(interval);
    for t in [t1, t2] {
        nearest.offer(t, (ray.at(t) - sphere.center) / sphere.radius);
    }
    nearest.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use procray_math::{Point3, Vec3};

    #[test]
    fn test_ray_sphere_front_hit() {
        let sphere = Sphere::new(Point3::origin(), 1.0);
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = intersect_sphere(&ray, &sphere, &RayInterval::unbounded()).unwrap();
        assert_relative_eq!(hit.t, 4.0, epsilon = 1e-12);
        assert_relative_eq!(hit.normal.into_inner(), Vec3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_ray_sphere_from_inside() {
        let sphere = Sphere::new(Point3::origin(), 2.0);
        let ray = Ray::new(Point3::origin(), Vec3::new(1.0, 0.0, 0.0));
        let hit = intersect_sphere(&ray, &sphere, &RayInterval::unbounded()).unwrap();
        assert_relative_eq!(hit.t, 2.0, epsilon = 1e-12);
        assert_relative_eq!(hit.normal.into_inner(), Vec3::x(), epsilon = 1e-12);
    }

    #[test]
    fn test_ray_sphere_miss() {
        let sphere = Sphere::new(Point3::origin(), 1.0);
        let ray = Ray::new(Point3::new(0.0, 2.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(intersect_sphere(&ray, &sphere, &RayInterval::unbounded()).is_none());
    }

    #[test]
    fn test_ray_sphere_respects_best() {
        let sphere = Sphere::new(Point3::origin(), 1.0);
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let mut interval = RayInterval::unbounded();
        interval.record(3.0);
        assert!(intersect_sphere(&ray, &sphere, &interval).is_none());
    }

    #[test]
    fn test_far_root_when_near_root_before_t_min() {
        let sphere = Sphere::new(Point3::origin(), 1.0);
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = intersect_sphere(&ray, &sphere, &RayInterval::new(4.5, 100.0)).unwrap();
        assert_relative_eq!(hit.t, 6.0, epsilon = 1e-12);
        assert_relative_eq!(hit.normal.into_inner(), -Vec3::z(), epsilon = 1e-12);
    }
}
