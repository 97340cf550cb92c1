//! Ray-rectangle intersection and the shared flat-primitive test.

use procray_math::{Frame, Point3};
use procray_primitives::Plane;

use super::{facing, SurfaceHit};
use crate::{Ray, RayInterval};

const PARALLEL_EPS: f64 = 1e-12;

/// Hit the plane through `center` spanned by `frame.x`/`frame.y` and keep it
/// when `inside(u, v)` accepts the in-plane coordinates.
pub(super) fn intersect_flat(
    ray: &Ray,
    center: &Point3,
    frame: &Frame,
    interval: &RayInterval,
    inside: impl Fn(f64, f64) -> bool,
) -> Option<SurfaceHit> {
    let d = ray.direction.as_ref();
    let denom = d.dot(&frame.z);
    if denom.abs() < PARALLEL_EPS {
        return None;
    }

    let t = (center - ray.origin).dot(&frame.z) / denom;
    if !interval.accepts(t) {
        return None;
    }

    let rel = ray.at(t) - center;
    if !inside(rel.dot(&frame.x), rel.dot(&frame.y)) {
        return None;
    }

    let mut nearest = super::Nearest::new(interval);
    nearest.offer(t, facing(frame.z, d));
    nearest.finish()
}

/// Intersect a ray with a finite rectangle.
pub fn intersect_plane(ray: &Ray, plane: &Plane, interval: &RayInterval) -> Option<SurfaceHit> {
    let (hw, hh) = (plane.half_width, plane.half_height);
    intersect_flat(ray, &plane.center, &plane.frame(), interval, |u, v| {
        u.abs() <= hw && v.abs() <= hh
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use procray_math::Vec3;

    fn floor() -> Plane {
        Plane::new(Point3::origin(), Vec3::x(), Vec3::y(), 2.0, 1.0)
    }

    #[test]
    fn test_ray_plane_hit_from_above() {
        let ray = Ray::new(Point3::new(1.5, 0.5, 3.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = intersect_plane(&ray, &floor(), &RayInterval::unbounded()).unwrap();
        assert_relative_eq!(hit.t, 3.0, epsilon = 1e-12);
        assert_relative_eq!(hit.normal.into_inner(), Vec3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_ray_plane_normal_faces_ray_from_below() {
        let ray = Ray::new(Point3::new(0.0, 0.0, -3.0), Vec3::new(0.0, 0.0, 1.0));
        let hit = intersect_plane(&ray, &floor(), &RayInterval::unbounded()).unwrap();
        assert_relative_eq!(hit.normal.into_inner(), -Vec3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_ray_plane_outside_extent() {
        let ray = Ray::new(Point3::new(0.0, 1.5, 3.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(intersect_plane(&ray, &floor(), &RayInterval::unbounded()).is_none());
    }

    #[test]
    fn test_ray_parallel_to_plane() {
        let ray = Ray::new(Point3::new(-5.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(intersect_plane(&ray, &floor(), &RayInterval::unbounded()).is_none());
    }
}
