//! Ray-disk and ray-ellipse intersection.

use procray_primitives::{Circle, Ellipse};

use super::plane::intersect_flat;
use super::SurfaceHit;
use crate::{Ray, RayInterval};

/// Intersect a ray with a flat disk.
pub fn intersect_circle(ray: &Ray, circle: &Circle, interval: &RayInterval) -> Option<SurfaceHit> {
    let r2 = circle.radius * circle.radius;
    intersect_flat(ray, &circle.center, &circle.frame(), interval, |u, v| {
        u * u + v * v <= r2
    })
}

/// Intersect a ray with a flat elliptical disk.
pub fn intersect_ellipse(
    ray: &Ray,
    ellipse: &Ellipse,
    interval: &RayInterval,
) -> Option<SurfaceHit> {
    let (rx, ry) = (ellipse.radius_x, ellipse.radius_y);
    intersect_flat(ray, &ellipse.center, &ellipse.frame(), interval, |u, v| {
        let (a, b) = (u / rx, v / ry);
        a * a + b * b <= 1.0
    })
}
