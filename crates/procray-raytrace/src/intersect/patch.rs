//! Ray-patch intersection by adaptive subdivision with Newton refinement.
//!
//! Sub-patches are visited nearest-first from a bounded priority queue
//! keyed by the ray's entry distance into their control-point box. A
//! sub-patch small enough for the pixel footprint at its distance (or at
//! the depth limit) is a leaf: Newton iteration from its center either
//! finds the surface point or the leaf is discarded. Larger sub-patches are
//! split into four with de Casteljau.

use procray_math::{Point3, Vec3};
use procray_primitives::patch::{control_bounds, quadrants, sample};
use procray_primitives::BezierPatch;

use super::{Nearest, SurfaceHit};
use crate::queue::BoundedMinQueue;
use crate::{Ray, RayInterval};

/// Pending sub-patches per ray. Beyond this the farthest candidates are dropped.
pub const QUEUE_CAPACITY: usize = 32;

/// Maximum Newton iterations per leaf.
const MAX_ITERATIONS: usize = 8;
/// Convergence tolerance, relative to the patch size.
const TOLERANCE: f64 = 1e-9;
/// Convergence tolerance on the `(u, v)` update.
const PARAM_EPS: f64 = 1e-7;
/// Accepted distance of a leaf solution outside its own unit square.
const UV_MARGIN: f64 = 1e-3;
/// Relative pad applied to sub-patch boxes.
const CHILD_PAD: f64 = 1e-7;

/// Per-query tunables shared by every patch of a scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchQuery {
    /// Angular size of one pixel: the footprint at distance `t` is `t * pixel_spread`.
    pub pixel_spread: f64,
    /// Leaf edge floor in world units, scaled by the patch pixel tolerance.
    pub min_leaf_edge: f64,
}

impl Default for PatchQuery {
    fn default() -> Self {
        Self {
            pixel_spread: 1e-3,
            min_leaf_edge: 1e-4,
        }
    }
}

struct Node {
    control: [Point3; 16],
    depth: u32,
}

/// Intersect a ray with a Bézier patch.
///
/// The returned normal is `∂P/∂u × ∂P/∂v` at the hit, unflipped.
pub fn intersect_patch(
    ray: &Ray,
    patch: &BezierPatch,
    interval: &RayInterval,
    query: &PatchQuery,
) -> Option<SurfaceHit> {
    let (t_entry, _) = ray.intersect_aabb_within(&patch.aabb, interval.t_min, interval.upper())?;

    let tolerance = TOLERANCE * patch.aabb.diagonal().max(1.0);
    let pad_floor = CHILD_PAD * patch.aabb.diagonal();
    let mut local = *interval;
    let mut best: Option<SurfaceHit> = None;

    let mut queue: BoundedMinQueue<Node, QUEUE_CAPACITY> = BoundedMinQueue::new();
    queue.push(
        t_entry,
        Node {
            control: patch.control,
            depth: 0,
        },
    );

    while let Some((t_near, node)) = queue.pop_min() {
        if local.prunes(t_near) {
            break;
        }

        let bounds = control_bounds(&node.control);
        let footprint = patch.pixel_tolerance * query.pixel_spread * t_near;
        let leaf_edge = (patch.pixel_tolerance * query.min_leaf_edge).max(footprint);

        if bounds.largest_edge() <= leaf_edge || node.depth >= patch.max_depth {
            if let Some(hit) = refine(ray, &node.control, &local, tolerance) {
                local.record(hit.t);
                best = Some(hit);
            }
            continue;
        }

        for child in quadrants(&node.control) {
            let mut child_bounds = control_bounds(&child);
            child_bounds.expand((child_bounds.diagonal() * CHILD_PAD).max(pad_floor));
            let entry = ray.intersect_aabb_within(&child_bounds, local.t_min, local.upper());
            if let Some((near, _)) = entry {
                queue.push(
                    near,
                    Node {
                        control: child,
                        depth: node.depth + 1,
                    },
                );
            }
        }
    }

    if queue.dropped() > 0 {
        log::trace!("patch traversal dropped {} sub-patches", queue.dropped());
    }
    best
}

/// Solve `P(u, v) = o + t·d` on one control grid by Newton iteration from
/// the grid's center, with Cramer's rule on the Jacobian `[∂P/∂u, ∂P/∂v, -d]`.
fn refine(
    ray: &Ray,
    control: &[Point3; 16],
    interval: &RayInterval,
    tolerance: f64,
) -> Option<SurfaceHit> {
    let d = ray.direction.into_inner();
    let neg_d = -d;
    let (mut u, mut v) = (0.5, 0.5);
    let mut t = (sample(control, u, v).point - ray.origin).dot(&d);

    let mut converged = false;
    for _ in 0..MAX_ITERATIONS {
        let s = sample(control, u, v);
        let f = s.point - ray.at(t);

        let det = triple(&s.du, &s.dv, &neg_d);
        if det.abs() < 1e-14 {
            return None;
        }
        let rhs = -f;
        let delta_u = triple(&rhs, &s.dv, &neg_d) / det;
        let delta_v = triple(&s.du, &rhs, &neg_d) / det;
        let delta_t = triple(&s.du, &s.dv, &rhs) / det;
        u += delta_u;
        v += delta_v;
        t += delta_t;

        if !(u.abs() < 4.0 && v.abs() < 4.0 && t.is_finite()) {
            return None;
        }

        let residual = (sample(control, u, v).point - ray.at(t)).norm();
        if residual < tolerance
            && delta_u.abs() < PARAM_EPS
            && delta_v.abs() < PARAM_EPS
            && delta_t.abs() < tolerance
        {
            converged = true;
            break;
        }
    }
    if !converged {
        return None;
    }

    let in_square = |x: f64| (-UV_MARGIN..=1.0 + UV_MARGIN).contains(&x);
    if !in_square(u) || !in_square(v) {
        return None;
    }

    let s = sample(control, u.clamp(0.0, 1.0), v.clamp(0.0, 1.0));
    let mut nearest = Nearest::new(interval);
    nearest.offer(t, s.du.cross(&s.dv));
    nearest.finish()
}

/// Scalar triple product `a · (b × c)`, the determinant of the columns `[a, b, c]`.
#[inline]
fn triple(a: &Vec3, b: &Vec3, c: &Vec3) -> f64 {
    a.dot(&b.cross(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use procray_primitives::{HermitePatch, PatchDefaults};

    fn flat_patch(z: f64) -> BezierPatch {
        HermitePatch::new(
            [
                Point3::new(0.0, 0.0, z),
                Point3::new(1.0, 0.0, z),
                Point3::new(0.0, 1.0, z),
                Point3::new(1.0, 1.0, z),
            ],
            [Vec3::x(); 4],
            [Vec3::y(); 4],
        )
        .to_bezier(&PatchDefaults::default())
    }

    fn cast(ray: &Ray, patch: &BezierPatch) -> Option<SurfaceHit> {
        intersect_patch(ray, patch, &RayInterval::unbounded(), &PatchQuery::default())
    }

    fn dome() -> BezierPatch {
        // Uniform in x and y, with the four inner control points lifted to
        // z = 1; the surface peaks at 0.5625 over the center.
        let mut control = [Point3::origin(); 16];
        for a in 0..4 {
            for b in 0..4 {
                let inner = (1..3).contains(&a) && (1..3).contains(&b);
                let z = if inner { 1.0 } else { 0.0 };
                control[a * 4 + b] = Point3::new(a as f64 / 3.0, b as f64 / 3.0, z);
            }
        }
        BezierPatch::new(control, 12, 1.0)
    }

    #[test]
    fn test_flat_patch_hit() {
        let patch = flat_patch(0.5);
        let ray = Ray::new(Point3::new(0.25, 0.75, 3.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = cast(&ray, &patch).unwrap();
        assert_relative_eq!(hit.t, 2.5, epsilon = 1e-8);
        assert_relative_eq!(hit.normal.z.abs(), 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_flat_patch_miss_outside() {
        let patch = flat_patch(0.0);
        let ray = Ray::new(Point3::new(1.5, 0.5, 3.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(cast(&ray, &patch).is_none());
    }

    #[test]
    fn test_curved_patch_hit_lies_on_surface() {
        let patch = dome();
        let ray = Ray::new(Point3::new(0.4, 0.55, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = cast(&ray, &patch).unwrap();
        let p = ray.at(hit.t);

        // x(u) = u and y(v) = v on this grid, so the surface point under
        // the hit is at (u, v) = (x, y).
        let surface = patch.sample(p.x, p.y).point;
        assert_relative_eq!(surface, p, epsilon = 1e-6);
        assert!(p.z > 0.0 && p.z < 0.5625 + 1e-9);
    }

    #[test]
    fn test_patch_respects_best_so_far() {
        let patch = flat_patch(0.0);
        let ray = Ray::new(Point3::new(0.5, 0.5, 3.0), Vec3::new(0.0, 0.0, -1.0));
        let mut interval = RayInterval::unbounded();
        interval.record(2.0);
        assert!(intersect_patch(&ray, &patch, &interval, &PatchQuery::default()).is_none());
    }

    #[test]
    fn test_refined_point_verified_after_last_step() {
        let patch = dome();
        let tolerance = TOLERANCE * patch.aabb.diagonal().max(1.0);
        let ray = Ray::new(Point3::new(0.3, 0.6, 4.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = refine(&ray, &patch.control, &RayInterval::unbounded(), tolerance).unwrap();
        let p = ray.at(hit.t);
        let surface = patch.sample(p.x, p.y).point;
        assert!((surface - p).norm() < tolerance);
    }

    #[test]
    fn test_refine_rejects_grazing_ray() {
        // Parallel to the flat patch: the Jacobian is singular.
        let patch = flat_patch(0.0);
        let ray = Ray::new(Point3::new(-1.0, 0.5, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(refine(&ray, &patch.control, &RayInterval::unbounded(), 1e-9).is_none());
    }

    #[test]
    fn test_oblique_ray_on_tilted_patch() {
        // Plane x + z = 1 over the unit square in (y, z).
        let mut control = [Point3::origin(); 16];
        for a in 0..4 {
            for b in 0..4 {
                let z = a as f64 / 3.0;
                control[a * 4 + b] = Point3::new(1.0 - z, b as f64 / 3.0, z);
            }
        }
        let patch = BezierPatch::new(control, 10, 3.0);
        let ray = Ray::new(Point3::new(-2.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        let hit = cast(&ray, &patch).unwrap();
        assert_relative_eq!(hit.t, 2.5, epsilon = 1e-8);
    }
}
