//! Ray-line intersection.
//!
//! A line is rendered as a thin box: `length` along the segment and
//! `2·radius` across it, oriented by the frame built from the segment
//! direction. The slab test runs in that local frame.

use procray_math::Vec3;
use procray_primitives::Line;

use super::{Nearest, SurfaceHit};
use crate::{Ray, RayInterval};

const PARALLEL_EPS: f64 = 1e-15;

/// Intersect a ray with a thick segment.
///
/// Reports the entry face when it is accepted, otherwise the exit face (a
/// ray that starts inside the box).
pub fn intersect_line(ray: &Ray, line: &Line, interval: &RayInterval) -> Option<SurfaceHit> {
    let frame = line.frame();
    let mid = line.p0 + (line.p1 - line.p0) * 0.5;
    let o = frame.to_local(&(ray.origin - mid));
    let d = frame.to_local(ray.direction.as_ref());
    let half = Vec3::new(line.length() * 0.5, line.radius, line.radius);

    let mut t_enter = f64::NEG_INFINITY;
    let mut t_exit = f64::INFINITY;
    let mut enter_axis = 0;
    let mut exit_axis = 0;

    for axis in 0..3 {
        if d[axis].abs() < PARALLEL_EPS {
            if o[axis].abs() > half[axis] {
                return None;
            }
            continue;
        }
        let t0 = (-half[axis] - o[axis]) / d[axis];
        let t1 = (half[axis] - o[axis]) / d[axis];
        let (near, far) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        if near > t_enter {
            t_enter = near;
            enter_axis = axis;
        }
        if far < t_exit {
            t_exit = far;
            exit_axis = axis;
        }
    }
    if t_enter > t_exit {
        return None;
    }

    let face_normal = |axis: usize, sign: f64| {
        let mut n = Vec3::zeros();
        n[axis] = sign;
        frame.to_world(&n)
    };

    let mut nearest = Nearest::new(interval);
    nearest.offer(t_enter, face_normal(enter_axis, -d[enter_axis].signum()));
    if nearest.is_empty() {
        nearest.offer(t_exit, face_normal(exit_axis, d[exit_axis].signum()));
    }
    nearest.finish()
}
