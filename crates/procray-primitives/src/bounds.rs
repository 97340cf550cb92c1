//! Bounding volume builder.
//!
//! Each kind computes a conservative axis-aligned box directly from its
//! parameters. Oriented kinds use the absolute components of their basis
//! vectors, which bounds any orientation without trigonometry. Flat kinds
//! get a thin pad along their normal so acceleration-structure box tests
//! never see a zero-thickness box.
//!
//! All implementations assume a validated instance (see [`crate::Validate`]).

use procray_math::{abs_components, Vec3};

use crate::{Aabb3, BezierPatch, Circle, Cone, Cylinder, Ellipse, Line, Plane, Sphere, Torus};

/// Normal-direction pad of flat primitives, relative to their size.
const FLAT_PAD_RELATIVE: f64 = 1e-3;
/// Floor of the flat-primitive pad.
const FLAT_PAD_MIN: f64 = 1e-5;
/// Pad of line boxes, relative to length plus thickness.
const LINE_PAD_RELATIVE: f64 = 1e-4;
/// Scale applied to the torus extent to cover its curvature.
const TORUS_SAFETY: f64 = 1.01;
/// Absolute part of the torus pad.
const TORUS_PAD_ABS: f64 = 1e-5;
/// Relative part of the torus pad.
const TORUS_PAD_RELATIVE: f64 = 1e-4;

/// Something with a conservative axis-aligned bounding box.
pub trait Bounded {
    /// Box that contains the whole primitive.
    fn aabb(&self) -> Aabb3;
}

fn flat_pad(size: f64) -> f64 {
    (size * FLAT_PAD_RELATIVE).max(FLAT_PAD_MIN)
}

impl Bounded for Sphere {
    fn aabb(&self) -> Aabb3 {
        Aabb3::from_center_extent(&self.center, &Vec3::repeat(self.radius))
    }
}

impl Bounded for Cylinder {
    fn aabb(&self) -> Aabb3 {
        let f = self.frame();
        let extent = (abs_components(&f.x) + abs_components(&f.y)) * self.radius
            + abs_components(&f.z) * (self.height * 0.5);
        Aabb3::from_center_extent(&self.center, &extent)
    }
}

impl Bounded for Cone {
    fn aabb(&self) -> Aabb3 {
        // The base circle is the widest section, so bounding the cylinder of
        // the same radius bounds the cone.
        let f = self.frame();
        let extent = (abs_components(&f.x) + abs_components(&f.y)) * self.radius
            + abs_components(&f.z) * (self.height * 0.5);
        Aabb3::from_center_extent(&self.center, &extent)
    }
}

impl Bounded for Circle {
    fn aabb(&self) -> Aabb3 {
        let f = self.frame();
        let extent = (abs_components(&f.x) + abs_components(&f.y)) * self.radius
            + abs_components(&f.z) * flat_pad(self.radius);
        Aabb3::from_center_extent(&self.center, &extent)
    }
}

impl Bounded for Ellipse {
    fn aabb(&self) -> Aabb3 {
        let f = self.frame();
        let max_radius = self.radius_x.max(self.radius_y);
        let extent = abs_components(&f.x) * self.radius_x
            + abs_components(&f.y) * self.radius_y
            + abs_components(&f.z) * flat_pad(max_radius);
        Aabb3::from_center_extent(&self.center, &extent)
    }
}

impl Bounded for Plane {
    fn aabb(&self) -> Aabb3 {
        let f = self.frame();
        let extent = abs_components(&f.x) * self.half_width
            + abs_components(&f.y) * self.half_height
            + abs_components(&f.z) * flat_pad(self.half_width.max(self.half_height));
        Aabb3::from_center_extent(&self.center, &extent)
    }
}

impl Bounded for Line {
    fn aabb(&self) -> Aabb3 {
        let f = self.frame();
        // Half-diagonal of the square cross-section, per axis.
        let section = (abs_components(&f.y) + abs_components(&f.z)) * self.radius;
        let mut aabb = Aabb3::from_points(&[self.p0, self.p1]);
        aabb.min -= section;
        aabb.max += section;
        aabb.expand((self.length() + self.radius) * LINE_PAD_RELATIVE);
        aabb
    }
}

impl Bounded for Torus {
    fn aabb(&self) -> Aabb3 {
        let f = self.frame();
        let outer = self.major_radius + self.minor_radius;
        let extent = ((abs_components(&f.x) + abs_components(&f.y)) * outer
            + abs_components(&f.z) * self.minor_radius)
            * TORUS_SAFETY;
        let mut aabb = Aabb3::from_center_extent(&self.center, &extent);
        aabb.expand(TORUS_PAD_ABS + outer * TORUS_PAD_RELATIVE);
        aabb
    }
}

impl Bounded for BezierPatch {
    fn aabb(&self) -> Aabb3 {
        self.aabb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Validate;
    use procray_math::{Frame, Point3};
    use proptest::prelude::*;
    use std::f64::consts::TAU;

    const STEPS: usize = 48;

    fn angles() -> impl Iterator<Item = f64> {
        (0..STEPS).map(|i| i as f64 / STEPS as f64 * TAU)
    }

    fn skewed_frame() -> (Vec3, Vec3) {
        let f = Frame::from_xy(Vec3::new(0.3, 0.9, -0.2), Vec3::new(-0.5, 0.1, 0.8));
        (f.x, f.y)
    }

    fn assert_contains(aabb: &Aabb3, p: &Point3) {
        assert!(aabb.contains_point(p), "{p:?} escapes {aabb:?}");
    }

    #[test]
    fn test_sphere_bounds() {
        let s = Sphere::new(Point3::new(1.0, 2.0, 3.0), 0.5);
        let aabb = s.aabb();
        assert_eq!(aabb.min, Point3::new(0.5, 1.5, 2.5));
        assert_eq!(aabb.max, Point3::new(1.5, 2.5, 3.5));
    }

    #[test]
    fn test_cylinder_bounds_contain_surface() {
        let (x, y) = skewed_frame();
        let c = Cylinder::new(Point3::new(1.0, -1.0, 0.5), x, y, 0.7, 2.0).validated().unwrap();
        let f = c.frame();
        let aabb = c.aabb();
        for a in angles() {
            for h in [-1.0, 0.0, 1.0] {
                let p = c.center + (f.x * a.cos() + f.y * a.sin()) * c.radius + f.z * h;
                assert_contains(&aabb, &p);
            }
        }
    }

    #[test]
    fn test_axis_aligned_cylinder_is_tight() {
        let c = Cylinder::new(Point3::origin(), Vec3::x(), Vec3::y(), 1.0, 4.0);
        let aabb = c.aabb();
        assert_eq!(aabb.max, Point3::new(1.0, 1.0, 2.0));
    }

    #[test]
    fn test_cone_bounds_contain_surface() {
        let (x, y) = skewed_frame();
        let c = Cone::new(Point3::new(0.0, 3.0, 0.0), x, y, 1.5, 3.0).validated().unwrap();
        let f = c.frame();
        let aabb = c.aabb();
        for a in angles() {
            for s in [0.0, 0.5, 1.0] {
                let radius = c.radius * (1.0 - s);
                let h = -c.height * 0.5 + c.height * s;
                let p = c.center + (f.x * a.cos() + f.y * a.sin()) * radius + f.z * h;
                assert_contains(&aabb, &p);
            }
        }
    }

    #[test]
    fn test_disk_and_ellipse_have_thickness() {
        let circle = Circle::new(Point3::origin(), Vec3::x(), Vec3::y(), 2.0);
        let aabb = circle.aabb();
        assert!(aabb.max.z - aabb.min.z > 0.0);
        assert!((aabb.max.x - 2.0).abs() < 1e-12);

        let tiny = Circle::new(Point3::origin(), Vec3::x(), Vec3::y(), 1e-6);
        let aabb = tiny.aabb();
        assert!(aabb.max.z >= FLAT_PAD_MIN);

        let (x, y) = skewed_frame();
        let e = Ellipse::new(Point3::new(0.0, 0.0, 1.0), x, y, 3.0, 0.5);
        let aabb = e.aabb();
        for a in angles() {
            let p = e.center + x * (3.0 * a.cos()) + y * (0.5 * a.sin());
            assert_contains(&aabb, &p);
        }
    }

    #[test]
    fn test_plane_bounds() {
        let (x, y) = skewed_frame();
        let p = Plane::new(Point3::new(5.0, 0.0, 0.0), x, y, 2.0, 1.0);
        let aabb = p.aabb();
        for (sx, sy) in [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)] {
            assert_contains(&aabb, &(p.center + x * (2.0 * sx) + y * sy));
        }
    }

    #[test]
    fn test_line_bounds_contain_box_corners() {
        let l = Line::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 2.0, 3.0), 0.2);
        let f = l.frame();
        let aabb = l.aabb();
        for end in [l.p0, l.p1] {
            for (sy, sz) in [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)] {
                assert_contains(&aabb, &(end + f.y * (0.2 * sy) + f.z * (0.2 * sz)));
            }
        }
    }

    #[test]
    fn test_torus_bounds_contain_surface() {
        let (x, y) = skewed_frame();
        let t = Torus::new(Point3::new(-2.0, 1.0, 0.0), x, y, 1.0, 0.3).validated().unwrap();
        let f = t.frame();
        let aabb = t.aabb();
        for theta in angles() {
            let ring = f.x * theta.cos() + f.y * theta.sin();
            for phi in angles() {
                let p = t.center
                    + ring * (t.major_radius + t.minor_radius * phi.cos())
                    + f.z * (t.minor_radius * phi.sin());
                assert_contains(&aabb, &p);
            }
        }
    }

    proptest! {
        #[test]
        fn torus_bounds_hold_for_any_basis(
            xs in prop::array::uniform3(-1.0f64..1.0),
            ys in prop::array::uniform3(-1.0f64..1.0),
            major in 0.1f64..10.0,
            minor in 0.01f64..5.0,
            theta in 0.0f64..TAU,
            phi in 0.0f64..TAU,
        ) {
            let t = Torus::new(Point3::origin(), Vec3::from(xs), Vec3::from(ys), major, minor)
                .validated()
                .unwrap();
            let f = t.frame();
            let ring = f.x * theta.cos() + f.y * theta.sin();
            let p = t.center + ring * (major + minor * phi.cos()) + f.z * (minor * phi.sin());
            prop_assert!(t.aabb().contains_point(&p));
        }
    }
}
