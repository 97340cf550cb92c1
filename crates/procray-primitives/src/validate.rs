//! Instance validation and basis repair.
//!
//! Malformed instances (non-finite or non-positive sizes, non-finite
//! positions) are rejected; skewed or degenerate orientation pairs are
//! repaired with [`Frame::from_xy`] and never cause a rejection.

use procray_math::{Frame, Point3, Vec3};
use thiserror::Error;

use crate::patch::control_bounds;
use crate::{BezierPatch, Circle, Cone, Cylinder, Ellipse, Line, Plane, Sphere, Torus};

/// Why an instance was left out of the packed scene.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InstanceRejection {
    /// A position or size is NaN or infinite.
    #[error("non-finite {field}")]
    NonFiniteParameter {
        /// Offending field.
        field: &'static str,
    },

    /// A radius, height, or extent is zero or negative.
    #[error("non-positive {field}: {value}")]
    NonPositiveSize {
        /// Offending field.
        field: &'static str,
        /// Value as supplied.
        value: f64,
    },

    /// The primitive has no usable axis (e.g. a zero-length segment).
    #[error("degenerate axis")]
    DegenerateAxis,
}

/// Produce a cleaned copy of an instance, or the reason it cannot be used.
pub trait Validate: Sized {
    /// Validated copy with an orthonormal basis.
    fn validated(&self) -> Result<Self, InstanceRejection>;
}

fn check_point(field: &'static str, p: &Point3) -> Result<Point3, InstanceRejection> {
    if p.iter().all(|c| c.is_finite()) {
        Ok(*p)
    } else {
        Err(InstanceRejection::NonFiniteParameter { field })
    }
}

fn check_size(field: &'static str, value: f64) -> Result<f64, InstanceRejection> {
    if !value.is_finite() {
        return Err(InstanceRejection::NonFiniteParameter { field });
    }
    if value <= 0.0 {
        return Err(InstanceRejection::NonPositiveSize { field, value });
    }
    Ok(value)
}

fn check_sweep(value: f64) -> Result<f64, InstanceRejection> {
    check_size("angle", value).map(|v| v.min(360.0))
}

fn repair(xdir: Vec3, ydir: Vec3) -> (Vec3, Vec3) {
    let frame = Frame::from_xy(xdir, ydir);
    (frame.x, frame.y)
}

impl Validate for Sphere {
    fn validated(&self) -> Result<Self, InstanceRejection> {
        Ok(Self {
            center: check_point("center", &self.center)?,
            radius: check_size("radius", self.radius)?,
        })
    }
}

impl Validate for Cylinder {
    fn validated(&self) -> Result<Self, InstanceRejection> {
        let (xdir, ydir) = repair(self.xdir, self.ydir);
        Ok(Self {
            center: check_point("center", &self.center)?,
            xdir,
            ydir,
            radius: check_size("radius", self.radius)?,
            height: check_size("height", self.height)?,
            angle_deg: check_sweep(self.angle_deg)?,
        })
    }
}

impl Validate for Circle {
    fn validated(&self) -> Result<Self, InstanceRejection> {
        let (xdir, ydir) = repair(self.xdir, self.ydir);
        Ok(Self {
            center: check_point("center", &self.center)?,
            xdir,
            ydir,
            radius: check_size("radius", self.radius)?,
        })
    }
}

impl Validate for Ellipse {
    fn validated(&self) -> Result<Self, InstanceRejection> {
        let (xdir, ydir) = repair(self.xdir, self.ydir);
        Ok(Self {
            center: check_point("center", &self.center)?,
            xdir,
            ydir,
            radius_x: check_size("radius_x", self.radius_x)?,
            radius_y: check_size("radius_y", self.radius_y)?,
        })
    }
}

impl Validate for Cone {
    fn validated(&self) -> Result<Self, InstanceRejection> {
        let (xdir, ydir) = repair(self.xdir, self.ydir);
        Ok(Self {
            center: check_point("center", &self.center)?,
            xdir,
            ydir,
            radius: check_size("radius", self.radius)?,
            height: check_size("height", self.height)?,
        })
    }
}

impl Validate for Line {
    fn validated(&self) -> Result<Self, InstanceRejection> {
        let p0 = check_point("p0", &self.p0)?;
        let p1 = check_point("p1", &self.p1)?;
        let radius = check_size("radius", self.radius)?;
        let length = (p1 - p0).norm();
        if !(length > 0.0) || !length.is_finite() {
            return Err(InstanceRejection::DegenerateAxis);
        }
        Ok(Self { p0, p1, radius })
    }
}

impl Validate for Torus {
    fn validated(&self) -> Result<Self, InstanceRejection> {
        let (xdir, ydir) = repair(self.xdir, self.ydir);
        Ok(Self {
            center: check_point("center", &self.center)?,
            xdir,
            ydir,
            major_radius: check_size("major_radius", self.major_radius)?,
            minor_radius: check_size("minor_radius", self.minor_radius)?,
            angle_deg: check_sweep(self.angle_deg)?,
        })
    }
}

impl Validate for Plane {
    fn validated(&self) -> Result<Self, InstanceRejection> {
        let (xdir, ydir) = repair(self.xdir, self.ydir);
        Ok(Self {
            center: check_point("center", &self.center)?,
            xdir,
            ydir,
            half_width: check_size("half_width", self.half_width)?,
            half_height: check_size("half_height", self.half_height)?,
        })
    }
}

impl Validate for BezierPatch {
    fn validated(&self) -> Result<Self, InstanceRejection> {
        for p in &self.control {
            check_point("control point", p)?;
        }
        let diagonal = control_bounds(&self.control).diagonal();
        if !(diagonal > 0.0) {
            return Err(InstanceRejection::NonPositiveSize {
                field: "extent",
                value: diagonal,
            });
        }
        Ok(BezierPatch::new(self.control, self.max_depth, self.pixel_tolerance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_radius_rejected() {
        let s = Sphere::new(Point3::origin(), -1.0);
        assert_eq!(
            s.validated(),
            Err(InstanceRejection::NonPositiveSize {
                field: "radius",
                value: -1.0
            })
        );
    }

    #[test]
    fn test_nan_center_rejected() {
        let s = Sphere::new(Point3::new(f64::NAN, 0.0, 0.0), 1.0);
        assert_eq!(
            s.validated(),
            Err(InstanceRejection::NonFiniteParameter { field: "center" })
        );
    }

    #[test]
    fn test_skewed_basis_repaired() {
        let c = Cylinder::new(
            Point3::origin(),
            Vec3::new(0.0, 0.0, 3.0),
            Vec3::new(1.0, 0.0, 1.0),
            1.0,
            2.0,
        );
        let v = c.validated().unwrap();
        assert!(v.frame().is_orthonormal(1e-12));
        assert!((v.xdir - Vec3::z()).norm() < 1e-12);
        assert!((v.ydir - Vec3::x()).norm() < 1e-12);
    }

    #[test]
    fn test_sweep_clamped() {
        let t = Torus::new(Point3::origin(), Vec3::x(), Vec3::y(), 2.0, 0.5).with_sweep(720.0);
        assert_eq!(t.validated().unwrap().angle_deg, 360.0);
        let t = t.with_sweep(0.0);
        assert!(t.validated().is_err());
    }

    #[test]
    fn test_zero_length_line_rejected() {
        let l = Line::new(Point3::origin(), Point3::origin(), 0.1);
        assert_eq!(l.validated(), Err(InstanceRejection::DegenerateAxis));
    }

    #[test]
    fn test_infinite_height_rejected() {
        let c = Cone::new(Point3::origin(), Vec3::x(), Vec3::y(), 1.0, f64::INFINITY);
        assert_eq!(
            c.validated(),
            Err(InstanceRejection::NonFiniteParameter { field: "height" })
        );
    }

    #[test]
    fn test_collapsed_patch_rejected() {
        let patch = BezierPatch::new([Point3::new(1.0, 1.0, 1.0); 16], 10, 3.0);
        assert!(matches!(
            patch.validated(),
            Err(InstanceRejection::NonPositiveSize { field: "extent", .. })
        ));
    }
}
