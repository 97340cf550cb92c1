#![warn(missing_docs)]

//! Math types for the procray analytic ray caster.
//!
//! Thin wrappers around nalgebra providing the handful of domain types the
//! primitive model and the intersection kernels share: points, vectors,
//! unit directions, and orthonormal frames, plus the sanitizing and
//! azimuth helpers every oriented primitive relies on.

use nalgebra::{Unit, Vector3};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// Squared length below which a direction is treated as zero.
const DEGENERATE_LENGTH_SQ: f64 = 1e-24;

/// A right-handed orthonormal frame: `z = x × y`.
///
/// Every oriented primitive stores its basis through a `Frame` so that the
/// bounding volume builder and the intersection kernels agree on the axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// First in-plane direction (azimuth 0).
    pub x: Vec3,
    /// Second in-plane direction (azimuth 90°).
    pub y: Vec3,
    /// Normal / revolution axis.
    pub z: Vec3,
}

impl Frame {
    /// The world frame.
    pub fn world() -> Self {
        Self {
            x: Vec3::x(),
            y: Vec3::y(),
            z: Vec3::z(),
        }
    }

    /// Build an orthonormal frame from a possibly skewed `(xdir, ydir)` pair.
    ///
    /// `xdir` is normalized and `ydir` is re-orthogonalized against it
    /// (Gram-Schmidt). Zero, non-finite, or parallel inputs fall back to a
    /// reference axis, so this never fails.
    pub fn from_xy(xdir: Vec3, ydir: Vec3) -> Self {
        let xdir = sanitize_vec(xdir);
        let ydir = sanitize_vec(ydir);

        let x = if xdir.norm_squared() > DEGENERATE_LENGTH_SQ {
            xdir.normalize()
        } else if ydir.norm_squared() > DEGENERATE_LENGTH_SQ {
            perpendicular_to(&ydir.normalize())
        } else {
            Vec3::x()
        };

        let y_perp = ydir - ydir.dot(&x) * x;
        let y = if y_perp.norm_squared() > DEGENERATE_LENGTH_SQ * ydir.norm_squared().max(1.0) {
            y_perp.normalize()
        } else {
            perpendicular_to(&x)
        };

        // Re-project once more to squeeze out the rounding left by a nearly
        // parallel input pair.
        let y = (y - y.dot(&x) * x).normalize();
        let z = x.cross(&y).normalize();
        Self { x, y, z }
    }

    /// Complete an already orthonormal `(x, y)` pair with `z = x × y`.
    ///
    /// No repair is performed; use [`Frame::from_xy`] on untrusted input.
    #[inline]
    pub fn from_orthonormal(x: Vec3, y: Vec3) -> Self {
        Self { x, y, z: x.cross(&y) }
    }

    /// Build a frame whose `x` axis is `dir`; the other two axes are arbitrary.
    pub fn from_axis_x(dir: Vec3) -> Self {
        let dir = sanitize_vec(dir);
        let x = if dir.norm_squared() > DEGENERATE_LENGTH_SQ {
            dir.normalize()
        } else {
            Vec3::x()
        };
        let y = perpendicular_to(&x);
        let z = x.cross(&y);
        Self { x, y, z }
    }

    /// Express a world-space vector in this frame.
    #[inline]
    pub fn to_local(&self, v: &Vec3) -> Vec3 {
        Vec3::new(v.dot(&self.x), v.dot(&self.y), v.dot(&self.z))
    }

    /// Express a frame-local vector in world space.
    #[inline]
    pub fn to_world(&self, v: &Vec3) -> Vec3 {
        self.x * v.x + self.y * v.y + self.z * v.z
    }

    /// Check that the frame is orthonormal within `eps`.
    pub fn is_orthonormal(&self, eps: f64) -> bool {
        (self.x.norm() - 1.0).abs() < eps
            && (self.y.norm() - 1.0).abs() < eps
            && (self.z.norm() - 1.0).abs() < eps
            && self.x.dot(&self.y).abs() < eps
            && self.x.dot(&self.z).abs() < eps
            && self.y.dot(&self.z).abs() < eps
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::world()
    }
}

/// A unit vector perpendicular to the unit vector `a`.
pub fn perpendicular_to(a: &Vec3) -> Vec3 {
    let reference = if a.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
    (reference - reference.dot(a) * a).normalize()
}

/// Replace non-finite components with zero.
#[inline]
pub fn sanitize_vec(v: Vec3) -> Vec3 {
    v.map(|c| if c.is_finite() { c } else { 0.0 })
}

/// Replace non-finite coordinates with zero.
#[inline]
pub fn sanitize_point(p: Point3) -> Point3 {
    Point3::from(sanitize_vec(p.coords))
}

/// Componentwise absolute value.
#[inline]
pub fn abs_components(v: &Vec3) -> Vec3 {
    v.map(f64::abs)
}

/// Azimuth of the in-plane coordinates `(x, y)` in degrees, wrapped into `[0, 360)`.
#[inline]
pub fn azimuth_deg(x: f64, y: f64) -> f64 {
    let deg = y.atan2(x).to_degrees();
    let deg = if deg < 0.0 { deg + 360.0 } else { deg };
    // A tiny negative angle rounds up to exactly 360.0.
    if deg >= 360.0 {
        deg - 360.0
    } else {
        deg
    }
}

/// Whether a local in-plane point lies inside the sweep `[0°, sweep_deg]`.
///
/// Sweeps of 360° or more accept every azimuth.
#[inline]
pub fn within_sweep(x: f64, y: f64, sweep_deg: f64) -> bool {
    sweep_deg >= 360.0 || azimuth_deg(x, y) <= sweep_deg
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_frame_world() {
        let f = Frame::world();
        assert!(f.is_orthonormal(1e-12));
        assert_relative_eq!(f.z, Vec3::z());
    }

    #[test]
    fn test_frame_repairs_skewed_y() {
        let f = Frame::from_xy(Vec3::new(2.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0));
        assert!(f.is_orthonormal(1e-12));
        assert_relative_eq!(f.x, Vec3::x(), epsilon = 1e-12);
        assert_relative_eq!(f.y, Vec3::y(), epsilon = 1e-12);
        assert_relative_eq!(f.z, Vec3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_frame_parallel_inputs_fall_back() {
        let f = Frame::from_xy(Vec3::z(), Vec3::z() * 3.0);
        assert!(f.is_orthonormal(1e-12));
        assert_relative_eq!(f.x, Vec3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_frame_zero_inputs_fall_back() {
        let f = Frame::from_xy(Vec3::zeros(), Vec3::zeros());
        assert!(f.is_orthonormal(1e-12));
        let f = Frame::from_xy(Vec3::new(f64::NAN, 0.0, 0.0), Vec3::new(0.0, f64::INFINITY, 1.0));
        assert!(f.is_orthonormal(1e-12));
    }

    #[test]
    fn test_frame_round_trip() {
        let f = Frame::from_xy(Vec3::new(1.0, 1.0, 0.0), Vec3::new(-1.0, 1.0, 0.5));
        let v = Vec3::new(0.3, -2.0, 7.0);
        assert_relative_eq!(f.to_world(&f.to_local(&v)), v, epsilon = 1e-12);
    }

    #[test]
    fn test_frame_from_axis_x() {
        let f = Frame::from_axis_x(Vec3::new(0.0, 0.0, -4.0));
        assert!(f.is_orthonormal(1e-12));
        assert_relative_eq!(f.x, -Vec3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_azimuth_wraps() {
        assert!(azimuth_deg(1.0, 0.0).abs() < 1e-12);
        assert!((azimuth_deg(0.0, 1.0) - 90.0).abs() < 1e-12);
        assert!((azimuth_deg(1.0, -1e-9) - 360.0).abs() < 1e-6);
        assert!((azimuth_deg(-1.0, -1e-9) - 180.0).abs() < 1e-6);
        assert!((azimuth_deg(0.0, -1.0) - 270.0).abs() < 1e-12);
    }

    #[test]
    fn test_within_sweep_half() {
        assert!(within_sweep(0.0, 1.0, 180.0));
        assert!(within_sweep(-1.0, 0.0, 180.0));
        assert!(!within_sweep(0.0, -1.0, 180.0));
        assert!(within_sweep(0.0, -1.0, 360.0));
    }

    #[test]
    fn test_sanitize_vec() {
        let v = sanitize_vec(Vec3::new(f64::NAN, 2.0, f64::NEG_INFINITY));
        assert_eq!(v, Vec3::new(0.0, 2.0, 0.0));
    }

    fn component() -> impl Strategy<Value = f64> {
        prop_oneof![
            8 => -1e3f64..1e3,
            1 => Just(0.0),
            1 => Just(f64::NAN),
        ]
    }

    fn any_vec() -> impl Strategy<Value = Vec3> {
        (component(), component(), component()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
    }

    proptest! {
        #[test]
        fn prop_frame_always_orthonormal(x in any_vec(), y in any_vec()) {
            let f = Frame::from_xy(x, y);
            prop_assert!(f.is_orthonormal(1e-9), "frame {:?} from {:?} {:?}", f, x, y);
        }
    }
}
