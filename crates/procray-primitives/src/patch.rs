//! Free-form bicubic patches.
//!
//! Patches are authored in Hermite form (corner positions, tangents, and
//! twist vectors) and converted once, at packing time, into the equivalent
//! bicubic Bézier control grid. The Bézier form is what the traversal
//! engine subdivides: its control points bound the surface, so the box of
//! the 16 points is always a valid bounding volume.

use procray_math::{sanitize_point, sanitize_vec, Point3, Vec3};

use crate::Aabb3;

/// Default recursion depth limit for patch traversal.
pub const DEFAULT_MAX_DEPTH: u32 = 10;
/// Default pixel-space error tolerance.
pub const DEFAULT_PIXEL_TOLERANCE: f64 = 3.0;
/// Smallest accepted recursion depth.
pub const MIN_MAX_DEPTH: u32 = 1;
/// Largest accepted recursion depth.
pub const MAX_MAX_DEPTH: u32 = 24;
/// Smallest accepted pixel tolerance.
pub const MIN_PIXEL_TOLERANCE: f64 = 0.05;

/// Relative pad applied to the control-point box.
const AABB_RELATIVE_PAD: f64 = 1e-6;
/// Absolute floor of the control-point box pad.
const AABB_MIN_PAD: f64 = 1e-9;

/// Fixed Hermite-to-Bézier change of basis.
///
/// Rows map `[P(0), P(1), P'(0), P'(1)]` to the four Bézier control points.
const HERMITE_TO_BEZIER: [[f64; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [1.0, 0.0, 1.0 / 3.0, 0.0],
    [0.0, 1.0, 0.0, -1.0 / 3.0],
    [0.0, 1.0, 0.0, 0.0],
];

/// Defaults applied when a Hermite patch leaves its tunables unset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchDefaults {
    /// Recursion depth limit.
    pub max_depth: u32,
    /// Pixel-space error tolerance.
    pub pixel_tolerance: f64,
}

impl Default for PatchDefaults {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            pixel_tolerance: DEFAULT_PIXEL_TOLERANCE,
        }
    }
}

/// A bicubic Hermite patch.
///
/// Corner arrays are indexed `[(0,0), (1,0), (0,1), (1,1)]` in `(u, v)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HermitePatch {
    /// Corner positions.
    pub corners: [Point3; 4],
    /// ∂P/∂u at the corners.
    pub tangents_u: [Vec3; 4],
    /// ∂P/∂v at the corners.
    pub tangents_v: [Vec3; 4],
    /// ∂²P/∂u∂v at the corners.
    pub twists: [Vec3; 4],
    /// Recursion depth limit, if authored.
    pub max_depth: Option<u32>,
    /// Pixel tolerance, if authored.
    pub pixel_tolerance: Option<f64>,
}

impl HermitePatch {
    /// Patch with zero twist vectors and default tunables.
    pub fn new(corners: [Point3; 4], tangents_u: [Vec3; 4], tangents_v: [Vec3; 4]) -> Self {
        Self {
            corners,
            tangents_u,
            tangents_v,
            twists: [Vec3::zeros(); 4],
            max_depth: None,
            pixel_tolerance: None,
        }
    }

    /// Convert to the equivalent Bézier patch.
    pub fn to_bezier(&self, defaults: &PatchDefaults) -> BezierPatch {
        let max_depth = self.max_depth.unwrap_or(defaults.max_depth);
        let pixel_tolerance = match self.pixel_tolerance {
            Some(t) if t.is_finite() && t > 0.0 => t,
            _ => defaults.pixel_tolerance,
        };
        BezierPatch::new(hermite_to_bezier(self), max_depth, pixel_tolerance)
    }

    /// Geometry matrix: rows are `[P(0), P(1), Pu(0), Pu(1)]` in u, columns
    /// the same in v.
    fn geometry(&self) -> [[Vec3; 4]; 4] {
        let p = self.corners.map(|c| sanitize_point(c).coords);
        let tu = self.tangents_u.map(sanitize_vec);
        let tv = self.tangents_v.map(sanitize_vec);
        let tw = self.twists.map(sanitize_vec);
        [
            [p[0], p[2], tv[0], tv[2]],
            [p[1], p[3], tv[1], tv[3]],
            [tu[0], tu[2], tw[0], tw[2]],
            [tu[1], tu[3], tw[1], tw[3]],
        ]
    }
}

/// Apply `M · G · Mᵀ` to a Hermite geometry matrix.
///
/// Output index is `a * 4 + b` with `a` the u index and `b` the v index.
pub fn hermite_to_bezier(patch: &HermitePatch) -> [Point3; 16] {
    let g = patch.geometry();
    let m = &HERMITE_TO_BEZIER;

    let mut rows = [[Vec3::zeros(); 4]; 4];
    for a in 0..4 {
        for j in 0..4 {
            rows[a][j] = (0..4).map(|i| g[i][j] * m[a][i]).sum();
        }
    }

    let mut control = [Point3::origin(); 16];
    for a in 0..4 {
        for b in 0..4 {
            let v: Vec3 = (0..4).map(|j| rows[a][j] * m[b][j]).sum();
            control[a * 4 + b] = sanitize_point(Point3::from(v));
        }
    }
    control
}

/// Position and first partials of a patch at `(u, v)`.
#[derive(Debug, Clone, Copy)]
pub struct PatchSample {
    /// Surface point.
    pub point: Point3,
    /// ∂P/∂u.
    pub du: Vec3,
    /// ∂P/∂v.
    pub dv: Vec3,
}

/// A bicubic Bézier patch ready for packing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BezierPatch {
    /// Control grid, index `u * 4 + v`.
    pub control: [Point3; 16],
    /// Padded box of the control points.
    pub aabb: Aabb3,
    /// Recursion depth limit for traversal.
    pub max_depth: u32,
    /// Pixel-space error tolerance for the leaf test.
    pub pixel_tolerance: f64,
}

impl BezierPatch {
    /// Build a patch, sanitizing the control points and clamping tunables.
    pub fn new(control: [Point3; 16], max_depth: u32, pixel_tolerance: f64) -> Self {
        let control = control.map(sanitize_point);
        let mut aabb = control_bounds(&control);
        aabb.expand((aabb.diagonal() * AABB_RELATIVE_PAD).max(AABB_MIN_PAD));
        let pixel_tolerance = if pixel_tolerance.is_finite() {
            pixel_tolerance.max(MIN_PIXEL_TOLERANCE)
        } else {
            DEFAULT_PIXEL_TOLERANCE
        };
        Self {
            control,
            aabb,
            max_depth: max_depth.clamp(MIN_MAX_DEPTH, MAX_MAX_DEPTH),
            pixel_tolerance,
        }
    }

    /// Control point at grid position `(a, b)`.
    #[inline]
    pub fn point(&self, a: usize, b: usize) -> &Point3 {
        &self.control[a * 4 + b]
    }

    /// Evaluate the surface and its partials.
    pub fn sample(&self, u: f64, v: f64) -> PatchSample {
        sample(&self.control, u, v)
    }
}

/// Tight (unpadded) box of a control grid.
pub fn control_bounds(control: &[Point3; 16]) -> Aabb3 {
    Aabb3::from_points(control.iter())
}

fn bernstein(t: f64) -> [f64; 4] {
    let s = 1.0 - t;
    [s * s * s, 3.0 * t * s * s, 3.0 * t * t * s, t * t * t]
}

fn bernstein_derivative(t: f64) -> [f64; 4] {
    let s = 1.0 - t;
    [
        -3.0 * s * s,
        3.0 * s * s - 6.0 * t * s,
        6.0 * t * s - 3.0 * t * t,
        3.0 * t * t,
    ]
}

/// Evaluate a control grid and its partials at `(u, v)`.
pub fn sample(control: &[Point3; 16], u: f64, v: f64) -> PatchSample {
    let bu = bernstein(u);
    let bv = bernstein(v);
    let dbu = bernstein_derivative(u);
    let dbv = bernstein_derivative(v);

    let mut point = Vec3::zeros();
    let mut du = Vec3::zeros();
    let mut dv = Vec3::zeros();
    for a in 0..4 {
        for b in 0..4 {
            let c = control[a * 4 + b].coords;
            point += c * (bu[a] * bv[b]);
            du += c * (dbu[a] * bv[b]);
            dv += c * (bu[a] * dbv[b]);
        }
    }
    PatchSample {
        point: Point3::from(point),
        du,
        dv,
    }
}

#[inline]
fn mid(a: &Point3, b: &Point3) -> Point3 {
    Point3::from((a.coords + b.coords) * 0.5)
}

/// Split a cubic curve at `t = 0.5` (de Casteljau).
fn split_curve(p: [Point3; 4]) -> ([Point3; 4], [Point3; 4]) {
    let p01 = mid(&p[0], &p[1]);
    let p12 = mid(&p[1], &p[2]);
    let p23 = mid(&p[2], &p[3]);
    let p012 = mid(&p01, &p12);
    let p123 = mid(&p12, &p23);
    let center = mid(&p012, &p123);
    ([p[0], p01, p012, center], [center, p123, p23, p[3]])
}

/// Split along u into the `u < 0.5` and `u > 0.5` halves.
fn split_u(control: &[Point3; 16]) -> ([Point3; 16], [Point3; 16]) {
    let mut lo = [Point3::origin(); 16];
    let mut hi = [Point3::origin(); 16];
    for b in 0..4 {
        let column = [control[b], control[4 + b], control[8 + b], control[12 + b]];
        let (l, h) = split_curve(column);
        for a in 0..4 {
            lo[a * 4 + b] = l[a];
            hi[a * 4 + b] = h[a];
        }
    }
    (lo, hi)
}

/// Split along v into the `v < 0.5` and `v > 0.5` halves.
fn split_v(control: &[Point3; 16]) -> ([Point3; 16], [Point3; 16]) {
    let mut lo = [Point3::origin(); 16];
    let mut hi = [Point3::origin(); 16];
    for a in 0..4 {
        let row = [
            control[a * 4],
            control[a * 4 + 1],
            control[a * 4 + 2],
            control[a * 4 + 3],
        ];
        let (l, h) = split_curve(row);
        lo[a * 4..a * 4 + 4].copy_from_slice(&l);
        hi[a * 4..a * 4 + 4].copy_from_slice(&h);
    }
    (lo, hi)
}

/// Uniform 2×2 split of a control grid.
///
/// Children are ordered `(u_lo, v_lo)`, `(u_hi, v_lo)`, `(u_lo, v_hi)`,
/// `(u_hi, v_hi)`.
pub fn quadrants(control: &[Point3; 16]) -> [[Point3; 16]; 4] {
    let (u_lo, u_hi) = split_u(control);
    let (a, c) = split_v(&u_lo);
    let (b, d) = split_v(&u_hi);
    [a, b, c, d]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> HermitePatch {
        HermitePatch::new(
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
            ],
            [Vec3::x(); 4],
            [Vec3::y(); 4],
        )
    }

    #[test]
    fn test_flat_square_gives_uniform_grid() {
        let bez = unit_square().to_bezier(&PatchDefaults::default());
        for a in 0..4 {
            for b in 0..4 {
                let expected = Point3::new(a as f64 / 3.0, b as f64 / 3.0, 0.0);
                assert_relative_eq!(*bez.point(a, b), expected, epsilon = 1e-12);
            }
        }
        assert_eq!(bez.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(bez.pixel_tolerance, DEFAULT_PIXEL_TOLERANCE);
    }

    #[test]
    fn test_interpolates_hermite_data() {
        let mut h = unit_square();
        h.corners[3] = Point3::new(1.0, 1.0, 0.5);
        h.tangents_u[0] = Vec3::new(1.0, 0.0, 0.3);
        h.tangents_v[1] = Vec3::new(0.0, 1.0, -0.2);
        h.twists[2] = Vec3::new(0.1, 0.2, 0.3);
        let bez = h.to_bezier(&PatchDefaults::default());

        let s00 = bez.sample(0.0, 0.0);
        assert_relative_eq!(s00.point, h.corners[0], epsilon = 1e-12);
        assert_relative_eq!(s00.du, h.tangents_u[0], epsilon = 1e-12);

        let s10 = bez.sample(1.0, 0.0);
        assert_relative_eq!(s10.point, h.corners[1], epsilon = 1e-12);
        assert_relative_eq!(s10.dv, h.tangents_v[1], epsilon = 1e-12);

        let s11 = bez.sample(1.0, 1.0);
        assert_relative_eq!(s11.point, h.corners[3], epsilon = 1e-12);
    }

    #[test]
    fn test_planar_hermite_stays_planar() {
        let n = Vec3::new(1.0, 1.0, 1.0).normalize();
        let e1 = Vec3::new(1.0, -1.0, 0.0).normalize();
        let e2 = n.cross(&e1);
        let origin = Point3::new(2.0, -1.0, 4.0);
        let at = |s: f64, t: f64| origin + e1 * s + e2 * t;
        let h = HermitePatch {
            corners: [at(0.0, 0.0), at(2.0, 0.0), at(0.0, 3.0), at(2.5, 3.5)],
            tangents_u: [e1 * 2.0, e1 * 1.5 + e2, e1 * 3.0 - e2 * 0.5, e1],
            tangents_v: [e2 * 3.0, e2 * 2.0 + e1 * 0.2, e2, e2 * 4.0],
            twists: [e1 * 0.5, e2 * 0.25, e1 - e2, Vec3::zeros()],
            max_depth: Some(6),
            pixel_tolerance: Some(1.0),
        };
        let bez = h.to_bezier(&PatchDefaults::default());
        for p in &bez.control {
            assert!((p - origin).dot(&n).abs() < 1e-12);
        }
        assert_eq!(bez.max_depth, 6);
        assert_eq!(bez.pixel_tolerance, 1.0);
    }

    #[test]
    fn test_non_finite_input_sanitized() {
        let mut h = unit_square();
        h.tangents_u[1] = Vec3::new(f64::NAN, 0.0, 0.0);
        h.corners[2] = Point3::new(0.0, f64::INFINITY, 0.0);
        h.pixel_tolerance = Some(f64::NAN);
        let bez = h.to_bezier(&PatchDefaults::default());
        assert!(bez.control.iter().all(|p| p.iter().all(|c| c.is_finite())));
        assert!(bez.aabb.is_valid());
        assert_eq!(bez.pixel_tolerance, DEFAULT_PIXEL_TOLERANCE);
    }

    #[test]
    fn test_tunables_clamped() {
        let control = unit_square().to_bezier(&PatchDefaults::default()).control;
        let bez = BezierPatch::new(control, 0, 0.0);
        assert_eq!(bez.max_depth, MIN_MAX_DEPTH);
        assert_eq!(bez.pixel_tolerance, MIN_PIXEL_TOLERANCE);
    }

    #[test]
    fn test_aabb_contains_surface() {
        let mut h = unit_square();
        h.tangents_u = [Vec3::new(1.0, 0.0, 2.0), Vec3::new(1.0, 0.0, -2.0), Vec3::x(), Vec3::x()];
        let bez = h.to_bezier(&PatchDefaults::default());
        for i in 0..=10 {
            for j in 0..=10 {
                let p = bez.sample(i as f64 / 10.0, j as f64 / 10.0).point;
                assert!(bez.aabb.contains_point(&p));
            }
        }
    }

    #[test]
    fn test_quadrants_reproduce_surface() {
        let mut h = unit_square();
        h.corners[3] = Point3::new(1.2, 0.9, 0.7);
        h.twists[0] = Vec3::new(0.0, 0.0, 1.0);
        let bez = h.to_bezier(&PatchDefaults::default());
        let children = quadrants(&bez.control);
        let offsets = [(0.0, 0.0), (0.5, 0.0), (0.0, 0.5), (0.5, 0.5)];
        for (child, (ou, ov)) in children.iter().zip(offsets) {
            for (u, v) in [(0.0, 0.0), (0.3, 0.7), (1.0, 1.0), (0.5, 0.25)] {
                let from_child = sample(child, u, v).point;
                let from_parent = bez.sample(ou + u * 0.5, ov + v * 0.5).point;
                assert_relative_eq!(from_child, from_parent, epsilon = 1e-12);
            }
        }
    }
}
