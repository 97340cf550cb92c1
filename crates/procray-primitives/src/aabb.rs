//! Axis-aligned bounding boxes.

use procray_math::{Point3, Vec3};

/// Axis-aligned bounding box in 3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb3 {
    /// Create an AABB from min and max corners.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Create an empty (inverted) AABB suitable for expansion.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Box spanning `center ± extent` (extent is taken componentwise).
    pub fn from_center_extent(center: &Point3, extent: &Vec3) -> Self {
        Self {
            min: center - extent,
            max: center + extent,
        }
    }

    /// Tight box around a set of points.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.include_point(p);
        }
        aabb
    }

    /// Expand this AABB to include a point.
    pub fn include_point(&mut self, p: &Point3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Expand this AABB to include another box.
    pub fn include_aabb(&mut self, other: &Aabb3) {
        self.include_point(&other.min);
        self.include_point(&other.max);
    }

    /// Whether `p` lies inside the box (boundary included).
    pub fn contains_point(&self, p: &Point3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Whether `other` lies entirely inside this box.
    pub fn contains_aabb(&self, other: &Aabb3) -> bool {
        self.contains_point(&other.min) && self.contains_point(&other.max)
    }

    /// Expand the AABB by a tolerance in all directions.
    pub fn expand(&mut self, tol: f64) {
        self.min.x -= tol;
        self.min.y -= tol;
        self.min.z -= tol;
        self.max.x += tol;
        self.max.y += tol;
        self.max.z += tol;
    }

    /// Edge lengths along x, y, z.
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Box center.
    pub fn centroid(&self) -> Point3 {
        Point3::from((self.min.coords + self.max.coords) * 0.5)
    }

    /// Length of the longest edge.
    pub fn largest_edge(&self) -> f64 {
        self.extent().max()
    }

    /// Length of the diagonal.
    pub fn diagonal(&self) -> f64 {
        self.extent().norm()
    }

    /// Surface area (zero for empty boxes).
    pub fn surface_area(&self) -> f64 {
        let d = self.extent();
        if d.x < 0.0 || d.y < 0.0 || d.z < 0.0 {
            return 0.0;
        }
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// True when all corners are finite and `min <= max` componentwise.
    pub fn is_valid(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|c| c.is_finite())
            && self.min.x <= self.max.x
            && self.min.y <= self.max.y
            && self.min.z <= self.max.z
    }

    /// Flat `[minX, minY, minZ, maxX, maxY, maxZ]` in single precision.
    ///
    /// The min corner is rounded toward -∞ and the max corner toward +∞ so
    /// the narrowed box still contains the double-precision one.
    pub fn to_f32_array(&self) -> [f32; 6] {
        [
            f32_round_down(self.min.x),
            f32_round_down(self.min.y),
            f32_round_down(self.min.z),
            f32_round_up(self.max.x),
            f32_round_up(self.max.y),
            f32_round_up(self.max.z),
        ]
    }

    /// Inverse of [`Aabb3::to_f32_array`].
    pub fn from_f32_array(a: &[f32; 6]) -> Self {
        Self {
            min: Point3::new(a[0] as f64, a[1] as f64, a[2] as f64),
            max: Point3::new(a[3] as f64, a[4] as f64, a[5] as f64),
        }
    }
}

impl Default for Aabb3 {
    fn default() -> Self {
        Self::empty()
    }
}

/// Largest `f32` not greater than `x`.
pub fn f32_round_down(x: f64) -> f32 {
    let f = x as f32;
    if (f as f64) > x {
        f32_step_down(f)
    } else {
        f
    }
}

/// Smallest `f32` not less than `x`.
pub fn f32_round_up(x: f64) -> f32 {
    let f = x as f32;
    if (f as f64) < x {
        -f32_step_down(-f)
    } else {
        f
    }
}

fn f32_step_down(f: f32) -> f32 {
    if f.is_nan() || f == f32::NEG_INFINITY {
        return f;
    }
    if f == 0.0 {
        return -f32::from_bits(1);
    }
    let bits = f.to_bits();
    if f > 0.0 {
        f32::from_bits(bits - 1)
    } else {
        f32::from_bits(bits + 1)
    }
}
