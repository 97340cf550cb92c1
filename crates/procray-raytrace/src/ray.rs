//! Ray representation, accepted parameter ranges, and ray-box tests.

use procray_math::{Dir3, Point3, Vec3};
use procray_primitives::{Aabb3, PrimitiveKind};

/// A ray in 3D space defined by origin and direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Point3,
    /// Unit direction of the ray.
    pub direction: Dir3,
    /// Precomputed reciprocal of direction components for fast AABB tests.
    inv_direction: Vec3,
    /// Sign of direction components (0 if positive, 1 if negative).
    sign: [usize; 3],
}

impl Ray {
    /// Create a new ray from origin and direction.
    ///
    /// The direction will be normalized.
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        let dir = Dir3::new_normalize(direction);
        let inv = Vec3::new(1.0 / dir.x, 1.0 / dir.y, 1.0 / dir.z);
        let sign = [
            usize::from(inv.x < 0.0),
            usize::from(inv.y < 0.0),
            usize::from(inv.z < 0.0),
        ];
        Self {
            origin,
            direction: dir,
            inv_direction: inv,
            sign,
        }
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + t * self.direction.as_ref()
    }

    /// Raw slab intervals: entry and exit parameters of the infinite line.
    ///
    /// The entry may be negative and may exceed the exit (miss).
    #[inline]
    fn slabs(&self, aabb: &Aabb3) -> (f64, f64) {
        let bounds = [aabb.min, aabb.max];

        let tx1 = (bounds[self.sign[0]].x - self.origin.x) * self.inv_direction.x;
        let tx2 = (bounds[1 - self.sign[0]].x - self.origin.x) * self.inv_direction.x;

        let mut t_min = tx1;
        let mut t_max = tx2;

        let ty1 = (bounds[self.sign[1]].y - self.origin.y) * self.inv_direction.y;
        let ty2 = (bounds[1 - self.sign[1]].y - self.origin.y) * self.inv_direction.y;

        t_min = t_min.max(ty1);
        t_max = t_max.min(ty2);

        let tz1 = (bounds[self.sign[2]].z - self.origin.z) * self.inv_direction.z;
        let tz2 = (bounds[1 - self.sign[2]].z - self.origin.z) * self.inv_direction.z;

        (t_min.max(tz1), t_max.min(tz2))
    }

    /// Test ray-AABB intersection using the slab method.
    ///
    /// Returns `Some((t_min, t_max))` if the ray intersects the box,
    /// where `t_min` and `t_max` are the entry and exit parameters.
    /// Returns `None` if no intersection.
    ///
    /// Handles infinite values correctly for axis-aligned rays.
    #[inline]
    pub fn intersect_aabb(&self, aabb: &Aabb3) -> Option<(f64, f64)> {
        self.intersect_aabb_within(aabb, 0.0, f64::INFINITY)
    }

    /// Slab test clipped to `[t_lo, t_hi]`.
    ///
    /// Returns the clipped entry and exit when the overlap is non-empty.
    #[inline]
    pub fn intersect_aabb_within(&self, aabb: &Aabb3, t_lo: f64, t_hi: f64) -> Option<(f64, f64)> {
        let (t_near, t_far) = self.slabs(aabb);
        let t_near = t_near.max(t_lo);
        let t_far = t_far.min(t_hi);
        if t_near <= t_far {
            Some((t_near, t_far))
        } else {
            None
        }
    }
}

/// Accepted parameter range of a query.
///
/// A candidate `t` is accepted when `t_min <= t < t_best` and `t <= t_max`.
/// `t_best` starts at `t_max` and shrinks each time a closer hit is
/// recorded, so later kernels only report hits in front of it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayInterval {
    /// Smallest accepted parameter.
    pub t_min: f64,
    /// Largest accepted parameter.
    pub t_max: f64,
    /// Parameter of the closest hit recorded so far.
    pub t_best: f64,
}

impl RayInterval {
    /// Interval `[t_min, t_max]` with no hit recorded.
    pub fn new(t_min: f64, t_max: f64) -> Self {
        Self {
            t_min,
            t_max,
            t_best: f64::INFINITY,
        }
    }

    /// Interval `[0, ∞)`.
    pub fn unbounded() -> Self {
        Self::new(0.0, f64::INFINITY)
    }

    /// Whether a candidate parameter would be accepted.
    #[inline]
    pub fn accepts(&self, t: f64) -> bool {
        t >= self.t_min && t <= self.t_max && t < self.t_best
    }

    /// Largest parameter still worth exploring.
    #[inline]
    pub fn upper(&self) -> f64 {
        self.t_max.min(self.t_best)
    }

    /// Whether a region entered at `t_near` can no longer hold an accepted hit.
    #[inline]
    pub fn prunes(&self, t_near: f64) -> bool {
        t_near >= self.t_best || t_near > self.t_max
    }

    /// Record a closer hit.
    #[inline]
    pub fn record(&mut self, t: f64) {
        if t < self.t_best {
            self.t_best = t;
        }
    }
}

impl Default for RayInterval {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Closest hit of a scene query.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    /// Parameter along the ray where intersection occurs.
    pub t: f64,
    /// 3D intersection point.
    pub point: Point3,
    /// Unit surface normal at the hit.
    pub normal: Dir3,
    /// Geometry index of the primitive that was hit.
    pub geometry_index: u32,
    /// Kind of that primitive.
    pub kind: PrimitiveKind,
    /// Slot of that primitive within its kind.
    pub slot: usize,
}
